//! [`Broker`] implementation backed by the OANDA REST client.

use crate::client::OandaClient;
use async_trait::async_trait;
use fx_timebot_core::{
    Broker, BrokerError, CloseConfirmation, MarketOrder, OrderConfirmation, Quote,
};

#[async_trait]
impl Broker for OandaClient {
    async fn get_quote(&self, instrument: &str) -> Result<Quote, BrokerError> {
        Ok(OandaClient::get_quote(self, instrument).await?)
    }

    async fn has_open_long(&self, instrument: &str) -> Result<bool, BrokerError> {
        Ok(OandaClient::has_open_long(self, instrument).await?)
    }

    async fn open_long_market(
        &self,
        order: &MarketOrder,
    ) -> Result<OrderConfirmation, BrokerError> {
        if order.units <= 0 {
            return Err(BrokerError::InvalidRequest(format!(
                "long order needs positive units, got {}",
                order.units
            )));
        }
        Ok(self.submit_market_order(order).await?)
    }

    async fn close_all_long(&self, instrument: &str) -> Result<CloseConfirmation, BrokerError> {
        Ok(self.close_long_position(instrument).await?)
    }
}

use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    pub const DEFAULT_PATH: &'static str = "config/Config.toml";

    /// Nested keys use `__`, e.g. `TIMEBOT_ENGINE__ENTRY_HOUR=9`.
    pub const ENV_PREFIX: &'static str = "TIMEBOT_";

    /// Loads configuration from the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(Self::DEFAULT_PATH)
    }

    /// Loads configuration by merging built-in defaults, the TOML file at
    /// `path` (optional), and `TIMEBOT_` environment variables, then validates
    /// the engine section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path).extract()?;
        config.engine.validate()?;

        Ok(config)
    }

    #[must_use]
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }
}

pub mod handlers;
pub mod server;

pub use handlers::{HealthResponse, LivenessState};
pub use server::LivenessServer;

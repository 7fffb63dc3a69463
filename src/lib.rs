pub mod config;
pub mod tron;
pub mod tron_error;

pub use config::{Network, TronConfig};
pub use tron::TronHttpClient;
pub use tron_error::{TronError, TronResult};

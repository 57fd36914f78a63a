mod controller;
mod env;
pub mod error;

pub use controller::ControllerConfig;
pub use env::from_env;
pub use error::ConfigError;

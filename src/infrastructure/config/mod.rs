//! Infrastructure configuration modules.

pub mod logging;
pub mod network;
pub mod policy;
pub mod settings;

pub use logging::LoggingConfig;
pub use network::{HttpConfig, NetworkConfig};
pub use policy::{BreakerConfig, PollingConfig, ReconnectConfig};
pub use settings::Config;

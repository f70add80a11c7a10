pub mod log_config;
pub mod log_level;

pub use log_config::{init_tracing, LogConfig};
pub use log_level::{LogFormat, LogLevel};

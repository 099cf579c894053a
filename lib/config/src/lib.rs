pub mod client;
pub mod fuzz;
pub mod log;

pub use client::ClientConfig;
pub use fuzz::{FuzzConfig, FuzzTarget, FuzzTargetError};
pub use log::{LogFormat, LogLevel, LoggingConfig};

pub mod config;
pub mod error;

pub use config::{CaptureConfig, Configuration, OutputFormat};
pub use error::{AddressError, SnifferError, SnifferResult};

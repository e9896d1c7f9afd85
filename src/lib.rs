pub mod core;
pub mod network;
pub mod select_device;
pub mod setup_logger;

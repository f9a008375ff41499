pub mod config;
pub mod core;
pub mod errors;
pub mod init;
pub mod plugin;
pub mod settings;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::GatewayConfig;
pub use core::*;
pub use errors::{DispatchError, ErrorKind, HttpError, StorageError};
pub use init::{Gateway, bootstrap};

//! Logger setup. The crate itself only depends on the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};

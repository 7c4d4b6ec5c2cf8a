pub mod config;
pub mod logging;

pub mod catalog;
pub mod downloader;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod record;
pub mod staging;
pub mod uploader;

pub use error::{MigrationError, TransportError};
pub use record::Record;

pub mod browser;
pub mod config;
pub mod connections;
pub mod content_type;
pub mod error;
pub mod format;
pub mod s3_client;
pub mod store;

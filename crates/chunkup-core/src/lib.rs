pub mod config;
pub mod logging;

pub mod api;
pub mod checksum;
pub mod chunking;
pub mod source;
pub mod uploader;

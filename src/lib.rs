pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod frame;
pub mod request;
pub mod server;
pub mod sorted_set;
pub mod store;
pub mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

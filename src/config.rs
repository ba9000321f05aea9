use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::Parser;

use crate::codec::DEFAULT_MAX_LINE_LENGTH;

pub const DEFAULT_PORT: u16 = 15000;
pub const DEFAULT_SHARDS: usize = 16;

/// Server configuration. Every flag can also be provided through its environment variable.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "exoredis", version, about)]
pub struct Config {
    /// Database file. Accepted for compatibility, the server never reads or writes it
    pub db_path: Option<PathBuf>,

    /// The address to listen on
    #[arg(long, env = "EXOREDIS_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// The port to listen on
    #[arg(short, long, env = "EXOREDIS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Longest request line, in bytes, buffered before the connection is dropped
    #[arg(long, env = "EXOREDIS_MAX_LINE_LENGTH", default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,

    /// Number of independently locked keyspace shards
    #[arg(long, env = "EXOREDIS_SHARDS", default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: None,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            shards: DEFAULT_SHARDS,
        }
    }
}

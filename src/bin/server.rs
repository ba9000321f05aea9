use clap::Parser;
use tracing_subscriber::EnvFilter;

use exoredis::config::Config;
use exoredis::{server, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    server::run(config).await
}

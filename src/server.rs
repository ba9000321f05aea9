use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};

use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::Config;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::request::ProtocolError;
use crate::store::Store;
use crate::Error;

/// Binds the configured address and serves connections until an accept fails.
pub async fn run(config: Config) -> Result<(), Error> {
    if let Some(db_path) = &config.db_path {
        debug!("Ignoring database file {}", db_path.display());
    }

    let listener = TcpListener::bind((config.bind, config.port)).await?;
    serve(listener, config).await
}

/// Serves connections accepted from an already bound listener. Every connection shares one
/// keyspace.
pub async fn serve(listener: TcpListener, config: Config) -> Result<(), Error> {
    let store = Store::with_shards(config.shards);

    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        let max_line_length = config.max_line_length;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store, max_line_length).await
            {
                error!("Connection failed: {}", e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, store, max_line_length),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    max_line_length: usize,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, client_address, max_line_length);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    loop {
        let request = match conn.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(err @ (ProtocolError::EmptyRequest | ProtocolError::LineTooLong { .. })) => {
                warn!("Protocol error: {}", err);
                conn.write_frame(Frame::Error(format!("ERR Protocol error: {err}")))
                    .await?;

                if err.is_recoverable() {
                    continue;
                }
                break;
            }
            Err(err) => return Err(err.into()),
        };

        debug!("Received request from client: {}", request);

        let res = match Command::try_from(request) {
            Ok(cmd) => cmd.exec(store.clone())?,
            Err(err) => {
                debug!("Rejected request: {}", err);
                Frame::Error(err.to_string())
            }
        };

        debug!("Sending response to client: {}", res);
        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}

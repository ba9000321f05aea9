use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

use crate::codec::RequestCodec;
use crate::frame::Frame;
use crate::request::{ProtocolError, Request};

pub struct Connection {
    pub id: Uuid,
    pub client_address: SocketAddr,
    stream: BufWriter<TcpStream>,
    // Data is read from the socket into the read buffer. When a request line is parsed, the
    // corresponding data is removed from the buffer.
    buffer: BytesMut,
    codec: RequestCodec,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr, max_line_length: usize) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            client_address,
            stream: BufWriter::new(stream),
            // Allocate the buffer with 4kb of capacity.
            buffer: BytesMut::with_capacity(4096),
            codec: RequestCodec::new(max_line_length),
        }
    }

    /// Reads the next request line.
    ///
    /// Returns `None` once the peer closed the connection cleanly, i.e. with no partial line left
    /// in the buffer. After an `EmptyRequest` error the connection is still usable; any other
    /// error leaves it in an unspecified state.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ProtocolError> {
        loop {
            if let Some(request) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(request));
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return self.codec.decode_eof(&mut self.buffer);
            }
        }
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        let mut dst = BytesMut::new();
        self.codec.encode(frame, &mut dst)?;

        self.stream.write_all(&dst).await?;
        self.stream.flush().await?;

        Ok(())
    }
}

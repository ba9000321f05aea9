use bytes::{Buf, BufMut, BytesMut};
use std::convert::TryInto;
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{self, Frame};
use crate::request::{ProtocolError, Request};
use crate::Error;

/// Default bound on a buffered request line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;

/// Default bound on a buffered reply.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Server side of the protocol: decodes CRLF-terminated request lines and encodes replies.
#[derive(Debug, Clone)]
pub struct RequestCodec {
    max_line_length: usize,
    // Index up to which the buffer has already been scanned for a terminator.
    next_index: usize,
}

impl RequestCodec {
    pub fn new(max_line_length: usize) -> RequestCodec {
        RequestCodec {
            max_line_length,
            next_index: 0,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Back up one byte in case the previous read ended between CR and LF.
        let start = self.next_index.saturating_sub(1);

        let terminator = src[start.min(src.len())..]
            .windows(2)
            .position(|window| window == b"\r\n")
            .map(|index| start + index);

        let Some(line_end) = terminator else {
            // A trailing CR may be the first half of the terminator.
            let pending = src.len() - usize::from(src.ends_with(b"\r"));
            if pending > self.max_line_length {
                return Err(ProtocolError::LineTooLong {
                    limit: self.max_line_length,
                });
            }
            self.next_index = src.len();
            return Ok(None);
        };

        self.next_index = 0;

        if line_end > self.max_line_length {
            src.advance(line_end + 2);
            return Err(ProtocolError::LineTooLong {
                limit: self.max_line_length,
            });
        }

        let mut line = src.split_to(line_end + 2);
        line.truncate(line_end);

        Request::parse(line.freeze()).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() => Ok(None),
            None => {
                src.clear();
                self.next_index = 0;
                Err(ProtocolError::Incomplete)
            }
        }
    }
}

impl Encoder<Frame> for RequestCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(&frame.serialize());
        Ok(())
    }
}

/// Client side of the protocol: encodes request lines and decodes length-prefixed replies.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> FrameCodec {
        FrameCodec { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() > self.max_frame_size {
            return Err("frame size exceeds limit".into());
        }

        let mut cursor = Cursor::new(&src[..]);
        let frame = match Frame::parse(&mut cursor) {
            Ok(frame) => frame,
            Err(frame::Error::Incomplete) => return Ok(None), // Not enough data to parse a frame.
            Err(err) => return Err(err.into()),
        };

        let position: usize = cursor.position().try_into()?;

        // Remove the parsed frame from the buffer.
        src.advance(position);

        Ok(Some(frame))
    }
}

impl Encoder<Request> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, request: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(&request.serialize());
        Ok(())
    }
}

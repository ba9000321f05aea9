use std::fmt;
use std::io;

use bytes::Bytes;
use itertools::Itertools;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";
const SEPARATOR: u8 = b' ';

/// Errors raised while framing a request line. These are connection-local and distinct from the
/// command-level errors that are answered with an error reply.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("empty request line")]
    EmptyRequest,
    #[error("request line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("connection closed in the middle of a request line")]
    Incomplete,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Whether the connection can keep serving requests after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::EmptyRequest)
    }
}

/// A single request line: `<COMMAND> <arg1> <arg2> ...\r\n`.
///
/// Tokens are separated by exactly one space and are not unescaped, so arguments can't contain
/// space, CR or LF. Consecutive spaces therefore produce empty arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub name: Bytes,
    pub args: Vec<Bytes>,
}

impl Request {
    pub fn new(name: impl Into<Bytes>, args: Vec<Bytes>) -> Request {
        Request {
            name: name.into(),
            args,
        }
    }

    /// Tokenizes a line with its CRLF terminator already stripped.
    pub fn parse(line: Bytes) -> Result<Request, ProtocolError> {
        if line.is_empty() {
            return Err(ProtocolError::EmptyRequest);
        }

        let mut tokens = line
            .split(|byte| *byte == SEPARATOR)
            .map(|token| line.slice_ref(token));

        let name = tokens.next().unwrap_or_default();
        let args = tokens.collect();

        Ok(Request { name, args })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let len = self.name.len() + self.args.iter().map(|arg| arg.len() + 1).sum::<usize>();

        let mut bytes = Vec::with_capacity(len + CRLF.len());
        bytes.extend_from_slice(&self.name);
        for arg in &self.args {
            bytes.push(SEPARATOR);
            bytes.extend_from_slice(arg);
        }
        bytes.extend_from_slice(CRLF);
        bytes
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = std::iter::once(&self.name)
            .chain(self.args.iter())
            .map(|token| String::from_utf8_lossy(token))
            .join(" ");
        write!(f, "{}", tokens)
    }
}

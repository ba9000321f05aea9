use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Get the value of `key`. If the key does not exist, or does not hold a string, the null bulk
/// string is returned.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: Bytes,
}

impl Executable for Get {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        match store.string(&self.key) {
            Ok(Some(value)) => Ok(Frame::Bulk(Bytes::copy_from_slice(value))),
            Ok(None) | Err(_) => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(1))?;
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}

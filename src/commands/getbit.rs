use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::Store;
use crate::utils::bits;
use crate::Error;

/// Returns the bit value at `offset` in the string value stored at `key`.
///
/// When `offset` is beyond the string length, the string is assumed to be a contiguous space
/// with 0 bits. When `key` does not exist it is assumed to be an empty string, so the reply is
/// also 0.
///
/// Ref: <https://redis.io/docs/latest/commands/getbit/>
#[derive(Debug, PartialEq)]
pub struct GetBit {
    pub key: Bytes,
    pub offset: usize,
}

impl Executable for GetBit {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let res = match store.string(&self.key) {
            Ok(Some(data)) => Frame::Integer(bits::get_bit(data, self.offset) as i64),
            Ok(None) => Frame::Integer(0),
            Err(err) => Frame::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for GetBit {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(2))?;

        let key = parser.next_bytes()?;
        let offset = parser.next_bit_offset()?;

        Ok(Self { key, offset })
    }
}

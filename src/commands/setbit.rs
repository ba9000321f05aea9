use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::utils::bits;
use crate::Error;

/// Sets or clears the bit at `offset` in the string value stored at `key`, and replies with the
/// bit previously stored there.
///
/// The string is grown with zero bytes to make sure it can hold a bit at `offset`; a missing key
/// is created as an empty string first. The key keeps its time to live, if it had one.
///
/// Ref: <https://redis.io/docs/latest/commands/setbit/>
#[derive(Debug, PartialEq)]
pub struct SetBit {
    pub key: Bytes,
    pub offset: usize,
    pub value: u8,
}

impl Executable for SetBit {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let res = match store.string_or_default(self.key) {
            Ok(data) => Frame::Integer(bits::set_bit(data, self.offset, self.value) as i64),
            Err(err) => Frame::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for SetBit {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(3))?;

        let key = parser.next_bytes()?;
        let offset = parser.next_bit_offset()?;
        let value = match &parser.next_bytes()?[..] {
            b"0" => 0,
            b"1" => 1,
            _ => return Err(CommandParserError::InvalidBit.into()),
        };

        Ok(Self { key, offset, value })
    }
}

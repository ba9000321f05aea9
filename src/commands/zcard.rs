use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the number of members of the sorted set stored at `key`, or 0 if the key does not
/// exist.
///
/// Ref: <https://redis.io/docs/latest/commands/zcard/>
#[derive(Debug, PartialEq)]
pub struct ZCard {
    pub key: Bytes,
}

impl Executable for ZCard {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let res = match store.sorted_set(&self.key) {
            Ok(set) => Frame::Integer(set.map_or(0, |set| set.len()) as i64),
            Err(err) => Frame::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for ZCard {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(1))?;
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}

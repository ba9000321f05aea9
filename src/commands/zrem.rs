use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Removes the specified members from the sorted set stored at `key`, ignoring members that are
/// not present. The key is deleted once its set is left empty.
///
/// Replies with the number of members removed.
///
/// Ref: <https://redis.io/docs/latest/commands/zrem/>
#[derive(Debug, PartialEq)]
pub struct ZRem {
    pub key: Bytes,
    pub members: Vec<Bytes>,
}

impl Executable for ZRem {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let set = match store.sorted_set_mut(&self.key) {
            Ok(Some(set)) => set,
            Ok(None) => return Ok(Frame::Integer(0)),
            Err(err) => return Ok(Frame::Error(err.to_string())),
        };

        let removed = self
            .members
            .iter()
            .filter(|member| set.remove(member))
            .count();

        if set.is_empty() {
            store.remove(&self.key);
        }

        Ok(Frame::Integer(removed as i64))
    }
}

impl TryFrom<&mut CommandParser> for ZRem {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::AtLeast(2))?;

        let key = parser.next_bytes()?;
        let members = parser.rest();

        Ok(Self { key, members })
    }
}

use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Removes the specified keys, whatever type they hold. A key that does not exist is ignored.
///
/// Replies with the number of keys removed.
///
/// Ref: <https://redis.io/docs/latest/commands/del/>
#[derive(Debug, PartialEq)]
pub struct Del {
    pub keys: Vec<Bytes>,
}

impl Executable for Del {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let count = self
            .keys
            .iter()
            .filter(|key| store.lock(key).remove(key).is_some())
            .count();

        Ok(Frame::Integer(count as i64))
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::AtLeast(1))?;
        let keys = parser.rest();
        Ok(Self { keys })
    }
}

use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::{Store, Value};
use crate::Error;

/// Returns the type of the value stored at `key`: `string`, `zset`, or `none` when the key does
/// not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/type/>
#[derive(Debug, PartialEq)]
pub struct Type {
    pub key: Bytes,
}

impl Executable for Type {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);
        let type_name = store.get(&self.key).map_or("none", Value::type_name);
        Ok(Frame::Simple(type_name.to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Type {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(1))?;
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}

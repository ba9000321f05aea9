use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the remaining time to live of `key`, in seconds.
///
/// * `-2` if the key does not exist.
/// * `-1` if the key exists but has no associated expire.
///
/// Ref: <https://redis.io/docs/latest/commands/ttl/>
#[derive(Debug, PartialEq)]
pub struct Ttl {
    pub key: Bytes,
}

impl Executable for Ttl {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let ttl = match store.ttl(&self.key) {
            Some(Some(ttl)) => ((ttl.as_millis() + 500) / 1000) as i64,
            Some(None) => -1,
            None => -2,
        };

        Ok(Frame::Integer(ttl))
    }
}

impl TryFrom<&mut CommandParser> for Ttl {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(1))?;
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}

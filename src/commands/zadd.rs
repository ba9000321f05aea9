use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Adds all the specified members with the specified scores to the sorted set stored at `key`.
/// A member that is already present has its score updated and is moved to its new position.
/// A missing key is created as a new sorted set.
///
/// Replies with the number of members newly added, not counting score updates.
///
/// Ref: <https://redis.io/docs/latest/commands/zadd/>
#[derive(Debug, PartialEq)]
pub struct ZAdd {
    pub key: Bytes,
    pub members: Vec<(f64, Bytes)>,
}

impl Executable for ZAdd {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let set = match store.sorted_set_or_default(self.key) {
            Ok(set) => set,
            Err(err) => return Ok(Frame::Error(err.to_string())),
        };

        let added = self
            .members
            .into_iter()
            .filter(|(score, member)| set.add(*score, member.clone()))
            .count();

        Ok(Frame::Integer(added as i64))
    }
}

impl TryFrom<&mut CommandParser> for ZAdd {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::AtLeast(3))?;

        let key = parser.next_bytes()?;
        if parser.remaining() % 2 != 0 {
            return Err(CommandParserError::SyntaxError.into());
        }

        let mut members = Vec::with_capacity(parser.remaining() / 2);
        while parser.has_remaining() {
            let score = parser.next_float()?;
            if score.is_infinite() {
                return Err(CommandParserError::InvalidFloat.into());
            }
            let member = parser.next_bytes()?;
            members.push((score, member));
        }

        Ok(Self { key, members })
    }
}

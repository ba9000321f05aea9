use bytes::Bytes;
use strum_macros::EnumString;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::sorted_set::format_score;
use crate::store::Store;
use crate::Error;

/// Returns the members of the sorted set stored at `key` with ranks between `start` and `stop`,
/// both inclusive, ordered from the lowest to the highest score.
///
/// Negative indexes count from the end of the set: -1 is the last member, -2 the penultimate.
/// Out of range indexes are clamped to the set, and a range where `start` ends up after `stop`
/// is empty. With `WITHSCORES` each member is followed by its score.
///
/// Ref: <https://redis.io/docs/latest/commands/zrange/>
#[derive(Debug, PartialEq)]
pub struct ZRange {
    pub key: Bytes,
    pub start: i64,
    pub stop: i64,
    pub with_scores: bool,
}

#[derive(Debug, EnumString)]
#[strum(ascii_case_insensitive)]
enum ZRangeOption {
    WithScores,
}

impl Executable for ZRange {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let set = match store.sorted_set(&self.key) {
            Ok(Some(set)) => set,
            Ok(None) => return Ok(Frame::Array(vec![])),
            Err(err) => return Ok(Frame::Error(err.to_string())),
        };

        let mut res = vec![];
        for (member, score) in set.range(self.start, self.stop) {
            res.push(Frame::Bulk(member));
            if self.with_scores {
                res.push(Frame::Bulk(Bytes::from(format_score(score))));
            }
        }

        Ok(Frame::Array(res))
    }
}

impl TryFrom<&mut CommandParser> for ZRange {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::AtLeast(3))?;

        let key = parser.next_bytes()?;
        let start = parser.next_integer()?;
        let stop = parser.next_integer()?;

        let mut with_scores = false;
        while parser.has_remaining() {
            match parser.next_option::<ZRangeOption>()? {
                ZRangeOption::WithScores => with_scores = true,
            }
        }

        Ok(Self {
            key,
            start,
            stop,
            with_scores,
        })
    }
}

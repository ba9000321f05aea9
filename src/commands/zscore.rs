use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser};
use crate::frame::Frame;
use crate::sorted_set::format_score;
use crate::store::Store;
use crate::Error;

/// Returns the score of `member` in the sorted set at `key`, or the null bulk string if either
/// is missing.
///
/// Ref: <https://redis.io/docs/latest/commands/zscore/>
#[derive(Debug, PartialEq)]
pub struct ZScore {
    pub key: Bytes,
    pub member: Bytes,
}

impl Executable for ZScore {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let res = match store.sorted_set(&self.key) {
            Ok(set) => match set.and_then(|set| set.score(&self.member)) {
                Some(score) => Frame::Bulk(Bytes::from(format_score(score))),
                None => Frame::Null,
            },
            Err(err) => Frame::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for ZScore {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(2))?;

        let key = parser.next_bytes()?;
        let member = parser.next_bytes()?;

        Ok(Self { key, member })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{request, Command};

    fn exec(store: &Store, line: &str) -> Frame {
        Command::try_from(request(line))
            .unwrap()
            .exec(store.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn member_score() {
        let store = Store::new();
        exec(&store, "ZADD zset 1.5 a -2 b");

        assert_eq!(exec(&store, "ZSCORE zset a"), Frame::Bulk(Bytes::from("1.5")));
        assert_eq!(exec(&store, "ZSCORE zset b"), Frame::Bulk(Bytes::from("-2")));
        assert_eq!(exec(&store, "ZSCORE zset c"), Frame::Null);
        assert_eq!(exec(&store, "ZSCORE other a"), Frame::Null);
    }

    #[tokio::test]
    async fn key_holding_a_string() {
        let store = Store::new();
        exec(&store, "SET key1 v");

        assert_eq!(
            exec(&store, "ZSCORE key1 a"),
            Frame::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string()
            )
        );
    }
}

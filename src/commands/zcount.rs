use std::ops::Bound;
use std::str;

use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the number of members in the sorted set at `key` with a score between `min` and
/// `max`, both inclusive unless prefixed with `(`. `-inf` and `+inf` may be used as bounds.
///
/// Ref: <https://redis.io/docs/latest/commands/zcount/>
#[derive(Debug, PartialEq)]
pub struct ZCount {
    pub key: Bytes,
    pub min: Bound<f64>,
    pub max: Bound<f64>,
}

impl Executable for ZCount {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);

        let res = match store.sorted_set(&self.key) {
            Ok(Some(set)) => Frame::Integer(set.count(self.min, self.max) as i64),
            Ok(None) => Frame::Integer(0),
            Err(err) => Frame::Error(err.to_string()),
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for ZCount {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::Exact(3))?;

        let key = parser.next_bytes()?;
        let min = parse_score_bound(&parser.next_bytes()?)?;
        let max = parse_score_bound(&parser.next_bytes()?)?;

        Ok(Self { key, min, max })
    }
}

fn parse_score_bound(bytes: &[u8]) -> Result<Bound<f64>, CommandParserError> {
    let (exclusive, number) = match bytes.strip_prefix(b"(") {
        Some(number) => (true, number),
        None => (false, bytes),
    };

    let score = str::from_utf8(number)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|score| !score.is_nan())
        .ok_or(CommandParserError::InvalidScoreRange)?;

    Ok(if exclusive {
        Bound::Excluded(score)
    } else {
        Bound::Included(score)
    })
}

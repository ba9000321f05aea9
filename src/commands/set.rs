use bytes::Bytes;
use strum_macros::EnumString;
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::{Arity, CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::{SetCondition, Store};
use crate::Error;

/// Set `key` to hold the string `value`. If key already holds a value, it is overwritten,
/// regardless of its type. Any previous time to live associated with the key is discarded.
///
/// Options:
/// * `NX` -- Only set the key if it does not already exist.
/// * `XX` -- Only set the key if it already exists and holds a string.
/// * `EX seconds` -- Set the specified expire time, in seconds.
/// * `PX milliseconds` -- Set the specified expire time, in milliseconds.
///
/// Replies `OK` when the value was written, or the null bulk string when the NX or XX condition
/// was not met.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
    pub condition: SetCondition,
    pub ttl: Option<Ttl>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Ttl {
    Ex(u64),
    Px(u64),
}

impl Ttl {
    pub fn duration(&self) -> Duration {
        match self {
            Ttl::Ex(seconds) => Duration::from_secs(*seconds),
            Ttl::Px(millis) => Duration::from_millis(*millis),
        }
    }
}

#[derive(Debug, EnumString)]
#[strum(ascii_case_insensitive)]
enum SetOption {
    Nx,
    Xx,
    Ex,
    Px,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.lock(&self.key);
        let ttl = self.ttl.map(|ttl| ttl.duration());

        let written = store.set(self.key, self.value.to_vec(), self.condition, ttl);

        let res = if written {
            Frame::Simple("OK".to_string())
        } else {
            Frame::Null
        };
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.check_arity(Arity::AtLeast(2))?;

        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        let mut condition = SetCondition::Always;
        let mut ttl = None;

        while parser.has_remaining() {
            match parser.next_option::<SetOption>()? {
                SetOption::Nx if condition == SetCondition::Always => {
                    condition = SetCondition::IfAbsent;
                }
                SetOption::Xx if condition == SetCondition::Always => {
                    condition = SetCondition::IfPresent;
                }
                SetOption::Ex if ttl.is_none() => {
                    ttl = Some(Ttl::Ex(next_expire_time(parser, 1000)?));
                }
                SetOption::Px if ttl.is_none() => {
                    ttl = Some(Ttl::Px(next_expire_time(parser, 1)?));
                }
                // Conflicting or repeated options.
                _ => return Err(CommandParserError::SyntaxError.into()),
            }
        }

        Ok(Self {
            key,
            value,
            condition,
            ttl,
        })
    }
}

/// Parses a positive expire time whose value in milliseconds still fits an `i64`.
fn next_expire_time(
    parser: &mut CommandParser,
    unit_millis: i64,
) -> Result<u64, CommandParserError> {
    if !parser.has_remaining() {
        return Err(CommandParserError::SyntaxError);
    }

    let amount = parser.next_integer()?;
    if amount <= 0 || amount.checked_mul(unit_millis).is_none() {
        return Err(CommandParserError::InvalidExpireTime {
            command: "set".to_string(),
        });
    }

    Ok(amount as u64)
}

#[cfg(test)]
mod tests {
    use tokio::time;

    use super::*;
    use crate::commands::{parse_err, request, Command};

    fn exec(store: &Store, line: &str) -> Frame {
        Command::try_from(request(line))
            .unwrap()
            .exec(store.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn parse_plain() {
        let cmd = Command::try_from(request("SET key1 value1")).unwrap();

        assert_eq!(
            cmd,
            Command::Set(Set {
                key: Bytes::from("key1"),
                value: Bytes::from("value1"),
                condition: SetCondition::Always,
                ttl: None,
            })
        );
    }

    #[tokio::test]
    async fn parse_options_in_any_order_and_case() {
        let cmd = Command::try_from(request("SET key1 value1 px 100 Nx")).unwrap();

        assert_eq!(
            cmd,
            Command::Set(Set {
                key: Bytes::from("key1"),
                value: Bytes::from("value1"),
                condition: SetCondition::IfAbsent,
                ttl: Some(Ttl::Px(100)),
            })
        );
    }

    #[test]
    fn parse_conflicting_options() {
        assert_eq!(parse_err("SET k v NX XX"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET k v EX 1 PX 1"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET k v NX NX"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET k v EX 1 EX 2"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET k v KEEPTTL"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET k v EX"), CommandParserError::SyntaxError);
    }

    #[test]
    fn parse_invalid_expire_time() {
        assert_eq!(parse_err("SET k v EX ten"), CommandParserError::InvalidInteger);
        for line in ["SET k v PX 0", "SET k v EX -5", "SET k v EX 9223372036854775807"] {
            assert_eq!(
                parse_err(line),
                CommandParserError::InvalidExpireTime {
                    command: "set".to_string()
                },
                "{line}"
            );
        }
    }

    #[tokio::test]
    async fn set_and_get() {
        let store = Store::new();

        assert_eq!(exec(&store, "SET key1 value1"), Frame::Simple("OK".to_string()));
        assert_eq!(exec(&store, "GET key1"), Frame::Bulk(Bytes::from("value1")));
    }

    #[tokio::test]
    async fn empty_value() {
        let store = Store::new();

        assert_eq!(exec(&store, "SET key1 "), Frame::Simple("OK".to_string()));
        assert_eq!(exec(&store, "GET key1"), Frame::Bulk(Bytes::new()));
    }

    #[tokio::test]
    async fn nx() {
        let store = Store::new();

        assert_eq!(exec(&store, "SET key1 1 NX"), Frame::Simple("OK".to_string()));
        assert_eq!(exec(&store, "SET key1 2 NX"), Frame::Null);
        assert_eq!(exec(&store, "GET key1"), Frame::Bulk(Bytes::from("1")));

        exec(&store, "ZADD zset 1 a");
        assert_eq!(exec(&store, "SET zset 2 NX"), Frame::Null);
    }

    #[tokio::test]
    async fn xx() {
        let store = Store::new();

        assert_eq!(exec(&store, "SET key1 1 XX"), Frame::Null);
        assert_eq!(exec(&store, "GET key1"), Frame::Null);

        exec(&store, "SET key1 1");
        assert_eq!(exec(&store, "SET key1 2 XX"), Frame::Simple("OK".to_string()));
        assert_eq!(exec(&store, "GET key1"), Frame::Bulk(Bytes::from("2")));

        exec(&store, "ZADD zset 1 a");
        assert_eq!(exec(&store, "SET zset 2 XX"), Frame::Null);
        assert_eq!(exec(&store, "ZCARD zset"), Frame::Integer(1));
    }

    #[tokio::test]
    async fn overwrites_sorted_set() {
        let store = Store::new();

        exec(&store, "ZADD key1 1 a");

        assert_eq!(exec(&store, "SET key1 v"), Frame::Simple("OK".to_string()));
        assert_eq!(exec(&store, "GET key1"), Frame::Bulk(Bytes::from("v")));
    }

    #[tokio::test]
    async fn expires() {
        time::pause();

        let store = Store::new();

        assert_eq!(exec(&store, "SET key1 v EX 10"), Frame::Simple("OK".to_string()));
        assert_eq!(exec(&store, "TTL key1"), Frame::Integer(10));

        time::advance(Duration::from_secs(10)).await;

        assert_eq!(exec(&store, "GET key1"), Frame::Null);
        assert_eq!(exec(&store, "SET key1 v XX"), Frame::Null);
    }
}

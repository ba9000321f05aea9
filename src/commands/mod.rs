pub mod del;
pub mod executable;
pub mod exists;
pub mod get;
pub mod getbit;
pub mod ping;
pub mod set;
pub mod setbit;
pub mod ttl;
pub mod type_;
pub mod zadd;
pub mod zcard;
pub mod zcount;
pub mod zrange;
pub mod zrem;
pub mod zscore;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::request::Request;
use crate::store::Store;
use crate::utils::bits::MAX_BIT_OFFSET;
use crate::Error;

use del::Del;
use exists::Exists;
use get::Get;
use getbit::GetBit;
use ping::Ping;
use set::Set;
use setbit::SetBit;
use ttl::Ttl;
use type_::Type;
use zadd::ZAdd;
use zcard::ZCard;
use zcount::ZCount;
use zrange::ZRange;
use zrem::ZRem;
use zscore::ZScore;

#[derive(Debug, PartialEq)]
pub enum Command {
    Del(Del),
    Exists(Exists),
    Get(Get),
    GetBit(GetBit),
    Set(Set),
    SetBit(SetBit),
    Ttl(Ttl),
    Type(Type),

    ZAdd(ZAdd),
    ZCard(ZCard),
    ZCount(ZCount),
    ZRange(ZRange),
    ZRem(ZRem),
    ZScore(ZScore),

    Ping(Ping),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Del(cmd) => cmd.exec(store),
            Command::Exists(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::GetBit(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::SetBit(cmd) => cmd.exec(store),
            Command::Ttl(cmd) => cmd.exec(store),
            Command::Type(cmd) => cmd.exec(store),
            Command::ZAdd(cmd) => cmd.exec(store),
            Command::ZCard(cmd) => cmd.exec(store),
            Command::ZCount(cmd) => cmd.exec(store),
            Command::ZRange(cmd) => cmd.exec(store),
            Command::ZRem(cmd) => cmd.exec(store),
            Command::ZScore(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Request> for Command {
    type Error = Error;

    /// Parses and validates a request. Nothing here touches the store, so a request that fails to
    /// parse never causes a partial mutation.
    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let command_name = String::from_utf8_lossy(&request.name).to_lowercase();

        let parser = &mut CommandParser {
            command: command_name.clone(),
            parts: request.args.into_iter(),
        };

        match &command_name[..] {
            "del" => Del::try_from(parser).map(Command::Del),
            "exists" => Exists::try_from(parser).map(Command::Exists),
            "get" => Get::try_from(parser).map(Command::Get),
            "getbit" => GetBit::try_from(parser).map(Command::GetBit),
            "ping" => Ping::try_from(parser).map(Command::Ping),
            "set" => Set::try_from(parser).map(Command::Set),
            "setbit" => SetBit::try_from(parser).map(Command::SetBit),
            "ttl" => Ttl::try_from(parser).map(Command::Ttl),
            "type" => Type::try_from(parser).map(Command::Type),
            "zadd" => ZAdd::try_from(parser).map(Command::ZAdd),
            "zcard" => ZCard::try_from(parser).map(Command::ZCard),
            "zcount" => ZCount::try_from(parser).map(Command::ZCount),
            "zrange" => ZRange::try_from(parser).map(Command::ZRange),
            "zrem" => ZRem::try_from(parser).map(Command::ZRem),
            "zscore" => ZScore::try_from(parser).map(Command::ZScore),
            _ => Err(CommandParserError::UnknownCommand {
                command: String::from_utf8_lossy(&request.name).into_owned(),
            }
            .into()),
        }
    }
}

/// Number of arguments a command accepts, not counting the command name.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Arity {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
}

pub struct CommandParser {
    command: String,
    parts: vec::IntoIter<Bytes>,
}

impl CommandParser {
    fn check_arity(&self, arity: Arity) -> Result<(), CommandParserError> {
        let count = self.parts.len();
        let valid = match arity {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::AtMost(n) => count <= n,
        };

        if valid {
            Ok(())
        } else {
            Err(self.wrong_arity())
        }
    }

    fn wrong_arity(&self) -> CommandParserError {
        CommandParserError::WrongArity {
            command: self.command.clone(),
        }
    }

    fn has_remaining(&self) -> bool {
        self.parts.len() > 0
    }

    fn remaining(&self) -> usize {
        self.parts.len()
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        self.parts.next().ok_or_else(|| self.wrong_arity())
    }

    /// Collects every argument left.
    fn rest(&mut self) -> Vec<Bytes> {
        self.parts.by_ref().collect()
    }

    fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandParserError::InvalidInteger)
    }

    fn next_float(&mut self) -> Result<f64, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|f| !f.is_nan())
            .ok_or(CommandParserError::InvalidFloat)
    }

    fn next_bit_offset(&mut self) -> Result<usize, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|offset| *offset <= MAX_BIT_OFFSET)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or(CommandParserError::InvalidBitOffset)
    }

    /// Parses the next argument as an option keyword, case-insensitively.
    fn next_option<T: str::FromStr>(&mut self) -> Result<T, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<T>().ok())
            .ok_or(CommandParserError::SyntaxError)
    }
}

/// Command-level errors. The display form is sent verbatim as the error reply.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
    #[error("ERR value is not an integer or out of range")]
    InvalidInteger,
    #[error("ERR value is not a valid float")]
    InvalidFloat,
    #[error("ERR min or max is not a float")]
    InvalidScoreRange,
    #[error("ERR bit is not an integer or out of range")]
    InvalidBit,
    #[error("ERR bit offset is not an integer or out of range")]
    InvalidBitOffset,
    #[error("ERR invalid expire time in '{command}' command")]
    InvalidExpireTime { command: String },
    #[error("ERR syntax error")]
    SyntaxError,
}

#[cfg(test)]
pub(crate) fn request(line: &str) -> Request {
    Request::parse(Bytes::copy_from_slice(line.as_bytes())).unwrap()
}

#[cfg(test)]
pub(crate) fn parse_err(line: &str) -> CommandParserError {
    let err = Command::try_from(request(line)).err().unwrap();
    let err = err.downcast::<CommandParserError>().unwrap();
    *err
}

//! Request bodies and response decoding for the door backend.
//!
//! | call        | request                          |
//! |-------------|----------------------------------|
//! | register    | `POST /door/register`            |
//! | poll        | `GET /door/command/{device_id}`  |
//! | acknowledge | `POST /door/acknowledge`         |
//! | status      | `POST /door/status`              |

use core::fmt::{self, Write};

use heapless::String;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::command::{AckStatus, CommandError, DoorCommand, DoorState, PendingCommand};
use crate::json::ObjectWriter;
use crate::visitor::truncate;
use crate::NAME_MAX;

pub const REGISTER_PATH: &str = "/door/register";
pub const COMMAND_PATH: &str = "/door/command/";
pub const ACK_PATH: &str = "/door/acknowledge";
pub const STATUS_PATH: &str = "/door/status";

pub const DEVICE_TYPE: &str = "esp32_door";

/// Room for any request body below
pub const BODY_MAX: usize = 256;
pub const PATH_MAX: usize = 64;

/// Scratch space for unescaping one string of a poll response
const UNESCAPE_MAX: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Response body is not the expected JSON object
    Json,
    Overflow,
}

impl From<fmt::Error> for ApiError {
    fn from(_: fmt::Error) -> Self {
        ApiError::Overflow
    }
}

/// Decoded answer to a command poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Idle,
    Command(PendingCommand),
    /// The backend holds a command this door does not run. It still has to
    /// be acknowledged, or it is served again on the next poll.
    Rejected(CommandError),
}

pub fn command_path(device_id: &str) -> Result<String<PATH_MAX>, ApiError> {
    let mut path = String::new();
    write!(path, "{}{}", COMMAND_PATH, device_id)?;
    Ok(path)
}

pub fn register_body(device_id: &str, ip_address: &str) -> Result<String<BODY_MAX>, ApiError> {
    let mut body = String::new();
    let mut obj = ObjectWriter::new(&mut body)?;
    obj.str("device_id", device_id)?
        .str("device_type", DEVICE_TYPE)?
        .str("ip_address", ip_address)?
        .str("status", "online")?;
    obj.finish()?;
    Ok(body)
}

pub fn ack_body(
    device_id: &str,
    timestamp: u64,
    status: AckStatus,
) -> Result<String<BODY_MAX>, ApiError> {
    let mut body = String::new();
    let mut obj = ObjectWriter::new(&mut body)?;
    obj.str("device_id", device_id)?
        .u64("timestamp", timestamp)?
        .str("status", status.as_str())?;
    obj.finish()?;
    Ok(body)
}

pub fn status_body(
    device_id: &str,
    state: DoorState,
    timestamp: u64,
) -> Result<String<BODY_MAX>, ApiError> {
    let mut body = String::new();
    let mut obj = ObjectWriter::new(&mut body)?;
    obj.str("device_id", device_id)?
        .str("door_status", state.as_str())?
        .u64("timestamp", timestamp)?;
    obj.finish()?;
    Ok(body)
}

#[derive(Deserialize)]
struct PollResponse {
    #[serde(default)]
    has_command: bool,
    #[serde(default, deserialize_with = "command_name")]
    command: Option<Result<DoorCommand, CommandError>>,
    #[serde(default, deserialize_with = "visitor_name")]
    recognized_name: Option<String<NAME_MAX>>,
    #[serde(default)]
    timestamp: Option<u64>,
}

// Matches the whole name, any length, so nothing is cut before comparing.
struct CommandName;

impl<'de> Visitor<'de> for CommandName {
    type Value = Option<Result<DoorCommand, CommandError>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a command name or null")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_str(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.parse()))
    }
}

fn command_name<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Result<DoorCommand, CommandError>>, D::Error> {
    d.deserialize_option(CommandName)
}

// Display names only, so long ones are shortened instead of refused.
struct VisitorName;

impl<'de> Visitor<'de> for VisitorName {
    type Value = Option<String<NAME_MAX>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a name or null")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_str(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(truncate(v)))
    }
}

fn visitor_name<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String<NAME_MAX>>, D::Error> {
    d.deserialize_option(VisitorName)
}

/// Decode the answer to a poll.
pub fn parse_poll(body: &str) -> Result<Poll, ApiError> {
    let mut scratch = [0u8; UNESCAPE_MAX];
    let (response, _): (PollResponse, usize) =
        serde_json_core::from_str_escaped(body, &mut scratch).map_err(|e| {
            log::warn!("Malformed poll response: {:?}", e);
            ApiError::Json
        })?;

    if !response.has_command {
        return Ok(Poll::Idle);
    }

    match response.command {
        Some(Ok(command)) => Ok(Poll::Command(PendingCommand {
            command,
            recognized_name: response.recognized_name,
            issued_at: response.timestamp,
        })),
        Some(Err(e)) => Ok(Poll::Rejected(e)),
        None => Ok(Poll::Rejected(CommandError::Missing)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(body: &str) -> PendingCommand {
        match parse_poll(body) {
            Ok(Poll::Command(cmd)) => cmd,
            other => panic!("expected a command, got {:?}", other),
        }
    }

    #[test]
    fn nothing_pending() {
        assert_eq!(parse_poll(r#"{"has_command": false, "command": null}"#), Ok(Poll::Idle));
        assert_eq!(parse_poll("{}"), Ok(Poll::Idle));
    }

    #[test]
    fn open_door_with_name() {
        let cmd = pending(
            r#"{"has_command": true, "command": "open_door", "recognized_name": "Lan", "timestamp": null}"#,
        );
        assert_eq!(cmd.command, DoorCommand::OpenDoor);
        assert_eq!(cmd.recognized_name.as_deref(), Some("Lan"));
        assert_eq!(cmd.issued_at, None);
    }

    #[test]
    fn escaped_names_are_decoded() {
        let cmd = pending(
            r#"{"has_command": true, "command": "open_door", "recognized_name": "Nguy\u1ec5n \"Bo\""}"#,
        );
        assert_eq!(cmd.recognized_name.as_deref(), Some("Nguyễn \"Bo\""));
    }

    #[test]
    fn long_names_are_shortened() {
        let cmd = pending(
            r#"{"has_command": true, "command": "capture", "recognized_name": "abcdefghijklmnopqrstuvwxyz0123456789"}"#,
        );
        assert_eq!(
            cmd.recognized_name.as_deref(),
            Some("abcdefghijklmnopqrstuvwxyz012345")
        );
    }

    #[test]
    fn numeric_timestamp_is_kept() {
        let cmd = pending(r#"{"has_command": true, "command": "lock_door", "timestamp": 1718000000}"#);
        assert_eq!(cmd.command, DoorCommand::LockDoor);
        assert_eq!(cmd.issued_at, Some(1718000000));
    }

    #[test]
    fn extra_members_are_ignored() {
        let cmd = pending(r#"{"message": "ok", "has_command": true, "command": "capture"}"#);
        assert_eq!(cmd.command, DoorCommand::Capture);
    }

    #[test]
    fn unknown_commands_are_rejected() {
        for body in [
            r#"{"has_command": true, "command": "explode"}"#,
            r#"{"has_command": true, "command": "open_door       x"}"#,
            r#"{"has_command": true, "command": "open_door "}"#,
            r#"{"has_command": true, "command": " open_door"}"#,
            r#"{"has_command": true, "command": "open_door\n"}"#,
            r#"{"has_command": true, "command": "open_door_and_keep_it_open"}"#,
        ] {
            assert_eq!(parse_poll(body), Ok(Poll::Rejected(CommandError::Unknown)), "{body}");
        }
        assert_eq!(
            parse_poll(r#"{"has_command": true, "command": null}"#),
            Ok(Poll::Rejected(CommandError::Missing))
        );
    }

    #[test]
    fn malformed_responses() {
        assert_eq!(parse_poll(""), Err(ApiError::Json));
        assert_eq!(parse_poll(r#"{"has_command": "yes"}"#), Err(ApiError::Json));
        assert_eq!(parse_poll(r#"{"has_command": true, "command": 3}"#), Err(ApiError::Json));
        assert_eq!(
            parse_poll(r#"{"has_command": true, "command": "capture", "timestamp": "2025-01-01T00:00:00"}"#),
            Err(ApiError::Json)
        );
    }

    #[test]
    fn bodies() {
        assert_eq!(
            register_body("front-door", "192.168.1.40").unwrap(),
            r#"{"device_id":"front-door","device_type":"esp32_door","ip_address":"192.168.1.40","status":"online"}"#
        );
        assert_eq!(
            ack_body("front-door", 93, AckStatus::Executed).unwrap(),
            r#"{"device_id":"front-door","timestamp":93,"status":"executed"}"#
        );
        assert_eq!(
            ack_body("front-door", 95, AckStatus::Rejected).unwrap(),
            r#"{"device_id":"front-door","timestamp":95,"status":"rejected"}"#
        );
        assert_eq!(
            status_body("front-door", DoorState::Unlocked, 94).unwrap(),
            r#"{"device_id":"front-door","door_status":"unlocked","timestamp":94}"#
        );
        assert_eq!(command_path("front-door").unwrap(), "/door/command/front-door");
    }
}

use core::fmt;
use core::str::FromStr;

use heapless::String;

use crate::NAME_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCommand {
    OpenDoor,
    LockDoor,
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Name does not match any command exactly
    Unknown,
    /// `has_command` set without a command name
    Missing,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown => f.write_str("unknown command"),
            CommandError::Missing => f.write_str("missing command name"),
        }
    }
}

impl DoorCommand {
    pub const fn as_str(self) -> &'static str {
        match self {
            DoorCommand::OpenDoor => "open_door",
            DoorCommand::LockDoor => "lock_door",
            DoorCommand::Capture => "capture",
        }
    }
}

impl FromStr for DoorCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open_door" => Ok(DoorCommand::OpenDoor),
            "lock_door" => Ok(DoorCommand::LockDoor),
            "capture" => Ok(DoorCommand::Capture),
            _ => Err(CommandError::Unknown),
        }
    }
}

impl fmt::Display for DoorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command fetched from the backend that has not been executed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub command: DoorCommand,
    pub recognized_name: Option<String<NAME_MAX>>,
    /// Backend-side creation time, when the backend sends one
    pub issued_at: Option<u64>,
}

/// Result reported to the backend for a polled command. Any of them clears
/// the command from the backend's pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Executed,
    /// Attempted, but the actuator reported an error
    Failed,
    /// Not attempted, the command could not be understood
    Rejected,
}

impl AckStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            AckStatus::Executed => "executed",
            AckStatus::Failed => "failed",
            AckStatus::Rejected => "rejected",
        }
    }

    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => AckStatus::Executed,
            Err(_) => AckStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Locked,
    Unlocked,
}

impl DoorState {
    pub const fn as_str(self) -> &'static str {
        match self {
            DoorState::Locked => "locked",
            DoorState::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

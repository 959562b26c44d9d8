#![cfg_attr(not(test), no_std)]

//! Chip-independent logic for the smart door controller: typed settings,
//! the board pin table, door and camera actuation, the bounded visitor log
//! and the backend wire format.

pub mod actuator;
pub mod api;
pub mod command;
pub mod controller;
pub mod http;
pub mod json;
pub mod pins;
pub mod settings;
pub mod visitor;

/// Compile-time storage size of the visitor log. The configured
/// `max_visitors` must fit in it.
pub const VISITOR_CAPACITY: usize = 256;

/// Maximum stored length of a visitor or recognized name, in bytes.
pub const NAME_MAX: usize = 32;

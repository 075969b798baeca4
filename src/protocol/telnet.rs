//! Telnet option sequence detection.
//!
//! Clients such as `telnet(1)` open a connection by announcing options:
//! `IAC <command> <option>`. The shell does not negotiate; any such triple
//! found at the start of unconsumed input is recognized and dropped without
//! a reply.

use std::fmt;

/// Interpret As Command marker.
pub const IAC: u8 = 0xff;

pub const DONT: u8 = 0xfe;
pub const DO: u8 = 0xfd;
pub const WONT: u8 = 0xfc;
pub const WILL: u8 = 0xfb;

pub const OPT_BINARY: u8 = 0x00;
pub const OPT_ECHO: u8 = 0x01;
pub const OPT_SGA: u8 = 0x03;
pub const OPT_LINEMODE: u8 = 0x22;

/// A single `IAC <command> <option>` unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelnetOption {
    pub command: u8,
    pub option: u8,
}

impl TelnetOption {
    /// Bytes occupied on the wire, including the IAC marker.
    pub const LEN: usize = 3;

    fn command_name(&self) -> Option<&'static str> {
        match self.command {
            WILL => Some("WILL"),
            WONT => Some("WONT"),
            DO => Some("DO"),
            DONT => Some("DONT"),
            _ => None,
        }
    }

    fn option_name(&self) -> Option<&'static str> {
        match self.option {
            OPT_BINARY => Some("BINARY"),
            OPT_ECHO => Some("ECHO"),
            OPT_SGA => Some("SGA"),
            OPT_LINEMODE => Some("LINEMODE"),
            _ => None,
        }
    }
}

impl fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command_name() {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "{:#04x}", self.command)?,
        }
        match self.option_name() {
            Some(name) => write!(f, " {name}"),
            None => write!(f, " {:#04x}", self.option),
        }
    }
}

/// Detect an option unit at the start of `input`.
///
/// Returns `None` when the first byte is not IAC or fewer than
/// [`TelnetOption::LEN`] bytes are buffered. This is the normal data path,
/// not an error. On `Some`, the caller consumes exactly `TelnetOption::LEN`
/// bytes.
pub fn skip_option(input: &[u8]) -> Option<TelnetOption> {
    match input {
        [IAC, command, option, ..] => Some(TelnetOption {
            command: *command,
            option: *option,
        }),
        _ => None,
    }
}

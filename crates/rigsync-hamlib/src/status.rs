//! Hamlib status codes and their translation into rigsync errors.
//!
//! The C library returns these as negative `int`s; rigctld reports the same
//! numbers on the wire as `RPRT -n`. Both drivers share this table.

use std::fmt;

use rigsync_core::error::{ConnectFailureReason, Error};

/// A non-zero Hamlib return code (stored as its positive value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HamlibStatus {
    InvalidParameter,
    InvalidConfig,
    NoMemory,
    NotImplemented,
    Timeout,
    Io,
    Internal,
    Protocol,
    Rejected,
    Truncated,
    NotAvailable,
    NotTargetable,
    BusError,
    BusBusy,
    InvalidArgument,
    InvalidVfo,
    OutOfDomain,
    Deprecated,
    Security,
    PowerOff,
    Unknown(i32),
}

impl HamlibStatus {
    /// Interpret a raw return value. `0` (and any positive value) is success.
    pub fn check(code: i32) -> Result<(), HamlibStatus> {
        if code >= 0 {
            Ok(())
        } else {
            Err(HamlibStatus::from_code(code))
        }
    }

    /// Map a code, accepting either sign.
    pub fn from_code(code: i32) -> HamlibStatus {
        match code.unsigned_abs() {
            1 => HamlibStatus::InvalidParameter,
            2 => HamlibStatus::InvalidConfig,
            3 => HamlibStatus::NoMemory,
            4 => HamlibStatus::NotImplemented,
            5 => HamlibStatus::Timeout,
            6 => HamlibStatus::Io,
            7 => HamlibStatus::Internal,
            8 => HamlibStatus::Protocol,
            9 => HamlibStatus::Rejected,
            10 => HamlibStatus::Truncated,
            11 => HamlibStatus::NotAvailable,
            12 => HamlibStatus::NotTargetable,
            13 => HamlibStatus::BusError,
            14 => HamlibStatus::BusBusy,
            15 => HamlibStatus::InvalidArgument,
            16 => HamlibStatus::InvalidVfo,
            17 => HamlibStatus::OutOfDomain,
            18 => HamlibStatus::Deprecated,
            19 => HamlibStatus::Security,
            20 => HamlibStatus::PowerOff,
            _ => HamlibStatus::Unknown(code),
        }
    }

    /// The library's own answer to "can this rig do that": not implemented
    /// in the backend, or not available on this model.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            HamlibStatus::NotImplemented | HamlibStatus::NotAvailable | HamlibStatus::Deprecated
        )
    }

    /// Translate into the driver error vocabulary. `context` names the call.
    pub fn into_error(self, context: &str) -> Error {
        match self {
            HamlibStatus::NotImplemented | HamlibStatus::NotAvailable | HamlibStatus::Deprecated => {
                Error::Unsupported(context.to_string())
            }
            HamlibStatus::Timeout => Error::Timeout,
            HamlibStatus::Io | HamlibStatus::Protocol | HamlibStatus::Truncated => {
                Error::Protocol(format!("{context}: {self}"))
            }
            HamlibStatus::OutOfDomain => Error::OutOfRange(format!("{context}: {self}")),
            HamlibStatus::BusError => Error::Transport(format!("{context}: {self}")),
            HamlibStatus::InvalidParameter
            | HamlibStatus::InvalidConfig
            | HamlibStatus::NoMemory
            | HamlibStatus::Internal
            | HamlibStatus::Rejected
            | HamlibStatus::NotTargetable
            | HamlibStatus::BusBusy
            | HamlibStatus::InvalidArgument
            | HamlibStatus::InvalidVfo
            | HamlibStatus::Security
            | HamlibStatus::PowerOff
            | HamlibStatus::Unknown(_) => Error::Rejected(format!("{context}: {self}")),
        }
    }

    /// Translate a failure of the open call itself.
    pub fn into_connect_error(self) -> Error {
        let reason = match self {
            HamlibStatus::BusBusy => ConnectFailureReason::DeviceBusy,
            HamlibStatus::Timeout => ConnectFailureReason::Timeout,
            HamlibStatus::InvalidConfig | HamlibStatus::InvalidParameter => {
                ConnectFailureReason::InvalidProfile(self.to_string())
            }
            HamlibStatus::Io | HamlibStatus::BusError => {
                ConnectFailureReason::Other(format!("cannot open rig port: {self}"))
            }
            other => ConnectFailureReason::Other(other.to_string()),
        };
        Error::Connect(reason)
    }
}

impl fmt::Display for HamlibStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HamlibStatus::InvalidParameter => "invalid parameter",
            HamlibStatus::InvalidConfig => "invalid configuration",
            HamlibStatus::NoMemory => "memory shortage",
            HamlibStatus::NotImplemented => "function not implemented",
            HamlibStatus::Timeout => "communication timed out",
            HamlibStatus::Io => "IO error",
            HamlibStatus::Internal => "internal Hamlib error",
            HamlibStatus::Protocol => "protocol error",
            HamlibStatus::Rejected => "command rejected by the rig",
            HamlibStatus::Truncated => "command performed, but arg truncated",
            HamlibStatus::NotAvailable => "function not available",
            HamlibStatus::NotTargetable => "VFO not targetable",
            HamlibStatus::BusError => "error talking on the bus",
            HamlibStatus::BusBusy => "collision on the bus",
            HamlibStatus::InvalidArgument => "NULL RIG handle or invalid pointer parameter",
            HamlibStatus::InvalidVfo => "invalid VFO",
            HamlibStatus::OutOfDomain => "argument out of domain of function",
            HamlibStatus::Deprecated => "function deprecated",
            HamlibStatus::Security => "security error",
            HamlibStatus::PowerOff => "rig is not powered on",
            HamlibStatus::Unknown(code) => return write!(f, "unknown Hamlib error {code}"),
        };
        f.write_str(s)
    }
}

//! Error types for rigsync.
//!
//! Two layers of errors exist:
//!
//! - [`Error`] is the vocabulary drivers and transports speak. It is rich
//!   enough to carry protocol detail (a Hamlib status code, an XML-RPC fault)
//!   and to let the polling engine classify a failure as transient or fatal.
//! - [`RigError`] is what the facade hands to the rest of the application.
//!   It has exactly five variants; driver-specific vocabularies never leak
//!   past [`RigError::from_driver`].

use std::fmt;

/// The error type for driver and transport operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Establishing the connection failed.
    #[error("connect failed: {0}")]
    Connect(ConnectFailureReason),

    /// Timed out waiting for a response from the rig.
    ///
    /// This typically means the rig is powered off or the control software
    /// in front of it has stalled. The polling engine treats it as transient.
    #[error("timeout waiting for response")]
    Timeout,

    /// The rig (or the daemon in front of it) answered with an explicit error.
    #[error("rig rejected request: {0}")]
    Rejected(String),

    /// The rig refused a value outside its limits, e.g. a frequency outside
    /// its band edges.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// The requested operation is not supported by this rig or profile.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An invalid parameter was passed to a driver or builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A transport-level error (socket, library session, COM bridge).
    #[error("transport error: {0}")]
    Transport(String),

    /// No connection to the rig has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the rig was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// The operation was abandoned because the session is shutting down.
    #[error("operation cancelled")]
    Cancelled,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this failure means the transport is gone for good.
    ///
    /// Fatal errors end the session immediately. Everything else is a
    /// per-query failure the polling engine retries on the next cycle.
    pub fn is_transport_fatal(&self) -> bool {
        matches!(
            self,
            Error::Connect(_)
                | Error::Transport(_)
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a connection attempt failed.
///
/// Reasons are kept distinct where the user-facing remediation differs:
/// "start OmniRig" and "configure a rig in OmniRig" are different dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailureReason {
    /// The remote end refused the connection.
    Refused,
    /// The host name could not be resolved.
    HostNotFound,
    /// No answer within the connect timeout.
    Timeout,
    /// The serial port or rig is held by another program.
    DeviceBusy,
    /// The automation bridge is not installed or not running.
    BridgeNotRunning,
    /// The bridge is running but has no rig configured in the requested slot.
    NoRigConfigured,
    /// The CAT control library could not be loaded.
    LibraryUnavailable(String),
    /// The driver for this profile was not compiled in.
    DriverUnavailable(String),
    /// The profile failed validation.
    InvalidProfile(String),
    /// Anything else, with the underlying message.
    Other(String),
}

impl fmt::Display for ConnectFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectFailureReason::Refused => write!(f, "connection refused"),
            ConnectFailureReason::HostNotFound => write!(f, "host not found"),
            ConnectFailureReason::Timeout => write!(f, "connection timed out"),
            ConnectFailureReason::DeviceBusy => write!(f, "device busy"),
            ConnectFailureReason::BridgeNotRunning => write!(f, "rig bridge is not running"),
            ConnectFailureReason::NoRigConfigured => write!(f, "no rig configured in bridge"),
            ConnectFailureReason::LibraryUnavailable(msg) => {
                write!(f, "CAT library unavailable: {msg}")
            }
            ConnectFailureReason::DriverUnavailable(name) => {
                write!(f, "driver not available: {name}")
            }
            ConnectFailureReason::InvalidProfile(msg) => write!(f, "invalid profile: {msg}"),
            ConnectFailureReason::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Every operation of the driver capability interface.
///
/// Carried by [`RigError`] so consumers know which request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    QueryFrequency,
    QueryMode,
    QueryVfo,
    QueryPtt,
    QuerySplit,
    QueryRit,
    QueryXit,
    QueryPower,
    SetFrequency,
    SetMode,
    SetPtt,
    SendMorse,
    StopMorse,
    SetKeySpeed,
}

impl Operation {
    /// The snake_case name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::QueryFrequency => "query_frequency",
            Operation::QueryMode => "query_mode",
            Operation::QueryVfo => "query_vfo",
            Operation::QueryPtt => "query_ptt",
            Operation::QuerySplit => "query_split",
            Operation::QueryRit => "query_rit",
            Operation::QueryXit => "query_xit",
            Operation::QueryPower => "query_power",
            Operation::SetFrequency => "set_frequency",
            Operation::SetMode => "set_mode",
            Operation::SetPtt => "set_ptt",
            Operation::SendMorse => "send_morse",
            Operation::StopMorse => "stop_morse",
            Operation::SetKeySpeed => "set_key_speed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The errors the rig facade reports to the application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RigError {
    /// No rig is connected, so there is nothing to send the request to.
    #[error("no rig connected")]
    NotConfigured,

    /// `connect()` could not open the rig.
    #[error("cannot connect to rig: {reason}")]
    ConnectFailure { reason: ConnectFailureReason },

    /// The rig or its profile does not support this operation.
    #[error("{operation} is not supported by this rig")]
    CapabilityUnsupported { operation: Operation },

    /// The rig refused or failed to carry out the request.
    #[error("rig rejected {operation}: {detail}")]
    CommandRejected { operation: Operation, detail: String },

    /// The transport to the rig is gone; the connection is closed.
    #[error("connection to rig lost")]
    TransportLost,
}

impl RigError {
    /// Translate a driver failure for `operation` into the facade taxonomy.
    pub fn from_driver(operation: Operation, err: Error) -> RigError {
        match err {
            Error::Connect(reason) if operation == Operation::Open => {
                RigError::ConnectFailure { reason }
            }
            Error::Unsupported(_) => RigError::CapabilityUnsupported { operation },
            Error::Timeout => RigError::CommandRejected {
                operation,
                detail: "no response from rig".into(),
            },
            Error::Rejected(detail)
            | Error::OutOfRange(detail)
            | Error::Protocol(detail)
            | Error::InvalidParameter(detail) => RigError::CommandRejected { operation, detail },
            Error::Cancelled => RigError::NotConfigured,
            other if operation == Operation::Open => RigError::ConnectFailure {
                reason: ConnectFailureReason::Other(other.to_string()),
            },
            Error::Connect(_)
            | Error::Transport(_)
            | Error::NotConnected
            | Error::ConnectionLost
            | Error::Io(_) => RigError::TransportLost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_rejected() {
        let e = Error::Rejected("RPRT -9".into());
        assert_eq!(e.to_string(), "rig rejected request: RPRT -9");
    }

    #[test]
    fn error_display_connect() {
        let e = Error::Connect(ConnectFailureReason::BridgeNotRunning);
        assert_eq!(e.to_string(), "connect failed: rig bridge is not running");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
        assert_send::<RigError>();
        assert_sync::<RigError>();
    }

    #[test]
    fn fatal_classification() {
        assert!(Error::ConnectionLost.is_transport_fatal());
        assert!(Error::NotConnected.is_transport_fatal());
        assert!(Error::Transport("gone".into()).is_transport_fatal());
        assert!(!Error::Timeout.is_transport_fatal());
        assert!(!Error::Rejected("no".into()).is_transport_fatal());
        assert!(!Error::Unsupported("rit".into()).is_transport_fatal());
        assert!(!Error::Protocol("garbled".into()).is_transport_fatal());
    }

    #[test]
    fn operation_names_are_snake_case() {
        assert_eq!(Operation::SendMorse.to_string(), "send_morse");
        assert_eq!(Operation::QueryFrequency.to_string(), "query_frequency");
        assert_eq!(Operation::SetKeySpeed.to_string(), "set_key_speed");
    }

    // ===============================================================
    // Driver to facade mapping
    // ===============================================================

    #[test]
    fn unsupported_maps_to_capability_unsupported() {
        let e = RigError::from_driver(Operation::SendMorse, Error::Unsupported("cw".into()));
        assert_eq!(
            e,
            RigError::CapabilityUnsupported {
                operation: Operation::SendMorse
            }
        );
    }

    #[test]
    fn out_of_range_maps_to_command_rejected() {
        let e = RigError::from_driver(
            Operation::SetFrequency,
            Error::OutOfRange("99 GHz".into()),
        );
        assert_eq!(
            e,
            RigError::CommandRejected {
                operation: Operation::SetFrequency,
                detail: "99 GHz".into()
            }
        );
    }

    #[test]
    fn timeout_maps_to_command_rejected() {
        let e = RigError::from_driver(Operation::SetMode, Error::Timeout);
        assert!(matches!(
            e,
            RigError::CommandRejected {
                operation: Operation::SetMode,
                ..
            }
        ));
    }

    #[test]
    fn transport_failures_map_to_transport_lost() {
        for err in [
            Error::ConnectionLost,
            Error::NotConnected,
            Error::Transport("reset".into()),
            Error::Io(std::io::Error::other("boom")),
        ] {
            assert_eq!(
                RigError::from_driver(Operation::QueryPtt, err),
                RigError::TransportLost
            );
        }
    }

    #[test]
    fn open_failures_map_to_connect_failure() {
        let e = RigError::from_driver(
            Operation::Open,
            Error::Connect(ConnectFailureReason::Refused),
        );
        assert_eq!(
            e,
            RigError::ConnectFailure {
                reason: ConnectFailureReason::Refused
            }
        );

        let e = RigError::from_driver(Operation::Open, Error::ConnectionLost);
        assert!(matches!(e, RigError::ConnectFailure { .. }));
    }

    #[test]
    fn rig_error_display() {
        let e = RigError::CapabilityUnsupported {
            operation: Operation::SendMorse,
        };
        assert_eq!(e.to_string(), "send_morse is not supported by this rig");
        let e = RigError::ConnectFailure {
            reason: ConnectFailureReason::NoRigConfigured,
        };
        assert_eq!(
            e.to_string(),
            "cannot connect to rig: no rig configured in bridge"
        );
    }
}

//! rigsync-core: traits, types, and error definitions shared by every
//! rigsync crate.
//!
//! Protocol drivers implement [`RigDriver`] in terms of these types; the
//! `rigsync` facade consumes them without knowing which driver is active.
//!
//! # Key types
//!
//! - [`RigDriver`] -- the capability interface every driver implements
//! - [`RigState`] / [`ChangedFields`] -- the normalized state snapshot
//! - [`RigProfile`] -- what to connect to and how to poll it
//! - [`RigEvent`] -- notifications published by the facade
//! - [`Error`] / [`RigError`] -- driver-level and application-level errors

pub mod band;
pub mod driver;
pub mod error;
pub mod events;
pub mod helpers;
pub mod profile;
pub mod state;
pub mod transport;
pub mod types;

pub use band::{Band, BandRange, ParseBandError};
pub use driver::RigDriver;
pub use error::{ConnectFailureReason, Error, Operation, Result, RigError};
pub use events::{RigEvent, StateChange};
pub use helpers::format_freq_mhz;
pub use profile::{Capabilities, Connection, DriverKind, PollFields, RigProfile, SerialParams};
pub use state::{ChangedFields, RigState};
pub use transport::{Connector, Transport};
pub use types::{ConnectionState, Mode, ParseModeError, Vfo};

//! Notifications published by the rig facade.
//!
//! Every state notification carries the full new snapshot plus the set of
//! fields that differ from the previous one, so a consumer that only cares
//! about frequency can ignore everything else without keeping its own copy.

use crate::error::RigError;
use crate::state::{ChangedFields, RigState};

/// A confirmed change of the rig state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub state: RigState,
    pub changed: ChangedFields,
}

impl StateChange {
    /// Whether any of `fields` changed.
    pub fn touches(&self, fields: ChangedFields) -> bool {
        self.changed.intersects(fields)
    }
}

/// An event emitted by the facade.
#[derive(Debug, Clone, PartialEq)]
pub enum RigEvent {
    /// The snapshot changed.
    StateChanged(StateChange),

    /// A failure that ended or prevented a connection.
    Error(RigError),
}

//! rigsync-omnirig: rig control through a running OmniRig (Windows).
//!
//! OmniRig is a local automation server that owns the rig's serial port
//! and publishes up to two rigs as `Rig1`/`Rig2`; Omni-Rig V2 publishes up
//! to four. The profile's `model` selects the slot.
//!
//! - [`bridge`]: the property surface and `RigParamX` constants
//! - [`OmniRigDriver`]: the [`RigDriver`](rigsync_core::RigDriver)
//!
//! On other platforms the driver builds, but every `open()` fails with
//! `BridgeNotRunning`.

pub mod bridge;
#[cfg(windows)]
pub mod com;
pub mod rig;

pub use bridge::{OmniRigBridge, RigStatus, ServerVersion};
pub use rig::{BridgeOpener, OFFLINE_GRACE, OmniRigDriver};

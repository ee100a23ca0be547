//! rigsync-flrig: rig control through flrig's XML-RPC server.
//!
//! flrig owns the serial port and exposes the rig as `rig.*` methods over
//! HTTP on port 12345. Requests go out through a [`reqwest`] client built
//! at open; this crate supplies the XML-RPC encoding on top.
//!
//! - [`xmlrpc`]: value model, call encoder, response decoder
//! - [`modes`]: vendor mode spellings
//! - [`FlrigDriver`]: the [`RigDriver`](rigsync_core::RigDriver)

pub mod modes;
pub mod rig;
pub mod xmlrpc;

pub use rig::FlrigDriver;
pub use xmlrpc::Value;

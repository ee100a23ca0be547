//! rigsync-rigctld: rig control through a Hamlib `rigctld` daemon.
//!
//! - [`protocol`]: command builders and reply parsers for the line protocol
//! - [`RigctldDriver`]: the [`RigDriver`](rigsync_core::RigDriver) over TCP
//!
//! # Example
//!
//! ```no_run
//! use rigsync_core::{DriverKind, RigDriver, RigProfile, Vfo};
//! use rigsync_rigctld::RigctldDriver;
//!
//! # async fn example() -> rigsync_core::Result<()> {
//! let profile = RigProfile::builder(DriverKind::Rigctld)
//!     .network("localhost", 4532)
//!     .build()?;
//! let mut rig = RigctldDriver::new();
//! rig.open(&profile).await?;
//! println!("{} Hz", rig.query_frequency(Vfo::Current).await?);
//! # Ok(())
//! # }
//! ```

pub mod protocol;
pub mod rig;

pub use rig::{MAX_RECONNECT_ATTEMPTS, RigctldDriver};

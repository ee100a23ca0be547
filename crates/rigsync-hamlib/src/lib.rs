//! rigsync-hamlib: rig control through the Hamlib CAT library.
//!
//! The library is loaded at runtime; hosts without it get a
//! `ConnectFailure` with [`LibraryUnavailable`](rigsync_core::ConnectFailureReason::LibraryUnavailable)
//! instead of a link error. [`HamlibStatus`] is also used by the `rigctld`
//! driver, which reports the same status codes over the network.
//!
//! # Example
//!
//! ```no_run
//! use rigsync_core::{DriverKind, RigDriver, RigProfile, SerialParams, Vfo};
//! use rigsync_hamlib::HamlibDriver;
//!
//! # async fn example() -> rigsync_core::Result<()> {
//! let profile = RigProfile::builder(DriverKind::Hamlib)
//!     .model(1035) // FT-991
//!     .serial(SerialParams::new("/dev/ttyUSB0"))
//!     .build()?;
//! let mut rig = HamlibDriver::new();
//! rig.open(&profile).await?;
//! let hz = rig.query_frequency(Vfo::Current).await?;
//! # Ok(())
//! # }
//! ```

pub mod ffi;
pub mod mode;
pub mod rig;
pub mod session;
pub mod status;

pub use mode::{mode_from_hamlib, mode_to_hamlib};
pub use rig::{HamlibDriver, SessionOpener};
pub use session::{CatResult, CatSession, LibrarySession};
pub use status::HamlibStatus;

//! # rigsync -- Rig Control for Amateur Radio Logging
//!
//! `rigsync` keeps an application in step with the transceiver on the
//! operating desk. It connects through one of several rig-control back
//! ends, polls the rig on a fixed cadence, and publishes a normalized
//! [`RigState`] snapshot plus change events. Commands (tune, change mode,
//! key the transmitter, send CW) go through the same connection.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! rigsync = { version = "0.1", features = ["rigctld"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ```no_run
//! use rigsync::{DriverKind, RigControl, RigProfile, Vfo};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let profile = RigProfile::builder(DriverKind::Rigctld)
//!         .name("IC-7300")
//!         .network("localhost", 4532)
//!         .build()?;
//!
//!     let rig = RigControl::new();
//!     rig.connect(profile).await?;
//!     rig.set_frequency(Vfo::Current, 14_025_000).await?;
//!     println!("{:?}", rig.current_state());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                 | Purpose                                            |
//! |-----------------------|----------------------------------------------------|
//! | `rigsync-core`        | [`RigDriver`] trait, [`RigState`], profiles, errors |
//! | `rigsync-transport`   | TCP connector, line framing, blocking sessions     |
//! | `rigsync-hamlib`      | Hamlib loaded at runtime                           |
//! | `rigsync-rigctld`     | rigctld network daemon                             |
//! | `rigsync-flrig`       | flrig XML-RPC                                      |
//! | `rigsync-omnirig`     | OmniRig COM bridge (Windows)                       |
//! | **`rigsync`**         | This facade: [`RigControl`] and the polling engine |
//!
//! ## Feature Flags
//!
//! | Feature   | Enables                   | Default |
//! |-----------|---------------------------|---------|
//! | `hamlib`  | [`hamlib`] driver         | yes     |
//! | `rigctld` | [`rigctld`] driver        | yes     |
//! | `flrig`   | [`flrig`] driver          | yes     |
//! | `omnirig` | [`omnirig`] driver        | yes     |
//!
//! ## Events
//!
//! [`RigControl::subscribe`] hands out a receiver of [`RigEvent`]s. Each
//! subscriber sees every event in publication order:
//!
//! ```no_run
//! use rigsync::{ChangedFields, RigControl, RigEvent};
//! # async fn example(rig: &RigControl) {
//! let mut events = rig.subscribe();
//! while let Some(event) = events.recv().await {
//!     match event {
//!         RigEvent::StateChanged(change) if change.changed.intersects(ChangedFields::FREQUENCY) => {
//!             println!("{:?} {} Hz", change.state.band(), change.state.transmit_frequency_hz);
//!         }
//!         RigEvent::Error(err) => eprintln!("rig: {err}"),
//!         _ => {}
//!     }
//! }
//! # }
//! ```

mod command;
mod control;
pub mod drivers;
mod engine;
mod hub;

pub use command::RigCommand;
pub use control::RigControl;
pub use rigsync_core::*;

/// Hamlib driver: rig control through the Hamlib shared library.
#[cfg(feature = "hamlib")]
pub mod hamlib {
    pub use rigsync_hamlib::*;
}

/// rigctld driver: Hamlib's network daemon over TCP.
#[cfg(feature = "rigctld")]
pub mod rigctld {
    pub use rigsync_rigctld::*;
}

/// flrig driver: XML-RPC to a running flrig.
#[cfg(feature = "flrig")]
pub mod flrig {
    pub use rigsync_flrig::*;
}

/// OmniRig driver: the OmniRig COM automation server on Windows.
#[cfg(feature = "omnirig")]
pub mod omnirig {
    pub use rigsync_omnirig::*;
}

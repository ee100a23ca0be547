//! Driver selection by [`DriverKind`].
//!
//! Each backend sits behind its feature flag; a profile naming a backend
//! that was compiled out fails to connect with `DriverUnavailable`.

use rigsync_core::driver::RigDriver;
use rigsync_core::error::ConnectFailureReason;
use rigsync_core::profile::DriverKind;

/// A fresh, unopened driver for `kind`.
pub fn create(kind: DriverKind) -> Result<Box<dyn RigDriver>, ConnectFailureReason> {
    match kind {
        #[cfg(feature = "hamlib")]
        DriverKind::Hamlib => Ok(Box::new(rigsync_hamlib::HamlibDriver::new())),

        #[cfg(feature = "rigctld")]
        DriverKind::Rigctld => Ok(Box::new(rigsync_rigctld::RigctldDriver::new())),

        #[cfg(feature = "flrig")]
        DriverKind::Flrig => Ok(Box::new(rigsync_flrig::FlrigDriver::new())),

        #[cfg(feature = "omnirig")]
        DriverKind::OmniRig => Ok(Box::new(rigsync_omnirig::OmniRigDriver::new())),

        #[cfg(feature = "omnirig")]
        DriverKind::OmniRigV2 => Ok(Box::new(rigsync_omnirig::OmniRigDriver::v2())),

        #[allow(unreachable_patterns)]
        other => Err(ConnectFailureReason::DriverUnavailable(format!(
            "rigsync was built without the `{}` feature",
            feature(other)
        ))),
    }
}

/// The cargo feature that compiles in the backend for `kind`.
fn feature(kind: DriverKind) -> &'static str {
    match kind {
        DriverKind::OmniRig | DriverKind::OmniRigV2 => "omnirig",
        other => other.name(),
    }
}

/// Backends compiled into this build.
pub fn available() -> Vec<DriverKind> {
    let mut kinds = Vec::new();

    #[cfg(feature = "hamlib")]
    kinds.push(DriverKind::Hamlib);

    #[cfg(feature = "rigctld")]
    kinds.push(DriverKind::Rigctld);

    #[cfg(feature = "flrig")]
    kinds.push(DriverKind::Flrig);

    #[cfg(feature = "omnirig")]
    kinds.extend([DriverKind::OmniRig, DriverKind::OmniRigV2]);

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_available_kind_builds() {
        for kind in available() {
            let driver = create(kind).unwrap();
            assert_eq!(driver.name(), kind.name());
        }
    }

    #[test]
    fn both_omnirig_servers_share_a_feature() {
        assert_eq!(feature(DriverKind::OmniRigV2), "omnirig");
        assert_eq!(feature(DriverKind::Rigctld), "rigctld");
    }

    #[cfg(not(feature = "omnirig"))]
    #[test]
    fn missing_backend_is_reported() {
        for kind in [DriverKind::OmniRig, DriverKind::OmniRigV2] {
            match create(kind) {
                Err(ConnectFailureReason::DriverUnavailable(message)) => {
                    assert!(message.contains("`omnirig`"), "{message}")
                }
                _ => panic!("{kind} should be unavailable"),
            }
        }
    }
}

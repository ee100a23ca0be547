//! The OmniRig automation server, reached through COM.

use winsafe::{self as w, co, prelude::*};

use rigsync_core::error::{ConnectFailureReason, Error, Result};

use crate::bridge::{OmniRigBridge, ServerVersion};

/// One `RigN` of the running OmniRig, owned by the thread that opened it.
pub struct ComBridge {
    rig: w::IDispatch,
    _omnirig: w::IDispatch,
    // Dropped last: COM stays initialized until both objects are released.
    _com: w::guard::CoUninitializeGuard,
}

impl ComBridge {
    /// Attach to rig `slot` of the `version` server. Must be called on the
    /// thread that will use the bridge.
    pub fn open(version: ServerVersion, slot: u32) -> Result<Self> {
        let prog_id = version.prog_id();
        let com = w::CoInitializeEx(co::COINIT::APARTMENTTHREADED | co::COINIT::DISABLE_OLE1DDE)
            .map_err(|e| connect_error(format!("COM initialization failed: {}", e)))?;

        let clsid = w::CLSIDFromProgID(prog_id).map_err(|e| {
            tracing::debug!("{} is not registered: {}", prog_id, e);
            Error::Connect(ConnectFailureReason::BridgeNotRunning)
        })?;
        let omnirig: w::IDispatch =
            w::CoCreateInstance(&clsid, None::<&mut w::IUnknown>, co::CLSCTX::LOCAL_SERVER)
                .map_err(|e| {
                    tracing::debug!(prog_id, "Cannot start OmniRig: {}", e);
                    Error::Connect(ConnectFailureReason::BridgeNotRunning)
                })?;

        let name = format!("Rig{slot}");
        let rig = omnirig
            .invoke_get(&name, &[])
            .map_err(|e| connect_error(format!("cannot get {name}: {}", e)))?
            .idispatch()
            .ok_or_else(|| connect_error(format!("{name} is not an automation object")))?;

        Ok(ComBridge {
            rig,
            _omnirig: omnirig,
            _com: com,
        })
    }
}

fn connect_error(message: String) -> Error {
    Error::Connect(ConnectFailureReason::Other(message))
}

/// A failed call into the out-of-process server means it went away.
fn call_error(property: &str, e: impl std::fmt::Display) -> Error {
    Error::Transport(format!("OmniRig {property}: {}", e))
}

impl OmniRigBridge for ComBridge {
    fn get(&mut self, property: &str) -> Result<i32> {
        let value = self
            .rig
            .invoke_get(property, &[])
            .map_err(|e| call_error(property, e))?;
        value
            .i32()
            .ok_or_else(|| Error::Protocol(format!("OmniRig {property} is not an integer")))
    }

    fn put(&mut self, property: &str, value: i32) -> Result<()> {
        self.rig
            .invoke_put(property, &w::VARIANT::new_i32(value))
            .map_err(|e| call_error(property, e))
    }

    fn text(&mut self, property: &str) -> Result<String> {
        let value = self
            .rig
            .invoke_get(property, &[])
            .map_err(|e| call_error(property, e))?;
        Ok(value.bstr().unwrap_or_default())
    }
}

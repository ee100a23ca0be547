//! Blocking CAT sessions.
//!
//! [`CatSession`] is the slice of the Hamlib API the driver uses, expressed
//! with Rust types. [`LibrarySession`] implements it over the loaded C
//! library; tests substitute their own implementation. Every method blocks,
//! so sessions only ever run inside a
//! [`BlockingSession`](rigsync_transport::BlockingSession) thread.

use std::ffi::{CStr, CString, c_int, c_long, c_uint};
use std::ptr::NonNull;

use rigsync_core::error::{ConnectFailureReason, Error, Result};
use rigsync_core::profile::{Connection, DataBits, FlowControl, Parity, RigProfile, StopBits};

use crate::ffi::{self, HamlibLib, RigHandle, rmode_t, setting_t, value_t, vfo_t};
use crate::status::HamlibStatus;

/// Result of one library call.
pub type CatResult<T> = std::result::Result<T, HamlibStatus>;

/// One opened rig.
pub trait CatSession {
    fn get_freq(&mut self, vfo: vfo_t) -> CatResult<f64>;
    fn set_freq(&mut self, vfo: vfo_t, hz: f64) -> CatResult<()>;
    /// Mode bits and passband width.
    fn get_mode(&mut self, vfo: vfo_t) -> CatResult<(rmode_t, i64)>;
    /// Set the mode, leaving the passband alone.
    fn set_mode(&mut self, vfo: vfo_t, mode: rmode_t) -> CatResult<()>;
    fn get_vfo(&mut self) -> CatResult<vfo_t>;
    fn get_ptt(&mut self, vfo: vfo_t) -> CatResult<bool>;
    fn set_ptt(&mut self, vfo: vfo_t, on: bool) -> CatResult<()>;
    /// Split state and transmit VFO.
    fn get_split(&mut self, vfo: vfo_t) -> CatResult<(bool, vfo_t)>;
    fn get_rit(&mut self, vfo: vfo_t) -> CatResult<i64>;
    fn get_xit(&mut self, vfo: vfo_t) -> CatResult<i64>;
    fn has_get_level(&mut self, level: setting_t) -> bool;
    fn has_set_level(&mut self, level: setting_t) -> bool;
    /// Read a float level (0.0 ..= 1.0 for RFPOWER).
    fn get_level_f(&mut self, vfo: vfo_t, level: setting_t) -> CatResult<f32>;
    fn set_level_i(&mut self, vfo: vfo_t, level: setting_t, value: i32) -> CatResult<()>;
    /// Convert a relative power setting to milliwatts for this rig.
    fn power_to_mw(&mut self, power: f32, freq_hz: f64, mode: rmode_t) -> CatResult<u32>;
    fn send_morse(&mut self, vfo: vfo_t, text: &str) -> CatResult<()>;
    fn stop_morse(&mut self, vfo: vfo_t) -> CatResult<()>;
}

/// A rig opened through the Hamlib C library.
pub struct LibrarySession {
    lib: &'static HamlibLib,
    rig: NonNull<std::ffi::c_void>,
}

impl LibrarySession {
    /// Load the library, configure the port from `profile`, and open the rig.
    pub fn open(profile: &RigProfile) -> Result<Self> {
        let lib = ffi::library().ok_or_else(|| {
            Error::Connect(ConnectFailureReason::LibraryUnavailable(
                "libhamlib could not be loaded".into(),
            ))
        })?;

        // SAFETY: rig_init only reads the model number.
        let handle = unsafe { (lib.rig_init)(profile.model) };
        let rig = NonNull::new(handle).ok_or_else(|| {
            Error::Connect(ConnectFailureReason::InvalidProfile(format!(
                "unknown Hamlib model {}",
                profile.model
            )))
        })?;
        let session = LibrarySession { lib, rig };

        for (name, value) in port_settings(&profile.connection)? {
            session.set_conf(name, &value)?;
        }

        // SAFETY: rig is a live handle from rig_init.
        let code = unsafe { (lib.rig_open)(session.handle()) };
        if let Err(status) = HamlibStatus::check(code) {
            tracing::warn!(
                model = profile.model,
                "rig_open failed: {}",
                session.describe(code)
            );
            // Dropping `session` runs rig_cleanup; rig_close on an unopened
            // rig is rejected harmlessly.
            return Err(status.into_connect_error());
        }

        tracing::info!(
            model = profile.model,
            library = lib.name,
            "Hamlib rig opened"
        );
        Ok(session)
    }

    fn handle(&self) -> RigHandle {
        self.rig.as_ptr()
    }

    fn set_conf(&self, name: &str, value: &str) -> Result<()> {
        let cname = CString::new(name)
            .map_err(|_| Error::InvalidParameter(format!("bad config name {name:?}")))?;
        let cvalue = CString::new(value)
            .map_err(|_| Error::InvalidParameter(format!("bad value for {name}: {value:?}")))?;
        // SAFETY: both strings outlive the calls; rig is live.
        let token = unsafe { (self.lib.rig_token_lookup)(self.handle(), cname.as_ptr()) };
        if token == 0 {
            return Err(Error::Connect(ConnectFailureReason::InvalidProfile(format!(
                "Hamlib has no config option {name}"
            ))));
        }
        let code = unsafe { (self.lib.rig_set_conf)(self.handle(), token, cvalue.as_ptr()) };
        HamlibStatus::check(code).map_err(|status| {
            Error::Connect(ConnectFailureReason::InvalidProfile(format!(
                "{name}={value}: {status}"
            )))
        })
    }

    fn describe(&self, code: c_int) -> String {
        // SAFETY: rigerror returns a pointer to a static buffer.
        let ptr = unsafe { (self.lib.rigerror)(code) };
        if ptr.is_null() {
            return HamlibStatus::from_code(code).to_string();
        }
        unsafe { CStr::from_ptr(ptr) }
            .to_string_lossy()
            .trim()
            .to_string()
    }
}

impl Drop for LibrarySession {
    fn drop(&mut self) {
        // SAFETY: the handle is live until rig_cleanup frees it.
        unsafe {
            (self.lib.rig_close)(self.handle());
            (self.lib.rig_cleanup)(self.handle());
        }
        tracing::debug!("Hamlib rig closed");
    }
}

/// `rig_set_conf` options for the profile's connection.
fn port_settings(connection: &Connection) -> Result<Vec<(&'static str, String)>> {
    match connection {
        Connection::Serial(params) => Ok(vec![
            ("rig_pathname", params.port.clone()),
            ("serial_speed", params.baud_rate.to_string()),
            (
                "data_bits",
                match params.data_bits {
                    DataBits::Seven => "7",
                    DataBits::Eight => "8",
                }
                .into(),
            ),
            (
                "stop_bits",
                match params.stop_bits {
                    StopBits::One => "1",
                    StopBits::Two => "2",
                }
                .into(),
            ),
            (
                "serial_parity",
                match params.parity {
                    Parity::None => "None",
                    Parity::Odd => "Odd",
                    Parity::Even => "Even",
                    Parity::Mark => "Mark",
                    Parity::Space => "Space",
                }
                .into(),
            ),
            (
                "serial_handshake",
                match params.flow_control {
                    FlowControl::None => "None",
                    FlowControl::Software => "XONXOFF",
                    FlowControl::Hardware => "Hardware",
                }
                .into(),
            ),
        ]),
        Connection::Network { host, port } => Ok(vec![("rig_pathname", format!("{host}:{port}"))]),
        Connection::Local => Err(Error::Connect(ConnectFailureReason::InvalidProfile(
            "Hamlib needs a serial or network connection".into(),
        ))),
    }
}

impl CatSession for LibrarySession {
    fn get_freq(&mut self, vfo: vfo_t) -> CatResult<f64> {
        let mut freq = 0.0;
        HamlibStatus::check(unsafe { (self.lib.rig_get_freq)(self.handle(), vfo, &mut freq) })?;
        Ok(freq)
    }

    fn set_freq(&mut self, vfo: vfo_t, hz: f64) -> CatResult<()> {
        HamlibStatus::check(unsafe { (self.lib.rig_set_freq)(self.handle(), vfo, hz) })
    }

    fn get_mode(&mut self, vfo: vfo_t) -> CatResult<(rmode_t, i64)> {
        let mut mode: rmode_t = 0;
        let mut width: c_long = 0;
        HamlibStatus::check(unsafe {
            (self.lib.rig_get_mode)(self.handle(), vfo, &mut mode, &mut width)
        })?;
        Ok((mode, i64::from(width)))
    }

    fn set_mode(&mut self, vfo: vfo_t, mode: rmode_t) -> CatResult<()> {
        HamlibStatus::check(unsafe {
            (self.lib.rig_set_mode)(self.handle(), vfo, mode, ffi::RIG_PASSBAND_NOCHANGE)
        })
    }

    fn get_vfo(&mut self) -> CatResult<vfo_t> {
        let mut vfo: vfo_t = 0;
        HamlibStatus::check(unsafe { (self.lib.rig_get_vfo)(self.handle(), &mut vfo) })?;
        Ok(vfo)
    }

    fn get_ptt(&mut self, vfo: vfo_t) -> CatResult<bool> {
        let mut ptt: c_int = 0;
        HamlibStatus::check(unsafe { (self.lib.rig_get_ptt)(self.handle(), vfo, &mut ptt) })?;
        Ok(ptt != 0)
    }

    fn set_ptt(&mut self, vfo: vfo_t, on: bool) -> CatResult<()> {
        HamlibStatus::check(unsafe {
            (self.lib.rig_set_ptt)(self.handle(), vfo, c_int::from(on))
        })
    }

    fn get_split(&mut self, vfo: vfo_t) -> CatResult<(bool, vfo_t)> {
        let mut split: c_int = 0;
        let mut tx_vfo: vfo_t = 0;
        HamlibStatus::check(unsafe {
            (self.lib.rig_get_split_vfo)(self.handle(), vfo, &mut split, &mut tx_vfo)
        })?;
        Ok((split != 0, tx_vfo))
    }

    fn get_rit(&mut self, vfo: vfo_t) -> CatResult<i64> {
        let mut rit: c_long = 0;
        HamlibStatus::check(unsafe { (self.lib.rig_get_rit)(self.handle(), vfo, &mut rit) })?;
        Ok(i64::from(rit))
    }

    fn get_xit(&mut self, vfo: vfo_t) -> CatResult<i64> {
        let mut xit: c_long = 0;
        HamlibStatus::check(unsafe { (self.lib.rig_get_xit)(self.handle(), vfo, &mut xit) })?;
        Ok(i64::from(xit))
    }

    fn has_get_level(&mut self, level: setting_t) -> bool {
        unsafe { (self.lib.rig_has_get_level)(self.handle(), level) & level != 0 }
    }

    fn has_set_level(&mut self, level: setting_t) -> bool {
        unsafe { (self.lib.rig_has_set_level)(self.handle(), level) & level != 0 }
    }

    fn get_level_f(&mut self, vfo: vfo_t, level: setting_t) -> CatResult<f32> {
        let mut value = value_t::zeroed();
        HamlibStatus::check(unsafe {
            (self.lib.rig_get_level)(self.handle(), vfo, level, &mut value)
        })?;
        // SAFETY: float levels fill the `f` member.
        Ok(unsafe { value.f })
    }

    fn set_level_i(&mut self, vfo: vfo_t, level: setting_t, value: i32) -> CatResult<()> {
        HamlibStatus::check(unsafe {
            (self.lib.rig_set_level)(self.handle(), vfo, level, value_t::int(value))
        })
    }

    fn power_to_mw(&mut self, power: f32, freq_hz: f64, mode: rmode_t) -> CatResult<u32> {
        let mut mw: c_uint = 0;
        HamlibStatus::check(unsafe {
            (self.lib.rig_power2mW)(self.handle(), &mut mw, power, freq_hz, mode)
        })?;
        Ok(mw)
    }

    fn send_morse(&mut self, vfo: vfo_t, text: &str) -> CatResult<()> {
        let text = CString::new(text).map_err(|_| HamlibStatus::InvalidParameter)?;
        HamlibStatus::check(unsafe {
            (self.lib.rig_send_morse)(self.handle(), vfo, text.as_ptr())
        })
    }

    fn stop_morse(&mut self, vfo: vfo_t) -> CatResult<()> {
        HamlibStatus::check(unsafe { (self.lib.rig_stop_morse)(self.handle(), vfo) })
    }
}

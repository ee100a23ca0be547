//! Runtime bindings to the Hamlib C library.
//!
//! The library is loaded with `libloading` on first use instead of being
//! linked, so a build without Hamlib installed still runs and the driver
//! reports `LibraryUnavailable` at connect time.

#![allow(non_camel_case_types, non_snake_case)]

use libloading::Library;
use std::ffi::{c_char, c_int, c_long, c_uint, c_void};
use std::sync::OnceLock;

pub type RigHandle = *mut c_void;
pub type vfo_t = c_uint;
pub type freq_t = f64;
pub type rmode_t = u64;
pub type pbwidth_t = c_long;
pub type shortfreq_t = c_long;
pub type setting_t = u64;
pub type token_t = c_long;

/// `value_t` from `rig.h`. Only the `i` and `f` members are used; the
/// padding covers the pointer-carrying members.
#[repr(C)]
#[derive(Clone, Copy)]
pub union value_t {
    pub i: c_int,
    pub f: f32,
    _pad: [usize; 2],
}

impl value_t {
    pub fn zeroed() -> Self {
        value_t { _pad: [0; 2] }
    }

    pub fn int(i: c_int) -> Self {
        let mut v = value_t::zeroed();
        v.i = i;
        v
    }
}

// VFO selectors
pub const RIG_VFO_A: vfo_t = 1 << 0;
pub const RIG_VFO_B: vfo_t = 1 << 1;
pub const RIG_VFO_SUB: vfo_t = 1 << 25;
pub const RIG_VFO_MAIN: vfo_t = 1 << 26;
pub const RIG_VFO_CURR: vfo_t = 1 << 29;

// Levels
pub const RIG_LEVEL_RFPOWER: setting_t = 1 << 12;
pub const RIG_LEVEL_KEYSPD: setting_t = 1 << 14;

pub const RIG_PASSBAND_NOCHANGE: pbwidth_t = -1;

pub const RIG_DEBUG_NONE: c_int = 0;
pub const RIG_DEBUG_ERR: c_int = 2;

#[cfg(target_os = "linux")]
const LIB_NAMES: &[&str] = &["libhamlib.so.4", "libhamlib.so"];

#[cfg(target_os = "macos")]
const LIB_NAMES: &[&str] = &[
    "libhamlib.4.dylib",
    "libhamlib.dylib",
    "/opt/homebrew/lib/libhamlib.dylib",
    "/usr/local/lib/libhamlib.dylib",
];

#[cfg(target_os = "windows")]
const LIB_NAMES: &[&str] = &["libhamlib-4.dll", "hamlib.dll"];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const LIB_NAMES: &[&str] = &["libhamlib.so"];

/// Resolved entry points. The function pointers stay valid for as long as
/// `_lib` is alive, and the only instance lives in a `static`.
pub struct HamlibLib {
    _lib: Library,
    pub name: &'static str,
    pub rig_init: unsafe extern "C" fn(c_uint) -> RigHandle,
    pub rig_open: unsafe extern "C" fn(RigHandle) -> c_int,
    pub rig_close: unsafe extern "C" fn(RigHandle) -> c_int,
    pub rig_cleanup: unsafe extern "C" fn(RigHandle) -> c_int,
    pub rig_set_debug: unsafe extern "C" fn(c_int),
    pub rigerror: unsafe extern "C" fn(c_int) -> *const c_char,
    pub rig_token_lookup: unsafe extern "C" fn(RigHandle, *const c_char) -> token_t,
    pub rig_set_conf: unsafe extern "C" fn(RigHandle, token_t, *const c_char) -> c_int,
    pub rig_get_freq: unsafe extern "C" fn(RigHandle, vfo_t, *mut freq_t) -> c_int,
    pub rig_set_freq: unsafe extern "C" fn(RigHandle, vfo_t, freq_t) -> c_int,
    pub rig_get_mode: unsafe extern "C" fn(RigHandle, vfo_t, *mut rmode_t, *mut pbwidth_t) -> c_int,
    pub rig_set_mode: unsafe extern "C" fn(RigHandle, vfo_t, rmode_t, pbwidth_t) -> c_int,
    pub rig_get_vfo: unsafe extern "C" fn(RigHandle, *mut vfo_t) -> c_int,
    pub rig_get_ptt: unsafe extern "C" fn(RigHandle, vfo_t, *mut c_int) -> c_int,
    pub rig_set_ptt: unsafe extern "C" fn(RigHandle, vfo_t, c_int) -> c_int,
    pub rig_get_split_vfo: unsafe extern "C" fn(RigHandle, vfo_t, *mut c_int, *mut vfo_t) -> c_int,
    pub rig_get_rit: unsafe extern "C" fn(RigHandle, vfo_t, *mut shortfreq_t) -> c_int,
    pub rig_get_xit: unsafe extern "C" fn(RigHandle, vfo_t, *mut shortfreq_t) -> c_int,
    pub rig_has_get_level: unsafe extern "C" fn(RigHandle, setting_t) -> setting_t,
    pub rig_has_set_level: unsafe extern "C" fn(RigHandle, setting_t) -> setting_t,
    pub rig_get_level: unsafe extern "C" fn(RigHandle, vfo_t, setting_t, *mut value_t) -> c_int,
    pub rig_set_level: unsafe extern "C" fn(RigHandle, vfo_t, setting_t, value_t) -> c_int,
    pub rig_power2mW:
        unsafe extern "C" fn(RigHandle, *mut c_uint, f32, freq_t, rmode_t) -> c_int,
    pub rig_send_morse: unsafe extern "C" fn(RigHandle, vfo_t, *const c_char) -> c_int,
    pub rig_stop_morse: unsafe extern "C" fn(RigHandle, vfo_t) -> c_int,
}

static HAMLIB: OnceLock<Option<HamlibLib>> = OnceLock::new();

/// The loaded library, or `None` if no candidate could be opened or a
/// symbol is missing. The lookup happens once per process.
pub fn library() -> Option<&'static HamlibLib> {
    HAMLIB.get_or_init(load).as_ref()
}

/// Copy a function pointer out of the library.
macro_rules! sym {
    ($lib:expr, $name:literal) => {
        // SAFETY: the signature matches the declaration in Hamlib's rig.h.
        *unsafe { $lib.get(concat!($name, "\0").as_bytes()) }
            .map_err(|e| tracing::warn!(symbol = $name, "Hamlib symbol missing: {}", e))
            .ok()?
    };
}

fn load() -> Option<HamlibLib> {
    for &name in LIB_NAMES {
        // SAFETY: loading Hamlib runs no initialisers with preconditions.
        let lib = match unsafe { Library::new(name) } {
            Ok(lib) => lib,
            Err(e) => {
                tracing::debug!(library = %name, "Cannot load Hamlib: {}", e);
                continue;
            }
        };

        let loaded = HamlibLib {
            name,
            rig_init: sym!(lib, "rig_init"),
            rig_open: sym!(lib, "rig_open"),
            rig_close: sym!(lib, "rig_close"),
            rig_cleanup: sym!(lib, "rig_cleanup"),
            rig_set_debug: sym!(lib, "rig_set_debug"),
            rigerror: sym!(lib, "rigerror"),
            rig_token_lookup: sym!(lib, "rig_token_lookup"),
            rig_set_conf: sym!(lib, "rig_set_conf"),
            rig_get_freq: sym!(lib, "rig_get_freq"),
            rig_set_freq: sym!(lib, "rig_set_freq"),
            rig_get_mode: sym!(lib, "rig_get_mode"),
            rig_set_mode: sym!(lib, "rig_set_mode"),
            rig_get_vfo: sym!(lib, "rig_get_vfo"),
            rig_get_ptt: sym!(lib, "rig_get_ptt"),
            rig_set_ptt: sym!(lib, "rig_set_ptt"),
            rig_get_split_vfo: sym!(lib, "rig_get_split_vfo"),
            rig_get_rit: sym!(lib, "rig_get_rit"),
            rig_get_xit: sym!(lib, "rig_get_xit"),
            rig_has_get_level: sym!(lib, "rig_has_get_level"),
            rig_has_set_level: sym!(lib, "rig_has_set_level"),
            rig_get_level: sym!(lib, "rig_get_level"),
            rig_set_level: sym!(lib, "rig_set_level"),
            rig_power2mW: sym!(lib, "rig_power2mW"),
            rig_send_morse: sym!(lib, "rig_send_morse"),
            rig_stop_morse: sym!(lib, "rig_stop_morse"),
            _lib: lib,
        };

        // Hamlib logs to stderr at RIG_DEBUG_WARN by default.
        // SAFETY: plain setter on a global.
        unsafe { (loaded.rig_set_debug)(RIG_DEBUG_ERR) };
        tracing::info!("Loaded Hamlib library: {}", name);
        return Some(loaded);
    }

    tracing::info!("Hamlib library not found (tried {})", LIB_NAMES.join(", "));
    None
}

//! Library-Load Guard.
//!
//! Desktop integration libraries loaded at runtime via `dlopen()` must look
//! "not installed" so the host takes its existing fallback path instead of
//! popping an error dialog about services that are unreachable from the
//! sandbox.

use libc::{c_char, c_int, c_void};
use std::ffi::CStr;

use crate::reals::DlopenFn;
use tbstub_config::log_stub_info;

pub const FORBIDDEN_PREFIXES: [&[u8]; 2] = [b"libgnomeui", b"libgconf"];

pub fn is_blocked(name: &CStr) -> bool {
    let name = name.to_bytes();
    FORBIDDEN_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Shadow of `dlopen(3)`. A null name is the main program; it passes.
pub unsafe fn dlopen(real: DlopenFn, name: *const c_char, flags: c_int) -> *mut c_void {
    if !name.is_null() {
        let library = CStr::from_ptr(name);
        if is_blocked(library) {
            let library = library.to_string_lossy();
            log_stub_info!("dlopen suppressed", library = &*library);
            return std::ptr::null_mut();
        }
    }
    real(name, flags)
}

//! Capability-Probe Patch for `XQueryExtension`.
//!
//! The host copes fine with MIT-SHM being absent, but not with it being
//! present and unusable, which is what a sandbox without shared SysV memory
//! looks like. So the extension is reported as missing.

use libc::{c_char, c_int, c_void};
use std::ffi::CStr;

use crate::reals::XQueryExtensionFn;
use tbstub_config::log_stub_info;

pub const SUPPRESSED_EXTENSION: &CStr = c"MIT-SHM";
/// Library the real `XQueryExtension` is resolved from.
pub const XEXT_LIBRARY: &CStr = c"libXext.so.6";
pub const X_QUERY_EXTENSION: &CStr = c"XQueryExtension";

const FALSE: c_int = 0;

/// Shadow of `XQueryExtension(3)`.
pub unsafe fn query_extension(
    real: XQueryExtensionFn,
    display: *mut c_void,
    name: *const c_char,
    major_opcode: *mut c_int,
    first_event: *mut c_int,
    first_error: *mut c_int,
) -> c_int {
    if !name.is_null() && CStr::from_ptr(name) == SUPPRESSED_EXTENSION {
        if !major_opcode.is_null() {
            *major_opcode = 0;
        }
        log_stub_info!("extension hidden", extension = "MIT-SHM");
        return FALSE;
    }
    real(display, name, major_opcode, first_event, first_error)
}

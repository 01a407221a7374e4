//! Platform Mutex Patch for PulseAudio's `pa_mutex_new`.
//!
//! Where the sandbox filters `futex(2)` by argument, priority-inheritance
//! futex ops are rejected. libpulsecore decides whether to use PI mutexes at
//! build time, so the only place to turn it off is the constructor call.
//!
//! 32-bit x86 cannot filter syscalls by argument; this module is not built
//! there.

use libc::c_int;
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::reals::{DlopenFn, Library, Linker, ResolveError};
use tbstub_config::log_stub_debug;

pub const PULSECORE_GLOB: &str = "/usr/lib/pulseaudio/libpulsecore-*.so";
pub const PA_MUTEX_NEW: &CStr = c"pa_mutex_new";
const OPEN_FLAGS: c_int = libc::RTLD_LAZY | libc::RTLD_LOCAL;

/// Opaque `pa_mutex`.
#[repr(C)]
pub struct PaMutex {
    _private: [u8; 0],
}

/// `pa_mutex *pa_mutex_new(bool recursive, bool inherit_priority)`
pub type PaMutexNewFn = unsafe extern "C" fn(bool, bool) -> *mut PaMutex;

/// First non-directory path matching `pattern`, in glob order.
pub fn find_library(pattern: &str) -> Result<PathBuf, ResolveError> {
    let paths = glob::glob(pattern).map_err(|e| ResolveError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    paths
        .filter_map(Result::ok)
        .find(|path| !path.is_dir())
        .ok_or_else(|| ResolveError::NoMatch {
            pattern: pattern.to_string(),
        })
}

/// Locate libpulsecore, resolve the real constructor and release the
/// temporary handle. The host has the library loaded already, so the
/// pointer outlives the `dlclose`.
pub unsafe fn resolve_mutex_new(
    linker: &dyn Linker,
    dlopen: DlopenFn,
    pattern: &str,
) -> Result<PaMutexNewFn, ResolveError> {
    let path = find_library(pattern)?;
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| ResolveError::Library {
        library: path.display().to_string(),
        reason: "path contains a NUL byte".to_string(),
    })?;

    let library = Library::open(linker, dlopen, &c_path, OPEN_FLAGS)?;
    let real = library.resolve::<PaMutexNewFn>(PA_MUTEX_NEW);
    log_stub_debug!("pa_mutex_new resolved", library = library.name(), ok = real.is_ok());
    library.close();
    real
}

/// Shadow of `pa_mutex_new`: never ask for priority inheritance.
pub unsafe fn mutex_new(real: PaMutexNewFn, recursive: bool, _inherit_priority: bool) -> *mut PaMutex {
    real(recursive, false)
}

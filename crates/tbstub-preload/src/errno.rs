use libc::c_int;
use nix::errno::Errno;

/// Platform-agnostic errno store for refusals decided by the layer.
pub(crate) fn set_errno(errno: Errno) {
    #[cfg(target_os = "linux")]
    unsafe {
        *libc::__errno_location() = errno as c_int;
    }
    #[cfg(target_os = "macos")]
    unsafe {
        *libc::__error() = errno as c_int;
    }
}

/// C convention for a refused call: set errno, return -1.
pub(crate) fn refuse(errno: Errno) -> c_int {
    set_errno(errno);
    -1
}

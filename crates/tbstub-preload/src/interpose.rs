//! Exported shadows. Each one initializes the process state first, then
//! hands the call to its `tbstub_core` counterpart with the resolved reals.

use libc::{c_char, c_int, c_void, sockaddr, socklen_t};

use crate::errno::refuse;
use crate::state;
use tbstub_core::{dl, net, x11};

#[no_mangle]
pub unsafe extern "C" fn connect(fd: c_int, addr: *const sockaddr, len: socklen_t) -> c_int {
    let state = state::get();
    net::connect(&state.net, &state.endpoints, fd, addr, len).unwrap_or_else(refuse)
}

#[no_mangle]
pub unsafe extern "C" fn socket(domain: c_int, ty: c_int, protocol: c_int) -> c_int {
    let state = state::get();
    net::socket(&state.net, domain, ty, protocol).unwrap_or_else(refuse)
}

#[no_mangle]
pub unsafe extern "C" fn dlopen(filename: *const c_char, flags: c_int) -> *mut c_void {
    let state = state::get();
    dl::dlopen(state.dlopen, filename, flags)
}

#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn XQueryExtension(
    display: *mut c_void,
    name: *const c_char,
    major_opcode: *mut c_int,
    first_event: *mut c_int,
    first_error: *mut c_int,
) -> c_int {
    let state = state::get();
    x11::query_extension(
        state.xquery_extension,
        display,
        name,
        major_opcode,
        first_event,
        first_error,
    )
}

#[cfg(not(target_arch = "x86"))]
#[no_mangle]
pub unsafe extern "C" fn pa_mutex_new(
    recursive: bool,
    inherit_priority: bool,
) -> *mut tbstub_core::pulse::PaMutex {
    tbstub_core::pulse::mutex_new(state::pa_mutex_new(), recursive, inherit_priority)
}

//! Test doubles for the resolver and the real entry points.
//!
//! `FakeLinker` answers symbol lookups from in-memory tables and counts
//! `dlsym(RTLD_NEXT, ..)` and `dlclose` calls. It is `Sync`, so one instance
//! can back several racing initializers. The `noop_*` / `fake_*` functions
//! stand in for the real libc and Xlib implementations.

use libc::{c_char, c_int, c_void, sockaddr, socklen_t};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::reals::Linker;

/// Handle returned by [`fake_dlopen`].
pub const FAKE_HANDLE: usize = 0x7b;

#[derive(Default)]
pub struct FakeLinker {
    next: HashMap<CString, usize>,
    library: HashMap<CString, usize>,
    next_lookups: AtomicUsize,
    closed: AtomicUsize,
}

impl FakeLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every symbol the shared initializer needs, backed by no-op doubles.
    pub fn complete() -> Self {
        Self::new()
            .with_next("connect", noop_connect as usize)
            .with_next("socket", noop_socket as usize)
            .with_next("dlopen", fake_dlopen as usize)
            .with_library_symbol("XQueryExtension", noop_xquery as usize)
    }

    /// Register a `dlsym(RTLD_NEXT, name)` answer.
    pub fn with_next(mut self, name: &str, addr: usize) -> Self {
        self.next.insert(c_string(name), addr);
        self
    }

    /// Register a `dlsym(handle, name)` answer, for any handle.
    pub fn with_library_symbol(mut self, name: &str, addr: usize) -> Self {
        self.library.insert(c_string(name), addr);
        self
    }

    pub fn without_next(mut self, name: &str) -> Self {
        self.next.remove(&c_string(name));
        self
    }

    /// Number of `dlsym(RTLD_NEXT, ..)` calls so far, found or not.
    pub fn next_lookups(&self) -> usize {
        self.next_lookups.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

fn c_string(name: &str) -> CString {
    CString::new(name).expect("symbol names have no NUL")
}

impl Linker for FakeLinker {
    unsafe fn next_symbol(&self, name: &CStr) -> *mut c_void {
        self.next_lookups.fetch_add(1, Ordering::SeqCst);
        self.next.get(name).map_or(std::ptr::null_mut(), |&a| a as *mut c_void)
    }

    unsafe fn symbol(&self, _handle: *mut c_void, name: &CStr) -> *mut c_void {
        self.library.get(name).map_or(std::ptr::null_mut(), |&a| a as *mut c_void)
    }

    unsafe fn close(&self, _handle: *mut c_void) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn last_error(&self) -> String {
        "not found in fake linker".to_string()
    }
}

pub unsafe extern "C" fn noop_connect(_fd: c_int, _addr: *const sockaddr, _len: socklen_t) -> c_int {
    0
}

pub unsafe extern "C" fn noop_socket(_domain: c_int, _ty: c_int, _protocol: c_int) -> c_int {
    0
}

pub unsafe extern "C" fn fake_dlopen(_name: *const c_char, _flags: c_int) -> *mut c_void {
    FAKE_HANDLE as *mut c_void
}

pub unsafe extern "C" fn failing_dlopen(_name: *const c_char, _flags: c_int) -> *mut c_void {
    std::ptr::null_mut()
}

/// Reports every extension as present with major opcode 1.
pub unsafe extern "C" fn noop_xquery(
    _display: *mut c_void,
    _name: *const c_char,
    major: *mut c_int,
    _event: *mut c_int,
    _error: *mut c_int,
) -> c_int {
    if !major.is_null() {
        *major = 1;
    }
    1
}

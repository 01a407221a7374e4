//! # tbstub
//!
//! LD_PRELOAD layer that makes a sandboxed GUI application reach the network
//! only through two pre-provisioned `AF_UNIX` endpoints.
//!
//! The launcher exports `TOR_STUB_SOCKS_SOCKET` and `TOR_STUB_CONTROL_SOCKET`
//! and preloads `libtbstub.so`. From then on:
//!
//! - `socket(AF_INET, ..)` creates an `AF_UNIX` socket instead;
//! - `connect()` to port 9050/9150 lands on the SOCKS endpoint, 9051/9151 on
//!   the control endpoint, anything else fails with `EHOSTUNREACH`;
//! - `dlopen()` of GNOME integration libraries fails as if not installed;
//! - `XQueryExtension("MIT-SHM")` reports the extension as absent;
//! - `pa_mutex_new()` never asks for priority inheritance (not on x86).
//!
//! Any missing configuration or unresolvable real symbol aborts the process
//! on first use. See `tbstub_core` for the logic behind each shadow.

// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

mod errno;
pub mod interpose;
mod state;

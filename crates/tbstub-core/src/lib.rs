//! # tbstub-core
//!
//! Address rewriting and symbol resolution behind the tbstub preload layer.
//!
//! Everything here is plain Rust over typed function pointers: the exported
//! `extern "C"` shadows live in `tbstub-preload`, which owns the process-wide
//! state and the abort boundary. Keeping the logic on this side means it can
//! be driven by test doubles instead of the real libc.

// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

pub mod addr;
pub mod dl;
pub mod net;
pub mod ports;
#[cfg(not(target_arch = "x86"))]
pub mod pulse;
pub mod reals;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod x11;

pub use addr::{EndpointTable, LocalEndpoint};
pub use ports::Endpoint;
pub use reals::{Library, Linker, ResolveError, SystemLinker};
pub use state::{fatal, InitError, InitGuard, StubState};

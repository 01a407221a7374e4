//! Real Symbol Resolution
//!
//! Provides typed handles to the implementations this layer shadows.
//!
//! Lookups go through a [`Linker`]: [`SystemLinker`] is `dlsym`/`dlclose`/
//! `dlerror`, tests plug in `testing::FakeLinker`. A null lookup is
//! always a [`ResolveError`]; callers treat it as fatal.

use libc::{c_char, c_int, c_void, sockaddr, socklen_t};
use std::ffi::CStr;
use std::ptr::NonNull;

pub type ConnectFn = unsafe extern "C" fn(c_int, *const sockaddr, socklen_t) -> c_int;
pub type SocketFn = unsafe extern "C" fn(c_int, c_int, c_int) -> c_int;
pub type DlopenFn = unsafe extern "C" fn(*const c_char, c_int) -> *mut c_void;
/// `Bool XQueryExtension(Display *, const char *, int *, int *, int *)`
pub type XQueryExtensionFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_char,
    *mut c_int,
    *mut c_int,
    *mut c_int,
) -> c_int;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to find `{symbol}()` symbol: {reason}")]
    Symbol { symbol: String, reason: String },
    #[error("failed to dlopen() `{library}`: {reason}")]
    Library { library: String, reason: String },
    #[error("failed to find a library matching `{pattern}`")]
    NoMatch { pattern: String },
    #[error("invalid library pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },
}

/// Dynamic linker operations the resolver needs.
///
/// Opening a library is deliberately absent: it always goes through the
/// resolved real `dlopen`, never through our own shadow.
pub trait Linker {
    /// `dlsym(RTLD_NEXT, name)`
    unsafe fn next_symbol(&self, name: &CStr) -> *mut c_void;
    /// `dlsym(handle, name)`
    unsafe fn symbol(&self, handle: *mut c_void, name: &CStr) -> *mut c_void;
    /// `dlclose(handle)`
    unsafe fn close(&self, handle: *mut c_void);
    /// Most recent loader error (`dlerror`).
    fn last_error(&self) -> String;
}

/// The process's own dynamic linker.
pub struct SystemLinker;

impl Linker for SystemLinker {
    unsafe fn next_symbol(&self, name: &CStr) -> *mut c_void {
        libc::dlsym(libc::RTLD_NEXT, name.as_ptr())
    }

    unsafe fn symbol(&self, handle: *mut c_void, name: &CStr) -> *mut c_void {
        libc::dlsym(handle, name.as_ptr())
    }

    unsafe fn close(&self, handle: *mut c_void) {
        libc::dlclose(handle);
    }

    fn last_error(&self) -> String {
        let msg = unsafe { libc::dlerror() };
        if msg.is_null() {
            return "unknown error".to_string();
        }
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

/// Reinterpret a non-null symbol address as a typed function pointer.
unsafe fn cast<F: Copy>(ptr: NonNull<c_void>) -> F {
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<*mut c_void>()
    );
    std::mem::transmute_copy(&ptr.as_ptr())
}

fn symbol_error(linker: &dyn Linker, name: &CStr) -> ResolveError {
    ResolveError::Symbol {
        symbol: name.to_string_lossy().into_owned(),
        reason: linker.last_error(),
    }
}

/// Resolve the next definition of `name` after this object.
///
/// `F` must be the `unsafe extern "C" fn` type matching the symbol.
pub unsafe fn resolve_next<F: Copy>(linker: &dyn Linker, name: &CStr) -> Result<F, ResolveError> {
    match NonNull::new(linker.next_symbol(name)) {
        Some(ptr) => Ok(cast(ptr)),
        None => Err(symbol_error(linker, name)),
    }
}

/// A library opened through the real `dlopen`.
///
/// Dropping a `Library` leaves it loaded; call [`Library::close`] to
/// release the handle.
pub struct Library<'l> {
    linker: &'l dyn Linker,
    handle: NonNull<c_void>,
    name: String,
}

impl<'l> Library<'l> {
    pub unsafe fn open(
        linker: &'l dyn Linker,
        dlopen: DlopenFn,
        name: &CStr,
        flags: c_int,
    ) -> Result<Self, ResolveError> {
        let handle = NonNull::new(dlopen(name.as_ptr(), flags)).ok_or_else(|| {
            ResolveError::Library {
                library: name.to_string_lossy().into_owned(),
                reason: linker.last_error(),
            }
        })?;
        Ok(Self {
            linker,
            handle,
            name: name.to_string_lossy().into_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve `symbol` from this library only.
    pub unsafe fn resolve<F: Copy>(&self, symbol: &CStr) -> Result<F, ResolveError> {
        match NonNull::new(self.linker.symbol(self.handle.as_ptr(), symbol)) {
            Some(ptr) => Ok(cast(ptr)),
            None => Err(symbol_error(self.linker, symbol)),
        }
    }

    pub unsafe fn close(self) {
        self.linker.close(self.handle.as_ptr());
    }
}

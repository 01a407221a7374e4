//! Address Table: the two `AF_UNIX` endpoints connections are rewritten to.

use libc::{c_char, sa_family_t, sockaddr, sockaddr_un, socklen_t};
use std::ffi::CStr;
use std::fmt;

use crate::ports::Endpoint;
use tbstub_config::StubConfig;

/// An `AF_UNIX` socket address built once from a configured path.
#[derive(Clone, Copy)]
pub struct LocalEndpoint {
    addr: sockaddr_un,
}

impl LocalEndpoint {
    /// `strncpy` semantics: copy up to the first NUL or `max_path_len()`
    /// bytes, whichever comes first. `sun_path` always ends in NUL.
    pub fn new(path: &[u8]) -> Self {
        let mut addr: sockaddr_un = unsafe { std::mem::zeroed() };
        addr.sun_family = libc::AF_UNIX as sa_family_t;

        let path = match path.iter().position(|&b| b == 0) {
            Some(nul) => &path[..nul],
            None => path,
        };
        let n = path.len().min(Self::max_path_len());
        for (dst, &src) in addr.sun_path.iter_mut().zip(&path[..n]) {
            *dst = src as c_char;
        }

        Self { addr }
    }

    /// Longest path that fits `sun_path` with its terminator.
    pub fn max_path_len() -> usize {
        let addr: sockaddr_un = unsafe { std::mem::zeroed() };
        addr.sun_path.len() - 1
    }

    /// Whether `path` would be cut short by [`LocalEndpoint::new`].
    pub fn truncates(path: &[u8]) -> bool {
        path.len() > Self::max_path_len()
    }

    /// `sizeof(struct sockaddr_un)`, the length handed to the real `connect`.
    pub const fn len() -> socklen_t {
        std::mem::size_of::<sockaddr_un>() as socklen_t
    }

    pub fn as_sockaddr(&self) -> *const sockaddr {
        &self.addr as *const sockaddr_un as *const sockaddr
    }

    pub fn path_bytes(&self) -> &[u8] {
        unsafe { CStr::from_ptr(self.addr.sun_path.as_ptr()) }.to_bytes()
    }
}

impl fmt::Debug for LocalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEndpoint")
            .field("path", &String::from_utf8_lossy(self.path_bytes()))
            .finish()
    }
}

impl PartialEq for LocalEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.path_bytes() == other.path_bytes()
    }
}

/// Proxy and control endpoints. Immutable once built.
#[derive(Debug, Clone, Copy)]
pub struct EndpointTable {
    pub socks: LocalEndpoint,
    pub control: LocalEndpoint,
}

impl EndpointTable {
    pub fn from_config(config: &StubConfig) -> Self {
        Self {
            socks: LocalEndpoint::new(&config.socks_socket),
            control: LocalEndpoint::new(&config.control_socket),
        }
    }

    pub fn get(&self, endpoint: Endpoint) -> &LocalEndpoint {
        match endpoint {
            Endpoint::Socks => &self.socks,
            Endpoint::Control => &self.control,
        }
    }
}

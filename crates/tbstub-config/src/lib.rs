//! # tbstub-config
//!
//! Configuration for the tbstub preload layer.
//!
//! The launcher provisions two `AF_UNIX` endpoints and exports their paths
//! before the host process starts:
//! 1. `TOR_STUB_SOCKS_SOCKET` (proxy endpoint)
//! 2. `TOR_STUB_CONTROL_SOCKET` (control endpoint)
//!
//! Both are required. There is no config file: the preload runs inside an
//! arbitrary host process and only reads its environment, once.

pub mod logging;
pub mod testing;

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;

/// Path of the `AF_UNIX` proxy (SOCKS) endpoint.
pub const SOCKS_SOCKET_ENV: &str = "TOR_STUB_SOCKS_SOCKET";
/// Path of the `AF_UNIX` control endpoint.
pub const CONTROL_SOCKET_ENV: &str = "TOR_STUB_CONTROL_SOCKET";
/// `tracing` filter directive for preload diagnostics.
pub const LOG_ENV: &str = "TBSTUB_LOG";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{0}` environment variable not set")]
    Missing(&'static str),
}

/// Endpoint paths handed to the preload by its launcher.
///
/// Paths are kept as raw bytes: they end up in `sockaddr_un::sun_path`
/// and need not be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubConfig {
    pub socks_socket: Vec<u8>,
    pub control_socket: Vec<u8>,
}

impl StubConfig {
    /// Read both endpoint paths from the process environment.
    ///
    /// In a secure-execution process (set-uid, file capabilities) the
    /// environment is not trusted and both values read as absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(secure_var)
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<OsString>,
    {
        let socks_socket = lookup(SOCKS_SOCKET_ENV)
            .ok_or(ConfigError::Missing(SOCKS_SOCKET_ENV))?
            .into_vec();
        let control_socket = lookup(CONTROL_SOCKET_ENV)
            .ok_or(ConfigError::Missing(CONTROL_SOCKET_ENV))?
            .into_vec();

        Ok(Self {
            socks_socket,
            control_socket,
        })
    }

    pub fn socks_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(&self.socks_socket))
    }

    pub fn control_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(&self.control_socket))
    }

    /// Environment a launcher must export for the preload to start.
    pub fn env_vars(&self) -> [(&'static str, &OsStr); 2] {
        [
            (SOCKS_SOCKET_ENV, OsStr::from_bytes(&self.socks_socket)),
            (CONTROL_SOCKET_ENV, OsStr::from_bytes(&self.control_socket)),
        ]
    }
}

/// `secure_getenv(3)` semantics on top of `std::env::var_os`.
pub fn secure_var(name: &str) -> Option<OsString> {
    if is_secure_execution() {
        return None;
    }
    std::env::var_os(name)
}

#[cfg(target_os = "linux")]
fn is_secure_execution() -> bool {
    unsafe { libc::getauxval(libc::AT_SECURE) != 0 }
}

#[cfg(not(target_os = "linux"))]
fn is_secure_execution() -> bool {
    unsafe { libc::getuid() != libc::geteuid() || libc::getgid() != libc::getegid() }
}

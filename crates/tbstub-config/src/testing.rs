//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - Isolated endpoint socket paths
//! - Optional listening sockets at those paths
//! - A `StubConfig` and variable lookup pointing at them
//!
//! # Usage
//!
//! ```ignore
//! use tbstub_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     let config = env.config();
//!     // env.socks_path / env.control_path are unique to this test
//! }
//! ```

use std::ffi::OsString;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use crate::{StubConfig, CONTROL_SOCKET_ENV, SOCKS_SOCKET_ENV};

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique endpoint paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    temp_dir: TempDir,
    /// Listeners kept alive while the environment lives
    listeners: Vec<UnixListener>,
    /// Unique proxy endpoint path for this test
    pub socks_path: PathBuf,
    /// Unique control endpoint path for this test
    pub control_path: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment. Nothing listens yet.
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let socks_path = root.join(format!("socks-{}.sock", test_id));
        let control_path = root.join(format!("control-{}.sock", test_id));

        Ok(Self {
            temp_dir,
            listeners: Vec::new(),
            socks_path,
            control_path,
            test_id,
        })
    }

    /// Bind listening sockets at both endpoint paths.
    pub fn with_listeners(mut self) -> anyhow::Result<Self> {
        self.listeners.push(UnixListener::bind(&self.socks_path)?);
        self.listeners.push(UnixListener::bind(&self.control_path)?);
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> StubConfig {
        use std::os::unix::ffi::OsStrExt;
        StubConfig {
            socks_socket: self.socks_path.as_os_str().as_bytes().to_vec(),
            control_socket: self.control_path.as_os_str().as_bytes().to_vec(),
        }
    }

    /// Environment variables a launcher would export for this environment.
    pub fn stub_env(&self) -> Vec<(String, PathBuf)> {
        vec![
            (SOCKS_SOCKET_ENV.to_string(), self.socks_path.clone()),
            (CONTROL_SOCKET_ENV.to_string(), self.control_path.clone()),
        ]
    }

    /// Variable lookup suitable for `StubConfig::from_lookup`.
    pub fn lookup(&self) -> impl FnMut(&str) -> Option<OsString> + '_ {
        move |name| match name {
            SOCKS_SOCKET_ENV => Some(self.socks_path.clone().into_os_string()),
            CONTROL_SOCKET_ENV => Some(self.control_path.clone().into_os_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_has_unique_paths() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.socks_path, env2.socks_path);
        assert_ne!(env1.socks_path, env1.control_path);
    }

    #[test]
    fn test_lookup_feeds_config() {
        let env = TestEnvironment::new().unwrap();
        let config = StubConfig::from_lookup(env.lookup()).unwrap();
        assert_eq!(config, env.config());
    }

    #[test]
    fn test_listeners_create_sockets() {
        use std::os::unix::fs::FileTypeExt;

        let env = TestEnvironment::new().unwrap().with_listeners().unwrap();
        let meta = std::fs::metadata(&env.socks_path).unwrap();
        assert!(meta.file_type().is_socket());
        assert!(env.control_path.exists());
    }

    #[test]
    fn test_stub_env() {
        let env = TestEnvironment::new().unwrap();
        let vars = env.stub_env();
        assert!(vars.iter().any(|(k, _)| k == "TOR_STUB_SOCKS_SOCKET"));
        assert!(vars.iter().any(|(k, _)| k == "TOR_STUB_CONTROL_SOCKET"));
    }
}

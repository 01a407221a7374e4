//! Locating the built preload object.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tbstub_config::log_cli_debug;

#[cfg(target_os = "macos")]
pub const STUB_LIBRARY_NAME: &str = "libtbstub.dylib";
#[cfg(not(target_os = "macos"))]
pub const STUB_LIBRARY_NAME: &str = "libtbstub.so";

/// Resolve the preload library: an explicit path wins, otherwise search
/// around the running executable and then the cargo target directory.
pub fn find_stub_library(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            anyhow::bail!("Preload library not found: {}", path.display());
        }
        return path
            .canonicalize()
            .with_context(|| format!("resolve {}", path.display()));
    }

    let exe = env::current_exe().ok();
    let exe_dir = exe.as_deref().and_then(Path::parent);
    search(exe_dir, Path::new(".")).ok_or_else(|| {
        anyhow::anyhow!(
            "Could not find {}. Please run 'cargo build -p tbstub-preload' first.",
            STUB_LIBRARY_NAME
        )
    })
}

fn search(exe_dir: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(exe_dir) = exe_dir {
        // Same directory as the tbstub binary
        candidates.push(exe_dir.join(STUB_LIBRARY_NAME));
        // ../lib/ relative to bin/
        if let Some(prefix) = exe_dir.parent() {
            candidates.push(prefix.join("lib").join(STUB_LIBRARY_NAME));
        }
    }
    // Development mode
    candidates.push(cwd.join("target/debug").join(STUB_LIBRARY_NAME));
    candidates.push(cwd.join("target/release").join(STUB_LIBRARY_NAME));

    let found = candidates.into_iter().find(|c| c.is_file())?;
    let shown = found.display().to_string();
    log_cli_debug!("preload library located", path = shown.as_str());
    Some(found.canonicalize().unwrap_or(found))
}

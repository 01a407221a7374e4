//! # tbstub doctor
//!
//! Diagnostic checks for a preload environment.
//! Validates the endpoint variables, the sockets they name, the port map,
//! preload library presence and (off x86) the PulseAudio core library.

use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use anyhow::Result;
use console::{style, Emoji};
use tbstub_config::{CONTROL_SOCKET_ENV, SOCKS_SOCKET_ENV};
use tbstub_core::ports::PORT_MAP;
use tbstub_core::LocalEndpoint;

use crate::library::find_stub_library;

static CHECK: Emoji<'_, '_> = Emoji("✔ ", "[ok] ");
static CROSS: Emoji<'_, '_> = Emoji("✘ ", "[!!] ");
static WARN_ICON: Emoji<'_, '_> = Emoji("⚠ ", "[??] ");
static DOT: Emoji<'_, '_> = Emoji("● ", "[-] ");

struct DiagResult {
    passed: u32,
    warned: u32,
    failed: u32,
}

impl DiagResult {
    fn new() -> Self {
        Self {
            passed: 0,
            warned: 0,
            failed: 0,
        }
    }

    fn pass(&mut self, msg: &str) {
        self.passed += 1;
        eprintln!("  {} {}", CHECK, style(msg).green());
    }

    fn warn(&mut self, msg: &str) {
        self.warned += 1;
        eprintln!("  {} {}", WARN_ICON, style(msg).yellow());
    }

    fn fail(&mut self, msg: &str) {
        self.failed += 1;
        eprintln!("  {} {}", CROSS, style(msg).red());
    }

    fn info(&self, msg: &str) {
        eprintln!("  {} {}", DOT, style(msg).dim());
    }
}

pub fn cmd_doctor(library: Option<&Path>) -> Result<()> {
    eprintln!();
    eprintln!("{}", style("🩺 tbstub Doctor").bold().cyan());
    eprintln!("{}", style("─".repeat(40)).dim());

    let mut d = DiagResult::new();

    // 1. Endpoints
    eprintln!();
    eprintln!("{}", style("Endpoints").bold());
    check_endpoints(|name| std::env::var_os(name), &mut d);

    // 2. Port map
    eprintln!();
    eprintln!("{}", style("Port map").bold());
    check_port_map(&mut d);

    // 3. Preload library
    eprintln!();
    eprintln!("{}", style("Preload library").bold());
    check_library(library, &mut d);

    // 4. PulseAudio
    #[cfg(not(target_arch = "x86"))]
    {
        eprintln!();
        eprintln!("{}", style("PulseAudio").bold());
        check_pulsecore(tbstub_core::pulse::PULSECORE_GLOB, &mut d);
    }

    // Summary
    eprintln!();
    eprintln!("{}", style("─".repeat(40)).dim());
    eprintln!(
        "  {} passed, {} warnings, {} errors",
        style(d.passed).green().bold(),
        style(d.warned).yellow().bold(),
        style(d.failed).red().bold(),
    );

    if d.failed > 0 {
        eprintln!();
        eprintln!(
            "{}",
            style("Apply the launcher environment with: eval \"$(tbstub env ...)\"").dim()
        );
        std::process::exit(1);
    } else if d.warned > 0 {
        eprintln!(
            "{}",
            style("Some warnings detected. The host should still start.").dim()
        );
    } else {
        eprintln!("{}", style("All checks passed.").dim());
    }

    eprintln!();
    Ok(())
}

fn check_endpoints<F>(mut lookup: F, d: &mut DiagResult)
where
    F: FnMut(&str) -> Option<OsString>,
{
    for name in [SOCKS_SOCKET_ENV, CONTROL_SOCKET_ENV] {
        match lookup(name) {
            Some(value) => {
                d.pass(&format!("{} is set", name));
                check_socket_path(Path::new(&value), d);
            }
            None => {
                d.fail(&format!("{} is not set", name));
                d.info("The preload aborts the host at startup without it");
            }
        }
    }
}

fn check_socket_path(path: &Path, d: &mut DiagResult) {
    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            d.pass(&format!("Socket: {}", path.display()))
        }
        Ok(_) => d.fail(&format!("Not a socket: {}", path.display())),
        Err(e) => d.fail(&format!("Cannot stat {}: {}", path.display(), e)),
    }

    if LocalEndpoint::truncates(path.as_os_str().as_bytes()) {
        d.warn(&format!(
            "Path exceeds {} bytes and will be truncated",
            LocalEndpoint::max_path_len()
        ));
    }
}

fn check_port_map(d: &mut DiagResult) {
    for (port, endpoint) in PORT_MAP {
        d.info(&format!("127.0.0.1:{} -> {} endpoint", port, endpoint.name()));
    }
    d.pass(&format!("{} ports redirected, all others refused", PORT_MAP.len()));
}

fn check_library(library: Option<&Path>, d: &mut DiagResult) {
    match find_stub_library(library) {
        Ok(path) => d.pass(&format!("Library: {}", path.display())),
        Err(e) => {
            d.fail(&format!("{:#}", e));
            d.info("Pass --library or build with: cargo build -p tbstub-preload");
        }
    }
}

#[cfg(not(target_arch = "x86"))]
fn check_pulsecore(pattern: &str, d: &mut DiagResult) {
    match tbstub_core::pulse::find_library(pattern) {
        Ok(path) => d.pass(&format!("libpulsecore: {}", path.display())),
        Err(e) => {
            d.warn(&e.to_string());
            d.info("Hosts that load libpulsecore will abort on their first pa_mutex_new()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbstub_config::testing::TestEnvironment;

    #[test]
    fn test_endpoints_healthy() {
        let env = TestEnvironment::new().unwrap().with_listeners().unwrap();
        let mut d = DiagResult::new();
        check_endpoints(env.lookup(), &mut d);
        assert_eq!((d.passed, d.warned, d.failed), (4, 0, 0));
    }

    #[test]
    fn test_endpoints_missing_variable() {
        let env = TestEnvironment::new().unwrap().with_listeners().unwrap();
        let mut lookup = env.lookup();
        let mut d = DiagResult::new();
        check_endpoints(
            |name: &str| {
                if name == CONTROL_SOCKET_ENV {
                    None
                } else {
                    lookup(name)
                }
            },
            &mut d,
        );
        assert_eq!((d.passed, d.failed), (2, 1));
    }

    #[test]
    fn test_endpoints_absent_sockets() {
        // No listeners: the paths do not exist yet.
        let env = TestEnvironment::new().unwrap();
        let mut d = DiagResult::new();
        check_endpoints(env.lookup(), &mut d);
        assert_eq!((d.passed, d.failed), (2, 2));
    }

    #[test]
    fn test_regular_file_is_not_a_socket() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(&env.socks_path, b"").unwrap();
        let mut d = DiagResult::new();
        check_socket_path(&env.socks_path, &mut d);
        assert_eq!(d.failed, 1);
    }

    #[test]
    fn test_long_path_warns() {
        let long = format!("/tmp/{}", "s".repeat(LocalEndpoint::max_path_len()));
        let mut d = DiagResult::new();
        check_socket_path(Path::new(&long), &mut d);
        assert_eq!((d.warned, d.failed), (1, 1));
    }

    #[test]
    fn test_port_map_passes() {
        let mut d = DiagResult::new();
        check_port_map(&mut d);
        assert_eq!((d.passed, d.failed), (1, 0));
    }

    #[test]
    fn test_library_explicit() {
        let env = TestEnvironment::new().unwrap();
        let lib = env.root().join("libtbstub.so");

        let mut d = DiagResult::new();
        check_library(Some(&lib), &mut d);
        assert_eq!(d.failed, 1);

        std::fs::write(&lib, b"").unwrap();
        let mut d = DiagResult::new();
        check_library(Some(&lib), &mut d);
        assert_eq!((d.passed, d.failed), (1, 0));
    }

    #[cfg(not(target_arch = "x86"))]
    #[test]
    fn test_pulsecore_missing_only_warns() {
        let env = TestEnvironment::new().unwrap();
        let pattern = format!("{}/libpulsecore-*.so", env.root().display());

        let mut d = DiagResult::new();
        check_pulsecore(&pattern, &mut d);
        assert_eq!((d.warned, d.failed), (1, 0));

        std::fs::write(env.root().join("libpulsecore-17.0.so"), b"").unwrap();
        let mut d = DiagResult::new();
        check_pulsecore(&pattern, &mut d);
        assert_eq!(d.passed, 1);
    }
}

//! `tbstub env`: the environment a launcher applies before exec'ing the host.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tbstub_config::{log_cli_info, CONTROL_SOCKET_ENV, SOCKS_SOCKET_ENV};
use tbstub_core::LocalEndpoint;

use crate::library::find_stub_library;

pub fn cmd_env(socks: &Path, control: &Path, library: Option<&Path>) -> Result<()> {
    let library = find_stub_library(library)?;

    for (name, path) in [(SOCKS_SOCKET_ENV, socks), (CONTROL_SOCKET_ENV, control)] {
        if LocalEndpoint::truncates(path.as_os_str().as_bytes()) {
            eprintln!(
                "{} {} is longer than {} bytes and will be truncated",
                style("warning:").yellow().bold(),
                name,
                LocalEndpoint::max_path_len()
            );
        }
    }

    let lib = library.display().to_string();
    log_cli_info!("rendering preload environment", library = lib.as_str());

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&render_script(&library, socks, control))
        .and_then(|_| stdout.flush())
        .context("write script to stdout")
}

/// POSIX shell script exporting the preload environment.
///
/// `LD_PRELOAD` is prepended to, not replaced, so other preloads survive.
pub fn render_script(library: &Path, socks: &Path, control: &Path) -> Vec<u8> {
    let mut script = Vec::new();

    script.extend_from_slice(b"export LD_PRELOAD=");
    script.extend(shell_quote(library.as_os_str()));
    script.extend_from_slice(b"\"${LD_PRELOAD:+:$LD_PRELOAD}\"\n");

    for (name, path) in [(SOCKS_SOCKET_ENV, socks), (CONTROL_SOCKET_ENV, control)] {
        script.extend_from_slice(b"export ");
        script.extend_from_slice(name.as_bytes());
        script.push(b'=');
        script.extend(shell_quote(path.as_os_str()));
        script.push(b'\n');
    }

    script
}

/// Single-quote `value` for a POSIX shell. Embedded quotes become `'\''`.
pub fn shell_quote(value: &OsStr) -> Vec<u8> {
    let mut quoted = Vec::with_capacity(value.len() + 2);
    quoted.push(b'\'');
    for &byte in value.as_bytes() {
        if byte == b'\'' {
            quoted.extend_from_slice(b"'\\''");
        } else {
            quoted.push(byte);
        }
    }
    quoted.push(b'\'');
    quoted
}

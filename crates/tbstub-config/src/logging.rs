//! Structured logging for tbstub components.
//!
//! Provides component-tagged macros and the two subscriber setups:
//! the CLI logs like any other tool, the preload logs to stderr of the
//! host process and stays quiet unless `TBSTUB_LOG` asks otherwise.
//!
//! # Usage
//!
//! ```ignore
//! use tbstub_config::log_stub_debug;
//!
//! log_stub_debug!("connect redirected", port = 9150, endpoint = "socks");
//! ```

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const STUB: &'static str = "STUB";
    pub const CLI: &'static str = "CLI";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// === STUB (preload) logging macros ===

#[macro_export]
macro_rules! log_stub_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = "STUB", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_stub_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "STUB", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_stub_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "STUB", $($key = $value,)* $msg)
    };
}

// === CLI logging macros ===

#[macro_export]
macro_rules! log_cli_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "CLI", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_cli_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "CLI", $($key = $value,)* $msg)
    };
}

/// Initialize logging with the given level filter.
/// Call this once at application startup. Output goes to stderr so that
/// stdout stays machine-readable.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Install the preload's stderr subscriber.
///
/// Reads the filter from `TBSTUB_LOG` (not `RUST_LOG`, which belongs to the
/// host if anything). Never panics: a second call, or a host that already
/// installed a global dispatcher, is ignored. Colors only when stderr is a
/// terminal; hosts often redirect it to a log file.
pub fn init_stub_logging() {
    use std::io::IsTerminal;
    use tracing_subscriber::util::SubscriberInitExt;

    let directive = crate::secure_var(crate::LOG_ENV)
        .and_then(|v| v.into_string().ok())
        .unwrap_or_else(|| LogLevel::Warn.as_filter().to_string());

    let ansi = std::io::stderr().is_terminal();
    let _ = stub_subscriber(&directive, std::io::stderr, ansi).try_init();
}

fn stub_subscriber<W>(
    directive: &str,
    writer: W,
    ansi: bool,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_new(directive)
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::Warn.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_component_constants() {
        assert_eq!(Component::STUB, "STUB");
        assert_eq!(Component::CLI, "CLI");
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        assert_eq!(LogLevel::Trace.as_filter(), "trace");
    }

    /// In-memory log sink.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_stub_output_without_terminal_is_plain() {
        let sink = Captured::default();
        tracing::subscriber::with_default(stub_subscriber("info", sink.clone(), false), || {
            log_stub_info!("dlopen suppressed", library = "libgconf-2.so.4");
        });

        let text = sink.text();
        assert!(text.contains("dlopen suppressed"), "{text}");
        assert!(text.contains("libgconf-2.so.4"), "{text}");
        assert!(!text.contains('\x1b'), "escape codes in {text:?}");
    }

    #[test]
    fn test_stub_filter_applies() {
        let sink = Captured::default();
        tracing::subscriber::with_default(stub_subscriber("off", sink.clone(), false), || {
            log_stub_error!("fatal", error = "unreachable");
        });
        assert!(sink.text().is_empty());

        let sink = Captured::default();
        tracing::subscriber::with_default(stub_subscriber("tbstub=loud", sink.clone(), false), || {
            log_stub_debug!("connect redirected", port = 9050);
            log_stub_info!("extension hidden", extension = "MIT-SHM");
        });
        // Invalid directives fall back to `warn`
        assert!(sink.text().is_empty(), "{}", sink.text());
    }

    #[test]
    fn test_stub_logging_is_idempotent() {
        init_stub_logging();
        init_stub_logging();
        log_stub_debug!("still alive", attempt = 2);
    }
}

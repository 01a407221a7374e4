// =============================================================================
// state.rs: One-time initialization
// =============================================================================
//
//   - StubState::init()  : read config, resolve reals, build the Address Table
//   - InitGuard          : exactly-once cell whose failure path aborts
//   - fatal()            : the single place a broken boundary ends the process
//
// Nothing in here is reachable half-built: InitGuard either publishes a
// complete StubState or the process is gone.
// =============================================================================

use std::fmt::Display;

use once_cell::sync::OnceCell;

use crate::addr::EndpointTable;
use crate::net::NetReals;
use crate::reals::{self, DlopenFn, Library, Linker, ResolveError, XQueryExtensionFn};
use crate::x11::{XEXT_LIBRARY, X_QUERY_EXTENSION};
use tbstub_config::{log_stub_debug, log_stub_error, ConfigError, StubConfig};

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Resolved-Symbol Table plus Address Table. Read-only once published.
#[derive(Debug, Clone, Copy)]
pub struct StubState {
    pub endpoints: EndpointTable,
    pub net: NetReals,
    pub dlopen: DlopenFn,
    pub xquery_extension: XQueryExtensionFn,
}

impl StubState {
    /// Build the whole state, in this order: config, `connect`/`socket`,
    /// endpoints, `dlopen`, then `XQueryExtension` out of libXext.
    ///
    /// libXext is loaded eagerly because the host opens its display almost
    /// immediately; its handle stays open for the life of the process.
    pub unsafe fn init<C>(config: C, linker: &dyn Linker) -> Result<Self, InitError>
    where
        C: FnOnce() -> Result<StubConfig, ConfigError>,
    {
        let config = config()?;

        let net = NetReals {
            connect: reals::resolve_next(linker, c"connect")?,
            socket: reals::resolve_next(linker, c"socket")?,
        };

        let endpoints = EndpointTable::from_config(&config);

        let dlopen: DlopenFn = reals::resolve_next(linker, c"dlopen")?;

        let xext = Library::open(linker, dlopen, XEXT_LIBRARY, libc::RTLD_LAZY)?;
        let xquery_extension = xext.resolve::<XQueryExtensionFn>(X_QUERY_EXTENSION)?;

        let socks = String::from_utf8_lossy(endpoints.socks.path_bytes());
        let control = String::from_utf8_lossy(endpoints.control.path_bytes());
        log_stub_debug!("initialized", socks = &*socks, control = &*control);

        Ok(Self {
            endpoints,
            net,
            dlopen,
            xquery_extension,
        })
    }
}

/// Exactly-once initialization that never hands out a failure.
///
/// Concurrent first callers block until the winner finishes; everyone
/// afterwards gets the published value with no further synchronization.
pub struct InitGuard<T> {
    cell: OnceCell<T>,
}

impl<T> InitGuard<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Run `init` if nobody has yet; abort the process if it fails.
    pub fn get_or_abort<E, F>(&self, init: F) -> &T
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.cell
            .get_or_init(|| init().unwrap_or_else(|err| fatal(&err)))
    }
}

impl<T> Default for InitGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Report `err` and abort. Fail closed: a preload that cannot confine the
/// host must not let it run unconfined.
///
/// The message goes through `tracing` only when an `error` event would
/// actually be recorded; a filter such as `TBSTUB_LOG=off` falls back to a
/// plain stderr line, so the abort never goes unexplained.
pub fn fatal(err: &dyn Display) -> ! {
    let msg = err.to_string();
    if tracing::enabled!(tracing::Level::ERROR) {
        log_stub_error!("fatal", error = msg.as_str());
    } else {
        eprintln!("tbstub: ERROR: {}", msg);
    }
    std::process::abort()
}

//! Connect and socket interception.
//!
//! `AF_INET` never leaves the process: `socket()` hands out `AF_UNIX`
//! descriptors and `connect()` rewrites the destination to one of the two
//! local endpoints by port. Everything else is refused.

use libc::{c_int, sockaddr, sockaddr_in, socklen_t, AF_INET, AF_UNIX};
use nix::errno::Errno;
use std::mem::size_of;
use std::ptr;

use crate::addr::{EndpointTable, LocalEndpoint};
use crate::ports::{self, Endpoint};
use crate::reals::{ConnectFn, SocketFn};
use tbstub_config::log_stub_debug;

/// Real networking entry points.
#[derive(Debug, Clone, Copy)]
pub struct NetReals {
    pub connect: ConnectFn,
    pub socket: SocketFn,
}

/// Where a `connect()` goes.
#[derive(Debug, PartialEq)]
pub enum Route<'a> {
    /// Already `AF_UNIX`: hand the caller's address through untouched.
    Passthrough,
    Redirect {
        port: u16,
        endpoint: Endpoint,
        local: &'a LocalEndpoint,
    },
}

/// Decide the fate of a `connect(fd, addr, len)` call.
pub unsafe fn route<'a>(
    addr: *const sockaddr,
    len: socklen_t,
    table: &'a EndpointTable,
) -> Result<Route<'a>, Errno> {
    if addr.is_null() || (len as usize) < size_of::<sockaddr>() {
        return Err(Errno::EINVAL);
    }

    let family = c_int::from(ptr::read_unaligned(addr).sa_family);
    if family == AF_UNIX {
        return Ok(Route::Passthrough);
    }
    if family != AF_INET || (len as usize) < size_of::<sockaddr_in>() {
        return Err(Errno::EAFNOSUPPORT);
    }

    let sin = ptr::read_unaligned(addr as *const sockaddr_in);
    let port = u16::from_be(sin.sin_port);
    let endpoint = ports::classify(port).ok_or(Errno::EHOSTUNREACH)?;

    Ok(Route::Redirect {
        port,
        endpoint,
        local: table.get(endpoint),
    })
}

/// Shadow of `connect(2)`.
///
/// `Err` is a refusal decided here; `Ok` carries whatever the real call
/// returned, errno included.
pub unsafe fn connect(
    reals: &NetReals,
    table: &EndpointTable,
    fd: c_int,
    addr: *const sockaddr,
    len: socklen_t,
) -> Result<c_int, Errno> {
    match route(addr, len, table) {
        Ok(Route::Passthrough) => Ok((reals.connect)(fd, addr, len)),
        Ok(Route::Redirect {
            port,
            endpoint,
            local,
        }) => {
            log_stub_debug!(
                "connect redirected",
                fd = fd,
                port = port,
                endpoint = endpoint.name()
            );
            Ok((reals.connect)(fd, local.as_sockaddr(), LocalEndpoint::len()))
        }
        Err(errno) => {
            log_stub_debug!("connect refused", fd = fd, errno = errno.desc());
            Err(errno)
        }
    }
}

/// The domain actually created for a requested one.
pub fn socket_domain(domain: c_int) -> Result<c_int, Errno> {
    match domain {
        AF_INET | AF_UNIX => Ok(AF_UNIX),
        _ => Err(Errno::EAFNOSUPPORT),
    }
}

/// Shadow of `socket(2)`.
pub unsafe fn socket(
    reals: &NetReals,
    domain: c_int,
    ty: c_int,
    protocol: c_int,
) -> Result<c_int, Errno> {
    let actual = socket_domain(domain).map_err(|errno| {
        log_stub_debug!("socket refused", domain = domain);
        errno
    })?;
    Ok((reals.socket)(actual, ty, protocol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use libc::{in_addr, sa_family_t, sockaddr_in6, sockaddr_un};
    use std::cell::RefCell;
    use tbstub_config::StubConfig;

    #[derive(Debug, Clone, PartialEq)]
    struct ConnectCall {
        fd: c_int,
        family: c_int,
        len: socklen_t,
        path: Vec<u8>,
    }

    thread_local! {
        static CONNECTS: RefCell<Vec<ConnectCall>> = const { RefCell::new(Vec::new()) };
        static SOCKETS: RefCell<Vec<(c_int, c_int, c_int)>> = const { RefCell::new(Vec::new()) };
    }

    unsafe extern "C" fn recording_connect(fd: c_int, addr: *const sockaddr, len: socklen_t) -> c_int {
        let family = c_int::from(ptr::read_unaligned(addr).sa_family);
        let path = if family == AF_UNIX {
            let un = ptr::read_unaligned(addr as *const sockaddr_un);
            un.sun_path
                .iter()
                .take_while(|&&c| c != 0)
                .map(|&c| c as u8)
                .collect()
        } else {
            Vec::new()
        };
        CONNECTS.with(|c| {
            c.borrow_mut().push(ConnectCall {
                fd,
                family,
                len,
                path,
            })
        });
        0
    }

    unsafe extern "C" fn recording_socket(domain: c_int, ty: c_int, protocol: c_int) -> c_int {
        SOCKETS.with(|s| s.borrow_mut().push((domain, ty, protocol)));
        3
    }

    fn reals() -> NetReals {
        NetReals {
            connect: recording_connect,
            socket: recording_socket,
        }
    }

    fn table() -> EndpointTable {
        EndpointTable::from_config(&StubConfig {
            socks_socket: b"/run/stub/socks".to_vec(),
            control_socket: b"/run/stub/control".to_vec(),
        })
    }

    fn take_connects() -> Vec<ConnectCall> {
        CONNECTS.with(|c| std::mem::take(&mut *c.borrow_mut()))
    }

    fn inet(port: u16) -> sockaddr_in {
        let mut sin: sockaddr_in = unsafe { std::mem::zeroed() };
        sin.sin_family = AF_INET as sa_family_t;
        sin.sin_port = port.to_be();
        sin.sin_addr = in_addr {
            s_addr: u32::from_be_bytes([127, 0, 0, 1]).to_be(),
        };
        sin
    }

    unsafe fn connect_inet(sin: &sockaddr_in) -> Result<c_int, Errno> {
        connect(
            &reals(),
            &table(),
            7,
            sin as *const sockaddr_in as *const sockaddr,
            size_of::<sockaddr_in>() as socklen_t,
        )
    }

    #[test]
    fn test_known_ports_redirect() {
        let cases: [(u16, &[u8]); 4] = [
            (9050, b"/run/stub/socks"),
            (9051, b"/run/stub/control"),
            (9150, b"/run/stub/socks"),
            (9151, b"/run/stub/control"),
        ];

        for (port, path) in cases {
            take_connects();
            assert_eq!(unsafe { connect_inet(&inet(port)) }, Ok(0), "port {port}");

            let calls = take_connects();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].fd, 7);
            assert_eq!(calls[0].family, AF_UNIX);
            assert_eq!(calls[0].len as usize, size_of::<sockaddr_un>());
            assert_eq!(calls[0].path, path, "port {port}");
        }
    }

    #[test]
    fn test_unknown_port_unreachable_without_delegation() {
        take_connects();
        assert_eq!(unsafe { connect_inet(&inet(443)) }, Err(Errno::EHOSTUNREACH));
        assert!(take_connects().is_empty());
    }

    #[test]
    fn test_unix_address_passes_through() {
        take_connects();
        let original = LocalEndpoint::new(b"/tmp/x11-display");
        let len = 42;
        let res = unsafe { connect(&reals(), &table(), 5, original.as_sockaddr(), len) };
        assert_eq!(res, Ok(0));

        let calls = take_connects();
        assert_eq!(calls[0].len, len);
        assert_eq!(calls[0].path, b"/tmp/x11-display");
    }

    #[test]
    fn test_foreign_family_rejected() {
        let mut sin6: sockaddr_in6 = unsafe { std::mem::zeroed() };
        sin6.sin6_family = libc::AF_INET6 as sa_family_t;
        sin6.sin6_port = 9050u16.to_be();

        take_connects();
        let res = unsafe {
            connect(
                &reals(),
                &table(),
                7,
                &sin6 as *const sockaddr_in6 as *const sockaddr,
                size_of::<sockaddr_in6>() as socklen_t,
            )
        };
        assert_eq!(res, Err(Errno::EAFNOSUPPORT));
        assert!(take_connects().is_empty());
    }

    #[test]
    fn test_null_or_tiny_address_invalid() {
        let table = table();
        assert_eq!(
            unsafe { route(ptr::null(), 16, &table) },
            Err(Errno::EINVAL)
        );

        let sin = inet(9050);
        let tiny = (size_of::<sockaddr>() - 1) as socklen_t;
        assert_eq!(
            unsafe { route(&sin as *const sockaddr_in as *const sockaddr, tiny, &table) },
            Err(Errno::EINVAL)
        );
    }

    #[test]
    fn test_route_reports_endpoint() {
        let table = table();
        let sin = inet(9151);
        let route = unsafe {
            route(
                &sin as *const sockaddr_in as *const sockaddr,
                size_of::<sockaddr_in>() as socklen_t,
                &table,
            )
        }
        .unwrap();
        assert_eq!(
            route,
            Route::Redirect {
                port: 9151,
                endpoint: Endpoint::Control,
                local: &table.control,
            }
        );
    }

    #[test]
    fn test_socket_inet_becomes_unix() {
        SOCKETS.with(|s| s.borrow_mut().clear());
        let fd = unsafe { socket(&reals(), AF_INET, libc::SOCK_STREAM, 0) };
        assert_eq!(fd, Ok(3));

        let calls = SOCKETS.with(|s| s.borrow().clone());
        assert_eq!(calls, vec![(AF_UNIX, libc::SOCK_STREAM, 0)]);
    }

    #[test]
    fn test_socket_unix_passes() {
        assert_eq!(socket_domain(AF_UNIX), Ok(AF_UNIX));
    }

    #[test]
    fn test_socket_other_domains_rejected() {
        SOCKETS.with(|s| s.borrow_mut().clear());
        for domain in [libc::AF_INET6, libc::AF_UNSPEC] {
            let res = unsafe { socket(&reals(), domain, libc::SOCK_DGRAM, 0) };
            assert_eq!(res, Err(Errno::EAFNOSUPPORT));
        }
        assert!(SOCKETS.with(|s| s.borrow().is_empty()));
    }
}

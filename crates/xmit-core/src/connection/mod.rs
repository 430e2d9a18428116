//! Address resolution and the TCP connection lifecycle.
//!
//! Only IPv4 stream sockets are used. The first IPv4 address the system
//! resolver returns is the one connected to.

use std::fs::File;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};

use crate::error::{Error, Result};
use crate::transfer::{zero_copy, Transport};

/// Turn a port argument into a port number.
///
/// Numeric ports are used as given. Anything else is looked up as a TCP
/// service name in the system services database (`http`, `ssh`, ...).
///
/// # Examples
///
/// ```
/// use xmit_core::connection::lookup_port;
///
/// assert_eq!(lookup_port("9000").unwrap(), 9000);
/// assert!(lookup_port("0").is_err());
/// assert!(lookup_port("no-such-service").is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidPort`] if the argument is neither a number in
/// 1..=65535 nor a known TCP service.
pub fn lookup_port(service: &str) -> Result<u16> {
    let trimmed = service.trim();
    let invalid = || Error::InvalidPort(service.to_string());

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return match trimmed.parse::<u16>() {
            Ok(0) | Err(_) => Err(invalid()),
            Ok(port) => Ok(port),
        };
    }

    let port = service_port(trimmed).filter(|port| *port != 0).ok_or_else(invalid)?;
    tracing::debug!("Service '{}' maps to port {}", trimmed, port);
    Ok(port)
}

/// Look up a TCP service name with `getservbyname(3)`.
#[cfg(unix)]
#[allow(unsafe_code, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn service_port(name: &str) -> Option<u16> {
    use std::ffi::CString;

    let name = CString::new(name).ok()?;
    let proto = CString::new("tcp").ok()?;

    // SAFETY: both arguments are valid NUL-terminated strings that outlive the
    // call. The returned entry points into static storage and is read before
    // any other resolver call can overwrite it.
    let entry = unsafe { libc::getservbyname(name.as_ptr(), proto.as_ptr()) };
    if entry.is_null() {
        return None;
    }

    // SAFETY: `entry` is non-null and points at a valid `servent`.
    let raw = unsafe { (*entry).s_port };
    // s_port holds the port in network byte order in its low 16 bits.
    Some(u16::from_be(raw as u16))
}

#[cfg(not(unix))]
fn service_port(_name: &str) -> Option<u16> {
    None
}

/// Resolve `host` and return its first IPv4 endpoint on `service`.
///
/// Accepts hostnames and dotted-quad literals, and numeric ports or service
/// names.
///
/// # Errors
///
/// Returns [`Error::InvalidPort`] for an unknown service,
/// [`Error::Resolve`] carrying the resolver's message if the host lookup
/// fails, and [`Error::NoIpv4Address`] if it only yields IPv6 addresses.
pub fn resolve(host: &str, service: &str) -> Result<SocketAddrV4> {
    let port = lookup_port(service)?;

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| Error::Resolve {
            host: host.to_string(),
            source,
        })?;

    let addr = addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| Error::NoIpv4Address(host.to_string()))?;

    tracing::debug!("Resolved {} to {}", host, addr);
    Ok(addr)
}

/// Configure TCP keep-alive on a socket.
///
/// - Start probing after 10 seconds of idle time
/// - Send probes every 5 seconds
fn configure_tcp_keepalive(socket: SockRef<'_>) {
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(10))
        .with_interval(Duration::from_secs(5));

    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        tracing::warn!("Failed to enable TCP keep-alive: {}", e);
    }
}

/// A connected TCP socket to the transfer destination.
///
/// The socket is released when the connection is dropped. [`close`](Self::close)
/// additionally shuts down the write half so the peer sees end-of-stream.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddrV4,
}

impl Connection {
    /// Open an IPv4 TCP connection to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`]; the half-open socket is closed first.
    pub fn connect(addr: SocketAddrV4) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| Error::Connect { addr, source })?;

        socket
            .connect(&addr.into())
            .map_err(|source| Error::Connect { addr, source })?;

        configure_tcp_keepalive(SockRef::from(&socket));
        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            stream: socket.into(),
            peer: addr,
        })
    }

    /// Address of the remote end.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddrV4 {
        self.peer
    }

    /// The underlying stream.
    #[must_use]
    pub const fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Signal end-of-stream to the peer and release the socket.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the shutdown fails for any reason other than
    /// the peer having already disconnected.
    pub fn close(self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Write) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                tracing::debug!("Peer {} already disconnected", self.peer);
            }
            Err(e) => return Err(Error::Io(e)),
        }
        tracing::debug!("Closed connection to {}", self.peer);
        Ok(())
    }
}

impl Transport for Connection {
    fn transmit_file(&mut self, file: &File, offset: u64, len: u64) -> Result<()> {
        zero_copy::transmit_file(&self.stream, file, offset, len)
    }

    fn send_all(&mut self, buf: &[u8]) -> Result<()> {
        (&self.stream).write_all(buf).map_err(Error::Send)
    }
}

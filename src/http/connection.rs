//! Socket connection setup (spec §4.6 "Connection").
//!
//! Tries IPv4 first, falls back to IPv6 on failure (`addr_cache::resolve`
//! already orders addresses that way). Applies an optional connect
//! timeout to the socket, then clears it for subsequent I/O. For
//! `https://`, initialises TLS on the socket and performs the handshake.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use native_tls::TlsStream;

use crate::error::{DasError, Result};
use crate::http::{addr_cache, tls};

/// A connected socket, optionally wrapped in a TLS session.
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Connection {
    /// Resolve `host:port`, connect (IPv4 before IPv6), and perform the
    /// TLS handshake if `use_tls` is set (spec §4.6).
    pub fn connect(host: &str, port: u16, use_tls: bool, connect_timeout: Option<Duration>) -> Result<Connection> {
        let addrs = addr_cache::resolve(host, port)?;
        if addrs.is_empty() {
            return Err(DasError::InvalidArgument(format!("no addresses resolved for {host}:{port}")));
        }
        let mut last_err = None;
        for addr in &addrs {
            let attempt = match connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    // clear the connect timeout for subsequent I/O (spec §4.6).
                    stream.set_read_timeout(None).ok();
                    stream.set_write_timeout(None).ok();
                    if !use_tls {
                        return Ok(Connection::Plain(stream));
                    }
                    let connector = tls::global_connector()?;
                    let tls_stream = connector
                        .connect(host, stream)
                        .map_err(|e| DasError::InvalidArgument(format!("TLS handshake with {host} failed: {e}")))?;
                    return Ok(Connection::Tls(Box::new(tls_stream)));
                }
                Err(e) => last_err = Some(e),
            }
        }
        addr_cache::invalidate(host, port);
        Err(DasError::Io(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "connect failed"))))
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.read(buf),
            Connection::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.write(buf),
            Connection::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(s) => s.flush(),
            Connection::Tls(s) => s.flush(),
        }
    }
}

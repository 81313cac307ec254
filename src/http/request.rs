//! HTTP/1.0 request construction and header parsing (spec §4.6 "Request").

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::error::{DasError, Result};

const USER_AGENT: &str = "das/0.1";

/// A parsed URL's HTTP-relevant parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub https: bool,
    pub host: String,
    pub port: u16,
    pub path_and_query: String,
}

impl Url {
    pub fn parse(raw: &str) -> Result<Url> {
        let (scheme, rest) = raw.split_once("://").ok_or_else(|| {
            DasError::InvalidArgument(format!("URL '{raw}' has no scheme"))
        })?;
        let https = match scheme {
            "http" => false,
            "https" => true,
            other => return Err(DasError::InvalidArgument(format!("unsupported URL scheme '{other}'"))),
        };
        let (authority, path_and_query) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h, p.parse().map_err(|_| DasError::InvalidArgument(format!("invalid port in '{raw}'")))?),
            None => (authority, if https { 443 } else { 80 }),
        };
        if host.is_empty() {
            return Err(DasError::InvalidArgument(format!("URL '{raw}' has no host")));
        }
        Ok(Url { https, host: host.to_string(), port, path_and_query: path_and_query.to_string() })
    }
}

/// Issue `GET path?query HTTP/1.0` with the standard das headers (spec
/// §4.6). `auth` is a pre-encoded `base64(user:pass)` token, if any.
pub fn write_get_request<W: Write>(w: &mut W, url: &Url, auth: Option<&str>) -> Result<()> {
    write!(w, "GET {} HTTP/1.0\r\n", url.path_and_query)?;
    write!(w, "Host: {}\r\n", url.host)?;
    write!(w, "User-Agent: {USER_AGENT}\r\n")?;
    if let Some(token) = auth {
        write!(w, "Authorization: Basic {token}\r\n")?;
    }
    write!(w, "Connection: close\r\n")?;
    write!(w, "\r\n")?;
    w.flush()?;
    Ok(())
}

/// A parsed HTTP/1.0 status line + header block.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Read the status line and headers up to the blank line terminator,
/// leaving the body available for streaming from `r` afterward (spec
/// §4.6 "peek-then-consume so that the body remains in the socket").
pub fn read_response_head<R: BufRead>(r: &mut R) -> Result<ResponseHead> {
    let mut status_line = String::new();
    r.read_line(&mut status_line)?;
    let status_line = status_line.trim_end();
    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next().ok_or_else(|| DasError::Protocol { offset: 0, msg: "empty status line".into() })?;
    let status: u16 = parts
        .next()
        .ok_or_else(|| DasError::Protocol { offset: 0, msg: "missing status code".into() })?
        .parse()
        .map_err(|_| DasError::Protocol { offset: 0, msg: format!("invalid status code in '{status_line}'") })?;
    let reason = parts.next().unwrap_or("").to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        let n = r.read_line(&mut line)?;
        if n == 0 {
            return Err(DasError::Protocol { offset: 0, msg: "EOF while reading headers".into() });
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    Ok(ResponseHead { status, reason, headers })
}

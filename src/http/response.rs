//! HTTP response state machine (spec §4.6 "Response state machine").

use std::io::BufReader;
use std::time::Duration;

use crate::credentials::CredentialsManager;
use crate::error::{DasError, Result};
use crate::http::connection::Connection;
use crate::http::request::{read_response_head, write_get_request, Url};

const MAX_REDIRECTS: u32 = 8;

/// A successfully-resolved `200` response: a readable body socket plus
/// the filename (from `Content-Disposition`) and content type.
pub struct HttpResponse {
    pub body: BufReader<Connection>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

fn parse_content_disposition_filename(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let (key, val) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("filename") {
            Some(val.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

fn parse_www_authenticate_realm(value: &str) -> Option<String> {
    value.split(',').find_map(|part| {
        let part = part.trim();
        let lower = part.to_ascii_lowercase();
        if let Some(idx) = lower.find("realm=") {
            let raw = &part[idx + "realm=".len()..];
            return Some(raw.trim().trim_matches('"').to_string());
        }
        None
    })
}

/// Issue a `GET` and drive the response state machine to completion:
/// follows redirects, satisfies `401` via the credentials manager, and
/// returns an error string for `400/403/404/5xx` (spec §4.6).
pub fn get(url: &str, credentials: &mut CredentialsManager, connect_timeout: Option<Duration>) -> Result<HttpResponse> {
    let mut current = Url::parse(url)?;
    let mut auth_token: Option<String> = None;
    let mut redirects = 0;

    loop {
        let mut conn = Connection::connect(&current.host, current.port, current.https, connect_timeout)?;
        write_get_request(&mut conn, &current, auth_token.as_deref())?;
        let mut reader = BufReader::new(conn);
        let head = read_response_head(&mut reader)?;

        match head.status {
            200 => {
                let filename = head
                    .header("content-disposition")
                    .and_then(parse_content_disposition_filename);
                let content_type = head.header("content-type").map(str::to_string);
                return Ok(HttpResponse { body: reader, filename, content_type });
            }
            301 | 302 | 307 | 308 => {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(DasError::Protocol { offset: 0, msg: "too many redirects".into() });
                }
                let location = head.header("location").ok_or_else(|| {
                    DasError::Protocol { offset: 0, msg: format!("{} redirect has no Location header", head.status) }
                })?;
                current = Url::parse(location)?;
                auth_token = None;
            }
            401 => {
                let realm = head
                    .header("www-authenticate")
                    .and_then(parse_www_authenticate_realm)
                    .unwrap_or_default();
                let retry_with_same_token = auth_token.is_some();
                if retry_with_same_token {
                    credentials.mark_failed(&current.host, &realm);
                }
                match credentials.get_http_auth(&current.host, &realm) {
                    Some(token) => auth_token = Some(token),
                    None => {
                        return Err(DasError::AuthRejected { server: current.host.clone(), realm });
                    }
                }
            }
            403 | 404 | 400 => {
                return Err(DasError::NotFound(format!("{} {} for {}", head.status, head.reason, url)));
            }
            500..=599 => {
                return Err(DasError::Protocol { offset: 0, msg: format!("server error {} {} for {}", head.status, head.reason, url) });
            }
            other => {
                return Err(DasError::Protocol { offset: 0, msg: format!("unexpected HTTP status {other} for {url}") });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_disposition_filename() {
        let v = r#"attachment; filename="orbit.d2s""#;
        assert_eq!(parse_content_disposition_filename(v), Some("orbit.d2s".into()));
    }

    #[test]
    fn parses_www_authenticate_realm() {
        let v = r#"Basic realm="das-server""#;
        assert_eq!(parse_www_authenticate_realm(v), Some("das-server".into()));
    }

    #[test]
    fn missing_filename_in_content_disposition_yields_none() {
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }
}

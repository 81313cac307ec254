//! HTTP(S) client layer (spec §4.6).

pub mod addr_cache;
pub mod connection;
pub mod request;
pub mod response;
pub mod tls;

pub use connection::Connection;
pub use request::Url;
pub use response::{get, HttpResponse};

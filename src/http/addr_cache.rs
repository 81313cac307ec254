//! Hostname:port → resolved-address cache (spec §5 concurrency table).
//!
//! Grounded on the teacher's mutex-protected shared-cache pattern
//! (`database_manager.rs`'s `RwLock<HashMap<String, Arc<Database>>>`
//! registry); here a `Mutex<HashMap<...>>` since entries are small `Vec`s
//! of addresses rather than `Arc`-shared objects, so there's no benefit to
//! a read/write split.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Mutex, OnceLock};

use crate::error::{DasError, Result};

static ADDR_CACHE: OnceLock<Mutex<HashMap<String, Vec<SocketAddr>>>> = OnceLock::new();

fn cache() -> &'static Mutex<HashMap<String, Vec<SocketAddr>>> {
    ADDR_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Resolve `host:port`, consulting (and populating) the process-global
/// cache. IPv4 addresses sort before IPv6 so the connection layer's
/// "IPv4 then IPv6 fallback" policy (spec §4.6) can just try them in order.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let key = format!("{host}:{port}");
    {
        let guard = cache().lock().map_err(|_| DasError::InvalidArgument("address cache mutex poisoned".into()))?;
        if let Some(addrs) = guard.get(&key) {
            return Ok(addrs.clone());
        }
    }
    let mut addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    addrs.sort_by_key(|a| !a.is_ipv4());
    let mut guard = cache().lock().map_err(|_| DasError::InvalidArgument("address cache mutex poisoned".into()))?;
    guard.insert(key, addrs.clone());
    Ok(addrs)
}

/// Evict a cached entry, e.g. after a connection failure forces a
/// re-resolve.
pub fn invalidate(host: &str, port: u16) {
    let key = format!("{host}:{port}");
    if let Ok(mut guard) = cache().lock() {
        guard.remove(&key);
    }
}

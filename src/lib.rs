//! Core library for the *das* scientific-data streaming format.
//!
//! A das stream is a self-describing, record-oriented binary sequence of
//! descriptor and data packets; readers consume such streams over files,
//! pipes, and HTTP(S), and writers emit them. This crate provides:
//!
//! * [`array`] — the ragged multi-dimensional array layer backing variable
//!   data.
//! * [`variable`] — the variable graph (`Const`/`Sequence`/`ArrayVar`/
//!   `UnaryOp`/`BinaryOp`) with type promotion and unit algebra.
//! * [`dimension`] and [`dataset`] — named groupings of variables sharing
//!   an external index space.
//! * [`units`] — the interned units table and conversion algebra.
//! * [`stream`] — packet framing, descriptor/OOB XML, and deflate wrap.
//! * [`http`], [`credentials`], [`catalog`] — the transport and resolution
//!   layer sitting above the stream I/O engine.
//!
//! Concurrency model: single-threaded per stream/array/variable/dataset/
//! response (spec §5). Reference counts use `Rc`, not `Arc` — this library
//! is not meant to be shared across threads.

pub mod array;
pub mod catalog;
pub mod credentials;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod http;
pub mod progress;
pub mod shape;
pub mod stream;
pub mod time;
pub mod units;
pub mod value;
pub mod variable;

pub use error::{DasError, Result};

/// Install a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, defaulting to `info`. Safe to call more than once; only
/// the first call takes effect.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

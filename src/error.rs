//! Error types for the das core.
//!
//! One enum covers every subsystem (value, units, array, variable, stream
//! I/O, HTTP, credentials, catalog) so that callers propagating a `?` chain
//! never need an intermediate `From` impl of their own. Each variant maps to
//! a stable wire error code (used in `<exception>` OOB packets) and a
//! process exit code (spec §6 "10-25 correspond to distinct subsystem
//! errors; 99 is not implemented").

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DasError>;

#[derive(Error, Debug)]
pub enum DasError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("protocol violation at byte {offset}: {msg}")]
    Protocol { offset: u64, msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("unit incompatible: cannot convert '{from}' to '{to}'")]
    UnitIncompatible { from: String, to: String },

    #[error("value-type incompatible: {0}")]
    ValueTypeIncompatible(String),

    #[error("range/overflow: {0}")]
    RangeOverflow(String),

    #[error("auth required: realm '{realm}' on {server}")]
    AuthRequired { server: String, realm: String },

    #[error("auth rejected: realm '{realm}' on {server}")]
    AuthRejected { server: String, realm: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl DasError {
    /// Stable wire error code, used as the `type` attribute of an
    /// `<exception>` out-of-band packet.
    pub fn code(&self) -> &'static str {
        match self {
            DasError::InvalidArgument(_) => "InvalidArgument",
            DasError::Protocol { .. } => "StreamFormat",
            DasError::Io(_) => "IoError",
            DasError::Xml(_) => "StreamFormat",
            DasError::Json(_) => "StreamFormat",
            DasError::ResourceExhausted(_) => "ResourceExhausted",
            DasError::UnitIncompatible { .. } => "UnitIncompatible",
            DasError::ValueTypeIncompatible(_) => "ValueTypeIncompatible",
            DasError::RangeOverflow(_) => "RangeOverflow",
            DasError::AuthRequired { .. } => "AuthRequired",
            DasError::AuthRejected { .. } => "AuthRejected",
            DasError::NotFound(_) => "NotFound",
            DasError::NotImplemented(_) => "NotImplemented",
        }
    }

    /// Process exit code for this error (spec §6: 10-25 per subsystem, 99
    /// for "not implemented").
    pub fn exit_code(&self) -> i32 {
        match self {
            DasError::InvalidArgument(_) => 10,
            DasError::Protocol { .. } => 11,
            DasError::Io(_) => 12,
            DasError::Xml(_) => 13,
            DasError::Json(_) => 13,
            DasError::ResourceExhausted(_) => 14,
            DasError::UnitIncompatible { .. } => 15,
            DasError::ValueTypeIncompatible(_) => 16,
            DasError::RangeOverflow(_) => 17,
            DasError::AuthRequired { .. } => 18,
            DasError::AuthRejected { .. } => 19,
            DasError::NotFound(_) => 20,
            DasError::NotImplemented(_) => 99,
        }
    }
}

/// Error disposition (spec §5/§7/§9). The default and *only* disposition in
/// library code is `Return` (propagate via `Result`). `Exit`/`Abort` exist
/// solely so tests and the demo binary can opt into the legacy behaviour;
/// per the spec §9 redesign note this is explicitly not the production
/// control-flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    Return,
    Exit,
    Abort,
}

impl Default for ErrorDisposition {
    fn default() -> Self {
        ErrorDisposition::Return
    }
}

/// Apply a disposition to a failed result. In `Return` mode this is the
/// identity function; library code should never call this directly.
pub fn dispose<T>(result: Result<T>, disposition: ErrorDisposition) -> Result<T> {
    if let Err(ref e) = result {
        match disposition {
            ErrorDisposition::Return => {}
            ErrorDisposition::Exit => {
                tracing::error!(code = e.code(), "{e}");
                std::process::exit(e.exit_code());
            }
            ErrorDisposition::Abort => {
                tracing::error!(code = e.code(), "{e}");
                std::process::abort();
            }
        }
    }
    result
}

// src/errors.rs

//! Crate-wide error type and the error-kind taxonomy surfaced to callers.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TupledagError {
    /// Malformed or incoherent input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Caller not authorized for the referenced asset or tuple.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Duplicate key or duplicate (compute plan, worker, rank) slot.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        key: Option<String>,
    },

    /// Queried key absent, or present with another asset type.
    #[error("not found: {0}")]
    NotFound(String),

    /// Ledger inconsistency or caller bug (missing parent, illegal transition).
    #[error("internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification handlers report next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Forbidden,
    Conflict,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl TupledagError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        TupledagError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        TupledagError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        TupledagError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        TupledagError::Internal(msg.into())
    }

    /// Conflict carrying the offending key.
    pub fn conflict_with_key(msg: impl Into<String>, key: impl Into<String>) -> Self {
        TupledagError::Conflict {
            message: msg.into(),
            key: Some(key.into()),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        TupledagError::Conflict {
            message: msg.into(),
            key: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TupledagError::BadRequest(_)
            | TupledagError::ConfigError(_)
            | TupledagError::IoError(_)
            | TupledagError::TomlError(_) => ErrorKind::BadRequest,
            TupledagError::Forbidden(_) => ErrorKind::Forbidden,
            TupledagError::Conflict { .. } => ErrorKind::Conflict,
            TupledagError::NotFound(_) => ErrorKind::NotFound,
            TupledagError::Internal(_)
            | TupledagError::Serialization(_)
            | TupledagError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Re-tag a lookup failure as a bad request, keeping the cause in the message.
    ///
    /// Used at the request boundary, where a missing referenced asset is the
    /// caller's mistake rather than a ledger inconsistency.
    pub fn into_bad_request(self, context: impl fmt::Display) -> Self {
        match self {
            TupledagError::NotFound(msg) | TupledagError::BadRequest(msg) => {
                TupledagError::BadRequest(format!("{context}: {msg}"))
            }
            other => other,
        }
    }

    /// Re-tag a lookup failure as internal; for references that must exist.
    pub fn into_internal(self, context: impl fmt::Display) -> Self {
        match self {
            TupledagError::NotFound(msg) | TupledagError::BadRequest(msg) => {
                TupledagError::Internal(format!("{context}: {msg}"))
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, TupledagError>;

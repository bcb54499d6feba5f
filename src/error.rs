//! Error types and the error reporting side channel.
//!
//! Fallible operations return [`Result`]. In addition, every error that
//! crosses the public API through [`report`] is recorded as the calling
//! thread's "last error" and forwarded to the registered callback, so a
//! caller that cannot consume Rust errors directly still observes the
//! failure.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::sync::Arc;
use thiserror::Error;

/// Result type for volume operations
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Stable error codes for the reporting boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    NoError = 0,
    UnknownError = 1,
    InvalidArgument = 2,
    InvalidOperation = 3,
    OutOfMemory = 4,
    UnsupportedCpu = 5,
}

/// Errors raised while configuring or committing a volume
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VolumeError {
    #[error("missing required '{0}' parameter")]
    MissingParameter(&'static str),

    #[error("parameter '{name}' has the wrong type, expected {expected}")]
    ParameterType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("invalid '{name}' parameter: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("incorrect data (attribute {index}): {reason}")]
    Attribute { index: usize, reason: String },

    #[error("invalid time configuration (attribute {attribute}): {reason}")]
    TimeConfig { attribute: usize, reason: String },

    #[error("volume has not been committed")]
    NotCommitted,

    #[error("attribute index {index} out of range for {count} attributes")]
    AttributeIndex { index: usize, count: usize },
}

impl VolumeError {
    pub(crate) fn attribute(index: usize, reason: impl Into<String>) -> Self {
        VolumeError::Attribute {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn time_config(attribute: usize, reason: impl Into<String>) -> Self {
        VolumeError::TimeConfig {
            attribute,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        VolumeError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            VolumeError::NotCommitted => ErrorCode::InvalidOperation,
            _ => ErrorCode::InvalidArgument,
        }
    }
}

/// Callback invoked synchronously with every reported error
pub type ErrorCallback = Arc<dyn Fn(ErrorCode, &str) + Send + Sync>;

static ERROR_CALLBACK: Lazy<RwLock<Option<ErrorCallback>>> = Lazy::new(|| RwLock::new(None));

thread_local! {
    static LAST_ERROR: RefCell<(ErrorCode, String)> =
        RefCell::new((ErrorCode::NoError, String::new()));
}

/// Register (or clear, with `None`) the process-wide error callback
pub fn set_error_callback(callback: Option<ErrorCallback>) {
    *ERROR_CALLBACK.write() = callback;
}

/// Code of the most recent error reported on this thread
pub fn last_error_code() -> ErrorCode {
    LAST_ERROR.with(|last| last.borrow().0)
}

/// Message of the most recent error reported on this thread
pub fn last_error_message() -> String {
    LAST_ERROR.with(|last| last.borrow().1.clone())
}

/// Reset this thread's last error to `NoError`
pub fn clear_last_error() {
    LAST_ERROR.with(|last| *last.borrow_mut() = (ErrorCode::NoError, String::new()));
}

/// Record `error` as this thread's last error, log it and notify the callback
pub fn report(error: &VolumeError) {
    let code = error.code();
    let message = error.to_string();

    tracing::error!(code = ?code, "{}", message);

    LAST_ERROR.with(|last| *last.borrow_mut() = (code, message.clone()));

    // Clone out of the lock so a callback may re-register itself
    let callback = ERROR_CALLBACK.read().clone();
    if let Some(callback) = callback {
        callback(code, &message);
    }
}

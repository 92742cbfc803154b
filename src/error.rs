//! Error types: the fixed SCORM API error-code taxonomy returned to content
//! packages, and the internal error enum for everything behind the API.

use thiserror::Error;
use uuid::Uuid;

/// Result type using RteError.
pub type Result<T> = std::result::Result<T, RteError>;

/// The SCORM API error codes. Returned to the content package as part of the
/// normal call contract, never raised as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NoError,
    GeneralException,
    InvalidArgument,
    NotInitialized,
    NotImplemented,
    InvalidSetValue,
    ReadOnlyElement,
    WriteOnlyElement,
    TypeMismatch,
}

impl ErrorCode {
    /// Numeric wire code, per the SCORM 1.2 API signature.
    pub fn code(self) -> u16 {
        match self {
            Self::NoError => 0,
            Self::GeneralException => 101,
            Self::InvalidArgument => 201,
            Self::NotInitialized => 301,
            Self::NotImplemented => 401,
            Self::InvalidSetValue => 402,
            Self::ReadOnlyElement => 403,
            Self::WriteOnlyElement => 404,
            Self::TypeMismatch => 405,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0 => Self::NoError,
            101 => Self::GeneralException,
            201 => Self::InvalidArgument,
            301 => Self::NotInitialized,
            401 => Self::NotImplemented,
            402 => Self::InvalidSetValue,
            403 => Self::ReadOnlyElement,
            404 => Self::WriteOnlyElement,
            405 => Self::TypeMismatch,
            _ => return None,
        })
    }

    /// Human-readable string for GetErrorString.
    pub fn message(self) -> &'static str {
        match self {
            Self::NoError => "No error",
            Self::GeneralException => "General exception",
            Self::InvalidArgument => "Invalid argument error",
            Self::NotInitialized => "Not initialized",
            Self::NotImplemented => "Not implemented error",
            Self::InvalidSetValue => "Invalid set value, element is a keyword",
            Self::ReadOnlyElement => "Element is read only",
            Self::WriteOnlyElement => "Element is write only",
            Self::TypeMismatch => "Incorrect data type",
        }
    }
}

/// Internal errors from the stores and services.
#[derive(Debug, Error)]
pub enum RteError {
    #[error("attempt '{0}' not found")]
    AttemptNotFound(Uuid),

    #[error("package '{0}' not found")]
    PackageNotFound(Uuid),

    #[error("database error during '{operation}': {details}")]
    Database { operation: String, details: String },

    /// Two synchronization runs raced on the same attempt. Resolved by
    /// retrying after the lock is released, never by last-write-wins.
    #[error("synchronization conflict on attempt '{0}'")]
    SyncConflict(Uuid),
}

impl RteError {
    pub fn database(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            operation: operation.to_string(),
            details: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for RteError {
    fn from(err: sqlx::Error) -> Self {
        RteError::Database {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

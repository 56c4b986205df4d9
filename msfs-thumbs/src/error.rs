use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error codes for engine operations
///
/// Discovery itself never surfaces errors to callers; these codes describe
/// failures of the explicit operations (declaring a path, persisting the map).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Input validation failed (empty id, path is a directory, ...)
    ValidationFailed,
    /// Permission denied while reading or writing
    PermissionDenied,
    /// File or directory doesn't exist
    NotFound,
    /// Data is corrupted or in unexpected format
    CorruptedData,
    /// Any other I/O failure
    IoError,
    /// Internal error (unexpected condition)
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::ValidationFailed => write!(f, "validation_failed"),
            ErrorCode::PermissionDenied => write!(f, "permission_denied"),
            ErrorCode::NotFound => write!(f, "not_found"),
            ErrorCode::CorruptedData => write!(f, "corrupted_data"),
            ErrorCode::IoError => write!(f, "io_error"),
            ErrorCode::Internal => write!(f, "internal"),
        }
    }
}

/// Engine error with code, message, and optional details
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}{}", .details.as_ref().map(|d| format!(" ({})", d)).unwrap_or_default())]
pub struct ThumbError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (usually the offending path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ThumbError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CorruptedData, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl From<std::io::Error> for ThumbError {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            std::io::ErrorKind::InvalidData => ErrorCode::CorruptedData,
            _ => ErrorCode::IoError,
        };
        ThumbError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for ThumbError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return ThumbError::new(ErrorCode::IoError, err.to_string());
        }
        ThumbError::corrupted(err.to_string())
    }
}

impl From<anyhow::Error> for ThumbError {
    fn from(err: anyhow::Error) -> Self {
        // Prefer the code of a wrapped io error, if any
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            let mut mapped = ThumbError::from(std::io::Error::new(io.kind(), io.to_string()));
            mapped.message = format!("{:#}", err);
            return mapped;
        }

        let message = format!("{:#}", err);
        let lower = message.to_lowercase();
        if lower.contains("not found") || lower.contains("does not exist") {
            return ThumbError::not_found(message);
        }
        if lower.contains("corrupt") || lower.contains("malformed") {
            return ThumbError::corrupted(message);
        }
        ThumbError::internal(message)
    }
}

/// Result type alias for engine operations
pub type ThumbResult<T> = std::result::Result<T, ThumbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ThumbError::validation("Empty package id");
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "Empty package id");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = ThumbError::with_details(ErrorCode::NotFound, "Thumbnail missing", "/x/t.png");
        let display = err.to_string();
        assert_eq!(display, "[not_found] Thumbnail missing (/x/t.png)");

        let plain = ThumbError::internal("boom");
        assert_eq!(plain.to_string(), "[internal] boom");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ThumbError = io_err.into();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ThumbError::from(io_err).code, ErrorCode::NotFound);
    }

    #[test]
    fn test_json_error_is_corrupted_data() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ThumbError = json_err.into();
        assert_eq!(err.code, ErrorCode::CorruptedData);
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let wrapped = anyhow::Error::new(io).context("Failed to read UserCfg.opt");
        let err: ThumbError = wrapped.into();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(err.message.contains("UserCfg.opt"));

        let err: ThumbError = anyhow::anyhow!("Package folder not found").into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ThumbError = anyhow::anyhow!("something odd").into();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[test]
    fn test_serialization() {
        let err = ThumbError::validation("test error");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("validation_failed"));
        assert!(!json.contains("details"));
    }
}

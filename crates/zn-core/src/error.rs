// ── Core error types ──
//
// User-facing errors from zn-core. The `From<zn_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants while
// keeping the response body for operators.

use std::path::Path;

use thiserror::Error;

use crate::gate::GateFailure;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out: {reason}")]
    Timeout { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        body: Option<String>,
    },

    #[error("Already exists: {message}")]
    Conflict { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Precondition failed: {0}")]
    Gate(#[from] GateFailure),

    #[error("Process error: {message}")]
    Process { message: String },

    // ── API errors ───────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        /// Raw response body, surfaced verbatim.
        body: Option<String>,
    },

    #[error("Invalid API token: {0}")]
    Token(String),

    // ── Local files ──────────────────────────────────────────────────
    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn csv(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Csv {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    /// Timeouts and connection failures; worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Raw response body when the error came from the API.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::NotFound { body, .. } | Self::Api { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<zn_api::Error> for CoreError {
    fn from(err: zn_api::Error) -> Self {
        use zn_api::Error as E;
        match err {
            E::Unauthorized { message, .. } | E::InvalidApiKey(message) => {
                CoreError::AuthenticationFailed { message }
            }
            E::Forbidden { message, .. } => CoreError::PermissionDenied { message },
            E::NotFound { message, body } => CoreError::NotFound {
                message,
                body: Some(body),
            },
            E::Conflict { message, .. } => CoreError::Conflict { message },
            E::BadRequest { message, body } => CoreError::Api {
                message,
                status: Some(400),
                body: Some(body),
            },
            E::Server {
                status,
                message,
                body,
            }
            | E::Http {
                status,
                message,
                body,
            } => CoreError::Api {
                message,
                status: Some(status),
                body: Some(body),
            },
            E::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        reason: e.to_string(),
                    }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                        body: None,
                    }
                }
            }
            E::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            E::Token(message) => CoreError::Token(message),
            E::Filter(message) => CoreError::Validation { message },
            E::Deserialization { message, body } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
                body: Some(body),
            },
            E::Serialization(e) => CoreError::Internal(format!("Serialization error: {e}")),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization error: {e}"))
    }
}

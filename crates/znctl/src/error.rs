//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use zn_config::ConfigError;
use zn_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(znctl::connection_failed),
        help(
            "Check network access to the portal.\n\
             The host comes from --base-url, the profile, or the API token.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out: {reason}")]
    #[diagnostic(
        code(znctl::timeout),
        help("Increase the timeout with --timeout or the profile's `timeout` setting.")
    )]
    Timeout { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(znctl::auth_failed),
        help(
            "Check that the API key is current and has the required role.\n\
             Inspect it with: znctl token decode"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(znctl::no_credentials),
        help(
            "Configure credentials with: znctl config init\n\
             Or set the ZN_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Invalid API token: {message}")]
    #[diagnostic(
        code(znctl::token),
        help("API keys are three base64url segments separated by dots.")
    )]
    Token { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Not found: {message}")]
    #[diagnostic(code(znctl::not_found))]
    NotFound { message: String },

    #[error("Already exists: {message}")]
    #[diagnostic(code(znctl::conflict))]
    Conflict { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(znctl::api_error), help("Server response:\n{body}"))]
    Api { message: String, body: String },

    #[error("{message}")]
    #[diagnostic(code(znctl::failed))]
    Failed { message: String },

    // ── Bulk operations ──────────────────────────────────────────────
    #[error("{failed} of {total} {operation} operations failed")]
    #[diagnostic(
        code(znctl::partial_failure),
        help("The failures are listed above. Re-run with -v for per-item logs.")
    )]
    PartialFailure {
        operation: String,
        failed: usize,
        total: usize,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(znctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(znctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: znctl config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(znctl::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(znctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(znctl::serialization))]
    Serialization(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Token { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<zn_api::Error> for CliError {
    fn from(err: zn_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout { reason } => Self::Timeout { reason },
            CoreError::AuthenticationFailed { message } | CoreError::PermissionDenied { message } => {
                Self::AuthFailed { message }
            }
            CoreError::Token(message) => Self::Token { message },
            CoreError::NotFound { message, .. } => Self::NotFound { message },
            CoreError::Conflict { message } => Self::Conflict { message },
            CoreError::Validation { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Csv { path, message } => Self::Validation {
                field: path,
                reason: message,
            },
            CoreError::Api {
                message,
                body: Some(body),
                ..
            } if !body.trim().is_empty() => Self::Api { message, body },
            CoreError::Api { message, .. } => Self::Failed {
                message: format!("API error: {message}"),
            },
            CoreError::Config { message } => Self::Validation {
                field: "base_url".into(),
                reason: message,
            },
            other @ (CoreError::Gate(_)
            | CoreError::Process { .. }
            | CoreError::Io { .. }
            | CoreError::Internal(_)) => Self::Failed {
                message: other.to_string(),
            },
        }
    }
}

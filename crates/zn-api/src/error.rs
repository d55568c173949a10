use thiserror::Error;

/// Top-level error type for the `zn-api` crate.
///
/// HTTP failures are bucketed by status code and always carry the raw
/// response body so operators can see exactly what the API said.
/// `zn-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── HTTP status ─────────────────────────────────────────────────
    /// 400: invalid parameters or malformed request.
    #[error("Bad request (HTTP 400): {message}")]
    BadRequest { message: String, body: String },

    /// 401: missing, invalid or expired API key.
    #[error("Unauthorized (HTTP 401): {message}")]
    Unauthorized { message: String, body: String },

    /// 403: the API key lacks permission for the resource.
    #[error("Forbidden (HTTP 403): {message}")]
    Forbidden { message: String, body: String },

    /// 404: the requested resource does not exist.
    #[error("Not found (HTTP 404): {message}")]
    NotFound { message: String, body: String },

    /// 409: the resource already exists.
    #[error("Conflict (HTTP 409): {message}")]
    Conflict { message: String, body: String },

    /// Any 5xx response.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        status: u16,
        message: String,
        body: String,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API key cannot be used as a header value.
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    // ── Token ───────────────────────────────────────────────────────
    /// The API key could not be decoded as a three-segment token.
    #[error("Invalid API token: {0}")]
    Token(String),

    // ── Filters ─────────────────────────────────────────────────────
    /// A filter expression was empty or could not be parsed.
    #[error("Invalid filter: {0}")]
    Filter(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A request body could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build the error for a non-2xx response.
    ///
    /// The message comes from the body's `message`, `error` or `detail`
    /// field, then the raw text, then a per-status default.
    pub fn from_status(status: u16, body: String) -> Self {
        let message =
            extract_message(&body).unwrap_or_else(|| default_message(status).to_owned());
        match status {
            400 => Self::BadRequest { message, body },
            401 => Self::Unauthorized { message, body },
            403 => Self::Forbidden { message, body },
            404 => Self::NotFound { message, body },
            409 => Self::Conflict { message, body },
            500..=599 => Self::Server {
                status,
                message,
                body,
            },
            _ => Self::Http {
                status,
                message,
                body,
            },
        }
    }

    /// The HTTP status code, if this error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The raw response body, if this error came from a response.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::BadRequest { body, .. }
            | Self::Unauthorized { body, .. }
            | Self::Forbidden { body, .. }
            | Self::NotFound { body, .. }
            | Self::Conflict { body, .. }
            | Self::Server { body, .. }
            | Self::Http { body, .. }
            | Self::Deserialization { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the server reported the resource already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` for 401/403 responses.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Only transport-level timeouts and connection failures qualify;
    /// HTTP status errors are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => ["message", "error", "detail"]
            .iter()
            .filter_map(|key| map.get(*key))
            .filter_map(serde_json::Value::as_str)
            .find(|s| !s.trim().is_empty())
            .map(str::to_owned),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_owned()),
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad Request - Invalid parameters or malformed request",
        401 => "Unauthorized - Invalid or missing API key",
        403 => "Forbidden - API key does not have permission for this resource",
        404 => "Not Found - The requested resource does not exist",
        409 => "Conflict - The resource already exists",
        500 => "Internal Server Error - The API server encountered an error",
        502 => "Bad Gateway - The API gateway received an invalid response",
        503 => "Service Unavailable - The API service is temporarily unavailable",
        _ => "Unexpected HTTP status",
    }
}

use thiserror::Error;

/// Top-level error type for the `acoslb-api` crate.
///
/// Covers every failure mode of an AXAPI conversation: authentication,
/// transport, the `{response: {status, err}}` error envelope, and decoding.
/// `acoslb-core` maps these into cache-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An operation needed a session but none has been established.
    #[error("No active AXAPI session")]
    NoSession,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── AXAPI ───────────────────────────────────────────────────────
    /// Error reported by the appliance inside the response envelope.
    #[error("AXAPI error: {message}")]
    Axapi { message: String, code: Option<i64> },

    /// The requested AXAPI version is not one this client speaks.
    #[error("Unsupported AXAPI version: {0}")]
    UnsupportedVersion(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the appliance no longer accepts the session
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Authentication { .. } | Self::NoSession => true,
            // 1009 = "Invalid session ID" on AXAPI v2.1
            Self::Axapi { code, .. } => *code == Some(1009),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

// ── Core error types ──
//
// Errors surfaced by the session cache and the parameter adapter. Raw
// transport failures from `acoslb-api` are translated by the `From` impl
// below, except where a variant keeps the original as its `source` so the
// caller can still see what the appliance said.

use std::sync::Arc;

use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone` so one failed single-flight creation can hand the same error to
/// every caller that joined it.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Session lifecycle ────────────────────────────────────────────
    #[error("No usable session for appliance {key} after {attempts} attempts")]
    ClientUnavailable {
        key: String,
        attempts: u32,
        #[source]
        source: Arc<acoslb_api::Error>,
    },

    #[error("Appliance {key} did not acknowledge session close after {attempts} attempts: {status}")]
    SessionCloseFailed {
        key: String,
        attempts: u32,
        status: String,
    },

    #[error("Session cache is shutting down")]
    ShuttingDown,

    #[error("Cannot connect to appliance at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Adapter ──────────────────────────────────────────────────────
    #[error("Unsupported AXAPI version: {version}")]
    UnsupportedApiVersion { version: String },

    #[error("Expected a JSON object for {what}")]
    InvalidOptions { what: String },

    // ── Inventory ────────────────────────────────────────────────────
    #[error("No appliances configured")]
    NoDevices,

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api { message: String, code: Option<i64> },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<acoslb_api::Error> for CoreError {
    fn from(err: acoslb_api::Error) -> Self {
        match err {
            acoslb_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            acoslb_api::Error::NoSession => CoreError::AuthenticationFailed {
                message: "no active session".into(),
            },
            acoslb_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            acoslb_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            acoslb_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            acoslb_api::Error::Axapi { message, code } => CoreError::Api { message, code },
            acoslb_api::Error::UnsupportedVersion(version) => {
                CoreError::UnsupportedApiVersion { version }
            }
            acoslb_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Deserialization error: {message}"),
                code: None,
            },
        }
    }
}

impl CoreError {
    /// `true` when the error means the appliance itself could not be used,
    /// as opposed to a local configuration or lifecycle problem.
    pub fn is_appliance_failure(&self) -> bool {
        matches!(
            self,
            Self::ClientUnavailable { .. }
                | Self::ConnectionFailed { .. }
                | Self::AuthenticationFailed { .. }
                | Self::Api { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_version_maps_to_adapter_variant() {
        let err = CoreError::from(acoslb_api::Error::UnsupportedVersion("9.9".into()));
        assert!(matches!(err, CoreError::UnsupportedApiVersion { ref version } if version == "9.9"));
        assert!(!err.is_appliance_failure());
    }

    #[test]
    fn client_unavailable_keeps_source() {
        let err = CoreError::ClientUnavailable {
            key: "10.0.0.1:443".into(),
            attempts: 9,
            source: Arc::new(acoslb_api::Error::Authentication {
                message: "bad password".into(),
            }),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Authentication failed: bad password"));
        assert!(err.is_appliance_failure());
    }
}

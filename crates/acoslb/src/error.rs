//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use acoslb_config::ConfigError;
use acoslb_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Appliances ───────────────────────────────────────────────────
    #[error("Appliance {address} is unavailable")]
    #[diagnostic(
        code(acoslb::unavailable),
        help(
            "Check that the management interface is reachable and the credentials are right.\n\
             Run with -vv to see each login attempt."
        )
    )]
    Unavailable {
        address: String,
        #[source]
        source: CoreError,
    },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(acoslb::auth_failed),
        help("Verify username and password (or password_env) for the device.")
    )]
    AuthFailed { message: String },

    #[error("{count} of {total} appliances unreachable")]
    #[diagnostic(code(acoslb::verify_failed))]
    VerifyFailed { count: usize, total: usize },

    // ── Inventory ────────────────────────────────────────────────────
    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(acoslb::not_found),
        help("Run: acoslb devices to see configured appliances")
    )]
    DeviceNotFound { identifier: String },

    #[error("No appliances configured")]
    #[diagnostic(
        code(acoslb::no_devices),
        help("Add a [devices.<name>] table to {path}")
    )]
    NoDevices { path: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(acoslb::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {source}")]
    #[diagnostic(code(acoslb::config), help("Check the config file: {path}"))]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── Everything else from the core ────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(acoslb::core))]
    Core(CoreError),

    #[error("{message}")]
    #[diagnostic(code(acoslb::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(acoslb::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(acoslb::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { identifier } => Self::DeviceNotFound { identifier },
            CoreError::UnsupportedApiVersion { version } => Self::Validation {
                field: "api_version".into(),
                reason: format!("'{version}' is not one of 2.1, 3.0"),
            },
            CoreError::InvalidOptions { what } => Self::Validation {
                field: "--options".into(),
                reason: format!("expected a JSON object for {what}"),
            },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::ClientUnavailable { ref key, .. } | CoreError::SessionCloseFailed { ref key, .. } => {
                Self::Unavailable {
                    address: key.clone(),
                    source: err,
                }
            }
            CoreError::ConnectionFailed { ref url, .. } => Self::Unavailable {
                address: url.clone(),
                source: err,
            },
            other => Self::Core(other),
        }
    }
}

impl CliError {
    pub fn config(path: &std::path::Path, source: ConfigError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } | Self::VerifyFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Core(err) if err.is_appliance_failure() => exit_code::CONNECTION,
            Self::DeviceNotFound { .. } | Self::NoDevices { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            Self::Core(_) | Self::Internal { .. } | Self::Io(_) | Self::Json(_) | Self::Yaml(_) => {
                exit_code::GENERAL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn client_unavailable_is_a_connection_failure() {
        let err = CliError::from(CoreError::ClientUnavailable {
            key: "10.0.0.1:443".into(),
            attempts: 9,
            source: Arc::new(acoslb_api::Error::NoSession),
        });
        assert!(matches!(err, CliError::Unavailable { ref address, .. } if address == "10.0.0.1:443"));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn appliance_side_api_error_is_a_connection_failure() {
        let err = CliError::from(CoreError::Api {
            message: "Invalid session ID".into(),
            code: Some(1009),
        });
        assert!(matches!(err, CliError::Core(_)));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);

        let local = CliError::from(CoreError::Internal("lost task".into()));
        assert_eq!(local.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn unknown_device_exit_code() {
        let err = CliError::from(CoreError::DeviceNotFound {
            identifier: "ax9".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}

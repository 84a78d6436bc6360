//! Configuration for acoslb.
//!
//! One TOML file describes the appliance fleet plus session and transport
//! tuning. Loading layers built-in defaults, the file, and `ACOSLB_`
//! environment variables, then resolves each `[devices.<key>]` table into
//! an `acoslb_core::DeviceDescriptor`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use acoslb_api::{Protocol, TlsMode, TransportConfig};
use acoslb_core::device::DEFAULT_API_VERSION;
use acoslb_core::{CachePolicy, DeviceDescriptor, DeviceInventory, IntFlag, PartitionMethod};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("device '{device}' is missing required field '{field}'")]
    InvalidDevice { device: String, field: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Log into every appliance at startup and report reachability.
    #[serde(default)]
    pub verify_appliances: bool,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub transport: TransportSettings,

    /// Appliances keyed by logical name.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_attempts")]
    pub create_attempts: u32,
    #[serde(default = "default_attempts")]
    pub close_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            create_attempts: default_attempts(),
            close_attempts: default_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    60
}
fn default_attempts() -> u32 {
    9
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_shutdown_grace_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept self-signed appliance certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// PEM bundle to trust instead of the system store.
    pub ca_cert: Option<PathBuf>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            insecure: default_insecure(),
            ca_cert: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_insecure() -> bool {
    true
}

/// One `[devices.<key>]` table.
///
/// Required fields are optional here so a missing one produces a
/// `ConfigError::InvalidDevice` naming the device.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub host: Option<String>,
    pub username: Option<String>,
    /// Plaintext password. Prefer `password_env`.
    pub password: Option<String>,
    /// Environment variable holding the password.
    pub password_env: Option<String>,

    pub name: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub api_version: Option<String>,
    /// `false` skips the device entirely.
    pub status: Option<bool>,

    pub autosnat: Option<IntFlag>,
    pub ipinip: Option<IntFlag>,
    pub default_virtual_server_vrid: Option<i64>,
    pub v_method: Option<String>,
    pub shared_partition: Option<String>,
    pub max_instance: Option<u32>,
    pub use_float: Option<bool>,
    pub method: Option<String>,
    pub ha_sync_list: Option<Vec<String>>,
    pub write_memory: Option<bool>,
}

impl DeviceEntry {
    pub fn is_enabled(&self) -> bool {
        self.status.unwrap_or(true)
    }

    /// Resolve this entry into a descriptor, applying defaults.
    pub fn to_descriptor(&self, key: &str) -> Result<DeviceDescriptor, ConfigError> {
        let missing = |field| ConfigError::InvalidDevice {
            device: key.to_owned(),
            field,
        };

        let host = self.host.clone().ok_or_else(|| missing("host"))?;
        let username = self.username.clone().ok_or_else(|| missing("username"))?;
        let password = self.resolve_password().ok_or_else(|| missing("password"))?;

        let protocol = match &self.protocol {
            Some(raw) => raw.parse::<Protocol>().map_err(|_| ConfigError::Validation {
                field: format!("devices.{key}.protocol"),
                reason: format!("expected 'http' or 'https', got '{raw}'"),
            })?,
            None => Protocol::default(),
        };

        let v_method = match &self.v_method {
            Some(raw) => raw.parse::<PartitionMethod>().map_err(|_| ConfigError::Validation {
                field: format!("devices.{key}.v_method"),
                reason: format!("expected 'LSI' or 'ADP', got '{raw}'"),
            })?,
            None => PartitionMethod::default(),
        };

        let defaults = DeviceDescriptor::new(key, host, username, password);
        Ok(DeviceDescriptor {
            name: self.name.clone().unwrap_or_else(|| key.to_owned()),
            port: self.port.unwrap_or_else(|| protocol.default_port()),
            protocol,
            api_version: self
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            autosnat: self.autosnat.or(defaults.autosnat),
            ipinip: self.ipinip,
            default_virtual_server_vrid: self.default_virtual_server_vrid,
            v_method,
            shared_partition: self
                .shared_partition
                .clone()
                .unwrap_or_else(|| defaults.shared_partition.clone()),
            max_instance: self.max_instance.unwrap_or(defaults.max_instance),
            use_float: self.use_float.unwrap_or(defaults.use_float),
            method: self.method.clone().unwrap_or_else(|| defaults.method.clone()),
            ha_sync_list: self.ha_sync_list.clone().unwrap_or_default(),
            write_memory: self.write_memory.unwrap_or(defaults.write_memory),
            ..defaults
        })
    }

    /// `password_env` first, then the plaintext field.
    fn resolve_password(&self) -> Option<SecretString> {
        if let Some(env_name) = &self.password_env {
            if let Ok(value) = std::env::var(env_name) {
                return Some(SecretString::from(value));
            }
            debug!(env = %env_name, "password variable not set, trying plaintext");
        }
        self.password.clone().map(SecretString::from)
    }
}

impl Config {
    /// Enabled devices, resolved and validated.
    pub fn inventory(&self) -> Result<DeviceInventory, ConfigError> {
        let mut inventory = DeviceInventory::new();
        for (key, entry) in &self.devices {
            if !entry.is_enabled() {
                debug!(device = %key, "status is false, skipping device");
                continue;
            }
            let device = entry.to_descriptor(key)?;
            debug!(device = %key, address = %device.cache_key(), api_version = %device.api_version, "device configured");
            inventory.insert(device);
        }
        Ok(inventory)
    }

    pub fn cache_policy(&self) -> Result<CachePolicy, ConfigError> {
        let s = &self.session;
        for (field, value) in [
            ("session.create_attempts", s.create_attempts),
            ("session.close_attempts", s.close_attempts),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be at least 1".into(),
                });
            }
        }

        Ok(CachePolicy {
            ttl: Duration::from_secs(s.ttl_secs),
            create_attempts: s.create_attempts,
            close_attempts: s.close_attempts,
            retry_delay: Duration::from_millis(s.retry_delay_ms),
            shutdown_grace: Duration::from_secs(s.shutdown_grace_secs),
        })
    }

    pub fn transport(&self) -> TransportConfig {
        let t = &self.transport;
        let tls = if let Some(ca) = &t.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else if t.insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(t.timeout_secs),
        }
    }

    /// Render as TOML with every plaintext password masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        for entry in shown.devices.values_mut() {
            if entry.password.is_some() {
                entry.password = Some("********".into());
            }
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path.
///
/// An explicit path wins, then `$A10_CONFIG_DIR/config.toml`, then
/// `/etc/a10/config.toml` if present, then the platform config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(dir) = std::env::var_os("A10_CONFIG_DIR") {
        return PathBuf::from(dir).join("config.toml");
    }
    let system = PathBuf::from("/etc/a10/config.toml");
    if system.exists() {
        return system;
    }
    ProjectDirs::from("com", "acoslb", "acoslb").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("acoslb");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` plus environment.
///
/// A missing file yields the defaults. Environment overrides use `__` as
/// the nesting separator, e.g. `ACOSLB_SESSION__TTL_SECS=30`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ACOSLB_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), devices = config.devices.len(), "config loaded");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();

        assert!(!config.verify_appliances);
        assert!(config.devices.is_empty());
        assert_eq!(config.cache_policy().unwrap(), CachePolicy::default());
        assert_eq!(config.transport().tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn device_defaults_are_applied() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.10.100.20"
            username = "admin"
            password = "a10"
            "#,
        );
        let inventory = load_config(file.path()).unwrap().inventory().unwrap();
        let d = inventory.get("ax1").unwrap();

        assert_eq!(d.name, "ax1");
        assert_eq!(d.protocol, Protocol::Https);
        assert_eq!(d.port, 443);
        assert_eq!(d.api_version, "2.1");
        assert_eq!(d.autosnat, Some(IntFlag::ON));
        assert_eq!(d.ipinip, None);
        assert_eq!(d.v_method, PartitionMethod::Lsi);
        assert_eq!(d.shared_partition, "shared");
        assert_eq!(d.max_instance, 5000);
        assert_eq!(d.method, "hash");
        assert!(d.write_memory);
        assert_eq!(d.password.expose_secret(), "a10");
    }

    #[test]
    fn http_devices_default_to_port_80() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.10.100.20"
            protocol = "http"
            username = "admin"
            password = "a10"
            "#,
        );
        let inventory = load_config(file.path()).unwrap().inventory().unwrap();
        assert_eq!(inventory.get("ax1").unwrap().cache_key().to_string(), "10.10.100.20:80");
    }

    #[test]
    fn flags_are_coerced_to_integers() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.0.0.1"
            username = "admin"
            password = "a10"
            api_version = "3.0"
            autosnat = false
            ipinip = "1"
            default_virtual_server_vrid = 3
            "#,
        );
        let inventory = load_config(file.path()).unwrap().inventory().unwrap();
        let d = inventory.get("ax1").unwrap();

        assert_eq!(d.autosnat, Some(IntFlag::OFF));
        assert_eq!(d.ipinip, Some(IntFlag::ON));
        assert_eq!(d.default_virtual_server_vrid, Some(3));
        assert_eq!(d.api_version, "3.0");
    }

    #[test]
    fn non_numeric_flag_is_rejected() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.0.0.1"
            username = "admin"
            password = "a10"
            autosnat = "sometimes"
            "#,
        );
        assert!(matches!(load_config(file.path()), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn disabled_devices_are_skipped() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.0.0.1"
            username = "admin"
            password = "a10"

            [devices.ax2]
            status = false
            "#,
        );
        let inventory = load_config(file.path()).unwrap().inventory().unwrap();

        assert_eq!(inventory.len(), 1);
        assert!(inventory.get("ax2").is_none());
    }

    #[test]
    fn missing_required_field_names_device() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.0.0.1"
            username = "admin"
            "#,
        );
        let err = load_config(file.path()).unwrap().inventory().unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidDevice { ref device, field: "password" } if device == "ax1"
        ));
    }

    #[test]
    fn bad_protocol_is_a_validation_error() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.0.0.1"
            protocol = "ftp"
            username = "admin"
            password = "a10"
            "#,
        );
        let err = load_config(file.path()).unwrap().inventory().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "devices.ax1.protocol"));
    }

    #[test]
    fn session_and_transport_settings() {
        let file = write_config(
            r#"
            verify_appliances = true

            [session]
            ttl_secs = 120
            create_attempts = 3
            retry_delay_ms = 250

            [transport]
            timeout_secs = 5
            insecure = false
            "#,
        );
        let config = load_config(file.path()).unwrap();
        let policy = config.cache_policy().unwrap();
        let transport = config.transport();

        assert!(config.verify_appliances);
        assert_eq!(policy.ttl, Duration::from_secs(120));
        assert_eq!(policy.create_attempts, 3);
        assert_eq!(policy.close_attempts, 9);
        assert_eq!(policy.retry_delay, Duration::from_millis(250));
        assert_eq!(transport.tls, TlsMode::System);
        assert_eq!(transport.timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_rejected() {
        let file = write_config("[session]\ncreate_attempts = 0\n");
        let err = load_config(file.path()).unwrap().cache_policy().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "session.create_attempts"));
    }

    #[test]
    fn redacted_toml_hides_passwords() {
        let file = write_config(
            r#"
            [devices.ax1]
            host = "10.0.0.1"
            username = "admin"
            password = "hunter2"
            "#,
        );
        let shown = load_config(file.path()).unwrap().to_redacted_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("10.0.0.1"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/acoslb-test.toml");
        assert_eq!(config_path(Some(path)), path.to_path_buf());
    }
}

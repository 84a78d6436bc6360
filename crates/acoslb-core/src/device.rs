// ── Appliance descriptors ──
//
// What the rest of the crate knows about one configured appliance. Loaded
// once by `acoslb-config` and shared as `Arc<DeviceDescriptor>`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use url::Url;

pub use acoslb_api::Protocol;

/// AXAPI version assumed when a device does not name one.
pub const DEFAULT_API_VERSION: &str = "2.1";

/// How tenants map onto appliance partitions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionMethod {
    /// Logical service instance: one partition per tenant.
    #[default]
    Lsi,
    /// Application delivery partition.
    Adp,
}

// ── IntFlag ──────────────────────────────────────────────────────────

/// An integer-valued device switch.
///
/// Configuration files write these as `true`, `1` or `"1"`; AXAPI wants
/// integers. Coercion happens at load time so the adapter only ever sees
/// an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IntFlag(i64);

impl IntFlag {
    pub const ON: Self = Self(1);
    pub const OFF: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for IntFlag {
    fn from(value: bool) -> Self {
        if value { Self::ON } else { Self::OFF }
    }
}

impl From<i64> for IntFlag {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for IntFlag {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Ok(Self::ON);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Ok(Self::OFF);
        }
        trimmed
            .parse::<i64>()
            .map(Self)
            .map_err(|_| format!("expected a boolean or integer, got {raw:?}"))
    }
}

impl<'de> Deserialize<'de> for IntFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b.into()),
            Raw::Int(i) => Ok(i.into()),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl fmt::Display for IntFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── CacheKey ─────────────────────────────────────────────────────────

/// Identity of one appliance's session slot: `host:port`.
///
/// Deliberately not the logical device name; two logical entries pointing
/// at the same management address share a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    host: String,
    port: u16,
}

impl CacheKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── DeviceDescriptor ─────────────────────────────────────────────────

/// One configured appliance.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Logical name from the configuration (`[devices.<key>]`).
    pub key: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub username: String,
    pub password: SecretString,
    /// AXAPI version as configured; validated lazily so that an unknown
    /// version only fails the operations that depend on it.
    pub api_version: String,
    pub autosnat: Option<IntFlag>,
    pub ipinip: Option<IntFlag>,
    pub default_virtual_server_vrid: Option<i64>,
    pub v_method: PartitionMethod,
    pub shared_partition: String,
    pub max_instance: u32,
    pub use_float: bool,
    pub method: String,
    pub ha_sync_list: Vec<String>,
    pub write_memory: bool,
}

impl DeviceDescriptor {
    /// A descriptor with every optional setting at its default.
    pub fn new(
        key: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        let key = key.into();
        let protocol = Protocol::default();
        Self {
            name: key.clone(),
            key,
            host: host.into(),
            port: protocol.default_port(),
            protocol,
            username: username.into(),
            password,
            api_version: DEFAULT_API_VERSION.into(),
            autosnat: Some(IntFlag::ON),
            ipinip: None,
            default_virtual_server_vrid: None,
            v_method: PartitionMethod::default(),
            shared_partition: "shared".into(),
            max_instance: 5000,
            use_float: false,
            method: "hash".into(),
            ha_sync_list: Vec::new(),
            write_memory: true,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.host.clone(), self.port)
    }

    /// Management endpoint, e.g. `https://10.10.100.20:8443`.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Url::parse(&format!("{}://{host}:{}", self.protocol, self.port))
    }
}

// ── DeviceInventory ──────────────────────────────────────────────────

/// Enabled devices keyed by logical name, in key order.
#[derive(Debug, Clone, Default)]
pub struct DeviceInventory {
    devices: BTreeMap<String, Arc<DeviceDescriptor>>,
}

impl DeviceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device, replacing any previous one with the same key.
    pub fn insert(&mut self, device: DeviceDescriptor) {
        self.devices.insert(device.key.clone(), Arc::new(device));
    }

    pub fn get(&self, key: &str) -> Option<&Arc<DeviceDescriptor>> {
        self.devices.get(key)
    }

    /// Look up a device, failing with `DeviceNotFound`.
    pub fn require(&self, key: &str) -> Result<Arc<DeviceDescriptor>, crate::CoreError> {
        self.get(key)
            .cloned()
            .ok_or_else(|| crate::CoreError::DeviceNotFound {
                identifier: key.to_owned(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceDescriptor>> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<DeviceDescriptor> for DeviceInventory {
    fn from_iter<I: IntoIterator<Item = DeviceDescriptor>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for device in iter {
            inventory.insert(device);
        }
        inventory
    }
}

//! `acoslb devices`: list configured appliances.

use std::sync::Arc;

use acoslb_core::DeviceDescriptor;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;

use super::Context;

/// Serializable view of a device; never includes the password.
#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub key: String,
    pub name: String,
    pub address: String,
    pub protocol: String,
    pub api_version: String,
    pub v_method: String,
    pub shared_partition: String,
    pub autosnat: Option<i64>,
    pub ipinip: Option<i64>,
    pub default_virtual_server_vrid: Option<i64>,
    pub ha_sync_list: Vec<String>,
}

impl From<&Arc<DeviceDescriptor>> for DeviceSummary {
    fn from(d: &Arc<DeviceDescriptor>) -> Self {
        Self {
            key: d.key.clone(),
            name: d.name.clone(),
            address: d.cache_key().to_string(),
            protocol: d.protocol.to_string(),
            api_version: d.api_version.clone(),
            v_method: d.v_method.to_string(),
            shared_partition: d.shared_partition.clone(),
            autosnat: d.autosnat.map(acoslb_core::IntFlag::value),
            ipinip: d.ipinip.map(acoslb_core::IntFlag::value),
            default_virtual_server_vrid: d.default_virtual_server_vrid,
            ha_sync_list: d.ha_sync_list.clone(),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "AXAPI")]
    api_version: String,
    #[tabled(rename = "Method")]
    v_method: String,
    #[tabled(rename = "Partition")]
    shared_partition: String,
}

impl From<&DeviceSummary> for DeviceRow {
    fn from(d: &DeviceSummary) -> Self {
        Self {
            key: d.key.clone(),
            address: d.address.clone(),
            protocol: d.protocol.clone(),
            api_version: d.api_version.clone(),
            v_method: d.v_method.clone(),
            shared_partition: d.shared_partition.clone(),
        }
    }
}

pub(super) fn detail(d: &DeviceSummary) -> String {
    let flag = |v: Option<i64>| v.map_or_else(|| "-".into(), |v| v.to_string());
    [
        format!("Key:        {}", d.key),
        format!("Name:       {}", d.name),
        format!("Address:    {}://{}", d.protocol, d.address),
        format!("AXAPI:      {}", d.api_version),
        format!("Method:     {}", d.v_method),
        format!("Partition:  {}", d.shared_partition),
        format!("Autosnat:   {}", flag(d.autosnat)),
        format!("IP-in-IP:   {}", flag(d.ipinip)),
        format!("VRID:       {}", flag(d.default_virtual_server_vrid)),
    ]
    .join("\n")
}

fn render(format: &OutputFormat, summaries: &[DeviceSummary]) -> Result<String, CliError> {
    output::render_list(format, summaries, |d| DeviceRow::from(d), |d| d.key.clone())
}

pub fn handle(ctx: &Context) -> Result<(), CliError> {
    let inventory = ctx.inventory()?;
    let summaries: Vec<DeviceSummary> = inventory.iter().map(DeviceSummary::from).collect();

    let rendered = render(&ctx.global.output, &summaries)?;
    ctx.print(&rendered);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use acoslb_core::DeviceInventory;
    use secrecy::SecretString;

    use super::*;

    fn summaries() -> Vec<DeviceSummary> {
        let mut inventory = DeviceInventory::new();
        for (key, host) in [("ax1", "10.0.0.1"), ("ax2", "10.0.0.2")] {
            inventory.insert(DeviceDescriptor::new(key, host, "admin", SecretString::from("a10".to_string())));
        }
        inventory.iter().map(DeviceSummary::from).collect()
    }

    #[test]
    fn table_lists_every_device() {
        let out = render(&OutputFormat::Table, &summaries()).unwrap();
        assert!(out.contains("AXAPI"));
        assert!(out.contains("10.0.0.1:443"));
        assert!(out.contains("10.0.0.2:443"));
    }

    #[test]
    fn json_omits_credentials() {
        let out = render(&OutputFormat::Json, &summaries()).unwrap();
        assert!(out.contains("\"api_version\": \"2.1\""));
        assert!(!out.contains("a10\""));
        assert!(!out.contains("password"));
    }
}

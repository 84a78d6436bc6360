// ── Appliance verification ──
//
// Startup check: log into every configured appliance and read its system
// information. Failures are reported, not fatal.

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::cache::ClientCache;
use crate::device::{DeviceDescriptor, DeviceInventory};
use crate::error::CoreError;
use crate::session::{ApplianceSession, SessionFactory};

/// Result of verifying one appliance.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub device: String,
    pub address: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Verify every device in `inventory` concurrently.
pub async fn verify_appliances<F: SessionFactory>(
    cache: &ClientCache<F>,
    inventory: &DeviceInventory,
) -> Vec<VerifyReport> {
    if inventory.is_empty() {
        error!("no appliances configured, nothing to verify");
        return Vec::new();
    }

    join_all(inventory.iter().map(|device| verify_one(cache, device))).await
}

async fn verify_one<F: SessionFactory>(
    cache: &ClientCache<F>,
    device: &DeviceDescriptor,
) -> VerifyReport {
    let address = device.cache_key().to_string();
    let result: Result<Value, CoreError> = async {
        let client = cache.get_client(device).await?;
        Ok(client.system_information().await?)
    }
    .await;

    match result {
        Ok(info) => {
            info!(device = %device.key, %address, "appliance reachable");
            VerifyReport {
                device: device.key.clone(),
                address,
                reachable: true,
                info: Some(info),
                error: None,
            }
        }
        Err(e) => {
            error!(device = %device.key, %address, error = %e, "unable to reach appliance");
            VerifyReport {
                device: device.key.clone(),
                address,
                reachable: false,
                info: None,
                error: Some(e.to_string()),
            }
        }
    }
}

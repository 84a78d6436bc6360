use std::sync::Arc;

use crate::device::{DeviceDescriptor, DeviceInventory};
use crate::error::CoreError;

/// Chooses the appliance that hosts a tenant's resources.
pub trait DeviceSelector: Send + Sync {
    fn select(&self, tenant_id: &str) -> Result<Arc<DeviceDescriptor>, CoreError>;
}

/// Hashes the tenant id over the enabled devices in key order.
///
/// The mapping is stable across processes while the inventory is
/// unchanged. Adding or removing a device moves most tenants.
#[derive(Debug, Clone)]
pub struct HashSelector {
    devices: Vec<Arc<DeviceDescriptor>>,
}

impl HashSelector {
    pub fn new(inventory: &DeviceInventory) -> Self {
        // BTreeMap iteration is already key-ordered.
        Self {
            devices: inventory.iter().cloned().collect(),
        }
    }
}

impl DeviceSelector for HashSelector {
    fn select(&self, tenant_id: &str) -> Result<Arc<DeviceDescriptor>, CoreError> {
        let len = u64::try_from(self.devices.len()).map_err(|e| CoreError::Internal(e.to_string()))?;
        if len == 0 {
            return Err(CoreError::NoDevices);
        }
        let index = usize::try_from(fnv1a(tenant_id.as_bytes()) % len)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        self.devices
            .get(index)
            .cloned()
            .ok_or(CoreError::NoDevices)
    }
}

/// 64-bit FNV-1a. Fixed constants keep selection identical across builds.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

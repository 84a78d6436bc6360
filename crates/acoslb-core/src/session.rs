// ── Appliance session capability ──
//
// The cache never speaks AXAPI itself. It sequences an opaque session
// through these two traits; `AcosClient` is the production implementation
// and the cache tests plug in a scripted one.

use std::future::Future;

use acoslb_api::{AcosClient, AxapiVersion, CloseStatus, TransportConfig};
use serde_json::Value;

use crate::device::DeviceDescriptor;

/// An authenticated handle to one appliance.
pub trait ApplianceSession: Send + Sync + 'static {
    /// Make sure the appliance has issued a session, logging in if needed.
    fn ensure_session(&self) -> impl Future<Output = Result<(), acoslb_api::Error>> + Send;

    /// Ask the appliance to close the session.
    fn close(&self) -> impl Future<Output = Result<CloseStatus, acoslb_api::Error>> + Send;

    /// Read-only call used to verify reachability.
    fn system_information(&self) -> impl Future<Output = Result<Value, acoslb_api::Error>> + Send;
}

/// Builds unauthenticated sessions from device descriptors.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: ApplianceSession;

    /// Construct a session for `device`. Implementations should not
    /// authenticate here; the cache probes with `ensure_session`.
    fn connect(
        &self,
        device: &DeviceDescriptor,
    ) -> impl Future<Output = Result<Self::Session, acoslb_api::Error>> + Send;
}

impl ApplianceSession for AcosClient {
    async fn ensure_session(&self) -> Result<(), acoslb_api::Error> {
        AcosClient::ensure_session(self).await
    }

    async fn close(&self) -> Result<CloseStatus, acoslb_api::Error> {
        self.close_session().await
    }

    async fn system_information(&self) -> Result<Value, acoslb_api::Error> {
        AcosClient::system_information(self).await
    }
}

/// `SessionFactory` producing real AXAPI clients.
#[derive(Debug, Clone, Default)]
pub struct AxapiSessionFactory {
    transport: TransportConfig,
}

impl AxapiSessionFactory {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

impl SessionFactory for AxapiSessionFactory {
    type Session = AcosClient;

    async fn connect(&self, device: &DeviceDescriptor) -> Result<AcosClient, acoslb_api::Error> {
        let version = AxapiVersion::parse(&device.api_version)?;
        let base_url = device.base_url()?;
        AcosClient::new(
            base_url,
            version,
            device.username.clone(),
            device.password.clone(),
            &self.transport,
        )
    }
}

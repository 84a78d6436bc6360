//! Appliance session lifecycle and AXAPI request shaping for `acoslb`.
//!
//! - **[`ClientCache`]**: one authenticated session per appliance
//!   (`host:port`), created on first use, refreshed after its TTL, closed
//!   when superseded or drained. Concurrent requests for the same appliance
//!   share a single in-flight creation.
//!
//! - **[`ShutdownCoordinator`]**: turns SIGINT / SIGHUP / SIGTERM into a
//!   bounded drain of the cache.
//!
//! - **Parameter adapter** ([`build_virtual_port`], [`build_virtual_server`]):
//!   version-correct `vport` / `virtual_server` bodies for AXAPI 2.1 and 3.0.
//!
//! - **[`SessionFactory`] / [`ApplianceSession`]**: the capability the cache
//!   sequences. [`AxapiSessionFactory`] backs it with `acoslb_api::AcosClient`.

pub mod cache;
pub mod device;
pub mod error;
pub mod params;
pub mod select;
pub mod session;
pub mod shutdown;
pub mod verify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheEntryInfo, CachePolicy, ClientCache, Drain, ShutdownReport};
pub use device::{CacheKey, DeviceDescriptor, DeviceInventory, IntFlag, PartitionMethod, Protocol};
pub use error::CoreError;
pub use params::{build_virtual_port, build_virtual_server, parse_options};
pub use select::{DeviceSelector, HashSelector};
pub use session::{ApplianceSession, AxapiSessionFactory, SessionFactory};
pub use shutdown::ShutdownCoordinator;
pub use verify::{VerifyReport, verify_appliances};

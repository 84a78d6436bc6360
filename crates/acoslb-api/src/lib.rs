//! Async client for the A10 ACOS AXAPI management interface.
//!
//! Speaks both API generations: the method-dispatched v2.1 API of ACOS 2.x
//! and the REST-style v3.0 API of ACOS 4.x. The client establishes a session
//! lazily, keeps its token, and exposes the session operations an appliance
//! session cache sequences: [`AcosClient::ensure_session`],
//! [`AcosClient::close_session`], and [`AcosClient::system_information`].

pub mod client;
pub mod error;
pub mod session;
pub mod transport;
pub mod version;

pub use client::AcosClient;
pub use error::Error;
pub use session::CloseStatus;
pub use transport::{TlsMode, TransportConfig};
pub use version::{AxapiVersion, Protocol};

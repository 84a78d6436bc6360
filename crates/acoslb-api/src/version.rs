use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Error;

/// The AXAPI generation spoken by an appliance.
///
/// ACOS 2.x firmware exposes the method-style v2.1 API; ACOS 4.x exposes the
/// REST-style v3.0 API. The two differ in endpoint layout, session token
/// transport, and several request field names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AxapiVersion {
    /// ACOS < 3.0 -- `/services/rest/V2.1/?method=...`, `session_id` query param.
    #[strum(serialize = "2.1")]
    #[serde(rename = "2.1")]
    V21,
    /// ACOS >= 3.0 -- `/axapi/v3/...`, `Authorization: A10 <signature>` header.
    #[strum(serialize = "3.0")]
    #[serde(rename = "3.0")]
    V30,
}

impl AxapiVersion {
    /// Parse the textual version from device configuration.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        raw.parse()
            .map_err(|_| Error::UnsupportedVersion(raw.to_owned()))
    }

    /// The login endpoint path (v3.0 only; v2.1 is method-dispatched).
    pub fn login_path(self) -> &'static str {
        match self {
            Self::V21 => "/services/rest/V2.1/",
            Self::V30 => "/axapi/v3/auth",
        }
    }

    /// The logout endpoint path.
    pub fn logout_path(self) -> &'static str {
        match self {
            Self::V21 => "/services/rest/V2.1/",
            Self::V30 => "/axapi/v3/logoff",
        }
    }

    /// The system information endpoint path.
    pub fn information_path(self) -> &'static str {
        match self {
            Self::V21 => "/services/rest/V2.1/",
            Self::V30 => "/axapi/v3/version/oper",
        }
    }
}

/// URL scheme for the management interface.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    /// The port AXAPI listens on when the configuration does not say.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_versions() {
        assert_eq!(AxapiVersion::parse("2.1").ok(), Some(AxapiVersion::V21));
        assert_eq!(AxapiVersion::parse("3.0").ok(), Some(AxapiVersion::V30));
        assert_eq!(AxapiVersion::V30.to_string(), "3.0");
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(matches!(
            AxapiVersion::parse("4.1"),
            Err(Error::UnsupportedVersion(v)) if v == "4.1"
        ));
    }

    #[test]
    fn protocol_default_ports() {
        assert_eq!(Protocol::Http.default_port(), 80);
        assert_eq!(Protocol::Https.default_port(), 443);
        assert_eq!("HTTPS".parse::<Protocol>().ok(), Some(Protocol::Https));
    }
}

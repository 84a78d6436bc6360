// ── AXAPI request fragments ──
//
// AXAPI 2.1 and 3.0 disagree on a handful of field names. These builders
// take the caller's options for a virtual port or virtual server, add the
// device-level defaults, and wrap the result under the right envelope key.
// They never touch the caller's map.

use serde_json::{Map, Value};

use crate::device::{DEFAULT_API_VERSION, DeviceDescriptor};
use crate::error::CoreError;

/// Source-NAT field name per API version.
const AUTO_FIELD: &[(&str, &str)] = &[("2.1", "source_nat_auto"), ("3.0", "auto")];

/// Virtual-port envelope key per API version.
const VPORT_WRAPPER: &[(&str, &str)] = &[("2.1", "vport"), ("3.0", "port")];

fn lookup(table: &[(&str, &'static str)], version: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, field)| *field)
}

fn api_version(device: &DeviceDescriptor) -> &str {
    let version = device.api_version.trim();
    if version.is_empty() {
        DEFAULT_API_VERSION
    } else {
        version
    }
}

/// Build the `vport` / `port` body for a virtual port on `device`.
///
/// `autosnat` is injected whenever it is configured (including `0`);
/// `ipinip` only when non-zero. An API version outside the known table
/// skips the autosnat field and then fails with `UnsupportedApiVersion`.
pub fn build_virtual_port(
    base_options: &Map<String, Value>,
    device: &DeviceDescriptor,
) -> Result<Value, CoreError> {
    let version = api_version(device);
    let mut vport = base_options.clone();

    if let (Some(field), Some(autosnat)) = (lookup(AUTO_FIELD, version), device.autosnat) {
        vport.insert(field.into(), autosnat.value().into());
    }

    if let Some(ipinip) = device.ipinip.filter(|flag| flag.is_set()) {
        vport.insert("ipinip".into(), ipinip.value().into());
    }

    let wrapper = lookup(VPORT_WRAPPER, version).ok_or_else(|| {
        CoreError::UnsupportedApiVersion {
            version: version.to_owned(),
        }
    })?;

    let mut body = Map::new();
    body.insert(wrapper.into(), Value::Object(vport));
    Ok(Value::Object(body))
}

/// Build the `virtual_server` body for `device`, adding its default VRID.
pub fn build_virtual_server(base_options: &Map<String, Value>, device: &DeviceDescriptor) -> Value {
    let mut server = base_options.clone();

    if let Some(vrid) = device.default_virtual_server_vrid {
        server.insert("vrid".into(), vrid.into());
    }

    let mut body = Map::new();
    body.insert("virtual_server".into(), Value::Object(server));
    Value::Object(body)
}

/// Parse a JSON document into the option map the builders take.
pub fn parse_options(raw: &str, what: &str) -> Result<Map<String, Value>, CoreError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(CoreError::InvalidOptions { what: what.into() }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::device::IntFlag;

    fn device(api_version: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            api_version: api_version.into(),
            autosnat: None,
            ..DeviceDescriptor::new("ax1", "10.0.0.1", "admin", SecretString::from("a10".to_string()))
        }
    }

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn vport_v21_autosnat_uses_source_nat_auto() {
        let d = DeviceDescriptor {
            autosnat: Some(IntFlag::ON),
            ..device("2.1")
        };
        let out = build_virtual_port(&options(json!({ "name": "vp1" })), &d).unwrap();
        assert_eq!(out, json!({ "vport": { "name": "vp1", "source_nat_auto": 1 } }));
    }

    #[test]
    fn vport_v30_autosnat_and_ipinip() {
        let d = DeviceDescriptor {
            autosnat: Some(IntFlag::ON),
            ipinip: Some(IntFlag::ON),
            ..device("3.0")
        };
        let out = build_virtual_port(&Map::new(), &d).unwrap();
        assert_eq!(out, json!({ "port": { "auto": 1, "ipinip": 1 } }));
    }

    #[test]
    fn vport_disabled_autosnat_is_still_sent() {
        let d = DeviceDescriptor {
            autosnat: Some(IntFlag::OFF),
            ipinip: Some(IntFlag::OFF),
            ..device("3.0")
        };
        let out = build_virtual_port(&Map::new(), &d).unwrap();
        assert_eq!(out, json!({ "port": { "auto": 0 } }));
    }

    #[test]
    fn vport_without_flags_only_wraps() {
        let out = build_virtual_port(&options(json!({ "protocol": "tcp" })), &device("2.1")).unwrap();
        assert_eq!(out, json!({ "vport": { "protocol": "tcp" } }));
    }

    #[test]
    fn vport_blank_version_defaults_to_v21() {
        let d = DeviceDescriptor {
            autosnat: Some(IntFlag::ON),
            ..device("")
        };
        let out = build_virtual_port(&Map::new(), &d).unwrap();
        assert_eq!(out, json!({ "vport": { "source_nat_auto": 1 } }));
    }

    #[test]
    fn vport_unknown_version_fails_wrap() {
        let d = DeviceDescriptor {
            autosnat: Some(IntFlag::ON),
            ..device("4.1")
        };
        let result = build_virtual_port(&Map::new(), &d);
        assert!(matches!(
            result,
            Err(CoreError::UnsupportedApiVersion { ref version }) if version == "4.1"
        ));
    }

    #[test]
    fn vport_does_not_mutate_caller_options() {
        let base = options(json!({ "name": "vp1" }));
        let d = DeviceDescriptor {
            autosnat: Some(IntFlag::ON),
            ..device("3.0")
        };
        let _ = build_virtual_port(&base, &d).unwrap();
        assert_eq!(Value::Object(base), json!({ "name": "vp1" }));
    }

    #[test]
    fn virtual_server_injects_vrid() {
        let d = DeviceDescriptor {
            default_virtual_server_vrid: Some(7),
            ..device("2.1")
        };
        let out = build_virtual_server(&options(json!({ "name": "vs1" })), &d);
        assert_eq!(out, json!({ "virtual_server": { "name": "vs1", "vrid": 7 } }));
    }

    #[test]
    fn virtual_server_without_vrid_only_wraps() {
        let out = build_virtual_server(&options(json!({ "name": "vs1" })), &device("3.0"));
        assert_eq!(out, json!({ "virtual_server": { "name": "vs1" } }));
    }

    #[test]
    fn parse_options_rejects_non_objects() {
        assert!(parse_options(r#"{"name":"vs1"}"#, "vserver").is_ok());
        assert!(matches!(
            parse_options("[1,2]", "vserver"),
            Err(CoreError::InvalidOptions { .. })
        ));
    }
}

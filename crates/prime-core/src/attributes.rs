//! Vendor attribute to host variable mapping
//!
//! Two static tables: one renames Prime field names to generic host
//! variable names, the other normalizes the network OS value. Anything not
//! in a table passes through unchanged, and no attribute is ever dropped.

use crate::device::{AttrValue, RemoteDevice};

/// Host variable carrying the management address
pub const HOST_ADDRESS_VAR: &str = "ansible_host";

/// Host variable carrying the network OS identifier
pub const NETWORK_OS_VAR: &str = "ansible_network_os";

/// Prime field name -> host variable name
const VARIABLE_MAP: &[(&str, &str)] = &[
    ("deviceName", HOST_ADDRESS_VAR),
    ("softwareType", NETWORK_OS_VAR),
];

/// Prime software type -> canonical network OS
const OS_MAP: &[(&str, &str)] = &[
    ("asa", "asa"),
    ("IOS", "ios"),
    ("IOS-XE", "ios"),
    ("IOS XR", "iosxr"),
    ("NX OS", "nxos"),
];

fn lookup<'a>(table: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    table.iter().find(|(from, _)| *from == key).map(|(_, to)| *to)
}

/// Rename a single attribute
pub fn map_variable_name(name: &str) -> &str {
    lookup(VARIABLE_MAP, name).unwrap_or(name)
}

/// Normalize a network OS value
pub fn map_network_os(value: &str) -> &str {
    lookup(OS_MAP, value).unwrap_or(value)
}

/// Map one attribute to its host variable name and value
pub fn map_attribute(name: &str, value: &AttrValue) -> (String, AttrValue) {
    let name = map_variable_name(name);
    let value = match value {
        AttrValue::Str(os) if name == NETWORK_OS_VAR => AttrValue::from(map_network_os(os)),
        other => other.clone(),
    };
    (name.to_string(), value)
}

/// Map every attribute of a device, preserving order
pub fn map_attributes(device: &RemoteDevice) -> Vec<(String, AttrValue)> {
    device
        .attributes
        .iter()
        .map(|(name, value)| map_attribute(name, value))
        .collect()
}

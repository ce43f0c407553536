//! Device types as reported by the Prime `Devices` endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Management status value that marks a device as excludable
pub const UNMANAGED: &str = "UNMANAGED";

/// Row wrapper key for device entities
pub const DEVICE_ROW_KEY: &str = "devicesDTO";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Entity row has no `{0}` object")]
    MissingRow(&'static str),
    #[error("Device row has no string `deviceName` field")]
    MissingDeviceName,
    #[error("Group row is malformed: {0}")]
    MalformedGroup(#[from] serde_json::Error),
}

/// A scalar attribute value
///
/// Objects and arrays nested inside a device row are kept as their compact
/// JSON text so no attribute is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&Value> for AttrValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => AttrValue::Str(s.clone()),
            other => AttrValue::Str(other.to_string()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::Str(s) => write!(f, "{}", s),
            AttrValue::Null => write!(f, "null"),
        }
    }
}

/// A device fetched from the remote API
///
/// Attributes keep the remote field order.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDevice {
    /// Device identifier (`deviceName`)
    pub name: String,
    /// Management status (`adminStatus`), if reported
    pub admin_status: Option<String>,
    /// Every field of the row, including the two above
    pub attributes: Vec<(String, AttrValue)>,
}

impl RemoteDevice {
    /// Build a device from a `devicesDTO` object
    pub fn from_dto(dto: &Value) -> Result<Self, ModelError> {
        let object = dto.as_object().ok_or(ModelError::MissingRow(DEVICE_ROW_KEY))?;

        let name = object
            .get("deviceName")
            .and_then(Value::as_str)
            .ok_or(ModelError::MissingDeviceName)?
            .to_string();

        let admin_status = object
            .get("adminStatus")
            .and_then(Value::as_str)
            .map(str::to_string);

        let attributes = object
            .iter()
            .map(|(k, v)| (k.clone(), AttrValue::from(v)))
            .collect();

        Ok(Self {
            name,
            admin_status,
            attributes,
        })
    }

    /// Build a device from an `entity` row (`{"devicesDTO": {...}}`)
    pub fn from_entity(row: &Value) -> Result<Self, ModelError> {
        let dto = row
            .get(DEVICE_ROW_KEY)
            .ok_or(ModelError::MissingRow(DEVICE_ROW_KEY))?;
        Self::from_dto(dto)
    }

    /// Whether the remote marks this device as unmanaged
    pub fn is_unmanaged(&self) -> bool {
        self.admin_status.as_deref() == Some(UNMANAGED)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

//! Record types kept by the registry.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Kind of remote peer.
///
/// Decoding is total: a missing or unrecognised stored value becomes
/// [`DeviceType::Normal`] so a record written by a newer or older client
/// still loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    #[default]
    Normal,
    Web,
}

impl DeviceType {
    /// Decodes a stored value, falling back to `Normal`.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            None | Some("NORMAL") => DeviceType::Normal,
            Some("WEB") => DeviceType::Web,
            Some(other) => {
                tracing::debug!("unrecognised device type {other:?}, using NORMAL");
                DeviceType::Normal
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Normal => "NORMAL",
            DeviceType::Web => "WEB",
        }
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Stored {
            Text(String),
            Other(IgnoredAny),
        }

        Ok(match Stored::deserialize(deserializer)? {
            Stored::Text(raw) => Self::from_stored(Some(&raw)),
            Stored::Other(_) => Self::from_stored(None),
        })
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote peer known to this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub nickname: String,
    pub brand: String,
    pub model: String,
    pub version_name: String,
    pub version_number: i32,
    /// Milliseconds since the Unix epoch.
    pub last_usage_time: i64,
    pub is_trusted: bool,
    pub is_restricted: bool,
    pub is_local_address: bool,
    /// Pairing token for the current session only.
    pub tmp_secure_key: i32,
    #[serde(rename = "type", default)]
    pub device_type: DeviceType,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: String::new(),
            brand: String::new(),
            model: String::new(),
            version_name: String::new(),
            version_number: 0,
            last_usage_time: 0,
            is_trusted: false,
            is_restricted: false,
            is_local_address: false,
            tmp_secure_key: 0,
            device_type: DeviceType::Normal,
        }
    }

    /// Resource id of this device's profile picture.
    pub fn picture_id(&self) -> String {
        picture_id_for(&self.id)
    }
}

/// Resource id of the profile picture stored for `device_id`.
pub fn picture_id_for(device_id: &str) -> String {
    format!("picture_{device_id}")
}

/// Last-observed address of a device on one network adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub device_id: String,
    pub adapter_name: String,
    pub ip_address: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub last_checked_date: i64,
}

impl Connection {
    pub fn new(
        adapter_name: impl Into<String>,
        ip_address: impl Into<String>,
        device_id: impl Into<String>,
        last_checked_date: i64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            adapter_name: adapter_name.into(),
            ip_address: Some(ip_address.into()),
            last_checked_date,
        }
    }

    /// Key this connection is matched by when written.
    ///
    /// An address, when present, takes priority over the adapter pair.
    pub fn lookup_key(&self) -> ConnectionKey {
        match &self.ip_address {
            Some(ip) => ConnectionKey::Address(ip.clone()),
            None => ConnectionKey::Adapter {
                device_id: self.device_id.clone(),
                adapter_name: self.adapter_name.clone(),
            },
        }
    }
}

/// The two mutually exclusive ways of locating a connection row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionKey {
    Address(String),
    Adapter {
        device_id: String,
        adapter_name: String,
    },
}

impl ConnectionKey {
    pub fn adapter(device_id: impl Into<String>, adapter_name: impl Into<String>) -> Self {
        ConnectionKey::Adapter {
            device_id: device_id.into(),
            adapter_name: adapter_name.into(),
        }
    }

    /// Key of the connection an assignee was reached through.
    pub fn for_assignee(assignee: &Assignee) -> Self {
        Self::adapter(
            assignee.device_id.clone(),
            assignee.connection_adapter.clone().unwrap_or_default(),
        )
    }
}

/// A transfer session shared among one or more devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferGroup {
    pub id: i64,
    pub date_created: i64,
}

impl TransferGroup {
    pub fn new(id: i64, date_created: i64) -> Self {
        Self { id, date_created }
    }
}

/// Binds one device to one transfer group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignee {
    pub group_id: i64,
    pub device_id: String,
    pub connection_adapter: Option<String>,
}

impl Assignee {
    pub fn new(group_id: i64, device_id: impl Into<String>, connection_adapter: Option<&str>) -> Self {
        Self {
            group_id,
            device_id: device_id.into(),
            connection_adapter: connection_adapter.map(str::to_string),
        }
    }
}

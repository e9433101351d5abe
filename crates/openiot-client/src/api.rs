// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display};

/// Prefix the server uses for snapshot identifiers in a sample's value list.
pub const SNAPSHOT_SCHEME: &str = "snapshot://";

/// Free-form key/value attribute attached to devices and sensors.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A device registered in the project bound to the API key.
///
/// The identifier is assigned by the server when the device is created with
/// [`Client::save_device`][crate::Client::save_device].
///
/// # Examples
///
/// ```rust
/// use openiot_client::{Attribute, Device};
///
/// let device = Device::new("Greenhouse")
///     .with_desc("North wing controller")
///     .with_location(25.04, 121.56)
///     .with_attribute(Attribute::new("vendor", "acme"));
/// assert!(device.id().is_none());
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Device {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// A device handle for an existing server-side device, used with
    /// [`Client::modify_device`][crate::Client::modify_device].
    pub fn with_id(id: impl Into<String>) -> Self {
        Device {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.get_or_insert_with(Vec::new).push(attribute);
        self
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.id().unwrap_or("-"),
            self.name.as_deref().unwrap_or("")
        )
    }
}

/// Response body of a device creation.
#[derive(Deserialize)]
pub(crate) struct IdResult {
    pub(crate) id: String,
}

/// A sensor attached to a device.
///
/// The sensor identifier is chosen by the caller and becomes the key used in
/// every sensor URL; it cannot be changed once the sensor exists.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Sensor type such as `gauge`, `counter`, `switch`, `snapshot` or `text`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

impl Sensor {
    pub fn new(id: impl Into<String>) -> Self {
        Sensor {
            id: id.into(),
            name: None,
            desc: None,
            kind: None,
            uri: None,
            unit: None,
            formula: None,
            attributes: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.get_or_insert_with(Vec::new).push(attribute);
        self
    }
}

impl Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}", self.id, self.name.as_deref().unwrap_or(""))
    }
}

/// Column definition of a [`Sheet`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// A tabular resource of a device whose rows are [`Record`]s.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Sheet {
    pub fn new(id: impl Into<String>) -> Self {
        Sheet {
            id: id.into(),
            name: None,
            desc: None,
            columns: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

impl Display for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}", self.id, self.name.as_deref().unwrap_or(""))
    }
}

/// A timestamped sensor sample.
///
/// `id` is the sensor identifier. When `time` is omitted the server stamps
/// the sample on arrival. Optional fields are left out of the JSON document
/// entirely rather than sent as `null`.
///
/// # Examples
///
/// ```rust
/// use openiot_client::Rawdata;
///
/// let sample = Rawdata::new("temperature", ["23.5"]);
/// assert_eq!(
///     serde_json::to_string(&sample).unwrap(),
///     r#"{"id":"temperature","value":["23.5"]}"#
/// );
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rawdata {
    pub id: String,
    /// Filled in by the server on reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f32>,
    #[serde(default)]
    pub value: Vec<String>,
}

impl Rawdata {
    pub fn new<I, S>(sensor_id: impl Into<String>, value: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rawdata {
            id: sensor_id.into(),
            value: value.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_location(mut self, lat: f32, lon: f32) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// Snapshot identifier carried in the value list, without its
    /// `snapshot://` prefix.
    pub fn snapshot_id(&self) -> Option<&str> {
        self.value
            .iter()
            .find_map(|value| value.strip_prefix(SNAPSHOT_SCHEME))
    }
}

/// A row of a [`Sheet`]: named field values with an optional timestamp.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Sheet identifier.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub value: HashMap<String, String>,
}

impl Record {
    pub fn new(sheet_id: impl Into<String>, value: HashMap<String, String>) -> Self {
        Record {
            id: sheet_id.into(),
            value,
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// Binary image attached to a snapshot upload.
///
/// The whole image is held in memory so the uploaded part has an exact
/// length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Multipart field name for the image part.
    pub name: String,
    /// MIME type such as `image/png` or `image/jpeg`.
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Image {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Image {
            name: name.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Provisioning command addressed to a physical device by serial number.
///
/// Serialized with an `op` tag: `{"op":"Reconfigure","digest":"..."}` or
/// `{"op":"SetDeviceId","digest":"...","deviceId":"..."}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op")]
pub enum Provision {
    /// Ask the server to reconfigure the equipment.
    Reconfigure { digest: String },
    /// Bind the equipment to another device identifier.
    SetDeviceId {
        digest: String,
        #[serde(rename = "deviceId")]
        device_id: String,
    },
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    ClientConfig, Device, Error, Image, Provision, Rawdata, RangeQuery, Record, Sensor, Sheet,
    api::IdResult,
    codec::{APPLICATION_JSON, Payload, SnapshotForm, decode},
    request::{Endpoint, Query, ResourcePath},
};
use hyper::ext::ReasonPhrase;
use log::{Level, debug, log_enabled, trace};
use reqwest::{
    Method, StatusCode,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde::de::DeserializeOwned;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

/// Header carrying the project API key.
pub const API_KEY_HEADER: &str = "CK";

/// Client for the OpenIoT RESTful service.
///
/// Every operation builds a URL below `/iot/v1`, attaches the API key in the
/// `CK` header and treats any status other than `200 OK` as
/// [`Error::Status`]. Calls are independent of each other; the client holds
/// no per-call state beyond the pooled HTTP connections.
///
/// The client is cheap to clone and clones share the connection pool as well
/// as the TLS and timeout settings, which can be changed through `&self` at
/// any time. A change only applies to requests started afterwards.
///
/// # Examples
///
/// ```no_run
/// use openiot_client::{Client, ClientConfig, Device, RangeQuery};
///
/// # async fn example() -> Result<(), openiot_client::Error> {
/// let client = Client::new(ClientConfig::new("iot.example.com", "my-api-key"))?;
///
/// let device = client.save_device(&Device::new("Greenhouse")).await?;
/// let device_id = device.id().unwrap_or_default();
///
/// client.save_value(device_id, "temperature", "23.5").await?;
///
/// let samples = client
///     .rawdatas(
///         device_id,
///         "temperature",
///         &RangeQuery::starting("2024-01-01T00:00:00.000Z"),
///     )
///     .await?;
/// println!("{} samples", samples.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    host: String,
    port: u16,
    api_key: HeaderValue,
    tls: Arc<AtomicBool>,
    /// Milliseconds, zero disables the timeout.
    timeout: Arc<AtomicU64>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url())
            .field("timeout", &self.timeout())
            .finish()
    }
}

impl Client {
    /// Creates a client for the configured server.
    ///
    /// Fails with [`Error::InvalidParameters`] when the API key cannot be
    /// sent as an HTTP header value.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            Error::InvalidParameters("API key is not a valid header value".to_string())
        })?;
        api_key.set_sensitive(true);

        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Client {
            http,
            host: config.host,
            port: config.port,
            api_key,
            tls: Arc::new(AtomicBool::new(config.tls)),
            timeout: Arc::new(AtomicU64::new(config.timeout)),
        })
    }

    /// Switches between `https` and `http` for subsequent requests.
    pub fn enable_tls(&self, enable: bool) {
        self.tls.store(enable, Ordering::Relaxed);
    }

    pub fn is_tls(&self) -> bool {
        self.tls.load(Ordering::Relaxed)
    }

    /// Sets the connection and read timeout in milliseconds for subsequent
    /// requests. Zero disables the timeout.
    pub fn set_timeout(&self, timeout: u64) {
        self.timeout.store(timeout, Ordering::Relaxed);
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Base URL of the API, e.g. `http://iot.example.com:8080/iot/v1`.
    pub fn url(&self) -> String {
        let endpoint = self.endpoint();
        format!(
            "{}://{}:{}/iot/v1",
            endpoint.scheme(),
            endpoint.host,
            endpoint.port
        )
    }

    fn endpoint(&self) -> Endpoint<'_> {
        Endpoint {
            tls: self.is_tls(),
            host: &self.host,
            port: self.port,
        }
    }

    // ====== devices

    /// Creates a device and returns it with the identifier assigned by the
    /// server.
    pub async fn save_device(&self, device: &Device) -> Result<Device, Error> {
        let result: IdResult = self
            .call(
                Method::POST,
                ResourcePath::root("device"),
                Query::new(),
                Payload::json(device)?,
            )
            .await?;

        Ok(Device {
            id: Some(result.id),
            ..device.clone()
        })
    }

    /// Replaces the device definition. The device must carry its identifier.
    pub async fn modify_device(&self, device: &Device) -> Result<(), Error> {
        let device_id = device.id().ok_or(Error::MissingParameter("device id"))?;
        self.send(
            Method::PUT,
            ResourcePath::device(device_id),
            Query::new(),
            Payload::json(device)?,
        )
        .await
    }

    pub async fn device(&self, device_id: &str) -> Result<Device, Error> {
        self.call(
            Method::GET,
            ResourcePath::device(device_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    /// All devices of the project bound to the API key.
    pub async fn devices(&self) -> Result<Vec<Device>, Error> {
        self.call(
            Method::GET,
            ResourcePath::root("device"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn delete_device(&self, device_id: &str) -> Result<(), Error> {
        self.send(
            Method::DELETE,
            ResourcePath::device(device_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    // ====== sensors

    /// Creates a sensor under the device using the sensor's own identifier.
    pub async fn save_sensor(&self, device_id: &str, sensor: &Sensor) -> Result<Sensor, Error> {
        self.send(
            Method::POST,
            ResourcePath::device(device_id).join("sensor"),
            Query::new(),
            Payload::json(sensor)?,
        )
        .await?;
        Ok(sensor.clone())
    }

    pub async fn modify_sensor(&self, device_id: &str, sensor: &Sensor) -> Result<(), Error> {
        self.send(
            Method::PUT,
            ResourcePath::sensor(device_id, sensor.id()),
            Query::new(),
            Payload::json(sensor)?,
        )
        .await
    }

    pub async fn sensor(&self, device_id: &str, sensor_id: &str) -> Result<Sensor, Error> {
        self.call(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn sensors(&self, device_id: &str) -> Result<Vec<Sensor>, Error> {
        self.call(
            Method::GET,
            ResourcePath::device(device_id).join("sensor"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn delete_sensor(&self, device_id: &str, sensor_id: &str) -> Result<(), Error> {
        self.send(
            Method::DELETE,
            ResourcePath::sensor(device_id, sensor_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    // ====== rawdata

    /// Stores one sample. The body is a one-element JSON array.
    pub async fn save_rawdata(&self, device_id: &str, rawdata: &Rawdata) -> Result<(), Error> {
        self.send(
            Method::POST,
            ResourcePath::device(device_id).join("rawdata"),
            Query::new(),
            Payload::json(std::slice::from_ref(rawdata))?,
        )
        .await
    }

    /// Stores a single value for the sensor, stamped by the server.
    pub async fn save_value(
        &self,
        device_id: &str,
        sensor_id: &str,
        value: impl Into<String>,
    ) -> Result<(), Error> {
        let value: String = value.into();
        self.save_rawdata(device_id, &Rawdata::new(sensor_id, [value]))
            .await
    }

    /// Latest sample of the sensor.
    pub async fn rawdata(&self, device_id: &str, sensor_id: &str) -> Result<Rawdata, Error> {
        self.call(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id).join("rawdata"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    /// Samples of the sensor within the range.
    pub async fn rawdatas(
        &self,
        device_id: &str,
        sensor_id: &str,
        range: &RangeQuery,
    ) -> Result<Vec<Rawdata>, Error> {
        let query = range.to_query(true)?;
        self.call(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id).join("rawdata"),
            query,
            Payload::Empty,
        )
        .await
    }

    pub async fn delete_rawdata(
        &self,
        device_id: &str,
        sensor_id: &str,
        range: &RangeQuery,
    ) -> Result<(), Error> {
        let query = range.to_query(false)?;
        self.send(
            Method::DELETE,
            ResourcePath::sensor(device_id, sensor_id).join("rawdata"),
            query,
            Payload::Empty,
        )
        .await
    }

    // ====== snapshots

    /// Uploads an image together with its sample as a multipart form.
    ///
    /// The sample's value list may be empty; the server adds the
    /// `snapshot://` identifier of the stored image.
    pub async fn save_snapshot(
        &self,
        device_id: &str,
        sample: &Rawdata,
        image: Image,
    ) -> Result<(), Error> {
        let form = SnapshotForm::new(sample, image)?;
        self.send(
            Method::POST,
            ResourcePath::device(device_id).join("snapshot"),
            Query::new(),
            Payload::Snapshot(form),
        )
        .await
    }

    /// Sample describing the latest snapshot, see [`Rawdata::snapshot_id`].
    pub async fn snapshot_meta(&self, device_id: &str, sensor_id: &str) -> Result<Rawdata, Error> {
        self.call(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id)
                .join("snapshot")
                .join("meta"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn snapshot_metas(
        &self,
        device_id: &str,
        sensor_id: &str,
        range: &RangeQuery,
    ) -> Result<Vec<Rawdata>, Error> {
        let query = range.to_query(false)?;
        self.call(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id)
                .join("snapshot")
                .join("meta"),
            query,
            Payload::Empty,
        )
        .await
    }

    /// Image bytes of the latest snapshot.
    pub async fn snapshot_body(&self, device_id: &str, sensor_id: &str) -> Result<Vec<u8>, Error> {
        self.execute(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id).join("snapshot"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    /// Image bytes of the snapshot with the given identifier.
    pub async fn snapshot_body_by_id(
        &self,
        device_id: &str,
        sensor_id: &str,
        image_id: &str,
    ) -> Result<Vec<u8>, Error> {
        self.execute(
            Method::GET,
            ResourcePath::sensor(device_id, sensor_id)
                .join("snapshot")
                .join(image_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn delete_snapshot(
        &self,
        device_id: &str,
        sensor_id: &str,
        range: &RangeQuery,
    ) -> Result<(), Error> {
        let query = range.to_query(false)?;
        self.send(
            Method::DELETE,
            ResourcePath::sensor(device_id, sensor_id).join("snapshot"),
            query,
            Payload::Empty,
        )
        .await
    }

    // ====== sheets and records

    /// Declares a sheet with its column definitions.
    pub async fn declare_sheet(&self, device_id: &str, sheet: &Sheet) -> Result<Sheet, Error> {
        self.send(
            Method::PUT,
            ResourcePath::device(device_id).join("sheet"),
            Query::new(),
            Payload::json(sheet)?,
        )
        .await?;
        Ok(sheet.clone())
    }

    pub async fn sheet(&self, device_id: &str, sheet_id: &str) -> Result<Sheet, Error> {
        self.call(
            Method::GET,
            ResourcePath::sheet(device_id, sheet_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn sheets(&self, device_id: &str) -> Result<Vec<Sheet>, Error> {
        self.call(
            Method::GET,
            ResourcePath::device(device_id).join("sheet"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn delete_sheet(&self, device_id: &str, sheet_id: &str) -> Result<(), Error> {
        self.send(
            Method::DELETE,
            ResourcePath::sheet(device_id, sheet_id),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    /// Stores one record. The body is a one-element JSON array.
    pub async fn save_record(&self, device_id: &str, record: &Record) -> Result<(), Error> {
        self.send(
            Method::POST,
            ResourcePath::device(device_id).join("record"),
            Query::new(),
            Payload::json(std::slice::from_ref(record))?,
        )
        .await
    }

    /// Latest record of the sheet.
    pub async fn record(&self, device_id: &str, sheet_id: &str) -> Result<Record, Error> {
        self.call(
            Method::GET,
            ResourcePath::sheet(device_id, sheet_id).join("record"),
            Query::new(),
            Payload::Empty,
        )
        .await
    }

    pub async fn records(
        &self,
        device_id: &str,
        sheet_id: &str,
        range: &RangeQuery,
    ) -> Result<Vec<Record>, Error> {
        let query = range.to_query(true)?;
        self.call(
            Method::GET,
            ResourcePath::sheet(device_id, sheet_id).join("record"),
            query,
            Payload::Empty,
        )
        .await
    }

    pub async fn delete_records(
        &self,
        device_id: &str,
        sheet_id: &str,
        range: &RangeQuery,
    ) -> Result<(), Error> {
        let query = range.to_query(false)?;
        self.send(
            Method::DELETE,
            ResourcePath::sheet(device_id, sheet_id).join("record"),
            query,
            Payload::Empty,
        )
        .await
    }

    // ====== provisioning

    /// Asks the server to reconfigure the equipment with the serial number.
    /// The digest is issued by the service operator.
    pub async fn reconfigure(&self, serial_id: &str, digest: &str) -> Result<(), Error> {
        self.provision(
            serial_id,
            &Provision::Reconfigure {
                digest: digest.to_owned(),
            },
        )
        .await
    }

    /// Asks the server to bind the equipment to another device identifier.
    pub async fn set_device_id(
        &self,
        serial_id: &str,
        digest: &str,
        device_id: &str,
    ) -> Result<(), Error> {
        self.provision(
            serial_id,
            &Provision::SetDeviceId {
                digest: digest.to_owned(),
                device_id: device_id.to_owned(),
            },
        )
        .await
    }

    pub async fn provision(&self, serial_id: &str, provision: &Provision) -> Result<(), Error> {
        self.send(
            Method::POST,
            ResourcePath::registry(serial_id),
            Query::new(),
            Payload::json(provision)?,
        )
        .await
    }

    // ====== transport

    /// Executes the request and decodes the JSON response into `R`.
    async fn call<R>(
        &self,
        method: Method,
        path: ResourcePath,
        query: Query,
        payload: Payload,
    ) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let body = self.execute(method, path, query, payload).await?;

        if log_enabled!(Level::Trace) {
            trace!("Response: {}", String::from_utf8_lossy(&body));
        }

        decode(&body)
    }

    /// Executes the request and discards the response body.
    async fn send(
        &self,
        method: Method,
        path: ResourcePath,
        query: Query,
        payload: Payload,
    ) -> Result<(), Error> {
        self.execute(method, path, query, payload).await?;
        Ok(())
    }

    /// Sends one request and returns the body of a `200 OK` response.
    ///
    /// The response is always consumed or dropped before returning so the
    /// connection goes back to the pool on every path.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(skip(self, path, query, payload), fields(path = %path))
    )]
    async fn execute(
        &self,
        method: Method,
        path: ResourcePath,
        query: Query,
        payload: Payload,
    ) -> Result<Vec<u8>, Error> {
        let url = self.endpoint().url(&path, &query);
        debug!("{} {}", method, url);

        let mut req = self
            .http
            .request(method, &url)
            .header(API_KEY_HEADER, self.api_key.clone());

        if let Some(timeout) = self.timeout() {
            req = req.timeout(timeout);
        }

        let req = match payload {
            Payload::Empty => req,
            Payload::Json(body) => {
                if log_enabled!(Level::Trace) {
                    trace!("Request: {}", String::from_utf8_lossy(&body));
                }
                req.header(CONTENT_TYPE, APPLICATION_JSON).body(body)
            }
            Payload::Snapshot(form) => {
                if log_enabled!(Level::Trace) {
                    trace!(
                        "Snapshot Request: {} + {} ({} bytes)",
                        String::from_utf8_lossy(form.meta()),
                        form.image().content_type,
                        form.image().len()
                    );
                }
                req.multipart(form.into_form()?)
            }
        };

        let resp = req.send().await?;
        let status = resp.status();

        if status != StatusCode::OK {
            debug!("{} returned {}", url, status);
            return Err(Error::Status(status.as_u16(), status_text(&resp)));
        }

        let body = resp.bytes().await?;
        trace!("Received {} bytes", body.len());
        Ok(body.to_vec())
    }
}

/// Reason phrase of the status line as sent by the server.  hyper keeps the
/// phrase only when it differs from the standard one, so fall back to the
/// canonical phrase and to an empty string for unregistered codes.
fn status_text(resp: &reqwest::Response) -> String {
    match resp.extensions().get::<ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => resp
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_owned(),
    }
}

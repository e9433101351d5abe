// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # OpenIoT Client Library
//!
//! A Rust client for the OpenIoT RESTful service, which stores telemetry
//! from devices and their sensors. The library covers the complete resource
//! tree of the service:
//!
//! - **Devices and sensors**: create, modify, list and delete
//! - **Rawdata**: timestamped sensor samples, latest value or time ranges
//! - **Snapshots**: images uploaded together with a sample as a multipart
//!   form, retrieved by identifier
//! - **Sheets and records**: tabular data declared per device
//! - **Provisioning**: reconfigure or re-bind physical equipment by serial
//!   number
//!
//! Every request carries the project API key in the `CK` header and only a
//! `200 OK` answer counts as success. Anything else is returned as
//! [`Error::Status`], displayed as `[<code>] <reason>`. The client never
//! retries or caches.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use openiot_client::{Client, ClientConfig, Error, RangeQuery, now};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::new(ClientConfig::new("iot.example.com", "my-api-key"))?;
//!
//!     for device in client.devices().await? {
//!         println!("{}", device);
//!     }
//!
//!     client.save_value("42", "temperature", "23.5").await?;
//!     let latest = client.rawdata("42", "temperature").await?;
//!     println!("{:?} at {:?}", latest.value, latest.time);
//!
//!     let today = RangeQuery::starting("2024-01-01T00:00:00.000Z").end(now());
//!     let samples = client.rawdatas("42", "temperature", &today).await?;
//!     println!("{} samples", samples.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans around every request

mod api;
mod client;
mod codec;
mod config;
mod error;
mod request;
mod time;

pub use crate::{
    api::{
        Attribute, Column, Device, Image, Provision, Rawdata, Record, SNAPSHOT_SCHEME, Sensor,
        Sheet,
    },
    client::{API_KEY_HEADER, Client},
    config::{ClientConfig, ConfigOverrides, DEFAULT_PORT, DEFAULT_TIMEOUT_MS},
    error::Error,
    request::RangeQuery,
    time::{format_timestamp, now},
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };
    use wiremock::{
        Mock, MockServer, Request, Respond, ResponseTemplate,
        matchers::{
            any, body_json, body_string, header, method, path, query_param,
            query_param_is_missing,
        },
    };

    const API_KEY: &str = "PKTEST1234";

    #[ctor::ctor]
    fn init() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    fn client_for(server: &MockServer) -> Client {
        let address = server.address();
        let config = ClientConfig::new(address.ip().to_string(), API_KEY).with_port(address.port());
        Client::new(config).expect("client")
    }

    /// Minimal in-memory device store: POST assigns an id, GET returns the
    /// stored document.
    #[derive(Clone, Default)]
    struct DeviceStore {
        devices: Arc<Mutex<HashMap<String, Value>>>,
    }

    impl Respond for DeviceStore {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let mut devices = self.devices.lock().unwrap();
            match request.method.as_str() {
                "POST" => {
                    let id = format!("{}", 1000 + devices.len());
                    let mut device: Value = serde_json::from_slice(&request.body).unwrap();
                    device["id"] = Value::String(id.clone());
                    devices.insert(id.clone(), device);
                    ResponseTemplate::new(200).set_body_json(json!({ "id": id }))
                }
                "GET" => {
                    let id = request.url.path().rsplit('/').next().unwrap_or_default();
                    match devices.get(id) {
                        Some(device) => ResponseTemplate::new(200).set_body_json(device),
                        None => ResponseTemplate::new(404).set_body_string("{}"),
                    }
                }
                _ => ResponseTemplate::new(405),
            }
        }
    }

    #[tokio::test]
    async fn test_save_device_then_get() {
        let server = MockServer::start().await;
        Mock::given(header("CK", API_KEY))
            .respond_with(DeviceStore::default())
            .mount(&server)
            .await;

        let client = client_for(&server);
        let submitted = Device::new("Greenhouse")
            .with_desc("North wing")
            .with_kind("general")
            .with_location(25.04, 121.56)
            .with_attribute(Attribute::new("vendor", "acme"));

        let created = client.save_device(&submitted).await.unwrap();
        let id = created.id().expect("server assigned id");
        assert_eq!(id, "1000");

        let fetched = client.device(id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, submitted.name);
        assert_eq!(fetched.attributes, submitted.attributes);
    }

    #[tokio::test]
    async fn test_save_value_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/iot/v1/device/d1/rawdata"))
            .and(header("CK", API_KEY))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"[{"id":"s1","value":["23.5"]}]"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.save_value("d1", "s1", "23.5").await.unwrap();
    }

    #[tokio::test]
    async fn test_status_error_not_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.device("missing").await.unwrap_err();
        assert!(matches!(err, Error::Status(404, _)));
        assert_eq!(err.to_string(), "[404] Not Found");

        let err = client.delete_device("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_non_ok_success_codes_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "1"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.save_device(&Device::new("x")).await.unwrap_err();
        assert_eq!(err.to_string(), "[201] Created");
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.sensors("d1").await.unwrap_err();
        assert_eq!(err.to_string(), "[500] Internal Server Error");
    }

    #[tokio::test]
    async fn test_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"1"}"#))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.devices().await.unwrap_err();
        assert!(matches!(err, Error::Decoding(_)));
    }

    #[tokio::test]
    async fn test_ranged_operations_require_start() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let range = RangeQuery::new().end("2024-01-02T00:00:00.000Z").interval(5);

        let results = vec![
            client.rawdatas("d1", "s1", &range).await.map(|_| ()),
            client.delete_rawdata("d1", "s1", &range).await,
            client.snapshot_metas("d1", "s1", &range).await.map(|_| ()),
            client.delete_snapshot("d1", "s1", &range).await,
            client.records("d1", "weather", &range).await.map(|_| ()),
            client.delete_records("d1", "weather", &range).await,
        ];

        for result in results {
            assert!(matches!(result, Err(Error::MissingParameter("start"))));
        }
    }

    #[tokio::test]
    async fn test_rawdatas_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/s1/rawdata"))
            .and(query_param("start", "2024-01-01T00:00:00.000Z"))
            .and(query_param("end", "2024-01-01 12:00&x"))
            .and(query_param("interval", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "s1", "deviceId": "d1", "time": "2024-01-01T00:00:00.000Z", "value": ["1"]},
                {"id": "s1", "deviceId": "d1", "time": "2024-01-01T00:05:00.000Z", "value": ["2"]}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let range = RangeQuery::starting("2024-01-01T00:00:00.000Z")
            .end("2024-01-01 12:00&x")
            .interval(5);
        let samples = client.rawdatas("d1", "s1", &range).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].value, vec!["2".to_string()]);
        assert_eq!(samples[0].device_id.as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn test_delete_rawdata_omits_interval() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/iot/v1/device/d1/sensor/s1/rawdata"))
            .and(query_param("start", "a"))
            .and(query_param_is_missing("end"))
            .and(query_param_is_missing("interval"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let range = RangeQuery::starting("a").interval(5);
        client.delete_rawdata("d1", "s1", &range).await.unwrap();
    }

    #[tokio::test]
    async fn test_latest_rawdata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/s1/rawdata"))
            .and(query_param_is_missing("start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"id": "s1", "time": "2024-01-01T00:00:00.000Z", "lat": 25.5, "value": ["23.5"]}
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let sample = client.rawdata("d1", "s1").await.unwrap();
        assert_eq!(sample.value, vec!["23.5".to_string()]);
        assert_eq!(sample.lat, Some(25.5));
        assert_eq!(sample.lon, None);
    }

    /// Splits a multipart body into (lowercased headers, content) pairs.
    fn multipart_parts(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
        let delimiter = format!("--{}", boundary).into_bytes();
        let mut starts = Vec::new();
        let mut i = 0;
        while i + delimiter.len() <= body.len() {
            if body[i..i + delimiter.len()] == delimiter[..] {
                starts.push(i);
                i += delimiter.len();
            } else {
                i += 1;
            }
        }

        starts
            .windows(2)
            .map(|w| {
                // skip delimiter and CRLF, drop the CRLF preceding the next delimiter
                let part = &body[w[0] + delimiter.len() + 2..w[1] - 2];
                let split = part
                    .windows(4)
                    .position(|x| x == b"\r\n\r\n")
                    .expect("part headers");
                let headers = String::from_utf8_lossy(&part[..split]).to_lowercase();
                (headers, part[split + 4..].to_vec())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_save_snapshot_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/iot/v1/device/d1/snapshot"))
            .and(header("CK", API_KEY))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let sample = Rawdata::new("camera", Vec::<String>::new())
            .with_time("2024-01-01T00:00:00.000Z")
            .with_location(25.5, 121.5);
        let image_bytes: Vec<u8> = (0u8..10).collect();
        let image = Image::new("frame.png", "image/png", image_bytes.clone());

        client.save_snapshot("d1", &sample, image).await.unwrap();

        let requests = server.received_requests().await.expect("recorded requests");
        assert_eq!(requests.len(), 1);
        let request = &requests[0];

        let content_type = request
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .expect("content type")
            .to_owned();
        assert!(content_type.starts_with("multipart/form-data"));
        let boundary = content_type
            .split("boundary=")
            .nth(1)
            .expect("boundary")
            .trim_matches('"');

        let content_length: usize = request
            .headers
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .expect("fixed content length");
        assert_eq!(content_length, request.body.len());

        let parts = multipart_parts(&request.body, boundary);
        assert_eq!(parts.len(), 2);

        let (meta_headers, meta_body) = &parts[0];
        assert!(meta_headers.contains("name=\"meta\""));
        assert!(
            meta_headers
                .to_ascii_lowercase()
                .contains("content-type: application/json; charset=utf-8")
        );
        let meta: Rawdata = serde_json::from_slice(meta_body).unwrap();
        assert_eq!(meta, sample);

        let (image_headers, image_body) = &parts[1];
        assert!(image_headers.contains("name=\"frame.png\""));
        assert!(image_headers.contains("content-type: image/png"));
        assert_eq!(image_body.len(), 10);
        assert_eq!(image_body, &image_bytes);
    }

    #[tokio::test]
    async fn test_snapshot_meta_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/cam/snapshot/meta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"id": "cam", "time": "2024-01-01T00:00:00.000Z", "value": ["snapshot://img-7"]}
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/cam/snapshot/img-7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/cam/snapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let meta = client.snapshot_meta("d1", "cam").await.unwrap();
        let image_id = meta.snapshot_id().expect("snapshot id");
        assert_eq!(image_id, "img-7");

        let body = client.snapshot_body_by_id("d1", "cam", image_id).await.unwrap();
        assert_eq!(body, vec![0x89, b'P', b'N', b'G']);

        let latest = client.snapshot_body("d1", "cam").await.unwrap();
        assert_eq!(latest, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_snapshot_metas_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/cam/snapshot/meta"))
            .and(query_param("start", "a"))
            .and(query_param("end", "b"))
            .and(query_param_is_missing("interval"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "cam", "value": ["snapshot://1"]},
                {"id": "cam", "value": ["snapshot://2"]}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/iot/v1/device/d1/sensor/cam/snapshot"))
            .and(query_param("start", "a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let range = RangeQuery::starting("a").end("b").interval(3);
        let metas = client.snapshot_metas("d1", "cam", &range).await.unwrap();
        let ids: Vec<_> = metas.iter().filter_map(Rawdata::snapshot_id).collect();
        assert_eq!(ids, vec!["1", "2"]);

        client.delete_snapshot("d1", "cam", &range).await.unwrap();
    }

    #[tokio::test]
    async fn test_sensor_operations() {
        let server = MockServer::start().await;
        let sensor = Sensor::new("temperature")
            .with_name("Temperature")
            .with_kind("gauge")
            .with_unit("C");

        Mock::given(method("POST"))
            .and(path("/iot/v1/device/d1/sensor"))
            .and(body_json(json!({
                "id": "temperature", "name": "Temperature", "type": "gauge", "unit": "C"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/iot/v1/device/d1/sensor/temperature"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sensor/temperature"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&sensor))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/iot/v1/device/d1/sensor/temperature"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let saved = client.save_sensor("d1", &sensor).await.unwrap();
        assert_eq!(saved, sensor);

        client.modify_sensor("d1", &sensor).await.unwrap();
        assert_eq!(client.sensor("d1", "temperature").await.unwrap(), sensor);
        client.delete_sensor("d1", "temperature").await.unwrap();
    }

    #[tokio::test]
    async fn test_modify_device_requires_id() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.modify_device(&Device::new("x")).await.unwrap_err();
        assert!(matches!(err, Error::MissingParameter("device id")));
    }

    #[tokio::test]
    async fn test_modify_device() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/iot/v1/device/42"))
            .and(body_json(json!({"id": "42", "desc": "moved"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .modify_device(&Device::with_id("42").with_desc("moved"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sheet_and_records() {
        let server = MockServer::start().await;
        let sheet = Sheet::new("weather")
            .with_name("Weather")
            .with_column(Column::new("temperature", "float"));

        Mock::given(method("PUT"))
            .and(path("/iot/v1/device/d1/sheet"))
            .and(body_json(&sheet))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sheet"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([&sheet])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/iot/v1/device/d1/record"))
            .and(body_json(json!([{"id": "weather", "value": {"temperature": "21.5"}}])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sheet/weather/record"))
            .and(query_param("start", "a"))
            .and(query_param("interval", "60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "weather", "time": "t1", "value": {"temperature": "21.5"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device/d1/sheet/weather/record"))
            .and(query_param_is_missing("start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"id": "weather", "time": "t2", "value": {"temperature": "22"}}
            )))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/iot/v1/device/d1/sheet/weather"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.declare_sheet("d1", &sheet).await.unwrap(), sheet);
        assert_eq!(client.sheets("d1").await.unwrap(), vec![sheet.clone()]);

        let record = Record::new(
            "weather",
            HashMap::from([("temperature".to_string(), "21.5".to_string())]),
        );
        client.save_record("d1", &record).await.unwrap();

        let records = client
            .records("d1", "weather", &RangeQuery::starting("a").interval(60))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value["temperature"], "21.5");

        let latest = client.record("d1", "weather").await.unwrap();
        assert_eq!(latest.time.as_deref(), Some("t2"));

        client.delete_sheet("d1", "weather").await.unwrap();
    }

    #[tokio::test]
    async fn test_provisioning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/iot/v1/registry/SN-0001"))
            .and(body_json(json!({"op": "Reconfigure", "digest": "d1g3st"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/iot/v1/registry/SN-0002"))
            .and(body_json(
                json!({"op": "SetDeviceId", "digest": "d1g3st", "deviceId": "77"}),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.reconfigure("SN-0001", "d1g3st").await.unwrap();
        client.set_device_id("SN-0002", "d1g3st", "77").await.unwrap();
    }

    /// Serves a single empty response with the given status line and
    /// returns the listening port.
    async fn status_line_server(status_line: &'static str) -> u16 {
        use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{}\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
                status_line
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        port
    }

    #[tokio::test]
    async fn test_status_error_keeps_server_reason() {
        let port = status_line_server("HTTP/1.1 404 Device Not Registered").await;
        let client =
            Client::new(ClientConfig::new("127.0.0.1", API_KEY).with_port(port)).unwrap();

        let err = client.device("42").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "[404] Device Not Registered");
    }

    #[tokio::test]
    async fn test_status_error_standard_reason() {
        let port = status_line_server("HTTP/1.1 404 Not Found").await;
        let client =
            Client::new(ClientConfig::new("127.0.0.1", API_KEY).with_port(port)).unwrap();

        let err = client.device("42").await.unwrap_err();
        assert_eq!(err.to_string(), "[404] Not Found");
    }

    #[tokio::test]
    async fn test_status_error_unregistered_code() {
        let port = status_line_server("HTTP/1.1 499 Client Closed").await;
        let client =
            Client::new(ClientConfig::new("127.0.0.1", API_KEY).with_port(port)).unwrap();

        let err = client.device("42").await.unwrap_err();
        assert_eq!(err.status(), Some(499));
        assert_eq!(err.to_string(), "[499] Client Closed");

        let port = status_line_server("HTTP/1.1 499 ").await;
        let client =
            Client::new(ClientConfig::new("127.0.0.1", API_KEY).with_port(port)).unwrap();

        let err = client.device("42").await.unwrap_err();
        assert_eq!(err.to_string(), "[499]");
    }

    #[tokio::test]
    async fn test_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client =
            Client::new(ClientConfig::new("127.0.0.1", API_KEY).with_port(port)).unwrap();
        let err = client.devices().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.set_timeout(50);
        match client.devices().await {
            Err(Error::Http(err)) => assert!(err.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }

        client.set_timeout(5_000);
        assert!(client.devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/iot/v1/device"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
            .expect(8)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.devices().await })
            })
            .collect();

        for task in tasks {
            let devices = task.await.unwrap().unwrap();
            assert_eq!(devices[0].id(), Some("1"));
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! URL construction for the OpenIoT resource tree.
//!
//! Every URL has the form `<scheme>://<host>:<port>/iot/v1/<path>[?<query>]`.
//! Identifiers are inserted into the path verbatim while query values are
//! form-urlencoded, since timestamps routinely carry `:` and `+`.

use crate::Error;
use std::fmt::{self, Display};
use url::form_urlencoded;

const API_ROOT: &str = "iot/v1";

/// Path of a resource below `/iot/v1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResourcePath(String);

impl ResourcePath {
    pub(crate) fn root(collection: &str) -> Self {
        ResourcePath(collection.to_owned())
    }

    /// Appends a path segment as-is.
    pub(crate) fn join(mut self, segment: &str) -> Self {
        self.0.push('/');
        self.0.push_str(segment);
        self
    }

    pub(crate) fn device(device_id: &str) -> Self {
        Self::root("device").join(device_id)
    }

    pub(crate) fn sensor(device_id: &str, sensor_id: &str) -> Self {
        Self::device(device_id).join("sensor").join(sensor_id)
    }

    pub(crate) fn sheet(device_id: &str, sheet_id: &str) -> Self {
        Self::device(device_id).join("sheet").join(sheet_id)
    }

    pub(crate) fn registry(serial_id: &str) -> Self {
        Self::root("registry").join(serial_id)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded query string, parameters kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn param(mut self, name: &'static str, value: &str) -> Self {
        let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
        self.pairs.push((name, encoded));
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (name, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Base location of the service.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Endpoint<'a> {
    pub(crate) tls: bool,
    pub(crate) host: &'a str,
    pub(crate) port: u16,
}

impl Endpoint<'_> {
    pub(crate) fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    pub(crate) fn url(&self, path: &ResourcePath, query: &Query) -> String {
        let mut url = format!(
            "{}://{}:{}/{}/{}",
            self.scheme(),
            self.host,
            self.port,
            API_ROOT,
            path
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.to_string());
        }
        url
    }
}

/// Time range for rawdata, snapshot and record queries.
///
/// `start` is mandatory for every ranged operation: a query without it fails
/// with [`Error::MissingParameter`] before anything is sent. Timestamps are
/// ISO-8601 strings passed to the server verbatim; whether `end` is inclusive
/// is up to the server.
///
/// ```rust
/// use openiot_client::RangeQuery;
///
/// let query = RangeQuery::starting("2024-01-01T00:00:00.000Z")
///     .end("2024-01-02T00:00:00.000Z")
///     .interval(5);
/// assert_eq!(query.get_interval(), Some(5));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
    interval: Option<u32>,
}

impl RangeQuery {
    /// An empty query. It must be given a start before use.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting(start: impl Into<String>) -> Self {
        Self::new().start(start)
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Sampling interval in minutes.
    pub fn interval(mut self, minutes: u32) -> Self {
        self.interval = Some(minutes);
        self
    }

    pub fn get_start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn get_end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    pub fn get_interval(&self) -> Option<u32> {
        self.interval
    }

    /// Builds the query string. The interval is only sent by operations that
    /// sample data, never by deletes.
    pub(crate) fn to_query(&self, with_interval: bool) -> Result<Query, Error> {
        let start = match self.start.as_deref() {
            Some(start) if !start.is_empty() => start,
            _ => return Err(Error::MissingParameter("start")),
        };

        let mut query = Query::new().param("start", start);
        if let Some(end) = &self.end {
            query = query.param("end", end);
        }
        if with_interval && let Some(interval) = self.interval {
            query = query.param("interval", &interval.to_string());
        }
        Ok(query)
    }
}

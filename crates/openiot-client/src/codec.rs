// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Request body encoding and response decoding.

use crate::{Error, Image, Rawdata};
use log::error;
use reqwest::multipart::{Form, Part};
use serde::{Serialize, de::DeserializeOwned};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Content type of the snapshot `meta` part.
pub(crate) const META_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Name of the multipart field carrying the snapshot sample.
pub(crate) const META_PART: &str = "meta";

/// Request body of a single operation.
#[derive(Debug)]
pub(crate) enum Payload {
    /// No body, used by GET and DELETE.
    Empty,
    /// UTF-8 JSON document.
    Json(Vec<u8>),
    /// Snapshot sample plus image.
    Snapshot(SnapshotForm),
}

impl Payload {
    pub(crate) fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        serde_json::to_vec(value)
            .map(Payload::Json)
            .map_err(Error::Encoding)
    }
}

/// Two-part multipart body of a snapshot upload: the JSON `meta` part
/// followed by the image part.
#[derive(Debug)]
pub(crate) struct SnapshotForm {
    meta: Vec<u8>,
    image: Image,
}

impl SnapshotForm {
    pub(crate) fn new(sample: &Rawdata, image: Image) -> Result<Self, Error> {
        let meta = serde_json::to_vec(sample).map_err(Error::Encoding)?;
        Ok(SnapshotForm { meta, image })
    }

    pub(crate) fn meta(&self) -> &[u8] {
        &self.meta
    }

    pub(crate) fn image(&self) -> &Image {
        &self.image
    }

    /// Builds the multipart form. Both parts are in-memory buffers so the
    /// form is sent with a fixed content length.
    pub(crate) fn into_form(self) -> Result<Form, Error> {
        let meta = Part::bytes(self.meta).mime_str(META_CONTENT_TYPE)?;
        let content_type = self.image.content_type;
        let image = Part::bytes(self.image.body)
            .mime_str(&content_type)
            .map_err(|_| {
                Error::InvalidParameters(format!("invalid image content type: {}", content_type))
            })?;

        Ok(Form::new()
            .part(META_PART, meta)
            .part(self.image.name, image))
    }
}

/// Decodes a response body into `T`.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|err| {
        error!("Invalid JSON Response: {}", String::from_utf8_lossy(body));
        Error::Decoding(err)
    })
}

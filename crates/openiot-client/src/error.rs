// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

/// Error type for OpenIoT client operations.
///
/// Each variant corresponds to one failure class so callers can match on the
/// kind of failure rather than parsing messages. Local failures
/// ([`MissingParameter`][Error::MissingParameter],
/// [`Encoding`][Error::Encoding], [`Decoding`][Error::Decoding]) are never
/// worth retrying; [`Status`][Error::Status] and [`Http`][Error::Http] come
/// from the remote side or the network and are returned as-is.
#[derive(Debug)]
pub enum Error {
    /// A required parameter was not provided. Raised before any request is
    /// sent.
    MissingParameter(&'static str),
    /// The server answered with a status other than 200. Carries the numeric
    /// status code and the status text.
    Status(u16, String),
    /// A request payload could not be serialized to JSON.
    Encoding(serde_json::Error),
    /// A response body did not match the expected shape.
    Decoding(serde_json::Error),
    /// Connection failure, timeout or I/O fault from the HTTP client.
    Http(reqwest::Error),
    /// Invalid local input such as a malformed MIME type or API key.
    InvalidParameters(String),
    /// Configuration loading error.
    Config(config::ConfigError),
    /// Local file I/O error.
    Io(std::io::Error),
}

impl Error {
    /// Returns the HTTP status code when the error came from a non-200
    /// response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status(code, _) => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingParameter(name) => write!(f, "You must specify the {} parameter", name),
            Error::Status(code, text) if text.is_empty() => write!(f, "[{}]", code),
            Error::Status(code, text) => write!(f, "[{}] {}", code, text),
            Error::Encoding(e) => write!(f, "JSON encoding error: {}", e),
            Error::Decoding(e) => write!(f, "JSON decoding error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Encoding(e) => Some(e),
            Error::Decoding(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Client configuration.
//!
//! A [`ClientConfig`] can be built in code or loaded from layered sources:
//!
//! 1. Built-in defaults (port `8080`, TLS off, timeout `30000` ms)
//! 2. An optional TOML file, by default `config.toml` in the platform config
//!    directory
//! 3. Environment variables `OPENIOT_HOST`, `OPENIOT_PORT`,
//!    `OPENIOT_API_KEY`, `OPENIOT_TLS` and `OPENIOT_TIMEOUT`
//!
//! ```rust,no_run
//! use openiot_client::ClientConfig;
//!
//! # fn main() -> Result<(), openiot_client::Error> {
//! let config = ClientConfig::new("iot.example.com", "my-api-key")
//!     .with_port(443)
//!     .with_tls(true);
//!
//! let from_env = ClientConfig::load(None)?;
//! # Ok(())
//! # }
//! ```

use crate::Error;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Default service port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default connection and read timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const ENV_PREFIX: &str = "OPENIOT";

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Connection settings for a [`Client`][crate::Client].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Project API key sent in the `CK` header of every request.
    pub api_key: String,
    /// Use `https` instead of `http`.
    #[serde(default)]
    pub tls: bool,
    /// Request timeout in milliseconds, `0` disables the timeout.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        ClientConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            api_key: api_key.into(),
            tls: false,
            timeout: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout as a [`Duration`], `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Location of the default configuration file, if the platform has a
    /// configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("ai", "EdgeFirst", "OpenIoT")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the configuration from defaults, the given file (or the default
    /// file when `None`) and `OPENIOT_*` environment variables.
    ///
    /// A missing file is not an error. A missing host or API key is.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with_overrides(path, &ConfigOverrides::default())
    }

    /// Same as [`load`][ClientConfig::load] with a final layer of explicit
    /// values, such as command line arguments, above the environment.
    pub fn load_with_overrides(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, Error> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        let mut builder = Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("tls", false)?
            .set_default("timeout", DEFAULT_TIMEOUT_MS as i64)?;

        if let Some(path) = path {
            debug!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .set_override_option("host", overrides.host.clone())?
            .set_override_option("api_key", overrides.api_key.clone())?
            .set_override_option("port", overrides.port.map(i64::from))?
            .set_override_option("tls", overrides.tls)?
            .set_override_option("timeout", overrides.timeout.map(|ms| ms as i64))?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Values taking precedence over every other configuration source. `None`
/// leaves the lower layers untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub tls: Option<bool>,
    pub timeout: Option<u64>,
}

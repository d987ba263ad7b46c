// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use cloudxfer_core::{Context, Error, Result};
use cloudxfer_google_drive::DRIVE_API_ENDPOINT;
use std::str::FromStr;
use std::time::Duration;

/// Files up to this size are sent with a single `PUT`.
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;
/// Size of every multipart part except the last one.
pub const DEFAULT_PART_SIZE: usize = 50 * 1024 * 1024;
/// Attempts per part, including the first one.
pub const DEFAULT_MAX_PART_ATTEMPTS: u32 = 3;
/// Delay before the first part retry, doubled for every further one.
pub const DEFAULT_PART_RETRY_BACKOFF: Duration = Duration::from_millis(200);
/// Host of the S3 compatible destination, prefixed with the account id.
pub const DEFAULT_DESTINATION_HOST: &str = "r2.cloudflarestorage.com";

const CLOUDXFER_MULTIPART_THRESHOLD: &str = "CLOUDXFER_MULTIPART_THRESHOLD";
const CLOUDXFER_PART_SIZE: &str = "CLOUDXFER_PART_SIZE";
const CLOUDXFER_MAX_PART_ATTEMPTS: &str = "CLOUDXFER_MAX_PART_ATTEMPTS";
const CLOUDXFER_PART_RETRY_BACKOFF_MS: &str = "CLOUDXFER_PART_RETRY_BACKOFF_MS";
const CLOUDXFER_DRIVE_ENDPOINT: &str = "CLOUDXFER_DRIVE_ENDPOINT";
const CLOUDXFER_DESTINATION_HOST: &str = "CLOUDXFER_DESTINATION_HOST";
const CLOUDXFER_DESTINATION_SCHEME: &str = "CLOUDXFER_DESTINATION_SCHEME";

/// Config carries the tunables of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    /// Largest file size still sent with a single request.
    pub multipart_threshold: u64,
    /// Bytes per multipart part.
    pub part_size: usize,
    /// Attempts per part before the transfer fails.
    pub max_part_attempts: u32,
    /// Initial delay between part attempts.
    pub part_retry_backoff: Duration,
    /// Google Drive API endpoint.
    pub drive_endpoint: String,
    /// Destination host, the account id is prepended as a subdomain.
    pub destination_host: String,
    /// Destination scheme, `https` unless talking to a local store.
    pub destination_scheme: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            part_size: DEFAULT_PART_SIZE,
            max_part_attempts: DEFAULT_MAX_PART_ATTEMPTS,
            part_retry_backoff: DEFAULT_PART_RETRY_BACKOFF,
            drive_endpoint: DRIVE_API_ENDPOINT.to_string(),
            destination_host: DEFAULT_DESTINATION_HOST.to_string(),
            destination_scheme: "https".to_string(),
        }
    }
}

impl TransferConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the multipart threshold.
    pub fn with_multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = threshold;
        self
    }

    /// Set the part size.
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size;
        self
    }

    /// Set the attempts per part.
    pub fn with_max_part_attempts(mut self, attempts: u32) -> Self {
        self.max_part_attempts = attempts;
        self
    }

    /// Set the initial retry delay.
    pub fn with_part_retry_backoff(mut self, backoff: Duration) -> Self {
        self.part_retry_backoff = backoff;
        self
    }

    /// Set the Google Drive API endpoint.
    pub fn with_drive_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.drive_endpoint = endpoint.into();
        self
    }

    /// Set the destination host.
    pub fn with_destination_host(mut self, host: impl Into<String>) -> Self {
        self.destination_host = host.into();
        self
    }

    /// Set the destination scheme.
    pub fn with_destination_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.destination_scheme = scheme.into();
        self
    }

    /// Load config from environment variables.
    ///
    /// Unset variables keep their defaults, unparseable ones are an error.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = parse_env(ctx, CLOUDXFER_MULTIPART_THRESHOLD)? {
            cfg.multipart_threshold = v;
        }
        if let Some(v) = parse_env(ctx, CLOUDXFER_PART_SIZE)? {
            cfg.part_size = v;
        }
        if let Some(v) = parse_env(ctx, CLOUDXFER_MAX_PART_ATTEMPTS)? {
            cfg.max_part_attempts = v;
        }
        if let Some(v) = parse_env(ctx, CLOUDXFER_PART_RETRY_BACKOFF_MS)? {
            cfg.part_retry_backoff = Duration::from_millis(v);
        }
        if let Some(v) = ctx.env_var(CLOUDXFER_DRIVE_ENDPOINT) {
            cfg.drive_endpoint = v;
        }
        if let Some(v) = ctx.env_var(CLOUDXFER_DESTINATION_HOST) {
            cfg.destination_host = v;
        }
        if let Some(v) = ctx.env_var(CLOUDXFER_DESTINATION_SCHEME) {
            cfg.destination_scheme = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the values can drive a transfer.
    pub fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(Error::config_invalid("part_size must be greater than zero"));
        }
        if self.max_part_attempts == 0 {
            return Err(Error::config_invalid(
                "max_part_attempts must be greater than zero",
            ));
        }
        if self.part_size as u64 > self.multipart_threshold {
            return Err(Error::config_invalid(
                "part_size must not exceed multipart_threshold",
            )
            .with_context(format!("part_size: {}", self.part_size))
            .with_context(format!("multipart_threshold: {}", self.multipart_threshold)));
        }
        if !matches!(self.destination_scheme.as_str(), "http" | "https") {
            return Err(Error::config_invalid("destination_scheme must be http or https")
                .with_context(format!("destination_scheme: {}", self.destination_scheme)));
        }
        Ok(())
    }
}

fn parse_env<T>(ctx: &Context, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(v) = ctx.env_var(key) else {
        return Ok(None);
    };

    v.trim().parse().map(Some).map_err(|e| {
        Error::config_invalid(format!("invalid value for {key}"))
            .with_source(e)
            .with_context(format!("value: {v}"))
    })
}

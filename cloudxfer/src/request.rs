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

use cloudxfer_core::utils::Redact;
use cloudxfer_core::{Error, Result};
use cloudxfer_s3_v4::DEFAULT_REGION;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// TransferRequest describes one file to move from Google Drive into a bucket.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Google Drive file id.
    #[serde(default)]
    pub source_file_id: String,
    /// OAuth access token allowed to read the file.
    #[serde(default)]
    pub source_access_token: String,
    /// File name, used as the suffix of the object key.
    #[serde(default)]
    pub file_name: String,
    /// Size announced by the caller, decides how the file is uploaded.
    pub file_size: u64,
    /// Content type stored with the object.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Destination bucket.
    #[serde(default)]
    pub destination_bucket: String,
    /// Destination account id, the subdomain of the destination host.
    #[serde(default)]
    pub destination_account_id: String,
    /// Destination access key id.
    #[serde(default)]
    pub destination_key_id: String,
    /// Destination secret access key.
    #[serde(default)]
    pub destination_secret: String,
    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for TransferRequest {
    fn default() -> Self {
        Self {
            source_file_id: String::new(),
            source_access_token: String::new(),
            file_name: String::new(),
            file_size: 0,
            mime_type: default_mime_type(),
            destination_bucket: String::new(),
            destination_account_id: String::new(),
            destination_key_id: String::new(),
            destination_secret: String::new(),
            region: default_region(),
        }
    }
}

impl Debug for TransferRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRequest")
            .field("source_file_id", &self.source_file_id)
            .field("source_access_token", &Redact::from(&self.source_access_token))
            .field("file_name", &self.file_name)
            .field("file_size", &self.file_size)
            .field("mime_type", &self.mime_type)
            .field("destination_bucket", &self.destination_bucket)
            .field("destination_account_id", &self.destination_account_id)
            .field("destination_key_id", &self.destination_key_id)
            .field("destination_secret", &Redact::from(&self.destination_secret))
            .field("region", &self.region)
            .finish()
    }
}

impl TransferRequest {
    /// Parse a request from its JSON form.
    pub fn from_json(bs: &[u8]) -> Result<Self> {
        serde_json::from_slice(bs).map_err(|e| {
            Error::request_invalid(format!("Invalid request body: {e}")).with_source(e)
        })
    }

    /// Check that every required field is present and the file name can be
    /// used in an object key.
    ///
    /// All missing fields are reported at once, in declaration order.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("sourceFileId", &self.source_file_id),
            ("sourceAccessToken", &self.source_access_token),
            ("fileName", &self.file_name),
            ("destinationBucket", &self.destination_bucket),
            ("destinationAccountId", &self.destination_account_id),
            ("destinationKeyId", &self.destination_key_id),
            ("destinationSecret", &self.destination_secret),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(Error::request_invalid(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        // `/` in the name becomes part of the key path, and `.` or `..`
        // segments would be resolved by the transport after signing.
        if self
            .file_name
            .split('/')
            .any(|segment| segment == "." || segment == "..")
        {
            return Err(Error::request_invalid(
                "fileName must not contain '.' or '..' path segments",
            )
            .with_context(format!("file_name: {}", self.file_name)));
        }
        Ok(())
    }
}

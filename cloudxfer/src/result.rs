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

use cloudxfer_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// How a file is written to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    /// One `PUT` carrying the whole file.
    SingleUpload,
    /// A multipart upload session.
    MultipartUpload,
}

impl TransferMethod {
    /// Pick the method for a file: sizes up to and including the threshold go
    /// through a single upload.
    pub fn select(file_size: u64, multipart_threshold: u64) -> Self {
        if file_size <= multipart_threshold {
            TransferMethod::SingleUpload
        } else {
            TransferMethod::MultipartUpload
        }
    }

    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMethod::SingleUpload => "single_upload",
            TransferMethod::MultipartUpload => "multipart_upload",
        }
    }
}

impl Display for TransferMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multipart session left open on the destination by a failed transfer.
///
/// The session keeps its parts until it is aborted or reaped by the bucket's
/// lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteUpload {
    /// Object key of the session.
    pub key: String,
    /// Upload id of the session.
    pub upload_id: String,
    /// Parts stored before the failure.
    pub parts_uploaded: u32,
}

/// TransferFailure is an error together with the session it left behind.
#[derive(Debug)]
pub struct TransferFailure {
    /// What went wrong.
    pub error: Error,
    /// Set when the failure happened after a multipart session was created.
    pub incomplete_upload: Option<IncompleteUpload>,
}

impl From<Error> for TransferFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            incomplete_upload: None,
        }
    }
}

/// Outcome of one transfer, in the shape returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<TransferMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_upload: Option<IncompleteUpload>,
}

impl TransferResult {
    /// Result of a completed single upload.
    pub fn single_upload(file_name: &str, key: &str, url: String, total_bytes: u64) -> Self {
        Self {
            success: true,
            file_name: Some(file_name.to_string()),
            key: Some(key.to_string()),
            url: Some(url),
            method: Some(TransferMethod::SingleUpload),
            total_bytes: Some(total_bytes),
            ..Default::default()
        }
    }

    /// Result of a completed multipart upload.
    pub fn multipart_upload(
        file_name: &str,
        key: &str,
        url: String,
        parts: u32,
        total_bytes: u64,
    ) -> Self {
        Self {
            success: true,
            file_name: Some(file_name.to_string()),
            key: Some(key.to_string()),
            url: Some(url),
            method: Some(TransferMethod::MultipartUpload),
            parts: Some(parts),
            total_bytes: Some(total_bytes),
            ..Default::default()
        }
    }

    /// Result of a failed transfer.
    pub fn failure(error: impl Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

impl From<TransferFailure> for TransferResult {
    fn from(value: TransferFailure) -> Self {
        Self {
            incomplete_upload: value.incomplete_upload,
            ..Self::failure(value.error)
        }
    }
}

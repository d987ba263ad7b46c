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
use http::StatusCode;
use quick_xml::de;
use serde::Deserialize;

/// Error document returned by S3 compatible stores.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct S3Error {
    code: String,
    message: String,
    request_id: String,
}

/// Parse an S3 error response into a destination error.
///
/// `step` names the operation that failed, e.g. `initiate multipart upload`.
/// Server errors and throttling are marked retryable.
pub fn parse_s3_error(step: &str, status: StatusCode, body: &str) -> Error {
    let retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;

    let mut err = match de::from_str::<S3Error>(body) {
        Ok(e) if !e.code.is_empty() => {
            let mut err = Error::destination_failed(format!(
                "{step} failed: {status} {}: {}",
                e.code, e.message
            ));
            if !e.request_id.is_empty() {
                err = err.with_context(format!("request_id: {}", e.request_id));
            }
            err
        }
        _ if body.trim().is_empty() => Error::destination_failed(format!("{step} failed: {status}")),
        _ => Error::destination_failed(format!("{step} failed: {status} {}", body.trim())),
    };
    err = err.set_retryable(retryable);
    err
}

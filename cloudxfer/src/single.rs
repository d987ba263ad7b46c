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

use crate::destination::{check_response, step_error};
use crate::{Destination, ObjectKey};
use cloudxfer_core::Result;
use cloudxfer_google_drive::SourceStream;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use log::{debug, warn};

const STEP: &str = "put object";

/// Pipe the source content into one `PUT` of the object.
///
/// The body is streamed straight from the source response, nothing is
/// buffered. Returns the number of bytes declared in `Content-Length`.
pub async fn upload_single(
    dest: &Destination,
    key: &ObjectKey,
    source: SourceStream,
    content_type: &str,
    file_size: u64,
) -> Result<u64> {
    let content_length = match source.content_length() {
        Some(len) if len != file_size => {
            warn!("source reports {len} bytes but file size is {file_size}, using source length");
            len
        }
        Some(len) => len,
        None => file_size,
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

    debug!("uploading {content_length} bytes to {key} with a single request");
    let (body, read_failure) = source.into_body();
    let resp = dest.send(Method::PUT, key, None, headers, body).await;

    // A source read error surfaces as a send error or a rejected request.
    if let Some(err) = read_failure.take() {
        return Err(err.with_context(format!("step: {STEP}")));
    }
    check_response(STEP, resp.map_err(|e| step_error(STEP, e))?).await?;

    Ok(content_length)
}

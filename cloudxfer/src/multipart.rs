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
use crate::{Destination, IncompleteUpload, ObjectKey, PartData};
use cloudxfer_core::{Body, Error, Result};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use http::{HeaderMap, HeaderValue, Method};
use log::{debug, warn};
use quick_xml::de;
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;

/// Largest part number accepted by S3 compatible stores.
pub const MAX_PART_NUMBER: u32 = 10_000;

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InitiateMultipartUploadResult {
    upload_id: String,
}

/// A part stored by the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: u32,
    /// ETag returned for the part, without quotes.
    pub etag: String,
}

/// RetryPolicy bounds how often a single part is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per part, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled for each further one.
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// MultipartUpload is an open upload session on the destination.
#[derive(Debug)]
pub struct MultipartUpload {
    dest: Destination,
    key: ObjectKey,
    upload_id: String,
    parts: Vec<CompletedPart>,
}

impl MultipartUpload {
    /// Initiate a session for the object.
    ///
    /// The content type is recorded at initiation and applies to the final
    /// object.
    pub async fn initiate(dest: &Destination, key: ObjectKey, content_type: &str) -> Result<Self> {
        const STEP: &str = "initiate multipart upload";

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);

        let resp = dest
            .send(Method::POST, &key, Some("uploads"), headers, Body::empty())
            .await
            .map_err(|e| step_error(STEP, e))?;
        let body = check_response(STEP, resp)
            .await?
            .into_body()
            .collect_string()
            .await
            .map_err(|e| step_error(STEP, e))?;

        let upload_id = parse_upload_id(&body)?;
        debug!("initiated multipart upload {upload_id} for {key}");

        Ok(Self {
            dest: dest.clone(),
            key,
            upload_id,
            parts: Vec::new(),
        })
    }

    /// Object key of the session.
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Upload id assigned by the destination.
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Parts stored so far, in upload order.
    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    /// Describe this session as left behind by a failed transfer.
    pub fn incomplete(&self) -> IncompleteUpload {
        IncompleteUpload {
            key: self.key.to_string(),
            upload_id: self.upload_id.clone(),
            parts_uploaded: self.parts.len() as u32,
        }
    }

    /// Upload one part, retrying retryable failures within the policy.
    ///
    /// Parts must arrive in order: the part number has to follow the last
    /// stored part.
    pub async fn upload_part(&mut self, part: &PartData, policy: RetryPolicy) -> Result<()> {
        let expected = self.parts.len() as u32 + 1;
        if part.number != expected {
            return Err(Error::request_invalid(format!(
                "part {} uploaded out of order, expected part {expected}",
                part.number
            )));
        }
        if part.number > MAX_PART_NUMBER {
            return Err(Error::request_invalid(format!(
                "file needs more than {MAX_PART_NUMBER} parts, increase the part size"
            ))
            .with_context(format!("part_number: {}", part.number)));
        }

        let mut attempt = 1;
        let etag = loop {
            match self.put_part(part).await {
                Ok(etag) => break etag,
                Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                    let delay = policy.delay(attempt);
                    warn!(
                        "upload part {} failed on attempt {attempt}/{}, retrying in {delay:?}: {err}",
                        part.number, policy.max_attempts
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        debug!(
            "uploaded part {} ({} bytes) of {}",
            part.number,
            part.len(),
            self.upload_id
        );
        self.parts.push(CompletedPart {
            part_number: part.number,
            etag,
        });
        Ok(())
    }

    async fn put_part(&self, part: &PartData) -> Result<String> {
        let step = format!("upload part {}", part.number);
        let query = format!("partNumber={}&uploadId={}", part.number, encode(&self.upload_id));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(part.len()));

        let resp = self
            .dest
            .send(
                Method::PUT,
                &self.key,
                Some(&query),
                headers,
                Body::from(part.data.clone()),
            )
            .await
            .map_err(|e| step_error(&step, e))?;
        let resp = check_response(&step, resp).await?;

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::response_malformed("missing ETag in upload part response")
                    .with_context(format!("step: {step}"))
            })?;
        Ok(etag)
    }

    /// Complete the session, assembling the object from every stored part.
    ///
    /// Returns the number of parts in the object.
    pub async fn complete(&self) -> Result<u32> {
        const STEP: &str = "complete multipart upload";

        let query = format!("uploadId={}", encode(&self.upload_id));
        let body = complete_body(&self.parts);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        let resp = self
            .dest
            .send(Method::POST, &self.key, Some(&query), headers, Body::from(body))
            .await
            .map_err(|e| step_error(STEP, e))?;
        let resp = check_response(STEP, resp).await?;

        // Completion may fail after the 200 status line was sent.
        let status = resp.status();
        let body = resp
            .into_body()
            .collect_string()
            .await
            .map_err(|e| step_error(STEP, e))?;
        if body.contains("<Error>") {
            return Err(cloudxfer_s3_v4::parse_s3_error(STEP, status, &body)
                .with_context(format!("step: {STEP}")));
        }

        Ok(self.parts.len() as u32)
    }

    /// Abort the session, dropping every stored part.
    pub async fn abort(&self) -> Result<()> {
        const STEP: &str = "abort multipart upload";

        let query = format!("uploadId={}", encode(&self.upload_id));
        let resp = self
            .dest
            .send(
                Method::DELETE,
                &self.key,
                Some(&query),
                HeaderMap::new(),
                Body::empty(),
            )
            .await
            .map_err(|e| step_error(STEP, e))?;
        check_response(STEP, resp).await?;
        Ok(())
    }
}

fn encode(v: &str) -> String {
    percent_encoding::utf8_percent_encode(v, &cloudxfer_s3_v4::AWS_QUERY_ENCODE_SET).to_string()
}

fn parse_upload_id(body: &str) -> Result<String> {
    let malformed = || {
        Error::response_malformed("malformed initiate response")
            .with_context("step: initiate multipart upload")
    };

    let result: InitiateMultipartUploadResult =
        de::from_str(body).map_err(|e| malformed().with_source(e))?;
    let upload_id = result.upload_id.trim();
    if upload_id.is_empty() {
        return Err(malformed());
    }
    Ok(upload_id.to_string())
}

/// Build the `CompleteMultipartUpload` document, parts in ascending order.
pub fn complete_body(parts: &[CompletedPart]) -> String {
    let mut sorted = parts.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|p| p.part_number);

    let mut s = String::with_capacity(64 + parts.len() * 96);
    s.push_str("<CompleteMultipartUpload>");
    for p in sorted {
        // Writing into a String never fails.
        let _ = write!(
            s,
            "<Part><PartNumber>{}</PartNumber><ETag>\"{}\"</ETag></Part>",
            p.part_number,
            quick_xml::escape::escape(p.etag.as_str())
        );
    }
    s.push_str("</CompleteMultipartUpload>");
    s
}

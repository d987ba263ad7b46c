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

use crate::constants::{DRIVE_API_ENDPOINT, DRIVE_PATH_ENCODE_SET};
use bytes::Bytes;
use cloudxfer_core::{Body, ByteStream, Context, Error, ErrorKind, Result};
use futures::{StreamExt, TryStreamExt};
use http::header;
use log::debug;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

/// DriveSource opens file content downloads against the Drive API.
#[derive(Debug, Clone)]
pub struct DriveSource {
    endpoint: String,
}

impl Default for DriveSource {
    fn default() -> Self {
        Self::new(DRIVE_API_ENDPOINT)
    }
}

impl DriveSource {
    /// Create a new source for the given API endpoint.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Build the media download url for a file.
    pub fn media_url(&self, file_id: &str) -> String {
        format!(
            "{}/files/{}?alt=media",
            self.endpoint,
            utf8_percent_encode(file_id, &DRIVE_PATH_ENCODE_SET)
        )
    }

    /// Open a streaming read of the file content.
    ///
    /// Any non-2xx response fails the transfer; nothing is retried here.
    pub async fn open(
        &self,
        ctx: &Context,
        file_id: &str,
        access_token: &str,
    ) -> Result<SourceStream> {
        let url = self.media_url(file_id);
        debug!("opening drive media download: {url}");

        let mut authorization: http::HeaderValue = format!("Bearer {access_token}")
            .parse()
            .map_err(|e| Error::request_invalid("invalid source access token").with_source(e))?;
        authorization.set_sensitive(true);

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .header(header::AUTHORIZATION, authorization)
            .body(Body::empty())?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            let retryable = e.is_retryable();
            Error::source_failed(format!("failed to fetch file from Google Drive: {e}"))
                .with_source(e)
                .with_context(format!("file_id: {file_id}"))
                .set_retryable(retryable)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.into_body().collect_string().await.unwrap_or_default();
            return Err(parse_drive_error(status, &body).with_context(format!("file_id: {file_id}")));
        }

        let content_length = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        Ok(SourceStream::new(
            resp.into_body().into_stream(),
            content_length,
        ))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct DriveErrorResponse {
    error: DriveError,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct DriveError {
    message: String,
}

fn parse_drive_error(status: http::StatusCode, body: &str) -> Error {
    let detail = match serde_json::from_str::<DriveErrorResponse>(body) {
        Ok(resp) if !resp.error.message.is_empty() => resp.error.message,
        _ => body.trim().to_string(),
    };

    let message = if detail.is_empty() {
        format!("Google Drive API error: {status}")
    } else {
        format!("Google Drive API error: {status} {detail}")
    };
    Error::source_failed(message)
        .set_retryable(status.is_server_error() || status == http::StatusCode::TOO_MANY_REQUESTS)
}

/// Pull-based reader over the source file content.
///
/// `next_chunk` returns `Ok(None)` once the content is exhausted and keeps
/// returning it afterwards.
pub struct SourceStream {
    inner: ByteStream,
    content_length: Option<u64>,
    bytes_read: u64,
    done: bool,
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("content_length", &self.content_length)
            .field("bytes_read", &self.bytes_read)
            .field("done", &self.done)
            .finish()
    }
}

impl SourceStream {
    /// Wrap a byte stream.
    pub fn new(inner: ByteStream, content_length: Option<u64>) -> Self {
        Self {
            inner,
            content_length,
            bytes_read: 0,
            done: false,
        }
    }

    /// Content length announced by the source, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Bytes handed out by `next_chunk` so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Check if the content has been fully read.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Pull the next non-empty chunk.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }

        while let Some(chunk) = self.inner.next().await {
            let chunk = chunk.map_err(read_error)?;
            if chunk.is_empty() {
                continue;
            }
            self.bytes_read += chunk.len() as u64;
            return Ok(Some(chunk));
        }

        self.done = true;
        Ok(None)
    }

    /// Hand the remaining content over as a request body.
    ///
    /// Transports wrap body errors into their own send errors. The returned
    /// [`ReadFailure`] keeps the first read error so callers can still report
    /// it as a source failure.
    pub fn into_body(self) -> (Body, ReadFailure) {
        let failure = ReadFailure::default();
        let slot = failure.clone();
        let body = Body::from_stream(
            self.inner
                .map_err(move |e| slot.record(read_error(e)))
                .boxed(),
        );
        (body, failure)
    }
}

/// ReadFailure holds the first error hit while a source body was streamed.
#[derive(Debug, Clone, Default)]
pub struct ReadFailure(Arc<Mutex<Option<Error>>>);

impl ReadFailure {
    /// Take the recorded error, if the body failed to read.
    pub fn take(&self) -> Option<Error> {
        self.0.lock().ok().and_then(|mut v| v.take())
    }

    /// Keep `err` and return a copy for the body stream.
    fn record(&self, err: Error) -> Error {
        let copy = Error::source_failed(err.message()).set_retryable(err.is_retryable());
        if let Ok(mut slot) = self.0.lock() {
            if slot.is_none() {
                *slot = Some(err);
            }
        }
        copy
    }
}

fn read_error(e: Error) -> Error {
    if e.kind() == ErrorKind::SourceFailed {
        return e;
    }
    let retryable = e.is_retryable();
    Error::source_failed(format!("failed to read file content from Google Drive: {e}"))
        .with_source(e)
        .set_retryable(retryable)
}

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

//! [`HttpSend`] implementation backed by reqwest.
//!
//! Request bodies built from a stream are forwarded without buffering and
//! response bodies are handed back as a stream, so file content flows through
//! the process one chunk at a time.

use async_trait::async_trait;
use cloudxfer_core::{Body, Error, HttpSend, Result};
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;

#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    ///
    /// Timeouts configured on the client are the only bound on how long a
    /// transfer step may take.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Body>> {
        let (parts, body) = req.into_parts();
        let body = match body.as_bytes() {
            Some(bs) => reqwest::Body::from(bs.clone()),
            None => reqwest::Body::wrap_stream(body.into_stream()),
        };

        let req = reqwest::Request::try_from(http::Request::from_parts(parts, body))
            .map_err(|e| Error::request_invalid("failed to build http request").with_source(e))?;
        let url = req.url().clone();
        let resp = self.client.execute(req).await.map_err(|e| {
            Error::unexpected("failed to send http request")
                .with_source(e)
                .with_context(format!("url: {}", redact_query(&url)))
                .set_retryable(true)
        })?;

        let mut builder = http::Response::builder()
            .status(resp.status())
            .version(resp.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(resp.headers().clone());
        }

        let stream = resp
            .bytes_stream()
            .map_err(|e| {
                Error::unexpected("failed to read http response body")
                    .with_source(e)
                    .set_retryable(true)
            })
            .boxed();
        Ok(builder.body(Body::from_stream(stream))?)
    }
}

/// Strip the query so upload ids and tokens never leak into error messages.
fn redact_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

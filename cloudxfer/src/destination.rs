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

use crate::{ObjectKey, TransferConfig, TransferRequest};
use cloudxfer_core::{Body, Context, Error, ErrorKind, Result, Signer};
use cloudxfer_s3_v4::{
    parse_s3_error, Credential, RequestSigner, StaticCredentialProvider, AWS_URI_ENCODE_SET,
};
use http::{HeaderMap, Method, Response};
use log::debug;
use percent_encoding::utf8_percent_encode;

/// Destination addresses one bucket and signs every request sent to it.
#[derive(Debug, Clone)]
pub struct Destination {
    ctx: Context,
    endpoint: String,
    bucket: String,
    signer: Signer<Credential>,
}

impl Destination {
    /// Build the destination described by a transfer request.
    pub fn new(ctx: Context, config: &TransferConfig, req: &TransferRequest) -> Self {
        let endpoint = format!(
            "{}://{}.{}",
            config.destination_scheme, req.destination_account_id, config.destination_host
        );
        let signer = Signer::new(
            ctx.clone(),
            StaticCredentialProvider::new(&req.destination_key_id, &req.destination_secret),
            RequestSigner::new(&req.region),
        );

        Self {
            ctx,
            endpoint,
            bucket: req.destination_bucket.clone(),
            signer,
        }
    }

    /// Endpoint without bucket, e.g. `https://acct.r2.cloudflarestorage.com`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Public url of the object.
    pub fn object_url(&self, key: &ObjectKey) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.bucket,
            utf8_percent_encode(key.as_str(), &AWS_URI_ENCODE_SET)
        )
    }

    /// Sign and send a request for the object.
    ///
    /// `query` is appended verbatim and must already be encoded. `headers`
    /// are attached after signing, so they never take part in the signature.
    pub async fn send(
        &self,
        method: Method,
        key: &ObjectKey,
        query: Option<&str>,
        headers: HeaderMap,
        body: Body,
    ) -> Result<Response<Body>> {
        let mut url = self.object_url(key);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }

        let (mut parts, ()) = http::Request::builder()
            .method(method)
            .uri(&url)
            .body(())?
            .into_parts();
        self.signer.sign(&mut parts).await?;
        parts.headers.extend(headers);
        debug!("sending {} request to destination", parts.method);

        self.ctx
            .http_send(http::Request::from_parts(parts, body))
            .await
    }
}

/// Turn a non-2xx destination response into an error naming the failed step.
pub async fn check_response(step: &str, resp: Response<Body>) -> Result<Response<Body>> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.into_body().collect_string().await.unwrap_or_default();
    Err(parse_s3_error(step, status, &body).with_context(format!("step: {step}")))
}

/// Wrap an error raised while talking to the destination with the step name.
///
/// Errors that already describe a destination reply are kept as they are.
pub fn step_error(step: &str, err: Error) -> Error {
    match err.kind() {
        ErrorKind::DestinationFailed
        | ErrorKind::ResponseMalformed
        | ErrorKind::CredentialInvalid
        | ErrorKind::SourceFailed => err,
        _ => {
            let retryable = err.is_retryable();
            Error::destination_failed(format!("{step} failed: {err}"))
                .with_source(err)
                .with_context(format!("step: {step}"))
                .set_retryable(retryable)
        }
    }
}

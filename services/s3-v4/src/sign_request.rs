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

use crate::constants::{
    ALGORITHM, AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, SERVICE, UNSIGNED_PAYLOAD,
    X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
};
use crate::Credential;
use async_trait::async_trait;
use cloudxfer_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use cloudxfer_core::time::{format_date, format_iso8601, now, DateTime};
use cloudxfer_core::{Context, Error, Result, SignRequest, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use std::fmt::Write;

/// RequestSigner that implement AWS SigV4 for S3 compatible stores.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// The payload is always declared as `UNSIGNED-PAYLOAD`: bodies are streamed
/// and never hashed before they are sent.
#[derive(Debug)]
pub struct RequestSigner {
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for the given region.
    pub fn new(region: &str) -> Self {
        Self {
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Region used in the credential scope.
    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Ok(());
        };

        let now = self.time.unwrap_or_else(now);
        let mut signed_req = SigningRequest::build(req)?;

        // canonicalize context
        canonicalize_header(&mut signed_req, now)?;
        canonicalize_query(&mut signed_req);

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req)?;
        debug!("calculated canonical request: {creq}");
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/s3/aws4_request"
        let scope = format!("{}/{}/{}/aws4_request", format_date(now), self.region, SERVICE);
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/s3/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{ALGORITHM}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{}", &scope)?;
            write!(f, "{}", &encoded_req)?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = generate_signing_key(&cred.secret_access_key, now, &self.region);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            signed_req.header_name_to_vec_sorted().join(";"),
            signature
        ))
        .map_err(|e| {
            Error::request_invalid("failed to create authorization header").with_source(e)
        })?;
        authorization.set_sensitive(true);

        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)
    }
}

fn canonical_request_string(ctx: &SigningRequest) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)?;
    // Insert encoded path
    let path = percent_decode_str(&ctx.path)
        .decode_utf8()
        .map_err(|e| Error::request_invalid("request path is not valid utf-8").with_source(e))?;
    writeln!(f, "{}", utf8_percent_encode(&path, &AWS_URI_ENCODE_SET))?;
    // Insert query
    writeln!(
        f,
        "{}",
        ctx.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    let signed_headers = ctx.header_name_to_vec_sorted();
    for header in signed_headers.iter() {
        let value = &ctx.headers[*header];
        writeln!(f, "{}:{}", header, value.to_str()?)?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;
    write!(f, "{UNSIGNED_PAYLOAD}")?;

    Ok(f)
}

fn canonicalize_header(ctx: &mut SigningRequest, now: DateTime) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // Every request gets a fresh timestamp, so any stale one is replaced.
    ctx.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
    ctx.headers.insert(
        X_AMZ_CONTENT_SHA_256,
        HeaderValue::from_static(UNSIGNED_PAYLOAD),
    );

    Ok(())
}

fn canonicalize_query(ctx: &mut SigningRequest) {
    if ctx.query.is_empty() {
        return;
    }

    // Sort by param name
    ctx.query.sort();

    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
}

/// Derive the signing key: `AWS4{secret}` -> date -> region -> `s3` -> `aws4_request`.
fn generate_signing_key(secret: &str, time: DateTime, region: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), SERVICE.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}

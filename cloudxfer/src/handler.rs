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

use crate::{Transfer, TransferRequest, TransferResult};
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use log::{debug, error};

const INTERNAL_ERROR_BODY: &str = r#"{"success":false,"error":"Failed to serialize transfer result"}"#;

impl Transfer {
    /// Handle one invocation carrying a JSON transfer request.
    ///
    /// - `405` for any method other than `POST`
    /// - `400` for a body that is not a valid request
    /// - `200` once the transfer ran, whether it succeeded or not
    /// - `500` if the result cannot be serialized
    pub async fn handle(&self, method: &Method, body: &[u8]) -> Response<String> {
        if method != Method::POST {
            let mut resp = json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &TransferResult::failure("Method not allowed"),
            );
            resp.headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
            return resp;
        }

        let req = match TransferRequest::from_json(body).and_then(|req| {
            req.validate()?;
            Ok(req)
        }) {
            Ok(req) => req,
            Err(err) => {
                debug!("rejected invocation: {err}");
                return json_response(StatusCode::BAD_REQUEST, &TransferResult::failure(err));
            }
        };

        let result = self.transfer(&req).await;
        json_response(StatusCode::OK, &result)
    }
}

fn json_response(status: StatusCode, result: &TransferResult) -> Response<String> {
    let (status, body) = match serde_json::to_string(result) {
        Ok(body) => (status, body),
        Err(err) => {
            error!("failed to serialize transfer result: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_BODY.to_string(),
            )
        }
    };

    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

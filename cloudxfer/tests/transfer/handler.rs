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

use crate::mock::{self, s3_error, Fault, MockCloud, Op};
use crate::{scaled_config, transfer, BUCKET, FILE_ID, KIB, MIB, TOKEN};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn invocation(file_size: u64) -> Vec<u8> {
    json!({
        "sourceFileId": FILE_ID,
        "sourceAccessToken": TOKEN,
        "fileName": "holiday.mov",
        "fileSize": file_size,
        "mimeType": "video/quicktime",
        "destinationBucket": BUCKET,
        "destinationAccountId": mock::ACCOUNT_ID,
        "destinationKeyId": mock::ACCESS_KEY_ID,
        "destinationSecret": mock::SECRET_ACCESS_KEY
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn test_handle_single_upload() {
    let size = 256 * KIB;
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, size);
    let resp = transfer(&mock, scaled_config())
        .handle(&Method::POST, &invocation(size))
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");

    let body: Value = serde_json::from_str(resp.body()).expect("body must be json");
    let key = body["key"].as_str().expect("key must be set").to_string();
    assert_eq!(
        body,
        json!({
            "success": true,
            "fileName": "holiday.mov",
            "key": key,
            "url": format!("http://acct.s3.test/{BUCKET}/{key}"),
            "method": "single_upload",
            "totalBytes": size
        })
    );

    let object = mock.object(BUCKET, &key).expect("object must be stored");
    assert_eq!(object.content_type.as_deref(), Some("video/quicktime"));
}

#[tokio::test]
async fn test_handle_multipart_upload() {
    let size = 3 * MIB;
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, size);
    let resp = transfer(&mock, scaled_config())
        .handle(&Method::POST, &invocation(size))
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(resp.body()).expect("body must be json");
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "multipart_upload");
    assert_eq!(body["parts"], 6);
    assert_eq!(body["totalBytes"], size);
}

#[tokio::test]
async fn test_handle_reports_incomplete_upload() {
    let size = 3 * MIB;
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(Fault::new(
            Op::UploadPart(3),
            StatusCode::FORBIDDEN,
            &s3_error("AccessDenied", "Access Denied"),
        ));
    let resp = transfer(&mock, scaled_config())
        .handle(&Method::POST, &invocation(size))
        .await;

    // The invocation itself was valid, so the status stays 200.
    assert_eq!(resp.status(), StatusCode::OK);

    let uploads = mock.open_uploads();
    assert_eq!(uploads.len(), 1);
    let body: Value = serde_json::from_str(resp.body()).expect("body must be json");
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "upload part 3 failed: 403 Forbidden AccessDenied: Access Denied (step: upload part 3)",
            "incompleteUpload": {
                "key": uploads[0].key,
                "uploadId": uploads[0].upload_id,
                "partsUploaded": 2
            }
        })
    );
}

#[tokio::test]
async fn test_handle_rejects_before_any_request() {
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, 1024);
    let transfer = transfer(&mock, scaled_config());

    let resp = transfer.handle(&Method::PUT, &invocation(1024)).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = transfer
        .handle(&Method::POST, br#"{"sourceFileId":"abc","fileSize":"large"}"#)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(mock.requests().is_empty());
}

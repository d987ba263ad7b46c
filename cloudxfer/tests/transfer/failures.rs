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

use crate::mock::{self, drive_error, s3_error, Fault, MockCloud, Op};
use crate::{request, scaled_config, transfer, FILE_ID, KIB, MIB, TOKEN};
use cloudxfer::{TransferConfig, TransferRequest};
use http::StatusCode;
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test_case(512 * KIB; "single upload")]
#[test_case(3 * MIB; "multipart upload")]
#[tokio::test]
async fn test_source_forbidden(size: u64) {
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(Fault::new(
            Op::DriveGet,
            StatusCode::FORBIDDEN,
            &drive_error(403, "The user does not have sufficient permissions for this file."),
        ));
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", size))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some(format!(
            "Google Drive API error: 403 Forbidden The user does not have sufficient permissions for this file. (file_id: {FILE_ID})"
        )
        .as_str())
    );
    assert_eq!(result.incomplete_upload, None);
    assert!(mock.destination_requests().is_empty());
}

#[tokio::test]
async fn test_source_rejects_token() {
    let mock = MockCloud::new().with_drive_file(FILE_ID, "another-token", 1024);
    let result = transfer(&mock, mock::config())
        .transfer(&request("notes.txt", 1024))
        .await;

    assert!(!result.success);
    let error = result.error.expect("error must be set");
    assert!(error.starts_with("Google Drive API error: 401"), "{error}");
    assert!(mock.destination_requests().is_empty());
}

#[tokio::test]
async fn test_missing_fields_make_no_requests() {
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, 1024);
    let req = TransferRequest {
        destination_secret: String::new(),
        destination_bucket: "  ".to_string(),
        ..request("notes.txt", 1024)
    };
    let result = transfer(&mock, mock::config()).transfer(&req).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Missing required fields: destinationBucket, destinationSecret")
    );
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_put_object_failure() {
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, 64 * KIB)
        .with_fault(Fault::new(
            Op::PutObject,
            StatusCode::INTERNAL_SERVER_ERROR,
            &s3_error("InternalError", "We encountered an internal error."),
        ));
    let result = transfer(&mock, mock::config())
        .transfer(&request("notes.txt", 64 * KIB))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("put object failed: 500 Internal Server Error InternalError: We encountered an internal error. (step: put object)")
    );
    // Single uploads stream the source, so they are never retried.
    assert_eq!(mock.count(Op::PutObject), 1);
    assert_eq!(result.incomplete_upload, None);
    assert_eq!(mock.object_count(), 0);
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, 64 * KIB);
    let req = TransferRequest {
        destination_secret: "not-the-secret".to_string(),
        ..request("notes.txt", 64 * KIB)
    };
    let result = transfer(&mock, mock::config()).transfer(&req).await;

    assert!(!result.success);
    let error = result.error.expect("error must be set");
    assert!(error.contains("403 Forbidden SignatureDoesNotMatch"), "{error}");
    assert_eq!(mock.object_count(), 0);
}

#[tokio::test]
async fn test_malformed_initiate_response() {
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, 3 * MIB)
        .with_fault(Fault::new(
            Op::Initiate,
            StatusCode::OK,
            "<html><body>gateway</body></html>",
        ));
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", 3 * MIB))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("malformed initiate response (step: initiate multipart upload)")
    );
    assert_eq!(result.incomplete_upload, None);
    assert_eq!(mock.count(Op::UploadPart(1)), 0);
}

#[tokio::test]
async fn test_missing_etag() {
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, 3 * MIB)
        .with_fault(Fault::new(Op::UploadPart(1), StatusCode::OK, ""));
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", 3 * MIB))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("missing ETag in upload part response (step: upload part 1)")
    );
    assert_eq!(
        result.incomplete_upload.map(|v| v.parts_uploaded),
        Some(0)
    );
    assert_eq!(mock.count(Op::UploadPart(1)), 1);
    assert_eq!(mock.count(Op::Complete), 0);
}

#[tokio::test]
async fn test_complete_error_with_ok_status() {
    let size = MIB + 256 * KIB;
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(Fault::new(
            Op::Complete,
            StatusCode::OK,
            &s3_error("InternalError", "We encountered an internal error."),
        ));
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", size))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("complete multipart upload failed: 200 OK InternalError: We encountered an internal error. (step: complete multipart upload)")
    );
    assert_eq!(
        result.incomplete_upload.map(|v| v.parts_uploaded),
        Some(3)
    );
    assert_eq!(mock.object_count(), 0);
    assert_eq!(mock.open_uploads().len(), 1);
}

#[tokio::test]
async fn test_unreachable_destination() {
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, 1024);
    let req = TransferRequest {
        destination_account_id: "unknown".to_string(),
        ..request("notes.txt", 1024)
    };
    let result = transfer(&mock, mock::config()).transfer(&req).await;

    assert!(!result.success);
    let error = result.error.expect("error must be set");
    assert!(error.starts_with("put object failed: dns error"), "{error}");
}

#[test_case(mock::config().with_part_size(0), "part_size must be greater than zero"; "zero part size")]
#[test_case(mock::config().with_max_part_attempts(0), "max_part_attempts must be greater than zero"; "zero attempts")]
#[test_case(
    scaled_config().with_part_size((2 * MIB) as usize),
    "part_size must not exceed multipart_threshold (part_size: 2097152, multipart_threshold: 1048576)";
    "part larger than threshold"
)]
#[tokio::test]
async fn test_invalid_config_makes_no_requests(config: TransferConfig, expected: &str) {
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, 3 * MIB);
    let result = transfer(&mock, config)
        .transfer(&request("video.mp4", 3 * MIB))
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(expected));
    assert!(mock.requests().is_empty());
    assert_eq!(mock.object_count(), 0);
}

#[tokio::test]
async fn test_dot_segments_in_file_name_make_no_requests() {
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, 1024);
    let result = transfer(&mock, mock::config())
        .transfer(&request("a/../b.txt", 1024))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("fileName must not contain '.' or '..' path segments (file_name: a/../b.txt)")
    );
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_source_breaks_during_single_upload() {
    let mock = MockCloud::new().with_broken_drive_file(FILE_ID, TOKEN, 2 * MIB, 700 * KIB);
    let result = transfer(&mock, mock::config())
        .transfer(&request("notes.txt", 2 * MIB))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("failed to read file content from Google Drive: connection reset by peer (step: put object)")
    );
    assert_eq!(mock.object_count(), 0);
}

#[tokio::test]
async fn test_source_breaks_during_multipart_upload() {
    let mock = MockCloud::new().with_broken_drive_file(FILE_ID, TOKEN, 3 * MIB, 700 * KIB);
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", 3 * MIB))
        .await;

    assert!(!result.success);
    let error = result.error.expect("error must be set");
    assert!(
        error.starts_with("failed to read file content from Google Drive: connection reset by peer"),
        "{error}"
    );
    assert_eq!(
        result.incomplete_upload.map(|v| v.parts_uploaded),
        Some(1)
    );
    assert_eq!(mock.count(Op::UploadPart(2)), 0);
    assert_eq!(mock.count(Op::Complete), 0);
}

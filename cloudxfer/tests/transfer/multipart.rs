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
use crate::{request, scaled_config, transfer, BUCKET, FILE_ID, KIB, MIB, TOKEN};
use cloudxfer::multipart::MultipartUpload;
use cloudxfer::{
    Destination, IncompleteUpload, ObjectKey, PartData, RetryPolicy, TransferMethod,
};
use cloudxfer_core::Context;
use http::StatusCode;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_multipart_upload() {
    let size = 120 * MIB;
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, size);
    let result = transfer(&mock, mock::config())
        .transfer(&request("video.mp4", size))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.method, Some(TransferMethod::MultipartUpload));
    assert_eq!(result.parts, Some(3));
    assert_eq!(result.total_bytes, Some(125_829_120));
    assert_eq!(result.incomplete_upload, None);

    let object = mock
        .object(BUCKET, &result.key.expect("key must be set"))
        .expect("object must be stored");
    assert_eq!(object.parts, Some(vec![50 * MIB, 50 * MIB, 20 * MIB]));
    assert_eq!(object.len, size);
    assert_eq!(object.sha256, mock::pattern_digest(size));
    assert_eq!(object.content_type.as_deref(), Some("video/mp4"));
    assert!(mock.open_uploads().is_empty());

    let requests = mock.destination_requests();
    let part_lens = requests
        .iter()
        .filter(|r| matches!(r.op, Op::UploadPart(_)))
        .map(|r| r.body_len)
        .collect::<Vec<_>>();
    assert_eq!(part_lens, vec![50 * MIB, 50 * MIB, 20 * MIB]);

    let ops = requests.into_iter().map(|r| r.op).collect::<Vec<_>>();
    assert_eq!(
        ops,
        vec![
            Op::Initiate,
            Op::UploadPart(1),
            Op::UploadPart(2),
            Op::UploadPart(3),
            Op::Complete
        ]
    );
}

#[tokio::test]
async fn test_exact_multiple_of_part_size() {
    let size = 2 * MIB;
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, size);
    let result = transfer(&mock, scaled_config())
        .transfer(&request("even.bin", size))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.parts, Some(4));
    let object = mock
        .object(BUCKET, &result.key.expect("key must be set"))
        .expect("object must be stored");
    assert_eq!(object.parts, Some(vec![512 * KIB; 4]));
}

#[tokio::test]
async fn test_transient_part_failure_is_retried() {
    let size = MIB + 256 * KIB;
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(
            Fault::new(
                Op::UploadPart(2),
                StatusCode::SERVICE_UNAVAILABLE,
                &s3_error("SlowDown", "Please reduce your request rate."),
            )
            .times(1),
        );
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", size))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.parts, Some(3));
    assert_eq!(mock.count(Op::UploadPart(2)), 2);

    let object = mock
        .object(BUCKET, &result.key.expect("key must be set"))
        .expect("object must be stored");
    assert_eq!(object.sha256, mock::pattern_digest(size));
}

#[tokio::test]
async fn test_part_failure_leaves_session_open() {
    let size = MIB + 256 * KIB;
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(Fault::new(
            Op::UploadPart(2),
            StatusCode::INTERNAL_SERVER_ERROR,
            &s3_error("InternalError", "We encountered an internal error."),
        ));
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", size))
        .await;

    assert!(!result.success);
    assert_eq!(result.key, None);
    let error = result.error.expect("error must be set");
    assert!(error.starts_with("upload part 2 failed: 500"), "{error}");
    assert!(error.contains("InternalError"), "{error}");

    // Three attempts in total, then the transfer gives up.
    assert_eq!(mock.count(Op::UploadPart(2)), 3);
    assert_eq!(mock.count(Op::UploadPart(3)), 0);
    assert_eq!(mock.count(Op::Complete), 0);
    assert_eq!(mock.count(Op::Abort), 0);

    let uploads = mock.open_uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].parts.keys().copied().collect::<Vec<_>>(), vec![1]);
    assert_eq!(
        result.incomplete_upload,
        Some(IncompleteUpload {
            key: uploads[0].key.clone(),
            upload_id: uploads[0].upload_id.clone(),
            parts_uploaded: 1,
        })
    );
}

#[tokio::test]
async fn test_non_retryable_part_failure() {
    let size = MIB + 256 * KIB;
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(Fault::new(
            Op::UploadPart(1),
            StatusCode::FORBIDDEN,
            &s3_error("AccessDenied", "Access Denied"),
        ));
    let result = transfer(&mock, scaled_config())
        .transfer(&request("video.mp4", size))
        .await;

    assert!(!result.success);
    let error = result.error.expect("error must be set");
    assert!(error.contains("AccessDenied"), "{error}");
    assert_eq!(mock.count(Op::UploadPart(1)), 1);
    assert_eq!(
        result.incomplete_upload.map(|v| v.parts_uploaded),
        Some(0)
    );
}

#[tokio::test]
async fn test_retry_attempts_are_configurable() {
    let size = MIB + 256 * KIB;
    let mock = MockCloud::new()
        .with_drive_file(FILE_ID, TOKEN, size)
        .with_fault(Fault::new(
            Op::UploadPart(1),
            StatusCode::BAD_GATEWAY,
            "",
        ));
    let result = transfer(&mock, scaled_config().with_max_part_attempts(1))
        .transfer(&request("video.mp4", size))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("upload part 1 failed: 502 Bad Gateway (step: upload part 1)")
    );
    assert_eq!(mock.count(Op::UploadPart(1)), 1);
}

#[tokio::test]
async fn test_size_mismatch_uploads_actual_bytes() {
    let size = MIB + 100;
    let mock = MockCloud::new().with_drive_file(FILE_ID, TOKEN, size);
    let result = transfer(&mock, scaled_config())
        .transfer(&request("drifted.bin", 4 * MIB))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.method, Some(TransferMethod::MultipartUpload));
    assert_eq!(result.total_bytes, Some(size));
    assert_eq!(result.parts, Some(3));
}

#[tokio::test]
async fn test_abort_removes_session() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mock = MockCloud::new();
    let ctx = Context::new().with_http_send(mock.clone());
    let dest = Destination::new(ctx, &mock::config(), &request("video.mp4", 3 * MIB));

    let mut upload =
        MultipartUpload::initiate(&dest, ObjectKey::generate("video.mp4"), "video/mp4").await?;
    upload
        .upload_part(
            &PartData {
                number: 1,
                data: mock::pattern(512 * KIB).into(),
            },
            RetryPolicy::default(),
        )
        .await?;
    assert_eq!(mock.open_uploads().len(), 1);
    assert_eq!(upload.parts().len(), 1);

    upload.abort().await?;
    assert!(mock.open_uploads().is_empty());
    assert_eq!(mock.object_count(), 0);

    // The session is gone, so aborting again reports it.
    let err = upload.abort().await.expect_err("second abort must fail");
    assert!(err.to_string().contains("NoSuchUpload"), "{err}");
    Ok(())
}

#[tokio::test]
async fn test_parts_must_arrive_in_order() -> anyhow::Result<()> {
    let mock = MockCloud::new();
    let ctx = Context::new().with_http_send(mock.clone());
    let dest = Destination::new(ctx, &mock::config(), &request("video.mp4", 3 * MIB));

    let mut upload =
        MultipartUpload::initiate(&dest, ObjectKey::generate("video.mp4"), "video/mp4").await?;
    let err = upload
        .upload_part(
            &PartData {
                number: 2,
                data: mock::pattern(16).into(),
            },
            RetryPolicy::default(),
        )
        .await
        .expect_err("part 2 before part 1 must fail");

    assert_eq!(
        err.to_string(),
        "part 2 uploaded out of order, expected part 1"
    );
    assert_eq!(mock.count(Op::UploadPart(2)), 0);
    Ok(())
}

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

//! Transfers against real Google Drive and S3 compatible endpoints.
//!
//! Set `CLOUDXFER_LIVE_TEST=on` together with the variables read below, or
//! put them in a `.env` file.

#![cfg(feature = "default-context")]

use std::env;

use anyhow::Result;
use cloudxfer::{TransferConfig, TransferMethod, TransferRequest};
use log::warn;

fn init_live_test() -> Option<TransferRequest> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("CLOUDXFER_LIVE_TEST").ok().as_deref() != Some("on") {
        warn!("CLOUDXFER_LIVE_TEST is not set, skipped");
        return None;
    }

    let var = |key: &str| env::var(key).unwrap_or_else(|_| panic!("{key} must be set"));
    Some(TransferRequest {
        source_file_id: var("CLOUDXFER_LIVE_DRIVE_FILE_ID"),
        source_access_token: var("CLOUDXFER_LIVE_DRIVE_ACCESS_TOKEN"),
        file_name: var("CLOUDXFER_LIVE_FILE_NAME"),
        file_size: var("CLOUDXFER_LIVE_FILE_SIZE")
            .parse()
            .expect("CLOUDXFER_LIVE_FILE_SIZE must be a number"),
        destination_bucket: var("CLOUDXFER_LIVE_BUCKET"),
        destination_account_id: var("CLOUDXFER_LIVE_ACCOUNT_ID"),
        destination_key_id: var("CLOUDXFER_LIVE_KEY_ID"),
        destination_secret: var("CLOUDXFER_LIVE_SECRET"),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_live_transfer() -> Result<()> {
    let Some(req) = init_live_test() else {
        return Ok(());
    };

    let ctx = cloudxfer::default_context();
    let config = TransferConfig::from_env(&ctx)?;
    let expected = TransferMethod::select(req.file_size, config.multipart_threshold);

    let result = cloudxfer::Transfer::new(ctx, config).transfer(&req).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.method, Some(expected));
    assert_eq!(result.total_bytes, Some(req.file_size));
    Ok(())
}

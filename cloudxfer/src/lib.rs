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

//! Stream files from Google Drive into S3 compatible object stores.
//!
//! A transfer opens the Drive file as a stream and writes it to the bucket
//! with requests signed by this workspace, never holding the whole file in
//! memory. Files up to the multipart threshold (100 MiB by default) go through
//! a single `PUT`, larger ones through a multipart upload.
//!
//! ## Example
//!
//! ```no_run
//! use cloudxfer::{default_context, Transfer, TransferConfig, TransferRequest};
//!
//! # async fn example() -> cloudxfer_core::Result<()> {
//! let ctx = default_context();
//! let transfer = Transfer::new(ctx.clone(), TransferConfig::from_env(&ctx)?);
//!
//! let result = transfer
//!     .transfer(&TransferRequest {
//!         source_file_id: "1AbCdEf".to_string(),
//!         source_access_token: "ya29.token".to_string(),
//!         file_name: "report.pdf".to_string(),
//!         file_size: 10 * 1024 * 1024,
//!         destination_bucket: "uploads".to_string(),
//!         destination_account_id: "account".to_string(),
//!         destination_key_id: "key-id".to_string(),
//!         destination_secret: "secret".to_string(),
//!         ..Default::default()
//!     })
//!     .await;
//! assert!(result.success, "{:?}", result.error);
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::*;
mod request;
pub use request::TransferRequest;
mod object_key;
pub use object_key::ObjectKey;
mod result;
pub use result::{IncompleteUpload, TransferFailure, TransferMethod, TransferResult};
mod destination;
pub use destination::Destination;
mod part;
pub use part::{PartBuffer, PartData, PartReader};
pub mod multipart;
pub use multipart::{CompletedPart, MultipartUpload, RetryPolicy};
pub mod single;
mod transfer;
pub use transfer::Transfer;
mod handler;

#[cfg(feature = "default-context")]
use cloudxfer_core::{Context, OsEnv};

/// Create a context sending requests with reqwest and reading the OS environment.
#[cfg(feature = "default-context")]
pub fn default_context() -> Context {
    Context::new()
        .with_http_send(cloudxfer_http_send_reqwest::ReqwestHttpSend::default())
        .with_env(OsEnv)
}

/// Create a transfer on the default context, configured from the environment.
#[cfg(feature = "default-context")]
pub fn default_transfer() -> cloudxfer_core::Result<Transfer> {
    let ctx = default_context();
    let config = TransferConfig::from_env(&ctx)?;
    Ok(Transfer::new(ctx, config))
}

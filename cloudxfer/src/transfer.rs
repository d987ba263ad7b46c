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

use crate::multipart::{MultipartUpload, RetryPolicy};
use crate::single::upload_single;
use crate::{
    Destination, ObjectKey, PartReader, TransferConfig, TransferFailure, TransferMethod,
    TransferRequest, TransferResult,
};
use cloudxfer_core::{Context, Result};
use cloudxfer_google_drive::DriveSource;
use log::{info, warn};

/// Transfer moves files from Google Drive into an S3 compatible bucket.
#[derive(Debug, Clone)]
pub struct Transfer {
    ctx: Context,
    config: TransferConfig,
    source: DriveSource,
}

impl Transfer {
    /// Create a new transfer with the given context and config.
    pub fn new(ctx: Context, config: TransferConfig) -> Self {
        let source = DriveSource::new(&config.drive_endpoint);
        Self {
            ctx,
            config,
            source,
        }
    }

    /// Config used by this transfer.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Run one transfer to completion or failure.
    ///
    /// Failures never escape as errors: they are reported through a result
    /// with `success` unset. The config and the request are both checked
    /// before any network call.
    pub async fn transfer(&self, req: &TransferRequest) -> TransferResult {
        if let Err(err) = self.config.validate() {
            warn!("refusing transfer with invalid config: {err}");
            return TransferResult::failure(err);
        }
        if let Err(err) = req.validate() {
            warn!("rejected transfer request: {err}");
            return TransferResult::failure(err);
        }

        let method = TransferMethod::select(req.file_size, self.config.multipart_threshold);
        info!(
            "transferring {} ({} bytes) from drive file {} to bucket {} using {method}",
            req.file_name, req.file_size, req.source_file_id, req.destination_bucket
        );

        let dest = Destination::new(self.ctx.clone(), &self.config, req);
        let result: std::result::Result<TransferResult, TransferFailure> = match method {
            TransferMethod::SingleUpload => self.single(&dest, req).await.map_err(Into::into),
            TransferMethod::MultipartUpload => self.multipart(&dest, req).await,
        };

        match result {
            Ok(result) => {
                info!(
                    "transferred {} to {}",
                    req.file_name,
                    result.key.as_deref().unwrap_or_default()
                );
                result
            }
            Err(failure) => {
                warn!("transfer of {} failed: {}", req.file_name, failure.error);
                if let Some(upload) = &failure.incomplete_upload {
                    warn!(
                        "multipart upload {} for {} left incomplete with {} parts",
                        upload.upload_id, upload.key, upload.parts_uploaded
                    );
                }
                failure.into()
            }
        }
    }

    async fn single(&self, dest: &Destination, req: &TransferRequest) -> Result<TransferResult> {
        let key = ObjectKey::generate(&req.file_name);
        let source = self
            .source
            .open(&self.ctx, &req.source_file_id, &req.source_access_token)
            .await?;

        let total_bytes = upload_single(dest, &key, source, &req.mime_type, req.file_size).await?;

        Ok(TransferResult::single_upload(
            &req.file_name,
            key.as_str(),
            dest.object_url(&key),
            total_bytes,
        ))
    }

    async fn multipart(
        &self,
        dest: &Destination,
        req: &TransferRequest,
    ) -> std::result::Result<TransferResult, TransferFailure> {
        let key = ObjectKey::generate(&req.file_name);
        let source = self
            .source
            .open(&self.ctx, &req.source_file_id, &req.source_access_token)
            .await?;

        let mut upload = MultipartUpload::initiate(dest, key, &req.mime_type).await?;
        let policy = RetryPolicy {
            max_attempts: self.config.max_part_attempts,
            backoff: self.config.part_retry_backoff,
        };

        let mut reader = PartReader::new(source, self.config.part_size);
        let mut total_bytes = 0u64;
        let uploaded: Result<u32> = async {
            while let Some(part) = reader.next_part().await? {
                upload.upload_part(&part, policy).await?;
                total_bytes += part.len() as u64;
            }
            upload.complete().await
        }
        .await;

        let parts = uploaded.map_err(|error| TransferFailure {
            error,
            incomplete_upload: Some(upload.incomplete()),
        })?;

        if total_bytes != req.file_size {
            warn!(
                "uploaded {total_bytes} bytes for {} but file size is {}",
                req.file_name, req.file_size
            );
        }

        let key = upload.key();
        Ok(TransferResult::multipart_upload(
            &req.file_name,
            key.as_str(),
            dest.object_url(key),
            parts,
            total_bytes,
        ))
    }
}

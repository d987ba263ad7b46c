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

use bytes::{Bytes, BytesMut};
use cloudxfer_core::Result;
use cloudxfer_google_drive::SourceStream;

/// One part of a multipart upload, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartData {
    /// Part number, 1-based and contiguous.
    pub number: u32,
    /// Content of the part.
    pub data: Bytes,
}

impl PartData {
    /// Size of the part in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the part carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// PartBuffer cuts a sequence of chunks into parts of a fixed size.
///
/// Chunks are pushed as they arrive. Every full part is handed out by
/// `next_full`, the remainder by `finish` once the input is exhausted.
#[derive(Debug)]
pub struct PartBuffer {
    part_size: usize,
    buf: BytesMut,
    next_number: u32,
}

impl PartBuffer {
    /// Create a buffer cutting parts of `part_size` bytes.
    pub fn new(part_size: usize) -> Self {
        Self {
            part_size,
            buf: BytesMut::new(),
            next_number: 1,
        }
    }

    /// Append a chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes held but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Parts handed out so far.
    pub fn parts_emitted(&self) -> u32 {
        self.next_number - 1
    }

    /// Take the next full part, if enough bytes are buffered.
    pub fn next_full(&mut self) -> Option<PartData> {
        if self.part_size == 0 || self.buf.len() < self.part_size {
            return None;
        }
        Some(self.emit(self.part_size))
    }

    /// Take whatever is left as the final part.
    ///
    /// Returns `None` when nothing is buffered, so an empty input never
    /// produces a part.
    pub fn finish(&mut self) -> Option<PartData> {
        if self.buf.is_empty() {
            return None;
        }
        Some(self.emit(self.buf.len()))
    }

    fn emit(&mut self, size: usize) -> PartData {
        let data = self.buf.split_to(size).freeze();
        let number = self.next_number;
        self.next_number += 1;
        PartData { number, data }
    }
}

/// PartReader pulls parts out of a source stream.
///
/// `next_part` yields full parts, then the non-empty remainder, then `None`
/// for every further call.
#[derive(Debug)]
pub struct PartReader {
    source: SourceStream,
    buffer: PartBuffer,
    exhausted: bool,
}

impl PartReader {
    /// Create a reader over the source.
    pub fn new(source: SourceStream, part_size: usize) -> Self {
        Self {
            source,
            buffer: PartBuffer::new(part_size),
            exhausted: false,
        }
    }

    /// Bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.source.bytes_read()
    }

    /// Read the next part.
    pub async fn next_part(&mut self) -> Result<Option<PartData>> {
        loop {
            if let Some(part) = self.buffer.next_full() {
                return Ok(Some(part));
            }
            if self.exhausted {
                return Ok(self.buffer.finish());
            }

            match self.source.next_chunk().await? {
                Some(chunk) => self.buffer.push(&chunk),
                None => self.exhausted = true,
            }
        }
    }
}

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

use crate::Result;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::fmt::{Debug, Formatter};

/// A stream of byte chunks, used for bodies that must never be fully buffered.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Body of a request or response sent through [`crate::HttpSend`].
///
/// Small control requests carry buffered bytes, while file content is passed
/// around as a stream so it can be piped from the source to the destination.
pub struct Body(Inner);

enum Inner {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Body {
    /// Create an empty body.
    pub fn empty() -> Self {
        Body(Inner::Bytes(Bytes::new()))
    }

    /// Create a body from a byte stream.
    pub fn from_stream(stream: ByteStream) -> Self {
        Body(Inner::Stream(stream))
    }

    /// Check if this body is backed by a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self.0, Inner::Stream(_))
    }

    /// Returns the buffered bytes if this body is not a stream.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.0 {
            Inner::Bytes(bs) => Some(bs),
            Inner::Stream(_) => None,
        }
    }

    /// Convert this body into a byte stream.
    ///
    /// Buffered bodies become a stream with a single chunk.
    pub fn into_stream(self) -> ByteStream {
        match self.0 {
            Inner::Bytes(bs) if bs.is_empty() => stream::empty().boxed(),
            Inner::Bytes(bs) => stream::once(async move { Ok(bs) }).boxed(),
            Inner::Stream(s) => s,
        }
    }

    /// Read the whole body into memory.
    ///
    /// Only use this for small control responses, never for file content.
    pub async fn collect(self) -> Result<Bytes> {
        match self.0 {
            Inner::Bytes(bs) => Ok(bs),
            Inner::Stream(mut s) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = s.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Read the whole body into a lossy utf-8 string.
    pub async fn collect_string(self) -> Result<String> {
        let bs = self.collect().await?;
        Ok(String::from_utf8_lossy(&bs).to_string())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Inner::Bytes(bs) => f.debug_tuple("Body").field(&bs.len()).finish(),
            Inner::Stream(_) => f.write_str("Body(stream)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body(Inner::Bytes(value))
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body(Inner::Bytes(value.into()))
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body(Inner::Bytes(value.into()))
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Body(Inner::Bytes(Bytes::from_static(value.as_bytes())))
    }
}

impl From<ByteStream> for Body {
    fn from(value: ByteStream) -> Self {
        Body::from_stream(value)
    }
}

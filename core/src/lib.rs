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

//! Core components for streaming transfers with self-signed requests.
//!
//! This crate provides the foundational types and traits shared by the
//! cloudxfer workspace: the error type, the streaming body, the context that
//! carries the HTTP client and environment, and the signing abstractions.
//!
//! ## Overview
//!
//! - **Context**: holds implementations for HTTP sending and environment access
//! - **Body**: a request/response body that is either buffered bytes or a byte stream
//! - **Traits**: credential loading (`ProvideCredential`) and request signing (`SignRequest`)
//! - **Signer**: pairs a credential provider with a request signer and caches the credential
//!
//! ## Example
//!
//! ```no_run
//! use cloudxfer_core::{Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential};
//! use async_trait::async_trait;
//! use http::request::Parts;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     token: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.token.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! #[async_trait]
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential { token: "token".to_string() }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyBuilder;
//!
//! #[async_trait]
//! impl SignRequest for MyBuilder {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut Parts,
//!         cred: Option<&Self::Credential>,
//!     ) -> Result<()> {
//!         if let Some(cred) = cred {
//!             req.headers.insert(
//!                 http::header::AUTHORIZATION,
//!                 format!("Bearer {}", cred.token).parse()?,
//!             );
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyLoader, MyBuilder);
//!
//! let mut parts = http::Request::builder()
//!     .method("GET")
//!     .uri("https://example.com")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! signer.sign(&mut parts).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod body;
pub use body::{Body, ByteStream};
mod context;
pub use context::{Context, Env, HttpSend, OsEnv, StaticEnv};
mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;

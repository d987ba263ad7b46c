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

use cloudxfer_core::time::{format_date_path, now, DateTime};
use rand::Rng;
use std::fmt::{Display, Formatter};

const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 16;

/// ObjectKey names the destination object: `YYYY/MM/DD/{random-id}_{fileName}`.
///
/// The date is the UTC date of generation. The random id keeps keys unique
/// even for identical file names uploaded on the same day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Generate a fresh key for the file at the current time.
    pub fn generate(file_name: &str) -> Self {
        Self::generate_at(now(), file_name)
    }

    /// Generate a fresh key for the file at the given time.
    pub fn generate_at(time: DateTime, file_name: &str) -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..ID_LEN)
            .map(|_| char::from(ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())]))
            .collect();

        Self(format!("{}/{id}_{file_name}", format_date_path(time)))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ObjectKey> for String {
    fn from(value: ObjectKey) -> Self {
        value.0
    }
}

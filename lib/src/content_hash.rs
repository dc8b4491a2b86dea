// Copyright 2025 The SVCS Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content hashing for the object database.

use sha2::Digest as _;
use sha2::Sha256;

use crate::object_id::ObjectId;

/// Computes the SHA-256 digest of `data` as an [`ObjectId`].
///
/// This is the single identity primitive of the system: every stored
/// object is named by the digest of its framed byte representation.
pub fn hash_bytes(data: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(data);
    ObjectId::new(hasher.finalize().to_vec())
}

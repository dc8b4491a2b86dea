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

//! Notification events emitted by the storage and staging layers.
//!
//! The sink is an optional capability handed explicitly to the store and
//! the index. It is fire-and-forget: delivery must never influence
//! control flow, and a core operation behaves identically with or
//! without a sink attached.

use crate::object::ObjectType;
use crate::object_id::ObjectId;
use crate::repo_path::RepoPathBuf;

/// One notification record.
///
/// Identities are carried in full; observers typically render the
/// abbreviated `{:.8}` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// An object was serialized, compressed, and persisted.
    ObjectWritten {
        /// Kind of the object written.
        object_type: ObjectType,
        /// Identity of the object written.
        id: ObjectId,
        /// Uncompressed payload size in bytes.
        payload_len: usize,
    },
    /// An object was loaded and passed integrity verification.
    ObjectRead {
        /// Kind of the object read.
        object_type: ObjectType,
        /// Identity of the object read.
        id: ObjectId,
    },
    /// A working-copy file was staged into the index.
    FileStaged {
        /// Repository-relative path of the staged file.
        path: RepoPathBuf,
        /// Identity of the blob recorded for the file.
        id: ObjectId,
    },
    /// An operation failed; `details` names the abbreviated identity or
    /// the path involved.
    Error {
        /// Human-oriented description of the failure.
        details: String,
    },
}

/// Capability for receiving [`Event`]s.
pub trait EventSink: Send + Sync {
    /// Delivers one event. Implementations must not fail and must not
    /// call back into the core.
    fn notify(&self, event: &Event);
}

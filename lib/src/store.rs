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

#![expect(missing_docs)]

use std::fmt::Debug;
use std::fmt::Formatter;
use std::fs;
use std::io;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::compression;
use crate::content_hash::hash_bytes;
use crate::event::Event;
use crate::event::EventSink;
use crate::file_util::create_or_reuse_dir;
use crate::file_util::persist_content_addressed_temp_file;
use crate::object;
use crate::object::Object;
use crate::object::ObjectParseError;
use crate::object::ObjectType;
use crate::object_id::ObjectId;

/// Name of the control directory holding the object database and index,
/// conventionally located at the root of the working copy.
pub const CONTROL_DIR_NAME: &str = ".svcs";

const OBJECTS_DIR: &str = "objects";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to initialize object storage at {path}")]
    Init { path: PathBuf, source: io::Error },
    #[error("Object {hash} not found")]
    NotFound { hash: String, source: io::Error },
    #[error("Error when reading object {hash}")]
    ReadObject { hash: String, source: io::Error },
    #[error("Could not write object {hash} of type {object_type}")]
    WriteObject {
        hash: String,
        object_type: &'static str,
        source: io::Error,
    },
    #[error("Corrupt deflate stream for object {hash}")]
    Codec { hash: String, source: io::Error },
    #[error("Object {hash} is malformed: {details}")]
    Malformed { hash: String, details: String },
    #[error("Failed to parse object {hash}")]
    Parse {
        hash: String,
        source: ObjectParseError,
    },
    #[error("Object {hash} failed integrity verification: {details}")]
    Integrity { hash: String, details: String },
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

fn map_not_found_err(err: io::Error, id: &ObjectId) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound {
            hash: id.hex(),
            source: err,
        }
    } else {
        StoreError::ReadObject {
            hash: id.hex(),
            source: err,
        }
    }
}

/// Content-addressed object database rooted at `<control>/objects`.
///
/// Each object lives in its own file, keyed by identity: the first two
/// hex digits name a shard directory, the remaining sixty-two the file.
/// The file content is the raw-deflate stream of the framed object bytes,
/// so the identity can be re-derived and verified from the file alone.
pub struct ObjectStore {
    objects_dir: PathBuf,
    sink: Option<Arc<dyn EventSink>>,
}

impl Debug for ObjectStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("ObjectStore")
            .field("objects_dir", &self.objects_dir)
            .finish_non_exhaustive()
    }
}

impl ObjectStore {
    /// Creates the on-disk layout under `control_dir` and returns a store
    /// attached to it. Reusing an existing layout is fine.
    pub fn init(control_dir: &Path) -> Result<Self, StoreError> {
        let store = Self::load(control_dir);
        fs::create_dir_all(&store.objects_dir).map_err(|err| StoreError::Init {
            path: store.objects_dir.clone(),
            source: err,
        })?;
        Ok(store)
    }

    /// Attaches to an existing store without touching the filesystem.
    pub fn load(control_dir: &Path) -> Self {
        Self {
            objects_dir: control_dir.join(OBJECTS_DIR),
            sink: None,
        }
    }

    /// Attaches an event sink observing reads, writes, and failures.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, event: Event) {
        if let Some(sink) = &self.sink {
            sink.notify(&event);
        }
    }

    fn emit_error(&self, details: String) {
        self.emit(Event::Error { details });
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Persists `object`, creating its shard directory on demand.
    ///
    /// Writing an identity that already exists is not an error: the file
    /// content is a pure function of the identity, so the operation is
    /// idempotent.
    pub fn save_object(&self, object: &Object) -> Result<(), StoreError> {
        let object_type = object.object_type();
        let id = object.id();
        let payload = object.payload();
        let framed = object::frame(object_type, &payload);
        let compressed = compression::compress(&framed).map_err(|err| {
            self.emit_error(format!("compression failed for object {id:.8}"));
            StoreError::Codec {
                hash: id.hex(),
                source: err,
            }
        })?;

        let hex = id.hex();
        let shard_dir = self.objects_dir.join(&hex[..2]);
        let written = create_or_reuse_dir(&shard_dir).and_then(|()| {
            let mut temp_file = NamedTempFile::new_in(&self.objects_dir)?;
            temp_file.write_all(&compressed)?;
            persist_content_addressed_temp_file(temp_file, shard_dir.join(&hex[2..]))?;
            Ok(())
        });
        if let Err(err) = written {
            self.emit_error(format!("failed to write object {id:.8}: {err}"));
            return Err(StoreError::WriteObject {
                hash: hex,
                object_type: object_type.as_str(),
                source: err,
            });
        }

        tracing::debug!(id = %id, kind = %object_type, len = payload.len(), "wrote object");
        self.emit(Event::ObjectWritten {
            object_type,
            id: id.clone(),
            payload_len: payload.len(),
        });
        Ok(())
    }

    /// Loads and verifies the object named `id`.
    ///
    /// The framing header, the declared payload length, and the digest
    /// over the framed bytes are all checked before the payload is handed
    /// to the type parser; corruption is surfaced, never masked.
    pub fn load_object(&self, id: &ObjectId) -> Result<Object, StoreError> {
        match self.read_and_verify(id) {
            Ok(object) => {
                let object_type = object.object_type();
                tracing::debug!(id = %id, kind = %object_type, "read object");
                self.emit(Event::ObjectRead {
                    object_type,
                    id: id.clone(),
                });
                Ok(object)
            }
            Err(err) => {
                self.emit_error(format!("failed to load object {id:.8}: {err}"));
                Err(err)
            }
        }
    }

    fn read_and_verify(&self, id: &ObjectId) -> Result<Object, StoreError> {
        let path = self.object_path(id);
        let compressed = fs::read(&path).map_err(|err| map_not_found_err(err, id))?;
        let framed = compression::decompress(&compressed).map_err(|err| StoreError::Codec {
            hash: id.hex(),
            source: err,
        })?;

        let separator =
            framed
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| StoreError::Malformed {
                    hash: id.hex(),
                    details: "missing header terminator".to_string(),
                })?;
        let header =
            std::str::from_utf8(&framed[..separator]).map_err(|_| StoreError::Malformed {
                hash: id.hex(),
                details: "header is not valid UTF-8".to_string(),
            })?;
        let payload = &framed[separator + 1..];

        let bad_header = || StoreError::Malformed {
            hash: id.hex(),
            details: format!("bad header {header:?}"),
        };
        let (tag, declared_len) = header.split_once(' ').ok_or_else(bad_header)?;
        let object_type = ObjectType::from_tag(tag).ok_or_else(|| StoreError::Malformed {
            hash: id.hex(),
            details: format!("unknown object type {tag:?}"),
        })?;
        let declared_len: usize = declared_len.parse().map_err(|_| bad_header())?;
        if declared_len != payload.len() {
            return Err(StoreError::Integrity {
                hash: id.hex(),
                details: format!(
                    "header declares {declared_len} payload bytes, found {}",
                    payload.len()
                ),
            });
        }

        let actual_id = hash_bytes(&framed);
        if actual_id != *id {
            return Err(StoreError::Integrity {
                hash: id.hex(),
                details: format!("content hashes to {actual_id:.8}"),
            });
        }

        Object::from_payload(object_type, payload).map_err(|source| StoreError::Parse {
            hash: id.hex(),
            source,
        })
    }

    /// Purely a filesystem existence check: no parse, no integrity
    /// verification.
    pub fn object_exists(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }
}

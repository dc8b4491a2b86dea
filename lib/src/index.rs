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

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fs;
use std::fs::Metadata;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::event::Event;
use crate::event::EventSink;
use crate::file_util::IoResultExt as _;
use crate::file_util::PathError;
use crate::file_util::persist_temp_file;
use crate::object::Blob;
use crate::object::Object;
use crate::object_id::ObjectId;
use crate::repo_path::InvalidRepoPathError;
use crate::repo_path::RepoPath;
use crate::repo_path::RepoPathBuf;
use crate::store::ObjectStore;
use crate::store::StoreError;
use crate::tree_builder::TreeBuilder;

const INDEX_FILE: &str = "index";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(
        "Cannot stage {path}: not an existing regular file",
        path = path.as_internal_file_string()
    )]
    NotAFile { path: RepoPathBuf },
    #[error("Cannot build a tree from an empty index")]
    EmptyIndex,
    #[error(transparent)]
    InvalidPath(#[from] InvalidRepoPathError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// A staged file: the identity of its blob plus the metadata used to
/// detect drift from the working copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub blob_id: ObjectId,
    pub size: u64,
    pub mtime: i64,
}

/// The staging area: an ordered map from repository-relative paths to
/// staged entries, mirrored to a text file under the control directory.
///
/// The on-disk record is one line per entry,
/// `<blob hex> <size> <mtime seconds> <path>`; the path is everything
/// after the third space and may contain spaces itself.
pub struct Index {
    store: Arc<ObjectStore>,
    workspace_root: PathBuf,
    index_file_path: PathBuf,
    entries: BTreeMap<RepoPathBuf, IndexEntry>,
    sink: Option<Arc<dyn EventSink>>,
}

impl Debug for Index {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("Index")
            .field("index_file_path", &self.index_file_path)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Index {
    /// Loads the staging area backed by `<control_dir>/index`.
    ///
    /// A missing index file means an empty index; an unreadable one is an
    /// error. Lines that fail to parse are skipped.
    pub fn load(
        store: Arc<ObjectStore>,
        workspace_root: PathBuf,
        control_dir: &Path,
    ) -> Result<Self, IndexError> {
        let mut index = Self {
            store,
            workspace_root,
            index_file_path: control_dir.join(INDEX_FILE),
            entries: BTreeMap::new(),
            sink: None,
        };
        index.reload()?;
        Ok(index)
    }

    /// Attaches an event sink observing staging operations and failures.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, event: Event) {
        if let Some(sink) = &self.sink {
            sink.notify(&event);
        }
    }

    fn reload(&mut self) -> Result<(), IndexError> {
        self.entries.clear();
        let text = match fs::read_to_string(&self.index_file_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(PathError {
                    path: self.index_file_path.clone(),
                    source: err,
                }
                .into());
            }
        };
        for line in text.lines() {
            match parse_index_line(line) {
                Some((path, entry)) => {
                    self.entries.insert(path, entry);
                }
                None => {
                    tracing::warn!(?line, "skipping unparsable index line");
                }
            }
        }
        Ok(())
    }

    /// Persists the staging area by rewriting the index file through a
    /// temporary file, so a crash cannot leave a half-written index.
    pub fn save(&self) -> Result<(), IndexError> {
        let dir = self
            .index_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir).context(dir)?;
        let mut buf = String::new();
        for (path, entry) in &self.entries {
            buf.push_str(&format!(
                "{} {} {} {}\n",
                entry.blob_id.hex(),
                entry.size,
                entry.mtime,
                path.as_internal_file_string()
            ));
        }
        temp_file
            .write_all(buf.as_bytes())
            .context(&self.index_file_path)?;
        persist_temp_file(temp_file, &self.index_file_path).context(&self.index_file_path)?;
        Ok(())
    }

    /// Stages the working-copy file at `path`.
    ///
    /// The file's bytes are written to the object store as a blob (always,
    /// which is idempotent if the blob already exists), its size and mtime
    /// are recorded, and the index is persisted.
    pub fn stage(&mut self, path: &RepoPath) -> Result<(), IndexError> {
        let disk_path = path.to_fs_path(&self.workspace_root)?;
        let metadata = match fs::metadata(&disk_path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(self.not_a_file(path)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.not_a_file(path));
            }
            Err(err) => {
                return Err(PathError {
                    path: disk_path,
                    source: err,
                }
                .into());
            }
        };

        let data = fs::read(&disk_path).context(&disk_path)?;
        let blob = Blob::new(data);
        let blob_id = blob.id().clone();
        self.store.save_object(&Object::Blob(blob))?;

        let entry = IndexEntry {
            blob_id: blob_id.clone(),
            size: metadata.len(),
            mtime: mtime_seconds(&metadata),
        };
        self.entries.insert(path.to_owned(), entry);
        self.save()?;

        tracing::debug!(path = path.as_internal_file_string(), id = %blob_id, "staged file");
        self.emit(Event::FileStaged {
            path: path.to_owned(),
            id: blob_id,
        });
        Ok(())
    }

    fn not_a_file(&self, path: &RepoPath) -> IndexError {
        self.emit(Event::Error {
            details: format!(
                "cannot stage {}: not an existing regular file",
                path.as_internal_file_string()
            ),
        });
        IndexError::NotAFile {
            path: path.to_owned(),
        }
    }

    /// Removes `path` from the staging area and persists the change.
    /// Returns whether an entry was present.
    pub fn unstage(&mut self, path: &RepoPath) -> Result<bool, IndexError> {
        if self.entries.remove(path).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn get(&self, path: &RepoPath) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// Iterates staged entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = (&RepoPath, &IndexEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_ref(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether the working-copy file at `path` has drifted from
    /// its staged entry.
    ///
    /// An untracked-but-present file and a staged-but-deleted file both
    /// count as modified. For a tracked, present file the size is
    /// compared first; if sizes match and the recorded mtime also
    /// matches, the file is considered clean without reading it. On
    /// mtime drift the content is rehashed and compared; a read failure
    /// counts as modified.
    pub fn is_modified(&self, path: &RepoPath) -> bool {
        let entry = self.entries.get(path);
        let Ok(disk_path) = path.to_fs_path(&self.workspace_root) else {
            // The path cannot exist in the working copy.
            return entry.is_some();
        };
        let metadata = fs::metadata(&disk_path)
            .ok()
            .filter(|metadata| metadata.is_file());

        match (entry, metadata) {
            // Untracked but present.
            (None, Some(_)) => true,
            // Staged but deleted (or no longer a regular file).
            (Some(_), None) => true,
            (Some(entry), Some(metadata)) => {
                if metadata.len() != entry.size {
                    return true;
                }
                if mtime_seconds(&metadata) == entry.mtime {
                    return false;
                }
                // Same size, newer mtime: only the content can tell.
                match fs::read(&disk_path) {
                    Ok(data) => *Blob::new(data).id() != entry.blob_id,
                    Err(_) => true,
                }
            }
            (None, None) => false,
        }
    }

    /// Synthesizes the tree hierarchy for the staged snapshot and returns
    /// the root tree identity. All trees are saved to the object store as
    /// a side effect.
    pub fn build_tree(&self) -> Result<ObjectId, IndexError> {
        if self.entries.is_empty() {
            self.emit(Event::Error {
                details: "cannot build a tree from an empty index".to_string(),
            });
            return Err(IndexError::EmptyIndex);
        }
        let root = TreeBuilder::new(&self.store).write_trees(&self.entries)?;
        Ok(root)
    }
}

fn parse_index_line(line: &str) -> Option<(RepoPathBuf, IndexEntry)> {
    let mut fields = line.splitn(4, ' ');
    let blob_id = ObjectId::try_from_hex(fields.next()?)?;
    let size = fields.next()?.parse().ok()?;
    let mtime = fields.next()?.parse().ok()?;
    let path = RepoPathBuf::from_internal_string(fields.next()?).ok()?;
    if path.is_root() {
        return None;
    }
    Some((path, IndexEntry { blob_id, size, mtime }))
}

fn mtime_seconds(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .and_then(|duration| i64::try_from(duration.as_secs()).ok())
        .unwrap_or(0)
}

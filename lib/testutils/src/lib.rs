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

//! Test helpers for the svcs-lib integration tests.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use svcs_lib::event::Event;
use svcs_lib::event::EventSink;
use svcs_lib::index::Index;
use svcs_lib::object_id::ObjectId;
use svcs_lib::repo_path::RepoPath;
use svcs_lib::store::CONTROL_DIR_NAME;
use svcs_lib::store::ObjectStore;
use tempfile::TempDir;

pub fn new_temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("svcs-test-")
        .tempdir()
        .unwrap()
}

/// A repository rooted in a fresh temporary directory: a working copy
/// with an initialized `.svcs` control directory inside it.
pub struct TestRepo {
    _temp_dir: TempDir,
    pub workspace_root: PathBuf,
    pub control_dir: PathBuf,
    pub store: Arc<ObjectStore>,
}

impl TestRepo {
    pub fn init() -> Self {
        let temp_dir = new_temp_dir();
        let workspace_root = temp_dir.path().join("repo");
        let control_dir = workspace_root.join(CONTROL_DIR_NAME);
        fs::create_dir_all(&control_dir).unwrap();
        let store = Arc::new(ObjectStore::init(&control_dir).unwrap());
        Self {
            _temp_dir: temp_dir,
            workspace_root,
            control_dir,
            store,
        }
    }

    /// Loads the staging index of this repository.
    pub fn index(&self) -> Index {
        Index::load(
            self.store.clone(),
            self.workspace_root.clone(),
            &self.control_dir,
        )
        .unwrap()
    }

    /// The on-disk path of the object file for `id`.
    pub fn object_file_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.hex();
        self.control_dir
            .join("objects")
            .join(&hex[..2])
            .join(&hex[2..])
    }
}

pub fn repo_path(value: &str) -> &RepoPath {
    RepoPath::from_internal_string(value).unwrap()
}

/// Removes the file at `path` from the working copy.
pub fn remove_working_copy_file(workspace_root: &Path, path: &RepoPath) {
    fs::remove_file(path.to_fs_path(workspace_root).unwrap()).unwrap();
}

/// Writes `contents` to `path` inside the working copy, creating parent
/// directories as needed.
pub fn write_working_copy_file(workspace_root: &Path, path: &RepoPath, contents: &[u8]) {
    let disk_path = path.to_fs_path(workspace_root).unwrap();
    if let Some(parent) = disk_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&disk_path, contents).unwrap();
}

/// Event sink that records everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

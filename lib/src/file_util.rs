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

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tempfile::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Cannot access {path}")]
pub struct PathError {
    pub path: PathBuf,
    pub source: io::Error,
}

pub trait IoResultExt<T> {
    fn context(self, path: impl AsRef<Path>) -> Result<T, PathError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn context(self, path: impl AsRef<Path>) -> Result<T, PathError> {
        self.map_err(|source| PathError {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Creates a directory or does nothing if the directory already exists.
///
/// Fails if intermediate directories on the path do not already exist.
pub fn create_or_reuse_dir(dirname: &Path) -> io::Result<()> {
    match fs::create_dir(dirname) {
        Err(err) if !dirname.is_dir() => Err(err),
        _ => Ok(()),
    }
}

/// Flushes `temp_file` to disk and moves it to `new_path`, replacing any
/// file already there.
///
/// The content is synchronized before the rename, so after a crash the
/// persisted file has valid content if its directory entry survived.
pub fn persist_temp_file<P: AsRef<Path>>(
    temp_file: NamedTempFile,
    new_path: P,
) -> io::Result<File> {
    temp_file.as_file().sync_data()?;
    temp_file.persist(new_path).map_err(|err| err.error)
}

/// Variant of [`persist_temp_file()`] for content-addressed targets.
///
/// The destination name is derived from the file content, so whatever
/// already sits at `new_path` is interchangeable with the file being
/// persisted. That makes it safe to fall back to the existing file when
/// the rename is refused, which happens on Windows if the target is open
/// without FILE_SHARE_DELETE.
pub fn persist_content_addressed_temp_file<P: AsRef<Path>>(
    temp_file: NamedTempFile,
    new_path: P,
) -> io::Result<File> {
    if !cfg!(windows) {
        // rename() replaces the destination atomically; a prior
        // existence check would reintroduce a race, so don't noclobber.
        return persist_temp_file(temp_file, new_path);
    }
    temp_file.as_file().sync_data()?;
    match temp_file.persist_noclobber(&new_path) {
        Ok(file) => Ok(file),
        Err(PersistError { error, file: _ }) => File::open(new_path).or(Err(error)),
    }
}

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

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::iter::FusedIterator;
use std::ops::Deref;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use ref_cast::RefCastCustom;
use ref_cast::ref_cast_custom;
use thiserror::Error;

/// The input string cannot be a repository path or path component: it is
/// empty where a name is required, or contains an empty component, as in
/// `"/"`, `"a//b"`, or a path with a trailing slash.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Invalid repo path input {value:?}")]
pub struct InvalidNewRepoPathError {
    value: String,
}

/// A path component cannot be used as a filesystem entry name
/// (e.g. `.` or `..`).
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Invalid path component {component:?}")]
pub struct InvalidRepoPathComponentError {
    pub component: Box<str>,
}

impl InvalidRepoPathComponentError {
    fn with_path(self, path: &RepoPath) -> InvalidRepoPathError {
        InvalidRepoPathError {
            path: path.to_owned(),
            source: self,
        }
    }
}

/// A repository path contained a component that cannot be mapped to a
/// filesystem name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Invalid repository path {path:?}")]
pub struct InvalidRepoPathError {
    pub path: RepoPathBuf,
    pub source: InvalidRepoPathComponentError,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RelativePathParseError {
    #[error("Invalid component {component:?} in repo-relative path {path:?}")]
    InvalidComponent {
        component: Box<str>,
        path: Box<Path>,
    },
    #[error("Not valid UTF-8 path {path:?}")]
    InvalidUtf8 { path: Box<Path> },
}

fn is_valid_component_str(value: &str) -> bool {
    !value.is_empty() && !value.contains('/')
}

fn is_valid_path_str(value: &str) -> bool {
    value.is_empty() || value.split('/').all(is_valid_component_str)
}

/// A single file or directory name within a [`RepoPath`].
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, RefCastCustom)]
#[repr(transparent)]
pub struct RepoPathComponent {
    value: str,
}

impl RepoPathComponent {
    /// Wraps `value`, which must be nonempty and free of separators.
    pub fn new(value: &str) -> Result<&Self, InvalidNewRepoPathError> {
        if !is_valid_component_str(value) {
            return Err(InvalidNewRepoPathError {
                value: value.to_owned(),
            });
        }
        Ok(Self::wrap(value))
    }

    #[ref_cast_custom]
    const fn wrap(value: &str) -> &Self;

    /// Returns the underlying string representation.
    pub fn as_internal_str(&self) -> &str {
        &self.value
    }

    /// Checks that this component is usable as a filesystem entry name
    /// and returns it.
    ///
    /// Parsing the name back through [`Path`] rejects anything the
    /// platform would reinterpret: `.` and `..`, separators, and Windows
    /// path prefixes.
    fn fs_name(&self) -> Result<&str, InvalidRepoPathComponentError> {
        let parsed: Vec<Component<'_>> = Path::new(&self.value).components().collect();
        match parsed.as_slice() {
            // Compare the parsed name back to the input: components() can
            // normalize away a trailing ".".
            [Component::Normal(name)] if *name == &self.value => Ok(&self.value),
            _ => Err(InvalidRepoPathComponentError {
                component: self.value.into(),
            }),
        }
    }
}

impl Debug for RepoPathComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.value, f)
    }
}

/// Iterates the components of a [`RepoPath`], front to back.
#[derive(Clone, Debug)]
pub struct RepoPathComponents<'a> {
    remainder: Option<&'a str>,
}

impl<'a> Iterator for RepoPathComponents<'a> {
    type Item = &'a RepoPathComponent;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.remainder?;
        let name = match rest.split_once('/') {
            Some((name, tail)) => {
                self.remainder = Some(tail);
                name
            }
            None => {
                self.remainder = None;
                rest
            }
        };
        Some(RepoPathComponent::wrap(name))
    }
}

impl FusedIterator for RepoPathComponents<'_> {}

/// Borrowed repository-relative path.
///
/// Stored as a `/`-separated string of nonempty components; the empty
/// string denotes the repository root. Deriving on-disk keys and object
/// identities from this one normalized form keeps tree identities equal
/// across platforms with different separator conventions.
#[derive(Eq, Hash, PartialEq, RefCastCustom)]
#[repr(transparent)]
pub struct RepoPath {
    value: str,
}

/// Owned variant of [`RepoPath`].
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct RepoPathBuf {
    // Eq, Hash, and Ord must delegate to RepoPath so that maps keyed by
    // RepoPathBuf can be probed with a borrowed RepoPath.
    value: String,
}

impl RepoPath {
    pub const fn root() -> &'static Self {
        Self::wrap("")
    }

    /// Wraps a `/`-separated string. Fails on empty components, so
    /// `"/"`, `"a//b"`, and paths with a trailing slash are rejected.
    pub fn from_internal_string(value: &str) -> Result<&Self, InvalidNewRepoPathError> {
        if !is_valid_path_str(value) {
            return Err(InvalidNewRepoPathError {
                value: value.to_owned(),
            });
        }
        Ok(Self::wrap(value))
    }

    #[ref_cast_custom]
    const fn wrap(value: &str) -> &Self;

    /// The normalized `/`-separated form. Not meant for user display.
    pub fn as_internal_file_string(&self) -> &str {
        &self.value
    }

    pub fn is_root(&self) -> bool {
        self.value.is_empty()
    }

    pub fn components(&self) -> RepoPathComponents<'_> {
        RepoPathComponents {
            remainder: (!self.value.is_empty()).then_some(&self.value),
        }
    }

    /// Splits off the last component, or returns `None` for the root.
    pub fn split(&self) -> Option<(&Self, &RepoPathComponent)> {
        if self.is_root() {
            return None;
        }
        match self.value.rsplit_once('/') {
            Some((dir, name)) => Some((Self::wrap(dir), RepoPathComponent::wrap(name))),
            None => Some((Self::root(), RepoPathComponent::wrap(&self.value))),
        }
    }

    /// Returns the directory containing this path, or `None` for the
    /// root.
    pub fn parent(&self) -> Option<&Self> {
        self.split().map(|(dir, _)| dir)
    }

    /// Appends one component, producing an owned path.
    pub fn join(&self, entry: &RepoPathComponent) -> RepoPathBuf {
        let mut value = self.value.to_owned();
        if !value.is_empty() {
            value.push('/');
        }
        value.push_str(entry.as_internal_str());
        RepoPathBuf { value }
    }

    /// Resolves this path against `base` as a filesystem path, refusing
    /// any component the platform would reinterpret.
    pub fn to_fs_path(&self, base: &Path) -> Result<PathBuf, InvalidRepoPathError> {
        let mut result = base.to_path_buf();
        for component in self.components() {
            let name = component.fs_name().map_err(|err| err.with_path(self))?;
            result.push(name);
        }
        if result.as_os_str().is_empty() {
            result.push(".");
        }
        Ok(result)
    }
}

impl RepoPathBuf {
    pub const fn root() -> Self {
        Self {
            value: String::new(),
        }
    }

    /// Owned counterpart of [`RepoPath::from_internal_string`].
    pub fn from_internal_string(value: impl Into<String>) -> Result<Self, InvalidNewRepoPathError> {
        let value = value.into();
        if !is_valid_path_str(&value) {
            return Err(InvalidNewRepoPathError { value });
        }
        Ok(Self { value })
    }

    /// Builds a repository path from a relative filesystem path, which
    /// must consist of plain names only (no `.`, `..`, or prefixes). As
    /// an exception, `"."` denotes the root.
    pub fn from_relative_path(
        relative_path: impl AsRef<Path>,
    ) -> Result<Self, RelativePathParseError> {
        let relative_path = relative_path.as_ref();
        if relative_path == Path::new(".") {
            return Ok(Self::root());
        }
        let mut names = Vec::new();
        for component in relative_path.components() {
            match component {
                Component::Normal(name) => {
                    let name =
                        name.to_str()
                            .ok_or_else(|| RelativePathParseError::InvalidUtf8 {
                                path: relative_path.into(),
                            })?;
                    names.push(name);
                }
                _ => {
                    return Err(RelativePathParseError::InvalidComponent {
                        component: component.as_os_str().to_string_lossy().into(),
                        path: relative_path.into(),
                    });
                }
            }
        }
        Ok(Self {
            value: names.join("/"),
        })
    }
}

impl Debug for RepoPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.value, f)
    }
}

impl Debug for RepoPathBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.value, f)
    }
}

impl AsRef<Self> for RepoPath {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl AsRef<RepoPath> for RepoPathBuf {
    fn as_ref(&self) -> &RepoPath {
        RepoPath::wrap(&self.value)
    }
}

impl Borrow<RepoPath> for RepoPathBuf {
    fn borrow(&self) -> &RepoPath {
        self.as_ref()
    }
}

impl Deref for RepoPathBuf {
    type Target = RepoPath;

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl ToOwned for RepoPath {
    type Owned = RepoPathBuf;

    fn to_owned(&self) -> RepoPathBuf {
        RepoPathBuf {
            value: self.value.to_owned(),
        }
    }
}

impl Ord for RepoPath {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare per component: "a/b" sorts after "a" and before "a-b",
        // which plain string order would not give.
        self.components().cmp(other.components())
    }
}

impl PartialOrd for RepoPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RepoPathBuf {
    fn cmp(&self, other: &Self) -> Ordering {
        RepoPath::cmp(self, other)
    }
}

impl PartialOrd for RepoPathBuf {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

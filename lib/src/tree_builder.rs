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

//! Bottom-up synthesis of tree objects from staged entries.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::HashMap;

use itertools::Itertools as _;

use crate::index::IndexEntry;
use crate::object::Object;
use crate::object::Tree;
use crate::object::TreeEntry;
use crate::object_id::ObjectId;
use crate::repo_path::RepoPath;
use crate::repo_path::RepoPathBuf;
use crate::store::ObjectStore;
use crate::store::StoreError;

/// Builds the hierarchy of tree objects describing a staged snapshot.
///
/// A tree cannot be written until the identities of all of its subtrees
/// are known, so directories are processed by descending path length:
/// when a directory's turn comes, every deeper directory has already
/// been synthesized. A directory without directly staged files bubbles
/// up through the pending map when its children are folded into it.
pub struct TreeBuilder<'a> {
    store: &'a ObjectStore,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder writing through `store`.
    pub fn new(store: &'a ObjectStore) -> Self {
        Self { store }
    }

    /// Writes one tree per staged directory, bottom-up, and returns the
    /// identity of the root tree. Every synthesized tree is saved to the
    /// store as a side effect.
    pub fn write_trees(
        &self,
        entries: &BTreeMap<RepoPathBuf, IndexEntry>,
    ) -> Result<ObjectId, StoreError> {
        let staged_by_directory: HashMap<&RepoPath, Vec<(&RepoPath, &IndexEntry)>> = entries
            .iter()
            .filter_map(|(path, entry)| {
                let dir = path.parent()?;
                Some((dir, (path.as_ref(), entry)))
            })
            .into_group_map();

        // Longest paths first; a parent is always strictly shorter than
        // its children. The secondary key just makes the write order
        // reproducible.
        let directories: Vec<&RepoPath> = staged_by_directory
            .keys()
            .copied()
            .sorted_by_key(|dir| (Reverse(dir.as_internal_file_string().len()), *dir))
            .collect();

        let mut synthesized: BTreeMap<&RepoPath, ObjectId> = BTreeMap::new();
        for dir in directories {
            let mut tree_entries: Vec<TreeEntry> = staged_by_directory[dir]
                .iter()
                .filter_map(|(path, entry)| {
                    let (_, basename) = path.split()?;
                    Some(TreeEntry::file(basename.as_internal_str(), entry.blob_id.clone()))
                })
                .collect();

            // Fold in subtrees already synthesized for children of this
            // directory; a folded child is subsumed by its parent entry.
            let child_dirs: Vec<&RepoPath> = synthesized
                .keys()
                .copied()
                .filter(|child| child.parent() == Some(dir))
                .collect();
            for child in child_dirs {
                let Some((_, basename)) = child.split() else {
                    continue;
                };
                let Some(id) = synthesized.remove(child) else {
                    continue;
                };
                tree_entries.push(TreeEntry::directory(basename.as_internal_str(), id));
            }

            let tree = Tree::new(tree_entries);
            let id = tree.id().clone();
            tracing::debug!(
                dir = dir.as_internal_file_string(),
                id = %id,
                "synthesized tree"
            );
            self.store.save_object(&Object::Tree(tree))?;
            synthesized.insert(dir, id);
        }

        synthesized
            .remove(RepoPath::root())
            .ok_or_else(|| StoreError::Other("staged snapshot did not produce a root tree".into()))
    }
}

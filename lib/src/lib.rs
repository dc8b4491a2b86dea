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

//! Core storage and identity layer for SVCS, a content-addressed version
//! control system.
//!
//! History is persisted as an immutable graph of SHA-256-named objects
//! (blobs, trees, commits) under the `.svcs/objects` database. The
//! [`store::ObjectStore`] writes and verifies those objects, the
//! [`index::Index`] accumulates staged working-copy files, and the
//! [`tree_builder::TreeBuilder`] turns a staged snapshot into the tree
//! hierarchy a commit points at.

#![warn(missing_docs)]

pub mod compression;
pub mod content_hash;
pub mod event;
pub mod file_util;
pub mod index;
pub mod object;
pub mod object_id;
pub mod repo_path;
pub mod store;
pub mod tree_builder;

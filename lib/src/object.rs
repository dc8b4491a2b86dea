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

use std::fmt;

use thiserror::Error;

use crate::content_hash::hash_bytes;
use crate::object_id::ObjectId;

/// Wire tag identifying the kind of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the framed byte sequence `<tag> <decimal len>\0<payload>`.
///
/// The frame is what gets hashed to form the object's identity and, after
/// compression, what gets stored on disk.
pub fn frame(object_type: ObjectType, payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 16);
    framed.extend_from_slice(object_type.as_str().as_bytes());
    framed.push(b' ');
    framed.extend_from_slice(payload.len().to_string().as_bytes());
    framed.push(0);
    framed.extend_from_slice(payload);
    framed
}

fn hash_framed(object_type: ObjectType, payload: &[u8]) -> ObjectId {
    hash_bytes(&frame(object_type, payload))
}

#[derive(Debug, Error)]
pub enum ObjectParseError {
    #[error("Malformed tree entry line {line:?}")]
    MalformedTreeEntry { line: String },
    #[error("Unknown tree entry mode {mode:?}")]
    UnknownEntryMode { mode: String },
    #[error("Invalid object identity {value:?}")]
    InvalidId { value: String },
    #[error("Missing mandatory commit field {field:?}")]
    MissingCommitField { field: &'static str },
    #[error("Malformed commit timestamp {value:?}")]
    MalformedTimestamp { value: String },
    #[error("Object payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Raw file content.
///
/// The lowest-level object: its identity depends only on its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
    id: ObjectId,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        let id = hash_framed(ObjectType::Blob, &data);
        Self { data, id }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The serialized payload is the raw bytes, verbatim.
    pub fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// File mode token of a tree entry. Only regular files and directories
/// are representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryMode {
    /// A regular file, mode token `100644`.
    Normal,
    /// A subdirectory, mode token `040000`.
    Directory,
}

impl EntryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "100644",
            Self::Directory => "040000",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "100644" => Some(Self::Normal),
            "040000" => Some(Self::Directory),
            _ => None,
        }
    }
}

/// One row of a directory manifest: a name mapped to the identity of a
/// blob or subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub target_type: ObjectType,
    pub target: ObjectId,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            mode: EntryMode::Normal,
            name: name.into(),
            target_type: ObjectType::Blob,
            target,
        }
    }

    pub fn directory(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            mode: EntryMode::Directory,
            name: name.into(),
            target_type: ObjectType::Tree,
            target,
        }
    }
}

/// Directory manifest: a list of entries sorted by name, unique per name.
///
/// The serialized form (and therefore the identity) is independent of the
/// order entries were supplied in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
    id: ObjectId,
}

impl Tree {
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        let id = hash_framed(ObjectType::Tree, &serialize_entries(&entries));
        Self { entries, id }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Replaces the entry with the same name, or inserts a new one at its
    /// sorted position. The identity is recomputed immediately.
    pub fn add_or_update(&mut self, entry: TreeEntry) {
        match self.search(&entry.name) {
            Ok(index) => self.entries[index] = entry,
            Err(index) => self.entries.insert(index, entry),
        }
        self.id = hash_framed(ObjectType::Tree, &serialize_entries(&self.entries));
    }

    /// Removes the entry named `name`, returning whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.search(name) {
            Ok(index) => {
                self.entries.remove(index);
                self.id = hash_framed(ObjectType::Tree, &serialize_entries(&self.entries));
                true
            }
            Err(_) => false,
        }
    }

    pub fn find(&self, name: &str) -> Option<&TreeEntry> {
        self.search(name).ok().map(|index| &self.entries[index])
    }

    fn search(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.name.as_bytes().cmp(name.as_bytes()))
    }

    pub fn serialize(&self) -> Vec<u8> {
        serialize_entries(&self.entries)
    }

    /// Parses the textual manifest format: one `mode type identity name`
    /// line per entry.
    ///
    /// The name is everything after the third space, with leading spaces
    /// stripped, so names may contain interior spaces. Empty lines are
    /// skipped; any other line that does not parse is rejected.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectParseError> {
        let text = std::str::from_utf8(payload)?;
        let mut entries = Vec::new();
        for line in text.split('\n') {
            if line.is_empty() {
                continue;
            }
            let malformed = || ObjectParseError::MalformedTreeEntry {
                line: line.to_string(),
            };
            let mut fields = line.splitn(4, ' ');
            let mode_token = fields.next().ok_or_else(malformed)?;
            let type_tag = fields.next().ok_or_else(malformed)?;
            let id_hex = fields.next().ok_or_else(malformed)?;
            let name = fields
                .next()
                .ok_or_else(malformed)?
                .trim_start_matches(' ');
            if name.is_empty() {
                return Err(malformed());
            }
            let mode = EntryMode::from_token(mode_token).ok_or_else(|| {
                ObjectParseError::UnknownEntryMode {
                    mode: mode_token.to_string(),
                }
            })?;
            let target_type = match ObjectType::from_tag(type_tag) {
                Some(target_type @ (ObjectType::Blob | ObjectType::Tree)) => target_type,
                _ => return Err(malformed()),
            };
            let target = ObjectId::try_from_hex(id_hex).ok_or_else(|| {
                ObjectParseError::InvalidId {
                    value: id_hex.to_string(),
                }
            })?;
            entries.push(TreeEntry {
                mode,
                name: name.to_string(),
                target_type,
                target,
            });
        }
        Ok(Self::new(entries))
    }
}

fn serialize_entries(entries: &[TreeEntry]) -> Vec<u8> {
    let mut buf = Vec::new();
    for entry in entries {
        buf.extend_from_slice(entry.mode.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(entry.target_type.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(entry.target.hex().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(entry.name.as_bytes());
        buf.push(b'\n');
    }
    buf
}

/// History node: one tree, sorted parent identities, author, timestamp,
/// and a free-form message.
///
/// Commits are immutable; every field is fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    tree: ObjectId,
    parents: Vec<ObjectId>,
    author: String,
    timestamp: i64,
    message: String,
    id: ObjectId,
}

impl Commit {
    /// Constructs a commit. Parents are sorted by byte value, so the
    /// identity is independent of the caller's ordering.
    pub fn new(
        tree: ObjectId,
        mut parents: Vec<ObjectId>,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        parents.sort();
        let author = author.into();
        let message = message.into();
        let payload = serialize_commit(&tree, &parents, &author, timestamp, &message);
        let id = hash_framed(ObjectType::Commit, &payload);
        Self {
            tree,
            parents,
            author,
            timestamp,
            message,
            id,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn tree(&self) -> &ObjectId {
        &self.tree
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn serialize(&self) -> Vec<u8> {
        serialize_commit(
            &self.tree,
            &self.parents,
            &self.author,
            self.timestamp,
            &self.message,
        )
    }

    /// Parses the header-then-message commit layout.
    ///
    /// Header lines are read up to the blank separator; `tree` and
    /// `author` are mandatory. The message is the remainder, with one
    /// leading LF stripped if present.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectParseError> {
        let text = std::str::from_utf8(payload)?;
        let (header, message) = match text.split_once("\n\n") {
            Some((header, message)) => (header, message),
            None => (text, ""),
        };
        let message = message.strip_prefix('\n').unwrap_or(message);

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author_line = None;
        for line in header.split('\n') {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(parse_id_field(value)?),
                "parent" => parents.push(parse_id_field(value)?),
                "author" => author_line = Some(value),
                _ => {}
            }
        }

        let tree = tree.ok_or(ObjectParseError::MissingCommitField { field: "tree" })?;
        let author_line =
            author_line.ok_or(ObjectParseError::MissingCommitField { field: "author" })?;
        let (author, timestamp) = parse_author_line(author_line)?;
        Ok(Self::new(tree, parents, author, message, timestamp))
    }
}

fn parse_id_field(value: &str) -> Result<ObjectId, ObjectParseError> {
    ObjectId::try_from_hex(value).ok_or_else(|| ObjectParseError::InvalidId {
        value: value.to_string(),
    })
}

/// Splits an author line into the author and the timestamp.
///
/// The value format is `<name and email> <timestamp> <timezone>`. The
/// rightmost two space-separated tokens are taken as timestamp and
/// timezone; everything before them is the author. This scan is kept
/// exactly as-is for hash compatibility: the author part may itself
/// contain spaces. The timezone is informational and always written as
/// `+0000`.
fn parse_author_line(value: &str) -> Result<(String, i64), ObjectParseError> {
    let malformed = || ObjectParseError::MissingCommitField { field: "author" };
    let (rest, _timezone) = value.rsplit_once(' ').ok_or_else(malformed)?;
    let (author, timestamp) = rest.rsplit_once(' ').ok_or_else(malformed)?;
    let author = author.strip_suffix(' ').unwrap_or(author);
    let timestamp =
        timestamp
            .parse::<i64>()
            .map_err(|_| ObjectParseError::MalformedTimestamp {
                value: timestamp.to_string(),
            })?;
    Ok((author.to_string(), timestamp))
}

fn serialize_commit(
    tree: &ObjectId,
    parents: &[ObjectId],
    author: &str,
    timestamp: i64,
    message: &str,
) -> Vec<u8> {
    let mut buf = String::new();
    buf.push_str(&format!("tree {}\n", tree.hex()));
    for parent in parents {
        buf.push_str(&format!("parent {}\n", parent.hex()));
    }
    buf.push_str(&format!("author {author} {timestamp} +0000\n"));
    buf.push_str(&format!("committer {author} {timestamp} +0000\n"));
    buf.push('\n');
    buf.push_str(message);
    buf.into_bytes()
}

/// A stored object: the closed family of content types sharing the
/// framed-identity rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
        }
    }

    pub fn id(&self) -> &ObjectId {
        match self {
            Self::Blob(blob) => blob.id(),
            Self::Tree(tree) => tree.id(),
            Self::Commit(commit) => commit.id(),
        }
    }

    /// Serializes the payload: the bytes after the frame header.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Blob(blob) => blob.serialize(),
            Self::Tree(tree) => tree.serialize(),
            Self::Commit(commit) => commit.serialize(),
        }
    }

    /// Factory reconstructing an object of the given type from its
    /// payload bytes. The reconstructed object recomputes its identity
    /// from the content, so a round trip through `payload` is stable.
    pub fn from_payload(
        object_type: ObjectType,
        payload: &[u8],
    ) -> Result<Self, ObjectParseError> {
        match object_type {
            ObjectType::Blob => Ok(Self::Blob(Blob::new(payload.to_vec()))),
            ObjectType::Tree => Ok(Self::Tree(Tree::parse(payload)?)),
            ObjectType::Commit => Ok(Self::Commit(Commit::parse(payload)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn blob_id(seed: &str) -> ObjectId {
        Blob::new(seed.as_bytes().to_vec()).id().clone()
    }

    #[test]
    fn test_blob_framing() {
        let blob = Blob::new(b"hello\n".to_vec());
        assert_eq!(
            frame(ObjectType::Blob, blob.data()),
            b"blob 6\0hello\n".to_vec()
        );
        assert_eq!(
            frame(ObjectType::Blob, blob.data()),
            vec![0x62, 0x6c, 0x6f, 0x62, 0x20, 0x36, 0x00, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x0a]
        );
        // Identity is reproducible across independent constructions.
        assert_eq!(blob.id(), Blob::new(b"hello\n".to_vec()).id());
    }

    #[test]
    fn test_empty_blob_identity() {
        let empty = Blob::new(vec![]);
        assert_eq!(empty.id().hex().len(), 64);
        assert_ne!(empty.id(), Blob::new(b"A".to_vec()).id());
    }

    #[test]
    fn test_blob_round_trip() {
        let blob = Blob::new(b"some\0binary\xffdata".to_vec());
        let parsed = Object::from_payload(ObjectType::Blob, &blob.serialize()).unwrap();
        assert_eq!(parsed, Object::Blob(blob));
    }

    #[test]
    fn test_tree_identity_ignores_input_order() {
        let entries = vec![
            TreeEntry::file("b.txt", blob_id("b")),
            TreeEntry::directory("a-dir", blob_id("sub")),
            TreeEntry::file("c.txt", blob_id("c")),
        ];
        let mut shuffled = entries.clone();
        shuffled.rotate_left(2);
        assert_eq!(Tree::new(entries).id(), Tree::new(shuffled).id());
    }

    #[test]
    fn test_tree_serialization_is_sorted() {
        let tree = Tree::new(vec![
            TreeEntry::file("zebra", blob_id("z")),
            TreeEntry::file("apple", blob_id("a")),
            TreeEntry::directory("mango", blob_id("m")),
        ]);
        let text = String::from_utf8(tree.serialize()).unwrap();
        let names: Vec<_> = text
            .lines()
            .map(|line| line.splitn(4, ' ').nth(3).unwrap())
            .collect();
        assert_eq!(names, ["apple", "mango", "zebra"]);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_tree_mutation() {
        let mut tree = Tree::new(vec![TreeEntry::file("a", blob_id("a"))]);
        let id_before = tree.id().clone();

        tree.add_or_update(TreeEntry::file("b", blob_id("b")));
        assert_ne!(tree.id(), &id_before);
        assert_eq!(tree.entries().len(), 2);

        // Same name replaces instead of duplicating.
        tree.add_or_update(TreeEntry::file("b", blob_id("b2")));
        assert_eq!(tree.entries().len(), 2);
        assert_eq!(tree.find("b").unwrap().target, blob_id("b2"));

        assert!(tree.remove("b"));
        assert!(!tree.remove("b"));
        assert_eq!(tree.id(), &id_before);
        assert_eq!(tree.find("b"), None);
    }

    #[test]
    fn test_tree_round_trip_with_spaces_in_name() {
        let tree = Tree::new(vec![
            TreeEntry::file("file with spaces.txt", blob_id("s")),
            TreeEntry::directory("dir", blob_id("d")),
        ]);
        let parsed = Tree::parse(&tree.serialize()).unwrap();
        assert_eq!(parsed.entries(), tree.entries());
        assert_eq!(parsed.id(), tree.id());
    }

    #[test]
    fn test_tree_parse_rejects_bad_lines() {
        let id = blob_id("x").hex();
        assert_matches!(
            Tree::parse(b"garbage"),
            Err(ObjectParseError::MalformedTreeEntry { .. })
        );
        assert_matches!(
            Tree::parse(format!("123456 blob {id} name\n").as_bytes()),
            Err(ObjectParseError::UnknownEntryMode { .. })
        );
        assert_matches!(
            Tree::parse(format!("100644 commit {id} name\n").as_bytes()),
            Err(ObjectParseError::MalformedTreeEntry { .. })
        );
        assert_matches!(
            Tree::parse(b"100644 blob nothex name\n"),
            Err(ObjectParseError::InvalidId { .. })
        );
        // Empty lines are skipped, not rejected.
        let tree = Tree::parse(format!("\n100644 blob {id} name\n\n").as_bytes()).unwrap();
        assert_eq!(tree.entries().len(), 1);
    }

    #[test]
    fn test_commit_serialization_format() {
        let tree = blob_id("tree");
        let parent = blob_id("parent");
        let commit = Commit::new(
            tree.clone(),
            vec![parent.clone()],
            "Alice <alice@example.com>",
            "Initial commit",
            1234567890,
        );
        let expected = indoc! {"
            tree TREE
            parent PARENT
            author Alice <alice@example.com> 1234567890 +0000
            committer Alice <alice@example.com> 1234567890 +0000

            Initial commit"}
        .replace("TREE", &tree.hex())
        .replace("PARENT", &parent.hex());
        assert_eq!(String::from_utf8(commit.serialize()).unwrap(), expected);
    }

    #[test]
    fn test_commit_parent_order_independence() {
        let a = blob_id("a");
        let b = blob_id("b");
        let make = |parents| {
            Commit::new(
                blob_id("tree"),
                parents,
                "Alice <alice@example.com>",
                "merge",
                1234567890,
            )
        };
        let left = make(vec![a.clone(), b.clone()]);
        let right = make(vec![b.clone(), a.clone()]);
        assert_eq!(left.id(), right.id());
        assert_eq!(left.parents(), right.parents());
    }

    #[test]
    fn test_commit_round_trip() {
        let commit = Commit::new(
            blob_id("tree"),
            vec![blob_id("p1"), blob_id("p2")],
            "Alice <alice@example.com>",
            "Testing commit message with\nmultiple lines.",
            1234567890,
        );
        let parsed = Commit::parse(&commit.serialize()).unwrap();
        assert_eq!(parsed.message(), commit.message());
        assert_eq!(parsed.author(), commit.author());
        assert_eq!(parsed.timestamp(), commit.timestamp());
        assert_eq!(parsed.tree(), commit.tree());
        assert_eq!(parsed.parents(), commit.parents());
        assert_eq!(parsed.id(), commit.id());
    }

    #[test]
    fn test_commit_round_trip_root_commit() {
        let commit = Commit::new(
            blob_id("tree"),
            vec![],
            "Bob <bob@example.com>",
            "",
            0,
        );
        let parsed = Commit::parse(&commit.serialize()).unwrap();
        assert!(parsed.parents().is_empty());
        assert_eq!(parsed.message(), "");
        assert_eq!(parsed.id(), commit.id());
    }

    #[test]
    fn test_commit_parse_author_with_spaces() {
        let (author, timestamp) =
            parse_author_line("Ada Lovelace <ada@example.com> 1234567890 +0000").unwrap();
        assert_eq!(author, "Ada Lovelace <ada@example.com>");
        assert_eq!(timestamp, 1234567890);
    }

    #[test]
    fn test_commit_parse_missing_fields() {
        let tree = blob_id("tree").hex();
        assert_matches!(
            Commit::parse(b"author Alice <a@e> 0 +0000\n\nmsg"),
            Err(ObjectParseError::MissingCommitField { field: "tree" })
        );
        assert_matches!(
            Commit::parse(format!("tree {tree}\n\nmsg").as_bytes()),
            Err(ObjectParseError::MissingCommitField { field: "author" })
        );
        assert_matches!(
            Commit::parse(format!("tree {tree}\nauthor Alice <a@e> soon +0000\n\nmsg").as_bytes()),
            Err(ObjectParseError::MalformedTimestamp { .. })
        );
    }

    #[test]
    fn test_object_factory_dispatch() {
        let payload = b"file contents";
        let object = Object::from_payload(ObjectType::Blob, payload).unwrap();
        assert_eq!(object.object_type(), ObjectType::Blob);
        assert_eq!(object.payload(), payload);

        let tree = Tree::new(vec![TreeEntry::file("a", blob_id("a"))]);
        let object = Object::from_payload(ObjectType::Tree, &tree.serialize()).unwrap();
        assert_eq!(object.id(), tree.id());
    }
}

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

use svcs_lib::object::Commit;
use svcs_lib::object::Object;
use svcs_lib::object_id::ObjectId;
use testutils::TestRepo;

fn object_id(byte: &str) -> ObjectId {
    ObjectId::try_from_hex(byte.repeat(32)).unwrap()
}

#[test]
fn test_commit_save_load_round_trip() {
    let test_repo = TestRepo::init();
    let store = &test_repo.store;

    let commit = Commit::new(
        object_id("a0"),
        vec![object_id("b1"), object_id("c2")],
        "Alice <alice@example.com>",
        "Testing commit message with\nmultiple lines.",
        1234567890,
    );
    store.save_object(&Object::Commit(commit.clone())).unwrap();

    let loaded = match store.load_object(commit.id()).unwrap() {
        Object::Commit(loaded) => loaded,
        other => panic!("loaded wrong object kind: {other:?}"),
    };
    assert_eq!(loaded.message(), "Testing commit message with\nmultiple lines.");
    assert_eq!(loaded.author(), "Alice <alice@example.com>");
    assert_eq!(loaded.timestamp(), 1234567890);
    assert_eq!(loaded.tree(), &object_id("a0"));
    assert_eq!(loaded.parents(), &[object_id("b1"), object_id("c2")]);
    assert_eq!(loaded.id(), commit.id());
}

#[test]
fn test_commit_identity_independent_of_parent_order() {
    let a = object_id("0a");
    let b = object_id("f0");
    let make = |parents| {
        Commit::new(
            object_id("11"),
            parents,
            "Alice <alice@example.com>",
            "merge",
            1234567890,
        )
    };
    assert_eq!(
        make(vec![a.clone(), b.clone()]).id(),
        make(vec![b, a]).id()
    );
}

#[test]
fn test_commit_chain_save_load() {
    let test_repo = TestRepo::init();
    let store = &test_repo.store;

    let root = Commit::new(
        object_id("aa"),
        vec![],
        "Alice <alice@example.com>",
        "root",
        1000,
    );
    store.save_object(&Object::Commit(root.clone())).unwrap();

    let child = Commit::new(
        object_id("aa"),
        vec![root.id().clone()],
        "Alice <alice@example.com>",
        "child",
        2000,
    );
    store.save_object(&Object::Commit(child.clone())).unwrap();

    // Walk the chain back through the store.
    let loaded_child = match store.load_object(child.id()).unwrap() {
        Object::Commit(commit) => commit,
        other => panic!("loaded wrong object kind: {other:?}"),
    };
    assert_eq!(loaded_child.parents(), &[root.id().clone()]);
    let loaded_root = match store.load_object(&loaded_child.parents()[0]).unwrap() {
        Object::Commit(commit) => commit,
        other => panic!("loaded wrong object kind: {other:?}"),
    };
    assert!(loaded_root.parents().is_empty());
    assert_eq!(loaded_root.message(), "root");
}

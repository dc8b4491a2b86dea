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
use std::fmt::Debug;

/// Length in bytes of an object identity. The hex form is twice as long.
pub const OBJECT_ID_LENGTH: usize = 32;

/// Content-addressed name of a stored object: the SHA-256 digest of its
/// framed byte representation.
///
/// Identities order by byte value, which coincides with lexicographic
/// order of their lowercase hex form.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct ObjectId(Vec<u8>);

impl ObjectId {
    pub fn new(value: Vec<u8>) -> Self {
        Self(value)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Parses the given hex string into an ObjectId.
    ///
    /// The given string must be valid. A static str is required to
    /// prevent API misuse.
    pub fn from_hex(hex: &'static str) -> Self {
        Self::try_from_hex(hex).unwrap()
    }

    /// Parses the given hex string into an ObjectId.
    ///
    /// Identities are canonically 64 lowercase hex digits; anything else
    /// (wrong length, uppercase, non-hex bytes) is rejected.
    pub fn try_from_hex(hex: impl AsRef<[u8]>) -> Option<Self> {
        let hex = hex.as_ref();
        if hex.len() != OBJECT_ID_LENGTH * 2
            || !hex.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        hex::decode(hex).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    pub fn hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_tuple("ObjectId").field(&self.hex()).finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.pad(&self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_object_id() {
        let id = ObjectId::from_hex(
            "deadbeef0123deadbeef0123deadbeef0123deadbeef0123deadbeef01234567",
        );
        assert_eq!(
            format!("{id}"),
            "deadbeef0123deadbeef0123deadbeef0123deadbeef0123deadbeef01234567"
        );
        assert_eq!(format!("{id:.8}"), "deadbeef");
    }

    #[test]
    fn test_try_from_hex() {
        let valid = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let id = ObjectId::try_from_hex(valid).unwrap();
        assert_eq!(id.hex(), valid);
        assert_eq!(id.as_bytes().len(), OBJECT_ID_LENGTH);

        // Wrong length.
        assert_eq!(ObjectId::try_from_hex("0123456789abcdef"), None);
        assert_eq!(ObjectId::try_from_hex(""), None);
        assert_eq!(ObjectId::try_from_hex(format!("{valid}00")), None);
        // Uppercase is not canonical.
        assert_eq!(ObjectId::try_from_hex(valid.to_uppercase()), None);
        // Non-hex digits.
        let broken = valid.replace('0', "g");
        assert_eq!(ObjectId::try_from_hex(broken), None);
    }

    #[test]
    fn test_order_matches_hex_order() {
        let a = ObjectId::from_hex(
            "00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff",
        );
        let b = ObjectId::from_hex(
            "0100000000000000000000000000000000000000000000000000000000000000",
        );
        assert!(a < b);
        assert!(a.hex() < b.hex());
    }
}

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

//! Raw-deflate codec for the on-disk object encoding.
//!
//! An object file contains exactly the deflate stream of the framed
//! object bytes, with no zlib or gzip wrapper, so the raw variant is
//! mandatory.

use std::io;
use std::io::Read as _;
use std::io::Write as _;

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

/// Compresses `data` as a raw deflate stream at the default level.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompresses a raw deflate stream produced by [`compress`].
///
/// Fails if the input is truncated, malformed, or does not terminate in
/// a well-formed end-of-stream marker.
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let data = b"tree 0\0".as_slice();
        assert_eq!(decompress(&compress(data).unwrap()).unwrap(), data);

        let data = vec![0x5a; 1 << 16];
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_round_trip_empty() {
        assert_eq!(decompress(&compress(b"").unwrap()).unwrap(), b"");
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(decompress(b"not a deflate stream").is_err());
    }

    #[test]
    fn test_decompress_rejects_truncated_stream() {
        let compressed = compress(&vec![0x5a; 1 << 16]).unwrap();
        assert!(decompress(&compressed[..compressed.len() / 2]).is_err());
    }
}

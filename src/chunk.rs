// Copyright 2026 Locha Mesh Developers <contact@locha.io>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Chunks
//!
//! Files travel in chunks of at most [`CHUNK_SIZE`] bytes, base64 encoded
//! so they survive the text oriented raw REPL.

use std::io::{self, Read};

use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

use crate::constants::CHUNK_SIZE;

/// Encode a chunk for the wire.
pub fn encode(chunk: &[u8]) -> String {
    STANDARD.encode(chunk)
}

/// Decode a chunk received from the wire.
pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}

/// Reads a source in consecutive, non overlapping chunks.
#[derive(Debug)]
pub struct ChunkReader<R> {
    inner: R,
    chunk_size: usize,
    offset: u64,
}

impl<R> ChunkReader<R>
where
    R: Read,
{
    /// Chunks of [`CHUNK_SIZE`] bytes.
    pub fn new(inner: R) -> Self {
        ChunkReader::with_chunk_size(inner, CHUNK_SIZE)
    }

    /// # Panics
    ///
    /// If `chunk_size` is zero.
    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size can't be zero");

        ChunkReader {
            inner,
            chunk_size,
            offset: 0,
        }
    }

    /// Read the next chunk, `None` at the end of the source.
    ///
    /// Every chunk but the last one is exactly `chunk_size` bytes long,
    /// short reads from the source are retried to fill it.
    pub fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e),
            }
        }

        if filled == 0 {
            return Ok(None);
        }

        buf.truncate(filled);
        self.offset += filled as u64;

        Ok(Some(buf))
    }

    /// Bytes read so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// SHA-256 of `data`, lowercase hex.
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Whether `s` looks like a hex SHA-256 as printed by the board.
pub fn is_digest_hex(s: &str) -> bool {
    s.len() == crate::constants::DIGEST_HEX_LEN
        && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod test {
    use super::*;

    /// Source that never returns more than 7 bytes per read.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.0.len().min(buf.len()).min(7);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    fn chunks_of(data: &[u8]) -> Vec<Vec<u8>> {
        let mut reader = ChunkReader::new(Trickle(data));
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(reader.offset(), data.len() as u64);
        chunks
    }

    #[test]
    fn test_chunk_boundaries() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();

        for len in &[0usize, 1, 255, 256, 257, 512, 1000] {
            let chunks = chunks_of(&data[..*len]);
            assert_eq!(chunks.len(), (len + CHUNK_SIZE - 1) / CHUNK_SIZE);
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= CHUNK_SIZE));
            if let Some((_, full)) = chunks.split_last() {
                assert!(full.iter().all(|c| c.len() == CHUNK_SIZE));
            }
            assert_eq!(chunks.concat(), &data[..*len]);
        }
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode(b"hello world"), "aGVsbG8gd29ybGQ=");

        let mut seed = 0x2545_f491u32;
        for len in 0..=CHUNK_SIZE {
            let noise: Vec<u8> = (0..len)
                .map(|_| {
                    seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    (seed >> 16) as u8
                })
                .collect();
            let patterns = [
                vec![0u8; len],
                vec![0xffu8; len],
                (0..len).map(|i| i as u8).collect(),
                (0..len).map(|i| b"\r\n\x04'\\"[i % 5]).collect(),
                noise,
            ];

            for chunk in &patterns {
                let text = encode(chunk);
                assert_eq!(text.len(), (len + 2) / 3 * 4);
                assert_eq!(decode(&text).unwrap(), *chunk, "length {}", len);
            }
        }

        assert!(decode("not base64!").is_err());
        assert!(decode("aGVsbG8").is_err());
    }

    #[test]
    fn test_incremental_digest_matches_whole() {
        let data: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();

        let mut reader = ChunkReader::new(&data[..]);
        let mut hasher = Sha256::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            hasher.update(&chunk);
        }

        assert_eq!(hex::encode(hasher.finalize()), digest_hex(&data));
    }

    #[test]
    fn test_digest_hex() {
        let digest = digest_hex(b"hello world");
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(is_digest_hex(&digest));
        assert!(!is_digest_hex("None"));
        assert!(!is_digest_hex(&digest.to_uppercase()));
    }
}

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

//! # Upload
//!
//! Pushes a local file to the board through the file receiver and checks
//! that both ends computed the same SHA-256.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use sha2::{Digest, Sha256};

use crate::{
    chunk::{self, ChunkReader},
    clock::Clock,
    command::Command,
    session::Session,
    Error, Result,
};

/// Outcome of a structurally successful upload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransferResult {
    pub bytes_sent: u64,
    /// Number of write commands issued.
    pub chunks: usize,
    /// SHA-256 of the bytes read from the local file.
    pub local_digest: String,
    /// SHA-256 reported by the board.
    pub remote_digest: String,
    /// Whether both digests are the same.
    pub matched: bool,
}

impl TransferResult {
    /// Turn a digest mismatch into an [`Error::IntegrityMismatch`].
    ///
    /// The file is on the board either way.
    pub fn verify(self) -> Result<Self> {
        if !self.matched {
            return Err(Error::IntegrityMismatch {
                local: self.local_digest,
                remote: self.remote_digest,
            });
        }

        Ok(self)
    }
}

/// Reported after every chunk written.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Progress {
    /// Index of the chunk just written.
    pub chunk: usize,
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

/// Upload `local_path` to `remote_path` on the board.
///
/// See [`upload_with_progress`].
pub fn upload<P, C, L>(
    session: &mut Session<P, C>,
    local_path: L,
    remote_path: &str,
) -> Result<TransferResult>
where
    P: Read + Write,
    C: Clock,
    L: AsRef<Path>,
{
    upload_with_progress(session, local_path, remote_path, |_| ())
}

/// Upload `local_path` to `remote_path` on the board, calling `on_progress`
/// after each chunk.
///
/// A digest mismatch is not an error here, check
/// [`TransferResult::matched`] or use [`TransferResult::verify`].
///
/// # Errors
///
/// - [`Error::MissingSource`] if `local_path` isn't a regular file, nothing
/// is sent to the board in that case.
/// - [`Error::Execution`] as soon as any command fails on the board, the
/// transfer isn't resumed nor retried.
/// - [`Error::InvalidDigest`] if the board didn't print a digest.
pub fn upload_with_progress<P, C, L, F>(
    session: &mut Session<P, C>,
    local_path: L,
    remote_path: &str,
    mut on_progress: F,
) -> Result<TransferResult>
where
    P: Read + Write,
    C: Clock,
    L: AsRef<Path>,
    F: FnMut(Progress),
{
    let local_path = local_path.as_ref();
    if !local_path.is_file() {
        return Err(Error::MissingSource(local_path.to_path_buf()));
    }

    // Build what can be built up front, a bad vocabulary or path is caught
    // before the board is touched.
    let vocabulary = session.config().vocabulary.clone();
    let import_cmd = Command::import(&vocabulary)?;
    let open_cmd = Command::open(&vocabulary, remote_path)?;
    let close_cmd = Command::close(&vocabulary)?;
    let digest_cmd = Command::print_digest(&vocabulary)?;

    let file = File::open(local_path)?;
    let total_bytes = file.metadata()?.len();
    let mut reader = ChunkReader::new(file);

    log::info!(
        "Uploading `{}` ({} bytes) to `{}`",
        local_path.display(),
        total_bytes,
        remote_path
    );

    session.exec(&import_cmd, false)?;
    session.exec(&open_cmd, false)?;

    let mut hasher = Sha256::new();
    let mut chunks = 0;
    while let Some(data) = reader.next_chunk()? {
        hasher.update(&data);

        log::debug!(
            "Writing chunk #{} ({} B) at offset {}",
            chunks,
            data.len(),
            reader.offset() - data.len() as u64
        );
        let write_cmd = Command::write(&vocabulary, &chunk::encode(&data))?;
        session.exec(&write_cmd, false)?;

        on_progress(Progress {
            chunk: chunks,
            bytes_sent: reader.offset(),
            total_bytes,
        });
        chunks += 1;
    }

    session.exec(&close_cmd, false)?;

    let local_digest = hex::encode(hasher.finalize());
    log::info!("{} chunks sent, local digest {}", chunks, local_digest);

    let remote_digest = session
        .exec(&digest_cmd, true)?
        .ok_or_else(|| Error::InvalidDigest(String::new()))?;
    if !chunk::is_digest_hex(&remote_digest) {
        return Err(Error::InvalidDigest(remote_digest));
    }

    let matched = local_digest == remote_digest;
    if matched {
        log::info!("Remote digest matches");
    } else {
        log::warn!("Remote digest mismatch: {}", remote_digest);
    }

    Ok(TransferResult {
        bytes_sent: reader.offset(),
        chunks,
        local_digest,
        remote_digest,
        matched,
    })
}

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

//! # File receiver
//!
//! The board side of a transfer: materializes a file from base64 chunks and
//! keeps a running SHA-256 of what was written. Board paths are absolute and
//! resolved below a local root directory.

use std::{
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::chunk;

/// Errors of the receiver, they become a traceback on the board.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("OSError: {0}")]
    Io(#[from] io::Error),

    #[error("binascii.Error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("OSError: no file open")]
    NotOpen,

    #[error("OSError: invalid path `{0}`")]
    InvalidPath(String),
}

/// Writes one file at a time from encoded chunks.
pub struct FileReceiver {
    root: PathBuf,
    path: Option<String>,
    file: Option<File>,
    hasher: Option<Sha256>,
    digest: Option<String>,
}

impl FileReceiver {
    /// A receiver whose `/` is `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileReceiver {
            root: root.into(),
            path: None,
            file: None,
            hasher: None,
            digest: None,
        }
    }

    /// Open `path` for writing, truncating it.
    ///
    /// A previously opened file is closed first. Relative paths are taken
    /// from `/`. Missing parent directories are created.
    pub fn open(&mut self, path: &str) -> Result<(), ReceiverError> {
        self.close()?;

        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            log::warn!("relative path `{}`, adding '/'", path);
            format!("/{}", path)
        };

        let local = self.resolve(&path)?;
        if let Some(parent) = local.parent() {
            self.create_parents(parent)?;
        }

        log::debug!("open {} for write", path);
        self.file = Some(File::create(&local)?);
        self.path = Some(path);
        self.hasher = Some(Sha256::new());
        self.digest = None;

        Ok(())
    }

    /// Decode `encoded` and append it to the open file.
    ///
    /// Chunks must come in file order, the receiver can't tell otherwise.
    pub fn write(&mut self, encoded: &str) -> Result<(), ReceiverError> {
        let file = self.file.as_mut().ok_or(ReceiverError::NotOpen)?;
        let data = chunk::decode(encoded)?;

        file.write_all(&data)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&data);
        }

        Ok(())
    }

    /// Short name of [`FileReceiver::write`], keeps the commands small.
    pub fn w(&mut self, encoded: &str) -> Result<(), ReceiverError> {
        self.write(encoded)
    }

    /// Flush and close the file. Does nothing if already closed.
    pub fn close(&mut self) -> Result<(), ReceiverError> {
        if let Some(mut file) = self.file.take() {
            log::debug!(
                "closing {}",
                self.path.as_deref().unwrap_or_default()
            );
            file.flush()?;
            file.sync_all()?;
        }

        Ok(())
    }

    /// Hex SHA-256 of the bytes written since the last `open`.
    ///
    /// Computed on the first call and cached until the next `open`: bytes
    /// written after the first call aren't reflected. `None` if nothing was
    /// ever opened.
    pub fn digest(&mut self) -> Option<String> {
        if self.digest.is_none() {
            if let Some(hasher) = self.hasher.as_ref() {
                self.digest = Some(hex::encode(hasher.clone().finalize()));
            }
        }

        self.digest.clone()
    }

    /// Board path of the current (or last) file.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ReceiverError> {
        let mut local = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => (),
                Component::Normal(part) => local.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ReceiverError::InvalidPath(path.to_owned()))
                }
            }
        }

        if local == self.root {
            return Err(ReceiverError::InvalidPath(path.to_owned()));
        }

        Ok(local)
    }

    /// Create the ancestors of a file, shallowest first.
    fn create_parents(&self, parent: &Path) -> Result<(), ReceiverError> {
        let relative = parent.strip_prefix(&self.root).map_err(|_| {
            ReceiverError::InvalidPath(parent.display().to_string())
        })?;

        let mut dir = self.root.clone();
        for component in relative.components() {
            dir.push(component);
            if dir.is_dir() {
                continue;
            }

            log::debug!("creating {}", dir.display());
            match fs::create_dir(&dir) {
                Ok(()) => (),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => (),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

impl fmt::Debug for FileReceiver {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("FileReceiver")
            .field("root", &self.root)
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .field("digest", &self.digest)
            .finish()
    }
}

impl Drop for FileReceiver {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("couldn't close received file: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_open_creates_parents() {
        let root = tempfile::tempdir().unwrap();
        let mut receiver = FileReceiver::new(root.path());

        assert!(!root.path().join("a").exists());
        receiver.open("/a/b/c.bin").unwrap();
        assert!(root.path().join("a").is_dir());
        assert!(root.path().join("a/b").is_dir());
        assert!(root.path().join("a/b/c.bin").is_file());
        receiver.close().unwrap();

        // Directories already there, opening again just truncates.
        fs::write(root.path().join("a/b/c.bin"), b"old contents").unwrap();
        receiver.open("/a/b/c.bin").unwrap();
        receiver.close().unwrap();
        assert_eq!(fs::read(root.path().join("a/b/c.bin")).unwrap(), b"");
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let root = tempfile::tempdir().unwrap();
        let mut receiver = FileReceiver::new(root.path());

        receiver.open("x/y.txt").unwrap();
        assert_eq!(receiver.path(), Some("/x/y.txt"));
        assert!(root.path().join("x/y.txt").is_file());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let root = tempfile::tempdir().unwrap();
        let mut receiver = FileReceiver::new(root.path());

        assert!(matches!(
            receiver.open("/../outside.bin"),
            Err(ReceiverError::InvalidPath(_))
        ));
        assert!(matches!(
            receiver.open("/"),
            Err(ReceiverError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_write_and_digest() {
        let root = tempfile::tempdir().unwrap();
        let mut receiver = FileReceiver::new(root.path());

        receiver.open("/data/out.bin").unwrap();
        receiver.w(&chunk::encode(b"hello ")).unwrap();
        receiver.write(&chunk::encode(b"world")).unwrap();
        receiver.close().unwrap();
        receiver.close().unwrap();

        assert_eq!(
            fs::read(root.path().join("data/out.bin")).unwrap(),
            b"hello world"
        );
        assert_eq!(
            receiver.digest().as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn test_digest_is_cached_until_reopen() {
        let root = tempfile::tempdir().unwrap();
        let mut receiver = FileReceiver::new(root.path());
        assert_eq!(receiver.digest(), None);

        receiver.open("/f.bin").unwrap();
        receiver.write(&chunk::encode(b"hello")).unwrap();
        let first = receiver.digest().unwrap();
        assert_eq!(first, chunk::digest_hex(b"hello"));

        receiver.write(&chunk::encode(b" world")).unwrap();
        assert_eq!(receiver.digest().unwrap(), first);

        receiver.open("/f.bin").unwrap();
        assert_eq!(receiver.digest().unwrap(), chunk::digest_hex(b""));
    }

    #[test]
    fn test_write_errors() {
        let root = tempfile::tempdir().unwrap();
        let mut receiver = FileReceiver::new(root.path());

        assert!(matches!(
            receiver.write("aGVsbG8="),
            Err(ReceiverError::NotOpen)
        ));

        receiver.open("/f.bin").unwrap();
        let err = receiver.write("%%%").unwrap_err();
        assert!(matches!(err, ReceiverError::Decode(_)));
        assert!(err.to_string().contains("Error"));
    }
}

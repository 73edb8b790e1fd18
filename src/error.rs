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

use std::{io, path::PathBuf, time::Duration};

use crate::session::SessionState;

/// Result type of every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while talking to the board.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The expected terminator didn't arrive before the deadline. The
    /// session is in an unknown state afterwards.
    #[error("timed out after {waited:?} waiting for the board")]
    Timeout { waited: Duration },

    /// Raw REPL mode couldn't be entered.
    #[error("failed to enter raw REPL: {0}")]
    Handshake(String),

    /// The board raised while executing a command.
    #[error("execution error: {output}")]
    Execution { output: String },

    #[error("cannot find `{}` to send", .0.display())]
    MissingSource(PathBuf),

    /// The file arrived but its digest differs from the local one.
    #[error("digest mismatch, local {local}, remote {remote}")]
    IntegrityMismatch { local: String, remote: String },

    #[error("invalid command argument: {0}")]
    InvalidCommand(String),

    #[error("board reported an invalid digest: `{0}`")]
    InvalidDigest(String),

    #[error("session is {found:?}, expected {expected:?}")]
    InvalidState {
        expected: SessionState,
        found: SessionState,
    },
}

impl Error {
    /// Whether the session that produced this error can't be trusted
    /// anymore and must be reopened.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Timeout { .. }
                | Error::Handshake(_)
                | Error::InvalidState { .. }
        )
    }
}

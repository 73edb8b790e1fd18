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

//! # Command execution
//!
//! In raw REPL mode the board answers every command with
//! `OK<stdout>\x04<stderr>\x04>`. There is no reliable way to know when the
//! answer is complete, so output is collected after a short settle delay and
//! drained until the board goes quiet.

use std::io::{Read, Write};

use crate::{
    clock::Clock,
    command::Command,
    constants,
    framing::{self, Escaped},
    session::{Session, SessionState},
    Error, Result,
};

impl<P, C> Session<P, C>
where
    P: Read + Write,
    C: Clock,
{
    /// Execute `command` on the board.
    ///
    /// If `expect_output` is set, the text printed by the command is
    /// returned (trimmed), `None` if it printed nothing.
    ///
    /// # Errors
    ///
    /// [`Error::Execution`] if the board output contains a traceback or an
    /// error, whether output was expected or not. Commands are never
    /// retried.
    pub fn exec(
        &mut self,
        command: &Command,
        expect_output: bool,
    ) -> Result<Option<String>> {
        self.expect_state(SessionState::Active)?;

        log::trace!("exec `{}`", command);

        let mut pkt = Vec::with_capacity(command.as_bytes().len() + 1);
        pkt.extend_from_slice(command.as_bytes());
        pkt.push(constants::EXECUTE);
        self.write_raw(&pkt)?;

        let timing = self.config.timing;
        let (port, clock) = self.io()?;
        if expect_output {
            clock.sleep(timing.output_settle);
        }
        let output =
            framing::drain(port, clock, timing.drain_interval, timing.drain_limit)?;

        classify(&output, expect_output)
    }
}

/// Turn the raw answer of the board into the text the caller cares about.
pub fn classify(raw: &[u8], expect_output: bool) -> Result<Option<String>> {
    if constants::ERROR_MARKERS
        .iter()
        .any(|marker| find(raw, marker).is_some())
    {
        log::debug!("board raised: {:?}", Escaped(raw));
        return Err(Error::Execution {
            output: String::from_utf8_lossy(raw).into_owned(),
        });
    }

    let text = scrub(raw);
    let text = String::from_utf8_lossy(&text);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if !expect_output {
        log::debug!("board printed: {}", text);
        return Ok(None);
    }

    Ok(Some(text.to_owned()))
}

/// Remove the raw REPL framing from every response in `raw`.
pub fn scrub(raw: &[u8]) -> Vec<u8> {
    let mut text = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while !rest.is_empty() {
        let (response, tail) = match find(rest, constants::RESPONSE_END) {
            Some(i) => (&rest[..i], &rest[i + constants::RESPONSE_END.len()..]),
            None => (rest, &[][..]),
        };

        let response = if response.starts_with(constants::RESPONSE_OK) {
            &response[constants::RESPONSE_OK.len()..]
        } else {
            response
        };
        text.extend(response.iter().filter(|&&b| b != constants::CTRL_D));

        rest = tail;
    }

    text
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|w| w == needle)
}

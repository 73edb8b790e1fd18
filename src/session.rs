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

use std::{
    fmt,
    io::{Read, Write},
};

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    constants,
    framing::{self, Escaped},
    Error, Result,
};

/// Lifecycle of a raw REPL session.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionState {
    Idle,
    /// Ctrl-C sent, waiting for the board to settle.
    Interrupting,
    /// Ctrl-A sent, waiting for the raw REPL banner.
    AwaitingBanner,
    /// Raw REPL entered, commands can be executed.
    Active,
    /// Ctrl-B sent, the session can't be used anymore.
    Exited,
}

/// An exclusive raw REPL session with a MicroPython board.
///
/// The session owns the port for its whole lifetime. Dropping an active
/// session leaves raw mode on the board.
pub struct Session<P, C = SystemClock>
where
    P: Read + Write,
{
    pub(crate) port: Option<P>,
    pub(crate) clock: C,
    pub(crate) config: Config,
    state: SessionState,
}

impl<P> Session<P, SystemClock>
where
    P: Read + Write,
{
    /// Open a session on an already opened port.
    ///
    /// This interrupts whatever the board is running and enters raw REPL
    /// mode.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the raw REPL banner didn't arrive in
    /// [`Timing::banner_timeout`](crate::config::Timing::banner_timeout).
    /// - [`Error::Handshake`] if the banner arrived empty.
    pub fn open(port: P, config: Config) -> Result<Self> {
        Session::open_with_clock(port, SystemClock, config)
    }
}

impl<P, C> Session<P, C>
where
    P: Read + Write,
    C: Clock,
{
    /// Same as [`Session::open`] but with a custom time source.
    pub fn open_with_clock(port: P, clock: C, config: Config) -> Result<Self> {
        let mut session = Session {
            port: Some(port),
            clock,
            config,
            state: SessionState::Idle,
        };

        session.interrupt()?;
        session.enter_raw_repl()?;

        Ok(session)
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The configuration this session was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Leave raw REPL mode and give back the port.
    ///
    /// The board isn't asked to confirm.
    pub fn exit(mut self) -> Result<P> {
        self.expect_state(SessionState::Active)?;
        self.send_exit()?;

        match self.port.take() {
            Some(port) => Ok(port),
            None => Err(Error::InvalidState {
                expected: SessionState::Active,
                found: self.state,
            }),
        }
    }

    pub(crate) fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected || self.port.is_none() {
            return Err(Error::InvalidState {
                expected,
                found: self.state,
            });
        }

        Ok(())
    }

    pub(crate) fn port_mut(&mut self) -> Result<&mut P> {
        let state = self.state;
        self.port.as_mut().ok_or(Error::InvalidState {
            expected: SessionState::Active,
            found: state,
        })
    }

    /// Port and clock borrowed together.
    pub(crate) fn io(&mut self) -> Result<(&mut P, &C)> {
        match self.port.as_mut() {
            Some(port) => Ok((port, &self.clock)),
            None => Err(Error::InvalidState {
                expected: SessionState::Active,
                found: self.state,
            }),
        }
    }

    pub(crate) fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        log::trace!("sending {:?}", Escaped(data));

        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;

        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        log::trace!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn interrupt(&mut self) -> Result<()> {
        log::debug!("Interrupting running program");
        self.transition(SessionState::Interrupting);

        self.write_raw(constants::INTERRUPT)?;
        self.write_raw(constants::INTERRUPT)?;

        // Whatever the interrupted program prints isn't framed, so give it
        // a moment and throw it away.
        self.clock.sleep(self.config.timing.interrupt_settle);
        let timing = self.config.timing;
        let (port, clock) = self.io()?;
        let discarded =
            framing::drain(port, clock, timing.drain_interval, timing.drain_limit)?;
        log::trace!("discarded {} bytes after interrupt", discarded.len());

        Ok(())
    }

    fn enter_raw_repl(&mut self) -> Result<()> {
        log::debug!("Entering raw REPL");
        self.write_raw(constants::ENTER_RAW_REPL)?;
        self.transition(SessionState::AwaitingBanner);

        let timing = self.config.timing;
        let (port, clock) = self.io()?;
        let banner = framing::read_until(
            port,
            clock,
            constants::BANNER_TERMINATOR,
            timing.banner_timeout,
            timing.poll_interval,
        )?;

        if banner.is_empty() {
            return Err(Error::Handshake("empty raw REPL banner".to_owned()));
        }

        log::debug!("Raw REPL entered");
        self.transition(SessionState::Active);

        Ok(())
    }

    fn send_exit(&mut self) -> Result<()> {
        log::debug!("Leaving raw REPL");
        self.write_raw(&[constants::EXIT_RAW_REPL])?;
        self.transition(SessionState::Exited);

        Ok(())
    }
}

impl<P, C> Drop for Session<P, C>
where
    P: Read + Write,
{
    fn drop(&mut self) {
        if self.state != SessionState::Active {
            return;
        }

        if let Some(port) = self.port.as_mut() {
            let res = port
                .write_all(&[constants::EXIT_RAW_REPL])
                .and_then(|_| port.flush());
            if let Err(e) = res {
                log::debug!("couldn't leave raw REPL on drop: {}", e);
            }
        }
        self.state = SessionState::Exited;
    }
}

impl<P, C> fmt::Debug for Session<P, C>
where
    P: Read + Write,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Session")
            .field("state", &self.state)
            .field("port", &())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{clock::ManualClock, sim::SimulatedBoard};

    #[test]
    fn test_open_enters_raw_repl() {
        let clock = ManualClock::new();
        let dir = tempfile::tempdir().unwrap();
        let board = SimulatedBoard::new(dir.path());

        let session =
            Session::open_with_clock(board, &clock, Config::default()).unwrap();
        assert_eq!(session.state(), SessionState::Active);

        let board = session.exit().unwrap();
        assert!(!board.in_raw_repl());
    }

    #[test]
    fn test_open_interrupts_twice() {
        let clock = ManualClock::new();
        let dir = tempfile::tempdir().unwrap();
        let board = SimulatedBoard::new(dir.path());

        let session =
            Session::open_with_clock(board, &clock, Config::default()).unwrap();
        let board = session.exit().unwrap();
        assert_eq!(board.interrupts(), 2);
    }

    #[test]
    fn test_silent_board_times_out() {
        let clock = ManualClock::new();
        let dir = tempfile::tempdir().unwrap();
        let board = SimulatedBoard::new(dir.path()).silent();
        let config = Config::default();

        let err = Session::open_with_clock(board, &clock, config.clone())
            .unwrap_err();

        match err {
            Error::Timeout { waited } => {
                assert!(waited >= config.timing.banner_timeout);
                assert!(
                    waited
                        < config.timing.banner_timeout
                            + config.timing.poll_interval
                );
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // Interrupt settle plus the banner deadline.
        assert!(
            clock.elapsed()
                >= config.timing.interrupt_settle + config.timing.banner_timeout
        );
        assert!(clock.elapsed() < Duration::from_secs(6));
    }

    #[test]
    fn test_empty_banner_is_a_handshake_error() {
        struct BannerOnly(Vec<u8>);

        impl Read for BannerOnly {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() {
                    return Err(std::io::ErrorKind::TimedOut.into());
                }
                let n = self.0.len().min(buf.len());
                self.0.drain(..n).zip(buf.iter_mut()).for_each(|(b, o)| *o = b);
                Ok(n)
            }
        }

        impl Write for BannerOnly {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if buf == constants::ENTER_RAW_REPL {
                    self.0.extend_from_slice(constants::BANNER_TERMINATOR);
                }
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let clock = ManualClock::new();
        let err = Session::open_with_clock(
            BannerOnly(Vec::new()),
            &clock,
            Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Handshake(_)));
    }

    #[test]
    fn test_drop_leaves_raw_repl() {
        let clock = ManualClock::new();
        let dir = tempfile::tempdir().unwrap();
        let board = SimulatedBoard::new(dir.path());
        let watcher = board.clone();

        let session =
            Session::open_with_clock(board, &clock, Config::default()).unwrap();
        assert!(watcher.in_raw_repl());
        drop(session);
        assert!(!watcher.in_raw_repl());
    }
}

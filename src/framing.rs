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

//! # Framing
//!
//! The serial stream has no framing of its own. These helpers read from it
//! until a known terminator shows up, or just take whatever is pending.

use std::{
    io::{self, Read},
    time::Duration,
};

use crate::{clock::Clock, Error, Result};

const READ_BUF_LEN: usize = 256;

/// Append what is pending on `port` to `buf`, without waiting for more.
///
/// Takes at most one read buffer per call. A read that times out (or would
/// block) means nothing is pending. Returns the number of bytes appended.
pub fn read_available<P>(port: &mut P, buf: &mut Vec<u8>) -> io::Result<usize>
where
    P: Read,
{
    let mut chunk = [0u8; READ_BUF_LEN];
    loop {
        match port.read(&mut chunk) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected EOF",
                ));
            }
            Ok(n) => {
                log::trace!("read {} bytes: {:?}", n, Escaped(&chunk[..n]));
                buf.extend_from_slice(&chunk[..n]);
                return Ok(n);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                return Ok(0);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => return Err(e),
        }
    }
}

/// Keep reading until the board goes quiet, sleeping `interval` between
/// reads.
///
/// Gives up after `limit` even if the board is still sending, and returns
/// what was collected so far.
pub fn drain<P, C>(
    port: &mut P,
    clock: &C,
    interval: Duration,
    limit: Duration,
) -> io::Result<Vec<u8>>
where
    P: Read,
    C: Clock,
{
    let start = clock.now();
    let mut data = Vec::new();
    while read_available(port, &mut data)? > 0 {
        let waited = clock.now().duration_since(start);
        if waited >= limit {
            log::debug!(
                "board still sending after {:?}, keeping {} bytes",
                waited,
                data.len()
            );
            break;
        }

        clock.sleep(interval.min(limit - waited));
    }

    Ok(data)
}

/// Read until the received bytes end with `terminator`.
///
/// Returns what came before the terminator. If the terminator didn't show up
/// within `timeout` (counted from the call) nothing is returned and the call
/// fails with [`Error::Timeout`], even while the board keeps sending. `poll`
/// is the sleep after a read that found nothing.
pub fn read_until<P, C>(
    port: &mut P,
    clock: &C,
    terminator: &[u8],
    timeout: Duration,
    poll: Duration,
) -> Result<Vec<u8>>
where
    P: Read,
    C: Clock,
{
    log::trace!("waiting up to {:?} for {:?}", timeout, Escaped(terminator));

    let start = clock.now();
    let mut data = Vec::new();
    loop {
        let n = read_available(port, &mut data)?;
        if n > 0 && data.ends_with(terminator) {
            data.truncate(data.len() - terminator.len());
            return Ok(data);
        }

        let waited = clock.now().duration_since(start);
        if waited >= timeout {
            log::trace!("terminator not found, discarding {} bytes", data.len());
            return Err(Error::Timeout { waited });
        }

        if n == 0 {
            clock.sleep(poll.min(timeout - waited));
        }
    }
}

/// Debug formatting of raw bytes, printable ASCII is shown as is.
pub(crate) struct Escaped<'a>(pub &'a [u8]);

impl std::fmt::Debug for Escaped<'_> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "\"")?;
        for &b in self.0 {
            write!(fmt, "{}", std::ascii::escape_default(b))?;
        }
        write!(fmt, "\"")
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use super::*;
    use crate::clock::ManualClock;

    /// Port that hands out one scripted burst per read, then times out
    /// once between bursts.
    struct ScriptedPort {
        bursts: VecDeque<Vec<u8>>,
        gaps: bool,
        gap: bool,
    }

    impl ScriptedPort {
        fn new(bursts: &[&[u8]]) -> Self {
            ScriptedPort {
                bursts: bursts.iter().map(|b| b.to_vec()).collect(),
                gaps: true,
                gap: false,
            }
        }

        /// Bursts follow each other without a quiet read in between.
        fn back_to_back(mut self) -> Self {
            self.gaps = false;
            self
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.gap {
                self.gap = false;
                return Err(io::ErrorKind::TimedOut.into());
            }
            match self.bursts.pop_front() {
                Some(burst) => {
                    let n = burst.len().min(buf.len());
                    buf[..n].copy_from_slice(&burst[..n]);
                    if n < burst.len() {
                        self.bursts.push_front(burst[n..].to_vec());
                    } else {
                        self.gap = self.gaps;
                    }
                    Ok(n)
                }
                None => Err(io::ErrorKind::TimedOut.into()),
            }
        }
    }

    /// Board that never stops printing. Every read returns one byte and
    /// takes a millisecond.
    struct Chatty<'a> {
        clock: &'a ManualClock,
        reads: usize,
    }

    impl<'a> Chatty<'a> {
        fn new(clock: &'a ManualClock) -> Self {
            Chatty { clock, reads: 0 }
        }
    }

    impl Read for Chatty<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.clock.sleep(Duration::from_millis(1));
            self.reads += 1;
            buf[0] = b'x';
            Ok(1)
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(100);
    const POLL: Duration = Duration::from_millis(10);
    const INTERVAL: Duration = Duration::from_millis(5);

    #[test]
    fn test_read_until_strips_terminator() {
        let clock = ManualClock::new();
        let mut port =
            ScriptedPort::new(&[&b"\r\nraw REPL; CTRL"[..], &b"-B to exit\r\n>"[..]]);

        let banner = b"raw REPL; CTRL-B to exit\r\n>";
        let data =
            read_until(&mut port, &clock, banner, TIMEOUT, POLL).unwrap();

        assert_eq!(data, b"\r\n");
        assert!(clock.elapsed() < TIMEOUT);
    }

    #[test]
    fn test_read_until_times_out_at_deadline() {
        let clock = ManualClock::new();
        let mut port = ScriptedPort::new(&[&b"noise without the terminator"[..]]);

        match read_until(&mut port, &clock, b"\x04>", TIMEOUT, POLL) {
            Err(Error::Timeout { waited }) => {
                assert!(waited >= TIMEOUT);
                assert!(waited < TIMEOUT + POLL);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(clock.elapsed() >= TIMEOUT);
        assert!(clock.elapsed() < TIMEOUT + POLL);
    }

    #[test]
    fn test_read_until_times_out_on_chatty_port() {
        let clock = ManualClock::new();
        let mut port = Chatty::new(&clock);

        match read_until(&mut port, &clock, b"\x04>", TIMEOUT, POLL) {
            Err(Error::Timeout { waited }) => {
                assert!(waited >= TIMEOUT);
                assert!(waited < TIMEOUT + POLL);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(clock.elapsed() < TIMEOUT + POLL);
        assert!(port.reads <= 100);
    }

    #[test]
    fn test_read_until_silent_port() {
        let clock = ManualClock::new();
        let mut port = ScriptedPort::new(&[]);

        let err = read_until(&mut port, &clock, b">", TIMEOUT, POLL).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_read_available_reports_eof() {
        let mut port: &[u8] = &[];
        let mut buf = Vec::new();
        let err = read_available(&mut port, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_drain_collects_all_bursts() {
        let clock = ManualClock::new();
        let mut port =
            ScriptedPort::new(&[&b"OK"[..], &b"hello\x04"[..], &b"\x04>"[..]])
                .back_to_back();

        let data = drain(&mut port, &clock, INTERVAL, TIMEOUT).unwrap();
        assert_eq!(data, b"OKhello\x04\x04>");
        assert_eq!(clock.elapsed(), INTERVAL * 3);
    }

    #[test]
    fn test_drain_stops_when_quiet() {
        let clock = ManualClock::new();
        let mut port = ScriptedPort::new(&[&b"OK\x04"[..], &b"late"[..]]);

        let data = drain(&mut port, &clock, INTERVAL, TIMEOUT).unwrap();
        assert_eq!(data, b"OK\x04");
    }

    #[test]
    fn test_drain_gives_up_on_chatty_port() {
        let clock = ManualClock::new();
        let mut port = Chatty::new(&clock);

        let data = drain(&mut port, &clock, INTERVAL, TIMEOUT).unwrap();
        assert!(!data.is_empty());
        assert!(data.iter().all(|&b| b == b'x'));
        assert!(clock.elapsed() >= TIMEOUT);
        assert!(clock.elapsed() < TIMEOUT + INTERVAL);
    }
}

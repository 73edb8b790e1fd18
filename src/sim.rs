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

//! # Simulated board
//!
//! An in-memory stand-in for a MicroPython board with the file receiver
//! module installed. It speaks enough of the friendly and raw REPL to run a
//! whole transfer, executing the receiver commands against a
//! [`FileReceiver`] rooted at a local directory.
//!
//! Handles are cheap to clone and share the same board, so a test can keep
//! one to inspect the board after giving another to a session.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, Read, Write},
    path::PathBuf,
    rc::Rc,
};

use crate::{
    command::parse_literal,
    config::Vocabulary,
    constants::{BANNER_TERMINATOR, CTRL_A, CTRL_B, CTRL_C, CTRL_D},
    receiver::FileReceiver,
};

const FRIENDLY_BANNER: &[u8] = b"\r\nMicroPython (simulated); Raspberry Pi Pico with RP2040\r\nType \"help()\" for more information.\r\n>>> ";
const FRIENDLY_PROMPT: &[u8] = b"\r\n>>> ";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Mode {
    Friendly,
    Raw,
}

#[derive(Debug)]
struct Board {
    vocabulary: Vocabulary,
    receiver: FileReceiver,
    mode: Mode,
    line: Vec<u8>,
    output: VecDeque<u8>,
    imported: bool,
    bound: bool,
    silent: bool,
    failures: Vec<String>,
    executed: Vec<String>,
    interrupts: usize,
}

/// A simulated MicroPython board usable as a port.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    board: Rc<RefCell<Board>>,
}

impl SimulatedBoard {
    /// A board whose filesystem root is the local directory `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        SimulatedBoard {
            board: Rc::new(RefCell::new(Board {
                vocabulary: Vocabulary::default(),
                receiver: FileReceiver::new(root),
                mode: Mode::Friendly,
                line: Vec::new(),
                output: VecDeque::new(),
                imported: false,
                bound: false,
                silent: false,
                failures: Vec::new(),
                executed: Vec::new(),
                interrupts: 0,
            })),
        }
    }

    /// Use other names for the receiver module, class and methods.
    pub fn with_vocabulary(self, vocabulary: Vocabulary) -> Self {
        self.board.borrow_mut().vocabulary = vocabulary;
        self
    }

    /// The board accepts everything and never answers.
    pub fn silent(self) -> Self {
        self.board.borrow_mut().silent = true;
        self
    }

    /// Commands containing `pattern` raise instead of executing.
    pub fn fail_when<S: Into<String>>(self, pattern: S) -> Self {
        self.board.borrow_mut().failures.push(pattern.into());
        self
    }

    /// Every command executed in raw mode, in order.
    pub fn executed(&self) -> Vec<String> {
        self.board.borrow().executed.clone()
    }

    pub fn in_raw_repl(&self) -> bool {
        self.board.borrow().mode == Mode::Raw
    }

    /// Number of Ctrl-C received.
    pub fn interrupts(&self) -> usize {
        self.board.borrow().interrupts
    }
}

impl Read for SimulatedBoard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut board = self.board.borrow_mut();
        if board.output.is_empty() {
            return Err(io::ErrorKind::TimedOut.into());
        }

        let n = board.output.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(board.output.drain(..n)) {
            *dst = src;
        }

        Ok(n)
    }
}

impl Write for SimulatedBoard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut board = self.board.borrow_mut();
        if !board.silent {
            for &byte in buf {
                board.receive(byte);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Board {
    fn emit(&mut self, data: &[u8]) {
        self.output.extend(data.iter().copied());
    }

    fn receive(&mut self, byte: u8) {
        if byte == CTRL_C {
            self.interrupts += 1;
        }

        match (self.mode, byte) {
            (Mode::Friendly, CTRL_A) | (Mode::Raw, CTRL_A) => {
                self.mode = Mode::Raw;
                self.line.clear();
                self.emit(b"\r\n");
                self.emit(BANNER_TERMINATOR);
            }
            (Mode::Friendly, CTRL_C) | (Mode::Friendly, b'\r') => {
                self.emit(FRIENDLY_PROMPT);
            }
            (Mode::Friendly, b) => self.emit(&[b]),
            (Mode::Raw, CTRL_B) => {
                self.mode = Mode::Friendly;
                self.line.clear();
                self.emit(FRIENDLY_BANNER);
            }
            (Mode::Raw, CTRL_C) => self.line.clear(),
            (Mode::Raw, CTRL_D) => {
                let line = std::mem::take(&mut self.line);
                let statement = String::from_utf8_lossy(&line).trim().to_owned();
                let (stdout, stderr) = self.execute(&statement);

                self.emit(b"OK");
                self.emit(stdout.as_bytes());
                self.emit(&[CTRL_D]);
                self.emit(stderr.as_bytes());
                self.emit(&[CTRL_D, b'>']);
            }
            (Mode::Raw, b) => self.line.push(b),
        }
    }

    /// Run one statement, returns what it printed to stdout and stderr.
    fn execute(&mut self, statement: &str) -> (String, String) {
        self.executed.push(statement.to_owned());

        if self.failures.iter().any(|f| statement.contains(f.as_str())) {
            return (String::new(), traceback("OSError: [Errno 5] EIO"));
        }

        match self.run(statement) {
            Ok(stdout) => (stdout, String::new()),
            Err(message) => (String::new(), traceback(&message)),
        }
    }

    fn run(&mut self, statement: &str) -> Result<String, String> {
        let v = self.vocabulary.clone();

        if statement.is_empty() || statement == "pass" {
            return Ok(String::new());
        }

        if let Some(module) = strip(statement, "from ", " import *") {
            if module != v.module {
                return Err(format!("ImportError: no module named '{}'", module));
            }
            self.imported = true;
            return Ok(String::new());
        }

        if let Some(arg) = strip(statement, "print(", ")") {
            if arg == format!("{}.{}", v.variable, v.digest_attr) {
                self.check_bound(&v)?;
                let digest = self.receiver.digest();
                return Ok(format!("{}\r\n", digest.as_deref().unwrap_or("None")));
            }
            return literal(arg).map(|text| format!("{}\r\n", text));
        }

        let open_prefix = format!("{} = {}(", v.variable, v.class);
        if let Some(arg) = strip(statement, &open_prefix, ")") {
            if !self.imported {
                return Err(format!("NameError: name '{}' isn't defined", v.class));
            }
            let path = literal(arg)?;
            self.receiver.open(&path).map_err(|e| e.to_string())?;
            self.bound = true;
            return Ok(String::new());
        }

        let write_prefix = format!("{}.{}(", v.variable, v.write_method);
        if let Some(arg) = strip(statement, &write_prefix, ")") {
            self.check_bound(&v)?;
            let encoded = literal(arg)?;
            self.receiver.w(&encoded).map_err(|e| e.to_string())?;
            return Ok(String::new());
        }

        if statement == format!("{}.{}()", v.variable, v.close_method) {
            self.check_bound(&v)?;
            self.receiver.close().map_err(|e| e.to_string())?;
            return Ok(String::new());
        }

        Err("SyntaxError: invalid syntax".to_owned())
    }

    fn check_bound(&self, v: &Vocabulary) -> Result<(), String> {
        if !self.bound {
            return Err(format!("NameError: name '{}' isn't defined", v.variable));
        }

        Ok(())
    }
}

fn strip<'a>(s: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    if s.len() < prefix.len() + suffix.len() {
        return None;
    }

    if s.starts_with(prefix) && s.ends_with(suffix) {
        Some(&s[prefix.len()..s.len() - suffix.len()])
    } else {
        None
    }
}

fn literal(arg: &str) -> Result<String, String> {
    parse_literal(arg).ok_or_else(|| "SyntaxError: invalid syntax".to_owned())
}

fn traceback(message: &str) -> String {
    format!(
        "Traceback (most recent call last):\r\n  File \"<stdin>\", line 1, in <module>\r\n{}\r\n",
        message
    )
}

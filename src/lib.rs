// Copyright 2026 Locha Mesh Developers <contact@locha.io>
//
// Based on the raw REPL protocol of the MicroPython interpreter.
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

//! # Raw REPL file transfer library
//!
//! Push files to a MicroPython board using nothing but its serial REPL.
//!
//! The board is put into raw REPL mode, a small file receiver object is
//! created on it, and the file is streamed in base64 encoded chunks of
//! [`constants::CHUNK_SIZE`] bytes. Both ends compute the SHA-256 of the
//! data so the result can be verified.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use serial::SerialPort;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut port = serial::open("/dev/ttyACM0")?;
//! port.configure(&rawrepl_xfer::config::port_settings())?;
//! port.set_timeout(Duration::from_millis(10))?;
//!
//! let mut session = rawrepl_xfer::Session::open(port, Default::default())?;
//! let result = rawrepl_xfer::upload(&mut session, "main.py", "/main.py")?;
//! session.exit()?;
//!
//! println!("digest match: {}", result.matched);
//! # Ok(())
//! # }
//! ```
//!
//! # Board side
//!
//! The board must have a module providing the receiver class, see
//! [`config::Vocabulary`]. [`receiver::FileReceiver`] is the reference of
//! its behaviour and [`sim::SimulatedBoard`] runs it behind a fake REPL.
//!
//! # See also
//!
//! - [MicroPython raw REPL](https://docs.micropython.org/en/latest/reference/repl.html#raw-mode-and-raw-paste-mode).

pub mod chunk;
pub mod clock;
pub mod command;
pub mod config;
#[rustfmt::skip]
pub mod constants;
pub mod framing;
pub mod ports;
pub mod receiver;
pub mod sim;

mod error;
mod exec;
mod session;
mod upload;

pub use self::error::{Error, Result};
pub use self::session::{Session, SessionState};
pub use self::upload::{upload, upload_with_progress, Progress, TransferResult};

pub use self::exec::{classify, scrub};

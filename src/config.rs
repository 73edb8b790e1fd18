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

//! # Configuration
//!
//! Timing and naming knobs of the transfer protocol. The defaults match a
//! stock MicroPython board with the file receiver module installed.

use std::time::Duration;

/// Delays and deadlines used by the session.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Timing {
    /// How long the interrupted board gets to print its noise before it is
    /// discarded.
    pub interrupt_settle: Duration,
    /// Deadline for the raw REPL banner.
    pub banner_timeout: Duration,
    /// Sleep between polls of the framed reader.
    pub poll_interval: Duration,
    /// Wait before collecting the output of a command that prints.
    pub output_settle: Duration,
    /// Sleep between drains while the board keeps sending.
    pub drain_interval: Duration,
    /// Longest a drain keeps reading from a board that doesn't go quiet.
    pub drain_limit: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            interrupt_settle: Duration::from_millis(100),
            banner_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            output_settle: Duration::from_millis(300),
            drain_interval: Duration::from_millis(5),
            drain_limit: Duration::from_secs(1),
        }
    }
}

/// Names of the file receiver on the board side.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Vocabulary {
    /// Module that defines the receiver class.
    pub module: String,
    pub class: String,
    /// Name bound to the receiver instance during the session.
    pub variable: String,
    pub write_method: String,
    pub close_method: String,
    pub digest_attr: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary {
            module: "ttboard.util.file_xfer".to_owned(),
            class: "FileWriter".to_owned(),
            variable: "f".to_owned(),
            write_method: "w".to_owned(),
            close_method: "close".to_owned(),
            digest_attr: "digest".to_owned(),
        }
    }
}

/// Everything a [`Session`](crate::Session) needs to know.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Config {
    pub timing: Timing,
    pub vocabulary: Vocabulary,
}

/// Default serial port settings.
///
/// MicroPython boards ignore the baudrate on USB CDC ports, it only matters
/// for boards behind an USB-UART bridge.
pub fn port_settings() -> serial::PortSettings {
    serial::PortSettings {
        baud_rate: serial::BaudRate::Baud115200,
        char_size: serial::CharSize::Bits8,
        parity: serial::Parity::ParityNone,
        stop_bits: serial::StopBits::Stop1,
        flow_control: serial::FlowControl::FlowNone,
    }
}

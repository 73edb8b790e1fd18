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

pub const CTRL_A: u8                    = 0x01;
pub const CTRL_B: u8                    = 0x02;
pub const CTRL_C: u8                    = 0x03;
pub const CTRL_D: u8                    = 0x04;

/// Interrupt whatever is running, written twice on session start.
pub const INTERRUPT: &[u8]              = b"\r\x03";
/// Enter raw REPL mode.
pub const ENTER_RAW_REPL: &[u8]         = b"\r\x01";
/// Execute the command buffered so far.
pub const EXECUTE: u8                   = CTRL_D;
/// Leave raw REPL mode, back to the friendly REPL.
pub const EXIT_RAW_REPL: u8             = CTRL_B;

/// Emitted by the board once raw mode is entered.
pub const BANNER_TERMINATOR: &[u8]      = b"raw REPL; CTRL-B to exit\r\n>";

/// Start of every raw REPL response.
pub const RESPONSE_OK: &[u8]            = b"OK";
/// End of every raw REPL response: stderr terminator and prompt.
pub const RESPONSE_END: &[u8]           = b"\x04>";
/// Response of a command that printed nothing.
pub const SUCCESS_MARKER: &[u8]         = b"OK\x04\x04>";

/// Any of these in the raw output means the command raised.
pub const ERROR_MARKERS: [&[u8]; 2]     = [b"Traceback", b"Error"];

/// Maximum raw bytes per write command.
pub const CHUNK_SIZE: usize             = 256;
/// Length of a hex encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize         = 64;

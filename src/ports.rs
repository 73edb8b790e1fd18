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

//! # Serial port discovery
//!
//! Lists the serial ports of the system and points out the ones that look
//! like a MicroPython board.

use std::ffi::OsString;

#[cfg(target_os = "linux")]
mod list_linux;

/// USB vendors shipping boards that run MicroPython out of the box.
const BOARD_VENDORS: &[(u16, &str)] = &[
    (0x2E8A, "Raspberry Pi"),
    (0xF055, "MicroPython"),
    (0x303A, "Espressif"),
];

/// Information about an available serial port.
#[derive(Debug)]
pub struct PortInfo {
    pub port: OsString,
    pub name: OsString,
    pub usb_info: Option<PortUsbInfo>,
}

impl PortInfo {
    /// List all serial ports on the system.
    #[cfg(target_os = "linux")]
    pub fn list_all() -> Vec<PortInfo> {
        self::list_linux::list_all()
    }

    /// List all serial ports on the system.
    ///
    /// Only Linux is supported for now, elsewhere the list is empty and
    /// the port has to be given explicitly.
    #[cfg(not(target_os = "linux"))]
    pub fn list_all() -> Vec<PortInfo> {
        Vec::new()
    }

    /// Vendor name if the port belongs to a known MicroPython board vendor.
    pub fn board_vendor(&self) -> Option<&'static str> {
        self.usb_info.as_ref().and_then(|usb| board_vendor(usb.vid))
    }
}

/// Information about USB serial ports.
#[derive(Debug)]
pub struct PortUsbInfo {
    /// Number of interfaces in this device.
    pub num_if: usize,
    /// USB Vendor ID.
    pub vid: u16,
    /// USB Product ID.
    pub pid: u16,
    /// Serial number string.
    pub serial: Option<String>,
    /// Device manufacturer.
    pub manufacturer: Option<String>,
    /// Device product description.
    pub product: Option<String>,
    /// Device product interface.
    pub interface: Option<String>,
}

fn board_vendor(vid: u16) -> Option<&'static str> {
    BOARD_VENDORS
        .iter()
        .find(|(v, _)| *v == vid)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod test {
    use super::*;

    fn usb_port(vid: u16) -> PortInfo {
        PortInfo {
            port: "/dev/ttyACM0".into(),
            name: "ttyACM0".into(),
            usb_info: Some(PortUsbInfo {
                num_if: 2,
                vid,
                pid: 0x0005,
                serial: None,
                manufacturer: None,
                product: None,
                interface: None,
            }),
        }
    }

    #[test]
    fn test_board_vendor() {
        assert_eq!(usb_port(0x2E8A).board_vendor(), Some("Raspberry Pi"));
        assert_eq!(usb_port(0x0403).board_vendor(), None);

        let builtin = PortInfo {
            port: "/dev/ttyS0".into(),
            name: "ttyS0".into(),
            usb_info: None,
        };
        assert_eq!(builtin.board_vendor(), None);
    }
}

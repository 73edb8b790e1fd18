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
    ffi::OsString,
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use super::{PortInfo, PortUsbInfo};

/// Device nodes worth looking at, boards usually show up as CDC-ACM.
const PATTERNS: &[&str] = &[
    "/dev/ttyACM*", // usb-serial with CDC-ACM profile (RP2040, pyboard)
    "/dev/ttyUSB*", // usb-serial bridges (ESP32 dev kits)
    "/dev/ttyAMA*", // ARM internal port (raspi)
    "/dev/ttyS*",   // Built-in serial ports
];

fn read_line<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = BufReader::new(File::open(path)?);

    let mut line = String::new();
    file.read_line(&mut line)?;

    Ok(line.trim().to_owned())
}

fn read_hex_u16<P: AsRef<Path>>(path: P) -> io::Result<u16> {
    let line = read_line(path)?;
    u16::from_str_radix(&line, 16)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn pathdir(mut path: PathBuf) -> PathBuf {
    path.pop();
    path
}

fn usb_info(usb_int: PathBuf) -> io::Result<PortUsbInfo> {
    let usb_dev = pathdir(usb_int.clone());

    Ok(PortUsbInfo {
        num_if: read_line(usb_dev.join("bNumInterfaces"))
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(1),
        vid: read_hex_u16(usb_dev.join("idVendor"))?,
        pid: read_hex_u16(usb_dev.join("idProduct"))?,
        serial: read_line(usb_dev.join("serial")).ok(),
        manufacturer: read_line(usb_dev.join("manufacturer")).ok(),
        product: read_line(usb_dev.join("product")).ok(),
        interface: read_line(usb_int.join("interface")).ok(),
    })
}

fn port_info(port: &Path) -> io::Result<Option<PortInfo>> {
    let name = match port.file_name() {
        Some(name) => name.to_owned(),
        None => return Ok(None),
    };

    let device_path = Path::new("/sys/class/tty").join(&name).join("device");
    if !device_path.exists() {
        // Virtual terminals and unused ttyS entries have no device.
        return Ok(None);
    }

    let subsystem =
        fs::canonicalize(fs::canonicalize(&device_path)?.join("subsystem"))?;
    let usb_int = match subsystem.file_name().and_then(|s| s.to_str()) {
        // We don't want internal serial ports.
        Some("platform") => return Ok(None),
        Some("usb-serial") => Some(pathdir(fs::canonicalize(&device_path)?)),
        Some("usb") => Some(fs::canonicalize(&device_path)?),
        _ => None,
    };

    let usb_info = match usb_int {
        Some(usb_int) => Some(usb_info(usb_int)?),
        None => None,
    };

    Ok(Some(PortInfo {
        port: OsString::from(port),
        name,
        usb_info,
    }))
}

pub fn list_all() -> Vec<PortInfo> {
    let mut available = Vec::new();
    for pattern in PATTERNS {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                log::debug!("bad port pattern `{}`: {}", pattern, e);
                continue;
            }
        };

        for path in paths.flatten() {
            match port_info(&path) {
                Ok(Some(info)) => available.push(info),
                Ok(None) => (),
                Err(e) => {
                    log::debug!("skipping `{}`: {}", path.display(), e)
                }
            }
        }
    }

    available
}

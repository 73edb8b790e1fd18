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

#[cfg(windows)]
use std::ffi::OsString;
use std::{path::PathBuf, time::Duration};

use rawrepl_xfer::config::{Config, Timing, Vocabulary};

use anyhow::Result;
use clap::{crate_authors, crate_version, App, AppSettings, Arg, SubCommand};

mod list;
mod upload;

#[cfg(unix)]
const DEFAULT_PORT: &str = "/dev/ttyACM0";
#[cfg(windows)]
const DEFAULT_PORT: &str = "COM0";

const LOG_ENV: &str = "RAWREPL_XFER_LOG";

fn main() -> Result<()> {
    let args = cli().get_matches_safe()?;

    init_logger(args.occurrences_of("verbose"));

    let global_args = GlobalArgs {
        #[cfg(unix)]
        port: args.value_of("port").unwrap_or(DEFAULT_PORT).parse()?,
        #[cfg(windows)]
        port: OsString::from(args.value_of("port").unwrap_or(DEFAULT_PORT)),
        baudrate: args
            .value_of("baudrate")
            .unwrap_or("115200")
            .parse::<usize>()
            .map(usize_to_baudrate)?,
        simulate: args.value_of("simulate").map(PathBuf::from),
        config: Config {
            timing: Timing {
                banner_timeout: Duration::from_secs(
                    args.value_of("banner-timeout").unwrap_or("5").parse()?,
                ),
                ..Timing::default()
            },
            vocabulary: Vocabulary {
                module: args
                    .value_of("module")
                    .map(str::to_owned)
                    .unwrap_or_else(|| Vocabulary::default().module),
                ..Vocabulary::default()
            },
        },
    };

    match args.subcommand() {
        ("upload", Some(m)) => upload::upload(m, &global_args)?,
        ("list", Some(_)) => list::list()?,
        _ => {
            println!("Error: Sub-command required");
            println!("{}", args.usage());
        }
    }

    Ok(())
}

fn init_logger(verbosity: u64) {
    if std::env::var_os(LOG_ENV).is_none() {
        match verbosity {
            0 => (),
            1 => std::env::set_var(LOG_ENV, "debug"),
            _ => std::env::set_var(LOG_ENV, "trace"),
        }
    }

    #[cfg(feature = "pretty-env-logger")]
    pretty_env_logger::init_custom_env(LOG_ENV);
    #[cfg(not(feature = "pretty-env-logger"))]
    env_logger::init_from_env(LOG_ENV);
}

pub struct GlobalArgs {
    #[cfg(unix)]
    pub port: PathBuf,
    #[cfg(windows)]
    pub port: OsString,
    pub baudrate: serial::BaudRate,
    /// Run against a simulated board rooted at this directory.
    pub simulate: Option<PathBuf>,
    pub config: Config,
}

impl GlobalArgs {
    pub fn port_to_string(&self) -> String {
        #[cfg(unix)]
        let port = self.port.display().to_string();
        #[cfg(windows)]
        let port = self.port.to_string_lossy().into_owned();

        port
    }
}

fn usize_to_baudrate(baudrate: usize) -> serial::BaudRate {
    match baudrate {
        9600 => serial::BaudRate::Baud9600,
        19200 => serial::BaudRate::Baud19200,
        38400 => serial::BaudRate::Baud38400,
        57600 => serial::BaudRate::Baud57600,
        115200 => serial::BaudRate::Baud115200,
        n => serial::BaudRate::BaudOther(n),
    }
}

pub fn baudrate_to_usize(baudrate: serial::BaudRate) -> usize {
    match baudrate {
        serial::BaudRate::Baud110 => 110,
        serial::BaudRate::Baud300 => 300,
        serial::BaudRate::Baud600 => 600,
        serial::BaudRate::Baud1200 => 1200,
        serial::BaudRate::Baud2400 => 2400,
        serial::BaudRate::Baud4800 => 4800,
        serial::BaudRate::Baud9600 => 9600,
        serial::BaudRate::Baud19200 => 19200,
        serial::BaudRate::Baud38400 => 38400,
        serial::BaudRate::Baud57600 => 57600,
        serial::BaudRate::Baud115200 => 115200,
        serial::BaudRate::BaudOther(n) => n,
    }
}

fn cli() -> App<'static, 'static> {
    let app = App::new("MicroPython raw REPL file transfer")
        .usage("rawrepl-xfer [OPTIONS] [SUBCOMMAND]")
        .setting(AppSettings::ColoredHelp)
        .version(crate_version!())
        .author(crate_authors!())
        .about("Upload files to a MicroPython board through its serial REPL")
        .arg(
            opt("port", "Serial port to use")
                .short("p")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
        )
        .arg(
            opt("baudrate", "Serial port baudrate")
                .short("b")
                .takes_value(true)
                .default_value("115200")
        )
        .arg(
            opt("module", "Board module providing the file receiver")
                .short("m")
                .takes_value(true)
                .default_value("ttboard.util.file_xfer")
        )
        .arg(
            opt("banner-timeout", "Seconds to wait for the raw REPL banner")
                .takes_value(true)
                .default_value("5")
        )
        .arg(
            opt(
                "simulate",
                "Don't open a serial port, upload to a simulated board whose filesystem root is this local directory"
            )
                .takes_value(true)
                .value_name("DIR")
        )
        .arg(
            opt("verbose", "Use verbose output: -v (debug), -vv (trace)")
                .short("v")
                .multiple(true)
        )
        .subcommand(
            SubCommand::with_name("upload")
                .about("Upload a file to the board")
                .setting(AppSettings::ColoredHelp)
                .arg(
                    Arg::with_name("LOCAL")
                        .required(true)
                        .takes_value(true)
                        .help("Local file to send")
                )
                .arg(
                    Arg::with_name("REMOTE")
                        .required(true)
                        .takes_value(true)
                        .help("Full path of the file on the board, e.g. /lib/module.py")
                )
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List serial ports")
                .setting(AppSettings::ColoredHelp)
        );

    // When double clicking the binary the binary will be paused. Useful on
    // windows, since the Console window will be closed inmediately.
    #[cfg(windows)]
    let app = app.setting(AppSettings::WaitOnError);

    app
}

fn opt(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name).long(name).help(help)
}

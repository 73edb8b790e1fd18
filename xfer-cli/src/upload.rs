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
    io::{Read, Write},
    path::PathBuf,
    time::Duration,
};

use rawrepl_xfer::{config::Config, sim::SimulatedBoard, Session, TransferResult};
use serial::SerialPort;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};

use crate::GlobalArgs;

/// Read timeout of the serial port, every drain waits this long once the
/// board goes quiet.
const PORT_TIMEOUT: Duration = Duration::from_millis(10);

/// Upload subcommand entry point.
pub fn upload(matches: &ArgMatches<'_>, global_args: &GlobalArgs) -> Result<()> {
    let opts = UploadOpts::from_matches(matches)?;

    // Checked before touching the board at all.
    if !opts.local.is_file() {
        println!("I cannot find \"{}\" to send", opts.local.display());
        return Ok(());
    }

    if !opts.remote.starts_with('/') {
        log::warn!(
            "Remote path `{}` isn't absolute, it will be taken from `/`",
            opts.remote
        );
    }

    if let Some(root) = global_args.simulate.as_ref() {
        log::info!("Simulating a board at `{}`", root.display());
        let board = SimulatedBoard::new(root.clone())
            .with_vocabulary(global_args.config.vocabulary.clone());
        return transfer(board, global_args.config.clone(), &opts);
    }

    log::info!("Opening serial port `{}`", global_args.port_to_string());
    log::info!("Baudrate: {}", crate::baudrate_to_usize(global_args.baudrate));
    let mut port =
        serial::SystemPort::open(&global_args.port).with_context(|| {
            format!(
                "Couldn't open serial port `{}`",
                global_args.port_to_string()
            )
        })?;

    let mut settings = rawrepl_xfer::config::port_settings();
    settings.baud_rate = global_args.baudrate;

    port.set_timeout(PORT_TIMEOUT)?;
    port.configure(&settings)?;

    transfer(port, global_args.config.clone(), &opts)
}

fn transfer<P>(port: P, config: Config, opts: &UploadOpts) -> Result<()>
where
    P: Read + Write,
{
    log::info!("Entering raw REPL");
    let mut session =
        Session::open(port, config).context("Couldn't enter raw REPL")?;

    let total = std::fs::metadata(&opts.local)
        .with_context(|| format!("Couldn't read `{}`", opts.local.display()))?
        .len();
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:40}] {bytes}/{total_bytes} ({eta})")
            .progress_chars("=> "),
    );

    let result = rawrepl_xfer::upload_with_progress(
        &mut session,
        &opts.local,
        &opts.remote,
        |progress| bar.set_position(progress.bytes_sent),
    );
    bar.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            if e.is_fatal_to_session() {
                log::error!(
                    "The board stopped answering, reset it before trying again"
                );
            }
            return Err(e).with_context(|| {
                format!(
                    "Couldn't upload `{}` to `{}`",
                    opts.local.display(),
                    opts.remote
                )
            });
        }
    };

    session.exit().context("Couldn't leave raw REPL")?;

    report(&result);
    result
        .verify()
        .context("The file was written but it may be corrupt")?;

    Ok(())
}

fn report(result: &TransferResult) {
    println!(
        "Sent {} bytes in {} chunks",
        result.bytes_sent, result.chunks
    );
    println!("Local digest:  {}", result.local_digest);
    println!("Remote digest: {}", result.remote_digest);

    let (ok, mismatch) = ("Digest OK", "Digest MISMATCH");
    #[cfg(unix)]
    {
        use ansi_term::Colour::{Green, Red};

        if result.matched {
            println!("{}", Green.bold().paint(ok));
        } else {
            println!("{}", Red.bold().paint(mismatch));
        }
    }
    #[cfg(not(unix))]
    {
        println!("{}", if result.matched { ok } else { mismatch });
    }
}

struct UploadOpts {
    local: PathBuf,
    remote: String,
}

impl UploadOpts {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<UploadOpts> {
        let local = matches
            .value_of("LOCAL")
            .context("Missing local file")?
            .parse::<PathBuf>()
            .context("Invalid local file path")?;
        let remote = matches
            .value_of("REMOTE")
            .context("Missing remote path")?
            .to_owned();

        if remote.is_empty() {
            bail!("Remote path can't be empty");
        }

        Ok(UploadOpts { local, remote })
    }
}

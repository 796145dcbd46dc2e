/*
    ffdrive
    https://github.com/dbalsom/fluxfox

    Copyright 2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/
use bpaf::*;
use fluxfox_drive::DriveConfig;
use std::fmt::{self, Display, Formatter};

use crate::{
    read::args::{read_parser, ReadParams},
    seek::args::{seek_parser, SeekParams},
    write::args::{write_parser, WriteParams},
};

#[derive(Clone, Debug)]
pub enum Command {
    Version,
    Read(ReadParams),
    Write(WriteParams),
    Seek(SeekParams),
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Command::Version => write!(f, "version"),
            Command::Read(_) => write!(f, "read"),
            Command::Write(_) => write!(f, "write"),
            Command::Seek(_) => write!(f, "seek"),
        }
    }
}

#[derive(Debug)]
pub struct AppParams {
    pub global: GlobalOptions,
    pub command: Command,
}

#[derive(Debug)]
pub struct GlobalOptions {
    pub silent: bool,
    pub rpm: Option<u32>,
    pub settle_ms: Option<u32>,
}

impl GlobalOptions {
    pub fn config(&self) -> DriveConfig {
        let mut config = DriveConfig::default();
        if let Some(rpm) = self.rpm {
            config = config.with_rpm(rpm);
        }
        if let Some(settle_ms) = self.settle_ms {
            config = config.with_settle_ms(settle_ms);
        }
        config
    }
}

pub fn global_options_parser() -> impl Parser<GlobalOptions> {
    let silent = long("silent")
        .help("Suppress all output except required output")
        .switch();
    let rpm = long("rpm")
        .argument::<u32>("RPM")
        .help("Spindle speed of the emulated drive (default 300)")
        .guard(|&rpm| (150..=600).contains(&rpm), "RPM must be between 150 and 600")
        .optional();
    let settle_ms = long("settle-ms")
        .argument::<u32>("MS")
        .help("Head settle time after the last step pulse")
        .optional();

    construct!(GlobalOptions { silent, rpm, settle_ms })
}

pub(crate) fn command_parser() -> impl Parser<AppParams> {
    let global = global_options_parser();

    let version = pure(Command::Version)
        .to_options()
        .command("version")
        .help("Display version information and exit");

    let read = construct!(Command::Read(read_parser()))
        .to_options()
        .command("read")
        .help("Stream a track through the read channel and report the flux it produced");
    let write = construct!(Command::Write(write_parser()))
        .to_options()
        .command("write")
        .help("Write a test pattern through the capture channel and verify the decoded result");
    let seek = construct!(Command::Seek(seek_parser()))
        .to_options()
        .command("seek")
        .help("Step the head to a cylinder and report step and settle timing");

    let command = construct!([version, read, write, seek]);

    construct!(AppParams { global, command })
}

pub(crate) fn cylinder_parser() -> impl Parser<u8> {
    long("cylinder")
        .short('c')
        .argument::<u8>("CYLINDER")
        .help("Cylinder to position the head on")
        .fallback(0)
}

pub(crate) fn head_parser() -> impl Parser<u8> {
    long("head")
        .short('h')
        .argument::<u8>("HEAD")
        .help("Head to select")
        .guard(|&head| head == 0 || head == 1, "Head must be either 0 or 1")
        .fallback(0)
}

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
pub mod args;
mod read;
mod seek;
mod write;

use anyhow::{bail, Error};
use bpaf::Parser;
use fluxfox_drive::{prelude::*, sim::*};

use crate::args::{command_parser, Command, GlobalOptions};

pub(crate) type SimFloppy = Floppy<SimBoard, SimImage>;

/// Service quantum in microseconds.
const QUANTUM_US: u32 = 100;

fn main() -> Result<(), Error> {
    env_logger::init();

    let app_params = command_parser().run();

    let command_result = match &app_params.command {
        Command::Version => {
            println!("ffdrive v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Read(params) => read::run(&app_params.global, params),
        Command::Write(params) => write::run(&app_params.global, params),
        Command::Seek(params) => seek::run(&app_params.global, params),
    };

    match command_result {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("Command '{}' failed: {}", app_params.command, e);
            for cause in e.chain().skip(1) {
                eprintln!("Caused by: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

/// Build a selected drive on a fresh simulated board and insert a formatted image.
pub(crate) fn mount(global: &GlobalOptions, image: SimImage) -> Result<SimFloppy, Error> {
    let config = global.config();
    let board = SimBoard::new(config.time_base);
    let mut floppy = Floppy::new(board, config)?;
    floppy.set_selected(true);
    floppy.insert(image, ImageSlot::new("sim.img", 0))?;
    service(&mut floppy)?;
    if !floppy.is_mounted() {
        bail!("image did not open");
    }
    Ok(floppy)
}

/// Convert a simulation length to stk ticks, refusing lengths the clock cannot represent.
pub(crate) fn stk_ticks(tb: TimeBase, ms: u32) -> Result<u32, Error> {
    match ms.checked_mul(tb.stk_mhz).and_then(|t| t.checked_mul(1000)) {
        Some(ticks) if ticks <= i32::MAX as u32 => Ok(ticks),
        _ => bail!("{}ms is too long to simulate at {}MHz", ms, tb.stk_mhz),
    }
}

/// Run the simulated drive for `ms` milliseconds.
pub(crate) fn run_ms(floppy: &mut SimFloppy, ms: u32) -> Result<(), Error> {
    let tb = floppy.config().time_base;
    let ticks = stk_ticks(tb, ms)?;
    if let Some(e) = run_for(floppy, ticks, tb.stk_us(QUANTUM_US)) {
        log::warn!("run_ms(): last polling error: {}", e);
    }
    Ok(())
}

/// Run until `done` holds or `limit_ms` passes. Returns elapsed microseconds on success.
pub(crate) fn run_until<F>(floppy: &mut SimFloppy, limit_ms: u32, done: F) -> Option<u32>
where
    F: Fn(&SimFloppy) -> bool,
{
    let tb = floppy.config().time_base;
    let quantum = tb.stk_us(QUANTUM_US);
    let start = floppy.hardware().now();
    loop {
        let elapsed = start.elapsed(floppy.hardware().now());
        if done(floppy) {
            return Some(tb.stk_to_us(elapsed));
        }
        if elapsed >= tb.stk_ms(limit_ms) {
            return None;
        }
        run_for(floppy, quantum, quantum);
    }
}

/// Step the head to `cyl`, one pulse at a time, waiting for the motor to go idle after each.
pub(crate) fn seek_to(floppy: &mut SimFloppy, cyl: u8) -> Result<u32, Error> {
    let mut total_us = 0;
    while floppy.drive().cyl() != cyl {
        let inward = cyl > floppy.drive().cyl();
        floppy.step_edge(inward);
        let Some(us) = run_until(floppy, 100, |f| f.step_state() == StepState::Idle)
        else {
            bail!("step motor did not settle at cylinder {}", floppy.drive().cyl());
        };
        total_us += us;
    }
    Ok(total_us)
}

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
pub(crate) mod args;

use anyhow::{bail, Error};
use fluxfox_drive::{prelude::*, sim::*};

use crate::{args::GlobalOptions, mount, run_until, seek_to};

/// Spacing of step pulses in a burst, in microseconds.
const BURST_RATE_US: u32 = 3000;

pub(crate) fn run(global: &GlobalOptions, params: &args::SeekParams) -> Result<(), Error> {
    let mut floppy = mount(global, SimImage::formatted(80, DD_TRACK_BITS))?;
    let target = params.cylinder;

    let elapsed_us = if params.burst {
        let tb = floppy.config().time_base;
        let start = floppy.hardware().now();
        for _ in 0..target {
            floppy.step_edge(true);
            run_for(&mut floppy, tb.stk_us(BURST_RATE_US), tb.stk_us(100));
        }
        if run_until(&mut floppy, 100, |f| f.step_state() == StepState::Idle).is_none() {
            bail!("step motor did not settle");
        }
        tb.stk_to_us(start.elapsed(floppy.hardware().now()))
    }
    else {
        seek_to(&mut floppy, target)?
    };

    let cyl = floppy.drive().cyl();
    if !global.silent {
        println!("Seek to cylinder {}", target);
        println!("{}", "-".repeat(79));
        println!("Reached:   {}", cyl);
        println!("Elapsed:   {}us", elapsed_us);
        println!("Settles:   {}", floppy.stats().settles);
        println!(
            "TRK0:      {}",
            if floppy.outputs().contains(OutputLines::TRK0) { "asserted" } else { "released" }
        );
        println!(
            "DSKCHG:    {}",
            if floppy.outputs().contains(OutputLines::DSKCHG) { "asserted" } else { "released" }
        );
    }
    if cyl != target {
        bail!("head stopped at cylinder {} (limit {})", cyl, floppy.config().max_cyl);
    }
    Ok(())
}

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

use crate::{args::GlobalOptions, mount, run_ms, run_until, seek_to};

pub(crate) fn run(global: &GlobalOptions, params: &args::ReadParams) -> Result<(), Error> {
    let mut floppy = mount(global, SimImage::formatted(80, DD_TRACK_BITS))?;
    seek_to(&mut floppy, params.cylinder)?;
    floppy.set_head(params.head);

    let Some(live_us) = run_until(&mut floppy, 1000, |f| f.rd_state() == RingState::Active)
    else {
        bail!("read channel did not go live");
    };

    floppy.hardware_mut().clear_history();
    floppy.hardware_mut().record_flux(true);
    let rev_ms = floppy.config().ms_per_rev;
    let Some(read_ms) = rev_ms.checked_mul(params.revs)
    else {
        bail!("{} revolutions of {}ms is too long to simulate", params.revs, rev_ms);
    };
    run_ms(&mut floppy, read_ms)?;

    let stats = *floppy.stats();
    let board = floppy.hardware();
    let log = board.flux_log();

    if !global.silent {
        println!(
            "Track {} (c:{} h:{}) live after {}us",
            floppy.drive().track(),
            floppy.drive().cyl(),
            floppy.drive().head(),
            live_us
        );
        println!("{}", "-".repeat(79));
        println!("Flux transitions: {}", board.pulses());
        let index = board.assertions(OutputLines::INDEX);
        println!("Index pulses:     {}", index.len());
        for pair in index.windows(2) {
            let period_us = board.time_base().stk_to_us(pair[0].elapsed(pair[1]));
            println!("  period:         {}us", period_us);
        }
        println!("Index resyncs:    {}", stats.index_resyncs);
        println!("Underruns:        {}", stats.rdata_underruns);
        println!("Last sync:        {} ticks", stats.last_sync_ticks);
        println!("Max track load:   {}us", stats.max_read_us);

        // Bucket intervals by MFM bit cells: 2, 3 and 4 cells are the only legal spacings.
        let mut buckets = [0usize; 6];
        for &interval in log {
            let cells = ((interval + DD_CELL_TICKS / 2) / DD_CELL_TICKS) as usize;
            buckets[cells.min(5)] += 1;
        }
        println!("Interval histogram (bit cells):");
        for (cells, count) in buckets.iter().enumerate().filter(|(_, count)| **count > 0) {
            let label = match cells {
                5 => ">4".to_string(),
                n => n.to_string(),
            };
            println!("  {:>2}: {}", label, count);
        }
    }

    if let Some(count) = params.dump {
        for (i, interval) in log.iter().take(count).enumerate() {
            println!("{:6}: {}", i, interval);
        }
    }

    if stats.rdata_underruns > 0 {
        bail!("{} underruns while streaming", stats.rdata_underruns);
    }
    Ok(())
}

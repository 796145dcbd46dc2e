/*
    FluxFox
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

    tests/index.rs

    Tests for the index pulse clock
*/
#![cfg(feature = "sim")]
mod common;

use common::*;
use fluxfox_drive::{prelude::*, sim::*};

/// Differences between consecutive times.
fn periods(times: &[StkTime]) -> Vec<u32> {
    times.windows(2).map(|w| w[0].elapsed(w[1])).collect()
}

#[test]
fn test_free_running_index() {
    init();
    let mut floppy = mounted(dd_image());
    // Keep the read channel from ever starting.
    floppy.image_mut().unwrap().delay_seeks(u32::MAX);

    run_ms(&mut floppy, 1010);
    let board = floppy.hardware();
    let asserted = board.assertions(OutputLines::INDEX);
    assert_eq!(asserted.len(), 5);
    for period in periods(&asserted) {
        assert_eq!(period, ms(&floppy, 200));
    }

    // Every pulse is 2ms wide.
    let released: Vec<StkTime> = board
        .history()
        .iter()
        .filter(|e| !e.asserted && e.lines.contains(OutputLines::INDEX))
        .map(|e| e.time)
        .collect();
    for (on, off) in asserted.iter().zip(released.iter()) {
        assert_eq!(on.elapsed(*off), ms(&floppy, 2));
    }
}

#[test]
fn test_index_locks_to_track_length() {
    init();
    // 90000 cells of 2us: a 180ms track on a drive nominally turning at 200ms.
    let mut floppy = mounted(SimImage::formatted(80, 90_000));
    run_until_reading(&mut floppy);
    run_ms(&mut floppy, 300);

    floppy.hardware_mut().clear_history();
    let resyncs = floppy.stats().index_resyncs;
    run_ms(&mut floppy, 1000);

    let asserted = floppy.hardware().assertions(OutputLines::INDEX);
    assert!(asserted.len() >= 5, "only {} index pulses", asserted.len());
    let track = ms(&floppy, 180);
    for period in periods(&asserted) {
        assert!(period.abs_diff(track) <= ms(&floppy, 1), "index period {} ticks", period);
    }
    assert!(floppy.stats().index_resyncs >= resyncs + 5);
    assert_eq!(floppy.stats().rdata_underruns, 0);
}

#[test]
fn test_index_deadline_follows_queued_flux() {
    init();
    let mut floppy = mounted(SimImage::formatted(80, 90_000));
    run_until_reading(&mut floppy);
    let resyncs = floppy.stats().index_resyncs;
    let per = floppy.config().time_base.sysclk_per_stk();

    for _ in 0..3000 {
        floppy.hardware_mut().advance(QUANTUM);
        let pending = floppy.hardware_mut().take_pending();
        if pending.contains(SimIrqs::RDATA) {
            floppy.rdata_irq();

            if floppy.stats().index_resyncs > resyncs {
                let ring = floppy.read_ring().unwrap();
                let board = floppy.hardware();
                let tsi = floppy.image().unwrap().ticks_since_index();
                let ticks = (board.sample_ticks_left() + ring.sum_intervals(ring.cons(), ring.prod()))
                    .saturating_sub(tsi)
                    / per;

                let deadline = floppy.index().deadline();
                assert_eq!(deadline, Some(board.now().add(ticks)));
                assert_ne!(deadline, Some(floppy.index().prev_time().add(ms(&floppy, 200))));
                return;
            }
        }
        floppy.run_timers();
        let _ = floppy.handle();
    }
    panic!("no index crossing seen");
}

#[test]
fn test_index_stops_on_eject() {
    init();
    let mut floppy = mounted(dd_image());
    run_ms(&mut floppy, 450);
    assert_eq!(floppy.hardware().assertions(OutputLines::INDEX).len(), 2);

    floppy.cancel().unwrap();
    assert!(floppy.index().deadline().is_none());
    assert!(!floppy.hardware().lines().contains(OutputLines::INDEX));

    floppy.hardware_mut().clear_history();
    run_ms(&mut floppy, 450);
    assert!(floppy.hardware().assertions(OutputLines::INDEX).is_empty());
}

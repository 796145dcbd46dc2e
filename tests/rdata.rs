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

    tests/rdata.rs

    Tests for the RDATA flux generation channel
*/
#![cfg(feature = "sim")]
mod common;

use common::*;
use fluxfox_drive::{prelude::*, sim::*};

#[test]
fn test_read_goes_live_on_deadline() {
    init();
    let mut floppy = mounted(dd_image());
    assert_eq!(floppy.rd_state(), RingState::Inactive);

    tick(&mut floppy);
    assert_eq!(floppy.rd_state(), RingState::Starting);
    assert_eq!(floppy.image().unwrap().cur_track(), 0);

    run_until_reading(&mut floppy);
    assert!(floppy.hardware().is_generating());
    assert!(floppy.hardware().rdata_output());

    // The final approach is a busy-wait ending one microsecond before the deadline.
    let tb = floppy.config().time_base;
    assert_eq!(floppy.stats().last_sync_ticks, tb.stk_us(1) as i32);
}

#[test]
fn test_generated_flux_is_valid_mfm() {
    init();
    let mut floppy = mounted(dd_image());
    floppy.hardware_mut().record_flux(true);
    run_until_reading(&mut floppy);
    run_ms(&mut floppy, 50);

    let log = floppy.hardware().flux_log();
    // 50ms of double density flux at 4-8us per transition.
    assert!(log.len() > 6000, "only {} pulses", log.len());
    for &interval in log {
        assert_eq!(interval % DD_CELL_TICKS, 0);
        assert!((2..=4).contains(&(interval / DD_CELL_TICKS)), "bad interval {}", interval);
    }
    assert_eq!(floppy.stats().rdata_underruns, 0);
}

#[test]
fn test_underrun_is_counted_and_kick_served() {
    init();
    let mut floppy = mounted(dd_image().with_flux_budget(600));
    run_until_reading(&mut floppy);

    assert!(run_until(&mut floppy, 20, |f| f.stats().rdata_underruns > 0));
    assert_eq!(floppy.rd_state(), RingState::Active);
    let ring = floppy.read_ring().unwrap().clone();
    assert!(ring.kick_requested());

    // More data arrives: the polling pass re-triggers the interrupt.
    floppy.hardware_mut().take_pending();
    floppy.image_mut().unwrap().stage_flux(100_000);
    floppy.handle().unwrap();
    assert!(!ring.kick_requested());
    assert!(floppy.hardware().pending().contains(SimIrqs::RDATA));

    dispatch_irqs(&mut floppy);
    assert_eq!(floppy.rd_state(), RingState::Active);
}

#[test]
fn test_read_ring_keeps_a_free_slot() {
    init();
    let mut floppy = mounted(dd_image());
    run_until_reading(&mut floppy);

    let ring = floppy.read_ring().unwrap().clone();
    for _ in 0..500 {
        tick(&mut floppy);
        // Whatever was refilled, the producer stops short of the hardware consumer.
        let hw_cons = fluxfox_drive::ring::hw_index(floppy.hardware().generator_remaining());
        assert_ne!(ring.prod(), hw_cons);
    }
    assert_eq!(floppy.stats().rdata_underruns, 0);
}

#[test]
fn test_read_restarts_on_new_track() {
    init();
    let mut floppy = mounted(dd_image());
    run_until_reading(&mut floppy);

    floppy.set_head(1);
    assert_eq!(floppy.rd_state(), RingState::Stopping);
    assert!(!floppy.hardware().is_generating());
    assert!(!floppy.hardware().rdata_output());

    run_until_reading(&mut floppy);
    assert_eq!(floppy.image().unwrap().cur_track(), 1);
    assert_eq!(floppy.get_track(), (0, 1));
}

#[test]
fn test_read_waits_while_seek_not_ready() {
    init();
    let mut floppy = mounted(dd_image());
    floppy.image_mut().unwrap().delay_seeks(5);

    for _ in 0..5 {
        tick(&mut floppy);
        assert_eq!(floppy.rd_state(), RingState::Inactive);
    }
    tick(&mut floppy);
    assert_eq!(floppy.rd_state(), RingState::Starting);
}

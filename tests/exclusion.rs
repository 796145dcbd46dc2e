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

    tests/exclusion.rs

    Tests for read/write channel mutual exclusion and stop semantics
*/
#![cfg(feature = "sim")]
mod common;

use common::*;
use fluxfox_drive::{prelude::*, sim::*};

#[test]
fn test_write_waits_for_read_to_stop() {
    init();
    let mut floppy = mounted(dd_image());
    tick(&mut floppy);
    assert_eq!(floppy.rd_state(), RingState::Starting);

    floppy.write_gate(true);
    assert_eq!(floppy.rd_state(), RingState::Stopping);
    assert_eq!(floppy.wr_state(), RingState::Starting);

    // The write seek stalls: the read channel still drains, but the write holds in Starting.
    floppy.image_mut().unwrap().delay_seeks(2);
    assert!(floppy.handle().unwrap_err().is_retry());
    assert_eq!(floppy.rd_state(), RingState::Inactive);
    assert_eq!(floppy.wr_state(), RingState::Starting);
    assert!(floppy.handle().unwrap_err().is_retry());
    assert_eq!(floppy.wr_state(), RingState::Starting);

    floppy.handle().unwrap();
    assert_eq!(floppy.wr_state(), RingState::Active);
    assert_eq!(floppy.rd_state(), RingState::Inactive);
}

#[test]
fn test_read_is_held_off_during_write() {
    init();
    let mut floppy = mounted(dd_image());
    run_until_reading(&mut floppy);

    floppy.write_gate(true);
    for _ in 0..500 {
        tick(&mut floppy);
        assert_eq!(floppy.rd_state(), RingState::Inactive);
        assert!(!floppy.hardware().is_generating());
    }
    assert_eq!(floppy.wr_state(), RingState::Active);

    floppy.write_gate(false);
    run_until_reading(&mut floppy);
    assert_eq!(floppy.wr_state(), RingState::Inactive);
}

#[test]
fn test_read_stop_is_idempotent() {
    init();
    let mut floppy = mounted(dd_image());

    // Inactive
    floppy.rdata_stop();
    floppy.rdata_stop();
    assert_eq!(floppy.rd_state(), RingState::Inactive);

    // Starting
    tick(&mut floppy);
    assert_eq!(floppy.rd_state(), RingState::Starting);
    floppy.rdata_stop();
    floppy.rdata_stop();
    assert_eq!(floppy.rd_state(), RingState::Stopping);
    floppy.handle().unwrap();
    assert_eq!(floppy.rd_state(), RingState::Inactive);

    // Active
    run_until_reading(&mut floppy);
    floppy.rdata_stop();
    floppy.rdata_stop();
    assert_eq!(floppy.rd_state(), RingState::Stopping);
    assert!(!floppy.hardware().is_generating());
    floppy.handle().unwrap();
    assert_eq!(floppy.rd_state(), RingState::Inactive);
    let ring = floppy.read_ring().unwrap();
    assert_eq!((ring.cons(), ring.prod()), (0, 0));
}

#[test]
fn test_write_stop_is_idempotent() {
    init();
    let mut floppy = mounted(dd_image());

    floppy.wdata_stop();
    assert_eq!(floppy.wr_state(), RingState::Inactive);

    // Stopped before the polling pass ever activated it.
    floppy.write_gate(true);
    floppy.wdata_stop();
    floppy.wdata_stop();
    assert_eq!(floppy.wr_state(), RingState::Stopping);
    assert!(floppy.hardware().pending().contains(SimIrqs::WDATA));
    assert!(run_until(&mut floppy, 10, |f| f.wr_state() == RingState::Inactive));

    // Active
    floppy.write_gate(true);
    service(&mut floppy).unwrap();
    assert_eq!(floppy.wr_state(), RingState::Active);
    floppy.write_gate(false);
    floppy.write_gate(false);
    assert_eq!(floppy.wr_state(), RingState::Stopping);
    assert!(!floppy.hardware().is_capturing());
    assert!(run_until(&mut floppy, 10, |f| f.wr_state() == RingState::Inactive));
    assert_eq!(floppy.image().unwrap().syncs(), 2);
}

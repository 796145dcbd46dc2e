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

    tests/mount.rs

    Tests for drive initialisation, disk insertion and ejection
*/
#![cfg(feature = "sim")]
mod common;

use common::*;
use fluxfox_drive::{prelude::*, sim::*};

#[test]
fn test_empty_drive_outputs() {
    init();
    let mut floppy = new_floppy();
    let empty = OutputLines::DSKCHG | OutputLines::WRPROT | OutputLines::TRK0;
    assert_eq!(floppy.outputs(), empty);
    // Deselected: nothing is driven.
    assert!(floppy.hardware().lines().is_empty());

    floppy.set_selected(true);
    assert_eq!(floppy.hardware().lines(), empty);
    assert_eq!(floppy.handle(), Err(DriveError::NoDisk));
}

#[test]
fn test_invalid_config_is_rejected() {
    init();
    let config = DriveConfig::default().with_buffers(1024, 2048);
    let board = SimBoard::new(config.time_base);
    assert!(matches!(
        Floppy::<SimBoard, SimImage>::new(board, config),
        Err(DriveError::Config(_))
    ));
}

#[test]
fn test_open_failure_is_retried() {
    init();
    let mut floppy = new_floppy();
    floppy.set_selected(true);
    floppy
        .insert(dd_image().with_open_failures(2), ImageSlot::new("sim.img", 0))
        .unwrap();
    assert!(floppy.hardware().lines().contains(OutputLines::READY));
    assert!(!floppy.is_mounted());

    for _ in 0..2 {
        let err = floppy.handle().unwrap_err();
        assert!(matches!(err, DriveError::Image(ImageError::Io(_))));
        assert!(floppy.outputs().contains(OutputLines::WRPROT));
    }

    floppy.handle().unwrap();
    assert!(floppy.is_mounted());
    assert!(!floppy.outputs().contains(OutputLines::WRPROT));
    // Disk change stays asserted until the host steps.
    assert!(floppy.outputs().contains(OutputLines::DSKCHG));
}

#[test]
fn test_read_only_slot_keeps_write_protect() {
    init();
    let mut floppy = new_floppy();
    let mut slot = ImageSlot::new("sim.img", 0);
    slot.read_only = true;
    floppy.insert(dd_image(), slot).unwrap();
    floppy.handle().unwrap();
    assert!(floppy.is_mounted());
    assert!(floppy.outputs().contains(OutputLines::WRPROT));
}

#[test]
fn test_eject_and_reinsert() {
    init();
    let mut floppy = mounted(dd_image());
    run_until_reading(&mut floppy);
    floppy.step_edge(true);
    run_ms(&mut floppy, 20);
    assert!(!floppy.outputs().contains(OutputLines::DSKCHG));

    let image = floppy.cancel().expect("no image returned");
    assert!(image.is_open());
    assert!(!floppy.hardware().is_generating());
    assert!(!floppy.hardware().rdata_output());
    assert_eq!(floppy.rd_state(), RingState::Inactive);
    assert_eq!(floppy.stats().max_read_us, 0);

    let lines = floppy.hardware().lines();
    assert!(!lines.intersects(OutputLines::INDEX | OutputLines::READY));
    assert!(lines.contains(OutputLines::DSKCHG | OutputLines::WRPROT));
    assert!(floppy.cancel().is_none());

    // Head position survives the eject, and the arena is reused.
    floppy.insert(dd_image(), ImageSlot::new("other.img", 0)).unwrap();
    service(&mut floppy).unwrap();
    run_until_reading(&mut floppy);
    assert_eq!(floppy.image().unwrap().cur_track(), 2);
}

#[test]
fn test_insert_replaces_disk() {
    init();
    let mut floppy = mounted(dd_image());
    floppy.insert(dd_image().read_only(), ImageSlot::new("b.img", 0)).unwrap();
    assert!(!floppy.is_mounted());
    floppy.handle().unwrap();
    assert!(floppy.outputs().contains(OutputLines::WRPROT));
}

#[test]
fn test_deselect_releases_outputs() {
    init();
    let mut floppy = mounted(dd_image());
    run_until_reading(&mut floppy);
    assert!(floppy.hardware().rdata_output());

    floppy.set_selected(false);
    assert!(floppy.hardware().lines().is_empty());
    assert!(!floppy.hardware().rdata_output());
    assert!(floppy.outputs().contains(OutputLines::READY));

    floppy.set_selected(true);
    assert_eq!(floppy.hardware().lines(), floppy.outputs());
    assert!(floppy.hardware().rdata_output());
}

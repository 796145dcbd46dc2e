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

    tests/common/mod.rs

    Common support routines for tests
*/
#![allow(dead_code)]

use fluxfox_drive::{prelude::*, sim::*};

/// Service quantum: 100us at the default 9MHz stk clock.
pub const QUANTUM: u32 = 900;

pub type SimFloppy = Floppy<SimBoard, SimImage>;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn new_floppy_with(config: DriveConfig) -> SimFloppy {
    let board = SimBoard::new(config.time_base);
    Floppy::new(board, config).unwrap()
}

pub fn new_floppy() -> SimFloppy {
    new_floppy_with(DriveConfig::default())
}

/// A selected drive with `image` inserted and opened.
pub fn mounted(image: SimImage) -> SimFloppy {
    let mut floppy = new_floppy();
    floppy.set_selected(true);
    floppy.insert(image, ImageSlot::new("sim.img", 737_280)).unwrap();
    service(&mut floppy).unwrap();
    assert!(floppy.is_mounted());
    floppy
}

/// A formatted 80 cylinder double density image.
pub fn dd_image() -> SimImage {
    SimImage::formatted(80, DD_TRACK_BITS)
}

pub fn ms(floppy: &SimFloppy, ms: u32) -> u32 {
    floppy.config().time_base.stk_ms(ms)
}

pub fn now(floppy: &SimFloppy) -> StkTime {
    floppy.hardware().now()
}

/// Advance one quantum and service the drive, ignoring polling errors.
pub fn tick(floppy: &mut SimFloppy) {
    floppy.hardware_mut().advance(QUANTUM);
    let _ = service(floppy);
}

pub fn run_ms(floppy: &mut SimFloppy, duration_ms: u32) {
    let ticks = ms(floppy, duration_ms);
    run_for(floppy, ticks, QUANTUM);
}

/// Service the drive until `done` holds, for at most `limit_ms`. Returns whether it held.
pub fn run_until<F>(floppy: &mut SimFloppy, limit_ms: u32, done: F) -> bool
where
    F: Fn(&SimFloppy) -> bool,
{
    let limit = ms(floppy, limit_ms);
    let start = now(floppy);
    while start.elapsed(now(floppy)) < limit {
        if done(floppy) {
            return true;
        }
        tick(floppy);
    }
    done(floppy)
}

pub fn run_until_reading(floppy: &mut SimFloppy) {
    assert!(
        run_until(floppy, 500, |f| f.rd_state() == RingState::Active),
        "read channel never went live"
    );
}

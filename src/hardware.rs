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

    hardware.rs

    Abstract peripheral interfaces consumed by the drive core
*/

//! The drive core does not touch peripherals directly. A board implements these traits over its
//! timers, streaming (DMA) engines, GPIOs and interrupt controller; the `sim` module implements
//! them in software.

use crate::{
    ring::FluxRing,
    types::{OutputLines, StkTime},
};
use std::sync::Arc;

/// Upper bound for any busy-wait performed by the core, in stk ticks. The only busy-wait is the
/// final approach to the RDATA rotational deadline, which is bounded by the sync window; this is
/// a backstop for a misbehaving clock.
pub const MAX_SPIN_TICKS: u32 = 1 << 20;

/// The free-running system tick clock.
pub trait Clock {
    fn now(&self) -> StkTime;

    /// Busy-wait for `ticks`. This runs in contexts that must not yield, so it spins rather than
    /// sleeps. The default implementation spins on [Clock::now] for at most [MAX_SPIN_TICKS].
    fn delay_ticks(&mut self, ticks: u32) {
        let ticks = ticks.min(MAX_SPIN_TICKS);
        let start = self.now();
        while start.elapsed(self.now()) < ticks {
            std::hint::spin_loop();
        }
    }
}

/// The RDATA flux generator: a timer producing one fixed-width pulse per period, with its reload
/// value streamed sample-by-sample from the read [FluxRing]. The streaming engine raises the
/// RDATA interrupt each time it passes the half and the end of the ring.
pub trait FluxGenerator {
    /// Start streaming from index 0 of `ring`. The first sample is loaded immediately.
    fn start_generator(&mut self, ring: &Arc<FluxRing>);

    /// Halt the timer and the streaming engine, and rewind the engine to the start of the ring.
    fn stop_generator(&mut self);

    /// Number of samples the streaming engine has still to transfer before it wraps.
    fn generator_remaining(&self) -> u16;

    /// Ticks left in the sample currently loaded into the reload register.
    fn sample_ticks_left(&self) -> u32;

    /// Connect or disconnect the RDATA pin from the generator.
    fn set_rdata_output(&mut self, enabled: bool);
}

/// The WDATA capture channel: a free-running 16-bit timer whose value is captured on every
/// incoming flux edge and streamed into the write [FluxRing].
pub trait FluxCapture {
    /// Start capturing into index 0 of `ring`.
    fn start_capture(&mut self, ring: &Arc<FluxRing>);

    /// Halt capture and its streaming engine. Samples already captured remain in the ring.
    fn stop_capture(&mut self);

    /// Number of samples the streaming engine has still to transfer before it wraps.
    fn capture_remaining(&self) -> u16;
}

/// The drive's output lines toward the host controller.
pub trait DriveSignals {
    fn set_lines(&mut self, lines: OutputLines, asserted: bool);
}

/// Interrupts the core may pend for itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FloppyIrq {
    /// Low priority soft interrupt finishing a step.
    Step,
    /// Flux generator streaming interrupt.
    Rdata,
    /// Flux capture streaming interrupt.
    Wdata,
}

pub trait InterruptController {
    fn pend(&mut self, irq: FloppyIrq);
}

/// Everything the drive core needs from a board.
pub trait FloppyHardware: Clock + FluxGenerator + FluxCapture + DriveSignals + InterruptController {}

impl<T> FloppyHardware for T where T: Clock + FluxGenerator + FluxCapture + DriveSignals + InterruptController {}

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

    src/sim/mod.rs

    Host-side simulation of a drive board and disk image.
*/

//! A [SimBoard] and [SimImage] stand in for the microcontroller peripherals and the image
//! codec, so that a [Floppy] can be driven on a host. [service] plays the part of the interrupt
//! controller and main loop: it dispatches pending interrupts, fires timers and runs one
//! polling pass.

mod board;
mod image;

pub use board::{LineEvent, SimBoard, SimIrqs};
pub use image::{build_track, SimImage, DD_CELL_TICKS, DD_TRACK_BITS};

use crate::{image::FloppyImage, DriveError, Floppy};
use bit_vec::BitVec;

/// Upper bound on interrupt dispatch rounds in one [service] call. Handlers may re-pend
/// themselves, but never indefinitely.
const MAX_IRQ_ROUNDS: usize = 8;

/// Service a simulated drive once: pending interrupts in priority order, then timers, then one
/// polling pass. A "not ready" result from the polling pass is not an error here; it is simply
/// retried on the next call.
pub fn service<I: FloppyImage>(floppy: &mut Floppy<SimBoard, I>) -> Result<(), DriveError> {
    dispatch_irqs(floppy);
    floppy.run_timers();
    match floppy.handle() {
        Err(e) if e.is_retry() => Ok(()),
        result => result,
    }
}

/// Run every pending interrupt handler, including any pended by the handlers themselves.
pub fn dispatch_irqs<I: FloppyImage>(floppy: &mut Floppy<SimBoard, I>) {
    for _ in 0..MAX_IRQ_ROUNDS {
        let pending = floppy.hardware_mut().take_pending();
        if pending.is_empty() {
            break;
        }
        if pending.contains(SimIrqs::RDATA) {
            floppy.rdata_irq();
        }
        if pending.contains(SimIrqs::WDATA) {
            floppy.wdata_irq();
        }
        if pending.contains(SimIrqs::STEP) {
            floppy.step_irq();
        }
    }
}

/// Advance time by `ticks` stk ticks in steps of `quantum`, servicing the drive after each.
/// Returns the last error reported by the polling pass, if any.
pub fn run_for<I: FloppyImage>(floppy: &mut Floppy<SimBoard, I>, ticks: u32, quantum: u32) -> Option<DriveError> {
    let quantum = quantum.max(1);
    let mut last_err = None;
    let mut elapsed = 0;
    while elapsed < ticks {
        let step = quantum.min(ticks - elapsed);
        floppy.hardware_mut().advance(step);
        elapsed += step;
        if let Err(e) = service(floppy) {
            log::trace!("run_for(): {}", e);
            last_err = Some(e);
        }
    }
    last_err
}

/// Play an MFM bitstream into the capture channel as a host controller writing it would, one
/// flux transition per `1` cell. Time advances with the flux and the drive is serviced whenever
/// an interrupt is pending. Returns the last error reported by the polling pass, if any.
pub fn write_bits<I: FloppyImage>(
    floppy: &mut Floppy<SimBoard, I>,
    bits: &BitVec,
    cell_ticks: u32,
) -> Option<DriveError> {
    let per = floppy.hardware().time_base().sysclk_per_stk();
    let mut last_err = None;
    let mut run = 0u32;
    let mut carry = 0u32;
    for bit in bits.iter() {
        run += 1;
        if !bit {
            continue;
        }
        let delta = run * cell_ticks;
        run = 0;

        let board = floppy.hardware_mut();
        board.capture_flux(delta);
        carry += delta;
        board.advance(carry / per);
        carry %= per;

        if !floppy.hardware().pending().is_empty() {
            if let Err(e) = service(floppy) {
                log::warn!("write_bits(): {}", e);
                last_err = Some(e);
            }
        }
    }
    last_err
}

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
*/

//! A [FluxRing] is the hand-off point between a flux streaming peripheral and the software that
//! produces or consumes flux samples. One ring exists per direction: the RDATA ring is filled by
//! software and drained by the flux generator, the WDATA ring is filled by the capture channel
//! and drained by the write decoder.
//!
//! The ring is shared with the peripheral model, so every field is an atomic. There is no lock:
//! which actor may write a field is determined by the ring's [RingState].
//!
//! * The interrupt handler owns the hardware-facing index and the transitions into Active and
//!   Stopping.
//! * The polling pass owns the Starting preparation and the final Stopping -> Inactive collapse.
//!
//! A state store that hands the ring to another actor must be the last store of a transition.
//! [FluxRing::set_state] uses release ordering and [FluxRing::state] acquire ordering so that an
//! actor observing the new state also observes the index resets made before it.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};
use strum::{Display, EnumIter};

/// Number of samples in a flux ring. Must be a power of two.
pub const FLUX_RING_LEN: usize = 1024;
/// Mask applied to ring indices on wraparound.
pub const FLUX_RING_MASK: u16 = (FLUX_RING_LEN - 1) as u16;

/// Lifecycle of a flux ring. The only legal cycle is
/// `Inactive -> Starting -> Active -> Stopping -> Inactive`, with Starting also allowed to
/// collapse directly into Stopping.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RingState {
    /// No activity. The ring is empty.
    #[default]
    Inactive = 0,
    /// RDATA: ring is being primed, generator not yet running.
    /// WDATA: capture is running, waiting for the drive to be positioned.
    Starting = 1,
    /// RDATA: generator is running and being topped up.
    /// WDATA: capture and write-back are running.
    Active = 2,
    /// Hardware halted; the ring is waiting to be drained or cleared by the polling pass.
    Stopping = 3,
}

impl From<u8> for RingState {
    fn from(value: u8) -> Self {
        match value {
            1 => RingState::Starting,
            2 => RingState::Active,
            3 => RingState::Stopping,
            _ => RingState::Inactive,
        }
    }
}

/// A fixed-capacity ring of 16-bit flux timings plus its state tag.
#[derive(Debug)]
pub struct FluxRing {
    state: AtomicU8,
    /// Set by the RDATA interrupt when it starved; cleared when more data has been staged.
    kick: AtomicBool,
    cons: AtomicU16,
    /// RDATA: software producer index. WDATA: previous captured timer value.
    prod: AtomicU16,
    buf: Box<[AtomicU16]>,
}

impl Default for FluxRing {
    fn default() -> Self {
        FluxRing::new()
    }
}

impl FluxRing {
    pub fn new() -> Self {
        FluxRing {
            state: AtomicU8::new(RingState::Inactive as u8),
            kick: AtomicBool::new(false),
            cons: AtomicU16::new(0),
            prod: AtomicU16::new(0),
            buf: (0..FLUX_RING_LEN).map(|_| AtomicU16::new(0)).collect(),
        }
    }

    #[inline]
    pub fn state(&self) -> RingState {
        RingState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_state(&self, state: RingState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Atomically move from `from` to `to`. Returns false, leaving the state untouched, if
    /// another actor changed the state first.
    #[inline]
    pub fn transition(&self, from: RingState, to: RingState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn cons(&self) -> u16 {
        self.cons.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_cons(&self, cons: u16) {
        self.cons.store(cons & FLUX_RING_MASK, Ordering::Release);
    }

    #[inline]
    pub fn prod(&self) -> u16 {
        self.prod.load(Ordering::Acquire)
    }

    /// Set the producer index. Unlike the consumer index this is not masked: a value of
    /// [FLUX_RING_LEN] is never stored, but the priming path relies on comparing against the
    /// linear fill level.
    #[inline]
    pub fn set_prod(&self, prod: u16) {
        self.prod.store(prod, Ordering::Release);
    }

    #[inline]
    pub fn prev_sample(&self) -> u16 {
        self.prod.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_prev_sample(&self, sample: u16) {
        self.prod.store(sample, Ordering::Release);
    }

    /// Record that the consumer ran dry and wants to be re-triggered once data is staged.
    #[inline]
    pub fn request_kick(&self) {
        self.kick.store(true, Ordering::Release);
    }

    #[inline]
    pub fn kick_requested(&self) -> bool {
        self.kick.load(Ordering::Acquire)
    }

    /// Clear the kick request, returning whether one was outstanding.
    #[inline]
    pub fn take_kick(&self) -> bool {
        self.kick.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn sample(&self, idx: u16) -> u16 {
        self.buf[(idx & FLUX_RING_MASK) as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_sample(&self, idx: u16, value: u16) {
        self.buf[(idx & FLUX_RING_MASK) as usize].store(value, Ordering::Relaxed);
    }

    /// Copy `samples` into the ring starting at `start`. The caller guarantees the stretch is
    /// owned by the producer.
    pub fn store_samples(&self, start: u16, samples: &[u16]) {
        for (i, &sample) in samples.iter().enumerate() {
            self.set_sample(start.wrapping_add(i as u16), sample);
        }
    }

    /// Sum the intervals of samples in `[from, to)`. Each sample is a timer reload value, so the
    /// interval it produces is one tick longer than the value.
    pub fn sum_intervals(&self, from: u16, to: u16) -> u32 {
        let mut ticks = 0u32;
        let mut i = from & FLUX_RING_MASK;
        let to = to & FLUX_RING_MASK;
        while i != to {
            ticks = ticks.wrapping_add(self.sample(i) as u32 + 1);
            i = (i + 1) & FLUX_RING_MASK;
        }
        ticks
    }

    /// Clear indices and the kick flag. Does not touch the state.
    pub fn reset_indices(&self) {
        self.cons.store(0, Ordering::Relaxed);
        self.prod.store(0, Ordering::Relaxed);
        self.kick.store(false, Ordering::Relaxed);
    }
}

/// Convert a streaming engine's remaining transfer count into the index of the next sample it
/// will touch.
#[inline]
pub fn hw_index(remaining: u16) -> u16 {
    (FLUX_RING_LEN as u16).wrapping_sub(remaining) & FLUX_RING_MASK
}

/// Number of samples pending between `cons` and `prod`.
#[inline]
pub fn pending(cons: u16, prod: u16) -> u16 {
    prod.wrapping_sub(cons) & FLUX_RING_MASK
}

/// Detect whether the hardware consumer, last seen at `cons` and now at `hw_cons`, has moved
/// past the software producer `prod`. Since the producer never catches up with the consumer,
/// at most `pending(cons, prod)` samples were valid; consuming more means the generator replayed
/// stale samples.
#[inline]
pub fn underrun(cons: u16, prod: u16, hw_cons: u16) -> bool {
    pending(cons, hw_cons) > pending(cons, prod)
}

/// Largest contiguous run the producer may fill, as `(run, free)`: `run` stops at the end of
/// the buffer, `free` is the total free space which always keeps one slot empty.
#[inline]
pub fn contiguous_free(prod: u16, hw_cons: u16) -> (u16, u16) {
    let to_wrap = FLUX_RING_LEN as u16 - (prod & FLUX_RING_MASK);
    let to_cons = hw_cons.wrapping_sub(prod).wrapping_sub(1) & FLUX_RING_MASK;
    (to_wrap.min(to_cons), to_cons)
}

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

    src/sim/board.rs

    A host-side model of the drive board peripherals.
*/

use crate::{
    hardware::{Clock, DriveSignals, FloppyIrq, FluxCapture, FluxGenerator, InterruptController},
    ring::{FluxRing, FLUX_RING_LEN},
    types::{OutputLines, StkTime, TimeBase},
};
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Interrupts pended on the simulated board.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SimIrqs: u8 {
        const STEP  = 0b0000_0001;
        const RDATA = 0b0000_0010;
        const WDATA = 0b0000_0100;
    }
}

impl From<FloppyIrq> for SimIrqs {
    fn from(irq: FloppyIrq) -> Self {
        match irq {
            FloppyIrq::Step => SimIrqs::STEP,
            FloppyIrq::Rdata => SimIrqs::RDATA,
            FloppyIrq::Wdata => SimIrqs::WDATA,
        }
    }
}

/// A change of an output line, as seen on the physical interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineEvent {
    pub time: StkTime,
    pub lines: OutputLines,
    pub asserted: bool,
}

/// The RDATA timer and its streaming engine. The timer counts `0..=arr` and then reloads; each
/// reload emits one pulse and pulls the next sample from the ring.
struct Generator {
    ring: Arc<FluxRing>,
    /// Next ring index the streaming engine will transfer.
    next: usize,
    arr: u32,
    cnt: u32,
}

impl Generator {
    fn load(&mut self) -> Option<SimIrqs> {
        self.arr = self.ring.sample(self.next as u16) as u32;
        self.next = (self.next + 1) % FLUX_RING_LEN;
        match self.next {
            0 => Some(SimIrqs::RDATA),
            n if n == FLUX_RING_LEN / 2 => Some(SimIrqs::RDATA),
            _ => None,
        }
    }
}

/// The WDATA capture channel and its streaming engine.
struct Capture {
    ring: Arc<FluxRing>,
    next: usize,
    counter: u16,
    running: bool,
}

/// A software board implementing every peripheral the drive core needs.
///
/// Time only moves when [SimBoard::advance] is called, or when the core busy-waits via
/// [Clock::delay_ticks]. Advancing time runs the flux generator; captured flux is injected
/// explicitly with [SimBoard::capture_flux].
pub struct SimBoard {
    time_base: TimeBase,
    now: StkTime,
    generator: Option<Generator>,
    rdata_output: bool,
    pulses: u64,
    flux_log: Option<Vec<u32>>,
    /// Sysclk ticks since the last RDATA pulse.
    since_pulse: u32,
    capture: Option<Capture>,
    lines: OutputLines,
    history: Vec<LineEvent>,
    pending: SimIrqs,
}

impl SimBoard {
    pub fn new(time_base: TimeBase) -> Self {
        SimBoard {
            time_base,
            now: StkTime::default(),
            generator: None,
            rdata_output: false,
            pulses: 0,
            flux_log: None,
            since_pulse: 0,
            capture: None,
            lines: OutputLines::empty(),
            history: Vec::new(),
            pending: SimIrqs::empty(),
        }
    }

    /// Start the clock at `now` instead of zero, to exercise wraparound.
    pub fn with_start_time(mut self, now: StkTime) -> Self {
        self.now = now;
        self
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Advance simulated time by `ticks` stk ticks, running the flux generator.
    pub fn advance(&mut self, ticks: u32) {
        let mut sysclk = ticks as u64 * self.time_base.sysclk_per_stk() as u64;
        while let Some(generator) = self.generator.as_mut() {
            let to_reload = (generator.arr - generator.cnt) as u64 + 1;
            if sysclk < to_reload {
                generator.cnt += sysclk as u32;
                self.since_pulse += sysclk as u32;
                break;
            }
            sysclk -= to_reload;
            generator.cnt = 0;
            let irq = generator.load();

            self.since_pulse += to_reload as u32;
            if self.rdata_output {
                self.pulses += 1;
                if let Some(log) = self.flux_log.as_mut() {
                    log.push(self.since_pulse);
                }
            }
            self.since_pulse = 0;

            if let Some(irq) = irq {
                self.pending |= irq;
            }
        }
        self.now = self.now.add(ticks);
    }

    /// Deliver a write flux transition `delta` sysclk ticks after the previous one.
    pub fn capture_flux(&mut self, delta: u32) {
        let Some(capture) = self.capture.as_mut()
        else {
            return;
        };
        if !capture.running {
            return;
        }

        capture.counter = capture.counter.wrapping_add(delta as u16);
        capture.ring.set_sample(capture.next as u16, capture.counter);
        capture.next = (capture.next + 1) % FLUX_RING_LEN;
        if capture.next == 0 || capture.next == FLUX_RING_LEN / 2 {
            self.pending |= SimIrqs::WDATA;
        }
    }

    /// Take and clear all pending interrupts.
    pub fn take_pending(&mut self) -> SimIrqs {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> SimIrqs {
        self.pending
    }

    pub fn is_generating(&self) -> bool {
        self.generator.is_some()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.running)
    }

    pub fn rdata_output(&self) -> bool {
        self.rdata_output
    }

    /// Pulses emitted on RDATA while the output was enabled.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Start or stop recording the interval, in sysclk ticks, preceding each emitted pulse.
    pub fn record_flux(&mut self, enable: bool) {
        self.flux_log = enable.then(Vec::new);
    }

    pub fn flux_log(&self) -> &[u32] {
        self.flux_log.as_deref().unwrap_or(&[])
    }

    /// Current physical line levels.
    pub fn lines(&self) -> OutputLines {
        self.lines
    }

    pub fn history(&self) -> &[LineEvent] {
        &self.history
    }

    /// Times at which `line` was asserted.
    pub fn assertions(&self, line: OutputLines) -> Vec<StkTime> {
        self.history
            .iter()
            .filter(|e| e.asserted && e.lines.contains(line))
            .map(|e| e.time)
            .collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Clock for SimBoard {
    fn now(&self) -> StkTime {
        self.now
    }

    fn delay_ticks(&mut self, ticks: u32) {
        self.advance(ticks);
    }
}

impl FluxGenerator for SimBoard {
    fn start_generator(&mut self, ring: &Arc<FluxRing>) {
        let mut generator = Generator {
            ring: Arc::clone(ring),
            next: 0,
            arr: 0,
            cnt: 0,
        };
        // The update event loads the first sample straight away.
        generator.load();
        self.since_pulse = 0;
        self.generator = Some(generator);
    }

    fn stop_generator(&mut self) {
        self.generator = None;
    }

    fn generator_remaining(&self) -> u16 {
        match &self.generator {
            Some(generator) => (FLUX_RING_LEN - generator.next) as u16,
            None => FLUX_RING_LEN as u16,
        }
    }

    fn sample_ticks_left(&self) -> u32 {
        self.generator.as_ref().map_or(0, |g| g.arr - g.cnt)
    }

    fn set_rdata_output(&mut self, enabled: bool) {
        self.rdata_output = enabled;
    }
}

impl FluxCapture for SimBoard {
    fn start_capture(&mut self, ring: &Arc<FluxRing>) {
        self.capture = Some(Capture {
            ring: Arc::clone(ring),
            next: 0,
            counter: 0,
            running: true,
        });
    }

    fn stop_capture(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.running = false;
        }
    }

    fn capture_remaining(&self) -> u16 {
        match &self.capture {
            Some(capture) => (FLUX_RING_LEN - capture.next) as u16,
            None => FLUX_RING_LEN as u16,
        }
    }
}

impl DriveSignals for SimBoard {
    fn set_lines(&mut self, lines: OutputLines, asserted: bool) {
        if lines.is_empty() {
            return;
        }
        self.lines.set(lines, asserted);
        self.history.push(LineEvent {
            time: self.now,
            lines,
            asserted,
        });
    }
}

impl InterruptController for SimBoard {
    fn pend(&mut self, irq: FloppyIrq) {
        self.pending |= SimIrqs::from(irq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::hw_index;

    #[test]
    fn test_generator_streams_ring() {
        let mut board = SimBoard::new(TimeBase::default());
        let ring = Arc::new(FluxRing::new());
        for i in 0..FLUX_RING_LEN as u16 {
            // 8 sysclk ticks, i.e. one stk tick, per sample.
            ring.set_sample(i, 7);
        }
        board.set_rdata_output(true);
        board.record_flux(true);
        board.start_generator(&ring);
        assert_eq!(hw_index(board.generator_remaining()), 1);
        assert_eq!(board.sample_ticks_left(), 7);

        board.advance(511);
        assert_eq!(board.pulses(), 511);
        assert_eq!(hw_index(board.generator_remaining()), 512);
        assert_eq!(board.take_pending(), SimIrqs::RDATA);
        assert!(board.flux_log().iter().all(|&t| t == 8));

        board.advance(512);
        assert_eq!(hw_index(board.generator_remaining()), 0);
        assert_eq!(board.take_pending(), SimIrqs::RDATA);

        board.stop_generator();
        assert_eq!(board.generator_remaining(), FLUX_RING_LEN as u16);
    }

    #[test]
    fn test_capture_counter() {
        let mut board = SimBoard::new(TimeBase::default());
        let ring = Arc::new(FluxRing::new());
        board.start_capture(&ring);
        board.capture_flux(144);
        board.capture_flux(0x10000 - 100);
        assert_eq!(ring.sample(0), 144);
        assert_eq!(ring.sample(1), 44);
        assert_eq!(hw_index(board.capture_remaining()), 2);

        board.stop_capture();
        board.capture_flux(144);
        assert_eq!(hw_index(board.capture_remaining()), 2);
        assert!(board.pending().is_empty());
    }

    #[test]
    fn test_line_history() {
        let mut board = SimBoard::new(TimeBase::default());
        board.set_lines(OutputLines::INDEX | OutputLines::READY, true);
        board.advance(100);
        board.set_lines(OutputLines::INDEX, false);
        assert_eq!(board.lines(), OutputLines::READY);
        assert_eq!(board.assertions(OutputLines::INDEX), vec![StkTime(0)]);
        assert_eq!(board.history().len(), 2);
    }
}

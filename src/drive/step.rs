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

    src/drive/step.rs

    Head step motor state machine.
*/

//! A step pulse is handled in two stages. The high priority edge handler only records the
//! time and direction of the pulse and pends the low priority step interrupt, which latches the
//! step and arms the step timer. The timer applies the cylinder change after the latch delay
//! and then holds the head in [StepState::Settling] for the settle time.
//!
//! A pulse arriving while the head settles restarts the sequence, so a burst of pulses results
//! in a single settle period measured from the last pulse. Pulses arriving before the current
//! step has been applied are counted and applied together with it. A reversal of direction in
//! that window is ignored.

use crate::{
    config::CYL_LIMIT,
    hardware::{FloppyHardware, FloppyIrq},
    image::FloppyImage,
    timer::Timer,
    types::{OutputLines, StkTime},
    Floppy,
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use strum::{Display, EnumIter};

#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StepState {
    /// Head is stationary and data transfer is permitted.
    #[default]
    Idle = 0,
    /// A step edge was captured by the high priority handler.
    Started = 1,
    /// The low priority handler has taken over the step.
    Latched = 2,
    /// The cylinder has changed and the head is settling.
    Settling = 3,
}

impl From<u8> for StepState {
    fn from(value: u8) -> Self {
        match value {
            1 => StepState::Started,
            2 => StepState::Latched,
            3 => StepState::Settling,
            _ => StepState::Idle,
        }
    }
}

/// Step state shared between the edge handler, the step interrupt and the step timer.
///
/// The edge handler may only start a step from [StepState::Idle] or [StepState::Settling]; every
/// other transition belongs to the step interrupt or the timer. The one contended transition,
/// `Settling -> Idle` in the timer against `Settling -> Started` in the edge handler, is a
/// compare-and-swap.
#[derive(Debug, Default)]
pub struct StepMotor {
    state: AtomicU8,
    inward: AtomicBool,
    start: AtomicU32,
    /// Further pulses in the same direction seen while Started or Latched.
    queued: AtomicU8,
    pub(crate) timer: Timer,
}

impl StepMotor {
    pub fn new() -> Self {
        StepMotor::default()
    }

    #[inline]
    pub fn state(&self) -> StepState {
        StepState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: StepState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// True while a step is in flight and the cylinder may be about to change.
    #[inline]
    pub fn is_moving(&self) -> bool {
        matches!(self.state(), StepState::Started | StepState::Latched)
    }

    #[inline]
    pub fn is_settling(&self) -> bool {
        self.state() == StepState::Settling
    }

    /// Time of the step edge that started the current step sequence.
    #[inline]
    pub fn start(&self) -> StkTime {
        StkTime(self.start.load(Ordering::Acquire))
    }

    #[inline]
    pub fn inward(&self) -> bool {
        self.inward.load(Ordering::Acquire)
    }

    /// Pulses waiting to be applied along with the current step.
    #[inline]
    pub fn queued(&self) -> u8 {
        self.queued.load(Ordering::Acquire)
    }

    /// Deadline of the step timer, if armed.
    pub fn deadline(&self) -> Option<StkTime> {
        self.timer.deadline()
    }
}

/// Apply one step to `cyl`. Stepping outward from beyond `max_cyl` first snaps back to
/// `max_cyl`, so that a head parked far out recovers with a single step.
pub(crate) fn step_cylinder(cyl: u8, inward: bool, max_cyl: u8) -> u8 {
    let cyl = if cyl >= max_cyl && !inward { max_cyl } else { cyl };
    if inward {
        cyl.saturating_add(1)
    }
    else {
        cyl.saturating_sub(1)
    }
}

impl<H, I> Floppy<H, I>
where
    H: FloppyHardware,
    I: FloppyImage,
{
    /// High priority handler for a step pulse edge. `inward` is the level of the direction
    /// input when the pulse was seen.
    pub fn step_edge(&mut self, inward: bool) {
        // Any step with a disk present acknowledges a disk change.
        if self.drive.outputs.contains(OutputLines::DSKCHG) && self.mount.as_ref().is_some_and(|m| m.opened) {
            self.drive.change_outputs(&mut self.hw, OutputLines::DSKCHG, false);
        }

        let step = &self.drive.step;
        if step.is_moving() {
            if inward != step.inward() {
                log::debug!("step_edge(): direction reversed mid-step, pulse ignored");
                return;
            }
            let _ = step
                .queued
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1));
            // Settle is measured from the last pulse.
            step.start.store(self.hw.now().ticks(), Ordering::Release);
            return;
        }
        if (!inward && self.drive.cyl == 0) || (inward && self.drive.cyl == CYL_LIMIT) {
            return;
        }

        step.inward.store(inward, Ordering::Relaxed);
        step.start.store(self.hw.now().ticks(), Ordering::Relaxed);
        step.queued.store(0, Ordering::Relaxed);
        step.set_state(StepState::Started);

        if self.drive.cyl == 0 {
            self.drive.change_outputs(&mut self.hw, OutputLines::TRK0, false);
        }
        self.hw.pend(FloppyIrq::Step);
        self.rdata_stop();
    }

    /// Low priority step interrupt: latch a freshly started step and schedule the cylinder
    /// update.
    pub fn step_irq(&mut self) {
        let step = &mut self.drive.step;
        if step.state() == StepState::Started {
            step.timer.cancel();
            step.set_state(StepState::Latched);
            let deadline = step.start().add(self.config.time_base.stk_ms(self.config.step_latch_ms));
            step.timer.set(deadline);
        }
    }

    pub(crate) fn step_timer(&mut self, _deadline: StkTime) {
        match self.drive.step.state() {
            StepState::Idle => {}
            StepState::Started => {
                // The step interrupt will re-arm the timer.
            }
            StepState::Latched => {
                let inward = self.drive.step.inward();
                let steps = 1 + self.drive.step.queued.swap(0, Ordering::AcqRel) as usize;
                let prev = self.drive.cyl;
                for _ in 0..steps {
                    self.drive.cyl = step_cylinder(self.drive.cyl, inward, self.config.max_cyl);
                }
                log::trace!(
                    "Step {} x{}: cyl {} -> {}",
                    if inward { "in" } else { "out" },
                    steps,
                    prev,
                    self.drive.cyl
                );

                let settle = self.config.time_base.stk_ms(self.config.settle_ms);
                self.drive.step.timer.set(self.drive.step.start().add(settle));
                if self.drive.cyl == 0 {
                    self.drive.change_outputs(&mut self.hw, OutputLines::TRK0, true);
                }
                // New state last, as it allows the edge handler to start another step.
                self.drive.step.set_state(StepState::Settling);

                // Pulses counted after the swap above begin a new step.
                let late = self.drive.step.queued.swap(0, Ordering::AcqRel);
                if late > 0 {
                    self.drive.step.queued.store(late - 1, Ordering::Release);
                    self.drive.step.set_state(StepState::Started);
                    self.hw.pend(FloppyIrq::Step);
                }
            }
            StepState::Settling => {
                if self
                    .drive
                    .step
                    .state
                    .compare_exchange(
                        StepState::Settling as u8,
                        StepState::Idle as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    self.stats.settles += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_cylinder() {
        assert_eq!(step_cylinder(0, true, 84), 1);
        assert_eq!(step_cylinder(10, false, 84), 9);
        assert_eq!(step_cylinder(84, true, 84), 85);
        assert_eq!(step_cylinder(85, false, 84), 83);
        // Fast step back from a head parked at the limit.
        assert_eq!(step_cylinder(255, false, 84), 83);
    }

    #[test]
    fn test_step_state_from_u8() {
        assert_eq!(StepState::from(0), StepState::Idle);
        assert_eq!(StepState::from(2), StepState::Latched);
        assert_eq!(StepState::from(3), StepState::Settling);
        assert_eq!(StepState::from(200), StepState::Idle);
    }

    #[test]
    fn test_is_moving() {
        let motor = StepMotor::new();
        assert!(!motor.is_moving());
        motor.set_state(StepState::Started);
        assert!(motor.is_moving());
        motor.set_state(StepState::Latched);
        assert!(motor.is_moving());
        motor.set_state(StepState::Settling);
        assert!(!motor.is_moving());
        assert!(motor.is_settling());
    }
}

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

    src/drive/index.rs

    The virtual index pulse clock.
*/

use crate::{
    hardware::FloppyHardware,
    image::FloppyImage,
    ring::RingState,
    timer::Timer,
    types::{OutputLines, StkTime},
    Floppy,
};

/// Once-per-revolution index pulse. The timer alternates between the end of the asserted pulse
/// and the next index. While the read channel is active the next index deadline is set by the
/// RDATA interrupt from the flux it has queued, instead of from the nominal revolution period.
#[derive(Copy, Clone, Debug, Default)]
pub struct IndexPulse {
    pub(crate) active: bool,
    /// Time of the most recent index, i.e. the leading edge of the last pulse.
    pub(crate) prev_time: StkTime,
    pub(crate) timer: Timer,
}

impl IndexPulse {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn prev_time(&self) -> StkTime {
        self.prev_time
    }

    pub fn deadline(&self) -> Option<StkTime> {
        self.timer.deadline()
    }
}

impl<H, I> Floppy<H, I>
where
    H: FloppyHardware,
    I: FloppyImage,
{
    /// Index timer callback. `deadline` is the time the timer was due, which becomes the index
    /// reference when the pulse is asserted.
    pub(crate) fn index_timer(&mut self, deadline: StkTime) {
        let tb = self.config.time_base;
        self.index.active = !self.index.active;

        if self.index.active {
            self.index.prev_time = deadline;
            self.drive.change_outputs(&mut self.hw, OutputLines::INDEX, true);
            self.index
                .timer
                .set(deadline.add(tb.stk_ms(self.config.index_pulse_ms)));
        }
        else {
            self.drive.change_outputs(&mut self.hw, OutputLines::INDEX, false);
            if self.rd_state() != RingState::Active {
                self.index.timer.set(self.index.prev_time.add(self.config.rev_ticks()));
            }
        }
    }
}

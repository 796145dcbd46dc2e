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

    timer.rs

    A one-shot deadline timer on the stk clock
*/

use crate::types::StkTime;

/// A one-shot timer. The owner arms it with an absolute deadline and polls it from the low
/// priority tier with [Timer::take_due]; an expired timer disarms itself and hands back the
/// deadline it was armed with, so that callbacks can schedule relative to the ideal time
/// rather than the (later) time they actually ran.
#[derive(Copy, Clone, Debug, Default)]
pub struct Timer {
    deadline: Option<StkTime>,
}

impl Timer {
    pub fn new() -> Self {
        Timer { deadline: None }
    }

    /// Arm the timer, replacing any outstanding deadline.
    #[inline]
    pub fn set(&mut self, deadline: StkTime) {
        self.deadline = Some(deadline);
    }

    #[inline]
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[inline]
    pub fn deadline(&self) -> Option<StkTime> {
        self.deadline
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: StkTime) -> bool {
        matches!(self.deadline, Some(deadline) if deadline.delta(now) >= 0)
    }

    /// If the deadline has passed, disarm the timer and return the deadline.
    pub fn take_due(&mut self, now: StkTime) -> Option<StkTime> {
        if self.is_due(now) {
            self.deadline.take()
        }
        else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot() {
        let mut timer = Timer::new();
        assert!(!timer.is_armed());
        assert_eq!(timer.take_due(StkTime(100)), None);

        timer.set(StkTime(50));
        assert!(!timer.is_due(StkTime(49)));
        assert_eq!(timer.take_due(StkTime(49)), None);
        assert_eq!(timer.take_due(StkTime(60)), Some(StkTime(50)));
        // Disarmed after firing.
        assert_eq!(timer.take_due(StkTime(70)), None);
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let mut timer = Timer::new();
        timer.set(StkTime(10));
        timer.set(StkTime(1000));
        assert!(!timer.is_due(StkTime(500)));
        timer.cancel();
        assert!(!timer.is_due(StkTime(5000)));
    }

    #[test]
    fn test_deadline_across_wrap() {
        let mut timer = Timer::new();
        let now = StkTime(u32::MAX - 5);
        timer.set(now.add(10));
        assert!(!timer.is_due(now));
        assert!(timer.is_due(now.add(10)));
    }
}

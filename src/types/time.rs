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

    types/time.rs

    Defines the drive's time base and system tick timestamps
*/

use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// A [TimeBase] relates the two clocks the drive core works in.
///
/// * The **sysclk** clock drives the flux timers. Flux samples in the RDATA and WDATA rings are
///   expressed in sysclk ticks.
/// * The **stk** (system tick) clock is a slower free-running clock used for timestamps and
///   timer deadlines.
///
/// `sysclk_mhz` must be an integer multiple of `stk_mhz`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeBase {
    pub sysclk_mhz: u32,
    pub stk_mhz: u32,
}

impl Default for TimeBase {
    fn default() -> Self {
        TimeBase {
            sysclk_mhz: 72,
            stk_mhz: 9,
        }
    }
}

impl TimeBase {
    #[inline]
    pub fn stk_ms(&self, ms: u32) -> u32 {
        ms * self.stk_mhz * 1000
    }

    #[inline]
    pub fn stk_us(&self, us: u32) -> u32 {
        us * self.stk_mhz
    }

    #[inline]
    pub fn sysclk_us(&self, us: u32) -> u32 {
        us * self.sysclk_mhz
    }

    #[inline]
    pub fn sysclk_ns(&self, ns: u32) -> u32 {
        (ns * self.sysclk_mhz) / 1000
    }

    /// Number of sysclk ticks per stk tick.
    #[inline]
    pub fn sysclk_per_stk(&self) -> u32 {
        self.sysclk_mhz / self.stk_mhz
    }

    /// Convert a stk tick count to whole microseconds.
    #[inline]
    pub fn stk_to_us(&self, ticks: u32) -> u32 {
        ticks / self.stk_mhz
    }
}

/// A timestamp on the free-running stk clock.
///
/// The underlying counter wraps, so timestamps must only ever be compared through
/// [StkTime::delta], which is valid as long as the two times are within half the counter range
/// of each other.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StkTime(pub u32);

impl StkTime {
    #[inline]
    pub fn add(self, ticks: u32) -> StkTime {
        StkTime(self.0.wrapping_add(ticks))
    }

    /// Signed number of ticks from `self` until `later`. Negative if `later` is in the past
    /// relative to `self`.
    #[inline]
    pub fn delta(self, later: StkTime) -> i32 {
        later.0.wrapping_sub(self.0) as i32
    }

    /// Ticks elapsed from `self` to `now`, clamped at zero.
    #[inline]
    pub fn elapsed(self, now: StkTime) -> u32 {
        self.delta(now).max(0) as u32
    }

    #[inline]
    pub fn ticks(self) -> u32 {
        self.0
    }
}

impl Display for StkTime {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}

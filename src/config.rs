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

    config.rs

    Drive timing and buffer configuration
*/

use crate::{types::TimeBase, DriveError};

/// Default size of the per-mount arena, in bytes.
pub const DEFAULT_ARENA_SIZE: usize = 36 * 1024;
/// Default size of the decoded write buffer, in bytes. It is large to absorb long write
/// latencies at the storage layer.
pub const DEFAULT_WRITE_MFM_LEN: usize = 20 * 1024;
/// Highest cylinder the step logic will reach stepping inward.
pub const CYL_LIMIT: u8 = 255;

/// Longest period, in stk or sysclk ticks, that any configured time may convert to.
pub const MAX_PERIOD_TICKS: u64 = (i32::MAX as u64) / 4;

/// Timing and buffer parameters of the emulated drive.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveConfig {
    pub time_base: TimeBase,
    /// Nominal revolution period. 200ms is 300RPM.
    pub ms_per_rev: u32,
    /// Width of the asserted index pulse.
    pub index_pulse_ms: u32,
    /// Delay from a step edge to the cylinder update.
    pub step_latch_ms: u32,
    /// Head settle time after the last step.
    pub settle_ms: u32,
    /// Time allowed from the current rotational position to load a new track.
    pub read_lookahead_ms: u32,
    /// The read channel only busy-waits for its rotational deadline when it is this close.
    pub sync_window_ms: u32,
    /// Highest real cylinder. Stepping out from above it snaps back here first.
    pub max_cyl: u8,
    /// Fixed delay after arming the write capture. Empirically required by X-Copy.
    pub write_start_delay_us: u32,
    /// Write decoder cell width.
    pub write_cell_ns: u32,
    pub arena_size: usize,
    pub write_mfm_len: usize,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            time_base: TimeBase::default(),
            ms_per_rev: 200,
            index_pulse_ms: 2,
            step_latch_ms: 2,
            settle_ms: 12,
            read_lookahead_ms: 10,
            sync_window_ms: 5,
            max_cyl: 84,
            write_start_delay_us: 100,
            write_cell_ns: 1000,
            arena_size: DEFAULT_ARENA_SIZE,
            write_mfm_len: DEFAULT_WRITE_MFM_LEN,
        }
    }
}

impl DriveConfig {
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn with_rpm(mut self, rpm: u32) -> Self {
        if rpm > 0 {
            self.ms_per_rev = 60_000 / rpm;
        }
        self
    }

    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub fn with_write_start_delay_us(mut self, us: u32) -> Self {
        self.write_start_delay_us = us;
        self
    }

    pub fn with_buffers(mut self, arena_size: usize, write_mfm_len: usize) -> Self {
        self.arena_size = arena_size;
        self.write_mfm_len = write_mfm_len;
        self
    }

    /// Nominal revolution period in stk ticks.
    pub fn rev_ticks(&self) -> u32 {
        self.time_base.stk_ms(self.ms_per_rev)
    }

    /// Write decoder cell width in sysclk ticks.
    pub fn write_cell_ticks(&self) -> u32 {
        self.time_base.sysclk_ns(self.write_cell_ns)
    }

    pub fn validate(&self) -> Result<(), DriveError> {
        let tb = &self.time_base;
        if tb.stk_mhz == 0 || tb.sysclk_mhz == 0 {
            return Err(DriveError::Config("clock rates must be non-zero".to_string()));
        }
        if tb.sysclk_mhz % tb.stk_mhz != 0 {
            return Err(DriveError::Config(format!(
                "sysclk ({}MHz) is not a multiple of stk ({}MHz)",
                tb.sysclk_mhz, tb.stk_mhz
            )));
        }
        if self.ms_per_rev == 0 || self.index_pulse_ms == 0 || self.index_pulse_ms >= self.ms_per_rev {
            return Err(DriveError::Config(format!(
                "bad rotation timing: {}ms revolution, {}ms index pulse",
                self.ms_per_rev, self.index_pulse_ms
            )));
        }
        // Deadlines are compared as signed deltas, so every period must fit comfortably once
        // converted to clock ticks.
        let stk_per_ms = tb.stk_mhz as u64 * 1000;
        let periods = [
            ("ms_per_rev", self.ms_per_rev as u64 * stk_per_ms),
            ("index_pulse_ms", self.index_pulse_ms as u64 * stk_per_ms),
            ("step_latch_ms", self.step_latch_ms as u64 * stk_per_ms),
            ("settle_ms", self.settle_ms as u64 * stk_per_ms),
            ("read_lookahead_ms", self.read_lookahead_ms as u64 * stk_per_ms),
            ("sync_window_ms", self.sync_window_ms as u64 * stk_per_ms),
            ("write_start_delay_us", self.write_start_delay_us as u64 * tb.stk_mhz as u64),
            // Rotational positions are handed to the image in sysclk ticks.
            ("ms_per_rev (sysclk)", self.ms_per_rev as u64 * tb.sysclk_mhz as u64 * 1000),
            ("write_cell_ns", self.write_cell_ns as u64 * tb.sysclk_mhz as u64),
        ];
        if let Some((name, ticks)) = periods.iter().find(|(_, ticks)| *ticks > MAX_PERIOD_TICKS) {
            return Err(DriveError::Config(format!(
                "{} is too long: {} clock ticks, limit {}",
                name, ticks, MAX_PERIOD_TICKS
            )));
        }
        if self.write_cell_ticks() == 0 {
            return Err(DriveError::Config("write cell is shorter than one sysclk tick".to_string()));
        }
        if self.max_cyl == 0 {
            return Err(DriveError::Config("max_cyl must be non-zero".to_string()));
        }
        if self.write_mfm_len < 8 || self.write_mfm_len % 8 != 0 {
            return Err(DriveError::Config(format!(
                "write_mfm_len ({}) must be a non-zero multiple of 8 bytes",
                self.write_mfm_len
            )));
        }
        if self.write_mfm_len >= self.arena_size {
            return Err(DriveError::Config(format!(
                "write_mfm_len ({}) does not fit in the arena ({})",
                self.write_mfm_len, self.arena_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DriveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rev_ticks(), 1_800_000);
        assert_eq!(config.write_cell_ticks(), 72);
    }

    #[test]
    fn test_rpm() {
        let config = DriveConfig::default().with_rpm(360);
        assert_eq!(config.ms_per_rev, 166);
    }

    #[test]
    fn test_rejects_bad_clock_ratio() {
        let config = DriveConfig::default().with_time_base(TimeBase {
            sysclk_mhz: 72,
            stk_mhz: 7,
        });
        assert!(matches!(config.validate(), Err(DriveError::Config(_))));
    }

    #[test]
    fn test_rejects_overlong_periods() {
        let config = DriveConfig::default().with_settle_ms(500_000);
        assert!(matches!(config.validate(), Err(DriveError::Config(_))));

        let config = DriveConfig::default().with_write_start_delay_us(u32::MAX / 2);
        assert!(config.validate().is_err());

        let mut config = DriveConfig::default();
        config.write_cell_ns = u32::MAX;
        assert!(config.validate().is_err());

        // A slow stk clock keeps the stk revolution short, but not the sysclk one.
        let mut config = DriveConfig::default().with_time_base(TimeBase {
            sysclk_mhz: 3_000,
            stk_mhz: 1,
        });
        config.ms_per_rev = 200;
        assert!(config.validate().is_err());

        // Long but representable values are still accepted.
        let config = DriveConfig::default().with_settle_ms(50_000);
        assert!(config.validate().is_ok());
        assert_eq!(config.time_base.stk_ms(config.settle_ms), 450_000_000);
    }

    #[test]
    fn test_rejects_oversized_write_buffer() {
        let config = DriveConfig::default().with_buffers(16 * 1024, 20 * 1024);
        assert!(config.validate().is_err());
        let config = DriveConfig::default().with_buffers(16 * 1024, 1001);
        assert!(config.validate().is_err());
    }
}

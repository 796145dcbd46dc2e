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

    structs.rs

    Defines common structs
*/

use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// Identifies the image selected for a drive. Selection policy is up to the caller; the drive
/// core only hands the slot to [crate::FloppyImage::open].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageSlot {
    pub name: String,
    pub size: u64,
    pub read_only: bool,
}

impl ImageSlot {
    pub fn new(name: &str, size: u64) -> Self {
        ImageSlot {
            name: name.to_string(),
            size,
            read_only: false,
        }
    }
}

/// Diagnostic counters kept by the drive core for postmortem inspection. None of these
/// conditions are fatal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveStats {
    /// Number of times the flux generator consumed samples that had not been produced yet.
    pub rdata_underruns: u32,
    /// Number of write starts dropped because a previous write was still draining.
    pub missed_writes: u32,
    /// Number of write streams started.
    pub writes: u32,
    /// Longest observed `read_track` call, in microseconds.
    pub max_read_us: u32,
    /// Error between the rotational deadline and the moment the generator went live, in stk
    /// ticks. Positive values mean the generator started early.
    pub last_sync_ticks: i32,
    /// Number of times the index clock was re-disciplined from the RDATA bitstream.
    pub index_resyncs: u32,
    /// Number of head settle periods that ran to completion.
    pub settles: u32,
}

impl Display for DriveStats {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "Underruns: {} Missed writes: {} Writes: {} Max read: {}us Last sync: {}t Index resyncs: {} Settles: {}",
            self.rdata_underruns,
            self.missed_writes,
            self.writes,
            self.max_read_us,
            self.last_sync_ticks,
            self.index_resyncs,
            self.settles
        )
    }
}

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

    src/drive/mod.rs

    The emulated drive: head position, image binding and channel arbitration.
*/

//! [Floppy] is the single emulated drive unit. It owns the board, the head position and step
//! motor, the index clock, and, while a disk is inserted, the mounted image with its flux rings
//! and buffers.
//!
//! The read and write channels are mutually exclusive. The write channel has priority: while it
//! is anywhere but Inactive the polling pass services it, and it will not leave Starting until
//! the read channel has fully stopped.

mod index;
mod rdata;
mod step;
mod wdata;

pub use index::IndexPulse;
pub use step::{StepMotor, StepState};

use crate::{
    arena::{Arena, ImageBuffers},
    config::DriveConfig,
    hardware::{DriveSignals, FloppyHardware},
    image::FloppyImage,
    ring::{FluxRing, RingState, FLUX_RING_LEN},
    types::{DriveStats, ImageSlot, OutputLines, StkTime},
    DriveError,
};
use std::sync::Arc;

/// Upper bound on timer callbacks run by a single [Floppy::run_timers] call.
const MAX_TIMER_ROUNDS: usize = 16;

/// Head position and drive interface state. Tracked at all times, even with no disk inserted.
#[derive(Debug, Default)]
pub struct Drive {
    pub(crate) cyl: u8,
    pub(crate) head: u8,
    pub(crate) sel: bool,
    pub(crate) step: StepMotor,
    /// Latched output levels. Lines are only driven while the drive is selected.
    pub(crate) outputs: OutputLines,
}

impl Drive {
    /// Track number of the current head position.
    #[inline]
    pub fn track(&self) -> u16 {
        self.cyl as u16 * 2 + self.head as u16
    }

    #[inline]
    pub fn cyl(&self) -> u8 {
        self.cyl
    }

    #[inline]
    pub fn head(&self) -> u8 {
        self.head
    }

    pub fn step_motor(&self) -> &StepMotor {
        &self.step
    }

    pub(crate) fn change_outputs<S: DriveSignals>(&mut self, signals: &mut S, lines: OutputLines, asserted: bool) {
        self.outputs.set(lines, asserted);
        if self.sel {
            signals.set_lines(lines, asserted);
        }
    }
}

/// An inserted disk.
pub(crate) struct Mount<I> {
    pub(crate) image: I,
    pub(crate) slot: ImageSlot,
    /// The image is opened lazily from the polling pass.
    pub(crate) opened: bool,
    pub(crate) rd: Arc<FluxRing>,
    pub(crate) wr: Arc<FluxRing>,
    pub(crate) bufs: ImageBuffers,
    /// Staging area for samples moving between the image and a ring.
    pub(crate) scratch: Vec<u16>,
    /// Rotational deadline at which a primed read stream goes live.
    pub(crate) sync_time: StkTime,
}

pub struct Floppy<H, I>
where
    H: FloppyHardware,
    I: FloppyImage,
{
    pub(crate) hw: H,
    pub(crate) config: DriveConfig,
    pub(crate) drive: Drive,
    pub(crate) index: IndexPulse,
    pub(crate) mount: Option<Mount<I>>,
    arena: Option<Arena>,
    pub(crate) stats: DriveStats,
}

impl<H, I> Floppy<H, I>
where
    H: FloppyHardware,
    I: FloppyImage,
{
    /// Create an empty, deselected drive at cylinder 0.
    pub fn new(hw: H, config: DriveConfig) -> Result<Self, DriveError> {
        config.validate()?;

        let mut floppy = Floppy {
            hw,
            config,
            drive: Drive::default(),
            index: IndexPulse::default(),
            mount: None,
            arena: None,
            stats: DriveStats::default(),
        };
        floppy.drive.change_outputs(
            &mut floppy.hw,
            OutputLines::DSKCHG | OutputLines::WRPROT | OutputLines::TRK0,
            true,
        );
        Ok(floppy)
    }

    /// Insert a disk. Buffers are carved from the arena here, but the image is only opened by
    /// the next polling pass. Any disk already inserted is ejected first.
    pub fn insert(&mut self, image: I, slot: ImageSlot) -> Result<(), DriveError> {
        if self.mount.is_some() {
            self.cancel();
        }

        let arena = match self.arena.take() {
            Some(arena) => arena,
            None => Arena::new(self.config.arena_size),
        };
        let bufs = ImageBuffers::carve(arena, self.config.write_mfm_len)?;

        log::debug!("insert(): slot '{}', {} bytes", slot.name, slot.size);
        self.mount = Some(Mount {
            image,
            slot,
            opened: false,
            rd: Arc::new(FluxRing::new()),
            wr: Arc::new(FluxRing::new()),
            bufs,
            scratch: vec![0; FLUX_RING_LEN],
            sync_time: StkTime::default(),
        });

        self.index.prev_time = self.hw.now();
        self.index.timer.set(self.index.prev_time.add(self.config.rev_ticks()));

        // Drive is 'ready'.
        self.drive.change_outputs(&mut self.hw, OutputLines::READY, true);
        Ok(())
    }

    /// Eject the disk, returning the image if one was inserted.
    pub fn cancel(&mut self) -> Option<I> {
        self.mount.as_ref()?;

        self.index.timer.cancel();
        self.rdata_stop();
        self.wdata_stop();

        let mount = self.mount.take()?;
        self.arena = Some(mount.bufs.into_arena());
        self.stats.max_read_us = 0;

        // Outputs for an empty drive.
        self.index.active = false;
        self.drive
            .change_outputs(&mut self.hw, OutputLines::INDEX | OutputLines::READY, false);
        self.drive
            .change_outputs(&mut self.hw, OutputLines::DSKCHG | OutputLines::WRPROT, true);

        log::debug!("cancel(): ejected '{}'", mount.slot.name);
        Some(mount.image)
    }

    /// The cooperative polling pass. Opens a newly inserted image, then advances whichever
    /// channel is in charge.
    ///
    /// An error means the pass could not complete; the caller should simply call `handle`
    /// again later. [DriveError::NoDisk] is returned when there is nothing to do.
    pub fn handle(&mut self) -> Result<(), DriveError> {
        let Some(mount) = self.mount.as_mut()
        else {
            return Err(DriveError::NoDisk);
        };

        if !mount.opened {
            mount.image.open(&mount.slot)?;
            mount.opened = true;
            // Arm the free-running index clock via the read channel's Stopping pass.
            mount.rd.set_state(RingState::Stopping);
            let writable = mount.image.is_writable() && !mount.slot.read_only;
            log::debug!("handle(): opened '{}', writable: {}", mount.slot.name, writable);
            if writable {
                self.drive.change_outputs(&mut self.hw, OutputLines::WRPROT, false);
            }
        }

        self.wdata_handle()
    }

    /// Fire the step and index timers whose deadlines have passed.
    pub fn run_timers(&mut self) {
        for _ in 0..MAX_TIMER_ROUNDS {
            let now = self.hw.now();
            let mut fired = false;

            if let Some(deadline) = self.drive.step.timer.take_due(now) {
                self.step_timer(deadline);
                fired = true;
            }
            if let Some(deadline) = self.index.timer.take_due(now) {
                self.index_timer(deadline);
                fired = true;
            }
            if !fired {
                break;
            }
        }
    }

    /// Side select input changed.
    pub fn set_head(&mut self, head: u8) {
        let head = head & 1;
        if head != self.drive.head {
            self.drive.head = head;
            self.rdata_stop();
        }
    }

    /// Drive select input changed. A deselected drive releases all of its outputs.
    pub fn set_selected(&mut self, selected: bool) {
        self.drive.sel = selected;
        if selected {
            self.hw.set_lines(self.drive.outputs, true);
            self.hw.set_lines(self.drive.outputs.complement(), false);
            if self.rd_state() == RingState::Active {
                self.hw.set_rdata_output(true);
            }
        }
        else {
            self.hw.set_lines(OutputLines::all(), false);
            self.hw.set_rdata_output(false);
        }
    }

    /// Write gate input changed.
    pub fn write_gate(&mut self, asserted: bool) {
        if !asserted {
            self.wdata_stop();
            return;
        }
        if self.mount.is_none() || self.drive.outputs.contains(OutputLines::WRPROT) {
            return;
        }
        self.rdata_stop();
        self.wdata_start();
    }

    /// Current `(cylinder, head)`.
    pub fn get_track(&self) -> (u8, u8) {
        (self.drive.cyl, self.drive.head)
    }

    pub fn drive(&self) -> &Drive {
        &self.drive
    }

    pub fn step_state(&self) -> StepState {
        self.drive.step.state()
    }

    pub fn step_deadline(&self) -> Option<StkTime> {
        self.drive.step.deadline()
    }

    pub fn index(&self) -> &IndexPulse {
        &self.index
    }

    /// Latched output levels, regardless of selection.
    pub fn outputs(&self) -> OutputLines {
        self.drive.outputs
    }

    pub fn is_selected(&self) -> bool {
        self.drive.sel
    }

    pub fn rd_state(&self) -> RingState {
        self.mount.as_ref().map_or(RingState::Inactive, |m| m.rd.state())
    }

    pub fn wr_state(&self) -> RingState {
        self.mount.as_ref().map_or(RingState::Inactive, |m| m.wr.state())
    }

    pub fn read_ring(&self) -> Option<&Arc<FluxRing>> {
        self.mount.as_ref().map(|m| &m.rd)
    }

    pub fn write_ring(&self) -> Option<&Arc<FluxRing>> {
        self.mount.as_ref().map(|m| &m.wr)
    }

    /// Bit position reached by the write decoder in the write MFM buffer.
    pub fn write_mfm_prod(&self) -> Option<u32> {
        self.mount.as_ref().map(|m| m.bufs.write_mfm.prod)
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.as_ref().is_some_and(|m| m.opened)
    }

    pub fn image(&self) -> Option<&I> {
        self.mount.as_ref().map(|m| &m.image)
    }

    pub fn image_mut(&mut self) -> Option<&mut I> {
        self.mount.as_mut().map(|m| &mut m.image)
    }

    pub fn stats(&self) -> &DriveStats {
        &self.stats
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }
}

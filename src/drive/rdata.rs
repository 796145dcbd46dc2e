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

    src/drive/rdata.rs

    The RDATA channel: flux generation from the mounted image.
*/

use crate::{
    hardware::{FloppyHardware, FloppyIrq},
    image::FloppyImage,
    ring::{contiguous_free, hw_index, underrun, RingState, FLUX_RING_LEN, FLUX_RING_MASK},
    DriveError,
    Floppy,
};

/// Attempts at a consistent snapshot of the generator position. The generator loads a new
/// sample every few microseconds at most, so a second attempt practically always succeeds.
const SNAPSHOT_RETRIES: usize = 8;

impl<H, I> Floppy<H, I>
where
    H: FloppyHardware,
    I: FloppyImage,
{
    /// Stop the read stream. Safe to call from any context and in any state.
    pub fn rdata_stop(&mut self) {
        let Some(mount) = self.mount.as_ref()
        else {
            return;
        };

        let prev_state = mount.rd.state();
        if prev_state == RingState::Inactive {
            return;
        }
        mount.rd.set_state(RingState::Stopping);

        // The generator only runs once the ring is Active.
        if prev_state != RingState::Active {
            return;
        }
        self.hw.set_rdata_output(false);
        self.hw.stop_generator();
    }

    /// Take the generator live. Called once the ring is primed and the rotational deadline is
    /// imminent.
    fn rdata_start(&mut self) {
        let Some(mount) = self.mount.as_ref()
        else {
            return;
        };

        // A stop request may have raced us here.
        if !mount.rd.transition(RingState::Starting, RingState::Active) {
            log::debug!("rdata_start(): read stream stopped while starting");
            return;
        }

        self.hw.start_generator(&mount.rd);
        if self.drive.sel {
            self.hw.set_rdata_output(true);
        }
    }

    /// Stage more track data, and kick the RDATA interrupt if it was waiting on us.
    fn read_data(&mut self) {
        let Some(mount) = self.mount.as_mut()
        else {
            return;
        };

        let timestamp = self.hw.now();
        if mount.image.read_track(&mut mount.bufs) && mount.rd.take_kick() {
            self.hw.pend(FloppyIrq::Rdata);
        }

        let read_us = self.config.time_base.stk_to_us(timestamp.elapsed(self.hw.now()));
        if read_us > self.stats.max_read_us {
            self.stats.max_read_us = read_us;
            log::info!("New max: read_us={}", read_us);
        }
    }

    /// Prime the ring and go live when the rotational deadline arrives.
    fn sync_flux(&mut self) {
        let Some(mount) = self.mount.as_mut()
        else {
            return;
        };

        let prod = mount.rd.prod() as usize;
        let nr = FLUX_RING_LEN - prod - 1;
        if nr > 0 {
            let done = mount.image.rdata_flux(&mut mount.bufs, &mut mount.scratch[..nr]);
            mount.rd.store_samples(prod as u16, &mount.scratch[..done]);
            mount.rd.set_prod((prod + done) as u16);
        }

        if (mount.rd.prod() as usize) < FLUX_RING_LEN / 2 {
            return;
        }

        let tb = self.config.time_base;
        let sync_time = mount.sync_time;
        let ticks = self.hw.now().delta(sync_time) - tb.stk_us(1) as i32;
        if ticks > tb.stk_ms(self.config.sync_window_ms) as i32 {
            // Ages to wait. Go do other work.
            return;
        }
        if ticks > 0 {
            self.hw.delay_ticks(ticks as u32);
        }

        let ticks = self.hw.now().delta(sync_time);
        self.rdata_start();
        self.stats.last_sync_ticks = ticks;
        if let Some(mount) = self.mount.as_ref() {
            log::info!("Trk {}: sync_ticks={}", mount.image.cur_track(), ticks);
        }
    }

    /// Polling pass for the read channel.
    pub(crate) fn rdata_handle(&mut self) -> Result<(), DriveError> {
        let Some(mount) = self.mount.as_mut()
        else {
            return Ok(());
        };

        match mount.rd.state() {
            RingState::Inactive => {
                let tb = self.config.time_base;
                let rev = self.config.rev_ticks();
                let now = self.hw.now();

                // Allow time from the current rotational position to load the new track, and
                // extra time if the heads are still settling.
                let mut delay = tb.stk_ms(self.config.read_lookahead_ms) as i32;
                if self.drive.step.is_settling() {
                    let settle_end = self.drive.step.start().add(tb.stk_ms(self.config.settle_ms));
                    delay = delay.max(now.delta(settle_end));
                }
                // Check for settling before checking for movement.
                if self.drive.step.is_moving() {
                    return Ok(());
                }

                // Work out where in the new track to start reading.
                let index_time = self.index.prev_time;
                let since_index = index_time.delta(now).max(0) as u32;
                let read_start = (since_index + delay as u32) % rev;

                let track = self.drive.track();
                let per = tb.sysclk_per_stk();
                let mut start_pos = read_start * per;
                mount.image.seek_track(track, Some(&mut start_pos))?;
                let read_start = start_pos / per;

                let mut sync_time = index_time.add(read_start);
                if self.hw.now().delta(sync_time) < 0 {
                    sync_time = sync_time.add(rev);
                }
                mount.sync_time = sync_time;

                // Change state, then check for a race against a step, side change or write.
                mount.rd.set_state(RingState::Starting);
                if self.drive.step.is_moving() || track != self.drive.track() || mount.wr.state() != RingState::Inactive {
                    log::debug!("rdata_handle(): start of track {} invalidated", track);
                    mount.rd.set_state(RingState::Stopping);
                }
            }
            RingState::Starting => {
                self.read_data();
                self.sync_flux();
            }
            RingState::Active => {
                self.read_data();
            }
            RingState::Stopping => {
                mount.rd.reset_indices();
                mount.rd.set_state(RingState::Inactive);
                // Back to a free-running index clock.
                if !self.index.active {
                    self.index.timer.set(self.index.prev_time.add(self.config.rev_ticks()));
                }
            }
        }
        Ok(())
    }

    /// RDATA streaming interrupt, raised when the generator passes the half and the end of the
    /// ring. Refills the free stretch of the ring and, on crossing the track index, locks the
    /// index clock to the queued flux.
    pub fn rdata_irq(&mut self) {
        let Some(mount) = self.mount.as_mut()
        else {
            return;
        };
        let rd = &mount.rd;

        // If we happen to be called in the wrong state, just bail.
        if rd.state() != RingState::Active {
            return;
        }

        let hw_cons = hw_index(self.hw.generator_remaining());
        let (cons, prod) = (rd.cons(), rd.prod());
        if hw_cons != cons && underrun(cons, prod, hw_cons) {
            self.stats.rdata_underruns += 1;
            log::warn!("RDATA underrun! {:x}-{:x}-{:x}", cons, prod, hw_cons);
        }
        rd.set_cons(hw_cons);

        let (nr, nr_to_cons) = contiguous_free(prod, hw_cons);
        if nr == 0 {
            return;
        }

        let prev_ticks_since_index = mount.image.ticks_since_index();
        let nr = nr as usize;
        let done = mount.image.rdata_flux(&mut mount.bufs, &mut mount.scratch[..nr]);
        rd.store_samples(prod, &mount.scratch[..done]);
        rd.set_prod((prod as usize + done) as u16 & FLUX_RING_MASK);

        if done != nr {
            // The image ran dry. Kick us when more data is available.
            rd.request_kick();
        }
        else if nr != nr_to_cons as usize {
            // Stopped at the end of the ring. Come back for the rest.
            self.hw.pend(FloppyIrq::Rdata);
        }

        if mount.image.ticks_since_index() >= prev_ticks_since_index {
            return;
        }

        // We crossed the index mark: take a consistent snapshot of the generator position,
        // including progress through the sample it is currently playing.
        let mut now = self.hw.now();
        let mut ticks = self.hw.sample_ticks_left();
        for _ in 0..SNAPSHOT_RETRIES {
            now = self.hw.now();
            ticks = self.hw.sample_ticks_left();
            let hw_cons = hw_index(self.hw.generator_remaining());
            if hw_cons == rd.cons() {
                break;
            }
            rd.set_cons(hw_cons);
        }

        ticks += rd.sum_intervals(rd.cons(), rd.prod());
        ticks = ticks.saturating_sub(mount.image.ticks_since_index());
        ticks /= self.config.time_base.sysclk_per_stk();

        self.index.timer.set(now.add(ticks));
        self.stats.index_resyncs += 1;
    }
}

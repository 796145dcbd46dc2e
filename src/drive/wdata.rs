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

    src/drive/wdata.rs

    The WDATA channel: flux capture and decode into the mounted image.
*/

use crate::{
    codec::FluxDecoder,
    hardware::{FloppyHardware, FloppyIrq},
    image::FloppyImage,
    ring::{hw_index, RingState, FLUX_RING_MASK},
    DriveError,
    Floppy,
};

impl<H, I> Floppy<H, I>
where
    H: FloppyHardware,
    I: FloppyImage,
{
    /// Arm the capture channel for a new write stream.
    pub(crate) fn wdata_start(&mut self) {
        let Some(mount) = self.mount.as_mut()
        else {
            return;
        };

        if mount.wr.state() != RingState::Inactive {
            self.stats.missed_writes += 1;
            log::warn!("*** Missed write");
            return;
        }
        mount.wr.set_state(RingState::Starting);
        self.hw.start_capture(&mount.wr);

        // Rotational start position of the write, in sysclk ticks since the index.
        let tb = self.config.time_base;
        let since_index = self.index.prev_time.delta(self.hw.now()).max(0) as u32;
        let start_pos = (since_index % self.config.rev_ticks()) * tb.sysclk_per_stk();
        mount.image.set_write_start(start_pos);
        log::info!("Write start {} us", start_pos / tb.sysclk_mhz);

        self.stats.writes += 1;
        // Required by X-Copy.
        self.hw.delay_ticks(tb.stk_us(self.config.write_start_delay_us));
    }

    /// Stop the write stream. Safe to call from any context and in any state; the captured tail
    /// is drained by the WDATA interrupt and the polling pass.
    pub fn wdata_stop(&mut self) {
        let Some(mount) = self.mount.as_ref()
        else {
            return;
        };

        match mount.wr.state() {
            RingState::Inactive | RingState::Stopping => return,
            _ => {}
        }
        mount.wr.set_state(RingState::Stopping);
        self.hw.stop_capture();

        // Drain the flux ring.
        self.hw.pend(FloppyIrq::Wdata);
    }

    /// WDATA streaming interrupt: decode newly captured flux into the write MFM buffer.
    pub fn wdata_irq(&mut self) {
        let Some(mount) = self.mount.as_mut()
        else {
            return;
        };
        let wr = &mount.wr;

        // If we happen to be called in the wrong state, just bail.
        if wr.state() == RingState::Inactive {
            return;
        }

        let prod = hw_index(self.hw.capture_remaining());
        let mut cons = wr.cons();
        let mut n = 0;
        while cons != prod {
            mount.scratch[n] = wr.sample(cons);
            n += 1;
            cons = (cons + 1) & FLUX_RING_MASK;
        }

        let decoder = FluxDecoder::new(self.config.write_cell_ticks(), mount.image.syncword());
        let mut prev = wr.prev_sample();
        let mut bit_prod = mount.bufs.write_mfm.prod;
        decoder.decode(
            mount.scratch[..n].iter().copied(),
            &mut prev,
            &mut bit_prod,
            mount.bufs.write_mfm_bytes_mut(),
        );

        mount.bufs.write_mfm.prod = bit_prod;
        wr.set_cons(cons);
        wr.set_prev_sample(prev);
    }

    /// Polling pass with the write channel in charge. The read channel is only serviced while
    /// no write is in progress.
    pub(crate) fn wdata_handle(&mut self) -> Result<(), DriveError> {
        let Some(mount) = self.mount.as_mut()
        else {
            return Ok(());
        };

        match mount.wr.state() {
            RingState::Inactive => self.rdata_handle()?,
            RingState::Starting => {
                // Bail out of read mode.
                if mount.rd.state() != RingState::Inactive {
                    self.rdata_stop();
                    self.rdata_handle()?;
                }

                let Some(mount) = self.mount.as_mut()
                else {
                    return Ok(());
                };
                if mount.rd.state() != RingState::Inactive {
                    return Ok(());
                }

                // Make sure we're on the correct track.
                mount.image.seek_track(self.drive.track(), None)?;

                // May race wdata_stop().
                if !mount.wr.transition(RingState::Starting, RingState::Active) {
                    log::debug!("wdata_handle(): write stopped while starting");
                }
            }
            RingState::Active => {
                mount.image.write_track(&mut mount.bufs, false);
            }
            RingState::Stopping => {
                // Wait for the flux ring to drain into the MFM buffer, writing data out
                // meanwhile.
                let prod = hw_index(self.hw.capture_remaining());
                let cons = mount.wr.cons();
                let drained = cons == prod;
                mount.image.write_track(&mut mount.bufs, drained);
                if !drained {
                    return Ok(());
                }

                mount.image.sync()?;

                // Clear the flux ring and the write buffers, then allow reactivation of the
                // write path last.
                mount.wr.set_cons(0);
                mount.wr.set_prev_sample(0);
                mount.bufs.reset_write();
                mount.wr.set_state(RingState::Inactive);
            }
        }
        Ok(())
    }
}

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

    src/sim/image.rs

    A simulated disk image backed by per-track MFM bitstreams.
*/

use crate::{
    arena::ImageBuffers,
    codec::{encode_mfm, MFM_SYNC_WORD},
    image::FloppyImage,
    types::ImageSlot,
    ImageError,
};
use bit_vec::BitVec;

/// Length of a double density MFM bit cell (2us) in sysclk ticks at 72MHz.
pub const DD_CELL_TICKS: u32 = 144;
/// Bit cells on a double density track at 300RPM.
pub const DD_TRACK_BITS: usize = 100_000;

const GAP_BYTE: u8 = 0x4E;
/// An 0xA1 byte with a missing clock bit, as it appears in raw MFM.
const SYNC_MARK: [u8; 2] = [0x44, 0x89];

/// Append `data` to an MFM bitstream, continuing the clock pattern from its last data bit.
fn push_mfm(bits: &mut BitVec, data: &[u8]) {
    let prev = bits.len() > 0 && bits[bits.len() - 1];
    bits.extend(encode_mfm(data, prev).iter());
}

/// Build a track of `track_bits` cells: a leading gap, a sync run of three address marks, the
/// `payload`, and gap fill to the end of the track.
pub fn build_track(payload: &[u8], track_bits: usize) -> BitVec {
    let mut bits = BitVec::with_capacity(track_bits + 16);
    push_mfm(&mut bits, &[GAP_BYTE; 80]);
    push_mfm(&mut bits, &[0x00; 12]);
    for _ in 0..3 {
        bits.extend(BitVec::from_bytes(&SYNC_MARK).iter());
    }
    push_mfm(&mut bits, payload);
    while bits.len() < track_bits {
        push_mfm(&mut bits, &[GAP_BYTE]);
    }
    bits.truncate(track_bits);
    bits
}

/// A [FloppyImage] held entirely in memory.
///
/// Each track is a raw MFM bitstream whose first cell sits at the index. Flux is produced by
/// walking the bitstream from the position chosen at seek time, one sample per `1` cell. The
/// image can be told to fail opens, stall seeks and ration flux, to exercise the retry and
/// underrun paths of the drive.
#[derive(Clone, Debug)]
pub struct SimImage {
    tracks: Vec<BitVec>,
    blank: BitVec,
    cell_ticks: u32,
    writable: bool,

    opened: bool,
    cur_track: u16,
    bit_pos: usize,
    ticks_since_index: u32,

    open_failures: u32,
    seek_delays: u32,
    sync_failures: u32,
    flux_budget: Option<usize>,
    staged_flux: usize,

    write_start: Option<u32>,
    written: Vec<u32>,
    flushes: u32,
    syncs: u32,
    seeks: u32,
}

impl SimImage {
    /// An image whose tracks are all blank gap fill of `track_bits` cells.
    pub fn new(track_bits: usize) -> Self {
        SimImage {
            tracks: Vec::new(),
            blank: build_track(&[], track_bits),
            cell_ticks: DD_CELL_TICKS,
            writable: true,
            opened: false,
            cur_track: 0,
            bit_pos: 0,
            ticks_since_index: 0,
            open_failures: 0,
            seek_delays: 0,
            sync_failures: 0,
            flux_budget: None,
            staged_flux: 0,
            write_start: None,
            written: Vec::new(),
            flushes: 0,
            syncs: 0,
            seeks: 0,
        }
    }

    /// A formatted image of `cyls` cylinders and two heads. Each track carries an ID field and
    /// a sector filled with its own track number.
    pub fn formatted(cyls: u8, track_bits: usize) -> Self {
        let mut image = SimImage::new(track_bits);
        for cyl in 0..cyls {
            for head in 0..2u8 {
                let track = cyl as u16 * 2 + head as u16;
                let mut payload = vec![0xFE, cyl, head, 0x01, 0x02];
                payload.extend_from_slice(&[GAP_BYTE; 22]);
                payload.extend_from_slice(&[0x00; 12]);
                payload.extend_from_slice(&[0xA1, 0xA1, 0xA1, 0xFB]);
                payload.extend(std::iter::repeat(track as u8).take(512));
                image.set_track(track, build_track(&payload, track_bits));
            }
        }
        image
    }

    pub fn with_cell_ticks(mut self, cell_ticks: u32) -> Self {
        self.cell_ticks = cell_ticks.max(1);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Fail the next `n` opens.
    pub fn with_open_failures(mut self, n: u32) -> Self {
        self.open_failures = n;
        self
    }

    /// Report the next `n` seeks as not ready.
    pub fn with_seek_delays(mut self, n: u32) -> Self {
        self.seek_delays = n;
        self
    }

    /// Fail the next `n` syncs.
    pub fn with_sync_failures(mut self, n: u32) -> Self {
        self.sync_failures = n;
        self
    }

    /// Limit flux production to `samples` until more is staged with [SimImage::stage_flux].
    pub fn with_flux_budget(mut self, samples: usize) -> Self {
        self.flux_budget = Some(samples);
        self
    }

    /// Report the next `n` seeks as not ready, from now on.
    pub fn delay_seeks(&mut self, n: u32) {
        self.seek_delays = n;
    }

    /// Make `samples` more flux available at the next `read_track`.
    pub fn stage_flux(&mut self, samples: usize) {
        self.staged_flux += samples;
    }

    pub fn set_track(&mut self, track: u16, bits: BitVec) {
        let idx = track as usize;
        if self.tracks.len() <= idx {
            self.tracks.resize(idx + 1, BitVec::new());
        }
        self.tracks[idx] = bits;
    }

    pub fn track(&self, track: u16) -> &BitVec {
        match self.tracks.get(track as usize) {
            Some(bits) if !bits.is_empty() => bits,
            _ => &self.blank,
        }
    }

    /// Revolution period of `track` in sysclk ticks.
    pub fn track_ticks(&self, track: u16) -> u64 {
        self.track(track).len() as u64 * self.cell_ticks as u64
    }

    pub fn cell_ticks(&self) -> u32 {
        self.cell_ticks
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub fn write_start(&self) -> Option<u32> {
        self.write_start
    }

    /// Raw MFM words received from the drive, in order.
    pub fn written(&self) -> &[u32] {
        &self.written
    }

    pub fn flushes(&self) -> u32 {
        self.flushes
    }

    pub fn syncs(&self) -> u32 {
        self.syncs
    }

    pub fn seeks(&self) -> u32 {
        self.seeks
    }
}

impl FloppyImage for SimImage {
    fn open(&mut self, slot: &ImageSlot) -> Result<(), ImageError> {
        if slot.name.is_empty() {
            return Err(ImageError::InvalidSlot);
        }
        if self.open_failures > 0 {
            self.open_failures -= 1;
            return Err(ImageError::Io(format!("simulated open failure on '{}'", slot.name)));
        }
        self.opened = true;
        Ok(())
    }

    fn seek_track(&mut self, track: u16, start_pos: Option<&mut u32>) -> Result<(), ImageError> {
        if !self.opened {
            return Err(ImageError::NotReady);
        }
        if self.seek_delays > 0 {
            self.seek_delays -= 1;
            return Err(ImageError::NotReady);
        }
        self.seeks += 1;
        self.cur_track = track;

        if let Some(pos) = start_pos {
            let len = self.track(track).len();
            let bit = (*pos / self.cell_ticks) as usize % len.max(1);
            *pos = bit as u32 * self.cell_ticks;
            self.bit_pos = bit;
            self.ticks_since_index = *pos;
        }
        Ok(())
    }

    fn read_track(&mut self, _bufs: &mut ImageBuffers) -> bool {
        match self.flux_budget.as_mut() {
            Some(budget) if self.staged_flux > 0 => {
                *budget += std::mem::take(&mut self.staged_flux);
                true
            }
            _ => false,
        }
    }

    fn rdata_flux(&mut self, _bufs: &mut ImageBuffers, out: &mut [u16]) -> usize {
        let mut n = out.len();
        if let Some(budget) = self.flux_budget {
            n = n.min(budget);
        }

        let cell_ticks = self.cell_ticks;
        let max_cells = (u16::MAX as u32 + 1) / cell_ticks;
        let track = match self.tracks.get(self.cur_track as usize) {
            Some(bits) if !bits.is_empty() => bits,
            _ => &self.blank,
        };
        if n == 0 || !track.any() {
            return 0;
        }

        let len = track.len();
        for sample in out[..n].iter_mut() {
            let mut cells = 0u32;
            loop {
                let bit = track[self.bit_pos];
                self.bit_pos = (self.bit_pos + 1) % len;
                cells += 1;
                if bit || cells == max_cells {
                    break;
                }
            }
            *sample = (cells * cell_ticks - 1) as u16;
        }
        self.ticks_since_index = self.bit_pos as u32 * cell_ticks;

        if let Some(budget) = self.flux_budget.as_mut() {
            *budget -= n;
        }
        n
    }

    fn write_track(&mut self, bufs: &mut ImageBuffers, flush: bool) {
        let prod = bufs.write_mfm.prod;
        let mut cons = bufs.write_mfm.cons;
        while prod >= cons + 32 {
            self.written.push(bufs.write_mfm_word((cons / 32) as usize));
            cons += 32;
        }
        if flush {
            if prod > cons {
                self.written.push(bufs.write_mfm_word((cons / 32) as usize));
                cons = prod;
            }
            self.flushes += 1;
        }
        bufs.write_mfm.cons = cons;
    }

    fn ticks_since_index(&self) -> u32 {
        self.ticks_since_index
    }

    fn sync(&mut self) -> Result<(), ImageError> {
        if self.sync_failures > 0 {
            self.sync_failures -= 1;
            return Err(ImageError::Io("simulated sync failure".to_string()));
        }
        self.syncs += 1;
        Ok(())
    }

    fn cur_track(&self) -> u16 {
        self.cur_track
    }

    fn set_write_start(&mut self, ticks: u32) {
        self.write_start = Some(ticks);
    }

    fn syncword(&self) -> u32 {
        MFM_SYNC_WORD
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn bufs() -> ImageBuffers {
        ImageBuffers::carve(Arena::new(4096), 1024).unwrap()
    }

    #[test]
    fn test_build_track() {
        let track = build_track(&[0xFE, 0x01], 2000);
        assert_eq!(track.len(), 2000);
        // The sync marks follow 80 gap and 12 zero bytes.
        let bytes = track.to_bytes();
        assert_eq!(&bytes[184..190], &[0x44, 0x89, 0x44, 0x89, 0x44, 0x89]);
    }

    #[test]
    fn test_flux_from_bitstream() {
        let mut image = SimImage::new(64);
        let mut bits = BitVec::from_elem(64, false);
        bits.set(1, true);
        bits.set(3, true);
        bits.set(7, true);
        image.set_track(0, bits);
        image.open(&ImageSlot::new("test", 0)).unwrap();

        let mut pos = 0;
        image.seek_track(0, Some(&mut pos)).unwrap();
        let mut out = [0u16; 4];
        let mut bufs = bufs();
        assert_eq!(image.rdata_flux(&mut bufs, &mut out), 4);
        // Cells 0-1, 2-3, 4-7 and then the wrap through cell 1.
        assert_eq!(out, [287, 287, 575, 58 * 144 - 1]);
        assert_eq!(image.ticks_since_index(), 2 * 144);
    }

    #[test]
    fn test_seek_rounds_to_cell() {
        let mut image = SimImage::formatted(2, 1000);
        image.open(&ImageSlot::new("test", 0)).unwrap();
        let mut pos = 1000;
        image.seek_track(3, Some(&mut pos)).unwrap();
        assert_eq!(pos, 864);
        assert_eq!(image.cur_track(), 3);
        assert_eq!(image.ticks_since_index(), 864);
    }

    #[test]
    fn test_flux_budget() {
        let mut image = SimImage::formatted(1, 1000).with_flux_budget(3);
        image.open(&ImageSlot::new("test", 0)).unwrap();
        image.seek_track(0, Some(&mut 0)).unwrap();
        let mut bufs = bufs();
        let mut out = [0u16; 8];
        assert_eq!(image.rdata_flux(&mut bufs, &mut out), 3);
        assert_eq!(image.rdata_flux(&mut bufs, &mut out), 0);
        assert!(!image.read_track(&mut bufs));
        image.stage_flux(5);
        assert!(image.read_track(&mut bufs));
        assert_eq!(image.rdata_flux(&mut bufs, &mut out), 5);
    }

    #[test]
    fn test_open_and_seek_failures() {
        let mut image = SimImage::new(1000).with_open_failures(1).with_seek_delays(1);
        assert_eq!(image.open(&ImageSlot::new("", 0)), Err(ImageError::InvalidSlot));
        assert!(matches!(image.open(&ImageSlot::new("a", 0)), Err(ImageError::Io(_))));
        assert!(image.open(&ImageSlot::new("a", 0)).is_ok());
        assert_eq!(image.seek_track(0, None), Err(ImageError::NotReady));
        assert!(image.seek_track(0, None).is_ok());
    }
}

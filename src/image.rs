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

    image.rs

    The disk image collaborator interface
*/

use crate::{arena::ImageBuffers, types::ImageSlot, ImageError};

/// A [FloppyImage] turns a stored disk image into flux timings for the read channel, and
/// decoded write MFM back into stored data. Image codecs and storage access live behind this
/// trait; the drive core only positions the image and moves data through it.
///
/// All methods are synchronous and may be slow (they may block on storage), except
/// [FloppyImage::rdata_flux] and [FloppyImage::ticks_since_index], which are called from the
/// RDATA interrupt and must only touch already-buffered data.
pub trait FloppyImage {
    /// Bind the image to `slot`. Fails if the slot is invalid or the image cannot be parsed.
    fn open(&mut self, slot: &ImageSlot) -> Result<(), ImageError>;

    /// Move the image cursor to `track` (`cyl * 2 + head`). If `start_pos` is given it is a
    /// rotational offset in sysclk ticks since the index; the image may round it to the nearest
    /// position it can start from, and the caller must use the adjusted value.
    ///
    /// Returns [ImageError::NotReady] if the seek cannot complete yet.
    fn seek_track(&mut self, track: u16, start_pos: Option<&mut u32>) -> Result<(), ImageError>;

    /// Opportunistically buffer more track data for flux generation. Returns true if any
    /// progress was made.
    fn read_track(&mut self, bufs: &mut ImageBuffers) -> bool;

    /// Produce up to `out.len()` flux samples (timer reload values, one less than the interval
    /// in sysclk ticks). Returns the number produced, which may be fewer if buffered data ran
    /// out.
    fn rdata_flux(&mut self, bufs: &mut ImageBuffers, out: &mut [u16]) -> usize;

    /// Consume newly decoded write MFM from `bufs.write_mfm`. `flush` is set once the write flux
    /// ring has fully drained, and all remaining data should be written out.
    fn write_track(&mut self, bufs: &mut ImageBuffers, flush: bool);

    /// Position of the last produced flux sample relative to the track's index, in sysclk ticks.
    fn ticks_since_index(&self) -> u32;

    /// Force buffered writes to stable storage.
    fn sync(&mut self) -> Result<(), ImageError>;

    /// The track the image is positioned on.
    fn cur_track(&self) -> u16;

    /// Record the rotational position, in sysclk ticks since the index, at which a write began.
    fn set_write_start(&mut self, ticks: u32);

    /// The 32-bit raw MFM pattern used to recover word framing in written data.
    fn syncword(&self) -> u32;

    /// Whether the image accepts writes.
    fn is_writable(&self) -> bool;
}

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

    arena.rs

    A per-mount bump arena and the image buffers carved from it
*/

//! Bulk buffers are allocated once per image mount from an [Arena] and are never reallocated for
//! the life of the mount. Allocations return [Region] handles which stay valid until the arena
//! is reset by the next mount, which frees everything at once.

use crate::DriveError;

/// Allocation granularity. Regions are word aligned so MFM words can be stored in place.
const ARENA_ALIGN: usize = 4;

/// A handle to a byte range within an [Arena].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    offset: usize,
    len: usize,
}

impl Region {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the sub-region starting `offset` bytes in, `len` bytes long, clamped to this region.
    pub fn sub(&self, offset: usize, len: usize) -> Region {
        let offset = offset.min(self.len);
        Region {
            offset: self.offset + offset,
            len: len.min(self.len - offset),
        }
    }
}

/// A simple bump allocator over a fixed block of memory.
pub struct Arena {
    mem: Vec<u8>,
    next: usize,
}

impl Arena {
    pub fn new(size: usize) -> Self {
        Arena {
            mem: vec![0; size],
            next: 0,
        }
    }

    /// Free every allocation at once. Previously returned regions must not be used afterwards.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    pub fn capacity(&self) -> usize {
        self.mem.len()
    }

    pub fn avail(&self) -> usize {
        self.mem.len() - self.next
    }

    pub fn alloc(&mut self, len: usize) -> Result<Region, DriveError> {
        if len > self.avail() {
            return Err(DriveError::ArenaExhausted {
                requested: len,
                available: self.avail(),
            });
        }
        let region = Region {
            offset: self.next,
            len,
        };
        self.mem[region.offset..region.offset + len].fill(0);
        self.next = (self.next + len.div_ceil(ARENA_ALIGN) * ARENA_ALIGN).min(self.mem.len());
        Ok(region)
    }

    #[inline]
    pub fn bytes(&self, region: Region) -> &[u8] {
        &self.mem[region.offset..region.offset + region.len]
    }

    #[inline]
    pub fn bytes_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.mem[region.offset..region.offset + region.len]
    }
}

/// A buffer region plus producer and consumer cursors. The meaning of the cursors is up to the
/// user of the buffer: the write MFM buffer counts bits, the data buffers count bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferCursor {
    pub region: Region,
    pub prod: u32,
    pub cons: u32,
}

impl BufferCursor {
    fn new(region: Region) -> Self {
        BufferCursor {
            region,
            prod: 0,
            cons: 0,
        }
    }

    pub fn reset(&mut self) {
        self.prod = 0;
        self.cons = 0;
    }
}

/// The buffers lent to the mounted image.
///
/// * `write_mfm` holds decoded write data as big-endian 32-bit MFM words; `prod`/`cons` are
///   bit positions.
/// * `write_data` is the rest of the arena, used to stage data headed for storage.
/// * `read_mfm` overlaps the second half of `write_mfm`. Reads need far less latency slack
///   than writes, and the first half alone holds tens of milliseconds of write flux, so write
///   decode may start while read processing is still in flight.
/// * `read_data` shares the space of `write_data`. The change of use is serialised by the write
///   channel's Stopping state.
pub struct ImageBuffers {
    arena: Arena,
    pub write_mfm: BufferCursor,
    pub write_data: BufferCursor,
    pub read_mfm: BufferCursor,
    pub read_data: BufferCursor,
}

impl ImageBuffers {
    /// Carve the image buffers out of a freshly reset `arena`.
    pub fn carve(mut arena: Arena, write_mfm_len: usize) -> Result<Self, DriveError> {
        arena.reset();
        let write_mfm = arena.alloc(write_mfm_len)?;
        let write_data = arena.alloc(arena.avail())?;
        let read_mfm = write_mfm.sub(write_mfm_len / 2, write_mfm_len / 2);

        Ok(ImageBuffers {
            arena,
            write_mfm: BufferCursor::new(write_mfm),
            write_data: BufferCursor::new(write_data),
            read_mfm: BufferCursor::new(read_mfm),
            read_data: BufferCursor::new(write_data),
        })
    }

    #[inline]
    pub fn bytes(&self, region: Region) -> &[u8] {
        self.arena.bytes(region)
    }

    #[inline]
    pub fn bytes_mut(&mut self, region: Region) -> &mut [u8] {
        self.arena.bytes_mut(region)
    }

    /// The decoded write buffer.
    pub fn write_mfm_bytes(&self) -> &[u8] {
        self.arena.bytes(self.write_mfm.region)
    }

    pub fn write_mfm_bytes_mut(&mut self) -> &mut [u8] {
        self.arena.bytes_mut(self.write_mfm.region)
    }

    /// Number of 32-bit words the write MFM buffer holds.
    pub fn write_mfm_words(&self) -> usize {
        self.write_mfm.region.len() / 4
    }

    /// Read the big-endian word at `word_idx` (modulo the buffer size) of the write MFM buffer.
    pub fn write_mfm_word(&self, word_idx: usize) -> u32 {
        let idx = (word_idx % self.write_mfm_words()) * 4;
        let bytes = self.write_mfm_bytes();
        u32::from_be_bytes([bytes[idx], bytes[idx + 1], bytes[idx + 2], bytes[idx + 3]])
    }

    /// Rewind the write-side cursors after a write has been flushed.
    pub fn reset_write(&mut self) {
        self.write_mfm.reset();
        self.write_data.reset();
    }

    /// Return the arena so that it can be reused by the next mount.
    pub fn into_arena(self) -> Arena {
        self.arena
    }
}

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

    src/codec/mfm.rs

    MFM encoding of track data and decoding of captured write flux into raw MFM words.
*/

use bit_vec::BitVec;

/// Two consecutive 0xA1 address mark sync bytes, with their missing clock bits, as seen in raw
/// MFM. The flux decoder realigns its output to a word boundary whenever it sees this pattern.
pub const MFM_SYNC_WORD: u32 = 0x4489_4489;

/// MFM-encode `data`, most significant bit first. `prev_bit` is the last data bit written
/// before `data`, which determines the first clock bit.
pub fn encode_mfm(data: &[u8], prev_bit: bool) -> BitVec {
    let mut bits = BitVec::with_capacity(data.len() * 16);
    let mut previous_bit = prev_bit;

    for &byte in data {
        for i in 0..8 {
            let bit = (byte & (0x80 >> i)) != 0;
            if bit {
                // 1 is encoded as 01
                bits.push(false);
                bits.push(true);
            }
            else {
                // 0 is encoded as 10 if previous bit was 0, otherwise 00
                bits.push(!previous_bit);
                bits.push(false);
            }
            previous_bit = bit;
        }
    }
    bits
}

/// Extract the data bits from raw big-endian MFM bytes, discarding clock bits. A trailing odd
/// byte is ignored.
pub fn decode_mfm(raw: &[u8]) -> Vec<u8> {
    raw.chunks_exact(2)
        .map(|pair| {
            let word = u16::from_be_bytes([pair[0], pair[1]]);
            (0..8).fold(0u8, |acc, i| (acc << 1) | ((word >> (14 - i * 2)) & 1) as u8)
        })
        .collect()
}

/// Converts a stream of free-running capture counter values into raw MFM bits.
///
/// Each flux interval is compared against the nominal half bit-cell width `cell`. Intervals up
/// to three cells produce a single `1`; longer intervals shed two cells at a time, shifting in a
/// `0` for each, before the closing `1`. Decoded bits are packed into big-endian 32-bit words in
/// the output buffer, which is treated as a ring of whole words.
#[derive(Copy, Clone, Debug)]
pub struct FluxDecoder {
    cell_ticks: u32,
    syncword: u32,
}

impl FluxDecoder {
    pub fn new(cell_ticks: u32, syncword: u32) -> Self {
        FluxDecoder { cell_ticks, syncword }
    }

    pub fn cell_ticks(&self) -> u32 {
        self.cell_ticks
    }

    /// Decode `samples` into `out`.
    ///
    /// `prev` is the counter value of the last sample of the previous call, and `bit_prod` is
    /// the output bit position; both are updated on return. A partial word at `bit_prod` is
    /// resumed, and the new partial word is stored left-aligned so that a consumer always sees
    /// every produced bit.
    pub fn decode<S>(&self, samples: S, prev: &mut u16, bit_prod: &mut u32, out: &mut [u8])
    where
        S: IntoIterator<Item = u16>,
    {
        let nwords = out.len() / 4;
        if nwords == 0 {
            log::warn!("FluxDecoder::decode(): output buffer is smaller than one word");
            return;
        }

        let threshold = 3 * self.cell_ticks;
        let step = 2 * self.cell_ticks;
        let mut prod = *bit_prod;
        let mut last = *prev;
        let mut mfm: u32 = 0;

        if prod & 31 != 0 {
            mfm = read_word(out, (prod / 32) as usize % nwords) >> (32 - (prod & 31));
        }

        for next in samples {
            let mut curr = next.wrapping_sub(last) as u32;
            last = next;

            while curr > threshold {
                curr -= step;
                mfm <<= 1;
                prod = prod.wrapping_add(1);
                if prod & 31 == 0 {
                    store_word(out, completed_word(prod, nwords), mfm);
                }
            }

            mfm = (mfm << 1) | 1;
            prod = prod.wrapping_add(1);
            if mfm == self.syncword {
                prod &= !31;
            }
            if prod & 31 == 0 {
                store_word(out, completed_word(prod, nwords), mfm);
            }
        }

        if prod & 31 != 0 {
            store_word(out, (prod / 32) as usize % nwords, mfm << (32 - (prod & 31)));
        }

        *bit_prod = prod;
        *prev = last;
    }
}

/// Index of the word just completed when the bit position lands on a word boundary.
#[inline]
fn completed_word(prod: u32, nwords: usize) -> usize {
    match prod {
        0 => nwords - 1,
        _ => ((prod - 1) / 32) as usize % nwords,
    }
}

#[inline]
fn read_word(buf: &[u8], word: usize) -> u32 {
    let i = word * 4;
    u32::from_be_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
}

#[inline]
fn store_word(buf: &mut [u8], word: usize, value: u32) {
    let i = word * 4;
    buf[i..i + 4].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: u32 = 72;

    /// Turn an MFM bitstream into cumulative capture counter values, one per `1` bit. Each MFM
    /// bit lasts two decoder cells.
    fn to_flux(bits: &BitVec, start: u16) -> Vec<u16> {
        let mut counter = start;
        let mut run = 0u32;
        let mut samples = Vec::new();
        for bit in bits.iter() {
            run += 1;
            if bit {
                counter = counter.wrapping_add((run * 2 * CELL) as u16);
                samples.push(counter);
                run = 0;
            }
        }
        samples
    }

    #[test]
    fn test_encode_mfm() {
        // 0x00 after a 0 is all clock bits; 0xFF is all data bits.
        assert_eq!(encode_mfm(&[0x00], false).to_bytes(), vec![0xAA, 0xAA]);
        assert_eq!(encode_mfm(&[0xFF], false).to_bytes(), vec![0x55, 0x55]);
        // 0x4E after a 1.
        assert_eq!(encode_mfm(&[0x4E], true).to_bytes(), vec![0x12, 0x54]);
        assert_eq!(decode_mfm(&[0x12, 0x54, 0xAA, 0xAA]), vec![0x4E, 0x00]);
    }

    #[test]
    fn test_decode_intervals() {
        let decoder = FluxDecoder::new(CELL, MFM_SYNC_WORD);
        let mut out = [0u8; 8];
        let mut prev = 0u16;
        let mut prod = 0u32;

        // One, two and three bit intervals.
        decoder.decode([144u16, 432, 864], &mut prev, &mut prod, &mut out);
        assert_eq!(prod, 6);
        assert_eq!(prev, 864);
        // 1, 01, 001 -> 101001, left-aligned
        assert_eq!(out[0], 0b1010_0100);
    }

    #[test]
    fn test_decode_resumes_partial_word() {
        let decoder = FluxDecoder::new(CELL, MFM_SYNC_WORD);
        let bits = encode_mfm(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC], true);
        let flux = to_flux(&bits, 0xFF00);

        let mut out = [0u8; 16];
        let mut prev = 0xFF00u16;
        let mut prod = 0u32;
        let (a, b) = flux.split_at(7);
        decoder.decode(a.iter().copied(), &mut prev, &mut prod, &mut out);
        decoder.decode(b.iter().copied(), &mut prev, &mut prod, &mut out);

        // The flux ends on the last 1 bit, so trailing zeros are not yet known.
        let last_one = bits.iter().rposition(|b| b).unwrap() + 1;
        assert_eq!(prod as usize, last_one);
        let expected = bits.to_bytes();
        assert_eq!(&out[..last_one / 8], &expected[..last_one / 8]);
    }

    #[test]
    fn test_decode_realigns_on_sync() {
        let decoder = FluxDecoder::new(CELL, MFM_SYNC_WORD);
        let mut bits = BitVec::new();
        // Five stray cells to misalign the stream.
        for b in [true, false, true, false, true] {
            bits.push(b);
        }
        for b in BitVec::from_bytes(&MFM_SYNC_WORD.to_be_bytes()).iter() {
            bits.push(b);
        }
        bits.extend(encode_mfm(&[0xFE, 0x01], true).iter());

        let flux = to_flux(&bits, 0);
        let mut out = [0u8; 16];
        let mut prev = 0u16;
        let mut prod = 0u32;
        decoder.decode(flux, &mut prev, &mut prod, &mut out);

        // The sync word lands in word 0 and data follows in word 1.
        assert_eq!(read_word(&out, 0), MFM_SYNC_WORD);
        assert_eq!(decode_mfm(&out[4..8]), vec![0xFE, 0x01]);
    }

    #[test]
    fn test_decode_wraps_output() {
        let decoder = FluxDecoder::new(CELL, 0);
        let mut out = [0u8; 8];
        let mut prev = 0u16;
        let mut prod = 0u32;
        // 96 single bit intervals.
        let flux: Vec<u16> = (1..=96u16).map(|i| i * 144).collect();
        decoder.decode(flux, &mut prev, &mut prod, &mut out);
        assert_eq!(prod, 96);
        assert_eq!(out, [0xFF; 8]);
    }
}

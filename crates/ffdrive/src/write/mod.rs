/*
    ffdrive
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
*/
pub(crate) mod args;

use anyhow::{bail, Error};
use bit_vec::BitVec;
use fluxfox_drive::{
    codec::{decode_mfm, encode_mfm, MFM_SYNC_WORD},
    prelude::*,
    sim::*,
};

use crate::{args::GlobalOptions, mount, run_until, seek_to};

/// Raw MFM for a write burst: gap, sync run, three A1 address marks, then `payload`.
fn write_stream(payload: &[u8]) -> BitVec {
    let mut bits = encode_mfm(&[0x4E; 16], false);
    bits.extend(encode_mfm(&[0x00; 12], false).iter());
    for _ in 0..3 {
        bits.extend(BitVec::from_bytes(&[0x44, 0x89]).iter());
    }
    bits.extend(encode_mfm(payload, true).iter());
    bits.extend(encode_mfm(&[0x4E; 4], payload.last().is_some_and(|b| b & 1 != 0)).iter());
    bits
}

pub(crate) fn run(global: &GlobalOptions, params: &args::WriteParams) -> Result<(), Error> {
    let mut floppy = mount(global, SimImage::formatted(80, DD_TRACK_BITS))?;
    seek_to(&mut floppy, params.cylinder)?;
    floppy.set_head(params.head);
    if run_until(&mut floppy, 1000, |f| f.rd_state() == RingState::Active).is_none() {
        bail!("read channel did not go live");
    }

    let payload: Vec<u8> = (0..params.size)
        .map(|i| params.fill.wrapping_add(i as u8).rotate_left(i as u32 % 8))
        .collect();

    floppy.write_gate(true);
    let Some(start_us) = run_until(&mut floppy, 50, |f| f.wr_state() == RingState::Active)
    else {
        bail!("write channel did not start");
    };
    write_bits(&mut floppy, &write_stream(&payload), DD_CELL_TICKS);
    floppy.write_gate(false);
    let Some(drain_us) = run_until(&mut floppy, 100, |f| f.wr_state() == RingState::Inactive)
    else {
        bail!("write channel did not drain");
    };

    let Some(image) = floppy.image()
    else {
        bail!("image was ejected");
    };
    let written = image.written();
    let Some(sync) = written.iter().position(|&w| w == MFM_SYNC_WORD)
    else {
        bail!("no sync word in {} captured words", written.len());
    };
    let raw: Vec<u8> = written[sync + 1..].iter().flat_map(|w| w.to_be_bytes()).collect();
    if raw.len() < payload.len() * 2 {
        bail!("short write: {} of {} MFM bytes", raw.len(), payload.len() * 2);
    }
    let decoded = decode_mfm(&raw[..payload.len() * 2]);
    let mismatch = decoded.iter().zip(&payload).position(|(a, b)| a != b);

    if !global.silent {
        println!("Track {} write", floppy.drive().track());
        println!("{}", "-".repeat(79));
        println!("Start latency:  {}us", start_us);
        println!("Drain time:     {}us", drain_us);
        println!("Write position: {:?}", image.write_start());
        println!("Words captured: {}", written.len());
        println!("Flushes:        {}", image.flushes());
        println!("Missed writes:  {}", floppy.stats().missed_writes);
    }

    if let Some(offset) = mismatch {
        bail!(
            "verify failed at byte {}: wrote {:02X}, read back {:02X}",
            offset,
            payload[offset],
            decoded[offset]
        );
    }
    if !global.silent {
        println!("Verified {} bytes", payload.len());
    }
    Ok(())
}

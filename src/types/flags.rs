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

    flags.rs

    Defines common bitflags
*/

use bitflags::bitflags;

bitflags! {
    /// Output lines presented by the drive to the host controller.
    ///
    /// Values are level-true: a set flag means the line is asserted, regardless of the
    /// physical pin polarity chosen by the board.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[rustfmt::skip]
    pub struct OutputLines: u8 {
        #[doc = "Once-per-revolution index pulse"]
        const INDEX     = 0b0000_0001;
        #[doc = "Drive ready (a disk is inserted)"]
        const READY     = 0b0000_0010;
        #[doc = "Head is positioned over cylinder 0"]
        const TRK0      = 0b0000_0100;
        #[doc = "Disk changed since the last step with a disk present"]
        const DSKCHG    = 0b0000_1000;
        #[doc = "Disk is write protected"]
        const WRPROT    = 0b0001_0000;
    }
}

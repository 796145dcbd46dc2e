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
*/

//! # fluxfox_drive
//!
//! fluxfox_drive emulates the drive side of a floppy disk interface at the flux level. A host
//! floppy controller connected to the emulated drive sees a flux-transition pulse train on
//! RDATA, an index pulse once per revolution, and track-zero / ready / disk-change /
//! write-protect lines, exactly as it would from a mechanical drive. Flux written by the
//! controller on WDATA is captured, decoded to MFM and handed to the mounted image.
//!
//! The crate is built around a [Floppy] core that is driven by four entry points, mirroring the
//! interrupt tiers of a small microcontroller:
//!
//! * [Floppy::step_edge] - the high priority step-pulse edge.
//! * [Floppy::rdata_irq] / [Floppy::wdata_irq] - flux streaming completion interrupts.
//! * [Floppy::step_irq] and [Floppy::run_timers] - the low priority step and index timers.
//! * [Floppy::handle] - the cooperative polling loop, which talks to the image.
//!
//! Peripherals are abstracted by the traits in [hardware], and the disk image by
//! [FloppyImage]. The `sim` feature provides a host-side board and image for testing.

pub mod arena;
pub mod codec;
pub mod config;
pub mod drive;
pub mod hardware;
pub mod image;
pub mod ring;
#[cfg(feature = "sim")]
pub mod sim;
pub mod timer;
pub mod types;

use thiserror::Error;

/// Errors reported by a [FloppyImage] collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("The image is not ready yet; retry the operation later")]
    NotReady,
    #[error("The image slot is invalid or empty")]
    InvalidSlot,
    #[error("The image could not be parsed: {0}")]
    Format(String),
    #[error("An IO error occurred accessing the image: {0}")]
    Io(String),
    #[error("The image does not support writes")]
    WriteProtected,
}

/// Errors reported by the drive core.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DriveError {
    #[error("No disk image is inserted")]
    NoDisk,
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Invalid drive configuration: {0}")]
    Config(String),
    #[error("Arena exhausted: requested {requested} bytes, {available} available")]
    ArenaExhausted { requested: usize, available: usize },
}

impl DriveError {
    /// Returns true if the error is transient and the same operation should simply be retried
    /// on a later polling pass.
    pub fn is_retry(&self) -> bool {
        matches!(self, DriveError::Image(ImageError::NotReady))
    }
}

pub use crate::{
    config::DriveConfig,
    drive::{Floppy, StepState},
    image::FloppyImage,
    ring::{FluxRing, RingState, FLUX_RING_LEN},
    types::{DriveStats, ImageSlot, OutputLines, StkTime, TimeBase},
};

pub mod prelude {
    pub use crate::{
        config::DriveConfig,
        drive::{Floppy, StepState},
        hardware::{Clock, DriveSignals, FloppyHardware, FloppyIrq, FluxCapture, FluxGenerator, InterruptController},
        image::FloppyImage,
        ring::RingState,
        types::{DriveStats, ImageSlot, OutputLines, StkTime, TimeBase},
        DriveError,
        ImageError,
    };
}

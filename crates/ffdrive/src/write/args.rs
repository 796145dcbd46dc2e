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
use crate::args::*;
use bpaf::{construct, long, Parser};

#[derive(Clone, Debug)]
pub(crate) struct WriteParams {
    pub(crate) cylinder: u8,
    pub(crate) head: u8,
    pub(crate) size: usize,
    pub(crate) fill: u8,
}

fn size_parser() -> impl Parser<usize> {
    long("size")
        .short('n')
        .argument::<usize>("BYTES")
        .help("Number of payload bytes to write")
        .guard(|&size| (1..=8192).contains(&size), "Size must be between 1 and 8192")
        .fallback(512)
}

fn fill_parser() -> impl Parser<u8> {
    long("fill")
        .argument::<u8>("BYTE")
        .help("Seed byte for the payload pattern")
        .fallback(0xE5)
}

pub(crate) fn write_parser() -> impl Parser<WriteParams> {
    let cylinder = cylinder_parser();
    let head = head_parser();
    let size = size_parser();
    let fill = fill_parser();

    construct!(WriteParams {
        cylinder,
        head,
        size,
        fill
    })
}

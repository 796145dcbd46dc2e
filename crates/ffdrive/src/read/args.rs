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
pub(crate) struct ReadParams {
    pub(crate) cylinder: u8,
    pub(crate) head: u8,
    pub(crate) revs: u32,
    pub(crate) dump: Option<usize>,
}

fn revs_parser() -> impl Parser<u32> {
    long("revs")
        .short('r')
        .argument::<u32>("REVOLUTIONS")
        .help("Number of revolutions to stream")
        .guard(|&revs| (1..=100).contains(&revs), "Revolutions must be between 1 and 100")
        .fallback(1)
}

fn dump_parser() -> impl Parser<usize> {
    long("dump")
        .argument::<usize>("COUNT")
        .help("Print the first COUNT flux intervals")
}

pub(crate) fn read_parser() -> impl Parser<ReadParams> {
    let cylinder = cylinder_parser();
    let head = head_parser();
    let revs = revs_parser();
    let dump = dump_parser().optional();

    construct!(ReadParams {
        cylinder,
        head,
        revs,
        dump
    })
}

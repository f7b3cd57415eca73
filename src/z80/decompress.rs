/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! Run-length decoding of **Z80** snapshot memory blocks.
//!
//! A run of repeated bytes is encoded as `ED ED count value`. Everything
//! else is literal, except that two or more consecutive `ED` bytes are
//! always encoded as a run.
use std::io::{self, Result};

use memchr::memchr;

use super::common::MEMORY_V1_TERM;

const RLE_MARKER: u8 = 0xED;

/// Truncates a version 1 compressed memory block at its end of data marker,
/// if present.
pub(super) fn split_v1_terminator(data: &[u8]) -> &[u8] {
    match data.windows(MEMORY_V1_TERM.len()).position(|window| window == MEMORY_V1_TERM) {
        Some(pos) => &data[..pos],
        None => data
    }
}

/// Expands a whole compressed block, consuming all of `data`.
///
/// Fails if the output would exceed `limit` bytes, on a zero run length or
/// when the block ends in the middle of a run marker.
pub(super) fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut res = Vec::with_capacity(limit.min(PAGE_ALLOC_MAX));
    let mut data = data;
    while !data.is_empty() {
        match *data {
            [RLE_MARKER, RLE_MARKER, count, value, ..] => {
                if count == 0 {
                    return Err(error_invalid("Z80: a zero length run"))
                }
                if res.len() + count as usize > limit {
                    return Err(error_invalid("Z80: too much memory data"))
                }
                res.resize(res.len() + count as usize, value);
                data = &data[4..];
            }
            [RLE_MARKER, RLE_MARKER, ..] => {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                            "Z80: a truncated run"))
            }
            _ => {
                let len = literal_run_len(data);
                if res.len() + len > limit {
                    return Err(error_invalid("Z80: too much memory data"))
                }
                res.extend_from_slice(&data[..len]);
                data = &data[len..];
            }
        }
    }
    Ok(res)
}

// guards Vec::with_capacity against bogus page lengths
const PAGE_ALLOC_MAX: usize = super::common::PAGE_SIZE;

/// Returns the number of literal bytes before the next run marker.
fn literal_run_len(data: &[u8]) -> usize {
    let mut index = 0;
    loop {
        match memchr(RLE_MARKER, &data[index..]) {
            Some(found) if data.get(index + found + 1) == Some(&RLE_MARKER) => {
                return index + found
            }
            Some(found) => index += found + 1,
            None => return data.len()
        }
    }
}

fn error_invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

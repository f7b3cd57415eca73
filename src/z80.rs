/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! **Z80** snapshot format utilities.
//!
//! For the format itself see the
//! [Z80 format](https://worldofspectrum.org/faq/reference/z80format.htm)
//! reference.
mod common;
mod decompress;
mod loader;

pub use common::{Flags1, Header, HEADER_SIZE, PAGE_SIZE, MEMORY_V1_TERM};
pub(crate) use loader::{parse, PageDest, Z80Snapshot};

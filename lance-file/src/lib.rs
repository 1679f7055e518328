#![cfg(target_endian = "little")]

//! Read and write Lance files, a single-file columnar storage format.
//!
//! A file holds one table: an ordered schema of columns, each stored as a
//! sequence of contiguous encoded chunks. Chunks for a column are
//! non-overlapping and cover every row exactly once, so a row range or an
//! arbitrary set of row indices can be served by decoding only the chunks it
//! touches.
//!
//! # File Format
//!
//! ```text
//! ┌────────────────────────────┐
//! │        4-byte Magic        │
//! ├────────────────────────────┤
//! │                            │
//! │     Chunk data bytes       │
//! │  (per column, per batch)   │
//! │                            │
//! ├────────────────────────────┤
//! │                            │
//! │           Footer           │
//! │ (Schema, row count, chunk  │
//! │       descriptors)         │
//! │                            │
//! ├────────────────────────────┤
//! │      24-byte Trailer       │
//! │ (Magic, version, footer    │
//! │     offset and length)     │
//! └────────────────────────────┘
//! ```
//!
//! Each chunk stores one column's values for one row range: an optional
//! validity bitmap (present whenever the field is nullable) followed by the
//! encoded payload. Fixed-width values are packed raw little-endian;
//! variable-width values are an i32 offsets array plus concatenated bytes.
//!
//! The trailer is the entry point for readers: it is always the final 24
//! bytes of the file, so a reader can locate the footer with a single
//! positional read and no external index.
//!
//! # Reading
//!
//! [`LanceFile::open`] parses the trailer and footer and holds them read-only
//! for the reader's lifetime. [`LanceFile::read_range`] serves a contiguous
//! `[start, end)` row range; [`LanceFile::take`] serves arbitrary, possibly
//! duplicated row indices in the caller's order. A committed file is
//! immutable, so any number of readers may work on it concurrently and every
//! read is idempotent.
//!
//! # Writing
//!
//! [`FileWriter`] accepts a sequence of batches (a single bulk batch or a
//! stream of them), encoding one chunk per column per batch and buffering
//! only the footer in memory. [`FileWriter::commit`] seals the file by
//! appending the footer and trailer; an error mid-write aborts the writer and
//! the partially written file must be discarded.

pub use footer::*;
pub use io::*;
pub use reader::*;
pub use writer::*;

mod codec;
mod footer;
mod io;
mod layout;
mod reader;
mod writer;

/// The magic marker identifying a Lance file, at the head of the file and at
/// the start of the trailer.
pub const MAGIC_BYTES: [u8; 4] = *b"LANC";

/// The current file format version.
pub const VERSION: u32 = 1;

/// The size of the fixed trailer at the end of every file.
pub const TRAILER_SIZE: u64 = 24;

use std::fs::File;
use std::ops::Range;
use std::path::Path;

use bytes::Bytes;
use itertools::Itertools;
use lance_array::{Array, Batch};
use lance_dtype::Schema;
use lance_error::{LanceExpect, LanceResult, lance_bail};

use crate::codec::decode_chunk;
use crate::footer::{ChunkSpec, Footer, Trailer};
use crate::io::ReadAt;
use crate::layout::ColumnChunks;
use crate::{MAGIC_BYTES, TRAILER_SIZE};

/// A committed columnar file, open for reads.
///
/// Opening validates the magic marker, version, trailer, footer, and the
/// per-column chunk layout once; reads afterwards only touch the chunk
/// bodies they need.
pub struct LanceFile<R: ReadAt> {
    read: R,
    footer: Footer,
    columns: Vec<ColumnChunks>,
}

impl LanceFile<File> {
    /// Open the file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> LanceResult<Self> {
        Self::open(File::open(path)?)
    }
}

impl LanceFile<Bytes> {
    /// Open a file already resident in memory.
    pub fn in_memory(bytes: Bytes) -> LanceResult<Self> {
        Self::open(bytes)
    }
}

impl<R: ReadAt> LanceFile<R> {
    /// Open a file from any positional-read source.
    pub fn open(read: R) -> LanceResult<Self> {
        let size = read.size()?;
        let min_size = MAGIC_BYTES.len() as u64 + TRAILER_SIZE;
        if size < min_size {
            lance_bail!(
                NotALanceFile: "{} bytes is too small to hold a magic marker and trailer",
                size
            );
        }
        if read.read_at(0, MAGIC_BYTES.len() as u64)?.as_ref() != MAGIC_BYTES {
            lance_bail!(NotALanceFile: "bad magic marker at offset 0");
        }
        let trailer = Trailer::from_bytes(&read.read_at(size - TRAILER_SIZE, TRAILER_SIZE)?)?;
        let footer_end = trailer
            .footer_offset
            .checked_add(trailer.footer_length)
            .filter(|&end| end == size - TRAILER_SIZE)
            .filter(|_| trailer.footer_offset >= MAGIC_BYTES.len() as u64);
        if footer_end.is_none() {
            lance_bail!(
                CorruptEncoding: "footer range [{}, +{}) does not abut the trailer of a {}-byte file",
                trailer.footer_offset,
                trailer.footer_length,
                size
            );
        }
        let footer =
            Footer::from_bytes(&read.read_at(trailer.footer_offset, trailer.footer_length)?)?;
        let columns = ColumnChunks::try_from_footer(&footer, trailer.footer_offset)?;
        log::debug!(
            "opened file: {} rows, {} fields, {} chunks",
            footer.row_count(),
            footer.schema().field_count(),
            footer.chunks().len()
        );
        Ok(Self {
            read,
            footer,
            columns,
        })
    }

    /// The file's schema.
    pub fn schema(&self) -> &Schema {
        self.footer.schema()
    }

    /// The total number of rows.
    pub fn row_count(&self) -> u64 {
        self.footer.row_count()
    }

    /// The footer describing the file.
    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Materialize rows `range` of every column.
    pub fn read_range(&self, range: Range<u64>) -> LanceResult<Batch> {
        if range.start > range.end || range.end > self.row_count() {
            lance_bail!(
                OutOfRange: "row range [{}, {}) is outside the file's {} rows",
                range.start,
                range.end,
                self.row_count()
            );
        }
        if range.is_empty() {
            return Ok(Batch::empty(self.schema().clone()));
        }
        let columns = (0..self.schema().field_count())
            .map(|idx| self.read_column_range(idx, range.clone()))
            .collect::<LanceResult<Vec<_>>>()?;
        Batch::try_new(self.schema().clone(), columns)
    }

    fn read_column_range(&self, column: usize, range: Range<u64>) -> LanceResult<Array> {
        let parts = self.columns[column]
            .resolve_range(range.clone())
            .iter()
            .map(|chunk| {
                let local = (range.start.max(chunk.row_start) - chunk.row_start) as usize
                    ..(range.end.min(chunk.row_end) - chunk.row_start) as usize;
                self.decode(column, chunk, local)
            })
            .collect::<LanceResult<Vec<_>>>()?;
        match parts.len() {
            1 => Ok(parts
                .into_iter()
                .next()
                .lance_expect("a single resolved chunk")),
            _ => Array::concat(&parts),
        }
    }

    /// Materialize the rows at `indices`, in the caller's order. Duplicate
    /// indices each produce their own row.
    ///
    /// Indices are visited in sorted order so each chunk is read and decoded
    /// at most once, then the rows are permuted back to the caller's order.
    pub fn take(&self, indices: &[u64]) -> LanceResult<Batch> {
        if indices.is_empty() {
            return Ok(Batch::empty(self.schema().clone()));
        }
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= self.row_count()) {
            lance_bail!(
                OutOfRange: "row index {} is outside the file's {} rows",
                bad,
                self.row_count()
            );
        }
        let mut order = (0..indices.len()).collect_vec();
        order.sort_by_key(|&pos| indices[pos]);
        // inverse[pos] is where the caller's pos-th row landed after sorting.
        let mut inverse = vec![0usize; order.len()];
        for (rank, &pos) in order.iter().enumerate() {
            inverse[pos] = rank;
        }
        let columns = (0..self.schema().field_count())
            .map(|idx| {
                let sorted = self.take_column_sorted(idx, indices, &order)?;
                sorted.take(&inverse)
            })
            .collect::<LanceResult<Vec<_>>>()?;
        Batch::try_new(self.schema().clone(), columns)
    }

    /// Gather one column's values for `indices`, visited via the sorted
    /// position `order`, producing rows in sorted-index order.
    fn take_column_sorted(
        &self,
        column: usize,
        indices: &[u64],
        order: &[usize],
    ) -> LanceResult<Array> {
        let mut parts = Vec::new();
        let mut cursor = 0usize;
        while cursor < order.len() {
            let chunk = self.columns[column].chunk_for_row(indices[order[cursor]]);
            let run_end = cursor
                + order[cursor..].partition_point(|&pos| indices[pos] < chunk.row_end);
            let locals = order[cursor..run_end]
                .iter()
                .map(|&pos| (indices[pos] - chunk.row_start) as usize)
                .collect_vec();
            // Decode only the span the run touches, not the whole chunk.
            let lo = locals[0];
            let hi = locals[locals.len() - 1];
            let decoded = self.decode(column, chunk, lo..hi + 1)?;
            let gathered = locals.iter().map(|&l| l - lo).collect_vec();
            parts.push(decoded.take(&gathered)?);
            cursor = run_end;
        }
        match parts.len() {
            1 => Ok(parts
                .into_iter()
                .next()
                .lance_expect("a single decoded run")),
            _ => Array::concat(&parts),
        }
    }

    fn decode(&self, column: usize, chunk: &ChunkSpec, local: Range<usize>) -> LanceResult<Array> {
        let body = self.read.read_at(chunk.byte_offset, chunk.byte_length)?;
        decode_chunk(
            body,
            self.schema().field_dtype(column),
            chunk.encoding,
            chunk.row_count() as usize,
            local,
        )
    }
}

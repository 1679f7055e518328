use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use lance_array::Batch;
use lance_dtype::Schema;
use lance_error::{LanceResult, lance_bail};

use crate::codec::encode_chunk;
use crate::footer::{ChunkSpec, Footer, Trailer};
use crate::MAGIC_BYTES;
use crate::io::CountingWriter;

/// Knobs for [`FileWriter`].
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Split each submitted batch into chunks of at most this many rows.
    /// `None` writes one chunk per batch.
    pub max_rows_per_chunk: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No bytes written yet.
    Created,
    /// The magic marker and at least one batch are on disk.
    Writing,
    /// The footer and trailer are flushed; the file is complete.
    Committed,
    /// A write failed partway, or the caller gave up. The output is garbage.
    Aborted,
}

/// Streams batches into a columnar file.
///
/// The writer appends strictly: `[magic][chunk bodies...][footer][trailer]`.
/// Nothing before the trailer makes the file readable, so an interrupted
/// write leaves no half-valid file behind. Any I/O failure poisons the
/// writer; only a clean [`FileWriter::commit`] produces a readable file.
pub struct FileWriter<W: Write> {
    write: CountingWriter<W>,
    schema: Schema,
    options: WriteOptions,
    state: State,
    row_count: u64,
    chunks: Vec<ChunkSpec>,
}

impl FileWriter<BufWriter<File>> {
    /// Create (or truncate) a file at `path` and write to it.
    pub fn create(path: impl AsRef<Path>, schema: Schema) -> LanceResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?), schema))
    }
}

impl<W: Write> FileWriter<W> {
    /// Wrap a sink. No bytes are written until the first batch arrives.
    pub fn new(write: W, schema: Schema) -> Self {
        Self::new_with_options(write, schema, WriteOptions::default())
    }

    pub fn new_with_options(write: W, schema: Schema, options: WriteOptions) -> Self {
        Self {
            write: CountingWriter::new(write),
            schema,
            options,
            state: State::Created,
            row_count: 0,
            chunks: Vec::new(),
        }
    }

    /// The schema every batch must match.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows accepted so far.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Append a batch as one or more chunks per column.
    ///
    /// A schema mismatch is reported without consuming the batch or
    /// poisoning the writer; an I/O failure aborts it for good.
    pub fn write(&mut self, batch: &Batch) -> LanceResult<()> {
        match self.state {
            State::Created | State::Writing => {}
            State::Committed => lance_bail!(WriterClosed: "writer is already committed"),
            State::Aborted => lance_bail!(WriterClosed: "writer was aborted by an earlier failure"),
        }
        self.schema.ensure_matches(batch.schema())?;
        self.write_batch(batch).inspect_err(|_| {
            self.state = State::Aborted;
        })
    }

    fn write_batch(&mut self, batch: &Batch) -> LanceResult<()> {
        if self.state == State::Created {
            self.write.write_all(&MAGIC_BYTES)?;
            self.state = State::Writing;
        }
        let rows = batch.row_count();
        let step = self
            .options
            .max_rows_per_chunk
            .filter(|&m| m > 0)
            .unwrap_or(rows.max(1));
        let mut start = 0usize;
        loop {
            let end = rows.min(start + step);
            self.write_slab(&batch.slice(start..end))?;
            start = end;
            if start >= rows {
                break;
            }
        }
        Ok(())
    }

    /// Write one chunk per column for a batch that fits in a single chunk.
    fn write_slab(&mut self, slab: &Batch) -> LanceResult<()> {
        let row_start = self.row_count;
        let row_end = row_start + slab.row_count() as u64;
        for (idx, column) in slab.columns().iter().enumerate() {
            let nullability = self.schema.field_dtype(idx).nullability();
            let (body, encoding) = encode_chunk(column, nullability);
            let byte_offset = self.write.position();
            self.write.write_all(&body)?;
            self.chunks.push(ChunkSpec {
                column_index: idx as u32,
                row_start,
                row_end,
                byte_offset,
                byte_length: body.len() as u64,
                encoding,
            });
        }
        self.row_count = row_end;
        Ok(())
    }

    /// Write the footer and trailer, flush, and seal the writer.
    ///
    /// Returns the footer that now describes the file.
    pub fn commit(&mut self) -> LanceResult<Footer> {
        match self.state {
            State::Writing => {}
            State::Created => {
                lance_bail!("cannot commit a file with no batches written")
            }
            State::Committed => lance_bail!(AlreadyCommitted: "writer is already committed"),
            State::Aborted => lance_bail!(WriterClosed: "writer was aborted by an earlier failure"),
        }
        let footer = Footer::new(
            self.schema.clone(),
            self.row_count,
            Arc::from(std::mem::take(&mut self.chunks)),
        );
        self.commit_footer(&footer).inspect_err(|_| {
            self.state = State::Aborted;
        })?;
        self.state = State::Committed;
        log::debug!(
            "committed {} rows across {} chunks, {} bytes total",
            footer.row_count(),
            footer.chunks().len(),
            self.write.position()
        );
        Ok(footer)
    }

    fn commit_footer(&mut self, footer: &Footer) -> LanceResult<()> {
        let footer_offset = self.write.position();
        let bytes = footer.to_bytes();
        self.write.write_all(&bytes)?;
        let trailer = Trailer {
            footer_offset,
            footer_length: bytes.len() as u64,
        };
        self.write.write_all(&trailer.to_bytes())?;
        self.write.flush()
    }

    /// Give up on the file. The sink's contents are not a readable file.
    pub fn abort(&mut self) {
        self.state = State::Aborted;
    }

    /// Unwrap the underlying sink.
    pub fn into_inner(self) -> W {
        self.write.into_inner()
    }
}

use std::ops::Range;

use lance_error::{LanceResult, lance_bail};

use crate::footer::{ChunkSpec, Footer};

/// One column's chunks, ordered by row range, with fast range-to-chunk
/// resolution.
///
/// Invariants checked at construction: chunks tile `0..row_count` exactly
/// (start at zero, contiguous, end at `row_count`) and every chunk's byte
/// range lies inside the file's data region.
#[derive(Debug)]
pub(crate) struct ColumnChunks {
    chunks: Vec<ChunkSpec>,
}

impl ColumnChunks {
    /// Split a footer's chunk list per column and validate each column's
    /// coverage. `data_end` is the first byte past the data region, i.e. the
    /// footer's offset.
    pub fn try_from_footer(footer: &Footer, data_end: u64) -> LanceResult<Vec<Self>> {
        let column_count = footer.schema().field_count();
        let mut per_column: Vec<Vec<ChunkSpec>> = vec![Vec::new(); column_count];
        for chunk in footer.chunks().iter() {
            let Some(column) = per_column.get_mut(chunk.column_index as usize) else {
                lance_bail!(
                    CorruptEncoding: "chunk references column {} but the schema has {}",
                    chunk.column_index,
                    column_count
                );
            };
            column.push(chunk.clone());
        }
        per_column
            .into_iter()
            .enumerate()
            .map(|(idx, chunks)| Self::try_new(idx, chunks, footer.row_count(), data_end))
            .collect()
    }

    fn try_new(
        column_index: usize,
        chunks: Vec<ChunkSpec>,
        row_count: u64,
        data_end: u64,
    ) -> LanceResult<Self> {
        let mut covered = 0u64;
        for chunk in &chunks {
            if chunk.row_start != covered {
                lance_bail!(
                    CorruptEncoding: "column {} chunks skip from row {} to {}",
                    column_index,
                    covered,
                    chunk.row_start
                );
            }
            covered = chunk.row_end;
            let byte_end = chunk.byte_offset.checked_add(chunk.byte_length);
            if byte_end.is_none_or(|end| end > data_end) {
                lance_bail!(
                    CorruptEncoding: "column {} chunk bytes [{}, +{}) overrun the data region of {} bytes",
                    column_index,
                    chunk.byte_offset,
                    chunk.byte_length,
                    data_end
                );
            }
        }
        if covered != row_count {
            lance_bail!(
                CorruptEncoding: "column {} chunks cover {} of {} rows",
                column_index,
                covered,
                row_count
            );
        }
        Ok(Self { chunks })
    }

    /// The chunks overlapping rows `range`, found by binary search.
    ///
    /// Empty chunks never overlap anything and are skipped.
    pub fn resolve_range(&self, range: Range<u64>) -> &[ChunkSpec] {
        let first = self.chunks.partition_point(|c| c.row_end <= range.start);
        let last = self.chunks.partition_point(|c| c.row_start < range.end);
        &self.chunks[first..last.max(first)]
    }

    /// The chunk holding `row`.
    pub fn chunk_for_row(&self, row: u64) -> &ChunkSpec {
        &self.resolve_range(row..row + 1)[0]
    }
}

#[cfg(test)]
mod tests {
    use lance_dtype::{DType, Nullability, PType, Schema};
    use lance_error::LanceError;

    use super::ColumnChunks;
    use crate::footer::{ChunkSpec, EncodingKind, Footer};

    fn chunk(column: u32, rows: std::ops::Range<u64>, bytes: std::ops::Range<u64>) -> ChunkSpec {
        ChunkSpec {
            column_index: column,
            row_start: rows.start,
            row_end: rows.end,
            byte_offset: bytes.start,
            byte_length: bytes.end - bytes.start,
            encoding: EncodingKind::Plain,
        }
    }

    fn schema() -> Schema {
        Schema::from_iter([(
            "v".into(),
            DType::Primitive(PType::U8, Nullability::NonNullable),
        )])
    }

    #[test]
    fn resolve_range_by_binary_search() {
        let footer = Footer::new(
            schema(),
            10,
            vec![
                chunk(0, 0..4, 4..8),
                chunk(0, 4..7, 8..11),
                chunk(0, 7..10, 11..14),
            ]
            .into(),
        );
        let columns = ColumnChunks::try_from_footer(&footer, 14).unwrap();
        let hits = columns[0].resolve_range(3..8);
        assert_eq!(hits.len(), 3);
        let hits = columns[0].resolve_range(4..7);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].row_start, 4);
        assert_eq!(columns[0].chunk_for_row(9).row_start, 7);
        assert!(columns[0].resolve_range(4..4).is_empty());
    }

    #[test]
    fn gaps_are_rejected() {
        let footer = Footer::new(
            schema(),
            8,
            vec![chunk(0, 0..4, 4..8), chunk(0, 5..8, 8..11)].into(),
        );
        assert!(matches!(
            ColumnChunks::try_from_footer(&footer, 11),
            Err(LanceError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn incomplete_coverage_is_rejected() {
        let footer = Footer::new(schema(), 8, vec![chunk(0, 0..4, 4..8)].into());
        assert!(matches!(
            ColumnChunks::try_from_footer(&footer, 8),
            Err(LanceError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn byte_overrun_is_rejected() {
        let footer = Footer::new(schema(), 4, vec![chunk(0, 0..4, 4..20)].into());
        assert!(matches!(
            ColumnChunks::try_from_footer(&footer, 10),
            Err(LanceError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let footer = Footer::new(schema(), 4, vec![chunk(1, 0..4, 4..8)].into());
        assert!(matches!(
            ColumnChunks::try_from_footer(&footer, 8),
            Err(LanceError::CorruptEncoding(_))
        ));
    }
}

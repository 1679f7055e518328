use std::ops::Range;
use std::sync::Arc;

use itertools::Itertools;
use lance_dtype::Schema;
use lance_error::{LanceResult, lance_bail};

use crate::Array;

/// An in-memory unit of rows: one [`Array`] per schema field, all of the same
/// length.
///
/// Batches are what the file writer consumes and what reads produce. A batch
/// with zero rows still carries its full schema.
#[derive(Debug, Clone)]
pub struct Batch {
    schema: Schema,
    columns: Arc<[Array]>,
    row_count: usize,
}

impl Batch {
    /// Group columns under a schema, validating shape agreement.
    pub fn try_new(schema: Schema, columns: Vec<Array>) -> LanceResult<Self> {
        if columns.len() != schema.field_count() {
            lance_bail!(
                SchemaMismatch: "schema has {} fields but {} columns were provided",
                schema.field_count(),
                columns.len()
            );
        }
        let row_count = columns.first().map(Array::len).unwrap_or_default();
        for (idx, column) in columns.iter().enumerate() {
            if column.len() != row_count {
                lance_bail!(
                    "column {} has {} rows, expected {}",
                    idx,
                    column.len(),
                    row_count
                );
            }
            let expected = schema.field_dtype(idx);
            let actual = column.dtype();
            // An all-valid column is acceptable wherever the field is
            // nullable; everything else must agree exactly.
            let compatible = actual == expected
                || (expected.is_nullable() && actual.eq_ignore_nullability(&expected));
            if !compatible {
                lance_bail!(
                    SchemaMismatch: "column {} ({:?}): expected type {}, got {}",
                    idx,
                    schema.field_name(idx),
                    expected,
                    actual
                );
            }
        }
        Ok(Self {
            schema,
            columns: columns.into(),
            row_count,
        })
    }

    /// A batch with the given schema and no rows.
    pub fn empty(schema: Schema) -> Self {
        let columns = schema
            .dtypes()
            .iter()
            .map(|dtype| crate::arrow::empty_array(*dtype))
            .collect_vec();
        Self {
            schema,
            columns: columns.into(),
            row_count: 0,
        }
    }

    /// The batch's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// The column for field `index`.
    pub fn column(&self, index: usize) -> &Array {
        &self.columns[index]
    }

    /// All columns in schema order.
    pub fn columns(&self) -> &Arc<[Array]> {
        &self.columns
    }

    /// Rows `range` of every column.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            schema: self.schema.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| c.slice(range.clone()))
                .collect_vec()
                .into(),
            row_count: range.end - range.start,
        }
    }
}

#[cfg(test)]
mod tests {
    use lance_dtype::{DType, Nullability, PType, Schema};
    use lance_error::LanceError;

    use crate::{Array, Batch, PrimitiveArray, Validity, VarBinArray};

    fn test_schema() -> Schema {
        Schema::from_iter([
            (
                "id".into(),
                DType::Primitive(PType::I32, Nullability::NonNullable),
            ),
            ("name".into(), DType::Utf8(Nullability::NonNullable)),
        ])
    }

    #[test]
    fn column_count_must_match() {
        let batch = Batch::try_new(
            test_schema(),
            vec![Array::from(PrimitiveArray::from_vec(
                vec![1i32],
                Validity::NonNullable,
            ))],
        );
        assert!(matches!(batch, Err(LanceError::SchemaMismatch(_))));
    }

    #[test]
    fn slice_applies_to_all_columns() {
        let batch = Batch::try_new(
            test_schema(),
            vec![
                Array::from(PrimitiveArray::from_vec(
                    vec![1i32, 2, 3],
                    Validity::NonNullable,
                )),
                Array::from(VarBinArray::from_strs(
                    &["a", "b", "c"],
                    Nullability::NonNullable,
                )),
            ],
        )
        .unwrap();
        let sliced = batch.slice(1..3);
        assert_eq!(sliced.row_count(), 2);
        assert_eq!(
            sliced.column(0).as_primitive().unwrap().as_slice::<i32>(),
            &[2, 3]
        );
        assert_eq!(sliced.column(1).as_varbin().unwrap().value(0), b"b");
    }

    #[test]
    fn empty_batch_keeps_schema() {
        let batch = Batch::empty(test_schema());
        assert_eq!(batch.row_count(), 0);
        assert_eq!(batch.schema().field_count(), 2);
        assert_eq!(batch.column(1).len(), 0);
    }
}

//! Zero-copy conversions between Lance arrays and Arrow arrays.
//!
//! Buffers are shared in both directions: exporting a decoded column to
//! Arrow, or adopting an externally produced Arrow column, never duplicates
//! value bytes. Offsets are rebased (a small copy of the offsets array only)
//! when an imported array is a non-trivial slice of its backing buffers.

use std::sync::Arc;

use arrow_array::{Array as ArrowArray, ArrayRef, RecordBatch, StructArray, make_array};
use arrow_buffer::{Buffer, ScalarBuffer};
use arrow_data::ArrayData;
use arrow_schema::DataType;
use lance_dtype::{DType, Nullability, Schema};
use lance_error::{LanceResult, lance_bail};

use crate::{Array, Batch, PrimitiveArray, Validity, VarBinArray};

/// An empty array of the given logical type.
pub fn empty_array(dtype: DType) -> Array {
    let validity = match dtype.nullability() {
        Nullability::NonNullable => Validity::NonNullable,
        Nullability::Nullable => Validity::AllValid,
    };
    match dtype {
        DType::Primitive(ptype, _) => Array::Primitive(
            PrimitiveArray::try_new(ptype, Buffer::from_vec(Vec::<u8>::new()), 0, validity)
                .unwrap_or_else(|e| lance_error::lance_panic!("empty primitive array: {}", e)),
        ),
        DType::Utf8(_) | DType::Binary(_) => Array::VarBin(
            VarBinArray::try_new(
                dtype,
                vec![0i32].into(),
                Buffer::from_vec(Vec::<u8>::new()),
                validity,
            )
            .unwrap_or_else(|e| lance_error::lance_panic!("empty varbin array: {}", e)),
        ),
    }
}

impl Array {
    /// Export this column as an Arrow array, sharing the value buffers.
    pub fn to_arrow(&self) -> LanceResult<ArrayRef> {
        let data = match self {
            Self::Primitive(a) => ArrayData::builder(a.dtype().to_arrow())
                .len(a.len())
                .add_buffer(a.values().clone())
                .nulls(a.validity().to_null_buffer())
                .build()?,
            Self::VarBin(a) => ArrayData::builder(a.dtype().to_arrow())
                .len(a.len())
                .add_buffer(a.offsets().inner().clone())
                .add_buffer(a.data().clone())
                .nulls(a.validity().to_null_buffer())
                .build()?,
        };
        Ok(make_array(data))
    }

    /// Adopt an Arrow array, sharing its value buffers. The engine treats the
    /// adopted buffers as read-only.
    pub fn from_arrow(array: &dyn ArrowArray, nullability: Nullability) -> LanceResult<Self> {
        let data = array.to_data();
        let len = data.len();
        let validity = Validity::try_from_arrow(data.nulls().cloned(), nullability, len)?;
        let dtype = DType::from_arrow(data.data_type(), nullability.into())?;
        match data.data_type() {
            DataType::Utf8 | DataType::Binary => {
                let offsets =
                    ScalarBuffer::<i32>::new(data.buffers()[0].clone(), data.offset(), len + 1);
                let (offsets, values) = rebase_offsets(&offsets, &data.buffers()[1]);
                Ok(Self::VarBin(VarBinArray::try_new(
                    dtype, offsets, values, validity,
                )?))
            }
            other => {
                let Some(ptype) = dtype.ptype() else {
                    lance_bail!(SchemaMismatch: "{} is not a supported column type", other);
                };
                let width = ptype.byte_width();
                let values = data.buffers()[0].slice_with_length(data.offset() * width, len * width);
                Ok(Self::Primitive(PrimitiveArray::try_new(
                    ptype, values, len, validity,
                )?))
            }
        }
    }
}

/// Rebase an Arrow offsets window so the first offset is zero and the data
/// buffer is trimmed to exactly the referenced span.
fn rebase_offsets(offsets: &ScalarBuffer<i32>, data: &Buffer) -> (ScalarBuffer<i32>, Buffer) {
    let base = offsets[0];
    let end = offsets[offsets.len() - 1];
    if base == 0 && end as usize == data.len() {
        return (offsets.clone(), data.clone());
    }
    let rebased: Vec<i32> = offsets.iter().map(|o| o - base).collect();
    (
        rebased.into(),
        data.slice_with_length(base as usize, (end - base) as usize),
    )
}

impl Batch {
    /// Export as an Arrow record batch, sharing buffers.
    pub fn to_record_batch(&self) -> LanceResult<RecordBatch> {
        let arrow_schema = Arc::new(arrow_schema::Schema::from(self.schema()));
        let columns = self
            .columns()
            .iter()
            .map(Array::to_arrow)
            .collect::<LanceResult<Vec<_>>>()?;
        if self.row_count() == 0 {
            let options =
                arrow_array::RecordBatchOptions::new().with_row_count(Some(0));
            return Ok(RecordBatch::try_new_with_options(
                arrow_schema,
                columns,
                &options,
            )?);
        }
        Ok(RecordBatch::try_new(arrow_schema, columns)?)
    }

    /// Adopt an Arrow record batch, sharing buffers.
    pub fn from_record_batch(batch: &RecordBatch) -> LanceResult<Self> {
        let schema = Schema::try_from(batch.schema().as_ref())?;
        let columns = batch
            .columns()
            .iter()
            .zip(schema.dtypes().iter())
            .map(|(column, dtype)| Array::from_arrow(column.as_ref(), dtype.nullability()))
            .collect::<LanceResult<Vec<_>>>()?;
        Self::try_new(schema, columns)
    }

    /// Export the whole batch as a single Arrow struct array, the shape the
    /// C Data Interface moves record batches in.
    pub fn to_struct_array(&self) -> LanceResult<StructArray> {
        Ok(StructArray::from(self.to_record_batch()?))
    }
}

#[cfg(test)]
mod tests {
    use arrow_array::cast::AsArray;
    use arrow_array::types::Int32Type;
    use arrow_array::{Array as ArrowArray, Int32Array, StringArray};
    use lance_dtype::Nullability;

    use crate::{Array, Batch, PrimitiveArray, Validity, VarBinArray};

    #[test]
    fn primitive_to_arrow_shares_buffer() {
        let array = PrimitiveArray::from_vec(vec![1i32, 2, 3], Validity::NonNullable);
        let value_ptr = array.values().as_ptr();
        let arrow = Array::from(array).to_arrow().unwrap();
        let arrow = arrow.as_primitive::<Int32Type>();
        assert_eq!(arrow.values().as_ref(), &[1, 2, 3]);
        assert_eq!(arrow.values().inner().as_ptr(), value_ptr);
    }

    #[test]
    fn arrow_round_trip_with_nulls() {
        let arrow = Int32Array::from(vec![Some(1), None, Some(3)]);
        let array = Array::from_arrow(&arrow, Nullability::Nullable).unwrap();
        assert_eq!(array.validity().null_count(), 1);
        let back = array.to_arrow().unwrap();
        assert_eq!(back.as_primitive::<Int32Type>(), &arrow);
    }

    #[test]
    fn sliced_string_import_rebases() {
        let arrow = StringArray::from(vec!["ab", "foo", "bar"]);
        let sliced = arrow.slice(1, 2);
        let array = Array::from_arrow(&sliced, Nullability::NonNullable).unwrap();
        let varbin = array.as_varbin().unwrap();
        assert_eq!(varbin.offsets()[0], 0);
        assert_eq!(varbin.value(0), b"foo");
        assert_eq!(varbin.value(1), b"bar");
    }

    #[test]
    fn record_batch_round_trip() {
        let batch = Batch::try_new(
            lance_dtype::Schema::from_iter([
                (
                    "id".into(),
                    lance_dtype::DType::Primitive(
                        lance_dtype::PType::I32,
                        Nullability::NonNullable,
                    ),
                ),
                (
                    "name".into(),
                    lance_dtype::DType::Utf8(Nullability::NonNullable),
                ),
            ]),
            vec![
                Array::from(PrimitiveArray::from_vec(
                    vec![1i32, 2],
                    Validity::NonNullable,
                )),
                Array::from(VarBinArray::from_strs(&["a", "b"], Nullability::NonNullable)),
            ],
        )
        .unwrap();

        let rb = batch.to_record_batch().unwrap();
        assert_eq!(rb.num_rows(), 2);
        let back = Batch::from_record_batch(&rb).unwrap();
        assert_eq!(back.schema(), batch.schema());
        assert_eq!(back.column(1).as_varbin().unwrap().value(1), b"b");
    }
}

//! FFI interface for row batches.
//!
//! An [`FFIBatch`] is the unit every read returns. Callers inspect its shape
//! and pull columns (or the whole batch) out as Arrow C Data Interface
//! structs, which hand ownership of the underlying buffers to the caller
//! without copying the values.

use std::ptr;

use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema, to_ffi};
use arrow_array::Array as _;
use lance_array::Batch;
use ::lance_error::lance_err;

use crate::error::{lance_error, try_or};

/// The FFI interface for a [`Batch`].
///
/// The C side only ever sees a pointer to this struct and passes it into the
/// `FFIBatch_*` functions.
pub struct FFIBatch {
    pub inner: Batch,
}

/// Get the number of columns in the batch.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FFIBatch_num_columns(batch: *const FFIBatch) -> u32 {
    let batch = &*batch;

    batch.inner.schema().field_count() as u32
}

/// Get the number of rows in the batch.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FFIBatch_row_count(batch: *const FFIBatch) -> u64 {
    let batch = &*batch;

    batch.inner.row_count() as u64
}

/// Export column `index` into the caller's Arrow C Data Interface structs.
///
/// The caller owns the exported structs afterwards and releases them through
/// the release callbacks Arrow embeds in them. Buffers are shared with the
/// batch, not copied.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FFIBatch_export_column(
    batch: *const FFIBatch,
    index: u32,
    out_array: *mut FFI_ArrowArray,
    out_schema: *mut FFI_ArrowSchema,
    error: *mut *mut lance_error,
) {
    let batch = &*batch;

    try_or(error, (), || {
        let count = batch.inner.schema().field_count();
        if index as usize >= count {
            return Err(lance_err!(
                OutOfRange: "column {} of a {}-column batch",
                index,
                count
            ));
        }
        let array = batch.inner.column(index as usize).to_arrow()?;
        let (ffi_array, ffi_schema) = to_ffi(&array.to_data())?;
        unsafe {
            ptr::write(out_array, ffi_array);
            ptr::write(out_schema, ffi_schema);
        }
        Ok(())
    })
}

/// Export the whole batch as a single Arrow struct array, one child per
/// column.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FFIBatch_export(
    batch: *const FFIBatch,
    out_array: *mut FFI_ArrowArray,
    out_schema: *mut FFI_ArrowSchema,
    error: *mut *mut lance_error,
) {
    let batch = &*batch;

    try_or(error, (), || {
        let array = batch.inner.to_struct_array()?;
        let (ffi_array, ffi_schema) = to_ffi(&array.to_data())?;
        unsafe {
            ptr::write(out_array, ffi_array);
            ptr::write(out_schema, ffi_schema);
        }
        Ok(())
    })
}

/// Free the batch. Already-exported Arrow structs stay valid; they keep
/// their buffers alive on their own.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FFIBatch_free(batch: *mut FFIBatch) {
    drop(Box::from_raw(batch));
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi};
    use arrow_array::cast::AsArray;
    use arrow_array::types::UInt32Type;
    use lance_array::{Array, Batch, PrimitiveArray, Validity};
    use lance_dtype::{DType, Nullability, PType, Schema};

    use super::*;

    #[test]
    fn export_column_round_trips_through_arrow_ffi() {
        let schema = Schema::from_iter([(
            "id".into(),
            DType::Primitive(PType::U32, Nullability::NonNullable),
        )]);
        let batch = Batch::try_new(
            schema,
            vec![Array::from(PrimitiveArray::from_vec(
                vec![1u32, 2, 3],
                Validity::NonNullable,
            ))],
        )
        .unwrap();
        let handle = Box::into_raw(Box::new(FFIBatch { inner: batch }));

        unsafe {
            assert_eq!(FFIBatch_num_columns(handle), 1);
            assert_eq!(FFIBatch_row_count(handle), 3);

            let mut ffi_array = FFI_ArrowArray::empty();
            let mut ffi_schema = FFI_ArrowSchema::empty();
            let mut error = ptr::null_mut();
            FFIBatch_export_column(handle, 0, &mut ffi_array, &mut ffi_schema, &mut error);
            assert!(error.is_null());

            let data = from_ffi(ffi_array, &ffi_schema).unwrap();
            let array = arrow_array::make_array(data);
            assert_eq!(
                array.as_primitive::<UInt32Type>().values().as_ref(),
                &[1, 2, 3]
            );

            FFIBatch_free(handle);
        }
    }

    #[test]
    fn export_out_of_range_column_sets_the_error() {
        let schema = Schema::from_iter([(
            "id".into(),
            DType::Primitive(PType::U32, Nullability::NonNullable),
        )]);
        let batch = Batch::empty(schema);
        let handle = Box::into_raw(Box::new(FFIBatch { inner: batch }));

        unsafe {
            let mut ffi_array = FFI_ArrowArray::empty();
            let mut ffi_schema = FFI_ArrowSchema::empty();
            let mut error = ptr::null_mut();
            FFIBatch_export_column(handle, 5, &mut ffi_array, &mut ffi_schema, &mut error);
            assert!(!error.is_null());
            assert_eq!((*error).code, crate::error::LANCE_ERROR_OUT_OF_RANGE);
            crate::error::lance_error_free(error);
            FFIBatch_free(handle);
        }
    }
}

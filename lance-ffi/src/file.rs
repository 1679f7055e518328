//! FFI interface for Lance file I/O.

use std::ffi::c_char;
use std::fs::File;
use std::io::BufWriter;
use std::ptr;
use std::slice;

use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi};
use arrow_array::{RecordBatch, StructArray};
use arrow_schema::Schema as ArrowSchema;
use lance_array::Batch;
use lance_dtype::Schema;
use ::lance_error::lance_err;
use lance_file::{FileWriter, LanceFile};

use crate::array::FFIBatch;
use crate::error::{lance_error, try_or};
use crate::to_string;

/// An open, committed file. Reads may run from any thread; the handle is
/// immutable.
pub struct FFIFile {
    pub(crate) inner: LanceFile<File>,
}

/// Open the file at the given filesystem path.
///
/// Returns null and sets `error` if the file cannot be opened or fails
/// validation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn File_open(
    path: *const c_char,
    error: *mut *mut lance_error,
) -> *mut FFIFile {
    assert!(!path.is_null(), "File_open: null path");
    let path = to_string(path);

    try_or(error, ptr::null_mut(), || {
        let inner = LanceFile::open_path(&path)?;
        Ok(Box::into_raw(Box::new(FFIFile { inner })))
    })
}

/// Get the exact number of rows in the file.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn File_row_count(file: *const FFIFile) -> u64 {
    let file = &*file;

    file.inner.row_count()
}

/// Get the number of columns in the file's schema.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn File_num_columns(file: *const FFIFile) -> u32 {
    let file = &*file;

    file.inner.schema().field_count() as u32
}

/// Materialize rows `[start, end)` of every column.
///
/// Returns null and sets `error` if the range is invalid or a chunk fails to
/// decode.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn File_read_range(
    file: *const FFIFile,
    start: u64,
    end: u64,
    error: *mut *mut lance_error,
) -> *mut FFIBatch {
    let file = &*file;

    try_or(error, ptr::null_mut(), || {
        let inner = file.inner.read_range(start..end)?;
        Ok(Box::into_raw(Box::new(FFIBatch { inner })))
    })
}

/// Materialize the rows at `indices`, in the caller's order. Duplicates are
/// allowed; negative indices are rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn File_take(
    file: *const FFIFile,
    indices: *const i64,
    indices_len: usize,
    error: *mut *mut lance_error,
) -> *mut FFIBatch {
    let file = &*file;
    let indices = if indices_len == 0 {
        &[]
    } else {
        slice::from_raw_parts(indices, indices_len)
    };

    try_or(error, ptr::null_mut(), || {
        let indices = indices
            .iter()
            .map(|&idx| {
                u64::try_from(idx)
                    .map_err(|_| lance_err!(OutOfRange: "negative row index {}", idx))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let inner = file.inner.take(&indices)?;
        Ok(Box::into_raw(Box::new(FFIBatch { inner })))
    })
}

/// Free the file handle. Outstanding batches stay valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn File_free(file: *mut FFIFile) {
    drop(Box::from_raw(file));
}

/// A writer streaming batches into a file at a filesystem path.
pub struct FFIFileWriter {
    pub(crate) inner: FileWriter<BufWriter<File>>,
}

/// Create (or truncate) a file at `path` that will hold rows of `schema`.
///
/// `schema` must describe a struct type; ownership of the C struct transfers
/// to this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FileWriter_open(
    path: *const c_char,
    schema: *mut FFI_ArrowSchema,
    error: *mut *mut lance_error,
) -> *mut FFIFileWriter {
    assert!(!path.is_null(), "FileWriter_open: null path");
    assert!(!schema.is_null(), "FileWriter_open: null schema");
    let path = to_string(path);
    let ffi_schema = ptr::read(schema);

    try_or(error, ptr::null_mut(), || {
        let arrow_schema = ArrowSchema::try_from(&ffi_schema)?;
        let schema = Schema::try_from(&arrow_schema)?;
        let inner = FileWriter::create(&path, schema)?;
        Ok(Box::into_raw(Box::new(FFIFileWriter { inner })))
    })
}

/// Append one batch, passed as an Arrow struct array with one child per
/// column. Ownership of both C structs transfers to this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FileWriter_write(
    writer: *mut FFIFileWriter,
    array: *mut FFI_ArrowArray,
    schema: *mut FFI_ArrowSchema,
    error: *mut *mut lance_error,
) {
    let writer = &mut *writer;
    let ffi_array = ptr::read(array);
    let ffi_schema = ptr::read(schema);

    try_or(error, (), || {
        let data = unsafe { from_ffi(ffi_array, &ffi_schema)? };
        let batch = RecordBatch::from(StructArray::from(data));
        writer.inner.write(&Batch::from_record_batch(&batch)?)
    })
}

/// Seal the file by writing its footer and trailer.
///
/// Returns the committed row count, or 0 with `error` set on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FileWriter_commit(
    writer: *mut FFIFileWriter,
    error: *mut *mut lance_error,
) -> u64 {
    let writer = &mut *writer;

    try_or(error, 0, || Ok(writer.inner.commit()?.row_count()))
}

/// Free the writer. An uncommitted writer's output is not a readable file.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FileWriter_free(writer: *mut FFIFileWriter) {
    drop(Box::from_raw(writer));
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::ptr;
    use std::sync::Arc;

    use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi, to_ffi};
    use arrow_array::cast::AsArray;
    use arrow_array::types::UInt32Type;
    use arrow_array::{Array as _, ArrayRef, StringArray, StructArray, UInt32Array, make_array};
    use arrow_schema::{DataType, Field, Fields, Schema as ArrowSchema};

    use super::*;
    use crate::array::{FFIBatch_export, FFIBatch_free, FFIBatch_row_count};
    use crate::error::{LANCE_ERROR_ALREADY_COMMITTED, LANCE_ERROR_OUT_OF_RANGE, lance_error_free};

    fn arrow_fields() -> Fields {
        Fields::from(vec![
            Field::new("id", DataType::UInt32, false),
            Field::new("name", DataType::Utf8, false),
        ])
    }

    fn struct_batch(ids: &[u32], names: &[&str]) -> StructArray {
        let fields = arrow_fields();
        StructArray::new(
            fields.clone(),
            vec![
                Arc::new(UInt32Array::from(ids.to_vec())) as ArrayRef,
                Arc::new(StringArray::from(names.to_vec())) as ArrayRef,
            ],
            None,
        )
    }

    unsafe fn write_batch(writer: *mut FFIFileWriter, batch: &StructArray) {
        let (mut ffi_array, mut ffi_schema) = to_ffi(&batch.to_data()).unwrap();
        let mut error = ptr::null_mut();
        FileWriter_write(writer, &mut ffi_array, &mut ffi_schema, &mut error);
        assert!(error.is_null());
        // Ownership moved into the writer; do not run the release callbacks
        // a second time.
        std::mem::forget(ffi_array);
        std::mem::forget(ffi_schema);
    }

    #[test]
    fn write_and_read_through_the_c_interface() {
        let dir = tempfile::tempdir().unwrap();
        let path = CString::new(
            dir.path().join("table.lance").to_string_lossy().as_bytes(),
        )
        .unwrap();

        unsafe {
            let arrow_schema = ArrowSchema::new(arrow_fields());
            let mut ffi_schema = FFI_ArrowSchema::try_from(&arrow_schema).unwrap();
            let mut error = ptr::null_mut();
            let writer = FileWriter_open(path.as_ptr(), &mut ffi_schema, &mut error);
            assert!(error.is_null());
            std::mem::forget(ffi_schema);

            write_batch(writer, &struct_batch(&[1, 2], &["ab", "foo"]));
            write_batch(writer, &struct_batch(&[3, 4], &["bar", "baz"]));

            let committed = FileWriter_commit(writer, &mut error);
            assert!(error.is_null());
            assert_eq!(committed, 4);

            // Committing twice reports the writer as already committed.
            FileWriter_commit(writer, &mut error);
            assert!(!error.is_null());
            assert_eq!((*error).code, LANCE_ERROR_ALREADY_COMMITTED);
            lance_error_free(error);
            error = ptr::null_mut();
            FileWriter_free(writer);

            let file = File_open(path.as_ptr(), &mut error);
            assert!(error.is_null());
            assert_eq!(File_row_count(file), 4);
            assert_eq!(File_num_columns(file), 2);

            let batch = File_take(file, [3i64, 1, 1, 0].as_ptr(), 4, &mut error);
            assert!(error.is_null());
            assert_eq!(FFIBatch_row_count(batch), 4);

            let mut out_array = FFI_ArrowArray::empty();
            let mut out_schema = FFI_ArrowSchema::empty();
            FFIBatch_export(batch, &mut out_array, &mut out_schema, &mut error);
            assert!(error.is_null());
            let imported = make_array(from_ffi(out_array, &out_schema).unwrap());
            let imported = imported.as_struct();
            assert_eq!(
                imported.column(0).as_primitive::<UInt32Type>().values().as_ref(),
                &[4, 2, 2, 1]
            );
            assert_eq!(
                imported.column(1).as_string::<i32>().value(0),
                "baz"
            );

            FFIBatch_free(batch);
            File_free(file);
        }
    }

    #[test]
    fn take_rejects_negative_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = CString::new(
            dir.path().join("neg.lance").to_string_lossy().as_bytes(),
        )
        .unwrap();

        unsafe {
            let arrow_schema = ArrowSchema::new(arrow_fields());
            let mut ffi_schema = FFI_ArrowSchema::try_from(&arrow_schema).unwrap();
            let mut error = ptr::null_mut();
            let writer = FileWriter_open(path.as_ptr(), &mut ffi_schema, &mut error);
            std::mem::forget(ffi_schema);
            write_batch(writer, &struct_batch(&[1], &["a"]));
            FileWriter_commit(writer, &mut error);
            FileWriter_free(writer);

            let file = File_open(path.as_ptr(), &mut error);
            assert!(error.is_null());
            let batch = File_take(file, [-1i64].as_ptr(), 1, &mut error);
            assert!(batch.is_null());
            assert!(!error.is_null());
            assert_eq!((*error).code, LANCE_ERROR_OUT_OF_RANGE);
            lance_error_free(error);
            File_free(file);
        }
    }
}

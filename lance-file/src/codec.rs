//! Encoding and decoding of chunk bodies.
//!
//! A chunk body is `[validity bitmap][payload]`. The bitmap is present only
//! for nullable fields and holds `rows.div_ceil(8)` bytes, bit `i` being row
//! `i`'s validity. The payload depends on the encoding:
//!
//! * [`EncodingKind::Plain`]: `rows * byte_width` raw little-endian values.
//! * [`EncodingKind::VarBin`]: `(rows + 1)` little-endian i32 offsets, then
//!   the concatenated value bytes.

use std::ops::Range;

use arrow_buffer::{Buffer, ScalarBuffer};
use bytes::Bytes;
use lance_array::{Array, PrimitiveArray, Validity, VarBinArray};
use lance_dtype::{DType, Nullability};
use lance_error::{LanceResult, lance_bail};

use crate::footer::EncodingKind;
use crate::io::as_aligned;

/// Serialize one column's rows into a chunk body.
///
/// `nullability` is the field's declared nullability, which decides whether
/// the body carries a bitmap; an all-valid column under a nullable field
/// still writes one (all ones).
pub(crate) fn encode_chunk(array: &Array, nullability: Nullability) -> (Vec<u8>, EncodingKind) {
    let rows = array.len();
    let mut body = Vec::new();
    if nullability == Nullability::Nullable {
        body.extend_from_slice(&array.validity().to_bitmap_bytes(rows));
    }
    match array {
        Array::Primitive(values) => {
            body.extend_from_slice(values.values().as_slice());
            (body, EncodingKind::Plain)
        }
        Array::VarBin(values) => {
            for offset in values.offsets().iter() {
                body.extend_from_slice(&offset.to_le_bytes());
            }
            body.extend_from_slice(values.data().as_slice());
            (body, EncodingKind::VarBin)
        }
    }
}

/// Deserialize rows `local` out of a chunk body covering `rows` rows.
///
/// Value bytes are sliced out of `body` without copying where alignment
/// permits; only the requested rows are materialized.
pub(crate) fn decode_chunk(
    body: Bytes,
    dtype: DType,
    encoding: EncodingKind,
    rows: usize,
    local: Range<usize>,
) -> LanceResult<Array> {
    debug_assert!(local.start <= local.end && local.end <= rows);
    let bitmap_len = match dtype.is_nullable() {
        true => rows.div_ceil(8),
        false => 0,
    };
    if body.len() < bitmap_len {
        lance_bail!(
            CorruptEncoding: "chunk of {} bytes cannot hold a {}-byte validity bitmap",
            body.len(),
            bitmap_len
        );
    }
    let validity = match dtype.is_nullable() {
        true => Validity::from_bitmap_bytes(
            Buffer::from(body.slice(0..bitmap_len)),
            local.start,
            local.end - local.start,
        ),
        false => Validity::NonNullable,
    };
    match encoding {
        EncodingKind::Plain => decode_plain(body, dtype, bitmap_len, rows, local, validity),
        EncodingKind::VarBin => decode_varbin(body, dtype, bitmap_len, rows, local, validity),
    }
}

fn decode_plain(
    body: Bytes,
    dtype: DType,
    bitmap_len: usize,
    rows: usize,
    local: Range<usize>,
    validity: Validity,
) -> LanceResult<Array> {
    let Some(ptype) = dtype.ptype() else {
        lance_bail!(CorruptEncoding: "plain-encoded chunk for a {} column", dtype);
    };
    let width = ptype.byte_width();
    let expected = bitmap_len + rows * width;
    if body.len() != expected {
        lance_bail!(
            CorruptEncoding: "plain chunk of {} {} rows must be {} bytes, got {}",
            rows,
            ptype,
            expected,
            body.len()
        );
    }
    let values = as_aligned(
        body.slice(bitmap_len + local.start * width..bitmap_len + local.end * width),
        width,
    );
    Ok(PrimitiveArray::try_new(ptype, values, local.end - local.start, validity)?.into())
}

fn decode_varbin(
    body: Bytes,
    dtype: DType,
    bitmap_len: usize,
    rows: usize,
    local: Range<usize>,
    validity: Validity,
) -> LanceResult<Array> {
    if dtype.is_primitive() {
        lance_bail!(CorruptEncoding: "varbin-encoded chunk for a {} column", dtype);
    }
    let offsets_len = (rows + 1) * size_of::<i32>();
    if body.len() < bitmap_len + offsets_len {
        lance_bail!(
            CorruptEncoding: "varbin chunk of {} rows needs {} offset bytes, {} remain",
            rows,
            offsets_len,
            body.len() - bitmap_len
        );
    }
    let offsets: ScalarBuffer<i32> = ScalarBuffer::new(
        as_aligned(
            body.slice(bitmap_len..bitmap_len + offsets_len),
            align_of::<i32>(),
        ),
        0,
        rows + 1,
    );
    if offsets[0] != 0 {
        lance_bail!(CorruptEncoding: "varbin offsets start at {}, expected 0", offsets[0]);
    }
    if let Some(window) = offsets.windows(2).find(|w| w[1] < w[0]) {
        lance_bail!(
            CorruptEncoding: "varbin offsets decrease from {} to {}",
            window[0],
            window[1]
        );
    }
    let data_len = body.len() - bitmap_len - offsets_len;
    if offsets[rows] as usize != data_len {
        lance_bail!(
            CorruptEncoding: "varbin offsets end at byte {} but the chunk holds {} value bytes",
            offsets[rows],
            data_len
        );
    }
    let base = offsets[local.start];
    let end_byte = offsets[local.end];
    let local_offsets: Vec<i32> = offsets[local.start..=local.end]
        .iter()
        .map(|o| o - base)
        .collect();
    let data_start = bitmap_len + offsets_len + base as usize;
    let data = Buffer::from(body.slice(data_start..data_start + (end_byte - base) as usize));
    Ok(VarBinArray::try_new(dtype, local_offsets.into(), data, validity)?.into())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use lance_array::{Array, PrimitiveArray, Validity, VarBinArray};
    use lance_dtype::{DType, Nullability, PType};
    use lance_error::LanceError;

    use super::{decode_chunk, encode_chunk};
    use crate::footer::EncodingKind;

    #[test]
    fn plain_round_trip() {
        let array = Array::from(PrimitiveArray::from_vec(
            vec![10u32, 20, 30, 40],
            Validity::NonNullable,
        ));
        let (body, encoding) = encode_chunk(&array, Nullability::NonNullable);
        assert_eq!(encoding, EncodingKind::Plain);
        assert_eq!(body.len(), 16);

        let decoded = decode_chunk(
            Bytes::from(body),
            DType::Primitive(PType::U32, Nullability::NonNullable),
            encoding,
            4,
            1..3,
        )
        .unwrap();
        assert_eq!(
            decoded.as_primitive().unwrap().as_slice::<u32>(),
            &[20, 30]
        );
    }

    #[test]
    fn nullable_plain_carries_bitmap() {
        let array = Array::from(PrimitiveArray::from_option_vec(vec![
            Some(1i16),
            None,
            Some(3),
        ]));
        let (body, encoding) = encode_chunk(&array, Nullability::Nullable);
        // 1 bitmap byte + 3 * 2 value bytes.
        assert_eq!(body.len(), 7);
        assert_eq!(body[0], 0b0000_0101);

        let decoded = decode_chunk(
            Bytes::from(body),
            DType::Primitive(PType::I16, Nullability::Nullable),
            encoding,
            3,
            0..3,
        )
        .unwrap();
        assert_eq!(decoded.validity().null_count(), 1);
        assert!(!decoded.validity().is_valid(1));
    }

    #[test]
    fn varbin_sub_range() {
        let array = Array::from(VarBinArray::from_strs(
            &["ab", "foo", "bar", "baz"],
            Nullability::NonNullable,
        ));
        let (body, encoding) = encode_chunk(&array, Nullability::NonNullable);
        assert_eq!(encoding, EncodingKind::VarBin);

        let decoded = decode_chunk(
            Bytes::from(body),
            DType::Utf8(Nullability::NonNullable),
            encoding,
            4,
            1..3,
        )
        .unwrap();
        let varbin = decoded.as_varbin().unwrap();
        assert_eq!(varbin.len(), 2);
        assert_eq!(varbin.offsets()[0], 0);
        assert_eq!(varbin.value(0), b"foo");
        assert_eq!(varbin.value(1), b"bar");
    }

    #[test]
    fn truncated_plain_chunk() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u64, 2], Validity::NonNullable));
        let (mut body, encoding) = encode_chunk(&array, Nullability::NonNullable);
        body.pop();
        let err = decode_chunk(
            Bytes::from(body),
            DType::Primitive(PType::U64, Nullability::NonNullable),
            encoding,
            2,
            0..2,
        )
        .unwrap_err();
        assert!(matches!(err, LanceError::CorruptEncoding(_)));
    }

    #[test]
    fn decreasing_varbin_offsets() {
        let array = Array::from(VarBinArray::from_strs(&["ab", "cd"], Nullability::NonNullable));
        let (mut body, encoding) = encode_chunk(&array, Nullability::NonNullable);
        // Corrupt the middle offset so it runs backwards.
        body[4..8].copy_from_slice(&(-1i32).to_le_bytes());
        let err = decode_chunk(
            Bytes::from(body),
            DType::Utf8(Nullability::NonNullable),
            encoding,
            2,
            0..2,
        )
        .unwrap_err();
        assert!(matches!(err, LanceError::CorruptEncoding(_)));
    }

    #[test]
    fn encoding_mismatch() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u8], Validity::NonNullable));
        let (body, _) = encode_chunk(&array, Nullability::NonNullable);
        let err = decode_chunk(
            Bytes::from(body),
            DType::Primitive(PType::U8, Nullability::NonNullable),
            EncodingKind::VarBin,
            1,
            0..1,
        )
        .unwrap_err();
        assert!(matches!(err, LanceError::CorruptEncoding(_)));
    }
}

use std::ops::Range;

use arrow_buffer::{Buffer, MutableBuffer, ScalarBuffer};
use lance_dtype::{DType, Nullability};
use lance_error::{LanceResult, lance_bail, lance_panic};

use crate::Validity;

/// A column of variable-width values (UTF-8 strings or raw binary).
///
/// Values are stored Arrow-style: a monotonically non-decreasing i32 offsets
/// array of length `len + 1` with `offsets[0] == 0`, plus one concatenated
/// data buffer. Value `i` spans `data[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone)]
pub struct VarBinArray {
    dtype: DType,
    offsets: ScalarBuffer<i32>,
    data: Buffer,
    validity: Validity,
}

impl VarBinArray {
    /// Wrap offset and data buffers.
    pub fn try_new(
        dtype: DType,
        offsets: ScalarBuffer<i32>,
        data: Buffer,
        validity: Validity,
    ) -> LanceResult<Self> {
        if dtype.is_primitive() {
            lance_bail!("{} is not a variable-width type", dtype);
        }
        if offsets.is_empty() {
            lance_bail!("offsets array must have at least one entry");
        }
        if offsets[0] != 0 {
            lance_bail!("offsets must start at zero, got {}", offsets[0]);
        }
        let last = offsets[offsets.len() - 1];
        if last as usize != data.len() {
            lance_bail!(
                "offsets end at byte {} but the data buffer has {} bytes",
                last,
                data.len()
            );
        }
        if let Validity::Mask(nulls) = &validity {
            if nulls.len() != offsets.len() - 1 {
                lance_bail!(
                    "validity mask covers {} rows, array has {}",
                    nulls.len(),
                    offsets.len() - 1
                );
            }
        }
        Ok(Self {
            dtype,
            offsets,
            data,
            validity,
        })
    }

    /// Build a UTF-8 array from string slices.
    pub fn from_strs<S: AsRef<str>>(values: &[S], nullability: Nullability) -> Self {
        let validity = match nullability {
            Nullability::NonNullable => Validity::NonNullable,
            Nullability::Nullable => Validity::AllValid,
        };
        Self::from_byte_values(
            DType::Utf8(nullability),
            values.iter().map(|s| s.as_ref().as_bytes()),
            values.len(),
            validity,
        )
    }

    /// Build a nullable UTF-8 array from optional strings.
    pub fn from_option_strs<S: AsRef<str>>(values: &[Option<S>]) -> Self {
        let mask: arrow_buffer::NullBuffer = values.iter().map(Option::is_some).collect();
        let validity = if mask.null_count() == 0 {
            Validity::AllValid
        } else {
            Validity::Mask(mask)
        };
        Self::from_byte_values(
            DType::Utf8(Nullability::Nullable),
            values
                .iter()
                .map(|s| s.as_ref().map(|s| s.as_ref().as_bytes()).unwrap_or(&[])),
            values.len(),
            validity,
        )
    }

    /// Build a binary array from byte slices.
    pub fn from_bytes_values<B: AsRef<[u8]>>(values: &[B], nullability: Nullability) -> Self {
        let validity = match nullability {
            Nullability::NonNullable => Validity::NonNullable,
            Nullability::Nullable => Validity::AllValid,
        };
        Self::from_byte_values(
            DType::Binary(nullability),
            values.iter().map(AsRef::as_ref),
            values.len(),
            validity,
        )
    }

    fn from_byte_values<'a>(
        dtype: DType,
        values: impl Iterator<Item = &'a [u8]>,
        len: usize,
        validity: Validity,
    ) -> Self {
        let mut offsets = Vec::with_capacity(len + 1);
        offsets.push(0i32);
        let mut data = MutableBuffer::new(0);
        for value in values {
            data.extend_from_slice(value);
            offsets.push(
                i32::try_from(data.len())
                    .unwrap_or_else(|_| lance_panic!("value bytes exceed the i32 offset range")),
            );
        }
        Self {
            dtype,
            offsets: offsets.into(),
            data: data.into(),
            validity,
        }
    }

    /// The logical type of this column.
    pub fn dtype(&self) -> DType {
        self.dtype.with_nullability(self.validity.nullability())
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether the array holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The null mask.
    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    /// The offsets buffer (`len + 1` entries).
    pub fn offsets(&self) -> &ScalarBuffer<i32> {
        &self.offsets
    }

    /// The concatenated value bytes.
    pub fn data(&self) -> &Buffer {
        &self.data
    }

    /// The value at `index`, disregarding validity.
    pub fn value(&self, index: usize) -> &[u8] {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        &self.data.as_slice()[start..end]
    }

    /// Rows `range` as a new array. Offsets are rebased; the data buffer is
    /// shared, not copied.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let base = self.offsets[range.start];
        let end_byte = self.offsets[range.end];
        let offsets: Vec<i32> = self.offsets[range.start..=range.end]
            .iter()
            .map(|o| o - base)
            .collect();
        Self {
            dtype: self.dtype,
            offsets: offsets.into(),
            data: self
                .data
                .slice_with_length(base as usize, (end_byte - base) as usize),
            validity: self.validity.slice(range),
        }
    }

    /// Gather rows at the given indices, in order.
    pub fn take(&self, indices: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(indices.len() + 1);
        offsets.push(0i32);
        let mut data = MutableBuffer::new(0);
        for &idx in indices {
            data.extend_from_slice(self.value(idx));
            offsets.push(
                i32::try_from(data.len())
                    .unwrap_or_else(|_| lance_panic!("value bytes exceed the i32 offset range")),
            );
        }
        Self {
            dtype: self.dtype,
            offsets: offsets.into(),
            data: data.into(),
            validity: self.validity.take(indices),
        }
    }

    /// Concatenate arrays of the same variable-width type.
    pub fn concat(parts: &[Self]) -> LanceResult<Self> {
        let dtype = parts
            .first()
            .map(|a| a.dtype)
            .ok_or_else(|| lance_error::lance_err!("cannot concatenate zero arrays"))?;
        let mut rows = 0usize;
        let mut bytes = 0usize;
        for part in parts {
            if !part.dtype.eq_ignore_nullability(&dtype) {
                lance_bail!("cannot concatenate {} values onto {}", part.dtype, dtype);
            }
            rows += part.len();
            bytes += part.data.len();
        }
        let mut offsets = Vec::with_capacity(rows + 1);
        offsets.push(0i32);
        let mut data = MutableBuffer::new(bytes);
        for part in parts {
            let base = i32::try_from(data.len())
                .unwrap_or_else(|_| lance_panic!("value bytes exceed the i32 offset range"));
            data.extend_from_slice(part.data.as_slice());
            offsets.extend(part.offsets.iter().skip(1).map(|o| o + base));
        }
        let validity = Validity::concat(
            &parts
                .iter()
                .map(|p| (&p.validity, p.len()))
                .collect::<Vec<_>>(),
        );
        Ok(Self {
            dtype,
            offsets: offsets.into(),
            data: data.into(),
            validity,
        })
    }
}

#[cfg(test)]
mod tests {
    use lance_dtype::Nullability;

    use crate::VarBinArray;

    #[test]
    fn values_round_trip() {
        let array = VarBinArray::from_strs(&["ab", "", "foo"], Nullability::NonNullable);
        assert_eq!(array.len(), 3);
        assert_eq!(array.value(0), b"ab");
        assert_eq!(array.value(1), b"");
        assert_eq!(array.value(2), b"foo");
    }

    #[test]
    fn slice_rebases_offsets() {
        let array = VarBinArray::from_strs(&["ab", "foo", "bar", "baz"], Nullability::NonNullable);
        let sliced = array.slice(1..3);
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.offsets()[0], 0);
        assert_eq!(sliced.value(0), b"foo");
        assert_eq!(sliced.value(1), b"bar");
    }

    #[test]
    fn take_reorders_and_duplicates() {
        let array = VarBinArray::from_option_strs(&[Some("a"), None, Some("c")]);
        let taken = array.take(&[2, 2, 0]);
        assert_eq!(taken.value(0), b"c");
        assert_eq!(taken.value(1), b"c");
        assert_eq!(taken.value(2), b"a");
        assert_eq!(taken.validity().null_count(), 0);
    }
}

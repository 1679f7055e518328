use std::ops::Range;

use arrow_buffer::{ArrowNativeType, Buffer, MutableBuffer};
use lance_dtype::{DType, NativePType, PType};
use lance_error::{LanceResult, lance_bail};

use crate::Validity;

/// A column of fixed-width values, stored packed little-endian.
#[derive(Debug, Clone)]
pub struct PrimitiveArray {
    ptype: PType,
    values: Buffer,
    len: usize,
    validity: Validity,
}

impl PrimitiveArray {
    /// Wrap a raw value buffer.
    ///
    /// `values` must hold exactly `len` packed values of `ptype`.
    pub fn try_new(
        ptype: PType,
        values: Buffer,
        len: usize,
        validity: Validity,
    ) -> LanceResult<Self> {
        let expected = len * ptype.byte_width();
        if values.len() != expected {
            lance_bail!(
                "{} values of type {} need {} bytes, buffer has {}",
                len,
                ptype,
                expected,
                values.len()
            );
        }
        if let Validity::Mask(nulls) = &validity {
            if nulls.len() != len {
                lance_bail!("validity mask covers {} rows, array has {}", nulls.len(), len);
            }
        }
        Ok(Self {
            ptype,
            values,
            len,
            validity,
        })
    }

    /// Build an array from native values.
    pub fn from_vec<T: NativePType + ArrowNativeType>(values: Vec<T>, validity: Validity) -> Self {
        let len = values.len();
        Self {
            ptype: T::PTYPE,
            values: Buffer::from_vec(values),
            len,
            validity,
        }
    }

    /// Build a nullable array from optional values; `None` becomes a null
    /// slot backed by the type's default value.
    pub fn from_option_vec<T: NativePType + ArrowNativeType + Default>(
        values: Vec<Option<T>>,
    ) -> Self {
        let mask: arrow_buffer::NullBuffer = values.iter().map(Option::is_some).collect();
        let validity = if mask.null_count() == 0 {
            Validity::AllValid
        } else {
            Validity::Mask(mask)
        };
        Self::from_vec(
            values.into_iter().map(Option::unwrap_or_default).collect(),
            validity,
        )
    }

    /// The physical type of the values.
    pub fn ptype(&self) -> PType {
        self.ptype
    }

    /// The logical type of this column.
    pub fn dtype(&self) -> DType {
        DType::Primitive(self.ptype, self.validity.nullability())
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The null mask.
    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    /// The raw little-endian value bytes.
    pub fn values(&self) -> &Buffer {
        &self.values
    }

    /// View the values as a typed slice.
    ///
    /// ## Panics
    ///
    /// Panics if `T` does not match the array's [`PType`].
    pub fn as_slice<T: NativePType + ArrowNativeType>(&self) -> &[T] {
        assert_eq!(
            T::PTYPE,
            self.ptype,
            "typed access with {} on a {} array",
            T::PTYPE,
            self.ptype
        );
        self.values.typed_data::<T>()
    }

    /// A zero-copy view of rows `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let width = self.ptype.byte_width();
        Self {
            ptype: self.ptype,
            values: self
                .values
                .slice_with_length(range.start * width, (range.end - range.start) * width),
            len: range.end - range.start,
            validity: self.validity.slice(range),
        }
    }

    /// Gather rows at the given indices, in order. Duplicate indices each
    /// produce an independent copy of the value.
    pub fn take(&self, indices: &[usize]) -> Self {
        let width = self.ptype.byte_width();
        let mut values = MutableBuffer::new(indices.len() * width);
        let bytes = self.values.as_slice();
        for &idx in indices {
            values.extend_from_slice(&bytes[idx * width..(idx + 1) * width]);
        }
        Self {
            ptype: self.ptype,
            values: values.into(),
            len: indices.len(),
            validity: self.validity.take(indices),
        }
    }

    /// Concatenate arrays of the same physical type.
    pub fn concat(parts: &[Self]) -> LanceResult<Self> {
        let ptype = parts
            .first()
            .map(|a| a.ptype)
            .ok_or_else(|| lance_error::lance_err!("cannot concatenate zero arrays"))?;
        let mut total = 0usize;
        for part in parts {
            if part.ptype != ptype {
                lance_bail!("cannot concatenate {} values onto {}", part.ptype, ptype);
            }
            total += part.len;
        }
        let mut values = MutableBuffer::new(total * ptype.byte_width());
        for part in parts {
            values.extend_from_slice(part.values.as_slice());
        }
        let validity =
            Validity::concat(&parts.iter().map(|p| (&p.validity, p.len)).collect::<Vec<_>>());
        Ok(Self {
            ptype,
            values: values.into(),
            len: total,
            validity,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{PrimitiveArray, Validity};

    #[test]
    fn slice_is_zero_copy_view() {
        let array = PrimitiveArray::from_vec(vec![1i64, 2, 3, 4, 5], Validity::NonNullable);
        let sliced = array.slice(1..4);
        assert_eq!(sliced.as_slice::<i64>(), &[2, 3, 4]);
        assert_eq!(sliced.values().as_ptr(), array.values().as_ptr().wrapping_add(8));
    }

    #[test]
    fn take_with_duplicates() {
        let array = PrimitiveArray::from_option_vec(vec![Some(10i32), None, Some(30)]);
        let taken = array.take(&[2, 1, 1, 0]);
        assert_eq!(taken.as_slice::<i32>(), &[30, 0, 0, 10]);
        assert!(!taken.validity().is_valid(1));
        assert!(!taken.validity().is_valid(2));
        assert!(taken.validity().is_valid(3));
    }

    #[test]
    fn concat_preserves_values() {
        let a = PrimitiveArray::from_vec(vec![1u16, 2], Validity::NonNullable);
        let b = PrimitiveArray::from_vec(vec![3u16], Validity::NonNullable);
        let joined = PrimitiveArray::concat(&[a, b]).unwrap();
        assert_eq!(joined.as_slice::<u16>(), &[1, 2, 3]);
    }
}

use std::ops::Range;

use arrow_buffer::{BooleanBuffer, BooleanBufferBuilder, Buffer, NullBuffer};
use lance_dtype::Nullability;
use lance_error::{LanceExpect, LanceResult, lance_bail};

/// The null mask of an [`crate::Array`].
///
/// Non-nullable columns carry no mask at all. Nullable columns either know
/// they are fully valid or carry a one-bit-per-row mask (1 = valid).
#[derive(Debug, Clone)]
pub enum Validity {
    /// The column's type is non-nullable, so no mask exists.
    NonNullable,
    /// The column is nullable but every value is valid.
    AllValid,
    /// A one-bit-per-row validity mask; a zero bit marks a null.
    Mask(NullBuffer),
}

impl Validity {
    /// Build a validity from an Arrow null buffer and the field's
    /// nullability.
    ///
    /// A non-nullable field cannot accept nulls, and a mask's length must
    /// agree with the array's.
    pub fn try_from_arrow(
        nulls: Option<NullBuffer>,
        nullability: Nullability,
        len: usize,
    ) -> LanceResult<Self> {
        match (nulls, nullability) {
            (None, Nullability::NonNullable) => Ok(Self::NonNullable),
            (None, Nullability::Nullable) => Ok(Self::AllValid),
            (Some(nulls), nullability) => {
                if nulls.len() != len {
                    lance_bail!(
                        "validity mask covers {} rows but the array has {}",
                        nulls.len(),
                        len
                    );
                }
                if nulls.null_count() == 0 {
                    return Ok(match nullability {
                        Nullability::NonNullable => Self::NonNullable,
                        Nullability::Nullable => Self::AllValid,
                    });
                }
                if nullability == Nullability::NonNullable {
                    lance_bail!(
                        "non-nullable column has {} null values",
                        nulls.null_count()
                    );
                }
                Ok(Self::Mask(nulls))
            }
        }
    }

    /// Reconstruct a validity from the packed bitmap bytes of a chunk.
    pub fn from_bitmap_bytes(bitmap: Buffer, offset: usize, len: usize) -> Self {
        let nulls = NullBuffer::new(BooleanBuffer::new(bitmap, offset, len));
        if nulls.null_count() == 0 {
            Self::AllValid
        } else {
            Self::Mask(nulls)
        }
    }

    /// The nullability this validity implies for its column.
    pub fn nullability(&self) -> Nullability {
        match self {
            Self::NonNullable => Nullability::NonNullable,
            Self::AllValid | Self::Mask(_) => Nullability::Nullable,
        }
    }

    /// The number of nulls among `len` rows.
    pub fn null_count(&self) -> usize {
        match self {
            Self::NonNullable | Self::AllValid => 0,
            Self::Mask(nulls) => nulls.null_count(),
        }
    }

    /// Whether the value at `index` is valid.
    pub fn is_valid(&self, index: usize) -> bool {
        match self {
            Self::NonNullable | Self::AllValid => true,
            Self::Mask(nulls) => nulls.is_valid(index),
        }
    }

    /// The validity of a contiguous sub-range of rows.
    pub fn slice(&self, range: Range<usize>) -> Self {
        match self {
            Self::NonNullable => Self::NonNullable,
            Self::AllValid => Self::AllValid,
            Self::Mask(nulls) => {
                let sliced = nulls.slice(range.start, range.end - range.start);
                if sliced.null_count() == 0 {
                    Self::AllValid
                } else {
                    Self::Mask(sliced)
                }
            }
        }
    }

    /// Gather validity bits at the given row indices, in order.
    pub fn take(&self, indices: &[usize]) -> Self {
        match self {
            Self::NonNullable => Self::NonNullable,
            Self::AllValid => Self::AllValid,
            Self::Mask(nulls) => {
                let mut builder = BooleanBufferBuilder::new(indices.len());
                for &idx in indices {
                    builder.append(nulls.is_valid(idx));
                }
                let nulls = NullBuffer::new(builder.finish());
                if nulls.null_count() == 0 {
                    Self::AllValid
                } else {
                    Self::Mask(nulls)
                }
            }
        }
    }

    /// Concatenate validities, given each part's row count.
    pub fn concat(parts: &[(&Validity, usize)]) -> Self {
        if parts
            .iter()
            .all(|(v, _)| matches!(v, Self::NonNullable))
        {
            return Self::NonNullable;
        }
        if parts.iter().all(|(v, _)| v.null_count() == 0) {
            return Self::AllValid;
        }
        let total = parts.iter().map(|(_, len)| len).sum();
        let mut builder = BooleanBufferBuilder::new(total);
        for (validity, len) in parts {
            match validity {
                Self::NonNullable | Self::AllValid => builder.append_n(*len, true),
                Self::Mask(nulls) => builder.append_buffer(&nulls.inner().slice(0, *len)),
            }
        }
        Self::Mask(NullBuffer::new(builder.finish()))
    }

    /// The Arrow null buffer for this validity, if a mask is present.
    pub fn to_null_buffer(&self) -> Option<NullBuffer> {
        match self {
            Self::NonNullable | Self::AllValid => None,
            Self::Mask(nulls) => Some(nulls.clone()),
        }
    }

    /// Pack this validity into `len.div_ceil(8)` bitmap bytes, bit `i` being
    /// row `i`'s validity.
    pub fn to_bitmap_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = match self {
            Self::NonNullable | Self::AllValid => vec![0xFFu8; len.div_ceil(8)],
            Self::Mask(nulls) => nulls.inner().sliced().as_slice()[..len.div_ceil(8)].to_vec(),
        };
        // Clear the unused trailing bits so the encoding is canonical.
        if len % 8 != 0 {
            let last = bytes
                .last_mut()
                .lance_expect("bitmap of a non-empty range has at least one byte");
            *last &= (1u8 << (len % 8)) - 1;
        }
        bytes
    }
}

use std::ops::Range;

use lance_dtype::DType;
use lance_error::{LanceResult, lance_bail};

use crate::{PrimitiveArray, Validity, VarBinArray};

/// One column's values for a run of rows.
///
/// A closed variant over the supported physical shapes; the codec and the
/// Arrow boundary match it exhaustively.
#[derive(Debug, Clone)]
pub enum Array {
    /// Fixed-width values.
    Primitive(PrimitiveArray),
    /// Variable-width strings or binary.
    VarBin(VarBinArray),
}

impl Array {
    /// The number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Primitive(a) => a.len(),
            Self::VarBin(a) => a.len(),
        }
    }

    /// Whether the array holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical type, with nullability derived from the validity.
    pub fn dtype(&self) -> DType {
        match self {
            Self::Primitive(a) => a.dtype(),
            Self::VarBin(a) => a.dtype(),
        }
    }

    /// The null mask.
    pub fn validity(&self) -> &Validity {
        match self {
            Self::Primitive(a) => a.validity(),
            Self::VarBin(a) => a.validity(),
        }
    }

    /// Rows `range` as a new array. Value bytes are shared, not copied.
    pub fn slice(&self, range: Range<usize>) -> Self {
        match self {
            Self::Primitive(a) => Self::Primitive(a.slice(range)),
            Self::VarBin(a) => Self::VarBin(a.slice(range)),
        }
    }

    /// Gather rows at the given indices, in order. Duplicate indices each
    /// yield an independent copy of the value.
    pub fn take(&self, indices: &[usize]) -> LanceResult<Self> {
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= self.len()) {
            lance_bail!(OutOfRange: "index {} >= array length {}", bad, self.len());
        }
        Ok(match self {
            Self::Primitive(a) => Self::Primitive(a.take(indices)),
            Self::VarBin(a) => Self::VarBin(a.take(indices)),
        })
    }

    /// Concatenate arrays of the same logical type.
    pub fn concat(parts: &[Self]) -> LanceResult<Self> {
        match parts.first() {
            None => lance_bail!("cannot concatenate zero arrays"),
            Some(Self::Primitive(_)) => {
                let primitives = parts
                    .iter()
                    .map(|p| match p {
                        Self::Primitive(a) => Ok(a.clone()),
                        Self::VarBin(a) => {
                            Err(lance_error::lance_err!(
                                "cannot concatenate {} values onto a primitive array",
                                a.dtype()
                            ))
                        }
                    })
                    .collect::<LanceResult<Vec<_>>>()?;
                Ok(Self::Primitive(PrimitiveArray::concat(&primitives)?))
            }
            Some(Self::VarBin(_)) => {
                let varbins = parts
                    .iter()
                    .map(|p| match p {
                        Self::VarBin(a) => Ok(a.clone()),
                        Self::Primitive(a) => {
                            Err(lance_error::lance_err!(
                                "cannot concatenate {} values onto a variable-width array",
                                a.dtype()
                            ))
                        }
                    })
                    .collect::<LanceResult<Vec<_>>>()?;
                Ok(Self::VarBin(VarBinArray::concat(&varbins)?))
            }
        }
    }
}

impl From<PrimitiveArray> for Array {
    fn from(value: PrimitiveArray) -> Self {
        Self::Primitive(value)
    }
}

impl From<VarBinArray> for Array {
    fn from(value: VarBinArray) -> Self {
        Self::VarBin(value)
    }
}

impl Array {
    /// The contained primitive array, if fixed-width.
    pub fn as_primitive(&self) -> Option<&PrimitiveArray> {
        match self {
            Self::Primitive(a) => Some(a),
            Self::VarBin(_) => None,
        }
    }

    /// The contained variable-width array, if any.
    pub fn as_varbin(&self) -> Option<&VarBinArray> {
        match self {
            Self::Primitive(_) => None,
            Self::VarBin(a) => Some(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use lance_dtype::Nullability;
    use lance_error::LanceError;

    use crate::{Array, PrimitiveArray, Validity, VarBinArray};

    #[test]
    fn take_out_of_range() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1i32], Validity::NonNullable));
        assert!(matches!(
            array.take(&[1]),
            Err(LanceError::OutOfRange(_))
        ));
    }

    #[test]
    fn concat_mixed_shapes_fails() {
        let ints = Array::from(PrimitiveArray::from_vec(vec![1i32], Validity::NonNullable));
        let strs = Array::from(VarBinArray::from_strs(&["a"], Nullability::NonNullable));
        assert!(Array::concat(&[ints, strs]).is_err());
    }
}

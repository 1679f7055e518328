use std::fmt::{Display, Formatter};

use DType::*;

use crate::{Nullability, PType};

/// The logical types of values in a Lance column.
///
/// This is a closed variant: the codec layer matches it exhaustively, so
/// adding a type is a deliberate format change rather than a registry
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Fixed-width numeric values (integers and floats).
    Primitive(PType, Nullability),
    /// Variable-width UTF-8 strings.
    Utf8(Nullability),
    /// Variable-width binary data.
    Binary(Nullability),
}

impl DType {
    /// Get the nullability of this type.
    pub fn nullability(&self) -> Nullability {
        match self {
            Primitive(_, n) | Utf8(n) | Binary(n) => *n,
        }
    }

    /// Check whether instances of this type may be null.
    pub fn is_nullable(&self) -> bool {
        self.nullability().into()
    }

    /// Get the same type with the given nullability.
    pub fn with_nullability(&self, nullability: Nullability) -> Self {
        match self {
            Primitive(p, _) => Primitive(*p, nullability),
            Utf8(_) => Utf8(nullability),
            Binary(_) => Binary(nullability),
        }
    }

    /// Check whether `self` and `other` are equal, ignoring nullability.
    pub fn eq_ignore_nullability(&self, other: &Self) -> bool {
        self.with_nullability(Nullability::Nullable)
            == other.with_nullability(Nullability::Nullable)
    }

    /// Whether values of this type are fixed-width.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Primitive(..))
    }

    /// The physical type of a fixed-width column, if any.
    pub fn ptype(&self) -> Option<PType> {
        match self {
            Primitive(p, _) => Some(*p),
            _ => None,
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive(p, n) => write!(f, "{p}{n}"),
            Utf8(n) => write!(f, "utf8{n}"),
            Binary(n) => write!(f, "binary{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DType, Nullability, PType};

    #[test]
    fn display() {
        assert_eq!(
            DType::Primitive(PType::I32, Nullability::NonNullable).to_string(),
            "i32"
        );
        assert_eq!(DType::Utf8(Nullability::Nullable).to_string(), "utf8?");
    }

    #[test]
    fn nullability_round_trip() {
        let dtype = DType::Binary(Nullability::NonNullable);
        assert!(!dtype.is_nullable());
        assert!(dtype.with_nullability(Nullability::Nullable).is_nullable());
        assert!(dtype.eq_ignore_nullability(&dtype.with_nullability(Nullability::Nullable)));
    }
}

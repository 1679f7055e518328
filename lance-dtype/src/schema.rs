use std::fmt::{Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use lance_error::{LanceResult, lance_bail};

use crate::DType;

/// A name for a field in a schema.
pub type FieldName = Arc<str>;
/// An ordered list of field names.
pub type FieldNames = Arc<[FieldName]>;

/// An ordered sequence of named, typed fields.
///
/// Field order is part of a schema's identity: the writer fixes it on the
/// first batch and every subsequent batch, and every read of the file, sees
/// the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schema {
    names: FieldNames,
    dtypes: Arc<[DType]>,
}

impl Schema {
    /// Create a schema from parallel lists of names and types.
    pub fn try_new(names: FieldNames, dtypes: Arc<[DType]>) -> LanceResult<Self> {
        if names.len() != dtypes.len() {
            lance_bail!(
                "schema has {} names but {} types",
                names.len(),
                dtypes.len()
            );
        }
        if let Some(dup) = names.iter().duplicates().next() {
            lance_bail!("duplicate field name {:?}", dup);
        }
        Ok(Self { names, dtypes })
    }

    /// The number of fields.
    pub fn field_count(&self) -> usize {
        self.names.len()
    }

    /// The ordered field names.
    pub fn names(&self) -> &FieldNames {
        &self.names
    }

    /// The ordered field types.
    pub fn dtypes(&self) -> &Arc<[DType]> {
        &self.dtypes
    }

    /// The name of the field at `index`.
    pub fn field_name(&self, index: usize) -> &FieldName {
        &self.names[index]
    }

    /// The type of the field at `index`.
    pub fn field_dtype(&self, index: usize) -> DType {
        self.dtypes[index]
    }

    /// Find a field's index by name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_ref() == name)
    }

    /// Iterate over `(name, dtype)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, DType)> + '_ {
        self.names.iter().zip_eq(self.dtypes.iter().copied())
    }

    /// Check that `other` is field-for-field identical to `self`, failing
    /// with a `SchemaMismatch` that names the first disagreement.
    pub fn ensure_matches(&self, other: &Schema) -> LanceResult<()> {
        if self.field_count() != other.field_count() {
            lance_bail!(
                SchemaMismatch: "expected {} fields, got {}",
                self.field_count(),
                other.field_count()
            );
        }
        for (idx, ((this_name, this_dtype), (that_name, that_dtype))) in
            self.iter().zip_eq(other.iter()).enumerate()
        {
            if this_name != that_name {
                lance_bail!(
                    SchemaMismatch: "field {}: expected name {:?}, got {:?}",
                    idx,
                    this_name,
                    that_name
                );
            }
            if this_dtype != that_dtype {
                lance_bail!(
                    SchemaMismatch: "field {} ({:?}): expected type {}, got {}",
                    idx,
                    this_name,
                    this_dtype,
                    that_dtype
                );
            }
        }
        Ok(())
    }
}

impl FromIterator<(FieldName, DType)> for Schema {
    fn from_iter<T: IntoIterator<Item = (FieldName, DType)>>(iter: T) -> Self {
        let (names, dtypes): (Vec<_>, Vec<_>) = iter.into_iter().unzip();
        Self {
            names: names.into(),
            dtypes: dtypes.into(),
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.iter()
                .map(|(name, dtype)| format!("{name}={dtype}"))
                .format(", ")
        )
    }
}

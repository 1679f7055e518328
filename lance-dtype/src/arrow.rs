//! Conversions between Lance logical types and Arrow schema types.
//!
//! The Arrow schema is the externally defined interchange convention at the
//! zero-copy boundary; the engine conforms to it rather than defining it.

use std::sync::Arc;

use arrow_schema::{DataType, Field as ArrowField, Schema as ArrowSchema};
use lance_error::{LanceError, LanceResult, lance_bail};

use crate::{DType, Nullability, PType, Schema};

impl TryFrom<&DataType> for PType {
    type Error = LanceError;

    fn try_from(value: &DataType) -> Result<Self, Self::Error> {
        Ok(match value {
            DataType::UInt8 => PType::U8,
            DataType::UInt16 => PType::U16,
            DataType::UInt32 => PType::U32,
            DataType::UInt64 => PType::U64,
            DataType::Int8 => PType::I8,
            DataType::Int16 => PType::I16,
            DataType::Int32 => PType::I32,
            DataType::Int64 => PType::I64,
            DataType::Float32 => PType::F32,
            DataType::Float64 => PType::F64,
            _ => lance_bail!(SchemaMismatch: "{} is not a supported primitive type", value),
        })
    }
}

impl From<PType> for DataType {
    fn from(value: PType) -> Self {
        match value {
            PType::U8 => DataType::UInt8,
            PType::U16 => DataType::UInt16,
            PType::U32 => DataType::UInt32,
            PType::U64 => DataType::UInt64,
            PType::I8 => DataType::Int8,
            PType::I16 => DataType::Int16,
            PType::I32 => DataType::Int32,
            PType::I64 => DataType::Int64,
            PType::F32 => DataType::Float32,
            PType::F64 => DataType::Float64,
        }
    }
}

impl DType {
    /// Build a Lance type from an Arrow data type and nullability flag.
    pub fn from_arrow(data_type: &DataType, nullable: bool) -> LanceResult<Self> {
        let nullability = Nullability::from(nullable);
        Ok(match data_type {
            DataType::Utf8 => DType::Utf8(nullability),
            DataType::Binary => DType::Binary(nullability),
            other => DType::Primitive(PType::try_from(other)?, nullability),
        })
    }

    /// The Arrow data type this logical type maps onto.
    pub fn to_arrow(&self) -> DataType {
        match self {
            DType::Primitive(ptype, _) => (*ptype).into(),
            DType::Utf8(_) => DataType::Utf8,
            DType::Binary(_) => DataType::Binary,
        }
    }
}

impl TryFrom<&ArrowSchema> for Schema {
    type Error = LanceError;

    fn try_from(value: &ArrowSchema) -> Result<Self, Self::Error> {
        value
            .fields()
            .iter()
            .map(|field| {
                Ok((
                    Arc::from(field.name().as_str()),
                    DType::from_arrow(field.data_type(), field.is_nullable())?,
                ))
            })
            .collect::<LanceResult<Vec<_>>>()
            .map(Schema::from_iter)
    }
}

impl From<&Schema> for ArrowSchema {
    fn from(value: &Schema) -> Self {
        ArrowSchema::new(
            value
                .iter()
                .map(|(name, dtype)| {
                    ArrowField::new(name.as_ref(), dtype.to_arrow(), dtype.is_nullable())
                })
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use arrow_schema::{DataType, Field as ArrowField, Schema as ArrowSchema};
    use lance_error::LanceError;

    use crate::{DType, Nullability, PType, Schema};

    #[test]
    fn schema_round_trip() {
        let arrow = ArrowSchema::new(vec![
            ArrowField::new("id", DataType::Int32, false),
            ArrowField::new("name", DataType::Utf8, true),
        ]);
        let schema = Schema::try_from(&arrow).unwrap();
        assert_eq!(
            schema.field_dtype(0),
            DType::Primitive(PType::I32, Nullability::NonNullable)
        );
        assert_eq!(schema.field_dtype(1), DType::Utf8(Nullability::Nullable));
        assert_eq!(ArrowSchema::from(&schema), arrow);
    }

    #[test]
    fn unsupported_arrow_type() {
        let arrow = ArrowSchema::new(vec![ArrowField::new("ts", DataType::Date32, false)]);
        assert!(matches!(
            Schema::try_from(&arrow),
            Err(LanceError::SchemaMismatch(_))
        ));
    }
}

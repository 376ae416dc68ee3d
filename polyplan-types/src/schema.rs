use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use polyplan_result::{Error, Result};

use crate::value::ValueType;

/// Field metadata key that flags the row-key column.
pub const KEY_META_KEY: &str = "polyplan.key";

/// Name given to the key column by [`key_field`].
pub const KEY_COLUMN_NAME: &str = "key";

/// Build the canonical key field: `key: Int64`, non-nullable, flagged as key.
pub fn key_field() -> Field {
    Field::new(KEY_COLUMN_NAME, DataType::Int64, false).with_metadata(HashMap::from([(
        KEY_META_KEY.to_string(),
        "true".to_string(),
    )]))
}

/// Whether `field` carries the key flag in its metadata.
pub fn is_key_field(field: &Field) -> bool {
    field
        .metadata()
        .get(KEY_META_KEY)
        .is_some_and(|flag| flag.eq_ignore_ascii_case("true"))
}

/// Ordered field list of a record batch, with key-field awareness.
///
/// Field names are not required to be unique; tag-expanded columns may share a base
/// name. Uniqueness is enforced by resolution, not by this type.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSchema {
    schema: SchemaRef,
}

impl BatchSchema {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }

    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self::new(Arc::new(Schema::new(fields)))
    }

    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn field_count(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldRef> {
        self.schema.fields().get(index)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.field(index).map(|field| field.name().as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema.fields().iter().map(|field| field.name().as_str())
    }

    pub fn is_key(&self, index: usize) -> bool {
        self.field(index).is_some_and(|field| is_key_field(field))
    }

    /// Indices of every field flagged as key, in schema order.
    pub fn key_indices(&self) -> Vec<usize> {
        self.schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| is_key_field(field))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Index of the key field when the schema has exactly one.
    pub fn key_index(&self) -> Option<usize> {
        match self.key_indices().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn has_key(&self) -> bool {
        self.key_index().is_some()
    }

    /// Value type of the field at `index`.
    pub fn value_type(&self, index: usize) -> Result<ValueType> {
        let field = self.field(index).ok_or_else(|| {
            Error::Internal(format!(
                "field index {index} out of range for schema of {} fields",
                self.field_count()
            ))
        })?;
        ValueType::from_data_type(field.data_type())
    }

    /// Concatenate `self ‖ other`. Indices of `other` shift by `self.field_count()`.
    pub fn merge(&self, other: &BatchSchema) -> BatchSchema {
        let fields: Vec<FieldRef> = self
            .schema
            .fields()
            .iter()
            .chain(other.schema.fields().iter())
            .cloned()
            .collect();
        BatchSchema::new(Arc::new(Schema::new(fields)))
    }
}

impl From<SchemaRef> for BatchSchema {
    fn from(schema: SchemaRef) -> Self {
        Self::new(schema)
    }
}

impl From<Schema> for BatchSchema {
    fn from(schema: Schema) -> Self {
        Self::new(Arc::new(schema))
    }
}

impl fmt::Display for BatchSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, field) in self.schema.fields().iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name(), field.data_type())?;
            if is_key_field(field) {
                write!(f, " (key)")?;
            }
        }
        write!(f, "]")
    }
}

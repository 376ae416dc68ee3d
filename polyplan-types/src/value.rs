//! Scalar values with stable hashing semantics.
//!
//! Floats hash and compare by bit pattern so values can key hash maps (the literal
//! pool and `IN` sets both rely on this). `-0.0` and `0.0` are therefore distinct
//! values here; numeric comparison semantics live in the evaluator.

use std::fmt;
use std::hash::{Hash, Hasher};

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, LargeBinaryArray, LargeStringArray, StringArray,
};
use arrow::datatypes::DataType;
use polyplan_result::{Error, Result};

/// Logical type tag of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    Binary,
}

impl ValueType {
    /// Map an Arrow data type onto the value type used for literal and set matching.
    pub fn from_data_type(data_type: &DataType) -> Result<Self> {
        match data_type {
            DataType::Boolean => Ok(ValueType::Boolean),
            DataType::Int32 => Ok(ValueType::Integer),
            DataType::Int64 => Ok(ValueType::Long),
            DataType::Float32 => Ok(ValueType::Float),
            DataType::Float64 => Ok(ValueType::Double),
            DataType::Binary
            | DataType::LargeBinary
            | DataType::Utf8
            | DataType::LargeUtf8 => Ok(ValueType::Binary),
            other => Err(Error::unsupported(format_args!(
                "data type {other} has no value type mapping"
            ))),
        }
    }

    /// Canonical Arrow data type for this value type.
    pub fn data_type(&self) -> DataType {
        match self {
            ValueType::Boolean => DataType::Boolean,
            ValueType::Integer => DataType::Int32,
            ValueType::Long => DataType::Int64,
            ValueType::Float => DataType::Float32,
            ValueType::Double => DataType::Float64,
            ValueType::Binary => DataType::Binary,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueType::Boolean | ValueType::Binary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::Integer => "INTEGER",
            ValueType::Long => "LONG",
            ValueType::Float => "FLOAT",
            ValueType::Double => "DOUBLE",
            ValueType::Binary => "BINARY",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-null scalar value.
#[derive(Clone, Debug)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Binary(Vec<u8>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Binary(_) => ValueType::Binary,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Value::Binary(_))
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Integral view of the value, if it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Binary(a), Value::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Binary(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Binary(v) => write!(f, "'{}'", String::from_utf8_lossy(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Binary(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Binary(v.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

macro_rules! downcast {
    ($array:expr, $ty:ty, $name:literal) => {
        $array.as_any().downcast_ref::<$ty>().ok_or_else(|| {
            Error::Internal(concat!("expected ", $name, " array when reading value").into())
        })?
    };
}

/// Read one cell of an Arrow array as a [`Value`]. NULL cells read as `None`.
pub fn read_value(array: &ArrayRef, row: usize) -> Result<Option<Value>> {
    if array.is_null(row) {
        return Ok(None);
    }
    let value = match array.data_type() {
        DataType::Boolean => Value::Boolean(downcast!(array, BooleanArray, "BOOLEAN").value(row)),
        DataType::Int32 => Value::Integer(downcast!(array, Int32Array, "INT32").value(row)),
        DataType::Int64 => Value::Long(downcast!(array, Int64Array, "INT64").value(row)),
        DataType::Float32 => Value::Float(downcast!(array, Float32Array, "FLOAT32").value(row)),
        DataType::Float64 => Value::Double(downcast!(array, Float64Array, "FLOAT64").value(row)),
        DataType::Binary => {
            Value::Binary(downcast!(array, BinaryArray, "BINARY").value(row).to_vec())
        }
        DataType::LargeBinary => Value::Binary(
            downcast!(array, LargeBinaryArray, "LARGE BINARY")
                .value(row)
                .to_vec(),
        ),
        DataType::Utf8 => Value::from(downcast!(array, StringArray, "UTF8").value(row)),
        DataType::LargeUtf8 => {
            Value::from(downcast!(array, LargeStringArray, "LARGE UTF8").value(row))
        }
        other => {
            return Err(Error::unsupported(format_args!(
                "cannot read values of type {other}"
            )));
        }
    };
    Ok(Some(value))
}

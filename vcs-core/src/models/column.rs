use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};

use crate::errors::{VcsError, VcsResult};

///
/// Storage kind of a table or field column. String and array kinds carry
/// their fixed width.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    String(usize),
    Long,
    Float,
    Double,
    Bool,
    LongArray(usize),
    FloatArray(usize),
    DoubleArray(usize),
    BoolArray(usize),
}

impl ColumnKind {
    /// Value used for columns a record leaves out.
    pub fn default_value(&self) -> Value {
        match *self {
            ColumnKind::String(_) => Value::Str(String::new()),
            ColumnKind::Long => Value::Long(0),
            ColumnKind::Float => Value::Float(0.0),
            ColumnKind::Double => Value::Double(0.0),
            ColumnKind::Bool => Value::Bool(false),
            ColumnKind::LongArray(n) => Value::LongArray(vec![0; n]),
            ColumnKind::FloatArray(n) => Value::FloatArray(vec![0.0; n]),
            ColumnKind::DoubleArray(n) => Value::DoubleArray(vec![0.0; n]),
            ColumnKind::BoolArray(n) => Value::BoolArray(vec![false; n]),
        }
    }

    ///
    /// Check that `value` can be stored in a column of this kind.
    ///
    /// Integers are accepted by floating point columns; the returned value
    /// is converted accordingly.
    ///
    pub fn coerce(&self, column: &str, value: Value) -> VcsResult<Value> {
        let mismatch = |v: &Value| {
            VcsError::SchemaMismatch(format!(
                "Column {} of kind {} cannot hold {}",
                column, self, v
            ))
        };
        match (*self, value) {
            (ColumnKind::String(len), Value::Str(s)) => {
                if s.len() > len {
                    return Err(VcsError::SchemaMismatch(format!(
                        "Value of column {} is {} bytes wide, limit is {}",
                        column,
                        s.len(),
                        len
                    )));
                }
                Ok(Value::Str(s))
            }
            (ColumnKind::Long, Value::Long(v)) => Ok(Value::Long(v)),
            (ColumnKind::Float, Value::Float(v)) => Ok(Value::Float(v)),
            (ColumnKind::Float, Value::Long(v)) => Ok(Value::Float(v as f32)),
            (ColumnKind::Double, Value::Double(v)) => Ok(Value::Double(v)),
            (ColumnKind::Double, Value::Float(v)) => Ok(Value::Double(v as f64)),
            (ColumnKind::Double, Value::Long(v)) => Ok(Value::Double(v as f64)),
            (ColumnKind::Bool, Value::Bool(v)) => Ok(Value::Bool(v)),
            (ColumnKind::LongArray(n), Value::LongArray(v)) if v.len() == n => {
                Ok(Value::LongArray(v))
            }
            (ColumnKind::FloatArray(n), Value::FloatArray(v)) if v.len() == n => {
                Ok(Value::FloatArray(v))
            }
            (ColumnKind::DoubleArray(n), Value::DoubleArray(v)) if v.len() == n => {
                Ok(Value::DoubleArray(v))
            }
            (ColumnKind::BoolArray(n), Value::BoolArray(v)) if v.len() == n => {
                Ok(Value::BoolArray(v))
            }
            (_, other) => Err(mismatch(&other)),
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::String(n) => write!(f, "string({})", n),
            ColumnKind::Long => write!(f, "long"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Double => write!(f, "double"),
            ColumnKind::Bool => write!(f, "bool"),
            ColumnKind::LongArray(n) => write!(f, "long_array({})", n),
            ColumnKind::FloatArray(n) => write!(f, "float_array({})", n),
            ColumnKind::DoubleArray(n) => write!(f, "double_array({})", n),
            ColumnKind::BoolArray(n) => write!(f, "bool_array({})", n),
        }
    }
}

///
/// One column declaration: kind, name and a free text description.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub kind: ColumnKind,
    pub name: String,
    pub descr: String,
}

impl Column {
    pub fn new(kind: ColumnKind, name: &str, descr: &str) -> Self {
        Column {
            kind,
            name: name.to_string(),
            descr: descr.to_string(),
        }
    }
}

///
/// A typed cell.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    BoolArray(Vec<bool>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float_array(&self) -> Option<&[f32]> {
        match self {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    ///
    /// Ordering used by selector comparisons. Numbers compare across integer
    /// and floating point kinds; anything else only compares with its own
    /// kind. `None` means the two values are not comparable.
    ///
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    ///
    /// Bitwise equality: floats compare by their bit pattern so that a row
    /// always equals its own copy, NaN included.
    ///
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::FloatArray(a), Value::FloatArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Value::DoubleArray(a), Value::DoubleArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (a, b) => a == b,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::LongArray(v) => write!(f, "{:?}", v),
            Value::FloatArray(v) => write!(f, "{:?}", v),
            Value::DoubleArray(v) => write!(f, "{:?}", v),
            Value::BoolArray(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_string_width_is_enforced() {
        let kind = ColumnKind::String(4);
        assert!(kind.coerce("label", Value::from("abcd")).is_ok());
        assert!(matches!(
            kind.coerce("label", Value::from("abcde")),
            Err(VcsError::SchemaMismatch(_))
        ));
    }

    #[rstest]
    fn test_array_length_is_enforced() {
        let kind = ColumnKind::FloatArray(2);
        assert!(kind.coerce("p", Value::FloatArray(vec![0.5, 0.5])).is_ok());
        assert!(kind.coerce("p", Value::FloatArray(vec![0.5])).is_err());
    }

    #[rstest]
    fn test_numeric_widening() {
        assert_eq!(
            ColumnKind::Double.coerce("x", Value::Long(3)).unwrap(),
            Value::Double(3.0)
        );
        assert!(ColumnKind::Long.coerce("x", Value::Double(3.0)).is_err());
    }

    #[rstest]
    fn test_compare_across_numeric_kinds() {
        assert_eq!(
            Value::Long(2).compare(&Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("a").compare(&Value::Long(1)), None);
    }

    #[rstest]
    fn test_identical_nan() {
        let a = Value::Double(f64::NAN);
        assert!(a.identical(&a.clone()));
        assert!(a != a.clone());
    }

    #[rstest]
    fn test_kind_serde_shape() {
        let json = serde_json::to_string(&ColumnKind::String(34)).unwrap();
        assert_eq!(json, r#"{"string":34}"#);
        let back: ColumnKind = serde_json::from_str(r#""long""#).unwrap();
        assert_eq!(back, ColumnKind::Long);
    }
}

use std::fmt;

use super::array::Array;
use super::select::Selection;
use crate::compiler::VarId;
use crate::error::{Error, Result};

/// Data-stack entry
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Array value
    Array(Array),
    /// Print text
    Text(String),
    /// Storage handle of a variable (lvalue use)
    Ref(VarId),
    /// Evaluated indexer of an lvalue
    Selection(Selection),
    /// Collected event arguments
    Tuple(Vec<Array>),
}

impl Value {
    /// Returns the array or fails with the actual kind
    pub fn into_array(self) -> Result<Array> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(Error::type_error(format!(
                "expected an array on the data stack, found {}",
                other.type_name()
            ))),
        }
    }

    /// Kind of value, for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Array(_) => "array",
            Value::Text(_) => "text",
            Value::Ref(_) => "reference",
            Value::Selection(_) => "selection",
            Value::Tuple(_) => "tuple",
        }
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Array(a) => write!(f, "{}", a),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Ref(v) => write!(f, "&{}", v),
            Value::Selection(s) => write!(f, "{}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, val) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, ")")
            }
        }
    }
}

//! # VectorL type and shape algebra
//!
//! VectorL has four scalar types, totally ordered by promotion rank:
//!
//! ```text
//! bool < int < real < time
//! ```
//!
//! Promotion of two types is the higher-ranked one, and a value may be
//! auto-cast to any type of equal or higher rank. Every value is a dense
//! array of a static [`Shape`]; the empty shape is a scalar.
//!
//! ```
//! use vectorl::types::{Shape, Type};
//!
//! assert_eq!(Type::Int.promote(Type::Real), Type::Real);
//! assert!(Type::Bool.auto_castable(Type::Time));
//! assert!(!Type::Real.auto_castable(Type::Int));
//!
//! let s = vectorl::types::broadcast_shape(&[&Shape::new(vec![3, 1]), &Shape::new(vec![4])]).unwrap();
//! assert_eq!(s, Shape::new(vec![3, 4]));
//! ```

mod shape;

pub use shape::{broadcast_shape, broadcastable_into, Shape, MAX_CELLS};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Real,
    /// Simulated time, stored as a 64-bit float
    Time,
}

/// Canonical storage for a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// `bool` cells
    Bool,
    /// `i64` cells
    Int64,
    /// `f64` cells
    Float64,
}

impl Type {
    /// All types, in rank order
    pub const ALL: [Type; 4] = [Type::Bool, Type::Int, Type::Real, Type::Time];

    /// Promotion rank
    pub fn rank(self) -> u8 {
        match self {
            Type::Bool => 1,
            Type::Int => 2,
            Type::Real => 3,
            Type::Time => 4,
        }
    }

    /// Higher-ranked of the two types
    pub fn promote(self, other: Type) -> Type {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Promotion of a non-empty list of types
    pub fn promote_all(types: impl IntoIterator<Item = Type>) -> Option<Type> {
        types.into_iter().reduce(Type::promote)
    }

    /// Implicit widening check
    pub fn auto_castable(self, to: Type) -> bool {
        self.rank() <= to.rank()
    }

    /// Type for a reserved type name
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "bool" => Some(Type::Bool),
            "int" => Some(Type::Int),
            "real" => Some(Type::Real),
            "time" => Some(Type::Time),
            _ => None,
        }
    }

    /// Source name of the type
    pub fn name(self) -> &'static str {
        match self {
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Real => "real",
            Type::Time => "time",
        }
    }

    /// Storage dtype
    pub fn dtype(self) -> DType {
        match self {
            Type::Bool => DType::Bool,
            Type::Int => DType::Int64,
            Type::Real | Type::Time => DType::Float64,
        }
    }

    /// bool or int
    pub fn is_integral(self) -> bool {
        matches!(self, Type::Bool | Type::Int)
    }

    /// real or time
    pub fn is_floating(self) -> bool {
        matches!(self, Type::Real | Type::Time)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

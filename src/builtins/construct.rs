//! Array constructors: `range` and `fill`

use super::{const_int, const_int_vector, expect_arity, Builtin, Signature};
use crate::compiler::ExprRef;
use crate::error::{Error, Result};
use crate::runtime::{Array, Scalar};
use crate::types::{broadcastable_into, Shape, Type};

fn dims_of(values: &[i64], scalar: bool) -> Result<Shape> {
    if let Some(bad) = values.iter().find(|&&d| d < 0) {
        return Err(Error::shape(format!("negative dimension {}", bad)));
    }
    let dims: Vec<usize> = values.iter().map(|&d| d as usize).collect();
    let shape = if scalar {
        Shape::vector(dims[0])
    } else {
        Shape::new(dims)
    };
    shape.validated()
}

/// `range(n)` is the int vector `[0 1 ... n-1]`
pub struct RangeBuiltin;

impl Builtin for RangeBuiltin {
    fn name(&self) -> &str {
        "range"
    }

    fn description(&self) -> &str {
        "Int vector 0..n"
    }

    fn arity(&self) -> usize {
        1
    }

    fn infer(&self, args: &[ExprRef]) -> Result<Signature> {
        let shape = match const_int(self.name(), "length", &args[0])? {
            Some(n) => Some(dims_of(&[n], true)?),
            None => None,
        };
        let constant = shape.as_ref().map(|_| true);
        Ok(Signature {
            ty: Type::Int,
            shape,
            constant,
        })
    }

    fn execute(&self, args: &[Array]) -> Result<Array> {
        expect_arity(self, args)?;
        let n = args[0]
            .as_scalar()
            .ok_or_else(|| Error::type_error("range() length must be a scalar"))?
            .as_i64();
        let shape = dims_of(&[n], true)?;
        Ok(Array::int_vector((0..shape.size() as i64).collect()))
    }
}

/// `fill(shape, value)` broadcasts `value` to a constant shape
///
/// A scalar `shape` of `n` means `(n,)`.
pub struct FillBuiltin;

impl Builtin for FillBuiltin {
    fn name(&self) -> &str {
        "fill"
    }

    fn description(&self) -> &str {
        "Array of a constant shape filled with a value"
    }

    fn arity(&self) -> usize {
        2
    }

    fn infer(&self, args: &[ExprRef]) -> Result<Signature> {
        let scalar = args[0].shape.as_ref().map_or(false, Shape::is_scalar);
        let shape = match const_int_vector(self.name(), "shape", &args[0])? {
            Some(values) => Some(dims_of(&values, scalar)?),
            None => None,
        };
        if let (Some(shape), Some(value)) = (&shape, &args[1].shape) {
            if !broadcastable_into(shape, value) {
                return Err(Error::shape(format!(
                    "fill value of shape {} does not broadcast into {}",
                    value, shape
                )));
            }
        }
        let constant = shape.as_ref().and(args[1].constant);
        Ok(Signature {
            ty: args[1].ty,
            shape,
            constant,
        })
    }

    fn execute(&self, args: &[Array]) -> Result<Array> {
        expect_arity(self, args)?;
        let shape = dims_of(&args[0].to_i64_vec(), args[0].shape().is_scalar())?;
        args[1].broadcast_to(&shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        let r = RangeBuiltin.execute(&[Array::int(4)]).unwrap();
        assert_eq!(r.to_i64_vec(), vec![0, 1, 2, 3]);
        let empty = RangeBuiltin.execute(&[Array::int(0)]).unwrap();
        assert!(empty.is_empty());
        assert!(RangeBuiltin.execute(&[Array::int(-1)]).is_err());
    }

    #[test]
    fn test_fill() {
        let r = FillBuiltin
            .execute(&[Array::int_vector(vec![2, 2]), Array::real(0.5)])
            .unwrap();
        assert_eq!(r.shape(), &Shape::new(vec![2, 2]));
        assert_eq!(r.ty(), Type::Real);
        assert_eq!(r.to_f64_vec(), vec![0.5; 4]);

        let row = Array::from_scalars(Type::Bool, Shape::vector(2), [true, false].map(Scalar::Bool)).unwrap();
        let r = FillBuiltin.execute(&[Array::int_vector(vec![3, 2]), row]).unwrap();
        assert_eq!(r.to_bool_vec(), vec![true, false, true, false, true, false]);

        let r = FillBuiltin.execute(&[Array::int(3), Array::int(7)]).unwrap();
        assert_eq!(r.to_i64_vec(), vec![7, 7, 7]);
    }
}

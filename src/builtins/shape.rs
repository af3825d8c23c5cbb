//! Shape builtins: `shapeof` and `transpose`

use super::{const_int_vector, expect_arity, Builtin, Signature};
use crate::compiler::ExprRef;
use crate::error::{Error, Result};
use crate::runtime::Array;
use crate::types::{Shape, Type};

fn shape_vector(shape: &Shape) -> Array {
    Array::int_vector(shape.dims().iter().map(|&d| d as i64).collect())
}

/// Returns the shape of the operand as an int vector
///
/// Usage: `shapeof(x) -> int[rank(x)]`
/// Example: `shapeof([[1,2,3],[4,5,6]])` is `[2 3]`
pub struct ShapeofBuiltin;

impl Builtin for ShapeofBuiltin {
    fn name(&self) -> &str {
        "shapeof"
    }

    fn description(&self) -> &str {
        "Shape of the operand"
    }

    fn arity(&self) -> usize {
        1
    }

    fn infer(&self, args: &[ExprRef]) -> Result<Signature> {
        let shape = args[0].shape.as_ref().map(|s| Shape::vector(s.rank()));
        let constant = shape.as_ref().map(|_| true);
        Ok(Signature {
            ty: Type::Int,
            shape,
            constant,
        })
    }

    // the shape is static even when the operand is not
    fn const_value(&self, args: &[ExprRef]) -> Option<Array> {
        args[0].shape.as_ref().map(shape_vector)
    }

    fn execute(&self, args: &[Array]) -> Result<Array> {
        expect_arity(self, args)?;
        Ok(shape_vector(args[0].shape()))
    }
}

/// Permutes the axes of an array
///
/// Usage: `transpose(x, axes)` where `axes` is a constant permutation of
/// `range(rank(x))`
pub struct TransposeBuiltin;

fn check_permutation(axes: &[i64], rank: usize) -> Result<Vec<usize>> {
    let mut seen = vec![false; rank];
    let mut perm = Vec::with_capacity(rank);
    if axes.len() != rank {
        return Err(Error::shape(format!(
            "transpose axes {:?} do not match rank {}",
            axes, rank
        )));
    }
    for &axis in axes {
        if axis < 0 || axis as usize >= rank || seen[axis as usize] {
            return Err(Error::shape(format!(
                "transpose axes {:?} are not a permutation of 0..{}",
                axes, rank
            )));
        }
        seen[axis as usize] = true;
        perm.push(axis as usize);
    }
    Ok(perm)
}

fn permuted(shape: &Shape, perm: &[usize]) -> Shape {
    Shape::new(perm.iter().map(|&p| shape.dims()[p]).collect())
}

impl Builtin for TransposeBuiltin {
    fn name(&self) -> &str {
        "transpose"
    }

    fn description(&self) -> &str {
        "Permute array axes"
    }

    fn arity(&self) -> usize {
        2
    }

    fn infer(&self, args: &[ExprRef]) -> Result<Signature> {
        let axes = const_int_vector(self.name(), "axes", &args[1])?;
        let shape = match (&args[0].shape, axes) {
            (Some(shape), Some(axes)) => Some(permuted(shape, &check_permutation(&axes, shape.rank())?)),
            _ => None,
        };
        Ok(Signature {
            ty: args[0].ty,
            shape,
            constant: args[0].constant,
        })
    }

    fn execute(&self, args: &[Array]) -> Result<Array> {
        expect_arity(self, args)?;
        let input = &args[0];
        let perm = check_permutation(&args[1].to_i64_vec(), input.shape().rank())?;
        let out = permuted(input.shape(), &perm);
        let strides = input.shape().strides();
        let offsets: Vec<usize> = (0..out.size())
            .map(|flat| {
                out.unravel(flat)
                    .iter()
                    .zip(&perm)
                    .map(|(&i, &axis)| i * strides[axis])
                    .sum()
            })
            .collect();
        Ok(input.take(&offsets, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Scalar;

    fn arange(dims: &[usize]) -> Array {
        let shape = Shape::new(dims.to_vec());
        let n = shape.size() as i64;
        Array::from_scalars(Type::Int, shape, (0..n).map(Scalar::Int)).unwrap()
    }

    #[test]
    fn test_shapeof() {
        let r = ShapeofBuiltin.execute(&[arange(&[2, 3])]).unwrap();
        assert_eq!(r.to_i64_vec(), vec![2, 3]);
        let r = ShapeofBuiltin.execute(&[Array::int(1)]).unwrap();
        assert_eq!(r.shape(), &Shape::vector(0));
    }

    #[test]
    fn test_transpose() {
        let r = TransposeBuiltin
            .execute(&[arange(&[2, 3]), Array::int_vector(vec![1, 0])])
            .unwrap();
        assert_eq!(r.shape(), &Shape::new(vec![3, 2]));
        assert_eq!(r.to_i64_vec(), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_transpose_rejects_bad_permutation() {
        assert!(check_permutation(&[0, 0], 2).is_err());
        assert!(check_permutation(&[0], 2).is_err());
        assert!(check_permutation(&[2, 0], 2).is_err());
        assert_eq!(check_permutation(&[2, 0, 1], 3).unwrap(), vec![2, 0, 1]);
    }
}

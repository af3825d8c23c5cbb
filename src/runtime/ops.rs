//! Operator implementations
//!
//! The same functions compute constant folds during elaboration and values
//! during execution, so the result type rules live here too.

use super::array::{Array, Scalar};
use crate::error::{Error, Result};
use crate::parser::{BinaryOp, UnaryOp};
use crate::types::{broadcast_shape, Shape, Type};

/// Result type of a unary operator
pub fn unary_result_type(op: UnaryOp, ty: Type) -> Result<Type> {
    match op {
        UnaryOp::Neg => Ok(ty.promote(Type::Int)),
        UnaryOp::Not => Ok(Type::Bool),
        UnaryOp::Invert => {
            if ty.is_integral() {
                Ok(ty)
            } else {
                Err(Error::type_error(format!(
                    "operator '~' is not defined for {}",
                    ty
                )))
            }
        }
    }
}

/// Result type of a binary operator
pub fn binary_result_type(op: BinaryOp, left: Type, right: Type) -> Result<Type> {
    use BinaryOp::*;
    let common = left.promote(right);
    match op {
        Add | Mul => Ok(common),
        Sub | Mod => Ok(common.promote(Type::Int)),
        Div => Ok(common.promote(Type::Real)),
        Shl | Shr | BitAnd | BitOr | BitXor => {
            if !(left.is_integral() && right.is_integral()) {
                return Err(Error::type_error(format!(
                    "operator '{}' is not defined for {} and {}",
                    op, left, right
                )));
            }
            Ok(if matches!(op, Shl | Shr) {
                Type::Int
            } else {
                common
            })
        }
        Eq | Ne | Lt | Le | Gt | Ge | And | Or => Ok(Type::Bool),
    }
}

/// Type in which the operands of a binary operator are combined
fn compute_type(op: BinaryOp, left: Type, right: Type) -> Result<Type> {
    use BinaryOp::*;
    match op {
        Eq | Ne | Lt | Le | Gt | Ge => Ok(left.promote(right)),
        And | Or => Ok(Type::Bool),
        _ => binary_result_type(op, left, right),
    }
}

fn int_op(op: BinaryOp, x: i64, y: i64) -> Scalar {
    use BinaryOp::*;
    match op {
        Add => Scalar::Int(x.wrapping_add(y)),
        Sub => Scalar::Int(x.wrapping_sub(y)),
        Mul => Scalar::Int(x.wrapping_mul(y)),
        Mod => {
            if y == 0 {
                Scalar::Int(0)
            } else {
                let r = x.wrapping_rem(y);
                Scalar::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r })
            }
        }
        Shl => Scalar::Int(if (0..64).contains(&y) { x.wrapping_shl(y as u32) } else { 0 }),
        Shr => Scalar::Int(if y < 0 {
            0
        } else if y >= 64 {
            if x < 0 {
                -1
            } else {
                0
            }
        } else {
            x >> y
        }),
        BitAnd => Scalar::Int(x & y),
        BitOr => Scalar::Int(x | y),
        BitXor => Scalar::Int(x ^ y),
        Eq => Scalar::Bool(x == y),
        Ne => Scalar::Bool(x != y),
        Lt => Scalar::Bool(x < y),
        Le => Scalar::Bool(x <= y),
        Gt => Scalar::Bool(x > y),
        Ge => Scalar::Bool(x >= y),
        And => Scalar::Bool(x != 0 && y != 0),
        Or => Scalar::Bool(x != 0 || y != 0),
        Div => Scalar::Real(x as f64 / y as f64),
    }
}

fn real_op(op: BinaryOp, x: f64, y: f64) -> Scalar {
    use BinaryOp::*;
    match op {
        Add => Scalar::Real(x + y),
        Sub => Scalar::Real(x - y),
        Mul => Scalar::Real(x * y),
        Div => Scalar::Real(x / y),
        Mod => {
            if y == 0.0 {
                Scalar::Real(f64::NAN)
            } else {
                let r = x % y;
                Scalar::Real(if r != 0.0 && ((r < 0.0) != (y < 0.0)) { r + y } else { r })
            }
        }
        Eq => Scalar::Bool(x == y),
        Ne => Scalar::Bool(x != y),
        Lt => Scalar::Bool(x < y),
        Le => Scalar::Bool(x <= y),
        Gt => Scalar::Bool(x > y),
        Ge => Scalar::Bool(x >= y),
        And => Scalar::Bool(x != 0.0 && y != 0.0),
        Or => Scalar::Bool(x != 0.0 || y != 0.0),
        // integral-only operators never reach the float domain
        Shl | Shr | BitAnd | BitOr | BitXor => Scalar::Real(f64::NAN),
    }
}

fn bool_op(op: BinaryOp, x: bool, y: bool) -> Scalar {
    use BinaryOp::*;
    match op {
        Add | Or | BitOr => Scalar::Bool(x || y),
        Mul | And | BitAnd => Scalar::Bool(x && y),
        BitXor | Ne => Scalar::Bool(x != y),
        Eq => Scalar::Bool(x == y),
        Lt => Scalar::Bool(!x & y),
        Le => Scalar::Bool(x <= y),
        Gt => Scalar::Bool(x & !y),
        Ge => Scalar::Bool(x >= y),
        Sub | Mod | Div | Shl | Shr => int_op(op, x as i64, y as i64),
    }
}

/// Applies a binary operator with broadcasting
pub fn binary(op: BinaryOp, left: &Array, right: &Array) -> Result<Array> {
    let out = binary_result_type(op, left.ty(), right.ty())?;
    let domain = compute_type(op, left.ty(), right.ty())?;
    let l = left.cast(domain);
    let r = right.cast(domain);
    l.zip_map(&r, out, |x, y| match (x, y) {
        (Scalar::Bool(a), Scalar::Bool(b)) => bool_op(op, a, b),
        (Scalar::Int(a), Scalar::Int(b)) => int_op(op, a, b),
        (a, b) => real_op(op, a.as_f64(), b.as_f64()),
    })
}

/// Applies a unary operator
pub fn unary(op: UnaryOp, arg: &Array) -> Result<Array> {
    let out = unary_result_type(op, arg.ty())?;
    Ok(match op {
        UnaryOp::Neg => arg.cast(out).map(out, |x| match x {
            Scalar::Int(i) => Scalar::Int(i.wrapping_neg()),
            other => Scalar::Real(-other.as_f64()),
        }),
        UnaryOp::Not => arg.map(Type::Bool, |x| Scalar::Bool(!x.as_bool())),
        UnaryOp::Invert => arg.map(out, |x| match x {
            Scalar::Bool(b) => Scalar::Bool(!b),
            other => Scalar::Int(!other.as_i64()),
        }),
    })
}

/// Explicit conversion
pub fn cast(ty: Type, arg: &Array) -> Array {
    arg.cast(ty)
}

/// Result type of `c ? a : b`
pub fn cond_result_type(cond: Type, yes: Type, no: Type) -> Result<Type> {
    if cond != Type::Bool {
        return Err(Error::type_error(format!(
            "condition of '?:' must be bool, got {}",
            cond
        )));
    }
    Ok(yes.promote(no))
}

/// Cell-wise selection between two arrays
pub fn cond(c: &Array, yes: &Array, no: &Array) -> Result<Array> {
    let ty = cond_result_type(c.ty(), yes.ty(), no.ty())?;
    let shape = broadcast_shape(&[c.shape(), yes.shape(), no.shape()])?;
    let c = c.broadcast_to(&shape)?;
    let yes = yes.cast(ty).broadcast_to(&shape)?;
    let no = no.cast(ty).broadcast_to(&shape)?;
    Array::from_scalars(
        ty,
        shape,
        c.cells()
            .zip(yes.cells().zip(no.cells()))
            .map(|(k, (a, b))| if k.as_bool() { a } else { b }),
    )
}

/// Stacks equally shaped arrays along a new leading axis
pub fn stack(ty: Type, items: &[Array]) -> Result<Array> {
    let inner = match items.first() {
        Some(first) => first.shape().clone(),
        None => Shape::scalar(),
    };
    if let Some(bad) = items.iter().find(|a| a.shape() != &inner) {
        return Err(Error::shape(format!(
            "array elements have different shapes {} and {}",
            inner,
            bad.shape()
        )));
    }
    Array::from_scalars(
        ty,
        inner.prepend(items.len()).validated()?,
        items.iter().flat_map(|a| a.cells().collect::<Vec<_>>()),
    )
}

/// Shape of a concatenation along axis 0
pub fn concat_shape(shapes: &[&Shape]) -> Result<Shape> {
    let mut total = 0;
    let mut tails = Vec::with_capacity(shapes.len());
    for shape in shapes {
        if shape.is_scalar() {
            return Err(Error::shape("cannot concatenate scalars"));
        }
        total = usize::checked_add(total, shape.dims()[0])
            .ok_or_else(|| Error::shape("concatenation is too large"))?;
        tails.push(Shape::new(shape.dims()[1..].to_vec()));
    }
    let refs: Vec<&Shape> = tails.iter().collect();
    broadcast_shape(&refs)?.prepend(total).validated()
}

/// Concatenates along axis 0, broadcasting trailing axes
pub fn concat(ty: Type, items: &[Array]) -> Result<Array> {
    let shapes: Vec<&Shape> = items.iter().map(|a| a.shape()).collect();
    let shape = concat_shape(&shapes)?;
    let tail = Shape::new(shape.dims()[1..].to_vec());
    let mut cells = Vec::with_capacity(shape.size());
    for item in items {
        let target = tail.prepend(item.shape().dims()[0]);
        let part = item.cast(ty).broadcast_to(&target)?;
        cells.extend(part.cells());
    }
    Array::from_scalars(ty, shape, cells)
}

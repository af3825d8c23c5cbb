//! Reductions along one constant axis

use super::{const_int, expect_arity, Builtin, Signature};
use crate::compiler::ExprRef;
use crate::error::{Error, Result};
use crate::runtime::{Array, Scalar};
use crate::types::Type;

/// Reduction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of the cells
    Sum,
    /// Product of the cells
    Product,
    /// Largest cell
    Maximum,
    /// Smallest cell
    Minimum,
}

impl Reduction {
    /// Every reduction
    pub const ALL: [Reduction; 4] = [
        Reduction::Sum,
        Reduction::Product,
        Reduction::Maximum,
        Reduction::Minimum,
    ];

    fn name(self) -> &'static str {
        match self {
            Reduction::Sum => "sum",
            Reduction::Product => "product",
            Reduction::Maximum => "maximum",
            Reduction::Minimum => "minimum",
        }
    }

    /// Sums and products of bools count, so they are int
    fn result_type(self, ty: Type) -> Type {
        match self {
            Reduction::Sum | Reduction::Product => ty.promote(Type::Int),
            Reduction::Maximum | Reduction::Minimum => ty,
        }
    }

    fn fold(self, ty: Type, cells: &[Scalar]) -> Result<Scalar> {
        if ty.is_floating() {
            let values = cells.iter().map(|c| c.as_f64());
            return Ok(Scalar::Real(match self {
                Reduction::Sum => values.sum(),
                Reduction::Product => values.product(),
                Reduction::Maximum => values.reduce(f64::max).ok_or_else(empty_axis)?,
                Reduction::Minimum => values.reduce(f64::min).ok_or_else(empty_axis)?,
            }));
        }
        let values = cells.iter().map(|c| c.as_i64());
        let folded = match self {
            Reduction::Sum => values.fold(0i64, i64::wrapping_add),
            Reduction::Product => values.fold(1i64, i64::wrapping_mul),
            Reduction::Maximum => values.max().ok_or_else(empty_axis)?,
            Reduction::Minimum => values.min().ok_or_else(empty_axis)?,
        };
        Ok(Scalar::Int(folded).cast(ty))
    }
}

fn empty_axis() -> Error {
    Error::shape("reduction over an empty axis has no identity")
}

/// `sum(x, axis)`, `product(x, axis)`, `maximum(x, axis)`, `minimum(x, axis)`
///
/// The axis must be a constant scalar int in `[-rank, rank)`; it is dropped
/// from the result shape.
pub struct ReductionBuiltin(pub Reduction);

impl Builtin for ReductionBuiltin {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        match self.0 {
            Reduction::Sum => "Sum along an axis",
            Reduction::Product => "Product along an axis",
            Reduction::Maximum => "Maximum along an axis",
            Reduction::Minimum => "Minimum along an axis",
        }
    }

    fn arity(&self) -> usize {
        2
    }

    fn infer(&self, args: &[ExprRef]) -> Result<Signature> {
        let axis = const_int(self.name(), "axis", &args[1])?;
        let shape = match (&args[0].shape, axis) {
            (Some(shape), Some(axis)) => {
                if shape.is_scalar() {
                    return Err(Error::shape(format!("cannot apply {}() to a scalar", self.name())));
                }
                Some(shape.without_axis(shape.normalize_axis(axis)?))
            }
            _ => None,
        };
        Ok(Signature {
            ty: self.0.result_type(args[0].ty),
            shape,
            constant: args[0].constant,
        })
    }

    fn execute(&self, args: &[Array]) -> Result<Array> {
        expect_arity(self, args)?;
        let input = &args[0];
        let shape = input.shape();
        let axis_value = args[1]
            .as_scalar()
            .ok_or_else(|| Error::type_error("reduction axis must be a scalar"))?
            .as_i64();
        let axis = shape.normalize_axis(axis_value)?;
        let out = shape.without_axis(axis);
        let ty = self.0.result_type(input.ty());

        let n = shape.dims()[axis];
        let stride = shape.strides()[axis];
        let mut cells = Vec::with_capacity(out.size());
        let mut lane = Vec::with_capacity(n);
        for flat in 0..out.size() {
            // offset of the first cell of this lane
            let mut idx = out.unravel(flat);
            idx.insert(axis, 0);
            let base: usize = idx.iter().zip(shape.strides()).map(|(i, s)| i * s).sum();
            lane.clear();
            lane.extend((0..n).map(|k| input.get(base + k * stride)));
            cells.push(self.0.fold(ty, &lane)?);
        }
        Array::from_scalars(ty, out, cells)
    }
}

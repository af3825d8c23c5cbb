//! Elementwise unary math
//!
//! One builtin per [`MathFn`]. All of them keep the operand shape and
//! constness; only the result type depends on the function.

use super::{expect_arity, Builtin, Signature};
use crate::compiler::ExprRef;
use crate::error::Result;
use crate::runtime::{Array, Scalar};
use crate::types::Type;

/// Elementwise math functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFn {
    Exp,
    Exp2,
    Log,
    Log2,
    Log10,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Sinh,
    Cosh,
    Tanh,
    Arcsinh,
    Arccosh,
    Arctanh,
    Deg2rad,
    Rad2deg,
    Isnan,
    Isinf,
    Floor,
    Ceil,
    Trunc,
    Absolute,
    Sign,
}

impl MathFn {
    /// Every math function, in registration order
    pub const ALL: [MathFn; 27] = [
        MathFn::Exp,
        MathFn::Exp2,
        MathFn::Log,
        MathFn::Log2,
        MathFn::Log10,
        MathFn::Sqrt,
        MathFn::Sin,
        MathFn::Cos,
        MathFn::Tan,
        MathFn::Arcsin,
        MathFn::Arccos,
        MathFn::Arctan,
        MathFn::Sinh,
        MathFn::Cosh,
        MathFn::Tanh,
        MathFn::Arcsinh,
        MathFn::Arccosh,
        MathFn::Arctanh,
        MathFn::Deg2rad,
        MathFn::Rad2deg,
        MathFn::Isnan,
        MathFn::Isinf,
        MathFn::Floor,
        MathFn::Ceil,
        MathFn::Trunc,
        MathFn::Absolute,
        MathFn::Sign,
    ];

    /// Source name
    pub fn name(self) -> &'static str {
        match self {
            MathFn::Exp => "exp",
            MathFn::Exp2 => "exp2",
            MathFn::Log => "log",
            MathFn::Log2 => "log2",
            MathFn::Log10 => "log10",
            MathFn::Sqrt => "sqrt",
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Arcsin => "arcsin",
            MathFn::Arccos => "arccos",
            MathFn::Arctan => "arctan",
            MathFn::Sinh => "sinh",
            MathFn::Cosh => "cosh",
            MathFn::Tanh => "tanh",
            MathFn::Arcsinh => "arcsinh",
            MathFn::Arccosh => "arccosh",
            MathFn::Arctanh => "arctanh",
            MathFn::Deg2rad => "deg2rad",
            MathFn::Rad2deg => "rad2deg",
            MathFn::Isnan => "isnan",
            MathFn::Isinf => "isinf",
            MathFn::Floor => "floor",
            MathFn::Ceil => "ceil",
            MathFn::Trunc => "trunc",
            MathFn::Absolute => "absolute",
            MathFn::Sign => "sign",
        }
    }

    /// Result type for an operand of type `ty`
    pub fn result_type(self, ty: Type) -> Type {
        match self {
            MathFn::Isnan | MathFn::Isinf => Type::Bool,
            MathFn::Floor | MathFn::Ceil | MathFn::Trunc | MathFn::Absolute => ty,
            MathFn::Sign => ty.promote(Type::Int),
            _ => ty.promote(Type::Real),
        }
    }

    fn float(self, x: f64) -> f64 {
        match self {
            MathFn::Exp => x.exp(),
            MathFn::Exp2 => x.exp2(),
            MathFn::Log => x.ln(),
            MathFn::Log2 => x.log2(),
            MathFn::Log10 => x.log10(),
            MathFn::Sqrt => x.sqrt(),
            MathFn::Sin => x.sin(),
            MathFn::Cos => x.cos(),
            MathFn::Tan => x.tan(),
            MathFn::Arcsin => x.asin(),
            MathFn::Arccos => x.acos(),
            MathFn::Arctan => x.atan(),
            MathFn::Sinh => x.sinh(),
            MathFn::Cosh => x.cosh(),
            MathFn::Tanh => x.tanh(),
            MathFn::Arcsinh => x.asinh(),
            MathFn::Arccosh => x.acosh(),
            MathFn::Arctanh => x.atanh(),
            MathFn::Deg2rad => x.to_radians(),
            MathFn::Rad2deg => x.to_degrees(),
            MathFn::Floor => x.floor(),
            MathFn::Ceil => x.ceil(),
            MathFn::Trunc => x.trunc(),
            MathFn::Absolute => x.abs(),
            // sign(0) is 0, NaN stays NaN
            MathFn::Sign => {
                if x == 0.0 || x.is_nan() {
                    x
                } else {
                    x.signum()
                }
            }
            MathFn::Isnan | MathFn::Isinf => x,
        }
    }

    fn apply(self, ty: Type, cell: Scalar) -> Scalar {
        match (self, cell) {
            (MathFn::Isnan, c) => Scalar::Bool(c.as_f64().is_nan()),
            (MathFn::Isinf, c) => Scalar::Bool(c.as_f64().is_infinite()),
            (MathFn::Floor | MathFn::Ceil | MathFn::Trunc, c @ (Scalar::Bool(_) | Scalar::Int(_))) => c,
            (MathFn::Absolute, Scalar::Int(i)) => Scalar::Int(i.wrapping_abs()),
            (MathFn::Absolute, c @ Scalar::Bool(_)) => c,
            (MathFn::Sign, Scalar::Int(i)) => Scalar::Int(i.signum()),
            (MathFn::Sign, Scalar::Bool(b)) => Scalar::Int(b as i64),
            (f, c) => Scalar::Real(f.float(c.as_f64())).cast(ty),
        }
    }
}

/// Elementwise math builtin
///
/// Usage: `sqrt(x)`, `isnan(x)`, ... on any shape
pub struct MathBuiltin(pub MathFn);

impl Builtin for MathBuiltin {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        match self.0 {
            MathFn::Isnan => "True where the operand is NaN",
            MathFn::Isinf => "True where the operand is infinite",
            MathFn::Floor | MathFn::Ceil | MathFn::Trunc => "Rounding",
            MathFn::Absolute | MathFn::Sign => "Magnitude and sign",
            _ => "Elementwise transcendental function",
        }
    }

    fn arity(&self) -> usize {
        1
    }

    fn infer(&self, args: &[ExprRef]) -> Result<Signature> {
        Ok(Signature {
            ty: self.0.result_type(args[0].ty),
            shape: args[0].shape.clone(),
            constant: args[0].constant,
        })
    }

    fn execute(&self, args: &[Array]) -> Result<Array> {
        expect_arity(self, args)?;
        let ty = self.0.result_type(args[0].ty());
        let func = self.0;
        Ok(args[0].map(ty, |cell| func.apply(ty, cell)))
    }
}

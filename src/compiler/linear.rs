//! Linear forms over integer expressions
//!
//! Used to prove that the length of a slice with variable bounds is
//! constant: `a[i+1 : i+3]` has `stop - start = 2` whatever `i` is.

use super::expr::{ExprKind, ExprRef};
use crate::parser::{BinaryOp, UnaryOp};
use crate::runtime::Array;
use crate::types::Type;

/// `constant + sum(coefficient * term)`; terms are merged by structural equality
#[derive(Debug, Clone, Default)]
pub struct LinearForm {
    constant: i64,
    terms: Vec<(ExprRef, i64)>,
}

impl LinearForm {
    /// Decomposes `expr` over `+`, `-` and unary `-`
    pub fn of(expr: &ExprRef) -> LinearForm {
        if let Some(cell) = expr.value.as_ref().and_then(Array::as_scalar) {
            if expr.ty.is_integral() {
                return LinearForm {
                    constant: cell.as_i64(),
                    terms: Vec::new(),
                };
            }
        }
        if expr.ty == Type::Int {
            match &expr.kind {
                ExprKind::Binary(BinaryOp::Add, l, r) => return LinearForm::of(l).plus(LinearForm::of(r), 1),
                ExprKind::Binary(BinaryOp::Sub, l, r) => return LinearForm::of(l).plus(LinearForm::of(r), -1),
                ExprKind::Unary(UnaryOp::Neg, a) => return LinearForm::default().plus(LinearForm::of(a), -1),
                _ => {}
            }
        }
        LinearForm {
            constant: 0,
            terms: vec![(expr.clone(), 1)],
        }
    }

    fn plus(mut self, other: LinearForm, sign: i64) -> LinearForm {
        self.constant = self.constant.wrapping_add(sign.wrapping_mul(other.constant));
        for (term, coefficient) in other.terms {
            self.add_term(term, sign * coefficient);
        }
        self
    }

    fn add_term(&mut self, term: ExprRef, coefficient: i64) {
        match self.terms.iter_mut().find(|(t, _)| t.structurally_equal(&term)) {
            Some(slot) => slot.1 += coefficient,
            None => self.terms.push((term, coefficient)),
        }
    }

    /// The value, when every term cancels
    pub fn as_constant(&self) -> Option<i64> {
        self.terms
            .iter()
            .all(|(_, c)| *c == 0)
            .then_some(self.constant)
    }
}

/// `a - b` when it does not depend on any variable
pub fn diff(a: &ExprRef, b: &ExprRef) -> Option<i64> {
    LinearForm::of(a).plus(LinearForm::of(b), -1).as_constant()
}

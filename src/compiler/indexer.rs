//! Static analysis of index expressions
//!
//! [`analyze`] checks a selector list against the shape of the indexed
//! expression and produces an [`IndexPlan`]: one entry per leading axis and
//! the static result shape. Selector expressions become numbered operand
//! *slots* (picks, integer arrays and present slice bounds, in source
//! order); the stack machine evaluates the slots and turns the plan into a
//! runtime [`Selection`].
//!
//! Slice lengths are static. With constant bounds the length is computed
//! directly. With variable bounds it comes from the constant difference
//! `stop - start` found by [`linear::diff`], and the machine checks it
//! against the actual slice on every evaluation.

use super::expr::{ExprRef, Selector};
use super::linear;
use crate::error::{Error, Result};
use crate::runtime::{slice_positions, Array, AxisSelector, Selection};
use crate::types::{broadcast_shape, Shape, Type};

/// Analyzed selector for one axis
#[derive(Debug, Clone, PartialEq)]
pub enum PlanAxis {
    Full,
    /// Scalar pick from a slot
    Pick(usize),
    /// Integer array from a slot
    Advanced(usize),
    Slice {
        start: Option<usize>,
        stop: Option<usize>,
        step: i64,
        len: usize,
    },
}

/// Result of [`analyze`]
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPlan {
    /// Selectors for the leading axes; the rest are kept whole
    pub axes: Vec<PlanAxis>,
    /// Static result shape
    pub shape: Shape,
    /// Number of operand slots
    pub slots: usize,
}

impl IndexPlan {
    /// Runtime selection from evaluated slot operands
    pub fn selection(&self, operands: &[Array]) -> Result<Selection> {
        let operand = |slot: usize| {
            operands
                .get(slot)
                .ok_or_else(|| Error::index(format!("missing index operand {}", slot)))
        };
        let scalar = |slot: usize| -> Result<i64> {
            operand(slot)?
                .as_scalar()
                .map(|s| s.as_i64())
                .ok_or_else(|| Error::index("index operand must be a scalar"))
        };
        let mut axes = Vec::with_capacity(self.axes.len());
        for axis in &self.axes {
            axes.push(match axis {
                PlanAxis::Full => AxisSelector::Full,
                PlanAxis::Pick(slot) => AxisSelector::Pick(scalar(*slot)?),
                PlanAxis::Advanced(slot) => AxisSelector::Advanced(operand(*slot)?.clone()),
                PlanAxis::Slice {
                    start,
                    stop,
                    step,
                    len,
                } => AxisSelector::Slice {
                    start: start.map(|s| scalar(s)).transpose()?,
                    stop: stop.map(|s| scalar(s)).transpose()?,
                    step: *step,
                    len: Some(*len),
                },
            });
        }
        Ok(Selection::new(axes))
    }
}

/// Selector expressions that are evaluated at run time, in slot order
pub fn slot_operands(selectors: &[Selector]) -> Vec<ExprRef> {
    let mut operands = Vec::new();
    for selector in selectors {
        match selector {
            Selector::Expr(e) => operands.push(e.clone()),
            Selector::Slice { start, stop, .. } => {
                operands.extend(start.iter().cloned());
                operands.extend(stop.iter().cloned());
            }
            Selector::Full | Selector::Ellipsis => {}
        }
    }
    operands
}

fn require_int(what: &str, e: &ExprRef) -> Result<()> {
    if e.ty != Type::Int {
        return Err(Error::type_error(format!("{} must be int, got {}", what, e.ty)));
    }
    Ok(())
}

fn require_scalar(what: &str, e: &ExprRef) -> Result<()> {
    match &e.shape {
        Some(shape) if !shape.is_scalar() => {
            Err(Error::type_error(format!("{} must be a scalar, got shape {}", what, shape)))
        }
        _ => Ok(()),
    }
}

/// Type checks that hold whatever the indexed shape
pub fn check_types(selectors: &[Selector]) -> Result<()> {
    for selector in selectors {
        match selector {
            Selector::Expr(e) => require_int("index", e)?,
            Selector::Slice { start, stop, step } => {
                for (what, bound) in [("slice start", start), ("slice stop", stop), ("slice step", step)] {
                    if let Some(e) = bound {
                        require_int(what, e)?;
                        require_scalar(what, e)?;
                    }
                }
            }
            Selector::Full | Selector::Ellipsis => {}
        }
    }
    Ok(())
}

/// Value of a constant scalar, `None` while unbound
fn const_scalar(what: &str, e: &ExprRef) -> Result<Option<i64>> {
    match e.constant {
        None => Ok(None),
        Some(false) => Err(Error::constant(format!("{} must be constant", what))),
        Some(true) => Ok(e.value.as_ref().and_then(Array::as_scalar).map(|s| s.as_i64())),
    }
}

fn check_position(pos: i64, n: usize, axis: usize) -> Result<()> {
    let len = n as i64;
    if pos >= len || pos < -len {
        return Err(Error::index(format!(
            "index {} is out of bounds for axis {} with size {}",
            pos, axis, n
        )));
    }
    Ok(())
}

fn check_bound(bound: Option<i64>, n: usize, axis: usize) -> Result<()> {
    let len = n as i64;
    match bound {
        Some(b) if b > len || b < -len - 1 => Err(Error::index(format!(
            "slice bound {} is out of range for axis {} with size {}",
            b, axis, n
        ))),
        _ => Ok(()),
    }
}

/// Static length of a slice, `None` while a bound is unbound
fn slice_len(
    start: &Option<ExprRef>,
    stop: &Option<ExprRef>,
    step: i64,
    n: usize,
    axis: usize,
) -> Result<Option<usize>> {
    // a missing bound counts as constant
    let start_const = start.as_ref().map_or(Some(true), |e| e.constant);
    let stop_const = stop.as_ref().map_or(Some(true), |e| e.constant);
    let len = match (start_const, stop_const, start, stop) {
        (None, _, _, _) | (_, None, _, _) => return Ok(None),
        (Some(true), Some(true), _, _) => {
            let value = |bound: &Option<ExprRef>| -> Result<Option<i64>> {
                match bound {
                    Some(e) => const_scalar("slice bound", e),
                    None => Ok(None),
                }
            };
            let (first, last) = (value(start)?, value(stop)?);
            check_bound(first, n, axis)?;
            check_bound(last, n, axis)?;
            slice_positions(first, last, step, n).len()
        }
        (Some(false), Some(false), Some(first), Some(last)) => {
            let d = if step > 0 {
                linear::diff(last, first)
            } else {
                linear::diff(first, last)
            };
            let d = d.ok_or_else(|| {
                Error::constant(format!("length of the slice on axis {} is not constant", axis))
            })?;
            let len = n as i64;
            let size = if -len < d && d <= 0 {
                d + len
            } else if 1 <= d && d <= len {
                d
            } else if len < d && d <= 2 * len {
                d - len
            } else {
                return Err(Error::index(format!(
                    "slice of length {} does not fit axis {} with size {}",
                    d, axis, n
                )));
            };
            let stride = step.unsigned_abs() as i64;
            ((size + stride - 1) / stride) as usize
        }
        _ => {
            return Err(Error::constant(format!(
                "slice bounds on axis {} must be both constant or both variable",
                axis
            )))
        }
    };
    if len == 0 {
        return Err(Error::index(format!("empty slice on axis {}", axis)));
    }
    Ok(Some(len))
}

/// Analyzes `selectors` against `base`; `Ok(None)` while a selector is unbound
pub fn analyze(base: &Shape, selectors: &[Selector]) -> Result<Option<IndexPlan>> {
    let rank = base.rank();
    let ellipses = selectors
        .iter()
        .filter(|s| matches!(s, Selector::Ellipsis))
        .count();
    if ellipses > 1 {
        return Err(Error::index("an index can only have a single ellipsis"));
    }
    let used = selectors.len() - ellipses;
    if used > rank {
        return Err(Error::index(format!(
            "too many indices ({}) for array of shape {}",
            used, base
        )));
    }

    let dims = base.dims();
    let mut axes = Vec::with_capacity(rank);
    // (axis, length) of kept axes and (axis, shape) of the advanced group
    let mut basic: Vec<(usize, usize)> = Vec::new();
    let mut advanced: Vec<(usize, Shape)> = Vec::new();
    let mut slot = 0;
    let mut axis = 0;

    for selector in selectors {
        match selector {
            Selector::Ellipsis => {
                for _ in 0..rank - used {
                    axes.push(PlanAxis::Full);
                    basic.push((axis, dims[axis]));
                    axis += 1;
                }
            }
            Selector::Full => {
                axes.push(PlanAxis::Full);
                basic.push((axis, dims[axis]));
                axis += 1;
            }
            Selector::Expr(e) => {
                let shape = match &e.shape {
                    Some(shape) => shape.clone(),
                    None => return Ok(None),
                };
                if let Some(value) = &e.value {
                    for pos in value.to_i64_vec() {
                        check_position(pos, dims[axis], axis)?;
                    }
                }
                axes.push(if shape.is_scalar() {
                    PlanAxis::Pick(slot)
                } else {
                    PlanAxis::Advanced(slot)
                });
                advanced.push((axis, shape));
                slot += 1;
                axis += 1;
            }
            Selector::Slice { start, stop, step } => {
                let step = match step {
                    None => 1,
                    Some(e) => match const_scalar("slice step", e)? {
                        Some(v) => v,
                        None => return Ok(None),
                    },
                };
                if step == 0 {
                    return Err(Error::index("slice step cannot be zero"));
                }
                let len = match slice_len(start, stop, step, dims[axis], axis)? {
                    Some(len) => len,
                    None => return Ok(None),
                };
                let mut take_slot = |present: bool| {
                    present.then(|| {
                        slot += 1;
                        slot - 1
                    })
                };
                let start = take_slot(start.is_some());
                let stop = take_slot(stop.is_some());
                axes.push(PlanAxis::Slice {
                    start,
                    stop,
                    step,
                    len,
                });
                basic.push((axis, len));
                axis += 1;
            }
        }
    }
    basic.extend((axis..rank).map(|a| (a, dims[a])));

    // advanced group placement follows the runtime selection
    let group_shapes: Vec<&Shape> = advanced.iter().map(|(_, s)| s).collect();
    let group_shape = broadcast_shape(&group_shapes)?;
    let adjacent = advanced.windows(2).all(|w| w[1].0 == w[0].0 + 1);
    let insert_at = match advanced.first() {
        Some(&(first, _)) if adjacent => basic.iter().filter(|(a, _)| *a < first).count(),
        _ => 0,
    };
    let mut out: Vec<usize> = basic.iter().map(|&(_, len)| len).collect();
    for (k, &n) in group_shape.dims().iter().enumerate() {
        out.insert(insert_at + k, n);
    }

    Ok(Some(IndexPlan {
        axes,
        shape: Shape::new(out),
        slots: slot,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::expr::Expr;
    use crate::compiler::VarId;
    use crate::error::ErrorKind;
    use crate::parser::BinaryOp;

    fn int(i: i64) -> ExprRef {
        Expr::literal(Array::int(i))
    }

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec())
    }

    fn slice(start: Option<ExprRef>, stop: Option<ExprRef>, step: Option<ExprRef>) -> Selector {
        Selector::Slice { start, stop, step }
    }

    fn plan(base: &[usize], selectors: &[Selector]) -> Result<IndexPlan> {
        Ok(analyze(&shape(base), selectors)?.unwrap())
    }

    #[test]
    fn test_picks_and_full_axes() {
        let p = plan(&[3, 4], &[Selector::Expr(int(1))]).unwrap();
        assert_eq!(p.shape, shape(&[4]));
        assert_eq!(p.slots, 1);

        let p = plan(&[3, 4], &[Selector::Full, Selector::Expr(int(-1))]).unwrap();
        assert_eq!(p.shape, shape(&[3]));
        assert_eq!(p.axes, vec![PlanAxis::Full, PlanAxis::Pick(0)]);
    }

    #[test]
    fn test_ellipsis_expands() {
        let p = plan(&[2, 3, 4], &[Selector::Ellipsis, Selector::Expr(int(0))]).unwrap();
        assert_eq!(p.shape, shape(&[2, 3]));
        let err = plan(&[2, 3], &[Selector::Ellipsis, Selector::Ellipsis]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
    }

    #[test]
    fn test_constant_slices() {
        let p = plan(&[5], &[slice(Some(int(1)), None, None)]).unwrap();
        assert_eq!(p.shape, shape(&[4]));
        let p = plan(&[5], &[slice(None, None, Some(int(-2)))]).unwrap();
        assert_eq!(p.shape, shape(&[3]));
        assert_eq!(p.slots, 0);

        let err = plan(&[5], &[slice(Some(int(3)), Some(int(3)), None)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
        let err = plan(&[5], &[slice(Some(int(7)), None, None)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
        let err = plan(&[5], &[slice(None, None, Some(int(0)))]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
    }

    #[test]
    fn test_variable_slice_length() {
        let i = Expr::var_ref(VarId(0), Type::Int, Shape::scalar());
        let stop = Expr::binary(BinaryOp::Add, i.clone(), int(2)).unwrap();
        let p = plan(&[6], &[slice(Some(i.clone()), Some(stop), None)]).unwrap();
        assert_eq!(p.shape, shape(&[2]));
        assert_eq!(p.slots, 2);

        let j = Expr::var_ref(VarId(1), Type::Int, Shape::scalar());
        let err = plan(&[6], &[slice(Some(i.clone()), Some(j), None)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstError);

        let err = plan(&[6], &[slice(Some(i), Some(int(3)), None)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstError);
    }

    #[test]
    fn test_out_of_range_picks() {
        assert_eq!(plan(&[3], &[Selector::Expr(int(3))]).unwrap_err().kind(), ErrorKind::IndexError);
        assert_eq!(plan(&[3], &[Selector::Expr(int(-4))]).unwrap_err().kind(), ErrorKind::IndexError);
        let err = plan(&[3], &[Selector::Full, Selector::Full]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
    }

    #[test]
    fn test_advanced_group_shape() {
        let idx = Expr::literal(Array::int_vector(vec![0, 2]));
        let p = plan(&[3, 4, 5], &[Selector::Full, Selector::Expr(idx.clone())]).unwrap();
        assert_eq!(p.shape, shape(&[3, 2, 5]));
        // non-adjacent advanced axes move to the front
        let p = plan(&[3, 4, 5], &[Selector::Expr(idx.clone()), Selector::Full, Selector::Expr(idx)]).unwrap();
        assert_eq!(p.shape, shape(&[2, 4]));
    }

    #[test]
    fn test_plan_matches_runtime_selection() {
        let base = Array::from_scalars(
            Type::Int,
            shape(&[3, 4]),
            (0..12).map(crate::runtime::Scalar::Int),
        )
        .unwrap();
        let selectors = [slice(Some(int(1)), None, None), Selector::Expr(int(2))];
        let p = plan(&[3, 4], &selectors).unwrap();
        let operands: Vec<Array> = slot_operands(&selectors)
            .iter()
            .map(|e| e.value.clone().unwrap())
            .collect();
        let r = base.select(&p.selection(&operands).unwrap()).unwrap();
        assert_eq!(r.shape(), &p.shape);
        assert_eq!(r.to_i64_vec(), vec![6, 10]);
    }

    #[test]
    fn test_selector_types() {
        let b = Expr::literal(Array::bool(true));
        assert_eq!(check_types(&[Selector::Expr(b)]).unwrap_err().kind(), ErrorKind::TypeError);
        let r = Expr::literal(Array::real(1.0));
        assert_eq!(
            check_types(&[slice(Some(r), None, None)]).unwrap_err().kind(),
            ErrorKind::TypeError
        );
    }
}

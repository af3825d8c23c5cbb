//! Expression IR
//!
//! Nodes are immutable and shared through [`ExprRef`]. Every constructor
//! computes the node's type, shape and constness from its operands and, when
//! the node is constant, folds it through the same [`Operator`] the stack
//! machine executes.
//!
//! Function bodies are *improper* templates: their [`ExprKind::Parameter`]
//! leaves have no shape or constness yet, and everything above them inherits
//! `None`. [`Expr::bind`] substitutes actual arguments and rebuilds the tree
//! through the constructors, so every check runs again with real shapes.

use super::indexer::{self, IndexPlan};
use super::model::{ParamId, VarId};
use crate::builtins::Builtin;
use crate::error::{Error, Result};
use crate::parser::{BinaryOp, UnaryOp};
use crate::runtime::{ops, Array, Operator};
use crate::types::{broadcast_shape, Shape, Type};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Shared expression node
pub type ExprRef = Rc<Expr>;

/// Elaborated expression with its metadata
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Element type, always known
    pub ty: Type,
    /// `None` while the node depends on an unbound parameter
    pub shape: Option<Shape>,
    /// `None` while the node depends on an unbound parameter
    pub constant: Option<bool>,
    /// Folded value of a constant node
    pub value: Option<Array>,
}

/// Expression node kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Constant; the value is in [`Expr::value`]
    Literal,
    VarRef(VarId),
    Parameter { id: ParamId, name: String },
    Unary(UnaryOp, ExprRef),
    Binary(BinaryOp, ExprRef, ExprRef),
    /// Conversion to [`Expr::ty`]
    Cast(ExprRef),
    Cond(ExprRef, ExprRef, ExprRef),
    Array(Vec<ExprRef>),
    Concat(Vec<ExprRef>),
    Index {
        base: ExprRef,
        selectors: Vec<Selector>,
        /// Static analysis of the selectors, once the base shape is known
        plan: Option<Arc<IndexPlan>>,
    },
    Builtin {
        builtin: Arc<dyn Builtin>,
        args: Vec<ExprRef>,
    },
}

/// Elaborated axis selector
#[derive(Debug, Clone)]
pub enum Selector {
    /// Scalar pick or integer array
    Expr(ExprRef),
    Slice {
        start: Option<ExprRef>,
        stop: Option<ExprRef>,
        step: Option<ExprRef>,
    },
    Full,
    Ellipsis,
}

type Rewrite<'a> = dyn FnMut(&ExprRef) -> Result<ExprRef> + 'a;

fn rewrite_opt(expr: &Option<ExprRef>, f: &mut Rewrite<'_>) -> Result<Option<ExprRef>> {
    match expr {
        Some(e) => Ok(Some(f(e)?)),
        None => Ok(None),
    }
}

fn rewrite_all(items: &[ExprRef], f: &mut Rewrite<'_>) -> Result<Vec<ExprRef>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(f(item)?);
    }
    Ok(out)
}

impl Selector {
    fn map(&self, f: &mut Rewrite<'_>) -> Result<Selector> {
        Ok(match self {
            Selector::Expr(e) => Selector::Expr(f(e)?),
            Selector::Slice { start, stop, step } => Selector::Slice {
                start: rewrite_opt(start, f)?,
                stop: rewrite_opt(stop, f)?,
                step: rewrite_opt(step, f)?,
            },
            Selector::Full => Selector::Full,
            Selector::Ellipsis => Selector::Ellipsis,
        })
    }

    fn structurally_equal(&self, other: &Selector) -> bool {
        let opt_eq = |a: &Option<ExprRef>, b: &Option<ExprRef>| match (a, b) {
            (Some(a), Some(b)) => a.structurally_equal(b),
            (None, None) => true,
            _ => false,
        };
        match (self, other) {
            (Selector::Expr(a), Selector::Expr(b)) => a.structurally_equal(b),
            (
                Selector::Slice { start, stop, step },
                Selector::Slice {
                    start: s2,
                    stop: e2,
                    step: t2,
                },
            ) => opt_eq(start, s2) && opt_eq(stop, e2) && opt_eq(step, t2),
            (Selector::Full, Selector::Full) | (Selector::Ellipsis, Selector::Ellipsis) => true,
            _ => false,
        }
    }
}

/// Constness of a node over its operands: known only when every operand's is
fn merge_constant<'a>(args: impl IntoIterator<Item = &'a ExprRef>) -> Option<bool> {
    let mut constant = true;
    for arg in args {
        constant &= arg.constant?;
    }
    Some(constant)
}

fn known_shapes(args: &[ExprRef]) -> Option<Vec<&Shape>> {
    args.iter().map(|a| a.shape.as_ref()).collect()
}

impl Expr {
    /// Builds a node, folding it when constant
    fn node(kind: ExprKind, ty: Type, shape: Option<Shape>, constant: Option<bool>) -> Result<ExprRef> {
        let constant = shape.as_ref().and(constant);
        let mut expr = Expr {
            kind,
            ty,
            shape,
            constant,
            value: None,
        };
        if expr.constant == Some(true) {
            expr.value = Some(expr.evaluate()?);
        }
        Ok(Rc::new(expr))
    }

    /// Evaluates a constant node from its operands' values
    fn evaluate(&self) -> Result<Array> {
        match self.operator() {
            Some((op, args)) => {
                let values = args
                    .iter()
                    .map(|a| {
                        a.value
                            .clone()
                            .ok_or_else(|| Error::constant("operand has no constant value"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                op.apply(&values)
            }
            None => self
                .value
                .clone()
                .ok_or_else(|| Error::constant("expression has no constant value")),
        }
    }

    /// Constant leaf
    pub fn literal(value: Array) -> ExprRef {
        Rc::new(Expr {
            kind: ExprKind::Literal,
            ty: value.ty(),
            shape: Some(value.shape().clone()),
            constant: Some(true),
            value: Some(value),
        })
    }

    /// Reference to a variable's current value
    pub fn var_ref(var: VarId, ty: Type, shape: Shape) -> ExprRef {
        Rc::new(Expr {
            kind: ExprKind::VarRef(var),
            ty,
            shape: Some(shape),
            constant: Some(false),
            value: None,
        })
    }

    /// Unbound function parameter
    pub fn parameter(id: ParamId, name: &str, ty: Type) -> ExprRef {
        Rc::new(Expr {
            kind: ExprKind::Parameter {
                id,
                name: name.to_string(),
            },
            ty,
            shape: None,
            constant: None,
            value: None,
        })
    }

    pub fn unary(op: UnaryOp, arg: ExprRef) -> Result<ExprRef> {
        let ty = ops::unary_result_type(op, arg.ty)?;
        let (shape, constant) = (arg.shape.clone(), arg.constant);
        Expr::node(ExprKind::Unary(op, arg), ty, shape, constant)
    }

    pub fn binary(op: BinaryOp, left: ExprRef, right: ExprRef) -> Result<ExprRef> {
        let ty = ops::binary_result_type(op, left.ty, right.ty)?;
        let shape = match (&left.shape, &right.shape) {
            (Some(l), Some(r)) => Some(broadcast_shape(&[l, r])?),
            _ => None,
        };
        let constant = merge_constant([&left, &right]);
        Expr::node(ExprKind::Binary(op, left, right), ty, shape, constant)
    }

    /// Explicit conversion; a no-op when the type already matches
    pub fn cast(ty: Type, arg: ExprRef) -> Result<ExprRef> {
        if arg.ty == ty {
            return Ok(arg);
        }
        let (shape, constant) = (arg.shape.clone(), arg.constant);
        Expr::node(ExprKind::Cast(arg), ty, shape, constant)
    }

    pub fn cond(cond: ExprRef, yes: ExprRef, no: ExprRef) -> Result<ExprRef> {
        let ty = ops::cond_result_type(cond.ty, yes.ty, no.ty)?;
        let shape = match (&cond.shape, &yes.shape, &no.shape) {
            (Some(c), Some(y), Some(n)) => Some(broadcast_shape(&[c, y, n])?),
            _ => None,
        };
        let constant = merge_constant([&cond, &yes, &no]);
        Expr::node(ExprKind::Cond(cond, yes, no), ty, shape, constant)
    }

    /// Array literal: equally shaped elements stacked on a new leading axis
    pub fn array(items: Vec<ExprRef>) -> Result<ExprRef> {
        let ty = Type::promote_all(items.iter().map(|i| i.ty))
            .ok_or_else(|| Error::shape("array literal needs at least one element"))?;
        let shape = match known_shapes(&items) {
            Some(shapes) => {
                let inner = shapes[0];
                if let Some(bad) = shapes.iter().find(|s| **s != inner) {
                    return Err(Error::shape(format!(
                        "array elements have different shapes {} and {}",
                        inner, bad
                    )));
                }
                Some(inner.prepend(items.len()).validated()?)
            }
            None => None,
        };
        let constant = merge_constant(&items);
        Expr::node(ExprKind::Array(items), ty, shape, constant)
    }

    /// Concatenation along axis 0
    pub fn concat(items: Vec<ExprRef>) -> Result<ExprRef> {
        let ty = Type::promote_all(items.iter().map(|i| i.ty))
            .ok_or_else(|| Error::shape("nothing to concatenate"))?;
        let shape = match known_shapes(&items) {
            Some(shapes) => Some(ops::concat_shape(&shapes)?),
            None => None,
        };
        let constant = merge_constant(&items);
        Expr::node(ExprKind::Concat(items), ty, shape, constant)
    }

    /// Indexing; selector types are checked even when the base shape is unknown
    pub fn index(base: ExprRef, selectors: Vec<Selector>) -> Result<ExprRef> {
        indexer::check_types(&selectors)?;
        let plan = match &base.shape {
            Some(shape) => indexer::analyze(shape, &selectors)?.map(Arc::new),
            None => None,
        };
        let shape = plan.as_ref().map(|p| p.shape.clone());
        let operands = indexer::slot_operands(&selectors);
        let constant = merge_constant(std::iter::once(&base).chain(operands.iter()));
        let ty = base.ty;
        Expr::node(
            ExprKind::Index {
                base,
                selectors,
                plan,
            },
            ty,
            shape,
            constant,
        )
    }

    /// Builtin application
    pub fn builtin(builtin: Arc<dyn Builtin>, args: Vec<ExprRef>) -> Result<ExprRef> {
        if args.len() != builtin.arity() {
            return Err(Error::type_error(format!(
                "{}() takes {} arguments ({} given)",
                builtin.name(),
                builtin.arity(),
                args.len()
            )));
        }
        let signature = builtin.infer(&args)?;
        let shape = signature.shape;
        let constant = shape.as_ref().and(signature.constant);
        let value = match constant {
            Some(true) => builtin.const_value(&args),
            _ => None,
        };
        if value.is_some() {
            return Ok(Rc::new(Expr {
                kind: ExprKind::Builtin { builtin, args },
                ty: signature.ty,
                shape,
                constant,
                value,
            }));
        }
        Expr::node(ExprKind::Builtin { builtin, args }, signature.ty, shape, constant)
    }

    /// Operator and operands of an interior node
    pub fn operator(&self) -> Option<(Operator, Vec<ExprRef>)> {
        Some(match &self.kind {
            ExprKind::Literal | ExprKind::VarRef(_) | ExprKind::Parameter { .. } => return None,
            ExprKind::Unary(op, a) => (Operator::Unary(*op), vec![a.clone()]),
            ExprKind::Binary(op, l, r) => (Operator::Binary(*op), vec![l.clone(), r.clone()]),
            ExprKind::Cast(a) => (Operator::Cast(self.ty), vec![a.clone()]),
            ExprKind::Cond(c, y, n) => (Operator::Cond, vec![c.clone(), y.clone(), n.clone()]),
            ExprKind::Array(items) => (Operator::Stack(self.ty), items.clone()),
            ExprKind::Concat(items) => (Operator::Concat(self.ty), items.clone()),
            ExprKind::Index {
                base,
                selectors,
                plan,
            } => {
                let plan = plan.clone()?;
                let mut operands = vec![base.clone()];
                operands.extend(indexer::slot_operands(selectors));
                (Operator::Index(plan), operands)
            }
            ExprKind::Builtin { builtin, args } => (Operator::Builtin(builtin.clone()), args.clone()),
        })
    }

    /// Rebuilds the node through its constructor with rewritten children
    fn rebuild_with(self: &Rc<Self>, f: &mut Rewrite<'_>) -> Result<ExprRef> {
        match &self.kind {
            ExprKind::Literal | ExprKind::VarRef(_) | ExprKind::Parameter { .. } => Ok(self.clone()),
            ExprKind::Unary(op, a) => Expr::unary(*op, f(a)?),
            ExprKind::Binary(op, l, r) => Expr::binary(*op, f(l)?, f(r)?),
            ExprKind::Cast(a) => Expr::cast(self.ty, f(a)?),
            ExprKind::Cond(c, y, n) => Expr::cond(f(c)?, f(y)?, f(n)?),
            ExprKind::Array(items) => Expr::array(rewrite_all(items, f)?),
            ExprKind::Concat(items) => Expr::concat(rewrite_all(items, f)?),
            ExprKind::Index { base, selectors, .. } => {
                let base = f(base)?;
                let mut rewritten = Vec::with_capacity(selectors.len());
                for selector in selectors {
                    rewritten.push(selector.map(f)?);
                }
                Expr::index(base, rewritten)
            }
            ExprKind::Builtin { builtin, args } => Expr::builtin(builtin.clone(), rewrite_all(args, f)?),
        }
    }

    /// Substitutes parameters and recomputes all metadata
    ///
    /// Proper trees contain no parameters and are returned as they are.
    pub fn bind(self: &Rc<Self>, params: &HashMap<ParamId, ExprRef>) -> Result<ExprRef> {
        if self.is_proper() {
            return Ok(self.clone());
        }
        if let ExprKind::Parameter { id, .. } = &self.kind {
            return Ok(params.get(id).cloned().unwrap_or_else(|| self.clone()));
        }
        self.rebuild_with(&mut |child| child.bind(params))
    }

    /// The same node rebuilt from its children
    pub fn rebuilt(self: &Rc<Self>) -> Result<ExprRef> {
        self.rebuild_with(&mut |child| Ok(child.clone()))
    }

    /// A literal for constant nodes, the node itself otherwise
    pub fn folded(self: &Rc<Self>) -> ExprRef {
        match &self.value {
            Some(value) if !matches!(self.kind, ExprKind::Literal) => Expr::literal(value.clone()),
            _ => self.clone(),
        }
    }

    /// Shape `()`
    pub fn is_scalar(&self) -> bool {
        self.shape.as_ref().map_or(false, Shape::is_scalar)
    }

    /// Shape and constness are known
    pub fn is_proper(&self) -> bool {
        self.shape.is_some() && self.constant.is_some()
    }

    /// Variable reference, or a statically analyzed index of one
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExprKind::VarRef(_) => true,
            ExprKind::Index {
                base,
                plan: Some(_),
                ..
            } => matches!(base.kind, ExprKind::VarRef(_)),
            _ => false,
        }
    }

    /// Variable written by an lvalue
    pub fn lvalue_var(&self) -> Option<VarId> {
        match &self.kind {
            ExprKind::VarRef(v) => Some(*v),
            ExprKind::Index { base, .. } => match base.kind {
                ExprKind::VarRef(v) => Some(v),
                _ => None,
            },
            _ => None,
        }
    }

    /// Structural identity; constants compare by value
    pub fn structurally_equal(&self, other: &Expr) -> bool {
        if let (Some(a), Some(b)) = (&self.value, &other.value) {
            return a == b;
        }
        let all = |a: &[ExprRef], b: &[ExprRef]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_equal(y))
        };
        match (&self.kind, &other.kind) {
            (ExprKind::VarRef(a), ExprKind::VarRef(b)) => a == b,
            (ExprKind::Parameter { id: a, .. }, ExprKind::Parameter { id: b, .. }) => a == b,
            (ExprKind::Unary(o1, a), ExprKind::Unary(o2, b)) => o1 == o2 && a.structurally_equal(b),
            (ExprKind::Binary(o1, l1, r1), ExprKind::Binary(o2, l2, r2)) => {
                o1 == o2 && l1.structurally_equal(l2) && r1.structurally_equal(r2)
            }
            (ExprKind::Cast(a), ExprKind::Cast(b)) => self.ty == other.ty && a.structurally_equal(b),
            (ExprKind::Cond(c1, y1, n1), ExprKind::Cond(c2, y2, n2)) => {
                c1.structurally_equal(c2) && y1.structurally_equal(y2) && n1.structurally_equal(n2)
            }
            (ExprKind::Array(a), ExprKind::Array(b)) | (ExprKind::Concat(a), ExprKind::Concat(b)) => all(a, b),
            (
                ExprKind::Index {
                    base: b1,
                    selectors: s1,
                    ..
                },
                ExprKind::Index {
                    base: b2,
                    selectors: s2,
                    ..
                },
            ) => {
                b1.structurally_equal(b2)
                    && s1.len() == s2.len()
                    && s1.iter().zip(s2).all(|(x, y)| x.structurally_equal(y))
            }
            (
                ExprKind::Builtin {
                    builtin: f1,
                    args: a1,
                },
                ExprKind::Builtin {
                    builtin: f2,
                    args: a2,
                },
            ) => f1.name() == f2.name() && all(a1, a2),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (ExprKind::Literal, Some(value)) = (&self.kind, &self.value) {
            return write!(f, "{}", value);
        }
        match &self.kind {
            ExprKind::Literal => write!(f, "?"),
            ExprKind::VarRef(v) => write!(f, "var#{}", v),
            ExprKind::Parameter { name, .. } => write!(f, "{}", name),
            ExprKind::Unary(op, a) => write!(f, "{}({})", op, a),
            ExprKind::Binary(op, l, r) => write!(f, "({} {} {})", l, op, r),
            ExprKind::Cast(a) => write!(f, "({}){}", self.ty, a),
            ExprKind::Cond(c, y, n) => write!(f, "({} ? {} : {})", c, y, n),
            ExprKind::Array(items) | ExprKind::Concat(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                if matches!(self.kind, ExprKind::Array(_)) {
                    write!(f, "[{}]", parts.join(", "))
                } else {
                    write!(f, "({})", parts.join(", "))
                }
            }
            ExprKind::Index { base, selectors, .. } => write!(f, "{}[{} selectors]", base, selectors.len()),
            ExprKind::Builtin { builtin, args } => {
                let parts: Vec<String> = args.iter().map(|i| i.to_string()).collect();
                write!(f, "{}({})", builtin.name(), parts.join(", "))
            }
        }
    }
}

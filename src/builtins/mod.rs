//! Builtin operators for VectorL
//!
//! Builtins are library operators with their own type, shape and
//! constness rules: shape queries, reductions, elementwise math, array
//! constructors and the system clock. Each rule runs during elaboration;
//! `execute` runs on materialized operands, both for constant folding and
//! inside the stack machine.

mod construct;
mod math;
mod reduce;
mod shape;
mod system;

pub use construct::{FillBuiltin, RangeBuiltin};
pub use math::{MathBuiltin, MathFn};
pub use reduce::{Reduction, ReductionBuiltin};
pub use shape::{ShapeofBuiltin, TransposeBuiltin};
pub use system::NowBuiltin;

use crate::compiler::ExprRef;
use crate::error::{Error, Result};
use crate::runtime::Array;
use crate::types::{Shape, Type};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result metadata computed by a builtin's rules
///
/// `shape` and `constant` are `None` while an operand is still an
/// unbound function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Result type
    pub ty: Type,
    /// Result shape, when known
    pub shape: Option<Shape>,
    /// Result constness, when known
    pub constant: Option<bool>,
}

/// Machine state visible to system builtins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemContext {
    /// Current simulated time
    pub now: f64,
}

/// Builtin trait - all VectorL library operators implement this
pub trait Builtin: Send + Sync {
    /// Builtin name as written in source
    fn name(&self) -> &str;

    /// Builtin description
    fn description(&self) -> &str;

    /// Exact number of arguments
    fn arity(&self) -> usize;

    /// Computes the result type, shape and constness from the operands
    fn infer(&self, args: &[ExprRef]) -> Result<Signature>;

    /// Constant value available even when operands are not constant
    fn const_value(&self, _args: &[ExprRef]) -> Option<Array> {
        None
    }

    /// Evaluates the builtin on materialized operands
    fn execute(&self, args: &[Array]) -> Result<Array>;

    /// True for builtins that read machine state
    fn is_system(&self) -> bool {
        false
    }

    /// Evaluates a system builtin against the machine state
    fn execute_system(&self, _context: &SystemContext, args: &[Array]) -> Result<Array> {
        self.execute(args)
    }
}

impl fmt::Debug for dyn Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity())
    }
}

/// Builtin registry
pub struct BuiltinRegistry {
    builtins: HashMap<String, Arc<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// Creates a registry holding the standard library
    pub fn new() -> Self {
        let mut registry = BuiltinRegistry::empty();

        registry.register(ShapeofBuiltin);
        registry.register(TransposeBuiltin);
        for reduction in Reduction::ALL {
            registry.register(ReductionBuiltin(reduction));
        }
        for func in MathFn::ALL {
            registry.register(MathBuiltin(func));
        }
        registry.register(RangeBuiltin);
        registry.register(FillBuiltin);

        registry
    }

    /// Create empty registry (for testing)
    pub fn empty() -> Self {
        BuiltinRegistry {
            builtins: HashMap::new(),
        }
    }

    /// Register a builtin
    pub fn register<B: Builtin + 'static>(&mut self, builtin: B) {
        let name = builtin.name().to_string();
        self.builtins.insert(name, Arc::new(builtin));
    }

    /// Get builtin by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.builtins.get(name).cloned()
    }

    /// Check if builtin exists
    pub fn has(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// All builtin names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.builtins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get builtin count
    pub fn count(&self) -> usize {
        self.builtins.len()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Rule helpers shared by the builtin families

/// Known shape and constness of every operand, or `None` if one is unbound
fn proper_args(args: &[ExprRef]) -> Option<(Vec<&Shape>, bool)> {
    let mut shapes = Vec::with_capacity(args.len());
    let mut constant = true;
    for arg in args {
        shapes.push(arg.shape.as_ref()?);
        constant &= arg.constant?;
    }
    Some((shapes, constant))
}

/// Value of an argument that must be a constant scalar int
///
/// Returns `Ok(None)` while the argument is an unbound parameter.
fn const_int(builtin: &str, what: &str, arg: &ExprRef) -> Result<Option<i64>> {
    if arg.ty != Type::Int {
        return Err(Error::type_error(format!(
            "{} of {}() must be int, got {}",
            what, builtin, arg.ty
        )));
    }
    match (&arg.shape, arg.constant) {
        (Some(shape), _) if !shape.is_scalar() => Err(Error::type_error(format!(
            "{} of {}() must be a scalar",
            what, builtin
        ))),
        (_, Some(false)) => Err(Error::constant(format!(
            "{} of {}() must be constant",
            what, builtin
        ))),
        (Some(_), Some(true)) => Ok(arg
            .value
            .as_ref()
            .and_then(Array::as_scalar)
            .map(|s| s.as_i64())),
        _ => Ok(None),
    }
}

/// Value of an argument that must be a constant int scalar or vector
fn const_int_vector(builtin: &str, what: &str, arg: &ExprRef) -> Result<Option<Vec<i64>>> {
    if arg.ty != Type::Int {
        return Err(Error::type_error(format!(
            "{} of {}() must be int, got {}",
            what, builtin, arg.ty
        )));
    }
    match (&arg.shape, arg.constant) {
        (Some(shape), _) if shape.rank() > 1 => Err(Error::shape(format!(
            "{} of {}() must be a scalar or a vector",
            what, builtin
        ))),
        (_, Some(false)) => Err(Error::constant(format!(
            "{} of {}() must be constant",
            what, builtin
        ))),
        (Some(_), Some(true)) => Ok(arg.value.as_ref().map(Array::to_i64_vec)),
        _ => Ok(None),
    }
}

fn expect_arity(builtin: &dyn Builtin, args: &[Array]) -> Result<()> {
    if args.len() != builtin.arity() {
        return Err(Error::type_error(format!(
            "{}() takes {} arguments ({} given)",
            builtin.name(),
            builtin.arity(),
            args.len()
        )));
    }
    Ok(())
}

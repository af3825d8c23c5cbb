//! System builtins that read machine state

use super::{Builtin, Signature, SystemContext};
use crate::compiler::ExprRef;
use crate::error::{Error, Result};
use crate::runtime::Array;
use crate::types::{Shape, Type};

/// `now` is the current simulated time
///
/// Lives in the system module rather than the library registry, and is
/// never constant.
pub struct NowBuiltin;

impl Builtin for NowBuiltin {
    fn name(&self) -> &str {
        "now"
    }

    fn description(&self) -> &str {
        "Current simulated time"
    }

    fn arity(&self) -> usize {
        0
    }

    fn infer(&self, _args: &[ExprRef]) -> Result<Signature> {
        Ok(Signature {
            ty: Type::Time,
            shape: Some(Shape::scalar()),
            constant: Some(false),
        })
    }

    fn execute(&self, _args: &[Array]) -> Result<Array> {
        Err(Error::type_error("now() can only be evaluated by the stack machine"))
    }

    fn is_system(&self) -> bool {
        true
    }

    fn execute_system(&self, context: &SystemContext, _args: &[Array]) -> Result<Array> {
        Ok(Array::time(context.now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_reads_context() {
        let r = NowBuiltin
            .execute_system(&SystemContext { now: 2.5 }, &[])
            .unwrap();
        assert_eq!(r, Array::time(2.5));
        assert!(NowBuiltin.execute(&[]).is_err());
    }
}

//! Stack-machine instructions
//!
//! A [`Program`] is executed back to front: the machine pushes its body on
//! the op-stack and pops from the end, so the last instruction of a body
//! runs first. Lowering therefore emits every operation before the code
//! computing its operands.

use super::array::Array;
use super::ops;
use super::value::Value;
use crate::builtins::Builtin;
use crate::compiler::{EventId, IndexPlan, VarId};
use crate::diagnostics::Origin;
use crate::error::Result;
use crate::parser::{BinaryOp, UnaryOp};
use crate::types::Type;
use std::fmt;
use std::sync::Arc;

/// Pure array operator, shared by constant folding and execution
#[derive(Debug, Clone)]
pub enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Conversion to the given type
    Cast(Type),
    /// `c ? a : b`
    Cond,
    /// Array literal of the given element type
    Stack(Type),
    /// Concatenation along axis 0 into the given type
    Concat(Type),
    /// Indexing; operands are the base followed by the plan's slots
    Index(Arc<IndexPlan>),
    Builtin(Arc<dyn Builtin>),
}

impl Operator {
    /// Applies the operator to materialized operands
    pub fn apply(&self, args: &[Array]) -> Result<Array> {
        match self {
            Operator::Unary(op) => ops::unary(*op, &args[0]),
            Operator::Binary(op) => ops::binary(*op, &args[0], &args[1]),
            Operator::Cast(ty) => Ok(ops::cast(*ty, &args[0])),
            Operator::Cond => ops::cond(&args[0], &args[1], &args[2]),
            Operator::Stack(ty) => ops::stack(*ty, args),
            Operator::Concat(ty) => ops::concat(*ty, args),
            Operator::Index(plan) => {
                let selection = plan.selection(&args[1..])?;
                args[0].select(&selection)
            }
            Operator::Builtin(builtin) => builtin.execute(args),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Unary(op) => write!(f, "{}", op),
            Operator::Binary(op) => write!(f, "{}", op),
            Operator::Cast(ty) => write!(f, "({})", ty),
            Operator::Cond => write!(f, "?:"),
            Operator::Stack(ty) => write!(f, "array<{}>", ty),
            Operator::Concat(ty) => write!(f, "concat<{}>", ty),
            Operator::Index(_) => write!(f, "index"),
            Operator::Builtin(b) => write!(f, "{}", b.name()),
        }
    }
}

/// Target of a `call` instruction
#[derive(Debug, Clone)]
pub enum Func {
    /// Array operator; pushes its result
    Op(Operator),
    /// Packs the arguments of an emit into a tuple
    Collect,
    /// Sends the arguments to the output sink; pushes nothing
    Print,
    /// Evaluates an lvalue indexer into a selection
    Selection(Arc<IndexPlan>),
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Func::Op(op) => write!(f, "{}", op),
            Func::Collect => write!(f, "collect"),
            Func::Print => write!(f, "print"),
            Func::Selection(_) => write!(f, "selection"),
        }
    }
}

/// Stack-machine instruction
#[derive(Debug, Clone)]
pub enum Instr {
    /// Push a literal
    Push(Value),
    /// Push a copy of a variable's value
    PushVar(VarId),
    /// Push a variable's storage handle
    PushRef(VarId),
    /// Pop `arity` operands, apply `func`, push the result if any
    Call { arity: usize, func: Func },
    /// Like `Call` for builtins that read machine state
    SysCall { arity: usize, builtin: Arc<dyn Builtin> },
    /// Pop a reference, a selection and a value; write the value
    Assign,
    /// Pop an argument tuple and a delay; schedule the event
    Emit(EventId),
    /// Pop one op-stack entry
    PopO,
    /// Pop a bool; when true, pop two op-stack entries
    PopO2If,
    /// No-op frame marker
    Label(String),
    /// No-op marker of the statement whose code lies above it
    Stmt { origin: Origin, what: &'static str },
    /// Push a nested program on the op-stack
    Prog(Arc<Program>),
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Push(v) => write!(f, "push {}", v),
            Instr::PushVar(v) => write!(f, "pushvar {}", v),
            Instr::PushRef(v) => write!(f, "pushref {}", v),
            Instr::Call { arity, func } => write!(f, "call {} {}", arity, func),
            Instr::SysCall { arity, builtin } => write!(f, "syscall {} {}", arity, builtin.name()),
            Instr::Assign => write!(f, "assign"),
            Instr::Emit(e) => write!(f, "emit {}", e),
            Instr::PopO => write!(f, "popo"),
            Instr::PopO2If => write!(f, "popo2_if"),
            Instr::Label(l) => write!(f, "label {}", l),
            Instr::Stmt { origin, what } => write!(f, "label {}: {}", origin, what),
            Instr::Prog(p) => write!(f, "prog {}", p.label),
        }
    }
}

/// Labelled instruction list
#[derive(Debug, Clone)]
pub struct Program {
    pub label: String,
    pub body: Vec<Instr>,
}

impl Program {
    pub fn new(label: impl Into<String>, body: Vec<Instr>) -> Self {
        Program {
            label: label.into(),
            body,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instr in &self.body {
            writeln!(f, "  {}", instr)?;
        }
        Ok(())
    }
}

//! VectorL parser
//!
//! Builds a [`Module`] AST from a token stream. The parser performs no
//! semantic checks; every node carries the source line it started on.

mod ast;
#[allow(clippy::module_inception)]
mod parser;

pub use ast::{
    BinaryOp, Decl, DeclKind, Expr, ExprKind, FexprDecl, IndexSel, Module, Param, PrintArg, Stmt,
    StmtKind, UnaryOp,
};
pub use parser::Parser;

//! # VectorL compiler
//!
//! Turns module sources into stack-machine programs.
//!
//! ## Architecture
//!
//! ```text
//! source → Scanner → Parser → Elaborator (per module, via ModelFactory) → Model → lower → Executable
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use vectorl::compiler::{lower, MemorySources, ModelFactory};
//!
//! let sources = MemorySources::new().with("main", "on Init print 1;");
//! let mut factory = ModelFactory::new(sources);
//! factory.get_model("main")?;
//! let executable = lower(&factory)?;
//! ```

mod elaborate;
mod expr;
mod factory;
mod indexer;
mod linear;
mod lower;
mod model;
mod scope;
mod sources;

pub use expr::{Expr, ExprKind, ExprRef, Selector};
pub use factory::{ModelFactory, SYSTEM_MODULE};
pub use indexer::{IndexPlan, PlanAxis};
pub use lower::{lower, EventInfo, Executable, VarInfo};
pub use model::{
    Action, ActionId, Event, EventId, Fexpr, FexprId, FuncId, Function, Lvalue, Model, ModuleId,
    ModuleInfo, ParamId, PrintPart, ScopeId, Stmt, StmtKind, VarId, Variable,
};
pub use scope::{Scopes, Symbol};
pub use sources::{FileSources, MemorySources, SourceFetcher};

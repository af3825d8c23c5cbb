//! # VectorL - statically shaped arrays for discrete-event simulation
//!
//! VectorL models are sets of modules declaring array-valued *variables*,
//! *events* and *actions* that run when an event is dispatched. Every
//! expression has a static type and shape, checked and constant-folded at
//! compile time; a deterministic stack machine then dispatches events in
//! simulated-time order.
//!
//! ## Quick Start
//!
//! ```rust
//! use vectorl::{run, CaptureSink, MemorySources, RunOptions};
//!
//! let source = r#"
//!     var int k = 0;
//!     event tick();
//!     on Init emit tick() after 1;
//!     on tick { k := k + 1; if (k < 3) emit tick() after 1; }
//!     on tick print "k=", k;
//! "#;
//!
//! let sink = CaptureSink::new();
//! let report = run(
//!     MemorySources::new().with("main", source),
//!     "main",
//!     &RunOptions::default(),
//!     sink.clone(),
//! );
//! assert!(report.success);
//! assert_eq!(report.step_count, 4);
//! assert_eq!(report.final_now, 3.0);
//! assert_eq!(sink.lines(), vec!["k= 1", "k= 2", "k= 3"]);
//! ```
//!
//! ## Language Overview
//!
//! ### Data Types
//!
//! - `bool`, `int`, `real`, `time`, promoted in that order
//! - Every value is an n-dimensional array; shapes broadcast numpy-style
//!
//! ### Declarations
//!
//! - `var T x = e;` mutable state, initialized by a constant
//! - `let T x = e;` / `const T x = e;` named expressions
//! - `func T f(T a) { e }` inlined pure functions
//! - `event E(T a);` and `on E stmt` actions
//! - `import M;`, `import A = M;`, `from M import a, b;`
//!
//! ### Statements
//!
//! `x := e;`, `x[i, 1:3] := e;`, `emit E(args) after t;`, `print "text", e;`,
//! `if (c) s else s`, `{ ... }`
//!
//! ## Architecture
//!
//! ```text
//! Source → Scanner → Parser → ModelFactory/Elaborator → lower → Machine
//! ```
//!
//! ### Main Components
//!
//! - **Lexer** ([`lexer`]): tokens with line and column
//! - **Parser** ([`parser`]): AST with source lines, recovering at declarations
//! - **Compiler** ([`compiler`]): module loading, elaboration to typed IR, lowering
//! - **Builtins** ([`builtins`]): reductions, elementwise math, shape operators, `now`
//! - **Runtime** ([`runtime`]): array kernel and the event-queue stack machine
//!
//! ## Error Handling
//!
//! Compile errors are collected with their module and line; the run never
//! starts when one was recorded.
//!
//! ```rust
//! use vectorl::{run, CaptureSink, ErrorKind, MemorySources, RunOptions};
//!
//! let source = "var int v = [1, 2];\non Init v := [1, 2, 3];";
//! let report = run(
//!     MemorySources::new().with("main", source),
//!     "main",
//!     &RunOptions::default(),
//!     CaptureSink::new(),
//! );
//! assert!(!report.success);
//! let shape_error = &report.messages[0];
//! assert_eq!(shape_error.kind, Some(ErrorKind::ShapeError));
//! assert_eq!(shape_error.origin.as_ref().unwrap().line, 2);
//! ```

// Module declarations
/// Version of the VectorL toolchain
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod builtins;
pub mod compiler;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod types;

// Re-export main types
pub use builtins::{Builtin, BuiltinRegistry};
pub use compiler::{lower, Executable, FileSources, MemorySources, ModelFactory, SourceFetcher};
pub use diagnostics::{Diagnostics, Level, Message, Origin};
pub use driver::{run, RunOptions, RunReport, Simulation};
pub use error::{Error, ErrorKind, Result};
pub use lexer::{Scanner, Token, TokenKind};
pub use parser::Parser;
pub use runtime::{Array, CaptureSink, Machine, OutputSink, PrintItem, StdoutSink, Value};
pub use types::{Shape, Type};

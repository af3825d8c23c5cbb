use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed source module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    /// Top-level declarations in source order
    pub decls: Vec<Decl>,
}

/// Top-level declaration with its source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    /// Declaration body
    pub kind: DeclKind,
    /// Line of the first token
    pub line: usize,
}

/// Top-level declaration kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    /// `import M;` or `import A = M;`
    Import {
        /// Imported module
        module: String,
        /// Local name bound to the module
        alias: String,
    },
    /// `from M import a, b;`
    From {
        /// Source module
        module: String,
        /// Names imported into the local scope
        names: Vec<String>,
    },
    /// `event E(T a, ...);`
    Event {
        /// Event name
        name: String,
        /// Scalar parameters
        params: Vec<Param>,
    },
    /// `func T f(T a, ...) { decls... expr }`
    Func {
        /// Function name
        name: String,
        /// Declared return type
        ret: Type,
        /// Formal parameters
        params: Vec<Param>,
        /// Local `let`/`const` declarations
        locals: Vec<FexprDecl>,
        /// Result expression
        body: Expr,
    },
    /// `let T x = e;` or `const T x = e;`
    Fexpr(FexprDecl),
    /// `var T x = e;`
    Var {
        /// Variable name
        name: String,
        /// Declared element type
        ty: Type,
        /// Initial value, must be constant
        init: Expr,
    },
    /// `on E stmt`
    Action {
        /// Qualified event name
        event: Vec<String>,
        /// Action body
        body: Stmt,
    },
}

/// Typed formal parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Declared type
    pub ty: Type,
    /// Parameter name
    pub name: String,
    /// Source line
    pub line: usize,
}

/// Named expression declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FexprDecl {
    /// Declared name
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// Declared with `const`
    pub constant: bool,
    /// Defining expression
    pub expr: Expr,
    /// Source line
    pub line: usize,
}

/// Statement with its source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Statement body
    pub kind: StmtKind,
    /// Line of the first token
    pub line: usize,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `{ s1 s2 ... }`
    Block(Vec<Stmt>),
    /// `lhs := rhs;`
    Assign {
        /// Target
        lhs: Expr,
        /// Assigned value
        rhs: Expr,
    },
    /// `emit E(args) after e;`
    Emit {
        /// Qualified event name
        event: Vec<String>,
        /// Event arguments
        args: Vec<Expr>,
        /// Delay
        after: Expr,
    },
    /// `print p1, p2, ...;`
    Print(Vec<PrintArg>),
    /// `if (c) s [else s]`
    If {
        /// Condition
        cond: Expr,
        /// Taken when true
        then: Box<Stmt>,
        /// Taken when false
        els: Option<Box<Stmt>>,
    },
    /// Local `let`/`const`
    Fexpr(FexprDecl),
}

/// One part of a `print` statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrintArg {
    /// String literal
    Text(String),
    /// Printed value
    Expr(Expr),
}

/// Expression with its source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Expression body
    pub kind: ExprKind,
    /// Source line
    pub line: usize,
}

impl Expr {
    /// Creates an expression node
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Expr { kind, line }
    }
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// `true` / `false`
    Bool(bool),
    /// Possibly qualified name `a.b.c`
    Name(Vec<String>),
    /// Function or builtin call
    Call {
        /// Qualified callee name
        callee: Vec<String>,
        /// Actual arguments
        args: Vec<Expr>,
    },
    /// Unary operator
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// `(T) e` or `T(e)`
    Cast {
        /// Target type
        ty: Type,
        /// Converted expression
        operand: Box<Expr>,
    },
    /// `c ? a : b`
    Cond {
        /// Selector
        cond: Box<Expr>,
        /// Value when true
        yes: Box<Expr>,
        /// Value when false
        no: Box<Expr>,
    },
    /// `[e1, e2, ...]`
    Array(Vec<Expr>),
    /// `(a, b, ...)` or an assignment right-hand list
    Concat(Vec<Expr>),
    /// `e[sel, ...]`
    Index {
        /// Indexed expression
        base: Box<Expr>,
        /// Per-axis selectors
        selectors: Vec<IndexSel>,
    },
}

/// Selector inside `[...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexSel {
    /// Scalar pick or integer array
    Expr(Expr),
    /// `start:stop:step`
    Slice {
        /// Optional start
        start: Option<Expr>,
        /// Optional stop
        stop: Option<Expr>,
        /// Optional step
        step: Option<Expr>,
    },
    /// `_`
    Full,
    /// `...`
    Ellipsis,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,

    // Bitwise
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,

    // Comparison
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,

    // Logical
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Source symbol
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `~x`
    Invert,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Invert => "~",
        })
    }
}

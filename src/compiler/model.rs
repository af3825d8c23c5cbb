//! Elaborated program model
//!
//! Every module, variable, event, function and action produced by the
//! elaborator lives in one [`Model`] arena and is addressed by a typed id.

use super::expr::ExprRef;
use super::scope::Scopes;
use crate::runtime::Array;
use crate::types::{Shape, Type};
use serde::Serialize;
use std::fmt;

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
            pub struct $name(pub usize);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

arena_id! {
    /// Index into [`Model::modules`]
    ModuleId,
    /// Index into [`Model::variables`]
    VarId,
    /// Index into [`Model::events`]
    EventId,
    /// Index into [`Model::functions`]
    FuncId,
    /// Index into [`Model::fexprs`]
    FexprId,
    /// Index into [`Model::actions`]
    ActionId,
    /// Function parameter identity, unique per model
    ParamId,
    /// Index into the scope arena
    ScopeId,
}

/// Elaborated module
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Module name
    pub name: String,
    /// Top-level scope
    pub scope: ScopeId,
    /// Imported modules, in import order
    pub imports: Vec<ModuleId>,
    /// Events declared here
    pub events: Vec<EventId>,
    /// Variables declared here, including hidden event parameters
    pub variables: Vec<VarId>,
    /// Actions declared here, in declaration order
    pub actions: Vec<ActionId>,
}

/// Mutable state cell
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub module: ModuleId,
    pub ty: Type,
    pub shape: Shape,
    /// Initial value, already cast to `ty` and of shape `shape`
    pub init: Array,
    /// Set for the hidden variable backing an event parameter
    pub event: Option<EventId>,
    pub line: usize,
}

/// Event declaration
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub module: ModuleId,
    /// Parameter names and types
    pub params: Vec<(String, Type)>,
    /// Hidden scalar variables, one per parameter
    pub vars: Vec<VarId>,
    pub line: usize,
}

/// Function template
///
/// `body` mentions [`ParamId`]s of `params` and is already cast to `ret`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub module: ModuleId,
    pub ret: Type,
    pub params: Vec<(String, Type, ParamId)>,
    pub body: ExprRef,
    pub line: usize,
}

/// Named expression
#[derive(Debug, Clone)]
pub struct Fexpr {
    pub name: String,
    pub ty: Type,
    pub constant: bool,
    pub expr: ExprRef,
    pub line: usize,
}

/// Statement attached to an event
#[derive(Debug, Clone)]
pub struct Action {
    pub module: ModuleId,
    pub event: EventId,
    pub body: Stmt,
    pub line: usize,
}

/// Elaborated statement
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

/// Target of an assignment: a variable reference, or an index of one
#[derive(Debug, Clone)]
pub struct Lvalue {
    pub var: VarId,
    pub expr: ExprRef,
}

/// Elaborated print part
#[derive(Debug, Clone)]
pub enum PrintPart {
    Text(String),
    Expr(ExprRef),
}

/// Elaborated statement kinds
#[derive(Debug, Clone)]
pub enum StmtKind {
    Assign { lhs: Lvalue, rhs: ExprRef },
    Emit { event: EventId, args: Vec<ExprRef>, after: ExprRef },
    Print(Vec<PrintPart>),
    If { cond: ExprRef, then: Box<Stmt>, els: Option<Box<Stmt>> },
    Block(Vec<Stmt>),
    /// Local declaration; it only affects scoping
    Fexpr(FexprId),
}

/// The elaborated program: arenas for every entity
#[derive(Debug, Default)]
pub struct Model {
    pub scopes: Scopes,
    pub modules: Vec<ModuleInfo>,
    pub variables: Vec<Variable>,
    pub events: Vec<Event>,
    pub functions: Vec<Function>,
    pub fexprs: Vec<Fexpr>,
    pub actions: Vec<Action>,
    next_param: usize,
}

impl Model {
    /// Creates an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module with a fresh scope under `parent`
    pub fn add_module(&mut self, name: &str, parent: Option<ScopeId>) -> ModuleId {
        let scope = self.scopes.new_scope(parent);
        self.modules.push(ModuleInfo {
            name: name.to_string(),
            scope,
            imports: Vec::new(),
            events: Vec::new(),
            variables: Vec::new(),
            actions: Vec::new(),
        });
        ModuleId(self.modules.len() - 1)
    }

    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        let id = VarId(self.variables.len());
        self.modules[variable.module.0].variables.push(id);
        self.variables.push(variable);
        id
    }

    pub fn add_event(&mut self, event: Event) -> EventId {
        let id = EventId(self.events.len());
        self.modules[event.module.0].events.push(id);
        self.events.push(event);
        id
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        self.functions.push(function);
        FuncId(self.functions.len() - 1)
    }

    pub fn add_fexpr(&mut self, fexpr: Fexpr) -> FexprId {
        self.fexprs.push(fexpr);
        FexprId(self.fexprs.len() - 1)
    }

    pub fn add_action(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.actions.len());
        self.modules[action.module.0].actions.push(id);
        self.actions.push(action);
        id
    }

    /// Fresh parameter identity
    pub fn new_param(&mut self) -> ParamId {
        self.next_param += 1;
        ParamId(self.next_param - 1)
    }

    pub fn module(&self, id: ModuleId) -> &ModuleInfo {
        &self.modules[id.0]
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn event(&self, id: EventId) -> &Event {
        &self.events[id.0]
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0]
    }

    pub fn fexpr(&self, id: FexprId) -> &Fexpr {
        &self.fexprs[id.0]
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    /// `module.name` of a variable
    pub fn qualified_variable(&self, id: VarId) -> String {
        let var = self.variable(id);
        match var.event {
            Some(event) => format!("{}.{}", self.qualified_event(event), var.name),
            None => format!("{}.{}", self.module(var.module).name, var.name),
        }
    }

    /// `module.name` of an event
    pub fn qualified_event(&self, id: EventId) -> String {
        let event = self.event(id);
        format!("{}.{}", self.module(event.module).name, event.name)
    }
}


//! Lexical scopes
//!
//! Scopes form a tree stored in one arena. Every module scope has the
//! system scope as its parent, and action, function and block scopes hang
//! below their module scope.

use super::expr::ExprRef;
use super::model::{EventId, FexprId, FuncId, ModuleId, ScopeId, VarId};
use crate::builtins::Builtin;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Anything a name can be bound to
#[derive(Debug, Clone)]
pub enum Symbol {
    Variable(VarId),
    Event(EventId),
    Function(FuncId),
    Fexpr(FexprId),
    Module(ModuleId),
    Builtin(Arc<dyn Builtin>),
    /// Function parameter leaf
    Parameter(ExprRef),
}

impl Symbol {
    /// Kind of entity, for messages
    pub fn describe(&self) -> &'static str {
        match self {
            Symbol::Variable(_) => "variable",
            Symbol::Event(_) => "event",
            Symbol::Function(_) => "function",
            Symbol::Fexpr(_) => "expression",
            Symbol::Module(_) => "module",
            Symbol::Builtin(_) => "builtin",
            Symbol::Parameter(_) => "parameter",
        }
    }
}

/// Single scope in the tree
#[derive(Debug, Default)]
struct Scope {
    /// Names bound here, in binding order
    names: IndexMap<String, Symbol>,
    /// Enclosing scope (None for the system scope)
    parent: Option<ScopeId>,
}

/// Arena of scopes
#[derive(Debug, Default)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    /// Creates an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope below `parent`
    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope {
            names: IndexMap::new(),
            parent,
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Binds a name in `scope`; redefinition in the same scope is an error
    pub fn bind(&mut self, scope: ScopeId, name: &str, symbol: Symbol) -> Result<()> {
        let names = &mut self.scopes[scope.0].names;
        if let Some(previous) = names.get(name) {
            return Err(Error::name(format!(
                "'{}' is already defined as a {} in this scope",
                name,
                previous.describe()
            )));
        }
        names.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Name bound directly in `scope`
    pub fn local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope.0].names.get(name)
    }

    /// Walks the scope chain from `scope` outwards
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.0];
            if let Some(symbol) = s.names.get(name) {
                return Some(symbol);
            }
            current = s.parent;
        }
        None
    }

    /// Enclosing scope
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Names bound directly in `scope`, in binding order
    pub fn names(&self, scope: ScopeId) -> impl Iterator<Item = &str> {
        self.scopes[scope.0].names.keys().map(String::as_str)
    }
}

//! Module factory
//!
//! Resolves module names to elaborated modules. Each module is fetched,
//! parsed and elaborated once; imports are loaded recursively while the
//! importing module is marked as *forward*, so meeting a forward mark again
//! is an import cycle. Modules are registered in completion order, which
//! puts every module after the modules it imports.

use super::elaborate::Elaborator;
use super::model::{Event, EventId, Model, ModuleId, ModuleInfo, ScopeId};
use super::scope::Symbol;
use super::sources::SourceFetcher;
use crate::builtins::{BuiltinRegistry, NowBuiltin};
use crate::diagnostics::{Diagnostics, Origin};
use crate::error::{Error, Result};
use crate::lexer::Scanner;
use crate::parser::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Name of the system module
pub const SYSTEM_MODULE: &str = "sys";

/// Load state of a module name
#[derive(Debug, Clone)]
enum ModuleState {
    /// Elaboration in progress
    Forward,
    Ready(ModuleId),
    Failed(Error),
}

/// Loads, elaborates and memoizes modules
pub struct ModelFactory {
    fetcher: Box<dyn SourceFetcher>,
    pub(crate) model: Model,
    states: HashMap<String, ModuleState>,
    order: Vec<ModuleId>,
    pub(crate) diagnostics: Diagnostics,
    system: ModuleId,
    init: EventId,
}

impl ModelFactory {
    /// Factory over `fetcher` with the standard builtin library
    pub fn new(fetcher: impl SourceFetcher + 'static) -> Self {
        Self::with_builtins(fetcher, BuiltinRegistry::new())
    }

    /// Factory over `fetcher` with a custom builtin library
    pub fn with_builtins(fetcher: impl SourceFetcher + 'static, builtins: BuiltinRegistry) -> Self {
        let mut model = Model::new();
        let mut diagnostics = Diagnostics::new();
        let system = model.add_module(SYSTEM_MODULE, None);
        let init = model.add_event(Event {
            name: "Init".to_string(),
            module: system,
            params: Vec::new(),
            vars: Vec::new(),
            line: 0,
        });

        let scope = model.module(system).scope;
        let mut symbols = vec![
            (SYSTEM_MODULE.to_string(), Symbol::Module(system)),
            ("Init".to_string(), Symbol::Event(init)),
            ("now".to_string(), Symbol::Builtin(Arc::new(NowBuiltin))),
        ];
        for name in builtins.names() {
            if let Some(builtin) = builtins.get(&name) {
                symbols.push((name, Symbol::Builtin(builtin)));
            }
        }
        for (name, symbol) in symbols {
            if let Err(e) = model.scopes.bind(scope, &name, symbol) {
                diagnostics.error(Some(Origin::new(SYSTEM_MODULE, 0)), &e);
            }
        }

        let mut states = HashMap::new();
        states.insert(SYSTEM_MODULE.to_string(), ModuleState::Ready(system));
        ModelFactory {
            fetcher: Box::new(fetcher),
            model,
            states,
            order: vec![system],
            diagnostics,
            system,
            init,
        }
    }

    /// Returns the elaborated module `name`, loading it on first request
    pub fn get_model(&mut self, name: &str) -> Result<ModuleId> {
        match self.states.get(name) {
            Some(ModuleState::Ready(id)) => return Ok(*id),
            Some(ModuleState::Forward) => {
                return Err(Error::ImportCycleError {
                    module: name.to_string(),
                })
            }
            Some(ModuleState::Failed(err)) => return Err(err.clone()),
            None => {}
        }

        self.states.insert(name.to_string(), ModuleState::Forward);
        let result = self.load(name);
        let state = match &result {
            Ok(id) => {
                self.order.push(*id);
                ModuleState::Ready(*id)
            }
            Err(err) => ModuleState::Failed(err.clone()),
        };
        self.states.insert(name.to_string(), state);
        result
    }

    fn load(&mut self, name: &str) -> Result<ModuleId> {
        let source = self.fetcher.fetch(name)?;
        debug!(module = name, bytes = source.len(), "fetched module");
        self.compile(name, &source)
    }

    fn compile(&mut self, name: &str, source: &str) -> Result<ModuleId> {
        let failed = || Error::CompilationFailed {
            module: name.to_string(),
        };

        let tokens = match Scanner::new(source).scan_tokens() {
            Ok(tokens) => tokens,
            Err(e) => {
                let origin = Origin::new(name, e.line().unwrap_or(0));
                self.diagnostics.error(Some(origin), &e);
                return Err(failed());
            }
        };

        let (ast, errors) = Parser::new(tokens).parse_module();
        if !errors.is_empty() {
            for e in &errors {
                self.diagnostics.error(Some(Origin::new(name, e.line().unwrap_or(0))), e);
            }
            return Err(failed());
        }
        debug!(module = name, decls = ast.decls.len(), "parsed module");

        let errors_before = self.diagnostics.error_count();
        let id = Elaborator::new(self, name).elaborate(&ast);
        if self.diagnostics.error_count() > errors_before {
            return Err(failed());
        }
        debug!(module = name, "elaborated module");
        Ok(id)
    }

    /// Successfully elaborated modules in registration order, system module first
    pub fn order(&self) -> &[ModuleId] {
        &self.order
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn module(&self, id: ModuleId) -> &ModuleInfo {
        self.model.module(id)
    }

    /// Module id of a registered module name
    pub fn lookup_module(&self, name: &str) -> Option<ModuleId> {
        match self.states.get(name) {
            Some(ModuleState::Ready(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn system_module(&self) -> ModuleId {
        self.system
    }

    pub(crate) fn system_scope(&self) -> ScopeId {
        self.model.module(self.system).scope
    }

    /// The `Init` event of the system module
    pub fn init_event(&self) -> EventId {
        self.init
    }
}

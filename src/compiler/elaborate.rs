//! Elaborator: AST to typed, shape-checked IR
//!
//! Walks one parsed module inside a tree of lexical scopes. Every
//! declaration is elaborated independently: a failure is recorded with its
//! source line and the walk moves on to the next declaration, so one pass
//! reports as many errors as possible. Inside blocks the same applies per
//! statement. A node that fails is dropped, never built with partial
//! metadata.

use super::expr::{Expr, ExprRef, Selector};
use super::factory::ModelFactory;
use super::model::{
    Action, Event, EventId, Fexpr, FexprId, Function, Lvalue, ModuleId, PrintPart, ScopeId, Stmt,
    StmtKind, Variable,
};
use super::scope::Symbol;
use crate::diagnostics::Origin;
use crate::error::{Error, Result};
use crate::parser::{self as ast, DeclKind, IndexSel, PrintArg};
use crate::runtime::Array;
use crate::types::{broadcastable_into, Shape, Type};
use std::collections::HashMap;
use tracing::debug;

/// Elaborates one module into the factory's model
pub struct Elaborator<'f> {
    factory: &'f mut ModelFactory,
    module: ModuleId,
    name: String,
    /// Line of the declaration or statement being elaborated
    line: usize,
}

impl<'f> Elaborator<'f> {
    /// Registers a fresh module `name` below the system scope
    pub fn new(factory: &'f mut ModelFactory, name: &str) -> Self {
        let system = factory.system_scope();
        let module = factory.model.add_module(name, Some(system));
        Elaborator {
            factory,
            module,
            name: name.to_string(),
            line: 0,
        }
    }

    /// Elaborates every declaration; errors land in the factory diagnostics
    pub fn elaborate(mut self, module: &ast::Module) -> ModuleId {
        let scope = self.scope();
        for decl in &module.decls {
            self.line = decl.line;
            if let Err(e) = self.declaration(scope, &decl.kind) {
                self.record(&e);
            }
        }
        self.module
    }

    fn record(&mut self, err: &Error) {
        let origin = Origin::new(&self.name, err.line().unwrap_or(self.line));
        self.factory.diagnostics.error(Some(origin), err);
    }

    fn scope(&self) -> ScopeId {
        self.factory.model.module(self.module).scope
    }

    fn child_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.factory.model.scopes.new_scope(Some(parent))
    }

    fn bind(&mut self, scope: ScopeId, name: &str, symbol: Symbol) -> Result<()> {
        self.factory.model.scopes.bind(scope, name, symbol)
    }

    fn import(&mut self, module: &str) -> Result<ModuleId> {
        let id = self.factory.get_model(module)?;
        self.factory.model.modules[self.module.0].imports.push(id);
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    fn declaration(&mut self, scope: ScopeId, decl: &DeclKind) -> Result<()> {
        match decl {
            DeclKind::Import { module, alias } => {
                let id = self.import(module)?;
                self.bind(scope, alias, Symbol::Module(id))
            }
            DeclKind::From { module, names } => {
                let id = self.import(module)?;
                let source = self.factory.model.module(id).scope;
                for name in names {
                    let symbol = self
                        .factory
                        .model
                        .scopes
                        .local(source, name)
                        .cloned()
                        .ok_or_else(|| Error::name(format!("module '{}' has no name '{}'", module, name)))?;
                    self.bind(scope, name, symbol)?;
                }
                Ok(())
            }
            DeclKind::Event { name, params } => self.event(scope, name, params),
            DeclKind::Func {
                name,
                ret,
                params,
                locals,
                body,
            } => self.function(scope, name, *ret, params, locals, body),
            DeclKind::Fexpr(decl) => self.fexpr(scope, decl).map(|_| ()),
            DeclKind::Var { name, ty, init } => self.variable(scope, name, *ty, init),
            DeclKind::Action { event, body } => self.action(scope, event, body),
        }
    }

    fn event(&mut self, scope: ScopeId, name: &str, params: &[ast::Param]) -> Result<()> {
        let mut seen = Vec::with_capacity(params.len());
        for p in params {
            if seen.contains(&p.name.as_str()) {
                return Err(Error::name(format!("duplicate parameter '{}' of event {}", p.name, name)));
            }
            seen.push(p.name.as_str());
        }

        let event = self.factory.model.add_event(Event {
            name: name.to_string(),
            module: self.module,
            params: params.iter().map(|p| (p.name.clone(), p.ty)).collect(),
            vars: Vec::new(),
            line: self.line,
        });
        let vars: Vec<_> = params
            .iter()
            .map(|p| {
                self.factory.model.add_variable(Variable {
                    name: p.name.clone(),
                    module: self.module,
                    ty: p.ty,
                    shape: Shape::scalar(),
                    init: Array::zeros(p.ty, Shape::scalar()),
                    event: Some(event),
                    line: p.line,
                })
            })
            .collect();
        self.factory.model.events[event.0].vars = vars;
        self.bind(scope, name, Symbol::Event(event))
    }

    fn function(
        &mut self,
        scope: ScopeId,
        name: &str,
        ret: Type,
        params: &[ast::Param],
        locals: &[ast::FexprDecl],
        body: &ast::Expr,
    ) -> Result<()> {
        let inner = self.child_scope(scope);
        let mut formals = Vec::with_capacity(params.len());
        for p in params {
            let id = self.factory.model.new_param();
            self.bind(inner, &p.name, Symbol::Parameter(Expr::parameter(id, &p.name, p.ty)))?;
            formals.push((p.name.clone(), p.ty, id));
        }
        for local in locals {
            self.fexpr(inner, local)?;
        }

        let body = self.expr(inner, body)?;
        let body = coerce(body, ret, || format!("function {} returns {}", name, ret))?;
        let id = self.factory.model.add_function(Function {
            name: name.to_string(),
            module: self.module,
            ret,
            params: formals,
            body,
            line: self.line,
        });
        self.bind(scope, name, Symbol::Function(id))
    }

    fn fexpr(&mut self, scope: ScopeId, decl: &ast::FexprDecl) -> Result<FexprId> {
        let expr = self.expr(scope, &decl.expr)?;
        let expr = coerce(expr, decl.ty, || format!("'{}' is declared {}", decl.name, decl.ty))?;
        if decl.constant && expr.constant == Some(false) {
            return Err(Error::constant(format!("'{}' is declared const but its value is not", decl.name)));
        }
        let id = self.factory.model.add_fexpr(Fexpr {
            name: decl.name.clone(),
            ty: decl.ty,
            constant: decl.constant,
            expr,
            line: decl.line,
        });
        self.bind(scope, &decl.name, Symbol::Fexpr(id))?;
        Ok(id)
    }

    fn variable(&mut self, scope: ScopeId, name: &str, ty: Type, init: &ast::Expr) -> Result<()> {
        let expr = self.expr(scope, init)?;
        let value = match (&expr.value, expr.constant) {
            (Some(value), Some(true)) => value.clone(),
            _ => {
                return Err(Error::constant(format!(
                    "initializer of variable '{}' is not constant",
                    name
                )))
            }
        };
        if !expr.ty.auto_castable(ty) {
            return Err(Error::type_error(format!(
                "cannot initialize {} variable '{}' with a {} value",
                ty, name, expr.ty
            )));
        }
        let id = self.factory.model.add_variable(Variable {
            name: name.to_string(),
            module: self.module,
            ty,
            shape: value.shape().clone(),
            init: value.cast(ty),
            event: None,
            line: self.line,
        });
        self.bind(scope, name, Symbol::Variable(id))
    }

    fn action(&mut self, scope: ScopeId, path: &[String], body: &ast::Stmt) -> Result<()> {
        let event = self.event_of(scope, path)?;
        let inner = self.child_scope(scope);
        let info = self.factory.model.event(event);
        let params: Vec<_> = info
            .params
            .iter()
            .map(|(name, _)| name.clone())
            .zip(info.vars.iter().copied())
            .collect();
        for (name, var) in params {
            self.bind(inner, &name, Symbol::Variable(var))?;
        }

        let body = self.stmt(inner, body)?;
        self.factory.model.add_action(Action {
            module: self.module,
            event,
            body,
            line: self.line,
        });
        debug!(module = %self.name, event = %path.join("."), "elaborated action");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Names
    // ---------------------------------------------------------------

    /// Resolves `a.b.c`: the first part through the scope chain, the rest
    /// inside module scopes
    fn resolve(&self, scope: ScopeId, path: &[String]) -> Result<Symbol> {
        let scopes = &self.factory.model.scopes;
        let dotted = || path.join(".");
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| Error::name("empty name"))?;
        let mut symbol = scopes
            .lookup(scope, first)
            .cloned()
            .ok_or_else(|| Error::name(format!("'{}' is not defined", first)))?;
        for part in rest {
            let module = match &symbol {
                Symbol::Module(m) => *m,
                other => {
                    return Err(Error::type_error(format!(
                        "'{}' in '{}' is a {}, not a module",
                        part,
                        dotted(),
                        other.describe()
                    )))
                }
            };
            let module_scope = self.factory.model.module(module).scope;
            symbol = scopes
                .local(module_scope, part)
                .cloned()
                .ok_or_else(|| Error::name(format!("'{}' is not defined", dotted())))?;
        }
        Ok(symbol)
    }

    fn event_of(&self, scope: ScopeId, path: &[String]) -> Result<EventId> {
        match self.resolve(scope, path)? {
            Symbol::Event(event) => Ok(event),
            other => Err(Error::type_error(format!(
                "'{}' is a {}, not an event",
                path.join("."),
                other.describe()
            ))),
        }
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn stmt(&mut self, scope: ScopeId, stmt: &ast::Stmt) -> Result<Stmt> {
        self.line = stmt.line;
        let line = stmt.line;
        let kind = match &stmt.kind {
            ast::StmtKind::Block(stmts) => {
                let inner = self.child_scope(scope);
                let mut body = Vec::with_capacity(stmts.len());
                for s in stmts {
                    match self.stmt(inner, s) {
                        Ok(s) => body.push(s),
                        Err(e) => self.record(&e),
                    }
                }
                StmtKind::Block(body)
            }
            ast::StmtKind::Assign { lhs, rhs } => {
                let target = self.expr(scope, lhs)?;
                let rhs = self.expr(scope, rhs)?;
                self.line = line;
                assignment(target, rhs)?
            }
            ast::StmtKind::Emit { event, args, after } => {
                let event = self.event_of(scope, event)?;
                let args = args
                    .iter()
                    .map(|a| self.expr(scope, a))
                    .collect::<Result<Vec<_>>>()?;
                let after = self.expr(scope, after)?;
                self.line = line;
                self.emit(event, args, after)?
            }
            ast::StmtKind::Print(parts) => {
                let mut out = Vec::with_capacity(parts.len());
                for part in parts {
                    out.push(match part {
                        PrintArg::Text(text) => PrintPart::Text(text.clone()),
                        PrintArg::Expr(e) => PrintPart::Expr(self.expr(scope, e)?),
                    });
                }
                StmtKind::Print(out)
            }
            ast::StmtKind::If { cond, then, els } => {
                let cond = self.expr(scope, cond)?;
                if !cond.is_scalar() || cond.ty != Type::Bool {
                    return Err(Error::type_error(format!(
                        "if condition must be a scalar bool, found {} of shape {}",
                        cond.ty,
                        shape_text(&cond)
                    )));
                }
                let then_scope = self.child_scope(scope);
                let then = Box::new(self.stmt(then_scope, then)?);
                let els = match els {
                    Some(els) => {
                        let else_scope = self.child_scope(scope);
                        Some(Box::new(self.stmt(else_scope, els)?))
                    }
                    None => None,
                };
                StmtKind::If { cond, then, els }
            }
            ast::StmtKind::Fexpr(decl) => StmtKind::Fexpr(self.fexpr(scope, decl)?),
        };
        Ok(Stmt { kind, line })
    }

    fn emit(&self, event: EventId, args: Vec<ExprRef>, after: ExprRef) -> Result<StmtKind> {
        let info = self.factory.model.event(event);
        if args.len() != info.params.len() {
            return Err(Error::type_error(format!(
                "event {} takes {} arguments ({} given)",
                info.name,
                info.params.len(),
                args.len()
            )));
        }
        let mut cast_args = Vec::with_capacity(args.len());
        for (arg, (param, ty)) in args.into_iter().zip(&info.params) {
            cast_args.push(scalar_arg(arg, *ty, || format!("argument '{}' of event {}", param, info.name))?);
        }
        let after = scalar_arg(after, Type::Time, || "emit delay".to_string())?;
        Ok(StmtKind::Emit {
            event,
            args: cast_args,
            after,
        })
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn expr(&mut self, scope: ScopeId, expr: &ast::Expr) -> Result<ExprRef> {
        match &expr.kind {
            ast::ExprKind::Integer(i) => Ok(Expr::literal(Array::int(*i))),
            ast::ExprKind::Float(f) => Ok(Expr::literal(Array::real(*f))),
            ast::ExprKind::Bool(b) => Ok(Expr::literal(Array::bool(*b))),
            ast::ExprKind::Name(path) => self.name(scope, path),
            ast::ExprKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.expr(scope, a))
                    .collect::<Result<Vec<_>>>()?;
                self.call(scope, callee, args)
            }
            ast::ExprKind::Unary { op, operand } => Expr::unary(*op, self.expr(scope, operand)?),
            ast::ExprKind::Binary { op, left, right } => {
                let left = self.expr(scope, left)?;
                let right = self.expr(scope, right)?;
                Expr::binary(*op, left, right)
            }
            ast::ExprKind::Cast { ty, operand } => Expr::cast(*ty, self.expr(scope, operand)?),
            ast::ExprKind::Cond { cond, yes, no } => {
                let cond = self.expr(scope, cond)?;
                let yes = self.expr(scope, yes)?;
                let no = self.expr(scope, no)?;
                Expr::cond(cond, yes, no)
            }
            ast::ExprKind::Array(items) => {
                let items = items
                    .iter()
                    .map(|i| self.expr(scope, i))
                    .collect::<Result<Vec<_>>>()?;
                Expr::array(items)
            }
            ast::ExprKind::Concat(items) => {
                let mut items = items
                    .iter()
                    .map(|i| self.expr(scope, i))
                    .collect::<Result<Vec<_>>>()?;
                if items.len() == 1 {
                    return Ok(items.remove(0));
                }
                Expr::concat(items)
            }
            ast::ExprKind::Index { base, selectors } => {
                let base = self.expr(scope, base)?;
                let mut out = Vec::with_capacity(selectors.len());
                for selector in selectors {
                    out.push(self.selector(scope, selector)?);
                }
                Expr::index(base, out)
            }
        }
    }

    fn optional(&mut self, scope: ScopeId, expr: &Option<ast::Expr>) -> Result<Option<ExprRef>> {
        match expr {
            Some(e) => Ok(Some(self.expr(scope, e)?)),
            None => Ok(None),
        }
    }

    fn selector(&mut self, scope: ScopeId, selector: &IndexSel) -> Result<Selector> {
        Ok(match selector {
            IndexSel::Expr(e) => Selector::Expr(self.expr(scope, e)?),
            IndexSel::Slice { start, stop, step } => Selector::Slice {
                start: self.optional(scope, start)?,
                stop: self.optional(scope, stop)?,
                step: self.optional(scope, step)?,
            },
            IndexSel::Full => Selector::Full,
            IndexSel::Ellipsis => Selector::Ellipsis,
        })
    }

    fn name(&self, scope: ScopeId, path: &[String]) -> Result<ExprRef> {
        let model = &self.factory.model;
        match self.resolve(scope, path)? {
            Symbol::Variable(v) => {
                let var = model.variable(v);
                Ok(Expr::var_ref(v, var.ty, var.shape.clone()))
            }
            Symbol::Fexpr(f) => Ok(model.fexpr(f).expr.clone()),
            Symbol::Parameter(expr) => Ok(expr),
            Symbol::Builtin(builtin) if builtin.arity() == 0 => Expr::builtin(builtin, Vec::new()),
            other => Err(Error::type_error(format!(
                "'{}' is a {}, not a value",
                path.join("."),
                other.describe()
            ))),
        }
    }

    fn call(&self, scope: ScopeId, callee: &[String], args: Vec<ExprRef>) -> Result<ExprRef> {
        match self.resolve(scope, callee)? {
            Symbol::Builtin(builtin) => Expr::builtin(builtin, args),
            Symbol::Function(f) => {
                let function = self.factory.model.function(f);
                if args.len() != function.params.len() {
                    return Err(Error::type_error(format!(
                        "function {} takes {} arguments ({} given)",
                        function.name,
                        function.params.len(),
                        args.len()
                    )));
                }
                let mut params = HashMap::with_capacity(args.len());
                for (arg, (name, ty, id)) in args.into_iter().zip(&function.params) {
                    let arg = coerce(arg, *ty, || format!("parameter '{}' of {} is {}", name, function.name, ty))?;
                    params.insert(*id, arg);
                }
                function.body.bind(&params)
            }
            other => Err(Error::type_error(format!(
                "'{}' is a {}, not callable",
                callee.join("."),
                other.describe()
            ))),
        }
    }
}

/// Auto-cast check followed by the cast itself
fn coerce(expr: ExprRef, ty: Type, context: impl FnOnce() -> String) -> Result<ExprRef> {
    if !expr.ty.auto_castable(ty) {
        return Err(Error::type_error(format!("{}: cannot convert {} implicitly", context(), expr.ty)));
    }
    Expr::cast(ty, expr)
}

fn scalar_arg(expr: ExprRef, ty: Type, context: impl FnOnce() -> String) -> Result<ExprRef> {
    if !expr.is_scalar() {
        return Err(Error::type_error(format!(
            "{} must be a scalar, found shape {}",
            context(),
            shape_text(&expr)
        )));
    }
    coerce(expr, ty, context)
}

fn shape_text(expr: &Expr) -> String {
    expr.shape.as_ref().map_or_else(|| "?".to_string(), |s| s.to_string())
}

fn assignment(target: ExprRef, rhs: ExprRef) -> Result<StmtKind> {
    let var = match target.lvalue_var() {
        Some(var) if target.is_lvalue() => var,
        _ => return Err(Error::type_error("left side of ':=' is not assignable")),
    };
    if !rhs.ty.auto_castable(target.ty) {
        return Err(Error::type_error(format!(
            "cannot assign a {} value to a {} target",
            rhs.ty, target.ty
        )));
    }
    match (&target.shape, &rhs.shape) {
        (Some(lhs), Some(r)) if broadcastable_into(lhs, r) => {}
        _ => {
            return Err(Error::shape(format!(
                "cannot assign shape {} to shape {}",
                shape_text(&rhs),
                shape_text(&target)
            )))
        }
    }
    let rhs = Expr::cast(target.ty, rhs)?;
    Ok(StmtKind::Assign {
        lhs: Lvalue { var, expr: target },
        rhs,
    })
}

#[cfg(test)]
mod tests {
    use crate::compiler::{MemorySources, ModelFactory, StmtKind};
    use crate::error::ErrorKind;
    use crate::runtime::Array;
    use crate::types::{Shape, Type};

    fn compile(source: &str) -> (ModelFactory, Result<crate::compiler::ModuleId, crate::error::Error>) {
        let mut factory = ModelFactory::new(MemorySources::new().with("main", source));
        let result = factory.get_model("main");
        (factory, result)
    }

    fn errors(source: &str) -> Vec<ErrorKind> {
        let (factory, result) = compile(source);
        assert!(result.is_err(), "expected {:?} to fail", source);
        factory.diagnostics().error_kinds()
    }

    fn variable_init(source: &str, name: &str) -> Array {
        let (factory, result) = compile(source);
        let id = result.unwrap();
        let model = factory.model();
        let var = model
            .module(id)
            .variables
            .iter()
            .map(|v| model.variable(*v))
            .find(|v| v.name == name)
            .unwrap();
        var.init.clone()
    }

    #[test]
    fn test_variable_initializers() {
        let init = variable_init("const int n = 3; var real v = fill(n, 1);", "v");
        assert_eq!(init.ty(), Type::Real);
        assert_eq!(init.shape(), &Shape::vector(3));
        assert_eq!(init.to_f64_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_function_inlining() {
        let source = "func int twice(int x) { let int y = x + x; y } var int v = twice([1, 2]);";
        assert_eq!(variable_init(source, "v").to_i64_vec(), vec![2, 4]);
        // arguments are cast to the formal type, the result to the return type
        let source = "func real half(real x) { x / 2 } var real h = half(3);";
        assert_eq!(variable_init(source, "h"), Array::real(1.5));
    }

    #[test]
    fn test_imports_and_aliases() {
        let sources = MemorySources::new()
            .with("main", "import l = lib; from lib import k; var int a = l.k + k;")
            .with("lib", "const int k = 2;");
        let mut factory = ModelFactory::new(sources);
        let id = factory.get_model("main").unwrap();
        let model = factory.model();
        let var = model.variable(model.module(id).variables[0]);
        assert_eq!(var.init, Array::int(4));
    }

    #[test]
    fn test_shadowing_builtins() {
        let init = variable_init("func int sum(int a, int b) { a + b } var int s = sum(1, 2);", "s");
        assert_eq!(init, Array::int(3));
    }

    #[test]
    fn test_event_parameters() {
        let (factory, result) = compile("event ping(int n, real x); on ping { print n, x; }");
        let id = result.unwrap();
        let model = factory.model();
        let event = model.event(model.module(id).events[0]);
        assert_eq!(event.vars.len(), 2);
        assert_eq!(model.qualified_variable(event.vars[1]), "main.ping.x");
        assert_eq!(model.module(id).actions.len(), 1);
    }

    #[test]
    fn test_statement_checks() {
        let (factory, result) = compile("var int v = [0, 0]; on Init { v[0] := 1; v := 2.0 > 1.0 ? 1 : 0; }");
        let id = result.unwrap();
        let model = factory.model();
        let action = model.action(model.module(id).actions[0]);
        match &action.body.kind {
            StmtKind::Block(stmts) => assert_eq!(stmts.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_kinds() {
        assert!(errors("var int a = b;").contains(&ErrorKind::NameError));
        assert!(errors("var int a = 0; var int b = a;").contains(&ErrorKind::ConstError));
        assert!(errors("var bool a = true; on Init a := 1;").contains(&ErrorKind::TypeError));
        assert!(errors("var int v = [1, 2]; on Init v := [1, 2, 3];").contains(&ErrorKind::ShapeError));
        assert!(errors("var int a = 0; on Init if (a) print a;").contains(&ErrorKind::TypeError));
        assert!(errors("event e(int x); on Init emit e() after 1;").contains(&ErrorKind::TypeError));
        assert!(errors("event e(); on Init emit e() after [1, 2];").contains(&ErrorKind::TypeError));
        assert!(errors("let int b = [1, 2][5];").contains(&ErrorKind::IndexError));
        assert!(errors("var int a = 1; var int a = 2;").contains(&ErrorKind::NameError));
        assert!(errors("on Init 1 := 2;").contains(&ErrorKind::TypeError));
        assert!(errors("var int a = 0; on a print 1;").contains(&ErrorKind::TypeError));
        assert!(errors("var int a = 0; const int c = a + 1;").contains(&ErrorKind::ConstError));
    }

    #[test]
    fn test_errors_are_collected_per_declaration() {
        let (factory, _) = compile("var int a = x;\nvar int b = y;\nvar int c = 1;");
        let messages = factory.diagnostics().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].origin.as_ref().unwrap().line, 2);
    }

    #[test]
    fn test_recursive_call_is_undefined() {
        assert!(errors("func int f(int x) { f(x) }").contains(&ErrorKind::NameError));
    }
}

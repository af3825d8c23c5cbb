//! Lowering: elaborated IR to stack-machine programs
//!
//! Programs run back to front (see [`crate::runtime::Instr`]), so every
//! sequence here is written as *operation, then operands*: a call comes
//! first and the code computing its first operand comes right after it,
//! which leaves that operand on top of the data stack when the call runs.

use super::expr::{ExprKind, ExprRef};
use super::factory::ModelFactory;
use super::model::{EventId, Model, ModuleId, PrintPart, Stmt, StmtKind, VarId};
use crate::diagnostics::Origin;
use crate::error::{Error, Result};
use crate::runtime::{Array, Func, Instr, Program, Selection, Value};
use std::sync::Arc;
use tracing::debug;

/// Storage slot of a variable in the lowered program
#[derive(Debug, Clone)]
pub struct VarInfo {
    /// `module.name`, or `module.Event.param` for event parameters
    pub qualified: String,
    pub init: Array,
}

/// Dispatch entry of an event
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub module: String,
    pub name: String,
    /// Hidden parameter variables, written before the program runs
    pub params: Vec<VarId>,
    /// All actions of the event, in dispatch order
    pub program: Arc<Program>,
}

impl EventInfo {
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

/// Everything the stack machine needs to run a model
///
/// Variables and events are indexed by their model ids.
#[derive(Debug, Clone)]
pub struct Executable {
    pub variables: Vec<VarInfo>,
    pub events: Vec<EventInfo>,
    pub init_event: EventId,
}

impl Executable {
    /// Variable by qualified name
    pub fn variable_id(&self, qualified: &str) -> Option<VarId> {
        self.variables
            .iter()
            .position(|v| v.qualified == qualified)
            .map(VarId)
    }

    pub fn event(&self, id: EventId) -> &EventInfo {
        &self.events[id.0]
    }

    /// Event by qualified name
    pub fn event_id(&self, qualified: &str) -> Option<EventId> {
        self.events
            .iter()
            .position(|e| e.qualified() == qualified)
            .map(EventId)
    }
}

/// Lowers every registered module of `factory`
///
/// Actions of one event run in module registration order, then in
/// declaration order inside a module.
pub fn lower(factory: &ModelFactory) -> Result<Executable> {
    let model = factory.model();
    let lowerer = Lowerer { model };

    let mut actions: Vec<Vec<Arc<Program>>> = vec![Vec::new(); model.events.len()];
    for module in factory.order() {
        for action_id in &model.module(*module).actions {
            let action = model.action(*action_id);
            let label = format!("{}({})", model.module(action.module).name, action.line);
            let program = Program::new(label, lowerer.stmt(*module, &action.body)?);
            actions[action.event.0].push(Arc::new(program));
        }
    }

    let events = model
        .events
        .iter()
        .zip(actions)
        .enumerate()
        .map(|(id, (event, programs))| {
            let qualified = model.qualified_event(EventId(id));
            let mut body = vec![Instr::Label(qualified.clone())];
            body.extend(programs.into_iter().rev().map(Instr::Prog));
            EventInfo {
                module: model.module(event.module).name.clone(),
                name: event.name.clone(),
                params: event.vars.clone(),
                program: Arc::new(Program::new(qualified, body)),
            }
        })
        .collect::<Vec<_>>();

    let variables = model
        .variables
        .iter()
        .enumerate()
        .map(|(id, var)| VarInfo {
            qualified: model.qualified_variable(VarId(id)),
            init: var.init.clone(),
        })
        .collect();

    debug!(events = events.len(), "lowered model");
    Ok(Executable {
        variables,
        events,
        init_event: factory.init_event(),
    })
}

struct Lowerer<'m> {
    model: &'m Model,
}

impl Lowerer<'_> {
    fn label(&self, module: ModuleId, stmt: &Stmt, what: &'static str) -> Instr {
        Instr::Stmt {
            origin: Origin::new(self.model.module(module).name.clone(), stmt.line),
            what,
        }
    }

    fn stmt(&self, module: ModuleId, stmt: &Stmt) -> Result<Vec<Instr>> {
        let mut out = Vec::new();
        match &stmt.kind {
            StmtKind::Assign { lhs, rhs } => {
                out.push(self.label(module, stmt, "assign"));
                out.push(Instr::Assign);
                out.push(Instr::PushRef(lhs.var));
                match &lhs.expr.kind {
                    ExprKind::VarRef(_) => out.push(Instr::Push(Value::Selection(Selection::whole()))),
                    ExprKind::Index {
                        selectors,
                        plan: Some(plan),
                        ..
                    } => {
                        let operands = super::indexer::slot_operands(selectors);
                        out.push(Instr::Call {
                            arity: operands.len(),
                            func: Func::Selection(plan.clone()),
                        });
                        for operand in &operands {
                            self.expr(operand, &mut out)?;
                        }
                    }
                    _ => return Err(Error::type_error("left side of ':=' is not assignable")),
                }
                self.expr(rhs, &mut out)?;
            }
            StmtKind::Emit { event, args, after } => {
                out.push(self.label(module, stmt, "emit"));
                out.push(Instr::Emit(*event));
                out.push(Instr::Call {
                    arity: args.len(),
                    func: Func::Collect,
                });
                for arg in args {
                    self.expr(arg, &mut out)?;
                }
                self.expr(after, &mut out)?;
            }
            StmtKind::Print(parts) => {
                out.push(self.label(module, stmt, "print"));
                out.push(Instr::Call {
                    arity: parts.len(),
                    func: Func::Print,
                });
                for part in parts {
                    match part {
                        PrintPart::Text(text) => out.push(Instr::Push(Value::Text(text.clone()))),
                        PrintPart::Expr(e) => self.expr(e, &mut out)?,
                    }
                }
            }
            StmtKind::If { cond, then, els } => {
                out.push(self.label(module, stmt, "if"));
                let then = Program::new("then", self.stmt(module, then)?);
                let els = match els {
                    Some(els) => Program::new("else", self.stmt(module, els)?),
                    None => Program::new("else", Vec::new()),
                };
                out.push(Instr::Prog(Arc::new(then)));
                out.push(Instr::PopO);
                out.push(Instr::Prog(Arc::new(els)));
                out.push(Instr::PopO2If);
                self.expr(cond, &mut out)?;
            }
            StmtKind::Block(stmts) => {
                out.push(self.label(module, stmt, "block"));
                for s in stmts.iter().rev() {
                    let body = self.stmt(module, s)?;
                    if !body.is_empty() {
                        out.push(Instr::Prog(Arc::new(Program::new("stmt", body))));
                    }
                }
            }
            StmtKind::Fexpr(_) => {}
        }
        Ok(out)
    }

    fn expr(&self, expr: &ExprRef, out: &mut Vec<Instr>) -> Result<()> {
        if let Some(value) = &expr.value {
            out.push(Instr::Push(Value::Array(value.clone())));
            return Ok(());
        }
        match &expr.kind {
            ExprKind::VarRef(v) => out.push(Instr::PushVar(*v)),
            ExprKind::Builtin { builtin, args } if builtin.is_system() => {
                out.push(Instr::SysCall {
                    arity: args.len(),
                    builtin: builtin.clone(),
                });
                for arg in args {
                    self.expr(arg, out)?;
                }
            }
            _ => {
                let (op, args) = expr
                    .operator()
                    .ok_or_else(|| Error::type_error(format!("cannot lower expression {}", expr)))?;
                out.push(Instr::Call {
                    arity: args.len(),
                    func: Func::Op(op),
                });
                for arg in &args {
                    self.expr(arg, out)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MemorySources;

    fn lowered(source: &str) -> Executable {
        let mut factory = ModelFactory::new(MemorySources::new().with("main", source));
        factory.get_model("main").unwrap();
        lower(&factory).unwrap()
    }

    fn rendered(program: &Program) -> Vec<String> {
        program.body.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_constant_expressions_are_pushed() {
        let exe = lowered("var int v = 0; on Init v := 1 + 2;");
        let init = exe.event(exe.init_event);
        assert_eq!(rendered(&init.program), vec!["label sys.Init", "prog main(1)"]);
        let Instr::Prog(action) = &init.program.body[1] else {
            panic!("expected a nested program");
        };
        assert_eq!(
            rendered(action),
            vec!["label main(1): assign", "assign", "pushref 0", "push [...]", "push 3"]
        );
    }

    #[test]
    fn test_operands_follow_their_call() {
        let exe = lowered("var int a = 1; var int b = 2; on Init print a - b;");
        let init = exe.event(exe.init_event);
        let Instr::Prog(action) = &init.program.body[1] else {
            panic!("expected a nested program");
        };
        assert_eq!(
            rendered(action),
            vec!["label main(1): print", "call 1 print", "call 2 -", "pushvar 0", "pushvar 1"]
        );
    }

    #[test]
    fn test_if_layout() {
        let exe = lowered("var bool f = true; on Init if (f) print 1;");
        let init = exe.event(exe.init_event);
        let Instr::Prog(action) = &init.program.body[1] else {
            panic!("expected a nested program");
        };
        assert_eq!(
            rendered(action),
            vec!["label main(1): if", "prog then", "popo", "prog else", "popo2_if", "pushvar 0"]
        );
    }

    #[test]
    fn test_action_order_and_names() {
        let sources = MemorySources::new()
            .with("main", "import lib; on Init print 1; on Init print 2;")
            .with("lib", "var int x = 5; on Init print 0;");
        let mut factory = ModelFactory::new(sources);
        factory.get_model("main").unwrap();
        let exe = lower(&factory).unwrap();
        let init = exe.event(exe.init_event);
        // reversed: the first action runs last off the op-stack
        assert_eq!(
            rendered(&init.program),
            vec!["label sys.Init", "prog main(1)", "prog main(1)", "prog lib(1)"]
        );
        assert_eq!(exe.variable_id("lib.x"), Some(VarId(0)));
        assert_eq!(exe.event_id("sys.Init"), Some(exe.init_event));
    }
}

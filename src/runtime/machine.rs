//! Stack machine and event loop
//!
//! The machine owns the variable store, an op-stack of instructions, a data
//! stack of values and a queue of pending events ordered by
//! `(due time, emission sequence)`. Dispatching an event writes its
//! arguments into the hidden parameter variables, pushes the event's program
//! and pops instructions until the op-stack is empty. Everything runs on
//! the caller's thread; a dispatch always completes before the next one
//! starts.

use super::array::{Array, Scalar};
use super::instr::{Func, Instr};
use super::sink::{OutputSink, PrintItem};
use super::value::Value;
use crate::builtins::SystemContext;
use crate::compiler::{EventId, Executable, VarId};
use crate::diagnostics::{Diagnostics, Origin};
use crate::error::{Error, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, trace};

/// Queue entry
#[derive(Debug, Clone)]
struct Pending {
    due: f64,
    seq: u64,
    event: EventId,
    args: Vec<Array>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Discrete-event stack machine
pub struct Machine {
    executable: Executable,
    store: Vec<Array>,
    ostack: Vec<Instr>,
    dstack: Vec<Value>,
    queue: BinaryHeap<Reverse<Pending>>,
    now: f64,
    step: u64,
    seq: u64,
    sink: Box<dyn OutputSink>,
    /// Events already warned about a negative delay
    warned: HashSet<EventId>,
    diagnostics: Diagnostics,
    trace: bool,
    started: bool,
}

impl Machine {
    /// Machine with every variable at its initial value and an empty queue
    pub fn new(executable: Executable, sink: impl OutputSink + 'static) -> Self {
        let store = executable.variables.iter().map(|v| v.init.clone()).collect();
        Machine {
            executable,
            store,
            ostack: Vec::new(),
            dstack: Vec::new(),
            queue: BinaryHeap::new(),
            now: 0.0,
            step: 0,
            seq: 0,
            sink: Box::new(sink),
            warned: HashSet::new(),
            diagnostics: Diagnostics::new(),
            trace: false,
            started: false,
        }
    }

    /// Logs every executed instruction under the `vectorl::trace` target
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Emits `Init` at time 0 on the first call, then runs like [`Machine::resume`]
    pub fn start(&mut self, until: Option<f64>, steps: Option<u64>) -> Result<()> {
        if !self.started {
            self.started = true;
            self.emit(self.executable.init_event, Vec::new(), 0.0);
        }
        self.resume(until, steps)
    }

    /// Dispatches queued events until the queue is empty, the next event is
    /// due after `until`, or `steps` dispatches have happened in total
    ///
    /// A failed dispatch returns [`Error::RuntimeFailure`]; the queue keeps
    /// the remaining events.
    pub fn resume(&mut self, until: Option<f64>, steps: Option<u64>) -> Result<()> {
        loop {
            let due = match self.queue.peek() {
                Some(Reverse(next)) => next.due,
                None => break,
            };
            if until.map_or(false, |u| due > u) || steps.map_or(false, |s| self.step >= s) {
                break;
            }
            let Some(Reverse(next)) = self.queue.pop() else {
                break;
            };
            self.now = next.due;
            self.step += 1;

            let info = self.executable.event(next.event);
            trace!(event = %info.qualified(), time = self.now, step = self.step, "dispatch");
            self.sink.observe(&info.module, &info.name, &next.args, self.now);
            self.trigger(next.event, next.args)?;
        }
        Ok(())
    }

    /// Schedules `event` after `after` time units; negative delays are clamped to 0
    pub fn emit(&mut self, event: EventId, args: Vec<Array>, after: f64) {
        let after = if after >= 0.0 {
            after
        } else {
            if self.warned.insert(event) {
                let text = format!(
                    "negative delay {} for event {} clamped to 0",
                    after,
                    self.executable.event(event).qualified()
                );
                let origin = self.statement_origin();
                self.diagnostics.warning(origin, text);
            }
            0.0
        };
        self.seq += 1;
        self.queue.push(Reverse(Pending {
            due: self.now + after,
            seq: self.seq,
            event,
            args,
        }));
    }

    /// Writes the arguments of `event` and runs its program to completion
    pub fn trigger(&mut self, event: EventId, args: Vec<Array>) -> Result<()> {
        let info = self.executable.event(event);
        for (var, arg) in info.params.iter().zip(args) {
            let ty = self.store[var.0].ty();
            self.store[var.0] = arg.cast(ty);
        }
        let program = info.program.clone();
        self.ostack.extend(program.body.iter().cloned());
        self.run(event)
    }

    fn run(&mut self, event: EventId) -> Result<()> {
        while let Some(instr) = self.ostack.pop() {
            if self.trace {
                debug!(target: "vectorl::trace", depth = self.dstack.len(), "{}", instr);
            }
            if let Err(e) = self.execute(&instr) {
                let failure = Error::RuntimeFailure {
                    event: self.executable.event(event).qualified(),
                    op: instr.to_string(),
                    stack: self.dstack.iter().map(|v| v.to_string()).collect(),
                    reason: e.to_string(),
                    origin: self.statement_origin(),
                };
                self.ostack.clear();
                self.dstack.clear();
                return Err(failure);
            }
        }
        Ok(())
    }

    fn execute(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::Push(value) => self.dstack.push(value.clone()),
            Instr::PushVar(var) => self.dstack.push(Value::Array(self.store[var.0].clone())),
            Instr::PushRef(var) => self.dstack.push(Value::Ref(*var)),
            Instr::Call { arity, func } => {
                let args = self.pop_n(*arity)?;
                match func {
                    Func::Op(op) => {
                        let result = op.apply(&arrays(args)?)?;
                        self.dstack.push(Value::Array(result));
                    }
                    Func::Collect => self.dstack.push(Value::Tuple(arrays(args)?)),
                    Func::Print => {
                        let items = args
                            .into_iter()
                            .map(|v| match v {
                                Value::Text(text) => Ok(PrintItem::Text(text)),
                                other => other.into_array().map(PrintItem::Value),
                            })
                            .collect::<Result<Vec<_>>>()?;
                        self.sink.print(&items);
                    }
                    Func::Selection(plan) => {
                        let selection = plan.selection(&arrays(args)?)?;
                        self.dstack.push(Value::Selection(selection));
                    }
                }
            }
            Instr::SysCall { arity, builtin } => {
                let args = arrays(self.pop_n(*arity)?)?;
                let context = SystemContext { now: self.now };
                let result = builtin.execute_system(&context, &args)?;
                self.dstack.push(Value::Array(result));
            }
            Instr::Assign => {
                let target = self.pop()?;
                let selection = self.pop()?;
                let value = self.pop()?.into_array()?;
                match (target, selection) {
                    (Value::Ref(var), Value::Selection(selection)) => {
                        self.store[var.0].assign(&selection, &value)?;
                    }
                    (target, selection) => {
                        return Err(Error::type_error(format!(
                            "assign expects a reference and a selection, found {} and {}",
                            target.type_name(),
                            selection.type_name()
                        )))
                    }
                }
            }
            Instr::Emit(event) => {
                let args = match self.pop()? {
                    Value::Tuple(args) => args,
                    other => {
                        return Err(Error::type_error(format!(
                            "emit expects an argument tuple, found {}",
                            other.type_name()
                        )))
                    }
                };
                let after = scalar(self.pop()?)?.as_f64();
                self.emit(*event, args, after);
            }
            Instr::PopO => {
                self.ostack.pop();
            }
            Instr::PopO2If => {
                if scalar(self.pop()?)?.as_bool() {
                    self.ostack.pop();
                    self.ostack.pop();
                }
            }
            Instr::Label(_) | Instr::Stmt { .. } => {}
            Instr::Prog(program) => self.ostack.extend(program.body.iter().cloned()),
        }
        Ok(())
    }

    /// Origin of the innermost statement still on the op-stack
    fn statement_origin(&self) -> Option<Origin> {
        self.ostack.iter().rev().find_map(|instr| match instr {
            Instr::Stmt { origin, .. } => Some(origin.clone()),
            _ => None,
        })
    }

    fn pop(&mut self) -> Result<Value> {
        self.dstack
            .pop()
            .ok_or_else(|| Error::type_error("data stack underflow"))
    }

    /// Pops `n` values, top first
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if self.dstack.len() < n {
            return Err(Error::type_error(format!(
                "data stack underflow: need {} values, have {}",
                n,
                self.dstack.len()
            )));
        }
        let mut values = self.dstack.split_off(self.dstack.len() - n);
        values.reverse();
        Ok(values)
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of dispatched events
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Number of queued events
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Current value of a variable
    pub fn variable(&self, var: VarId) -> &Array {
        &self.store[var.0]
    }

    /// Current value of a variable by qualified name
    pub fn value(&self, qualified: &str) -> Option<&Array> {
        self.executable
            .variable_id(qualified)
            .map(|var| &self.store[var.0])
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// Warnings raised while running
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }
}

fn arrays(values: Vec<Value>) -> Result<Vec<Array>> {
    values.into_iter().map(Value::into_array).collect()
}

fn scalar(value: Value) -> Result<Scalar> {
    let array = value.into_array()?;
    array
        .as_scalar()
        .ok_or_else(|| Error::type_error(format!("expected a scalar, found shape {}", array.shape())))
}

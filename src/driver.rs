//! Driver entry points
//!
//! [`run`] compiles a main module with everything it imports, runs it within
//! the requested bounds and returns a [`RunReport`]. [`Simulation`] is the
//! session behind it, for callers that want to inspect state or resume a
//! stopped run.

use crate::compiler::{lower, ModelFactory, SourceFetcher};
use crate::diagnostics::{Diagnostics, Message};
use crate::error::ErrorKind;
use crate::runtime::{Array, Machine, OutputSink};
use serde::Serialize;
use tracing::{debug, info};

/// Bounds and switches of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Stop before dispatching an event due after this time
    pub until: Option<f64>,
    /// Stop after this many dispatches
    pub steps: Option<u64>,
    /// Log every executed instruction
    pub trace: bool,
    /// Compile without running
    pub compile_only: bool,
}

/// Outcome of [`run`]
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub success: bool,
    /// Compiler and runtime diagnostics in order
    pub messages: Vec<Message>,
    pub step_count: u64,
    pub final_now: f64,
    pub pending_events: usize,
}

/// A compiled model bound to a machine
pub struct Simulation {
    factory: ModelFactory,
    machine: Machine,
    main: String,
    diagnostics: Diagnostics,
}

impl Simulation {
    /// Compiles `main` and everything it imports
    ///
    /// On failure the collected diagnostics are returned instead.
    pub fn compile(
        fetcher: impl SourceFetcher + 'static,
        main: &str,
        sink: impl OutputSink + 'static,
    ) -> std::result::Result<Simulation, Diagnostics> {
        let mut factory = ModelFactory::new(fetcher);
        if let Err(e) = factory.get_model(main) {
            // a failed module has already reported its own errors
            if e.kind() != ErrorKind::CompilationFailed {
                factory.diagnostics_mut().error(None, &e);
            }
            return Err(std::mem::take(factory.diagnostics_mut()));
        }
        let executable = match lower(&factory) {
            Ok(executable) => executable,
            Err(e) => {
                factory.diagnostics_mut().error(None, &e);
                return Err(std::mem::take(factory.diagnostics_mut()));
            }
        };
        debug!(main, modules = factory.order().len(), "compiled model");

        let diagnostics = std::mem::take(factory.diagnostics_mut());
        Ok(Simulation {
            factory,
            machine: Machine::new(executable, sink),
            main: main.to_string(),
            diagnostics,
        })
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.machine.set_trace(trace);
    }

    /// Emits `Init` and runs within the bounds; see [`Machine::start`]
    pub fn start(&mut self, until: Option<f64>, steps: Option<u64>) -> crate::Result<()> {
        let result = self.machine.start(until, steps);
        self.collect(result)
    }

    /// Continues a stopped run with new bounds; see [`Machine::resume`]
    pub fn resume(&mut self, until: Option<f64>, steps: Option<u64>) -> crate::Result<()> {
        let result = self.machine.resume(until, steps);
        self.collect(result)
    }

    fn collect(&mut self, result: crate::Result<()>) -> crate::Result<()> {
        for message in self.machine.take_diagnostics().into_messages() {
            self.diagnostics.push(message);
        }
        if let Err(e) = &result {
            self.diagnostics.error(e.origin().cloned(), e);
        }
        result
    }

    /// Current value of `module.name`, or of `name` in the main module
    pub fn value(&self, name: &str) -> Option<&Array> {
        self.machine
            .value(name)
            .or_else(|| self.machine.value(&format!("{}.{}", self.main, name)))
    }

    pub fn now(&self) -> f64 {
        self.machine.now()
    }

    pub fn step_count(&self) -> u64 {
        self.machine.step_count()
    }

    pub fn pending_events(&self) -> usize {
        self.machine.pending_events()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn factory(&self) -> &ModelFactory {
        &self.factory
    }

    /// Compiler and runtime diagnostics so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Snapshot of the session as a report
    pub fn report(&self, success: bool) -> RunReport {
        RunReport {
            success,
            messages: self.diagnostics.messages().to_vec(),
            step_count: self.step_count(),
            final_now: self.now(),
            pending_events: self.pending_events(),
        }
    }
}

/// Compiles and runs `main`
pub fn run(
    fetcher: impl SourceFetcher + 'static,
    main: &str,
    options: &RunOptions,
    sink: impl OutputSink + 'static,
) -> RunReport {
    let mut simulation = match Simulation::compile(fetcher, main, sink) {
        Ok(simulation) => simulation,
        Err(diagnostics) => {
            return RunReport {
                success: false,
                messages: diagnostics.into_messages(),
                step_count: 0,
                final_now: 0.0,
                pending_events: 0,
            }
        }
    };
    if options.compile_only {
        return simulation.report(true);
    }

    simulation.set_trace(options.trace);
    let success = simulation.start(options.until, options.steps).is_ok();
    info!(
        main,
        success,
        steps = simulation.step_count(),
        now = simulation.now(),
        "run finished"
    );
    simulation.report(success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MemorySources;
    use crate::runtime::CaptureSink;

    #[test]
    fn test_bare_and_qualified_values() {
        let sources = MemorySources::new()
            .with("main", "import lib; var int a = 1; on Init lib.b := a + 1;")
            .with("lib", "var int b = 0;");
        let mut sim = Simulation::compile(sources, "main", CaptureSink::new())
            .unwrap_or_else(|d| panic!("{:?}", d.messages()));
        sim.start(None, None).unwrap();
        assert_eq!(sim.value("a"), Some(&Array::int(1)));
        assert_eq!(sim.value("lib.b"), Some(&Array::int(2)));
        assert_eq!(sim.value("b"), None);
    }

    #[test]
    fn test_compile_only() {
        let sources = MemorySources::new().with("main", "on Init print 1;");
        let sink = CaptureSink::new();
        let options = RunOptions {
            compile_only: true,
            ..RunOptions::default()
        };
        let report = run(sources, "main", &options, sink.clone());
        assert!(report.success);
        assert_eq!(report.step_count, 0);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_missing_main_module() {
        let report = run(MemorySources::new(), "main", &RunOptions::default(), CaptureSink::new());
        assert!(!report.success);
        assert_eq!(report.messages[0].kind, Some(ErrorKind::ImportError));
    }

    #[test]
    fn test_failed_main_reports_only_its_own_errors() {
        let sources = MemorySources::new().with("main", "var int a = 1;\nvar int b = c;");
        let report = run(sources, "main", &RunOptions::default(), CaptureSink::new());
        assert!(!report.success);
        assert!(!report.messages.is_empty());
        assert!(
            report.messages.iter().all(|m| m.origin.is_some()),
            "{:#?}",
            report.messages
        );
        assert_eq!(report.messages[0].kind, Some(ErrorKind::NameError));
    }

    #[test]
    fn test_report_serializes() {
        let sources = MemorySources::new().with("main", "on Init {}");
        let report = run(sources, "main", &RunOptions::default(), CaptureSink::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["step_count"], serde_json::json!(1));
    }
}

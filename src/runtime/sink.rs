//! Output sinks
//!
//! The machine reports `print` statements and event dispatches to an
//! [`OutputSink`]. [`StdoutSink`] writes printed lines to standard output;
//! [`CaptureSink`] records everything and can be cloned so a caller keeps a
//! handle while the machine owns the sink.

use super::array::Array;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// One argument of a `print` statement
#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    Text(String),
    Value(Array),
}

impl fmt::Display for PrintItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintItem::Text(text) => f.write_str(text),
            PrintItem::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Renders a print statement: items separated by one space
pub fn format_line(items: &[PrintItem]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Receives the observable effects of a run
pub trait OutputSink {
    /// Called for every executed `print`
    fn print(&mut self, items: &[PrintItem]);

    /// Called just before an event is dispatched
    fn observe(&mut self, _module: &str, _event: &str, _args: &[Array], _time: f64) {}
}

/// Writes printed lines to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn print(&mut self, items: &[PrintItem]) {
        println!("{}", format_line(items));
    }
}

/// A dispatch seen by a [`CaptureSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// `module.Event`
    pub event: String,
    pub args: Vec<Array>,
    pub time: f64,
}

#[derive(Debug, Default)]
struct Captured {
    lines: Vec<String>,
    dispatches: Vec<Dispatch>,
}

/// Records printed lines and dispatches; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    inner: Arc<Mutex<Captured>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Printed lines so far
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.clone()
    }

    /// All printed output, one line per print
    pub fn output(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        for line in &inner.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Dispatches so far, in dispatch order
    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.inner.lock().dispatches.clone()
    }
}

impl OutputSink for CaptureSink {
    fn print(&mut self, items: &[PrintItem]) {
        self.inner.lock().lines.push(format_line(items));
    }

    fn observe(&mut self, module: &str, event: &str, args: &[Array], time: f64) {
        self.inner.lock().dispatches.push(Dispatch {
            event: format!("{}.{}", module, event),
            args: args.to_vec(),
            time,
        });
    }
}

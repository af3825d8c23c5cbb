//! Compiler and runtime diagnostics
//!
//! Every message is kept in order and mirrored to `tracing`.

use crate::error::{Error, ErrorKind};
use serde::Serialize;
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Compilation or the run failed
    Error,
    /// Recoverable oddity
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Info => write!(f, "info"),
        }
    }
}

/// Source location of a diagnostic: module name and line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Module name
    pub module: String,
    /// Line number (1-indexed)
    pub line: usize,
}

impl Origin {
    /// Creates a new origin
    pub fn new(module: impl Into<String>, line: usize) -> Self {
        Origin {
            module: module.into(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.module, self.line)
    }
}

/// One diagnostic record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Severity
    pub level: Level,
    /// Error kind, for error-level messages
    pub kind: Option<ErrorKind>,
    /// Where the message originated, when known
    pub origin: Option<Origin>,
    /// Rendered message text
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{}: {}: {}", origin, self.level, self.text),
            None => write!(f, "{}: {}", self.level, self.text),
        }
    }
}

/// Ordered list of diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Message>,
}

impl Diagnostics {
    /// Creates an empty list
    pub fn new() -> Self {
        Diagnostics {
            messages: Vec::new(),
        }
    }

    /// Records an error
    pub fn error(&mut self, origin: Option<Origin>, err: &Error) {
        match &origin {
            Some(o) => tracing::error!(module = %o.module, line = o.line, kind = %err.kind(), "{}", err),
            None => tracing::error!(kind = %err.kind(), "{}", err),
        }
        self.messages.push(Message {
            level: Level::Error,
            kind: Some(err.kind()),
            origin,
            text: err.to_string(),
        });
    }

    /// Records a warning
    pub fn warning(&mut self, origin: Option<Origin>, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{}", text);
        self.messages.push(Message {
            level: Level::Warning,
            kind: None,
            origin,
            text,
        });
    }

    /// Records an informational message
    pub fn info(&mut self, origin: Option<Origin>, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        self.messages.push(Message {
            level: Level::Info,
            kind: None,
            origin,
            text,
        });
    }

    /// Number of error-level messages
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.level == Level::Error)
            .count()
    }

    /// True when at least one error was recorded
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// All messages in recording order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Error kinds in recording order
    pub fn error_kinds(&self) -> Vec<ErrorKind> {
        self.messages.iter().filter_map(|m| m.kind).collect()
    }

    /// Consumes the list
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Appends an already-built message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

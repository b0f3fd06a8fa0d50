use std::collections::BTreeSet;

use log::warn;
use serde::Serialize;

/// A line that was recognised but could not be used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineIssue {
    pub line: usize,
    pub text: String,
    pub message: String,
}

/// Per-pass record of lines the interpreter skipped.
///
/// Recording never affects parsing; it exists for verbose reporting.
#[derive(Debug, Default)]
pub struct Diagnostics {
    verbose: bool,
    unrecognized: BTreeSet<String>,
    issues: Vec<LineIssue>,
}

impl Diagnostics {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Remember a line that matched no known command. Only kept when verbose.
    pub fn unrecognized(&mut self, text: &str) {
        if self.verbose {
            self.unrecognized.insert(text.to_string());
        }
    }

    /// Record (and log) a line that was skipped because it could not be decoded.
    pub fn issue(&mut self, line: usize, text: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("Gerber: line {line}: {message} ({text})");
        self.issues.push(LineIssue {
            line,
            text: text.to_string(),
            message,
        });
    }

    pub fn unrecognized_lines(&self) -> impl Iterator<Item = &str> {
        self.unrecognized.iter().map(String::as_str)
    }

    pub fn issues(&self) -> &[LineIssue] {
        &self.issues
    }

    /// Forget everything recorded so far; the verbose setting is kept.
    pub fn clear(&mut self) {
        self.unrecognized.clear();
        self.issues.clear();
    }
}

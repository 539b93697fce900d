// Log entries describing a failed test or hook

use std::fmt::Write;

use dissimilar::{Chunk, diff};
use serde_json::Value;

use crate::client::{Attachment, LogEntry, LogLevel};
use crate::events::TestInfo;

/// Everything reported about one failure, sent just before the item is
/// finished.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    message: String,
    artifact: Option<Attachment>,
    comparison: Option<String>,
    log: Option<String>,
    stack: Option<String>,
}

impl FailureReport {
    pub fn from_test(test: &TestInfo, artifact: Option<Attachment>) -> Self {
        let err = test.err.as_ref();
        let message = err
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("{} failed", test.title));
        let comparison = err.and_then(|e| match (&e.actual, &e.expected) {
            (Some(actual), Some(expected)) => Some(render_comparison(actual, expected)),
            _ => None,
        });

        Self {
            message,
            artifact,
            comparison,
            log: test.log.clone(),
            stack: err.and_then(|e| e.stack.clone()),
        }
    }

    /// Log entries in send order: message (with artifact), comparison, test
    /// log, stack trace.
    pub fn into_entries(self) -> Vec<(LogEntry, Option<Attachment>)> {
        let mut entries = vec![(LogEntry::new(LogLevel::Error, self.message), self.artifact)];
        if let Some(comparison) = self.comparison {
            entries.push((LogEntry::new(LogLevel::Error, comparison), None));
        }
        if let Some(log) = self.log {
            entries.push((LogEntry::new(LogLevel::Info, log), None));
        }
        if let Some(stack) = self.stack {
            entries.push((LogEntry::new(LogLevel::Trace, stack), None));
        }
        entries
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Actual/expected block, followed by an inline diff when they differ.
/// Removed text is marked `[-...-]`, inserted text `{+...+}`.
pub fn render_comparison(actual: &Value, expected: &Value) -> String {
    let actual = display_value(actual);
    let expected = display_value(expected);

    let mut output = format!("Actual:\n{}\nExpected:\n{}", actual, expected);
    if actual == expected {
        return output;
    }

    let _ = write!(output, "\nDiff (Expected - / Actual +):\n");
    for chunk in diff(&expected, &actual) {
        let _ = match chunk {
            Chunk::Equal(text) => write!(output, "{}", text),
            Chunk::Delete(text) => write!(output, "[-{}-]", text),
            Chunk::Insert(text) => write!(output, "{{+{}+}}", text),
        };
    }
    output
}

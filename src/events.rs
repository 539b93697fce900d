// Runner events - lifecycle notifications delivered by the host test runner
//
// The host emits events in strict order; each is fully handled before the
// next one is read. On the wire they are newline-delimited JSON objects
// tagged by "event".

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Suite descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteInfo {
    pub title: String,
    #[serde(default)]
    pub full_title: String,
}

impl SuiteInfo {
    /// The runner wraps every file in an untitled root suite that is never
    /// reported.
    pub fn is_root(&self) -> bool {
        self.title.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    #[default]
    Test,
    Hook,
}

/// Error carried by a failed test or hook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestError {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub actual: Option<Value>,
    #[serde(default)]
    pub expected: Option<Value>,
}

/// Test or hook descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    pub title: String,
    #[serde(default)]
    pub full_title: String,
    #[serde(default, rename = "type")]
    pub kind: TestKind,
    /// Free-form output the test attached to itself.
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub err: Option<TestError>,
}

impl TestInfo {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            full_title: title.clone(),
            title,
            ..Default::default()
        }
    }

    pub fn hook(title: impl Into<String>) -> Self {
        Self {
            kind: TestKind::Hook,
            ..Self::new(title)
        }
    }

    pub fn with_full_title(mut self, full_title: impl Into<String>) -> Self {
        self.full_title = full_title.into();
        self
    }

    pub fn with_error(mut self, err: TestError) -> Self {
        self.err = Some(err);
        self
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    pub fn full_title(&self) -> &str {
        if self.full_title.is_empty() {
            &self.title
        } else {
            &self.full_title
        }
    }

    pub fn is_hook(&self) -> bool {
        self.kind == TestKind::Hook
    }
}

/// Host lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RunnerEvent {
    RunStart,
    SuiteStart(SuiteInfo),
    SuiteEnd(SuiteInfo),
    HookStart(TestInfo),
    HookEnd(TestInfo),
    TestStart(TestInfo),
    Pass(TestInfo),
    Fail(TestInfo),
    Pending(TestInfo),
    TestEnd(TestInfo),
    RunEnd,
    /// The host process is about to exit.
    RunExit,
}

impl RunnerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunnerEvent::RunStart => "run-start",
            RunnerEvent::SuiteStart(_) => "suite-start",
            RunnerEvent::SuiteEnd(_) => "suite-end",
            RunnerEvent::HookStart(_) => "hook-start",
            RunnerEvent::HookEnd(_) => "hook-end",
            RunnerEvent::TestStart(_) => "test-start",
            RunnerEvent::Pass(_) => "pass",
            RunnerEvent::Fail(_) => "fail",
            RunnerEvent::Pending(_) => "pending",
            RunnerEvent::TestEnd(_) => "test-end",
            RunnerEvent::RunEnd => "run-end",
            RunnerEvent::RunExit => "run-exit",
        }
    }
}

/// Parse one event line
pub fn parse_event(line: &str) -> Result<RunnerEvent, serde_json::Error> {
    serde_json::from_str(line)
}

/// Iterates the events of a newline-delimited JSON stream.
///
/// Blank lines are ignored; malformed lines are logged and skipped. A read
/// error ends the stream.
pub struct EventReader<R> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = RunnerEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("Stopped reading events at line {}: {}", self.line_number + 1, e);
                    return None;
                }
            }
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_event(trimmed) {
                Ok(event) => return Some(event),
                Err(e) => warn!("Skipping malformed event on line {}: {}", self.line_number, e),
            }
        }
    }
}

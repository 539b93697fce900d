// State module - report nesting and aggregate status tracking
// Owned by a single HierarchyController for the duration of a run

pub mod stack;

pub use stack::{Frame, ParentStack};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Final status of a report item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Stopped,
    #[serde(rename = "RESETED")]
    Reset,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "PASSED",
            Status::Failed => "FAILED",
            Status::Skipped => "SKIPPED",
            Status::Stopped => "STOPPED",
            Status::Reset => "RESETED",
            Status::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity at which aggregate status is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Launch,
    Suite,
    Test,
    Hook,
}

/// Worst-observed status per open scope.
///
/// Suites nest, so the suite scope keeps one flag per open suite. A failure
/// fails every open suite; a new sibling suite starts out passed.
#[derive(Debug, Clone)]
pub struct StatusAggregator {
    launch: Status,
    suites: Vec<Status>,
    test: Status,
    hook: Status,
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self {
            launch: Status::Passed,
            suites: Vec::new(),
            test: Status::Passed,
            hook: Status::Passed,
        }
    }

    /// Start a fresh scope. For [`Scope::Suite`] this opens a new innermost
    /// suite flag; close it with [`StatusAggregator::close_suite`].
    pub fn reset(&mut self, scope: Scope) {
        match scope {
            Scope::Launch => {
                self.launch = Status::Passed;
                self.suites.clear();
            }
            Scope::Suite => self.suites.push(Status::Passed),
            Scope::Test => self.test = Status::Passed,
            Scope::Hook => self.hook = Status::Passed,
        }
    }

    pub fn mark_failed(&mut self, scopes: &[Scope]) {
        for scope in scopes {
            match scope {
                Scope::Launch => self.launch = Status::Failed,
                Scope::Suite => self.suites.fill(Status::Failed),
                Scope::Test => self.test = Status::Failed,
                Scope::Hook => self.hook = Status::Failed,
            }
        }
    }

    /// Skips only ever apply to a test and never mask a failure.
    pub fn mark_skipped(&mut self, scope: Scope) {
        if scope != Scope::Test {
            debug!("Ignoring skip for {:?} scope", scope);
            return;
        }
        if self.test != Status::Failed {
            self.test = Status::Skipped;
        }
    }

    pub fn value(&self, scope: Scope) -> Status {
        match scope {
            Scope::Launch => self.launch,
            Scope::Suite => self.suites.last().copied().unwrap_or(Status::Passed),
            Scope::Test => self.test,
            Scope::Hook => self.hook,
        }
    }

    /// End the innermost suite scope, returning its final status.
    pub fn close_suite(&mut self) -> Status {
        self.suites.pop().unwrap_or(Status::Passed)
    }

    pub fn open_suites(&self) -> usize {
        self.suites.len()
    }
}

// Hierarchy controller - projects runner events onto the report tree
//
// One event is handled at a time, on the runner's thread. Every reporting
// call goes through the SyncBridge, so by the time a handler returns its
// items exist (or were abandoned) and the next event sees a settled stack.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::bridge::{DEFAULT_MAX_WAIT, SyncBridge};
use super::failure::FailureReport;
use super::hooks::{classify_hook, is_suppressed};
use crate::artifact::ArtifactCapture;
use crate::client::{
    Attachment, ItemId, ItemKind, ItemMeta, LaunchMeta, LogEntry, LogLevel, PendingItem,
    ReportingClient,
};
use crate::error::ReporterError;
use crate::events::{RunnerEvent, SuiteInfo, TestInfo};
use crate::state::{Frame, ParentStack, Scope, Status, StatusAggregator};

/// Behaviour switches for a reporting run
#[derive(Debug, Clone)]
pub struct ReporterOptions {
    /// Report hooks that pass. Failed hooks are always reported.
    pub show_passed_hooks: bool,
    /// Capture and attach an artifact to failed items.
    pub attach_screenshots: bool,
    /// Maximum time to block on a single reporting operation.
    pub wait_time: Duration,
    pub launch: LaunchMeta,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            show_passed_hooks: false,
            attach_screenshots: true,
            wait_time: DEFAULT_MAX_WAIT,
            launch: LaunchMeta::default(),
        }
    }
}

struct PendingFailure {
    item: ItemId,
    report: FailureReport,
}

pub struct HierarchyController {
    client: Arc<dyn ReportingClient>,
    artifacts: Arc<dyn ArtifactCapture>,
    bridge: SyncBridge,
    options: ReporterOptions,
    stack: ParentStack,
    status: StatusAggregator,
    launch_id: Option<ItemId>,
    failure: Option<PendingFailure>,
    drained: bool,
}

impl HierarchyController {
    pub fn new(
        client: Arc<dyn ReportingClient>,
        artifacts: Arc<dyn ArtifactCapture>,
        bridge: SyncBridge,
        options: ReporterOptions,
    ) -> Self {
        Self {
            client,
            artifacts,
            bridge,
            options,
            stack: ParentStack::new(),
            status: StatusAggregator::new(),
            launch_id: None,
            failure: None,
            drained: false,
        }
    }

    /// Number of report items currently open, launch included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn status(&self, scope: Scope) -> Status {
        self.status.value(scope)
    }

    pub fn launch_id(&self) -> Option<&ItemId> {
        self.launch_id.as_ref()
    }

    /// Whether outstanding operations were drained since the last run-start.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Handle one runner event. Never fails and never panics: reporter
    /// faults are logged and the runner carries on.
    pub fn handle(&mut self, event: &RunnerEvent) {
        let name = event.name();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(event)));

        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => ReporterError::fault(name, panic_message(payload.as_ref())),
        };
        error!("Failed to report {}: {}", name, err);
    }

    fn dispatch(&mut self, event: &RunnerEvent) -> Result<(), ReporterError> {
        match event {
            RunnerEvent::RunStart => self.on_run_start(),
            RunnerEvent::SuiteStart(suite) => self.on_suite_start(suite),
            RunnerEvent::SuiteEnd(suite) => self.on_suite_end(suite),
            RunnerEvent::HookStart(hook) => self.on_hook_start(hook),
            RunnerEvent::HookEnd(hook) => self.on_hook_end(hook),
            RunnerEvent::TestStart(test) => self.on_test_start(test),
            RunnerEvent::Pass(_) => {
                self.status.reset(Scope::Test);
                Ok(())
            }
            RunnerEvent::Fail(test) => self.on_fail(test),
            RunnerEvent::Pending(test) => self.on_pending(test),
            RunnerEvent::TestEnd(test) => self.on_test_end(test),
            RunnerEvent::RunEnd => self.on_run_end(),
            RunnerEvent::RunExit => self.on_run_exit(),
        }
    }

    fn on_run_start(&mut self) -> Result<(), ReporterError> {
        if !self.stack.is_empty() {
            warn!(
                "Run started with {} report item(s) still open; abandoning them",
                self.stack.len()
            );
            self.stack.clear();
        }
        self.status.reset(Scope::Launch);
        self.failure = None;
        self.drained = false;

        let PendingItem { id, done } = self.client.start_launch(self.options.launch.clone());
        self.bridge.complete("start launch", done);
        info!("Started launch {}", id);

        self.stack
            .push(Frame::new(id.clone(), ItemKind::Launch, &self.options.launch.name));
        self.launch_id = Some(id);
        Ok(())
    }

    fn on_suite_start(&mut self, suite: &SuiteInfo) -> Result<(), ReporterError> {
        if suite.is_root() {
            return Ok(());
        }
        self.status.reset(Scope::Suite);
        let parent = self.top_parent();
        let description = (!suite.full_title.is_empty()).then(|| suite.full_title.clone());
        self.start_item(
            ItemMeta::new(ItemKind::Suite, &suite.title, description),
            parent,
            "start suite",
        )?;
        Ok(())
    }

    fn on_suite_end(&mut self, suite: &SuiteInfo) -> Result<(), ReporterError> {
        if suite.is_root() {
            return Ok(());
        }
        self.close_dangling(false)?;
        if !matches!(self.stack.top(), Some(frame) if frame.kind == ItemKind::Suite) {
            return Err(ReporterError::StackUnderflow);
        }
        let frame = self.stack.pop()?;
        let status = self.status.close_suite();
        self.finish_item(&frame.id, status, "finish suite");
        Ok(())
    }

    fn on_hook_start(&mut self, hook: &TestInfo) -> Result<(), ReporterError> {
        if is_suppressed(&hook.title) {
            debug!("Suppressing hook {}", hook.title);
            return Ok(());
        }
        self.close_stale_hooks()?;
        self.status.reset(Scope::Hook);
        if self.options.show_passed_hooks {
            self.open_hook(hook)?;
        }
        Ok(())
    }

    fn on_hook_end(&mut self, hook: &TestInfo) -> Result<(), ReporterError> {
        if is_suppressed(&hook.title) {
            return Ok(());
        }
        match self.stack.top() {
            Some(frame) if frame.kind.is_hook() => {
                let frame = self.stack.pop()?;
                let status = self.status.value(Scope::Hook);
                self.close_item(&frame, hook.log.as_deref(), status);
            }
            _ => debug!("Hook {} was not reported", hook.title),
        }
        Ok(())
    }

    fn on_test_start(&mut self, test: &TestInfo) -> Result<(), ReporterError> {
        self.close_stale_hooks()?;
        self.status.reset(Scope::Test);
        self.open_step(test)?;
        Ok(())
    }

    fn on_fail(&mut self, test: &TestInfo) -> Result<(), ReporterError> {
        self.status
            .mark_failed(&[Scope::Test, Scope::Suite, Scope::Launch]);
        if is_suppressed(&test.title) {
            debug!("Suppressing failed hook {}", test.title);
            return Ok(());
        }

        let item = if test.is_hook() {
            self.status.mark_failed(&[Scope::Hook]);
            match self.stack.top() {
                Some(frame) if frame.kind.is_hook() && frame.name == test.title => frame.id.clone(),
                // Passed hooks are hidden, so the failing one is reported now.
                _ => {
                    self.close_stale_hooks()?;
                    self.open_hook(test)?
                }
            }
        } else {
            match self.stack.top() {
                Some(frame) if frame.kind == ItemKind::Step => frame.id.clone(),
                _ => {
                    warn!("Failure of {} arrived before the test started", test.title);
                    self.open_step(test)?
                }
            }
        };

        let artifact = self.capture_artifact(test);
        self.failure = Some(PendingFailure {
            item,
            report: FailureReport::from_test(test, artifact),
        });
        Ok(())
    }

    fn on_pending(&mut self, test: &TestInfo) -> Result<(), ReporterError> {
        self.status.mark_skipped(Scope::Test);
        let already_open = matches!(
            self.stack.top(),
            Some(frame) if frame.kind == ItemKind::Step && frame.name == test.title
        );
        if !already_open {
            self.open_step(test)?;
        }
        let frame = self.stack.pop()?;
        self.close_item(&frame, test.log.as_deref(), Status::Skipped);
        Ok(())
    }

    fn on_test_end(&mut self, test: &TestInfo) -> Result<(), ReporterError> {
        match self.stack.top() {
            Some(frame) if frame.kind == ItemKind::Step => {
                let frame = self.stack.pop()?;
                let status = self.status.value(Scope::Test);
                self.close_item(&frame, test.log.as_deref(), status);
            }
            // Pending tests are closed as soon as they are reported.
            _ => debug!("Test {} has no open step", test.title),
        }
        Ok(())
    }

    fn on_run_end(&mut self) -> Result<(), ReporterError> {
        self.close_dangling(true)?;
        let frame = self.stack.pop()?;
        if frame.kind != ItemKind::Launch {
            return Err(ReporterError::fault(
                "run-end",
                format!("expected the launch on top, found {:?}", frame.kind),
            ));
        }
        let status = self.status.value(Scope::Launch);
        let done = self.client.finish_launch(&frame.id, status.into());
        self.bridge.complete("finish launch", done);
        info!("Finished launch {} as {}", frame.id, status);
        Ok(())
    }

    fn on_run_exit(&mut self) -> Result<(), ReporterError> {
        let Some(launch) = self.launch_id.clone() else {
            debug!("Nothing to drain, no launch was started");
            return Ok(());
        };
        let done = self.client.drain(&launch);
        self.bridge.complete("drain launch", done);
        self.drained = true;
        Ok(())
    }

    /// Parent for an item created under the current top. Top-level items hang
    /// off the launch itself, which the service expresses as no parent.
    fn top_parent(&self) -> Option<ItemId> {
        parent_of(self.stack.top())
    }

    /// Hooks are siblings of the test they guard: when a step is open the
    /// hook goes under the entry below it.
    fn hook_parent(&self) -> Option<ItemId> {
        match self.stack.top() {
            Some(frame) if frame.kind == ItemKind::Step => parent_of(self.stack.second_from_top()),
            top => parent_of(top),
        }
    }

    fn open_step(&mut self, test: &TestInfo) -> Result<ItemId, ReporterError> {
        let parent = self.top_parent();
        let meta = ItemMeta::new(
            ItemKind::Step,
            &test.title,
            Some(test.full_title().to_string()),
        );
        self.start_item(meta, parent, "start test")
    }

    fn open_hook(&mut self, hook: &TestInfo) -> Result<ItemId, ReporterError> {
        let parent = self.hook_parent();
        let meta = ItemMeta::new(ItemKind::Hook(classify_hook(&hook.title)), &hook.title, None);
        self.start_item(meta, parent, "start hook")
    }

    /// Create an item and push it. The push happens even when the creation
    /// was abandoned, so the matching end event still pairs up.
    fn start_item(
        &mut self,
        meta: ItemMeta,
        parent: Option<ItemId>,
        operation: &str,
    ) -> Result<ItemId, ReporterError> {
        let launch = self
            .launch_id
            .clone()
            .ok_or_else(|| ReporterError::fault(operation, "no launch has been started"))?;
        let kind = meta.kind;
        let name = meta.name.clone();

        let PendingItem { id, done } = self.client.start_item(meta, &launch, parent.as_ref());
        self.bridge.complete(operation, done);
        debug!("Opened {:?} {} ({})", kind, name, id);

        self.stack.push(Frame::new(id.clone(), kind, name));
        Ok(id)
    }

    /// Send the item's logs, then finish it.
    fn close_item(&mut self, frame: &Frame, log: Option<&str>, status: Status) {
        match self.failure.take() {
            Some(failure) if failure.item == frame.id => {
                for (entry, attachment) in failure.report.into_entries() {
                    self.send_log(&frame.id, entry, attachment);
                }
            }
            other => {
                self.failure = other;
                if let Some(message) = log {
                    self.send_log(&frame.id, LogEntry::new(LogLevel::Info, message), None);
                }
            }
        }
        let operation = if frame.kind.is_hook() {
            "finish hook"
        } else {
            "finish test"
        };
        self.finish_item(&frame.id, status, operation);
    }

    /// Close hooks and steps the runner never ended (and suites too when the
    /// whole run is ending).
    fn close_dangling(&mut self, include_suites: bool) -> Result<(), ReporterError> {
        while let Some(top) = self.stack.top() {
            let kind = top.kind;
            match kind {
                ItemKind::Hook(_) | ItemKind::Step => {
                    let frame = self.stack.pop()?;
                    warn!("Closing {} which the runner never ended", frame.name);
                    let scope = if kind == ItemKind::Step {
                        Scope::Test
                    } else {
                        Scope::Hook
                    };
                    let status = self.status.value(scope);
                    self.close_item(&frame, None, status);
                }
                ItemKind::Suite if include_suites => {
                    let frame = self.stack.pop()?;
                    warn!("Closing suite {} which the runner never ended", frame.name);
                    let status = self.status.close_suite();
                    self.finish_item(&frame.id, status, "finish suite");
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Close hooks left open by an earlier hook failure; the runner sends no
    /// hook-end for those.
    fn close_stale_hooks(&mut self) -> Result<(), ReporterError> {
        while matches!(self.stack.top(), Some(frame) if frame.kind.is_hook()) {
            let frame = self.stack.pop()?;
            let failed = matches!(&self.failure, Some(failure) if failure.item == frame.id);
            let status = if failed {
                Status::Failed
            } else {
                self.status.value(Scope::Hook)
            };
            debug!("Closing hook {} which the runner never ended", frame.name);
            self.close_item(&frame, None, status);
        }
        Ok(())
    }

    fn finish_item(&self, id: &ItemId, status: Status, operation: &str) {
        let done = self.client.finish_item(id, status.into());
        self.bridge.complete(operation, done);
    }

    fn send_log(&self, id: &ItemId, entry: LogEntry, attachment: Option<Attachment>) {
        let done = self.client.send_log(id, entry, attachment);
        self.bridge.complete("send log", done);
    }

    fn capture_artifact(&self, test: &TestInfo) -> Option<Attachment> {
        if !self.options.attach_screenshots {
            return None;
        }
        let capture = self.artifacts.capture(test.full_title());
        self.bridge
            .wait("capture artifact", capture)
            .unwrap_or_else(|err| {
                warn!("{}", err);
                None
            })
    }
}

fn parent_of(frame: Option<&Frame>) -> Option<ItemId> {
    frame
        .filter(|f| f.kind != ItemKind::Launch)
        .map(|f| f.id.clone())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

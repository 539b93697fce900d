// Console rendering of a recorded launch

use std::collections::HashMap;
use std::fmt::Write;

use console::Style;

use crate::client::{ItemId, ItemKind, Operation};
use crate::state::Status;

/// One reported item and its children
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    /// `None` while the item was never finished.
    pub status: Option<Status>,
    pub logs: usize,
    pub attachments: usize,
    pub children: Vec<TreeNode>,
}

/// Summary counts over the steps of a launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unfinished: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchTree {
    pub name: String,
    pub status: Option<Status>,
    pub drained: bool,
    pub roots: Vec<TreeNode>,
}

impl LaunchTree {
    /// Rebuild the hierarchy from the recorded operations of a single
    /// launch. Returns `None` if no launch was started.
    pub fn from_operations(operations: &[Operation]) -> Option<Self> {
        let mut launch: Option<String> = None;
        let mut launch_status = None;
        let mut drained = false;
        let mut nodes: HashMap<ItemId, TreeNode> = HashMap::new();
        let mut parents: Vec<(ItemId, Option<ItemId>)> = Vec::new();

        for op in operations {
            match op {
                Operation::StartLaunch { meta, .. } => launch = Some(meta.name.clone()),
                Operation::FinishLaunch { status, .. } => launch_status = Some(*status),
                Operation::StartItem {
                    id, parent, meta, ..
                } => {
                    nodes.insert(
                        id.clone(),
                        TreeNode {
                            id: id.clone(),
                            kind: meta.kind,
                            name: meta.name.clone(),
                            status: None,
                            logs: 0,
                            attachments: 0,
                            children: Vec::new(),
                        },
                    );
                    parents.push((id.clone(), parent.clone()));
                }
                Operation::FinishItem { id, status } => {
                    if let Some(node) = nodes.get_mut(id) {
                        node.status = Some(*status);
                    }
                }
                Operation::SendLog { id, attachment, .. } => {
                    if let Some(node) = nodes.get_mut(id) {
                        node.logs += 1;
                        node.attachments += usize::from(attachment.is_some());
                    }
                }
                Operation::Drain { .. } => drained = true,
            }
        }

        let name = launch?;

        // Attach children deepest-first so every node is complete before it
        // is moved into its parent.
        let mut roots = Vec::new();
        for (id, parent) in parents.into_iter().rev() {
            let Some(node) = nodes.remove(&id) else {
                continue;
            };
            match parent.as_ref().and_then(|p| nodes.get_mut(p)) {
                Some(parent) => parent.children.insert(0, node),
                None => roots.insert(0, node),
            }
        }

        Some(Self {
            name,
            status: launch_status,
            drained,
            roots,
        })
    }

    pub fn summary(&self) -> TreeSummary {
        fn walk(node: &TreeNode, summary: &mut TreeSummary) {
            if node.kind == ItemKind::Step {
                match node.status {
                    Some(Status::Passed) => summary.passed += 1,
                    Some(Status::Failed) => summary.failed += 1,
                    Some(Status::Skipped) => summary.skipped += 1,
                    Some(_) => {}
                    None => summary.unfinished += 1,
                }
            }
            for child in &node.children {
                walk(child, summary);
            }
        }

        let mut summary = TreeSummary::default();
        for root in &self.roots {
            walk(root, &mut summary);
        }
        summary
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(
            output,
            "🚀 {} [{}]",
            self.name,
            styled_status(self.status)
        );
        for root in &self.roots {
            render_node(root, 1, &mut output);
        }

        let summary = self.summary();
        let _ = writeln!(
            output,
            "────────────────────────────────────────────────────────────────────────────────"
        );
        if summary.failed > 0 {
            let _ = writeln!(
                output,
                "❌ FAILED ({} failed, {} passed, {} skipped)",
                summary.failed, summary.passed, summary.skipped
            );
        } else {
            let _ = writeln!(
                output,
                "✅ PASSED ({} passed, {} skipped)",
                summary.passed, summary.skipped
            );
        }
        if summary.unfinished > 0 {
            let _ = writeln!(output, "⚠️  {} item(s) never finished", summary.unfinished);
        }
        if !self.drained {
            let _ = writeln!(output, "⚠️  Launch was not drained");
        }
        output
    }
}

fn render_node(node: &TreeNode, depth: usize, output: &mut String) {
    let label = match node.kind {
        ItemKind::Suite => "suite",
        ItemKind::Step => "test",
        ItemKind::Hook(_) => "hook",
        ItemKind::Launch => "launch",
    };
    let _ = write!(
        output,
        "{}{} {} [{}]",
        "  ".repeat(depth),
        Style::new().dim().apply_to(label),
        node.name,
        styled_status(node.status)
    );
    if node.logs > 0 {
        let _ = write!(output, " ({} log(s)", node.logs);
        if node.attachments > 0 {
            let _ = write!(output, ", {} attachment(s)", node.attachments);
        }
        output.push(')');
    }
    output.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, output);
    }
}

fn styled_status(status: Option<Status>) -> String {
    match status {
        Some(Status::Passed) => Style::new().green().apply_to("PASSED").to_string(),
        Some(Status::Failed) => Style::new().red().apply_to("FAILED").to_string(),
        Some(Status::Skipped) => Style::new().yellow().apply_to("SKIPPED").to_string(),
        Some(other) => other.to_string(),
        None => Style::new().dim().apply_to("OPEN").to_string(),
    }
}

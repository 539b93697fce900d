// Open report items, innermost last

use crate::client::{ItemId, ItemKind};
use crate::error::ReporterError;

/// One open report item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
}

impl Frame {
    pub fn new(id: ItemId, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
        }
    }
}

/// The currently open nesting path: launch, suites, then the test or hook.
#[derive(Debug, Default)]
pub struct ParentStack {
    frames: Vec<Frame>,
}

impl ParentStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Close the innermost item. An empty stack means the host sent an end
    /// event that was never opened.
    pub fn pop(&mut self) -> Result<Frame, ReporterError> {
        self.frames.pop().ok_or(ReporterError::StackUnderflow)
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn second_from_top(&self) -> Option<&Frame> {
        self.frames.len().checked_sub(2).map(|i| &self.frames[i])
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

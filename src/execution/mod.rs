// Execution module - event handling core

pub mod bridge;
pub mod controller;
pub mod failure;
pub mod hooks;

pub use bridge::{DEFAULT_MAX_WAIT, SyncBridge};
pub use controller::{HierarchyController, ReporterOptions};
pub use failure::FailureReport;
pub use hooks::{SUPPRESSED_HOOK_TITLE, classify_hook, is_suppressed};

use crate::client::HookKind;

/// Teardown hook the runner always fires; it has nothing worth reporting.
pub const SUPPRESSED_HOOK_TITLE: &str = "\"after each\" hook: ret";

pub fn is_suppressed(title: &str) -> bool {
    title == SUPPRESSED_HOOK_TITLE
}

/// Hook type from the runner's title prefix.
pub fn classify_hook(title: &str) -> Option<HookKind> {
    if title.starts_with("\"before each\"") {
        Some(HookKind::BeforeMethod)
    } else if title.starts_with("\"after each\"") {
        Some(HookKind::AfterMethod)
    } else if title.starts_with("\"before all\"") {
        Some(HookKind::BeforeClass)
    } else if title.starts_with("\"after all\"") {
        Some(HookKind::AfterClass)
    } else {
        None
    }
}

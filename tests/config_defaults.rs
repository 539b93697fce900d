use rp_reporter::config::Config;
use rp_reporter::execution::{DEFAULT_MAX_WAIT, ReporterOptions};

use std::time::Duration;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    assert_eq!(config.portal.launch, "Test launch");
    assert!(config.portal.token.is_none());
    assert!(config.reporter.attach_screenshots);
    assert!(!config.reporter.show_passed_hooks);
    assert_eq!(config.reporter.wait_time_ms, 30_000);
    assert!(config.reporter.screenshots_dir.is_none());
}

#[test]
fn test_default_config_matches_reporter_defaults() {
    let from_config = Config::default().reporter_options();
    let defaults = ReporterOptions::default();

    assert_eq!(from_config.wait_time, DEFAULT_MAX_WAIT);
    assert_eq!(from_config.wait_time, Duration::from_millis(30_000));
    assert_eq!(from_config.show_passed_hooks, defaults.show_passed_hooks);
    assert_eq!(from_config.attach_screenshots, defaults.attach_screenshots);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".rpreporterrc.toml");
    std::fs::write(
        &path,
        "[portal]\nlaunch = \"regression\"\ntags = [\"ci\"]\n\n[reporter]\nwait_time_ms = 100\n",
    )
    .unwrap();

    let config = Config::load_from_file(&path).expect("config should load");

    assert_eq!(config.portal.launch, "regression");
    assert_eq!(config.launch_meta().tags, vec!["ci"]);
    assert_eq!(config.reporter_options().wait_time, Duration::from_millis(100));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load_from_file(&dir.path().join("absent.toml")).is_none());
}

use rp_reporter::artifact::NoArtifacts;
use rp_reporter::client::{
    Attachment, ItemKind, ItemMeta, LaunchMeta, LogEntry, LogLevel, OutboxClient, ReportingClient,
};
use rp_reporter::events::{RunnerEvent, SuiteInfo, TestInfo};
use rp_reporter::execution::{HierarchyController, ReporterOptions, SyncBridge};
use rp_reporter::state::Status;

use futures::executor::block_on;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn read_records(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("outbox file should exist")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is a JSON record"))
        .collect()
}

fn ops(records: &[Value]) -> Vec<&str> {
    records.iter().map(|r| r["op"].as_str().unwrap()).collect()
}

#[test]
fn test_operations_written_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.ndjson");
    let outbox = OutboxClient::create(&path).unwrap();

    outbox.write_session("https://rp.example.com", "web").unwrap();
    let launch = outbox.start_launch(LaunchMeta {
        name: "nightly".to_string(),
        description: None,
        tags: vec!["smoke".to_string()],
    });
    let suite = outbox.start_item(
        ItemMeta::new(ItemKind::Suite, "A", None),
        &launch.id,
        None,
    );
    let test = outbox.start_item(
        ItemMeta::new(ItemKind::Step, "t1", Some("A t1".to_string())),
        &launch.id,
        Some(&suite.id),
    );
    block_on(outbox.finish_item(&test.id, Status::Passed.into())).unwrap();
    block_on(outbox.finish_item(&suite.id, Status::Passed.into())).unwrap();
    block_on(outbox.finish_launch(&launch.id, Status::Passed.into())).unwrap();
    block_on(outbox.drain(&launch.id)).unwrap();

    let records = read_records(&path);
    assert_eq!(
        ops(&records),
        vec![
            "session",
            "start-launch",
            "start-item",
            "start-item",
            "finish-item",
            "finish-item",
            "finish-launch",
            "drain"
        ]
    );
    assert_eq!(records[0]["project"], "web");
    assert_eq!(records[1]["tags"][0], "smoke");
    assert_eq!(records[2]["type"], "SUITE");
    assert!(records[2]["parentId"].is_null());
    assert_eq!(records[3]["type"], "STEP");
    assert_eq!(records[3]["parentId"], records[2]["id"]);
    assert_eq!(records[3]["launchId"], records[1]["id"]);
    assert_eq!(records[4]["status"], "PASSED");
}

#[test]
fn test_attachment_stored_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.ndjson");
    let attachments = dir.path().join("attachments");
    let outbox = OutboxClient::create(&path)
        .unwrap()
        .with_attachments_dir(attachments.clone());

    let launch = outbox.start_launch(LaunchMeta::default());
    block_on(outbox.send_log(
        &launch.id,
        LogEntry::new(LogLevel::Error, "boom"),
        Some(Attachment::new("shot.png", "image/png", vec![1, 2, 3])),
    ))
    .unwrap();
    block_on(outbox.drain(&launch.id)).unwrap();

    let records = read_records(&path);
    let log = &records[1];
    assert_eq!(log["level"], "ERROR");
    assert_eq!(log["file"]["name"], "shot.png");
    assert_eq!(log["file"]["size"], 3);

    let stored = log["file"]["path"].as_str().expect("attachment path");
    assert!(Path::new(stored).starts_with(&attachments));
    assert_eq!(std::fs::read(stored).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_attachment_without_directory_records_metadata_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbox.ndjson");
    let outbox = OutboxClient::create(&path).unwrap();

    let launch = outbox.start_launch(LaunchMeta::default());
    block_on(outbox.send_log(
        &launch.id,
        LogEntry::new(LogLevel::Error, "boom"),
        Some(Attachment::new("shot.png", "image/png", vec![0; 8])),
    ))
    .unwrap();
    block_on(outbox.drain(&launch.id)).unwrap();

    let records = read_records(&path);
    assert_eq!(records[1]["file"]["size"], 8);
    assert!(records[1]["file"].get("path").is_none());
}

#[test]
fn test_controller_drives_outbox() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.ndjson");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let outbox = Arc::new(OutboxClient::create(&path).unwrap());
    let mut controller = HierarchyController::new(
        outbox,
        Arc::new(NoArtifacts),
        SyncBridge::new(rt.handle().clone(), Duration::from_secs(2)),
        ReporterOptions::default(),
    );
    let suite = SuiteInfo {
        title: "A".to_string(),
        full_title: "A".to_string(),
    };

    for event in [
        RunnerEvent::RunStart,
        RunnerEvent::SuiteStart(suite.clone()),
        RunnerEvent::TestStart(TestInfo::new("t1")),
        RunnerEvent::Pass(TestInfo::new("t1")),
        RunnerEvent::TestEnd(TestInfo::new("t1")),
        RunnerEvent::SuiteEnd(suite),
        RunnerEvent::RunEnd,
        RunnerEvent::RunExit,
    ] {
        controller.handle(&event);
    }

    let records = read_records(&path);
    assert_eq!(
        ops(&records),
        vec![
            "start-launch",
            "start-item",
            "start-item",
            "finish-item",
            "finish-item",
            "finish-launch",
            "drain"
        ]
    );
    assert_eq!(records[5]["status"], "PASSED");
}

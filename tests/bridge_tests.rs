use rp_reporter::error::{ClientError, ReporterError};
use rp_reporter::execution::SyncBridge;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

#[test]
fn test_abandoned_operation_keeps_running() {
    let rt = runtime();
    let bridge = SyncBridge::new(rt.handle().clone(), Duration::from_millis(20));
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();

    let result = bridge.settle("start test", async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        flag.store(true, Ordering::SeqCst);
        Ok::<_, ClientError>(())
    });

    // Gave up waiting, but the task was not cancelled.
    assert!(matches!(result, Err(ReporterError::RemoteOperationTimeout { .. })));
    assert!(!finished.load(Ordering::SeqCst));
    std::thread::sleep(Duration::from_millis(500));
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_timeout_names_the_operation() {
    let rt = runtime();
    let bridge = SyncBridge::new(rt.handle().clone(), Duration::from_millis(10));

    let err = bridge
        .settle("finish suite", futures::future::pending::<Result<(), ClientError>>())
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().starts_with("finish suite did not settle"));
}

#[test]
fn test_rejection_is_typed() {
    let rt = runtime();
    let bridge = SyncBridge::new(rt.handle().clone(), Duration::from_secs(1));

    let err = bridge
        .settle("send log", async {
            Err::<(), _>(ClientError::Rejected("quota".to_string()))
        })
        .unwrap_err();

    match err {
        ReporterError::RemoteOperationFailure { operation, source } => {
            assert_eq!(operation, "send log");
            assert!(matches!(source, ClientError::Rejected(_)));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_operations_settle_in_call_order() {
    let rt = runtime();
    let bridge = SyncBridge::new(rt.handle().clone(), Duration::from_secs(2));
    let order = Arc::new(Mutex::new(Vec::new()));

    for (i, delay) in [30u64, 0, 10].into_iter().enumerate() {
        let order = order.clone();
        bridge.complete("ordered", async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            order.lock().unwrap().push(i);
            Ok::<_, ClientError>(())
        });
    }

    // Each call blocks until its operation settled, so slower ones cannot be
    // overtaken.
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_shared_between_threads() {
    let rt = runtime();
    let bridge = Arc::new(SyncBridge::new(rt.handle().clone(), Duration::from_secs(2)));

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let bridge = bridge.clone();
            std::thread::spawn(move || {
                bridge.complete("parallel", async move { Ok::<_, ClientError>(n * 10) })
            })
        })
        .collect();

    let mut results: Vec<_> = workers
        .into_iter()
        .map(|w| w.join().unwrap().unwrap())
        .collect();
    results.sort();
    assert_eq!(results, vec![0, 10, 20, 30]);
}

#[test]
fn test_max_wait_is_reported() {
    let rt = runtime();
    let bridge = SyncBridge::new(rt.handle().clone(), Duration::from_millis(1234));
    assert_eq!(bridge.max_wait(), Duration::from_millis(1234));
}

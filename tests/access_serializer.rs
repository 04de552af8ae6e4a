//! Access serializer behaviour against the in-memory store: one handshake,
//! one operation at a time, and recovery after failures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use reminders_mcp::access::WORKER_THREAD_NAME;
use reminders_mcp::backend::NewReminder;
use reminders_mcp::backend::memory::{MemoryConnector, PermissionScenario};
use reminders_mcp::error::Result;
use reminders_mcp::{RemindersError, StoreAccess};

fn access(connector: Arc<MemoryConnector>, timeout: Duration) -> Arc<StoreAccess> {
    Arc::new(StoreAccess::new(connector, timeout))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_operations_never_overlap() {
    let store = access(Arc::new(MemoryConnector::granted()), Duration::from_secs(5));
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let spans = Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let inside = Arc::clone(&inside);
        let overlaps = Arc::clone(&overlaps);
        let spans = Arc::clone(&spans);
        tasks.push(tokio::spawn(async move {
            store
                .run(move |_backend| {
                    if inside.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    let enter = Instant::now();
                    std::thread::sleep(Duration::from_millis(10));
                    let exit = Instant::now();
                    inside.store(false, Ordering::SeqCst);
                    spans.lock().unwrap().push((enter, exit));
                    Ok(())
                })
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    let mut spans = spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 8);
    spans.sort_by_key(|(enter, _)| *enter);
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "operations overlapped");
    }
}

#[tokio::test]
async fn operations_run_on_the_named_worker_thread() {
    let store = access(Arc::new(MemoryConnector::granted()), Duration::from_secs(5));
    let name = store
        .run(|_backend| Ok(std::thread::current().name().map(str::to_owned)))
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some(WORKER_THREAD_NAME));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_calls_share_one_handshake() {
    let connector =
        Arc::new(MemoryConnector::granted().with_response_delay(Duration::from_millis(50)));
    let store = access(Arc::clone(&connector), Duration::from_secs(5));

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move { store.get_handle().await }));
    }
    let handles: Vec<_> = futures_join(tasks).await;

    assert_eq!(connector.handshakes(), 1);
    let first = handles[0].as_ref().unwrap();
    for handle in &handles {
        assert!(Arc::ptr_eq(first, handle.as_ref().unwrap()));
    }
    assert!(store.is_ready());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waiters_all_see_the_same_failure() {
    let connector = Arc::new(
        MemoryConnector::new(PermissionScenario::Denied)
            .with_response_delay(Duration::from_millis(50)),
    );
    let store = access(Arc::clone(&connector), Duration::from_secs(5));

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move { store.get_handle().await }));
    }
    for outcome in futures_join(tasks).await {
        assert_eq!(outcome.unwrap_err(), RemindersError::AccessDenied);
    }
    assert_eq!(connector.handshakes(), 1);
    assert!(!store.is_ready());
}

#[tokio::test]
async fn denied_access_is_reported_and_retried_on_next_call() {
    let connector = Arc::new(MemoryConnector::new(PermissionScenario::Denied));
    let store = access(Arc::clone(&connector), Duration::from_secs(5));

    let err = store.run(|backend| backend.lists()).await.unwrap_err();
    assert_eq!(err, RemindersError::AccessDenied);
    assert_eq!(err.code(), "ACCESS_DENIED");
    assert!(!err.is_retryable());

    connector.set_scenario(PermissionScenario::Granted);
    let lists = store.run(|backend| backend.lists()).await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(connector.handshakes(), 2);
}

#[tokio::test]
async fn unanswered_prompt_times_out_then_retry_succeeds() {
    let connector = Arc::new(MemoryConnector::new(PermissionScenario::NeverResponds));
    let store = access(Arc::clone(&connector), Duration::from_millis(100));

    let err = store.get_handle().await.unwrap_err();
    assert_eq!(err, RemindersError::PermissionTimeout { seconds: 1 });
    assert!(err.is_retryable());
    assert!(!store.is_ready());

    connector.set_scenario(PermissionScenario::Granted);
    store.get_handle().await.unwrap();
    assert!(store.is_ready());
    assert_eq!(connector.handshakes(), 2);
}

#[tokio::test]
async fn native_handshake_error_keeps_its_details() {
    let native = RemindersError::Native {
        message: "store exploded".to_owned(),
        domain: Some("EKErrorDomain".to_owned()),
        code: Some(29),
    };
    let connector = Arc::new(MemoryConnector::new(PermissionScenario::Fails(native.clone())));
    let store = access(connector, Duration::from_secs(5));

    assert_eq!(store.get_handle().await.unwrap_err(), native);
}

#[tokio::test]
async fn failing_operation_releases_the_permit() {
    let store = access(Arc::new(MemoryConnector::granted()), Duration::from_secs(5));

    let err = store
        .run(|backend| backend.reminder("does-not-exist"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let created = tokio::time::timeout(
        Duration::from_secs(2),
        store.run(|backend| backend.create_reminder(&NewReminder::titled("after", None))),
    )
    .await
    .expect("permit was not released")
    .unwrap();
    assert_eq!(created.title, "after");
}

#[tokio::test]
async fn panicking_operation_becomes_native_error_and_worker_survives() {
    let store = access(Arc::new(MemoryConnector::granted()), Duration::from_secs(5));

    let err = store
        .run(|_backend| -> Result<()> { panic!("boom") })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NATIVE_ERROR");
    assert!(err.to_string().contains("boom"));

    let lists = tokio::time::timeout(Duration::from_secs(2), store.run(|b| b.lists()))
        .await
        .expect("permit was not released")
        .unwrap();
    assert_eq!(lists.len(), 1);
}

#[tokio::test]
async fn dropped_caller_does_not_leak_the_permit() {
    let store = access(Arc::new(MemoryConnector::granted()), Duration::from_secs(5));
    store.get_handle().await.unwrap();

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .run(|_backend| {
                    std::thread::sleep(Duration::from_millis(50));
                    Ok(())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    slow.abort();

    let lists = tokio::time::timeout(Duration::from_secs(2), store.run(|b| b.lists()))
        .await
        .expect("permit was not released")
        .unwrap();
    assert_eq!(lists.len(), 1);
}

async fn futures_join<T>(tasks: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        out.push(task.await.unwrap());
    }
    out
}

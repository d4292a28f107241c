//! Background attempts: one result, then a closed channel.

use crate::helpers::{CountingReader, ScriptedRunner, release, upgrader};
use selfup::InstallError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn completed_attempt_delivers_once() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.1.0"));
    let runner = Arc::new(ScriptedRunner::default());
    let mut rx =
        upgrader(reader, runner.clone()).upgrade_background(CancellationToken::new(), "");

    let result = rx.recv().await.expect("result delivered");
    assert!(result.install_error().is_none());
    assert!(result.did_upgrade());
    assert!(rx.recv().await.is_none());
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn skipped_attempt_delivers_once() {
    let reader = Arc::new(CountingReader::new(None, "1.1.0"));
    let runner = Arc::new(ScriptedRunner::default());
    let mut rx =
        upgrader(reader, runner.clone()).upgrade_background(CancellationToken::new(), "");

    let result = rx.recv().await.expect("result delivered");
    assert!(result.current_metadata().is_none());
    assert!(rx.recv().await.is_none());
    assert_eq!(runner.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_mid_install_delivers_once() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.0.0"));
    let runner = Arc::new(ScriptedRunner {
        hang: true,
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    let mut rx = upgrader(reader, runner).upgrade_background(cancel.clone(), "cmd/tool");

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no hang")
        .expect("result delivered");
    // Either side of the race reports cancellation.
    assert!(matches!(result.install_error(), Some(InstallError::Canceled)));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn many_background_attempts_each_deliver_once() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.0.0"));
    let runner = Arc::new(ScriptedRunner::default());
    let upgrader = upgrader(reader, runner.clone());

    let mut receivers: Vec<_> = (0..4)
        .map(|_| upgrader.upgrade_background(CancellationToken::new(), ""))
        .collect();
    for rx in &mut receivers {
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
    assert_eq!(runner.calls(), 4);
}

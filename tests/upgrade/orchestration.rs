//! Synchronous upgrade attempts against test doubles.

use crate::helpers::{CountingReader, ScriptedRunner, release, upgrader};
use selfup::{BuildMetadata, DEVELOPMENT_VERSION, InstallError, SkipReason};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn development_build_never_invokes_installer() {
    let reader = Arc::new(CountingReader::new(
        Some(BuildMetadata::new("demo", DEVELOPMENT_VERSION)),
        "9.9.9",
    ));
    let runner = Arc::new(ScriptedRunner::default());

    let result = upgrader(reader.clone(), runner.clone())
        .upgrade(&CancellationToken::new(), "")
        .await;

    assert!(result.install_error().is_none());
    assert!(!result.did_upgrade());
    assert_eq!(result.skip_reason(), Some(SkipReason::DevelopmentBuild));
    assert_eq!(runner.calls(), 0);
    assert_eq!(reader.reads(), 0);
}

#[tokio::test]
async fn absent_metadata_yields_empty_result() {
    let reader = Arc::new(CountingReader::new(None, "9.9.9"));
    let runner = Arc::new(ScriptedRunner::default());

    let result = upgrader(reader, runner.clone())
        .upgrade(&CancellationToken::new(), "cmd/tool")
        .await;

    assert!(result.current_metadata().is_none());
    assert!(result.install_error().is_none());
    assert!(!result.did_upgrade());
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn root_package_target() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.0.0"));
    let runner = Arc::new(ScriptedRunner::default());

    upgrader(reader, runner.clone())
        .upgrade(&CancellationToken::new(), "")
        .await;

    assert_eq!(*runner.targets.lock().unwrap(), vec!["demo".to_owned()]);
}

#[tokio::test]
async fn default_installer_gets_bare_crate_name() {
    let reader = Arc::new(CountingReader::new(
        Some(BuildMetadata::new("github.com/acme/tools", "1.0.0")),
        "1.1.0",
    ));
    let runner = Arc::new(ScriptedRunner::default());

    let result = upgrader(reader, runner.clone())
        .upgrade(&CancellationToken::new(), "crates/demo")
        .await;

    assert!(result.install_error().is_none());
    assert_eq!(*runner.targets.lock().unwrap(), vec!["demo".to_owned()]);
}

#[tokio::test]
async fn installer_error_is_surfaced_verbatim() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.0.0"));
    let runner = Arc::new(ScriptedRunner {
        exit_code: Some(2),
        ..Default::default()
    });

    let result = upgrader(reader, runner)
        .upgrade(&CancellationToken::new(), "")
        .await;

    assert!(matches!(
        result.install_error(),
        Some(InstallError::Exit { code: Some(2) })
    ));
    assert!(!result.did_upgrade());
    assert_eq!(result.current_metadata(), release("1.0.0").as_ref());
}

#[tokio::test]
async fn each_attempt_installs_again() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.0.0"));
    let runner = Arc::new(ScriptedRunner {
        exit_code: Some(1),
        ..Default::default()
    });
    let upgrader = upgrader(reader, runner.clone());

    let first = upgrader.upgrade(&CancellationToken::new(), "").await;
    let second = upgrader.upgrade(&CancellationToken::new(), "").await;

    assert!(first.install_error().is_some());
    assert!(second.install_error().is_some());
    assert_eq!(runner.calls(), 2);
}

#[tokio::test]
async fn cancelled_install_is_recorded() {
    let reader = Arc::new(CountingReader::new(release("1.0.0"), "1.0.0"));
    let runner = Arc::new(ScriptedRunner {
        hang: true,
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = upgrader(reader, runner).upgrade(&cancel, "").await;

    assert!(matches!(result.install_error(), Some(InstallError::Canceled)));
    assert!(result.current_metadata().is_some());
}

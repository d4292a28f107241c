//! Upgrade this binary to the newest published build.
//!
//! `selfup --version` prints `selfup <version>`, which is what the version
//! reader parses after an install. `selfup [CONFIG]` runs one upgrade
//! attempt using the TOML config at `CONFIG` (or the default config path,
//! falling back to built-in defaults). Ctrl-C cancels the install.
//!
//! Tracing output goes to stderr; set `RUST_LOG=selfup=debug` for detail.

use selfup::{UpgradeConfig, UpgradeResult, Upgrader, VersionCommandReader, build_metadata};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--version" | "-V") => {
            let meta = build_metadata!();
            println!("{} {}", meta.module, meta.version);
            return Ok(());
        }
        Some("help" | "--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = args
        .get(1)
        .map_or_else(UpgradeConfig::default_config_path, PathBuf::from);
    let config = UpgradeConfig::load_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("cannot load {}: {e}", config_path.display()))?;

    let reader = Arc::new(VersionCommandReader::new(Some(build_metadata!())));
    let upgrader = Upgrader::from_config(&config, reader);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling upgrade");
            on_interrupt.cancel();
        }
    });

    let mut rx = upgrader.upgrade_background(cancel, config.package_path.clone());
    let Some(result) = rx.recv().await else {
        anyhow::bail!("upgrade task ended without a result");
    };

    if let Some(reason) = result.skip_reason() {
        tracing::info!(%reason, "upgrade skipped");
        return Ok(());
    }
    if let Some(err) = result.install_error() {
        tracing::error!(error = %err, "install failed");
    }

    // Reading the new binary runs it synchronously; keep that off the runtime.
    tokio::task::spawn_blocking(move || report(&result)).await?;
    Ok(())
}

fn report(result: &UpgradeResult) {
    match result.new_build_info() {
        Ok(new) if result.did_upgrade() => {
            tracing::info!(version = %new.version, "upgraded, restart to use the new version");
        }
        Ok(new) => tracing::info!(version = %new.version, "already up to date"),
        Err(e) => tracing::warn!(error = %e, "cannot read installed binary version"),
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  selfup [CONFIG]   upgrade using CONFIG (default: ~/.config/selfup/config.toml)");
    println!("  selfup --version  print name and version");
}

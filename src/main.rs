use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pos_cart_lib::{build_info, console, logging, scanner, BackendClient, PosConfig, PosSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PosConfig::load().context("Failed to load configuration")?;
    let _guard = logging::init(config.log_dir.as_deref());

    let (version, git_sha, built_at) = build_info();
    info!(
        version,
        git_sha,
        built_at,
        api = %config.api_base_url,
        "Starting pos-cart"
    );

    let backend = BackendClient::new(&config).context("Failed to create backend client")?;
    let scanner_port = config.scanner_port.clone();
    let baud_rate = config.scanner_baud_rate;
    let mut session = PosSession::new(backend, config);

    // The cart is usable without a catalog; product operations report
    // CatalogNotReady until `refresh` succeeds.
    match session.refresh_catalog().await {
        Ok(count) => info!(products = count, "Catalog loaded"),
        Err(e) => warn!(error = %e, "Catalog load failed, use `refresh` to retry"),
    }

    let cancel = CancellationToken::new();
    let mut scanner_task = None;
    let scans = match scanner_port {
        Some(port) => {
            let (tx, rx) = mpsc::channel(32);
            match scanner::start(&port, baud_rate, tx, cancel.clone()) {
                Ok(handle) => {
                    scanner_task = Some(handle);
                    Some(rx)
                }
                Err(e) => {
                    warn!(error = %e, "Serial scanner unavailable, manual entry only");
                    None
                }
            }
        }
        None => None,
    };

    let result = console::run(&mut session, scans).await;

    cancel.cancel();
    if let Some(handle) = scanner_task {
        handle.await.ok();
    }
    result.context("Console I/O failed")?;
    info!("pos-cart stopped");
    Ok(())
}

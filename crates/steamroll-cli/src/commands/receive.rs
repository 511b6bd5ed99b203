//! The `receive` subcommand: accepts inbound transfer sessions until
//! interrupted.

use std::path::PathBuf;

use protocol::TransferError;
use receiver::{ReceiveContext, ReceiverOptions};
use resume::DestinationLocks;

use crate::settings::Settings;

/// Arguments specific to the `receive` subcommand.
pub struct ReceiveArgs {
    /// Overrides the configured library root.
    pub library_root: Option<PathBuf>,
}

/// Serves inbound connections on [`Settings::bind_addr`] until the process
/// receives `Ctrl+C`.
///
/// Connections are served one at a time rather than concurrently: this
/// reference CLI demonstrates driving [`receiver::handle_connection`]
/// directly, and a deployment wanting concurrent sessions spawns a task per
/// accepted connection around the same call (see `DESIGN.md`).
///
/// # Errors
///
/// Returns [`TransferError`] if the listener cannot be bound.
pub async fn run(
    settings: &Settings,
    args: ReceiveArgs,
    pairing: &dyn crypto::PairingStore,
) -> Result<(), TransferError> {
    let library_root = args.library_root.unwrap_or_else(|| settings.library_root.clone());
    std::fs::create_dir_all(&library_root)?;

    let options = ReceiverOptions {
        library_root,
        require_encryption: settings.require_encryption,
        device_id: settings.device_id.clone(),
    };
    let limiter = bandwidth::Limiter::new({
        let rate = settings.transfer_speed_limit_bps;
        move || rate
    });
    let locks = DestinationLocks::new();

    let listener = tokio::net::TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!(addr = %settings.bind_addr(), "receiver listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let ctx = ReceiveContext {
                    options: &options,
                    pairing,
                    limiter: &limiter,
                    locks: &locks,
                    progress: None,
                    approvals: None,
                    library: None,
                    cancel: receiver::CancellationToken::new(),
                };
                match receiver::handle_connection(stream, peer_addr, &ctx).await {
                    Ok(outcome) => tracing::info!(peer = %peer_addr, ?outcome, "session finished"),
                    Err(error) => tracing::warn!(peer = %peer_addr, %error, "session failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("receiver shutting down");
                return Ok(());
            }
        }
    }
}

//! The `send` subcommand: drives one outbound [`sender::send`] session.

use std::net::SocketAddr;
use std::path::PathBuf;

use protocol::progress::{ProgressEvent, SessionOutcome};
use protocol::wire::TransferType;
use protocol::{PackageMetadata, TransferError};
use sender::SendRequest;

use crate::settings::Settings;

/// Arguments specific to the `send` subcommand, already resolved from CLI
/// flags (settings layering happens in [`crate::run`]).
pub struct SendArgs {
    /// Address of the peer's transfer listener.
    pub addr: SocketAddr,
    /// Root directory of the package (or save) to send.
    pub package_root: PathBuf,
    /// Display name advertised in the transfer header.
    pub game_name: String,
    /// Path to `steamroll.json`, if present.
    pub metadata: Option<PathBuf>,
    /// Sends a `SaveSync` batch instead of a `Package`.
    pub save_sync: bool,
    /// Requests in-stream GZip compression.
    pub compress: bool,
    /// Skips the `SEND_FILES` step (§4.8 `[ADDED]` dry run).
    pub dry_run: bool,
}

/// Runs the `send` subcommand to completion.
///
/// # Errors
///
/// Returns [`TransferError`] on any failure reaching or exchanging frames
/// with the peer; see [`sender::send`].
pub async fn run(
    settings: &Settings,
    args: SendArgs,
    pairing: &dyn crypto::PairingStore,
) -> Result<SessionOutcome, TransferError> {
    let metadata = args
        .metadata
        .as_deref()
        .map(PackageMetadata::load)
        .transpose()?;

    let limiter = bandwidth::Limiter::new({
        let rate = settings.transfer_speed_limit_bps;
        move || rate
    });

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressEvent>(8);
    let printer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            if let Some(file) = &event.current_file {
                println!(
                    "{}/{} files, {}/{} bytes ({file})",
                    event.files_done, event.files_total, event.bytes_done, event.bytes_total
                );
            }
        }
    });

    let request = SendRequest {
        package_root: args.package_root,
        game_name: args.game_name,
        metadata: metadata.as_ref(),
        transfer_type: if args.save_sync {
            TransferType::SaveSync
        } else {
            TransferType::Package
        },
        enable_compression: args.compress || settings.enable_compression,
        require_encryption: settings.require_encryption,
        device_id: settings.device_id.clone(),
        is_received: false,
        dry_run: args.dry_run,
    };

    let outcome = sender::send(args.addr, request, pairing, &limiter, Some(progress_tx)).await;
    let _ = printer.await;
    outcome
}

//! Thin, testable entry point: parses arguments, resolves settings, and
//! dispatches to the subcommand modules under [`crate::commands`], mapping
//! the result onto a process exit code (`[ADDED]` §7: "the CLI crate's
//! thin `main` does translate `SessionOutcome::Failed` into a non-zero
//! process exit matching the taxonomy's severity").

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use crypto::FilePairingStore;
use logging::Verbosity;
use protocol::progress::SessionOutcome;
use protocol::TransferError;

use crate::cli::{Cli, Command};
use crate::commands::{discover, receive, send, swarm_pull};
use crate::settings::Settings;

/// Runs the CLI end to end: parses `args`, loads settings, dispatches the
/// requested subcommand on a fresh multi-thread Tokio runtime, and returns
/// the process exit code.
///
/// Parse errors (clap's own `--help`/invalid-argument handling) print to
/// stderr and map to exit code `2`, matching `clap`'s own convention.
#[must_use]
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2));
        }
    };

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::from_occurrences(cli.verbose)
    };
    let _ = logging::init_tracing(verbosity);

    let mut settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(1);
        }
    };
    apply_cli_overrides(&mut settings, &cli);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start the Tokio runtime: {error}");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(dispatch(settings, cli.command))
}

fn apply_cli_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(device_id) = &cli.device_id {
        settings.device_id = device_id.clone();
    }
    if cli.require_encryption {
        settings.require_encryption = true;
    }
    if let Some(bps) = cli.speed_limit_bps {
        settings.transfer_speed_limit_bps = bps;
    }
}

async fn dispatch(settings: Settings, command: Command) -> ExitCode {
    let pairing = match FilePairingStore::load(&settings.pairing_store_path) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("failed to load pairing store: {error}");
            return ExitCode::from(1);
        }
    };

    match command {
        Command::Send {
            addr,
            package_root,
            game_name,
            metadata,
            save_sync,
            compress,
            dry_run,
        } => {
            let result = send::run(
                &settings,
                send::SendArgs {
                    addr,
                    package_root,
                    game_name,
                    metadata,
                    save_sync,
                    compress,
                    dry_run,
                },
                &pairing,
            )
            .await;
            exit_code_for_session(result)
        }
        Command::Receive { library_root } => {
            match receive::run(&settings, receive::ReceiveArgs { library_root }, &pairing).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    eprintln!("{error}");
                    exit_code_for_error(&error)
                }
            }
        }
        Command::Discover { seconds } => match discover::run(&settings, seconds).await {
            Ok(peers) => {
                for peer in &peers {
                    println!(
                        "{}\t{}:{}\t{} packages",
                        peer.host_name, peer.address, peer.transfer_port, peer.packaged_game_count
                    );
                }
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("{error}");
                exit_code_for_error(&error)
            }
        },
        Command::SwarmPull {
            peers,
            game_name,
            relative_path,
            destination,
            size,
            expected_hash,
        } => {
            let pairing: Arc<dyn crypto::PairingStore> = Arc::new(pairing);
            let result = swarm_pull::run(
                &settings,
                swarm_pull::SwarmPullArgs {
                    peers,
                    game_name,
                    relative_path,
                    destination,
                    size,
                    expected_hash,
                },
                pairing,
            )
            .await;
            exit_code_for_session(result)
        }
    }
}

fn exit_code_for_session(result: Result<SessionOutcome, TransferError>) -> ExitCode {
    match result {
        Ok(SessionOutcome::Success { .. }) => ExitCode::SUCCESS,
        Ok(SessionOutcome::Failed { message }) => {
            eprintln!("transfer failed: {message}");
            ExitCode::from(1)
        }
        Err(error) => {
            eprintln!("{error}");
            exit_code_for_error(&error)
        }
    }
}

/// Maps a [`TransferError`] onto an exit code whose ordering reflects the
/// taxonomy's severity (§7): protocol/path/integrity violations above
/// resource/policy rejections above transient I/O.
const fn exit_code_for_error(error: &TransferError) -> ExitCode {
    let code = match error {
        TransferError::Path { .. } => 10,
        TransferError::Integrity { .. } => 11,
        TransferError::Auth { .. } => 12,
        TransferError::Protocol { .. } => 13,
        TransferError::Policy { .. } => 14,
        TransferError::Resource { .. } => 15,
        TransferError::Io { .. } => 16,
        TransferError::Cancelled => 17,
    };
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_subcommand_reports_clap_exit_code() {
        let exit = run(["steamroll-transfer", "not-a-command"]);
        assert_eq!(exit, ExitCode::from(2));
    }

    #[test]
    fn swarm_pull_with_an_unparsable_peer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.bin");
        let exit = run([
            "steamroll-transfer".to_owned(),
            "--config".to_owned(),
            dir.path().join("steamroll-transfer.toml").display().to_string(),
            "swarm-pull".to_owned(),
            "--peer".to_owned(),
            "not-a-valid-peer-descriptor".to_owned(),
            "--size".to_owned(),
            "1024".to_owned(),
            "--expected-hash".to_owned(),
            "deadbeef".to_owned(),
            "Example Game".to_owned(),
            "large.bin".to_owned(),
            destination.display().to_string(),
        ]);
        assert_eq!(exit, ExitCode::from(13));
    }
}

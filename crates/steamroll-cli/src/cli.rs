//! Command-line surface (`[ADDED]` §6.7): global flags common to every
//! subcommand, plus one subcommand per external interface the transfer
//! core exposes (send, receive, discover, swarm-pull).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Peer-to-peer game-package transfer client.
#[derive(Parser, Debug)]
#[command(name = "steamroll-transfer", version, about)]
pub struct Cli {
    /// Path to an optional `steamroll-transfer.toml` settings file.
    #[arg(long, global = true, default_value = "steamroll-transfer.toml")]
    pub config: PathBuf,

    /// Increases logging verbosity; repeatable (`-v`, `-vv`).
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only logs warnings and errors.
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overrides the configured device id.
    #[arg(long, global = true)]
    pub device_id: Option<String>,

    /// Overrides the configured requirement that sessions be `V3` encrypted.
    #[arg(long, global = true)]
    pub require_encryption: bool,

    /// Overrides the configured rate cap, in bytes/second (`0` = unlimited).
    #[arg(long, global = true)]
    pub speed_limit_bps: Option<u64>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// One external interface of the transfer core, wired to a subcommand.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sends a package (or a save-sync batch) to a listening peer.
    Send {
        /// Address of the peer's transfer listener.
        addr: SocketAddr,
        /// Root directory of the package (or save) to send.
        package_root: PathBuf,
        /// Display name advertised in the transfer header.
        game_name: String,
        /// Path to the package's `steamroll.json`, if present, for smart
        /// hashing (§4.8).
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Sends a `SaveSync` batch instead of a `Package`.
        #[arg(long)]
        save_sync: bool,
        /// Requests in-stream GZip compression of file payloads.
        #[arg(long)]
        compress: bool,
        /// Performs manifest and ACK exchange only; reports what would be
        /// sent without transmitting any file bytes (§4.8 `[ADDED]`).
        #[arg(long)]
        dry_run: bool,
    },

    /// Listens for inbound transfer sessions until interrupted.
    Receive {
        /// Overrides the configured library root this process writes
        /// received packages under.
        #[arg(long)]
        library_root: Option<PathBuf>,
    },

    /// Announces this device's presence and reports peers heard from for
    /// a fixed window.
    Discover {
        /// How long to listen for announcements before reporting results.
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },

    /// Downloads one file from several peers at once, block by block
    /// (§4.10).
    SwarmPull {
        /// Source peers as `id@address:port`, repeatable.
        #[arg(long = "peer", required = true)]
        peers: Vec<String>,
        /// Display name of the package the file belongs to.
        game_name: String,
        /// Forward-slash relative path of the file within the package.
        relative_path: String,
        /// Where to write the reconstructed file.
        destination: PathBuf,
        /// Total size of the file in bytes.
        #[arg(long)]
        size: u64,
        /// Expected `XxHash64` hex digest of the reconstructed file.
        #[arg(long)]
        expected_hash: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_send_invocation() {
        let cli = Cli::parse_from([
            "steamroll-transfer",
            "send",
            "127.0.0.1:27051",
            "/tmp/package",
            "Portal 2",
        ]);
        match cli.command {
            Command::Send { addr, game_name, .. } => {
                assert_eq!(addr, "127.0.0.1:27051".parse().unwrap());
                assert_eq!(game_name, "Portal 2");
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn verbose_flag_is_repeatable() {
        let cli = Cli::parse_from(["steamroll-transfer", "-vv", "discover"]);
        assert_eq!(cli.verbose, 2);
    }
}

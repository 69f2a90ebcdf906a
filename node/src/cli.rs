//! # CLI Interface
//!
//! Defines the command-line argument structure for `hongbao-node` using
//! `clap` derive. Supports three subcommands: `run`, `status`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hongbao_engine::config::DEFAULT_RPC_PORT;

/// Hongbao envelope service node.
///
/// Serves the envelope lifecycle engine over a REST API: mint time-locked
/// yield envelopes, query and transfer them, and burn them once unlocked.
#[derive(Parser, Debug)]
#[command(
    name = "hongbao-node",
    about = "Hongbao envelope service node",
    version,
    propagate_version = true
)]
pub struct HongbaoNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the hongbao node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the envelope service.
    Run(RunArgs),
    /// Query the status of a running node via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the REST API.
    #[arg(long, env = "HONGBAO_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Annual yield rate of the devnet vault, in basis points.
    #[arg(long, env = "HONGBAO_APY_BPS", default_value_t = hongbao_engine::config::DEFAULT_APY_BPS)]
    pub apy_bps: u32,

    /// Path to the JSON state snapshot.
    ///
    /// Loaded at startup if it exists; written back on shutdown. When
    /// omitted, the node runs purely in memory and forgets everything on
    /// exit.
    #[arg(long, short = 's', env = "HONGBAO_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "HONGBAO_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:8920")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        HongbaoNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_config() {
        let cli = HongbaoNodeCli::parse_from(["hongbao-node", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
                assert_eq!(args.apy_bps, hongbao_engine::config::DEFAULT_APY_BPS);
                assert!(args.state_file.is_none());
            }
            other => panic!("expected Run, got {:?}", other),
        }
    }
}

// Copyright (c) 2026 Hongbao Contributors. MIT License.
// See LICENSE for details.

//! # Hongbao Node
//!
//! Entry point for the `hongbao-node` binary. Parses CLI arguments,
//! initializes logging, restores engine state from the snapshot file, and
//! serves the REST API until shutdown.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the envelope service
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod snapshot;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;

use hongbao_engine::{EnvelopeEngine, FixedRateVault, SystemClock};

use cli::{Commands, HongbaoNodeCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = HongbaoNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the envelope service: restores state, serves the API, and writes
/// the state back on shutdown.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "hongbao_node=info,hongbao_engine=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        apy_bps = args.apy_bps,
        state_file = ?args.state_file,
        "starting hongbao-node"
    );

    // --- Engine ---
    let vault = FixedRateVault::new(SystemClock, args.apy_bps);
    let engine = match &args.state_file {
        Some(path) => match snapshot::load(path)? {
            Some(snap) => {
                let engine = EnvelopeEngine::from_snapshot(snap, vault, SystemClock);
                tracing::info!(
                    path = %path.display(),
                    active = engine.active_count(),
                    total_minted = engine.total_minted(),
                    "state restored from snapshot"
                );
                engine
            }
            None => {
                tracing::info!(path = %path.display(), "no snapshot found, starting fresh");
                EnvelopeEngine::new(vault, SystemClock)
            }
        },
        None => EnvelopeEngine::new(vault, SystemClock),
    };
    let engine = Arc::new(RwLock::new(engine));

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (engine {})",
            env!("CARGO_PKG_VERSION"),
            hongbao_engine::config::ENGINE_VERSION,
        ),
        network: "devnet".to_string(),
        apy_bps: args.apy_bps,
        engine: Arc::clone(&engine),
    };

    // --- API server ---
    let router = api::create_router(app_state);
    let addr = format!("0.0.0.0:{}", args.rpc_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", addr))?;
    tracing::info!("RPC/API server listening on {}", addr);

    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    // --- Persist state ---
    if let Some(path) = &args.state_file {
        let snap = engine.read().await.snapshot();
        snapshot::save(path, &snap)
            .with_context(|| format!("failed to persist state to {}", path.display()))?;
        tracing::info!(path = %path.display(), "state snapshot written");
    }

    tracing::info!("hongbao-node stopped");
    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let (host, port, path) = split_url(&args.rpc_url)?;
    let body = http_get(&host, port, &format!("{}/status", path.trim_end_matches('/'))).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP GET over a raw TCP stream. Enough for the `status`
/// subcommand without pulling in an HTTP client dependency.
async fn http_get(host: &str, port: u16, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());
    Ok(body)
}

/// Splits an `http://host[:port][/path]` URL into its parts.
fn split_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], rest[i..].to_string()),
        None => (rest, String::new()),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => {
            let port = p
                .parse::<u16>()
                .with_context(|| format!("invalid port in URL: {}", p))?;
            (h.to_string(), port)
        }
        None => (authority.to_string(), 80),
    };
    Ok((host, port, path))
}

/// Prints version information to stdout.
fn print_version() {
    println!("hongbao-node {}", env!("CARGO_PKG_VERSION"));
    println!("engine       {}", hongbao_engine::config::ENGINE_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

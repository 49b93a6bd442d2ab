// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use bindman_swarm_listener::{
    config::{Cli, ListenerConfig},
    context::Context,
    docker::DockerClient,
    errors::StartupError,
    manager::BindmanClient,
    server,
    supervisor::{self, Shutdown},
};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(StartupError::Usage(e).exit_code());
        }
    };

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("swarm-listener")
        .enable_all()
        .build()?;

    let exit_code = runtime.block_on(async_main(cli));
    runtime.shutdown_background();
    std::process::exit(exit_code)
}

async fn async_main(cli: Cli) -> i32 {
    init_logging();
    info!("Starting Bindman swarm listener");

    match run(cli).await {
        Ok(shutdown) => {
            info!(reason = ?shutdown.reason, exit_code = shutdown.exit_code, "Swarm listener stopped");
            shutdown.exit_code
        }
        Err(e) => {
            error!(error = %e, "Not possible to start the swarm listener");
            e.exit_code()
        }
    }
}

/// Initialize logging.
///
/// Respects RUST_LOG (defaults to INFO) and RUST_LOG_FORMAT (`text` or `json`).
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn run(cli: Cli) -> Result<Shutdown, StartupError> {
    let config = ListenerConfig::try_from(cli)?;
    debug!(
        manager = %config.manager_address,
        reverse_proxy = %config.reverse_proxy_address,
        tags = ?config.tags,
        docker_host = %config.docker_host,
        "Configuration loaded"
    );

    let docker = DockerClient::new(&config.docker_host).map_err(StartupError::DockerClient)?;
    debug!(base_url = %docker.base_url(), "Docker client initialized");

    let manager =
        BindmanClient::new(&config.manager_address).map_err(StartupError::ManagerClient)?;
    debug!(base_url = %manager.base_url(), "DNS manager client initialized");

    let token = CancellationToken::new();

    if let Some(address) = &config.metrics_address {
        let listener = server::bind(address).await?;
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = server::serve(listener, token).await {
                error!(error = %e, "Metrics endpoint stopped");
            }
        });
    }

    let ctx = Arc::new(Context::new(config, Arc::new(docker), Arc::new(manager)));
    Ok(supervisor::run_until(ctx, token, supervisor::shutdown_signal()).await)
}

// src/main.rs - Setpoint node entry point
use std::path::PathBuf;

use clap::Parser;
use setpoint_rs::config::{self, Config};
use setpoint_rs::node::Node;
use setpoint_rs::transport::AxisConvention;

const DEFAULT_CONFIG: &str = "setpoint.toml";

#[derive(Parser, Debug)]
#[command(name = "setpoint-node", version, about = "Streams 2D motion setpoints at a fixed rate")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Tick period in seconds
    #[arg(long)]
    dt: Option<f64>,
    /// Direction of positive y for emitted setpoints
    #[arg(long, value_enum)]
    y_positive: Option<AxisConvention>,
    /// Serve the HTTP API on this address
    #[arg(long, value_name = "ADDR")]
    http: Option<String>,
    /// Do not read commands from stdin
    #[arg(long)]
    no_stdin: bool,
    /// Do not emit status messages
    #[arg(long)]
    no_status: bool,
    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load(&self) -> Result<Config, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => config::load_config_or_default(DEFAULT_CONFIG)?,
        };
        if let Some(dt) = self.dt {
            config.planner.dt = dt;
        }
        if let Some(axis) = self.y_positive {
            config.egress.y_positive = axis;
        }
        if let Some(addr) = &self.http {
            config.ingress.http_bind = Some(addr.clone());
        }
        if self.no_stdin {
            config.ingress.stdin = false;
        }
        if self.no_status {
            config.egress.status = false;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // stdout carries setpoints; logs go to stderr
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting setpoint node v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let node = Node::new(config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async move {
        let shutdown = node.shutdown_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, shutting down");
                let _ = shutdown.send(());
            }
        });
        node.run().await
    });
    // a pending stdin read would otherwise keep the runtime alive
    runtime.shutdown_background();

    let planner = result?;
    tracing::info!("Final position: ({:.2}, {:.2})", planner.position().x, planner.position().y);
    Ok(())
}

// src/node.rs - Wires configuration, mailbox, publish loop and transports
use thiserror::Error;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::{Config, ConfigError};
use crate::mailbox::Mailbox;
use crate::planner::Planner;
use crate::publisher::PublishLoop;
use crate::transport::{
    CommandIngress, Egress, JsonLinesSink, OutboundSink, TransportError, read_commands, run_egress,
};
use crate::web::api::{AppState, create_router};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A configured setpoint node, ready to run.
pub struct Node {
    config: Config,
    shutdown_tx: broadcast::Sender<()>,
}

impl Node {
    pub fn new(config: Config) -> Result<Self, NodeError> {
        config.validate()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self { config, shutdown_tx })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sending on the returned handle stops a running node.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run on stdin/stdout as configured.
    pub async fn run(self) -> Result<Planner, NodeError> {
        let input = self
            .config
            .ingress
            .stdin
            .then(|| BufReader::new(tokio::io::stdin()));
        self.run_with(input, JsonLinesSink::new(tokio::io::stdout())).await
    }

    /// Run with an explicit command source and outbound sink until shutdown,
    /// returning the final planner state.
    pub async fn run_with<R, S>(self, input: Option<R>, sink: S) -> Result<Planner, NodeError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        S: OutboundSink + 'static,
    {
        let Node { config, shutdown_tx } = self;
        let loop_shutdown = shutdown_tx.subscribe();

        let mailbox = Mailbox::new();
        let ingress = CommandIngress::new(mailbox.clone());
        let (egress, egress_rx) = Egress::channel(config.egress.buffer);

        tracing::info!(
            dt = config.planner.period().as_secs_f64(),
            line_speed = config.planner.line_speed,
            y_positive = ?config.egress.y_positive,
            status = config.egress.status,
            "starting setpoint node"
        );

        let http = match &config.ingress.http_bind {
            Some(addr) => {
                let listener = tokio::net::TcpListener::bind(addr).await.map_err(|source| {
                    TransportError::Bind {
                        addr: addr.clone(),
                        source,
                    }
                })?;
                tracing::info!("HTTP API listening on http://{}", listener.local_addr().map_err(TransportError::Io)?);
                let app = create_router(AppState::new(ingress.clone(), &egress));
                let mut http_shutdown = shutdown_tx.subscribe();
                Some(tokio::spawn(async move {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move {
                            let _ = http_shutdown.recv().await;
                        })
                        .await
                }))
            }
            None => None,
        };

        let reader = input.map(|input| {
            let ingress = ingress.clone();
            tokio::spawn(async move {
                if let Err(e) = read_commands(input, ingress).await {
                    tracing::error!("command input failed: {}", e);
                }
            })
        });

        let egress_task = tokio::spawn(run_egress(egress_rx, sink));

        let planner = Planner::with_line_speed(Instant::now(), config.planner.line_speed);
        let publish = PublishLoop::new(planner, mailbox, egress, config.loop_settings());
        let planner = tokio::spawn(publish.run(loop_shutdown)).await?;

        if let Some(reader) = reader {
            reader.abort();
        }
        // The loop owned the only egress sender, so this drains and ends.
        egress_task.await?;
        if let Some(http) = http {
            http.await?.map_err(TransportError::Io)?;
        }

        tracing::info!(seq = planner.seq(), "setpoint node stopped");
        Ok(planner)
    }
}

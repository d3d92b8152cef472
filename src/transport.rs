// src/transport.rs - Wire messages and transport-agnostic ingress/egress
//!
//! The planner core only needs two things from a transport: a way to deliver
//! decoded commands to the mailbox ([`CommandIngress`]) and a way to accept
//! outbound messages without blocking ([`Egress`]). The JSON-lines adapters
//! here run those over any async reader/writer (stdin/stdout in the binary).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

use crate::command::{CommandEnvelope, CommandError, decode_envelope};
use crate::mailbox::Mailbox;
use crate::planner::{Ack, Planner, PlannerMode, Setpoint};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which way positive y points for the downstream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AxisConvention {
    #[default]
    Up,
    /// Emitted y is negated
    Down,
}

impl AxisConvention {
    pub fn apply_y(&self, y: f64) -> f64 {
        match self {
            AxisConvention::Up => y,
            AxisConvention::Down => -y,
        }
    }
}

/// Wall-clock Unix time in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `{x, y, seq, t_ms}` sent once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointMessage {
    pub x: f64,
    pub y: f64,
    pub seq: u64,
    pub t_ms: i64,
}

impl SetpointMessage {
    pub fn new(setpoint: &Setpoint, axis: AxisConvention, t_ms: i64) -> Self {
        Self {
            x: round2(setpoint.point.x),
            y: round2(axis.apply_y(setpoint.point.y)),
            seq: setpoint.seq,
            t_ms,
        }
    }
}

/// Informational report produced after each applied command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    pub ok: bool,
    pub note: String,
    pub t_ms: i64,
    pub mode: PlannerMode,
    pub paused: bool,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Value>,
}

impl StatusMessage {
    pub fn new(ack: &Ack, planner: &Planner, envelope: &CommandEnvelope, t_ms: i64) -> Self {
        let position = planner.position();
        Self {
            ok: ack.ok,
            note: ack.note.clone(),
            t_ms,
            mode: planner.mode(),
            paused: planner.is_paused(),
            x: round2(position.x),
            y: round2(position.y),
            cmd: (!envelope.raw.is_null()).then(|| envelope.raw.clone()),
        }
    }
}

/// Everything the node sends out, tagged by topic on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", rename_all = "lowercase")]
pub enum Outbound {
    Goal(SetpointMessage),
    Status(StatusMessage),
}

/// Non-blocking outbound handle used by the publish loop.
///
/// Messages go through a bounded channel to the egress task; when the
/// channel is full the message is dropped so a slow consumer never stalls
/// the loop. The latest setpoint and status are also kept for readback.
#[derive(Debug, Clone)]
pub struct Egress {
    tx: mpsc::Sender<Outbound>,
    latest_setpoint: watch::Sender<Option<SetpointMessage>>,
    latest_status: watch::Sender<Option<StatusMessage>>,
}

impl Egress {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let egress = Self {
            tx,
            latest_setpoint: watch::channel(None).0,
            latest_status: watch::channel(None).0,
        };
        (egress, rx)
    }

    pub fn publish(&self, msg: Outbound) {
        match &msg {
            Outbound::Goal(sp) => {
                self.latest_setpoint.send_replace(Some(sp.clone()));
            }
            Outbound::Status(st) => {
                self.latest_status.send_replace(Some(st.clone()));
            }
        }
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(?dropped, "egress buffer full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("egress closed, message discarded");
            }
        }
    }

    pub fn latest_setpoint(&self) -> watch::Receiver<Option<SetpointMessage>> {
        self.latest_setpoint.subscribe()
    }

    pub fn latest_status(&self) -> watch::Receiver<Option<StatusMessage>> {
        self.latest_status.subscribe()
    }
}

/// Destination for outbound messages.
#[async_trait]
pub trait OutboundSink: Send {
    async fn send(&mut self, msg: &Outbound) -> Result<(), TransportError>;
}

/// Writes one JSON document per line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutboundSink for JsonLinesSink<W> {
    async fn send(&mut self, msg: &Outbound) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(msg)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Drain the egress channel into `sink` until every sender is gone.
/// Delivery failures are logged and skipped.
pub async fn run_egress<S: OutboundSink>(mut rx: mpsc::Receiver<Outbound>, mut sink: S) -> S {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = sink.send(&msg).await {
            tracing::warn!("failed to deliver outbound message: {}", e);
        }
    }
    tracing::debug!("egress channel closed");
    sink
}

/// Decodes raw command payloads into the mailbox.
#[derive(Debug, Clone)]
pub struct CommandIngress {
    mailbox: Mailbox<CommandEnvelope>,
}

impl CommandIngress {
    pub fn new(mailbox: Mailbox<CommandEnvelope>) -> Self {
        Self { mailbox }
    }

    /// Decode `payload` and post it, replacing any pending command.
    /// Malformed payloads are logged and leave the mailbox untouched.
    pub fn deliver(&self, payload: &str) -> Result<(), CommandError> {
        let envelope = decode_envelope(payload).inspect_err(|e| {
            tracing::warn!("rejected command payload: {}", e);
        })?;
        tracing::debug!(intent = envelope.cmd.intent(), "command received");
        if let Some(stale) = self.mailbox.post(envelope) {
            tracing::debug!(intent = stale.cmd.intent(), "pending command superseded");
        }
        Ok(())
    }
}

/// Feed each non-empty line of `reader` to `ingress` until EOF.
pub async fn read_commands<R>(reader: R, ingress: CommandIngress) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        // already logged by deliver
        let _ = ingress.deliver(&line);
    }
    tracing::info!("command input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::workspace::Point;
    use serde_json::json;

    fn setpoint(x: f64, y: f64, seq: u64) -> Setpoint {
        Setpoint {
            point: Point::new(x, y),
            seq,
            finished: false,
        }
    }

    #[test]
    fn setpoint_message_rounds_and_flips() {
        let sp = setpoint(12.3456, 7.891, 3);
        let up = SetpointMessage::new(&sp, AxisConvention::Up, 1000);
        assert_eq!(up, SetpointMessage { x: 12.35, y: 7.89, seq: 3, t_ms: 1000 });
        let down = SetpointMessage::new(&sp, AxisConvention::Down, 1000);
        assert_eq!(down.y, -7.89);
        assert_eq!(down.x, 12.35);
    }

    #[test]
    fn outbound_is_tagged_by_topic() {
        let msg = Outbound::Goal(SetpointMessage { x: 1.0, y: 2.0, seq: 9, t_ms: 5 });
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({"topic": "goal", "x": 1.0, "y": 2.0, "seq": 9, "t_ms": 5}));
    }

    #[test]
    fn status_echoes_the_command() {
        let planner = Planner::new(tokio::time::Instant::now());
        let env = CommandEnvelope::from_value(json!({"cmd": {"intent": "noop"}})).unwrap();
        let st = StatusMessage::new(&Ack::ok("noop"), &planner, &env, 42);
        let v = serde_json::to_value(Outbound::Status(st)).unwrap();
        assert_eq!(v["topic"], "status");
        assert_eq!(v["mode"], "hold");
        assert_eq!(v["cmd"], json!({"intent": "noop"}));

        let bare = StatusMessage::new(&Ack::ok("noop"), &planner, &CommandEnvelope::new(Command::Noop), 1);
        let v = serde_json::to_value(&bare).unwrap();
        assert!(v.get("cmd").is_none());
    }

    #[tokio::test]
    async fn full_egress_drops_instead_of_blocking() {
        let (egress, mut rx) = Egress::channel(1);
        for seq in 0..3 {
            egress.publish(Outbound::Goal(SetpointMessage { x: 0.0, y: 0.0, seq, t_ms: 0 }));
        }
        match rx.recv().await {
            Some(Outbound::Goal(sp)) => assert_eq!(sp.seq, 0),
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        // readback always has the newest one
        assert_eq!(egress.latest_setpoint().borrow().as_ref().map(|s| s.seq), Some(2));
    }

    #[tokio::test]
    async fn json_lines_sink_writes_one_line_per_message() {
        let (egress, rx) = Egress::channel(8);
        egress.publish(Outbound::Goal(SetpointMessage { x: 1.0, y: 2.0, seq: 0, t_ms: 0 }));
        egress.publish(Outbound::Goal(SetpointMessage { x: 3.0, y: 4.0, seq: 1, t_ms: 0 }));
        drop(egress);
        let sink = run_egress(rx, JsonLinesSink::new(Vec::new())).await;
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["seq"], 1);
    }

    #[tokio::test]
    async fn stdin_style_ingress_keeps_only_the_latest_command() {
        let mailbox = Mailbox::new();
        let ingress = CommandIngress::new(mailbox.clone());
        let input = concat!(
            "{\"cmd\": {\"intent\": \"goto\", \"x\": 1, \"y\": 1}}\n",
            "\n",
            "garbage\n",
            "{\"cmd\": {\"intent\": \"stop\"}}\n",
        );
        read_commands(input.as_bytes(), ingress).await.unwrap();
        assert_eq!(mailbox.take().map(|e| e.cmd), Some(Command::Stop));
        assert!(mailbox.is_empty());
    }

    #[test]
    fn rejected_payload_leaves_pending_command() {
        let mailbox = Mailbox::new();
        let ingress = CommandIngress::new(mailbox.clone());
        ingress.deliver(r#"{"cmd": {"intent": "pause"}}"#).unwrap();
        assert!(ingress.deliver("[]").is_err());
        assert_eq!(mailbox.take().map(|e| e.cmd), Some(Command::Pause));
    }
}

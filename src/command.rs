// src/command.rs - Inbound command model and decoding
//!
//! Commands arrive as `{"cmd": {"intent": ..., ...fields}, "t_ms": 123}`.
//! Decoding only checks structure; semantic problems (unknown intents, bad
//! trajectory parameters) are reported by the planner when it applies the
//! command.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("cmd missing or not an object")]
    MissingCmd,
}

/// A typed planner instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Noop,
    Pause,
    Resume,
    /// Hold at the current position
    Stop,
    /// Absolute target; a missing axis keeps the current coordinate
    Goto { x: Option<f64>, y: Option<f64> },
    /// Offset from the current position
    Delta { dx: f64, dy: f64 },
    /// Nested trajectory spec, parsed by the factory when applied
    Traj(Value),
    /// Structurally valid command with an intent the planner does not know
    Unknown(String),
}

impl Command {
    /// Interpret the inner `cmd` object.
    pub fn from_object(cmd: &Map<String, Value>) -> Self {
        let intent = match cmd.get("intent") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_lowercase(),
            Some(other) => return Command::Unknown(other.to_string()),
        };

        match intent.as_str() {
            "" | "noop" => Command::Noop,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "goto" => Command::Goto {
                x: cmd.get("x").and_then(number),
                y: cmd.get("y").and_then(number),
            },
            "delta" => Command::Delta {
                dx: cmd.get("dx").and_then(number).unwrap_or(0.0),
                dy: cmd.get("dy").and_then(number).unwrap_or(0.0),
            },
            "traj" => Command::Traj(cmd.get("traj").cloned().unwrap_or(Value::Null)),
            _ => Command::Unknown(intent),
        }
    }

    pub fn intent(&self) -> &str {
        match self {
            Command::Noop => "noop",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Goto { .. } => "goto",
            Command::Delta { .. } => "delta",
            Command::Traj(_) => "traj",
            Command::Unknown(intent) => intent,
        }
    }
}

/// Accepts JSON numbers and numeric strings.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A decoded ingress message.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    pub cmd: Command,
    /// The inner `cmd` object as received, echoed back in status messages
    pub raw: Value,
    /// Producer timestamp, if supplied
    pub t_ms: Option<i64>,
}

impl CommandEnvelope {
    pub fn new(cmd: Command) -> Self {
        Self {
            cmd,
            raw: Value::Null,
            t_ms: None,
        }
    }

    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        let Value::Object(mut outer) = value else {
            return Err(CommandError::NotAnObject);
        };
        let t_ms = outer.get("t_ms").and_then(Value::as_i64);
        let Some(Value::Object(inner)) = outer.remove("cmd") else {
            return Err(CommandError::MissingCmd);
        };
        Ok(Self {
            cmd: Command::from_object(&inner),
            raw: Value::Object(inner),
            t_ms,
        })
    }
}

/// Decode a raw ingress payload.
pub fn decode_envelope(payload: &str) -> Result<CommandEnvelope, CommandError> {
    let value: Value = serde_json::from_str(payload.trim())?;
    CommandEnvelope::from_value(value)
}

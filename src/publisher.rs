// src/publisher.rs - Fixed-period publish loop
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::command::CommandEnvelope;
use crate::mailbox::Mailbox;
use crate::planner::{Ack, Planner, Setpoint};
use crate::transport::{AxisConvention, Egress, Outbound, SetpointMessage, StatusMessage, now_ms};

/// Shortest tick period the loop accepts.
pub const MIN_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub period: Duration,
    pub axis: AxisConvention,
    /// Publish a status message after each applied command
    pub emit_status: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(100),
            axis: AxisConvention::Up,
            emit_status: true,
        }
    }
}

/// Owns the planner and drives it once per period.
pub struct PublishLoop {
    planner: Planner,
    mailbox: Mailbox<CommandEnvelope>,
    egress: Egress,
    settings: LoopSettings,
}

impl PublishLoop {
    pub fn new(
        planner: Planner,
        mailbox: Mailbox<CommandEnvelope>,
        egress: Egress,
        mut settings: LoopSettings,
    ) -> Self {
        settings.period = settings.period.max(MIN_PERIOD);
        Self {
            planner,
            mailbox,
            egress,
            settings,
        }
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn period(&self) -> Duration {
        self.settings.period
    }

    /// One tick: apply at most one pending command, advance the trajectory
    /// and emit the setpoint.
    pub fn step(&mut self, now: Instant) -> Setpoint {
        if let Some(envelope) = self.mailbox.take() {
            self.apply(&envelope, now);
        }

        let setpoint = self.planner.tick(now);
        if setpoint.finished {
            tracing::info!(
                x = setpoint.point.x,
                y = setpoint.point.y,
                "trajectory finished, holding"
            );
        }
        self.egress.publish(Outbound::Goal(SetpointMessage::new(
            &setpoint,
            self.settings.axis,
            now_ms(),
        )));
        setpoint
    }

    fn apply(&mut self, envelope: &CommandEnvelope, now: Instant) -> Ack {
        let ack = self.planner.apply(&envelope.cmd, now);
        if ack.ok {
            tracing::info!(intent = envelope.cmd.intent(), "{}", ack.note);
        } else {
            tracing::warn!(intent = envelope.cmd.intent(), "{}", ack.note);
        }
        if self.settings.emit_status {
            let status = StatusMessage::new(&ack, &self.planner, envelope, now_ms());
            self.egress.publish(Outbound::Status(status));
        }
        ack
    }

    /// Tick until `shutdown` fires (or its sender is dropped), then hand the
    /// planner back.
    ///
    /// Ticks are scheduled against an absolute deadline that advances by one
    /// period per iteration, so loop overhead does not accumulate as drift.
    /// When a tick overruns, the deadline still advances by exactly one period:
    /// the loop runs late ticks back to back and falls behind wall time under
    /// sustained overload instead of skipping or reporting it.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Planner {
        tracing::info!(period_ms = self.settings.period.as_millis() as u64, "publish loop started");
        let mut next_tick = Instant::now();
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("publish loop shutting down");
                    break;
                }
                _ = tokio::time::sleep_until(next_tick) => {
                    next_tick += self.settings.period;
                    self.step(Instant::now());
                }
            }
        }
        self.planner
    }
}

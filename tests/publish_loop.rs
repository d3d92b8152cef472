use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use setpoint_rs::command::{Command, CommandEnvelope};
use setpoint_rs::config::Config;
use setpoint_rs::mailbox::Mailbox;
use setpoint_rs::node::Node;
use setpoint_rs::planner::{Planner, PlannerMode};
use setpoint_rs::publisher::{LoopSettings, PublishLoop};
use setpoint_rs::transport::{AxisConvention, Egress, Outbound, OutboundSink, TransportError};
use setpoint_rs::workspace::Point;
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Collects everything sent to it.
#[derive(Clone, Default)]
struct RecordingSink {
    sent: Arc<Mutex<Vec<Outbound>>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundSink for RecordingSink {
    async fn send(&mut self, msg: &Outbound) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_an_absolute_schedule() {
    let mailbox = Mailbox::new();
    let (egress, _rx) = Egress::channel(256);
    let mut latest = egress.latest_setpoint();
    let settings = LoopSettings {
        period: Duration::from_millis(50),
        ..LoopSettings::default()
    };
    let publish = PublishLoop::new(Planner::new(Instant::now()), mailbox, egress, settings);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let start = Instant::now();
    let handle = tokio::spawn(publish.run(shutdown_rx));
    let mut tick_times = Vec::new();
    for _ in 0..20 {
        latest.changed().await.unwrap();
        tick_times.push(start.elapsed());
    }
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    // timer resolution is 1 ms; anything beyond that would be drift
    for (i, elapsed) in tick_times.into_iter().enumerate() {
        let ideal = Duration::from_millis(50 * i as u64);
        assert!(elapsed >= ideal && elapsed <= ideal + Duration::from_millis(1), "tick {i} at {elapsed:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn commands_are_applied_on_the_next_tick() {
    let mailbox = Mailbox::new();
    let (egress, mut rx) = Egress::channel(256);
    let publish = PublishLoop::new(Planner::new(Instant::now()), mailbox.clone(), egress, LoopSettings::default());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(publish.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(250)).await;
    mailbox.post(CommandEnvelope::new(Command::Goto { x: Some(30.0), y: Some(-40.0) }));
    tokio::time::sleep(Duration::from_secs(2)).await;
    shutdown_tx.send(()).unwrap();
    let planner = handle.await.unwrap();

    assert_eq!(planner.position(), Point::new(30.0, -40.0));
    assert_eq!(planner.mode(), PlannerMode::Hold);

    let mut statuses = Vec::new();
    let mut goals = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        match msg {
            Outbound::Status(st) => statuses.push(st),
            Outbound::Goal(goal) => goals.push(goal),
        }
    }
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].note, "goto/delta -> LineTo(speed=150)");
    assert_eq!(statuses[0].mode, PlannerMode::Traj);
    let last = goals.last().unwrap();
    assert_eq!((last.x, last.y), (30.0, -40.0));
}

#[tokio::test(start_paused = true)]
async fn node_runs_until_shutdown() {
    let mut config = Config::default();
    config.egress.y_positive = AxisConvention::Down;
    let node = Node::new(config).unwrap();
    let shutdown = node.shutdown_handle();
    let sink = RecordingSink::default();

    let input = BufReader::new(&b"not json\n{\"cmd\": {\"intent\": \"goto\", \"x\": 30, \"y\": 60}}\n"[..]);
    let handle = tokio::spawn(node.run_with(Some(input), sink.clone()));
    tokio::time::sleep(Duration::from_secs(2)).await;
    shutdown.send(()).unwrap();
    let planner = handle.await.unwrap().unwrap();

    assert_eq!(planner.position(), Point::new(30.0, 60.0));

    let messages = sink.messages();
    let status = messages.iter().find_map(|m| match m {
        Outbound::Status(st) => Some(st),
        _ => None,
    });
    assert!(status.unwrap().ok);
    // y is flipped on the way out
    let last_goal = messages.iter().rev().find_map(|m| match m {
        Outbound::Goal(goal) => Some(goal),
        _ => None,
    });
    assert_eq!(last_goal.map(|g| (g.x, g.y)), Some((30.0, -60.0)));
}

#[test]
fn invalid_config_is_rejected_by_the_node() {
    let mut config = Config::default();
    config.planner.line_speed = -1.0;
    assert!(Node::new(config).is_err());
}

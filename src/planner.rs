// src/planner.rs - Planner state machine
//!
//! The planner owns the current position, the active trajectory and the run
//! mode. It is mutated only by [`Planner::apply`] and [`Planner::tick`], both
//! called from the publish loop.

use serde::Serialize;
use tokio::time::Instant;

use crate::command::Command;
use crate::motion::{Trajectory, TrajectoryGenerator, build_from_value};
use crate::motion::trajectory::Line;
use crate::workspace::{Point, WORKSPACE};

/// Speed of the straight move generated for `goto` and `delta` (mm/s).
pub const DEFAULT_LINE_SPEED: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerMode {
    Hold,
    Traj,
    Stop,
}

impl PlannerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerMode::Hold => "hold",
            PlannerMode::Traj => "traj",
            PlannerMode::Stop => "stop",
        }
    }
}

/// Outcome of applying one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
    pub ok: bool,
    pub note: String,
}

impl Ack {
    pub fn ok(note: impl Into<String>) -> Self {
        Self { ok: true, note: note.into() }
    }

    pub fn rejected(note: impl Into<String>) -> Self {
        Self { ok: false, note: note.into() }
    }
}

/// One emitted setpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    pub point: Point,
    pub seq: u64,
    /// The active trajectory finished on this tick
    pub finished: bool,
}

/// A trajectory bound to its start time.
#[derive(Debug, Clone)]
struct ActiveTrajectory {
    trajectory: Trajectory,
    started: Instant,
}

impl ActiveTrajectory {
    fn bind(mut trajectory: Trajectory, start: Point, now: Instant) -> Self {
        trajectory.reset(start);
        Self {
            trajectory,
            started: now,
        }
    }

    fn rebind(&mut self, start: Point, now: Instant) {
        self.trajectory.reset(start);
        self.started = now;
    }

    fn elapsed(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started).as_secs_f64()
    }
}

/// Planner state. Created once at startup, holding at the origin.
#[derive(Debug, Clone)]
pub struct Planner {
    position: Point,
    seq: u64,
    mode: PlannerMode,
    paused: bool,
    active: ActiveTrajectory,
    line_speed: f64,
}

impl Planner {
    pub fn new(now: Instant) -> Self {
        Self::with_line_speed(now, DEFAULT_LINE_SPEED)
    }

    pub fn with_line_speed(now: Instant, line_speed: f64) -> Self {
        let origin = Point::ORIGIN;
        Self {
            position: origin,
            seq: 0,
            mode: PlannerMode::Hold,
            paused: false,
            active: ActiveTrajectory::bind(Trajectory::hold(origin), origin, now),
            line_speed,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Sequence number the next setpoint will carry.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn mode(&self) -> PlannerMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.active.trajectory
    }

    pub fn trajectory_started(&self) -> Instant {
        self.active.started
    }

    fn replace_trajectory(&mut self, trajectory: Trajectory, mode: PlannerMode, now: Instant) {
        self.active = ActiveTrajectory::bind(trajectory, self.position, now);
        self.mode = mode;
    }

    fn line_to(&mut self, target: Point, now: Instant) -> Ack {
        let line = Line::new(WORKSPACE.clamp_point(target), self.line_speed);
        self.replace_trajectory(line.into(), PlannerMode::Traj, now);
        Ack::ok(format!("goto/delta -> LineTo(speed={})", self.line_speed))
    }

    /// Apply one command. Failures leave the state untouched.
    pub fn apply(&mut self, cmd: &Command, now: Instant) -> Ack {
        match cmd {
            Command::Noop => Ack::ok("noop"),
            Command::Pause => {
                self.paused = true;
                Ack::ok("paused")
            }
            Command::Resume => {
                // Restarts the local clock at the pause point rather than
                // continuing the paused phase.
                self.paused = false;
                self.active.rebind(self.position, now);
                Ack::ok("resumed")
            }
            Command::Stop => {
                self.replace_trajectory(Trajectory::hold(self.position), PlannerMode::Stop, now);
                Ack::ok("stopped (holding current)")
            }
            Command::Goto { x, y } => {
                let target = Point::new(x.unwrap_or(self.position.x), y.unwrap_or(self.position.y));
                self.line_to(target, now)
            }
            Command::Delta { dx, dy } => {
                let target = Point::new(self.position.x + dx, self.position.y + dy);
                self.line_to(target, now)
            }
            Command::Traj(spec) => match build_from_value(spec, self.position) {
                Ok(trajectory) => {
                    let name = trajectory.name();
                    let kind = spec.get("type").and_then(|t| t.as_str()).unwrap_or(name);
                    let note = format!("traj set: {kind}");
                    self.replace_trajectory(trajectory, PlannerMode::Traj, now);
                    Ack::ok(note)
                }
                Err(e) => Ack::rejected(format!("traj error: {e}")),
            },
            Command::Unknown(intent) => Ack::rejected(format!("unknown intent: {intent}")),
        }
    }

    /// Advance one tick: sample the active trajectory (unless paused), clamp
    /// it into the workspace and return the setpoint to emit.
    pub fn tick(&mut self, now: Instant) -> Setpoint {
        let mut finished = false;
        if !self.paused {
            let t = self.active.elapsed(now);
            let sample = self.active.trajectory.sample(t);
            self.position = WORKSPACE.clamp_point(sample.point);
            if sample.done {
                finished = true;
                self.replace_trajectory(Trajectory::hold(self.position), PlannerMode::Hold, now);
            }
        }

        let setpoint = Setpoint {
            point: self.position,
            seq: self.seq,
            finished,
        };
        self.seq += 1;
        setpoint
    }
}

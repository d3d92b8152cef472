// src/motion/trajectory.rs
//! Time-parameterized setpoint generators.
//!
//! Every generator maps `t`, the seconds elapsed since its last [`reset`],
//! to a position and a completion flag. Most generators are pure in `t`;
//! [`Clothoid`] integrates forward and must be sampled with non-decreasing `t`.
//!
//! [`reset`]: TrajectoryGenerator::reset

use std::f64::consts::{PI, TAU};

use crate::motion::clothoid::Clothoid;
use crate::motion::path::{Racetrack, Spline, Waypoints};
use crate::workspace::Point;

/// Floor applied to speeds, periods and durations.
pub(crate) const MIN_POSITIVE: f64 = 1e-3;

/// One sampled setpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Position at the sampled time (mm)
    pub point: Point,

    /// The generator has reached the end of its defined domain
    pub done: bool,
}

impl Sample {
    pub fn running(point: Point) -> Self {
        Self { point, done: false }
    }

    pub fn finished(point: Point) -> Self {
        Self { point, done: true }
    }
}

/// Shared contract of all trajectory generators.
pub trait TrajectoryGenerator {
    /// Rebind the generator's reference frame to `start`. Elapsed time
    /// passed to [`sample`](Self::sample) restarts from zero after this.
    fn reset(&mut self, start: Point);

    /// Sample the generator `t` seconds after the last reset.
    fn sample(&mut self, t: f64) -> Sample;

    /// Short lowercase name used in logs and status notes.
    fn name(&self) -> &'static str;
}

pub(crate) fn positive(v: f64) -> f64 {
    v.max(MIN_POSITIVE)
}

/// `loops > 0` and at least `loops` full periods have elapsed.
pub(crate) fn loops_elapsed(loops: i64, period: f64, t: f64) -> bool {
    loops > 0 && t >= loops as f64 * period
}

/// Constant output. Represents "no active motion".
#[derive(Debug, Clone, PartialEq)]
pub struct Hold {
    target: Point,
}

impl Hold {
    pub fn new(target: Point) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Point {
        self.target
    }
}

impl TrajectoryGenerator for Hold {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, _t: f64) -> Sample {
        Sample::running(self.target)
    }

    fn name(&self) -> &'static str {
        "hold"
    }
}

/// Straight segment from the reset point to `target` at constant speed.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    target: Point,
    speed: f64,
    start: Point,
    distance: f64,
    /// Unit direction from start to target
    direction: (f64, f64),
}

impl Line {
    pub fn new(target: Point, speed: f64) -> Self {
        Self {
            target,
            speed: positive(speed),
            start: target,
            distance: 0.0,
            direction: (0.0, 0.0),
        }
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Length of the segment bound by the last reset.
    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl TrajectoryGenerator for Line {
    fn reset(&mut self, start: Point) {
        self.start = start;
        self.distance = start.distance_to(&self.target);
        self.direction = if self.distance < 1e-6 {
            (0.0, 0.0)
        } else {
            (
                (self.target.x - start.x) / self.distance,
                (self.target.y - start.y) / self.distance,
            )
        };
    }

    fn sample(&mut self, t: f64) -> Sample {
        if self.distance < 1e-6 {
            return Sample::finished(self.target);
        }
        let traveled = self.speed * t.max(0.0);
        if traveled >= self.distance {
            return Sample::finished(self.target);
        }
        Sample::running(Point::new(
            self.start.x + self.direction.0 * traveled,
            self.start.y + self.direction.1 * traveled,
        ))
    }

    fn name(&self) -> &'static str {
        "line"
    }
}

/// x = cx + r·cos(ωt), y = cy + r·sin(ωt)
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    center: Point,
    radius: f64,
    period: f64,
    loops: i64,
}

impl Circle {
    pub fn new(center: Point, radius: f64, period: f64, loops: i64) -> Self {
        Self {
            center,
            radius: radius.abs(),
            period: positive(period),
            loops,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl TrajectoryGenerator for Circle {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        let angle = TAU / self.period * t;
        Sample {
            point: Point::new(
                self.center.x + self.radius * angle.cos(),
                self.center.y + self.radius * angle.sin(),
            ),
            done: loops_elapsed(self.loops, self.period, t),
        }
    }

    fn name(&self) -> &'static str {
        "circle"
    }
}

/// x = cx + a·cos(ωt), y = cy + b·sin(ωt)
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    center: Point,
    a: f64,
    b: f64,
    period: f64,
    loops: i64,
}

impl Ellipse {
    pub fn new(center: Point, a: f64, b: f64, period: f64, loops: i64) -> Self {
        Self {
            center,
            a: a.abs(),
            b: b.abs(),
            period: positive(period),
            loops,
        }
    }

    pub fn axes(&self) -> (f64, f64) {
        (self.a, self.b)
    }
}

impl TrajectoryGenerator for Ellipse {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        let angle = TAU / self.period * t;
        Sample {
            point: Point::new(
                self.center.x + self.a * angle.cos(),
                self.center.y + self.b * angle.sin(),
            ),
            done: loops_elapsed(self.loops, self.period, t),
        }
    }

    fn name(&self) -> &'static str {
        "ellipse"
    }
}

/// Lissajous figure eight: x = cx + a·sin(ωt), y = cy + b·sin(2ωt)
#[derive(Debug, Clone, PartialEq)]
pub struct Figure8 {
    center: Point,
    a: f64,
    b: f64,
    period: f64,
    loops: i64,
}

impl Figure8 {
    pub fn new(center: Point, a: f64, b: f64, period: f64, loops: i64) -> Self {
        Self {
            center,
            a: a.abs(),
            b: b.abs(),
            period: positive(period),
            loops,
        }
    }
}

impl TrajectoryGenerator for Figure8 {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        let w = TAU / self.period;
        Sample {
            point: Point::new(
                self.center.x + self.a * (w * t).sin(),
                self.center.y + self.b * (2.0 * w * t).sin(),
            ),
            done: loops_elapsed(self.loops, self.period, t),
        }
    }

    fn name(&self) -> &'static str {
        "figure8"
    }
}

/// Sine wave advancing along x: x = cx + speed·t, y = cy + amp·sin(2π·freq·t).
/// `speed` may be negative to travel towards -x.
#[derive(Debug, Clone, PartialEq)]
pub struct Sine {
    center: Point,
    amp: f64,
    freq: f64,
    speed: f64,
    duration: f64,
}

impl Sine {
    pub fn new(center: Point, amp: f64, freq: f64, speed: f64, duration: f64) -> Self {
        Self {
            center,
            amp: amp.abs(),
            freq: freq.max(0.0),
            speed,
            duration: positive(duration),
        }
    }

    pub fn amplitude(&self) -> f64 {
        self.amp
    }
}

impl TrajectoryGenerator for Sine {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        Sample {
            point: Point::new(
                self.center.x + self.speed * t,
                self.center.y + self.amp * (2.0 * PI * self.freq * t).sin(),
            ),
            done: t >= self.duration,
        }
    }

    fn name(&self) -> &'static str {
        "sine"
    }
}

/// Archimedean spiral: θ = ωt, r = r0 + k·θ
#[derive(Debug, Clone, PartialEq)]
pub struct Spiral {
    center: Point,
    r0: f64,
    k: f64,
    period: f64,
    duration: f64,
}

impl Spiral {
    pub fn new(center: Point, r0: f64, k: f64, period: f64, duration: f64) -> Self {
        Self {
            center,
            r0: r0.abs(),
            k,
            period: positive(period),
            duration: positive(duration),
        }
    }
}

impl TrajectoryGenerator for Spiral {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        let theta = TAU / self.period * t;
        let r = self.r0 + self.k * theta;
        Sample {
            point: Point::new(
                self.center.x + r * theta.cos(),
                self.center.y + r * theta.sin(),
            ),
            done: t >= self.duration,
        }
    }

    fn name(&self) -> &'static str {
        "spiral"
    }
}

/// The closed set of generators the planner can run.
#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    Hold(Hold),
    Line(Line),
    Circle(Circle),
    Ellipse(Ellipse),
    Figure8(Figure8),
    Sine(Sine),
    Waypoints(Waypoints),
    Racetrack(Racetrack),
    Clothoid(Clothoid),
    Spiral(Spiral),
    Spline(Spline),
}

impl Trajectory {
    pub fn hold(target: Point) -> Self {
        Trajectory::Hold(Hold::new(target))
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Trajectory::Hold(_))
    }

    fn generator(&mut self) -> &mut dyn TrajectoryGenerator {
        match self {
            Trajectory::Hold(g) => g,
            Trajectory::Line(g) => g,
            Trajectory::Circle(g) => g,
            Trajectory::Ellipse(g) => g,
            Trajectory::Figure8(g) => g,
            Trajectory::Sine(g) => g,
            Trajectory::Waypoints(g) => g,
            Trajectory::Racetrack(g) => g,
            Trajectory::Clothoid(g) => g,
            Trajectory::Spiral(g) => g,
            Trajectory::Spline(g) => g,
        }
    }
}

impl TrajectoryGenerator for Trajectory {
    fn reset(&mut self, start: Point) {
        self.generator().reset(start)
    }

    fn sample(&mut self, t: f64) -> Sample {
        self.generator().sample(t)
    }

    fn name(&self) -> &'static str {
        match self {
            Trajectory::Hold(g) => g.name(),
            Trajectory::Line(g) => g.name(),
            Trajectory::Circle(g) => g.name(),
            Trajectory::Ellipse(g) => g.name(),
            Trajectory::Figure8(g) => g.name(),
            Trajectory::Sine(g) => g.name(),
            Trajectory::Waypoints(g) => g.name(),
            Trajectory::Racetrack(g) => g.name(),
            Trajectory::Clothoid(g) => g.name(),
            Trajectory::Spiral(g) => g.name(),
            Trajectory::Spline(g) => g.name(),
        }
    }
}

macro_rules! impl_from_generator {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Trajectory {
                fn from(g: $variant) -> Self {
                    Trajectory::$variant(g)
                }
            }
        )*
    };
}

impl_from_generator!(
    Hold, Line, Circle, Ellipse, Figure8, Sine, Waypoints, Racetrack, Clothoid, Spiral, Spline,
);

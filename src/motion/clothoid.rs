// src/motion/clothoid.rs - Euler spiral by forward integration
use crate::motion::trajectory::{Sample, TrajectoryGenerator, positive};
use crate::workspace::Point;

/// Internal integration step (seconds), roughly 50 Hz.
const SUB_STEP: f64 = 0.02;

/// Clothoid whose curvature grows linearly with arc length (k = k_rate·s).
///
/// The state is integrated incrementally between calls, so `sample` must be
/// called with non-decreasing `t`. A `t` at or before the last sample returns
/// the current state unchanged; the clock cannot be rewound except by `reset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clothoid {
    k_rate: f64,
    speed: f64,
    duration: f64,
    position: Point,
    /// Heading (rad)
    theta: f64,
    /// Arc length traveled (mm)
    s: f64,
    last_t: f64,
}

impl Clothoid {
    pub fn new(k_rate: f64, speed: f64, duration: f64) -> Self {
        Self {
            k_rate,
            speed: positive(speed),
            duration: positive(duration),
            position: Point::ORIGIN,
            theta: 0.0,
            s: 0.0,
            last_t: 0.0,
        }
    }

    pub fn heading(&self) -> f64 {
        self.theta
    }

    pub fn arc_length(&self) -> f64 {
        self.s
    }
}

impl TrajectoryGenerator for Clothoid {
    fn reset(&mut self, start: Point) {
        self.position = start;
        self.theta = 0.0;
        self.s = 0.0;
        self.last_t = 0.0;
    }

    fn sample(&mut self, t: f64) -> Sample {
        let dt = t - self.last_t;
        if dt > 0.0 {
            let steps = ((dt / SUB_STEP) as usize).max(1);
            let h = dt / steps as f64;
            for _ in 0..steps {
                let ds = self.speed * h;
                self.s += ds;
                self.theta += self.k_rate * self.s * ds;
                self.position.x += self.theta.cos() * ds;
                self.position.y += self.theta.sin() * ds;
            }
            self.last_t = t;
        }
        Sample {
            point: self.position,
            done: t >= self.duration,
        }
    }

    fn name(&self) -> &'static str {
        "clothoid"
    }
}

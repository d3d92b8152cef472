// src/motion/path.rs - Generators that follow a fixed geometric path
use std::f64::consts::PI;

use super::TrajectoryError;
use crate::motion::trajectory::{Sample, TrajectoryGenerator, positive};
use crate::workspace::Point;

/// Tolerance for treating the first and last waypoint as the same point.
const CLOSED_TOLERANCE: f64 = 1e-6;

/// Piecewise-linear path traversed at constant speed by arc length.
///
/// Looping rules:
/// * `loops > 0`: stop at the last waypoint after `loops` full traversals.
/// * `loops <= 0` and closed path: cycle forever.
/// * `loops <= 0` and open path: stay at the last waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoints {
    points: Vec<Point>,
    speed: f64,
    loops: i64,
    closed: bool,
    /// Length of each segment
    segments: Vec<f64>,
    /// Cumulative arc length at each waypoint, starting with 0
    cumulative: Vec<f64>,
    total: f64,
}

impl Waypoints {
    pub fn new(points: Vec<Point>, speed: f64, loops: i64) -> Result<Self, TrajectoryError> {
        if points.len() < 2 {
            return Err(TrajectoryError::TooFewPoints {
                kind: "waypoints",
                got: points.len(),
            });
        }
        let closed = points[0].distance_to(&points[points.len() - 1]) < CLOSED_TOLERANCE;

        let mut segments = Vec::with_capacity(points.len() - 1);
        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        let mut total = 0.0;
        for pair in points.windows(2) {
            let length = pair[0].distance_to(&pair[1]);
            segments.push(length);
            total += length;
            cumulative.push(total);
        }

        Ok(Self {
            points,
            speed: positive(speed),
            loops,
            closed,
            segments,
            cumulative,
            total: total.max(CLOSED_TOLERANCE),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn total_length(&self) -> f64 {
        self.total
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn last(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    fn point_at(&self, s: f64) -> Point {
        let mut k = 0;
        while k < self.segments.len() && self.cumulative[k + 1] < s {
            k += 1;
        }
        let k = k.min(self.segments.len() - 1);
        let length = self.segments[k].max(CLOSED_TOLERANCE);
        let u = ((s - self.cumulative[k]) / length).clamp(0.0, 1.0);
        self.points[k].lerp(&self.points[k + 1], u)
    }
}

impl TrajectoryGenerator for Waypoints {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        let mut s = self.speed * t.max(0.0);
        if self.loops <= 0 {
            s = if self.closed { s % self.total } else { s.min(self.total) };
        } else {
            if s >= self.loops as f64 * self.total {
                return Sample::finished(self.last());
            }
            s %= self.total;
        }
        Sample::running(self.point_at(s))
    }

    fn name(&self) -> &'static str {
        "waypoints"
    }
}

/// Stadium-shaped track: two straights joined by semicircles, traversed
/// top straight (right to left), left semicircle, bottom straight
/// (left to right), right semicircle.
#[derive(Debug, Clone, PartialEq)]
pub struct Racetrack {
    center: Point,
    straight: f64,
    radius: f64,
    speed: f64,
    loops: i64,
    perimeter: f64,
}

impl Racetrack {
    pub fn new(center: Point, straight: f64, radius: f64, speed: f64, loops: i64) -> Self {
        let straight = straight.abs();
        let radius = radius.abs();
        Self {
            center,
            straight,
            radius,
            speed: positive(speed),
            loops,
            perimeter: positive(2.0 * straight + 2.0 * PI * radius),
        }
    }

    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    pub fn straight(&self) -> f64 {
        self.straight
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Where every lap starts and ends: right end of the top straight.
    pub fn start_point(&self) -> Point {
        Point::new(self.center.x + self.straight / 2.0, self.center.y + self.radius)
    }

    fn point_at(&self, mut s: f64) -> Point {
        let x_right = self.center.x + self.straight / 2.0;
        let x_left = self.center.x - self.straight / 2.0;
        let y_top = self.center.y + self.radius;
        let y_bottom = self.center.y - self.radius;
        let arc = PI * self.radius;

        if s < self.straight {
            return Point::new(x_right - s, y_top);
        }
        s -= self.straight;

        if s < arc {
            let angle = PI / 2.0 + s / arc * PI;
            return Point::new(
                x_left + self.radius * angle.cos(),
                self.center.y + self.radius * angle.sin(),
            );
        }
        s -= arc;

        if s < self.straight {
            return Point::new(x_left + s, y_bottom);
        }
        s -= self.straight;

        if arc <= 0.0 {
            return Point::new(x_right, y_bottom);
        }
        let angle = 3.0 * PI / 2.0 + s / arc * PI;
        Point::new(
            x_right + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }
}

impl TrajectoryGenerator for Racetrack {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        let s = self.speed * t.max(0.0);
        if self.loops > 0 && s >= self.loops as f64 * self.perimeter {
            return Sample::finished(self.start_point());
        }
        Sample::running(self.point_at(s % self.perimeter))
    }

    fn name(&self) -> &'static str {
        "racetrack"
    }
}

/// Uniform Catmull-Rom interpolation of `p1..p2` with neighbours `p0`, `p3`.
pub fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, u: f64) -> Point {
    let u2 = u * u;
    let u3 = u2 * u;
    let axis = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b
            + (-a + c) * u
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * u2
            + (-a + 3.0 * b - 3.0 * c + d) * u3)
    };
    Point::new(axis(p0.x, p1.x, p2.x, p3.x), axis(p0.y, p1.y, p2.y, p3.y))
}

/// Catmull-Rom spline through the waypoints. Time, not arc length, is split
/// evenly across the segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    points: Vec<Point>,
    duration: f64,
}

impl Spline {
    pub fn new(points: Vec<Point>, duration: f64) -> Result<Self, TrajectoryError> {
        if points.len() < 2 {
            return Err(TrajectoryError::TooFewPoints {
                kind: "spline",
                got: points.len(),
            });
        }
        Ok(Self {
            points,
            duration: positive(duration),
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn segment_count(&self) -> usize {
        self.points.len() - 1
    }
}

impl TrajectoryGenerator for Spline {
    fn reset(&mut self, _start: Point) {}

    fn sample(&mut self, t: f64) -> Sample {
        if t >= self.duration {
            return Sample::finished(self.points[self.points.len() - 1]);
        }
        let n = self.segment_count();
        let s = t.max(0.0) / self.duration * n as f64;
        let i = (s.floor() as usize).min(n - 1);
        let u = s - i as f64;

        let p1 = self.points[i];
        let p2 = self.points[i + 1];
        let p0 = if i > 0 { self.points[i - 1] } else { p1 };
        let p3 = self.points.get(i + 2).copied().unwrap_or(p2);
        Sample::running(catmull_rom(p0, p1, p2, p3, u))
    }

    fn name(&self) -> &'static str {
        "spline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(-300.0, -200.0),
            Point::new(300.0, -200.0),
            Point::new(300.0, 200.0),
            Point::new(-300.0, 200.0),
            Point::new(-300.0, -200.0),
        ]
    }

    fn assert_near(p: Point, x: f64, y: f64) {
        assert!(
            (p.x - x).abs() < 1e-6 && (p.y - y).abs() < 1e-6,
            "expected ({x}, {y}), got ({}, {})",
            p.x,
            p.y
        );
    }

    #[test]
    fn waypoints_need_two_points() {
        let err = Waypoints::new(vec![Point::ORIGIN], 150.0, 1).unwrap_err();
        assert_eq!(err, TrajectoryError::TooFewPoints { kind: "waypoints", got: 1 });
    }

    #[test]
    fn closed_path_detection() {
        let wp = Waypoints::new(square(), 150.0, 0).unwrap();
        assert!(wp.is_closed());
        assert_eq!(wp.total_length(), 2000.0);
        let open = Waypoints::new(square()[..4].to_vec(), 150.0, 0).unwrap();
        assert!(!open.is_closed());
    }

    #[test]
    fn closed_path_without_loops_cycles_forever() {
        let mut wp = Waypoints::new(square(), 200.0, 0).unwrap();
        // one lap takes 10 s
        assert_near(wp.sample(1.5).point, 0.0, -200.0);
        assert_near(wp.sample(11.5).point, 0.0, -200.0);
        for t in [0.0, 9.99, 10.0, 1e5] {
            assert!(!wp.sample(t).done);
        }
    }

    #[test]
    fn open_path_without_loops_parks_at_the_end() {
        let mut wp = Waypoints::new(vec![Point::ORIGIN, Point::new(100.0, 0.0)], 100.0, 0).unwrap();
        let s = wp.sample(50.0);
        assert_eq!(s, Sample::running(Point::new(100.0, 0.0)));
    }

    #[test]
    fn looped_path_finishes_after_n_laps() {
        let mut wp = Waypoints::new(square(), 200.0, 2).unwrap();
        assert!(!wp.sample(19.99).done);
        assert_near(wp.sample(13.5).point, 300.0, -100.0);
        let done = wp.sample(20.0);
        assert!(done.done);
        assert_eq!(done.point, Point::new(-300.0, -200.0));
    }

    #[test]
    fn racetrack_visits_each_section_in_order() {
        let mut track = Racetrack::new(Point::ORIGIN, 400.0, 100.0, 100.0, 0);
        assert_near(track.sample(0.0).point, 200.0, 100.0);
        // halfway down the top straight
        assert_near(track.sample(2.0).point, 0.0, 100.0);
        // middle of the left semicircle
        let arc_mid = (400.0 + PI * 100.0 / 2.0) / 100.0;
        assert_near(track.sample(arc_mid).point, -300.0, 0.0);
        // middle of the bottom straight
        let bottom_mid = (400.0 + PI * 100.0 + 200.0) / 100.0;
        assert_near(track.sample(bottom_mid).point, 0.0, -100.0);
        // middle of the right semicircle
        let right_mid = (800.0 + PI * 100.0 + PI * 50.0) / 100.0;
        assert_near(track.sample(right_mid).point, 300.0, 0.0);
    }

    #[test]
    fn racetrack_loops_only_change_the_stop_condition() {
        let mut track = Racetrack::new(Point::ORIGIN, 400.0, 100.0, 100.0, 1);
        let lap = track.perimeter() / 100.0;
        assert!(!track.sample(lap * 0.99).done);
        let done = track.sample(lap + 0.01);
        assert!(done.done);
        assert_eq!(done.point, track.start_point());

        let mut endless = Racetrack::new(Point::ORIGIN, 400.0, 100.0, 100.0, 0);
        assert!(!endless.sample(lap * 1000.0).done);
    }

    #[test]
    fn degenerate_racetrack_stays_finite() {
        let mut track = Racetrack::new(Point::ORIGIN, 0.0, 0.0, 100.0, 0);
        let p = track.sample(3.0).point;
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn catmull_rom_hits_control_points() {
        let p = [Point::ORIGIN, Point::new(1.0, 2.0), Point::new(3.0, 1.0), Point::new(4.0, 4.0)];
        assert_eq!(catmull_rom(p[0], p[1], p[2], p[3], 0.0), p[1]);
        assert_near(catmull_rom(p[0], p[1], p[2], p[3], 1.0), 3.0, 1.0);
    }

    #[test]
    fn spline_splits_time_evenly_between_segments() {
        let pts = vec![Point::ORIGIN, Point::new(100.0, 0.0), Point::new(100.0, 300.0)];
        let mut spline = Spline::new(pts, 10.0).unwrap();
        assert_near(spline.sample(0.0).point, 0.0, 0.0);
        // segment boundary by time, regardless of the differing lengths
        assert_near(spline.sample(5.0).point, 100.0, 0.0);
        assert!(!spline.sample(9.99).done);
        assert_eq!(spline.sample(10.0), Sample::finished(Point::new(100.0, 300.0)));
    }

    #[test]
    fn two_point_spline_is_a_straight_line() {
        let mut spline = Spline::new(vec![Point::ORIGIN, Point::new(100.0, 100.0)], 4.0).unwrap();
        assert_near(spline.sample(2.0).point, 50.0, 50.0);
    }

    #[test]
    fn spline_rejects_single_point() {
        assert!(Spline::new(vec![Point::ORIGIN], 10.0).is_err());
    }
}

// src/motion/factory.rs - Build generators from loosely-typed specs
//!
//! Trajectories are described by the nested `traj` object of a command, for example
//!
//! ```json
//! {"type": "circle", "center": {"x": 0, "y": 0}, "radius": 200, "period": 20}
//! ```
//!
//! Unknown fields are ignored and missing numbers fall back to per-type
//! defaults. Literal coordinates are clamped into the workspace and radii or
//! axis lengths are limited so the shape fits inside the workspace margin.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::TrajectoryError;
use crate::command::number;
use crate::motion::clothoid::Clothoid;
use crate::motion::path::{Racetrack, Spline, Waypoints};
use crate::motion::trajectory::{Circle, Ellipse, Figure8, Line, Sine, Spiral, Trajectory};
use crate::workspace::{Point, WORKSPACE};

/// Default closed square used when `square` arrives without waypoints.
pub const DEFAULT_SQUARE: [Point; 5] = [
    Point::new(-300.0, -200.0),
    Point::new(300.0, -200.0),
    Point::new(300.0, 200.0),
    Point::new(-300.0, 200.0),
    Point::new(-300.0, -200.0),
];

/// Parsed `traj` object. Every parameter is optional.
///
/// Numbers may arrive as JSON numbers or numeric strings. A `center` or
/// `end` without both coordinates counts as absent; a waypoint without both
/// is an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrajSpec {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "partial_point")]
    pub center: Option<Point>,
    #[serde(deserialize_with = "partial_point")]
    pub end: Option<Point>,
    #[serde(deserialize_with = "waypoint_list")]
    pub waypoints: Option<Vec<Point>>,
    #[serde(deserialize_with = "lenient_number")]
    pub radius: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub period: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub loops: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub speed: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub a: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub b: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub amp: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub freq: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub length: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub k_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub r0: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub k: Option<f64>,
}

fn point_from(value: &Value) -> Option<Point> {
    let x = value.get("x").and_then(number)?;
    let y = value.get("y").and_then(number)?;
    Some(Point::new(x, y))
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => number(&other)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a number, got {other}"))),
    }
}

fn partial_point<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Point>, D::Error> {
    Ok(point_from(&Value::deserialize(deserializer)?))
}

fn waypoint_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<Point>>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                point_from(item)
                    .ok_or_else(|| D::Error::custom(format!("waypoint {i} needs numeric x and y")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(D::Error::custom(format!("waypoints must be a list, got {other}"))),
    }
}

impl TrajSpec {
    pub fn from_value(value: &Value) -> Result<Self, TrajectoryError> {
        if !value.is_object() {
            return Err(TrajectoryError::InvalidParameters(
                "traj missing or not an object".to_string(),
            ));
        }
        TrajSpec::deserialize(value).map_err(|e| TrajectoryError::InvalidParameters(e.to_string()))
    }

    pub fn kind(&self) -> Result<TrajectoryKind, TrajectoryError> {
        self.kind.as_deref().unwrap_or("").parse()
    }

    fn loops(&self, default: i64) -> i64 {
        // `as` truncates toward zero and saturates, NaN becomes 0
        self.loops.map(|l| l as i64).unwrap_or(default)
    }

    fn center_or(&self, fallback: Point) -> Point {
        self.center.map(|c| WORKSPACE.clamp_point(c)).unwrap_or(fallback)
    }

    fn end_or(&self, fallback: Point) -> Point {
        WORKSPACE.clamp_point(self.end.unwrap_or(fallback))
    }

    /// Clamped waypoints if at least two were supplied.
    fn waypoints(&self) -> Option<Vec<Point>> {
        self.waypoints
            .as_ref()
            .filter(|wps| wps.len() >= 2)
            .map(|wps| wps.iter().map(|p| WORKSPACE.clamp_point(*p)).collect())
    }
}

/// Trajectory types accepted in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryKind {
    Line,
    Circle,
    Ellipse,
    Figure8,
    Sine,
    Square,
    Racetrack,
    Clothoid,
    Spiral,
    Spline,
    /// Planner placeholders, followed as raw waypoint splines
    AStar,
    RrtStar,
    Mpc,
}

impl TrajectoryKind {
    pub const ALL: [TrajectoryKind; 13] = [
        TrajectoryKind::Line,
        TrajectoryKind::Circle,
        TrajectoryKind::Ellipse,
        TrajectoryKind::Figure8,
        TrajectoryKind::Sine,
        TrajectoryKind::Square,
        TrajectoryKind::Racetrack,
        TrajectoryKind::Clothoid,
        TrajectoryKind::Spiral,
        TrajectoryKind::Spline,
        TrajectoryKind::AStar,
        TrajectoryKind::RrtStar,
        TrajectoryKind::Mpc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrajectoryKind::Line => "line",
            TrajectoryKind::Circle => "circle",
            TrajectoryKind::Ellipse => "ellipse",
            TrajectoryKind::Figure8 => "figure8",
            TrajectoryKind::Sine => "sine",
            TrajectoryKind::Square => "square",
            TrajectoryKind::Racetrack => "racetrack",
            TrajectoryKind::Clothoid => "clothoid",
            TrajectoryKind::Spiral => "spiral",
            TrajectoryKind::Spline => "spline",
            TrajectoryKind::AStar => "astar",
            TrajectoryKind::RrtStar => "rrtstar",
            TrajectoryKind::Mpc => "mpc",
        }
    }
}

impl fmt::Display for TrajectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrajectoryKind {
    type Err = TrajectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TrajectoryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or(TrajectoryError::Unsupported(wanted))
    }
}

/// Parse `value` and build the matching generator. `current` is the planner
/// position, used where the `traj` object leaves a center or end point out.
pub fn build_from_value(
    value: &Value,
    current: Point,
) -> Result<Trajectory, TrajectoryError> {
    build_trajectory(&TrajSpec::from_value(value)?, current)
}

/// Build the generator described by `spec`. The result is not yet bound;
/// the caller resets it at the current position.
pub fn build_trajectory(spec: &TrajSpec, current: Point) -> Result<Trajectory, TrajectoryError> {
    let kind = spec.kind()?;
    let center = spec.center_or(current);

    let trajectory = match kind {
        TrajectoryKind::Line => {
            Line::new(spec.end_or(current), spec.speed.unwrap_or(150.0)).into()
        }
        TrajectoryKind::Circle => {
            let radius = spec.radius.unwrap_or(200.0).abs().min(WORKSPACE.max_radius());
            Circle::new(
                center,
                radius,
                spec.period.unwrap_or(30.0),
                spec.loops(0),
            )
            .into()
        }
        TrajectoryKind::Ellipse => Ellipse::new(
            center,
            spec.a.unwrap_or(350.0).abs().min(WORKSPACE.max_half_width()),
            spec.b.unwrap_or(200.0).abs().min(WORKSPACE.max_half_height()),
            spec.period.unwrap_or(40.0),
            spec.loops(0),
        )
        .into(),
        TrajectoryKind::Figure8 => Figure8::new(
            center,
            spec.a.unwrap_or(300.0).abs().min(WORKSPACE.max_half_width()),
            spec.b.unwrap_or(200.0).abs().min(WORKSPACE.max_half_height()),
            spec.period.unwrap_or(40.0),
            spec.loops(0),
        )
        .into(),
        TrajectoryKind::Sine => Sine::new(
            center,
            spec.amp.unwrap_or(120.0).abs().min(WORKSPACE.max_half_height()),
            spec.freq.unwrap_or(0.05),
            spec.speed.unwrap_or(120.0),
            spec.duration.unwrap_or(30.0),
        )
        .into(),
        TrajectoryKind::Square => {
            let points = spec.waypoints().unwrap_or_else(|| DEFAULT_SQUARE.to_vec());
            Waypoints::new(points, spec.speed.unwrap_or(150.0), spec.loops(0))?.into()
        }
        TrajectoryKind::Racetrack => {
            let radius = spec.radius.unwrap_or(120.0).abs().min(WORKSPACE.max_half_height());
            let straight = spec
                .length
                .unwrap_or(400.0)
                .abs()
                .min(WORKSPACE.width() - 2.0 * radius - 2.0 * WORKSPACE.margin)
                .max(0.0);
            Racetrack::new(
                center,
                straight,
                radius,
                spec.speed.unwrap_or(150.0),
                spec.loops(0),
            )
            .into()
        }
        TrajectoryKind::Clothoid => Clothoid::new(
            spec.k_rate.unwrap_or(1e-5),
            spec.speed.unwrap_or(120.0),
            spec.duration.unwrap_or(30.0),
        )
        .into(),
        TrajectoryKind::Spiral => Spiral::new(
            center,
            spec.r0.unwrap_or(20.0).abs().min(WORKSPACE.max_radius()),
            spec.k.unwrap_or(10.0),
            spec.period.unwrap_or(30.0),
            spec.duration.unwrap_or(30.0),
        )
        .into(),
        TrajectoryKind::Spline
        | TrajectoryKind::AStar
        | TrajectoryKind::RrtStar
        | TrajectoryKind::Mpc => {
            let points = spec.waypoints().unwrap_or_else(|| {
                vec![WORKSPACE.clamp_point(current), spec.end_or(current)]
            });
            Spline::new(points, spec.duration.unwrap_or(30.0))?.into()
        }
    };

    tracing::debug!(kind = %kind, "built trajectory");
    Ok(trajectory)
}

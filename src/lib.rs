// src/lib.rs - Setpoint generator library
//! Turns asynchronous motion commands into a steady stream of clamped 2D
//! setpoints. Commands land in a latest-wins [`mailbox::Mailbox`]; the
//! [`publisher::PublishLoop`] drains it once per tick, lets the
//! [`planner::Planner`] apply the command and sample its active trajectory,
//! and hands the result to the transport layer.

pub mod command;
pub mod config;
pub mod mailbox;
pub mod motion;
pub mod node;
pub mod planner;
pub mod publisher;
pub mod transport;
pub mod web;
pub mod workspace;

pub use command::{Command, CommandEnvelope, CommandError, decode_envelope};
pub use config::{Config, ConfigError, load_config};
pub use mailbox::Mailbox;
pub use node::{Node, NodeError};
pub use planner::{Ack, Planner, PlannerMode, Setpoint};
pub use publisher::{LoopSettings, PublishLoop};
pub use workspace::{Point, WORKSPACE, Workspace};

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/maze.rs"]
pub mod maze;

#[path = "core/reachability.rs"]
pub mod reachability;

#[path = "core/generator.rs"]
pub mod generator;

#[path = "core/scoring.rs"]
pub mod scoring;

#[path = "core/timer.rs"]
pub mod timer;

#[path = "core/stats.rs"]
pub mod stats;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/session.rs"]
pub mod session;

#[path = "core/protocol.rs"]
pub mod protocol;

#[path = "core/view.rs"]
pub mod view;

#[path = "core/host.rs"]
pub mod host;

pub mod console;

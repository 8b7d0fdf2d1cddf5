//! Workflow dependency-graph analysis and debugging.
//!
//! - `template` -- `{{...}}` parsing, reference extraction, resolution
//! - `graph` -- dependency graph builder and cycle detection
//! - `planner` -- leveled topological grouping into parallel groups
//! - `critical_path` -- longest dependency chain
//! - `validator` -- named structural checks aggregated into a report
//! - `analysis` -- `explain` summaries, graph views, and local dry runs
//! - `definition` -- YAML/JSON parsing into the canonical IR
//! - `loader` -- definition loading trait
//! - `executor` -- task executor trait and the mock executor
//! - `runner` -- local group-by-group workflow runs
//! - `debug` -- steppable debug session state machine
//! - `session_store` -- concurrent registry of debug sessions

pub mod analysis;
pub mod critical_path;
pub mod debug;
pub mod definition;
pub mod executor;
pub mod graph;
pub mod loader;
pub mod planner;
pub mod runner;
pub mod session_store;
pub mod template;
pub mod validator;

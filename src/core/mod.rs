//! Runtime: scene graph, sessions, persistence and edit history.

pub mod config;
pub mod graph;
pub mod history;
pub mod library;
pub mod maker;
pub mod progress;
pub mod reader;

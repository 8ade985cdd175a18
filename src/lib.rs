//! Visual Novel Engine — branching scenes for readers and makers.
//!
//! Resolves scene graphs with choice-driven and auto-advancing transitions,
//! tracks a bounded stat vector with a derived mood, persists per-story
//! reading progress, and gives the editing tool a linear undo/redo history
//! over full scene-collection snapshots.

pub mod core;
pub mod schema;

//! Reader session — one user playing one story.
//!
//! Ties the scene graph, the stat vector and the progress tracker together.
//! Each session owns its own state; nothing is shared between sessions
//! except whatever the store itself persists.

use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::graph::{SceneError, SceneGraph, Step};
use crate::core::progress::{KeyValueStore, ProgressTracker, StoreError};
use crate::schema::scene::{Choice, Scene, SceneId};
use crate::schema::stats::{Mood, StatVector};
use crate::schema::story::Story;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("progress store error: {0}")]
    Store(#[from] StoreError),
    #[error("the story has ended")]
    Ended,
}

/// Where the reader currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    At(SceneId),
    /// The story ended after `last`.
    Ended { last: SceneId },
}

impl Position {
    /// The scene a save should point at.
    pub fn scene_id(&self) -> SceneId {
        match *self {
            Self::At(id) => id,
            Self::Ended { last } => last,
        }
    }
}

pub struct ReaderSession<S> {
    story: Story,
    config: EngineConfig,
    stats: StatVector,
    position: Position,
    tracker: ProgressTracker<S>,
}

impl<S: KeyValueStore> ReaderSession<S> {
    /// Open `story`, resuming from saved progress when there is any.
    ///
    /// A saved scene that no longer exists falls back to the start scene.
    /// Fails with `SceneError::NotFound` only when the start scene is missing
    /// as well.
    pub fn start(story: Story, store: S, config: EngineConfig) -> Result<Self, ReaderError> {
        let tracker = ProgressTracker::new(store);
        let saved = tracker.load(&story.title);

        let first = if story.contains(saved) {
            saved
        } else {
            if saved != SceneId::START {
                tracing::warn!(
                    story = %story.title,
                    %saved,
                    "saved scene no longer exists, starting over"
                );
            }
            if !story.contains(SceneId::START) {
                return Err(SceneError::NotFound(SceneId::START).into());
            }
            SceneId::START
        };

        tracing::info!(story = %story.title, scene = %first, "reader session started");
        Ok(Self {
            stats: config.default_stats.clone(),
            story,
            config,
            position: Position::At(first),
            tracker,
        })
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// The active scene id, or the last one once the story has ended.
    pub fn current_id(&self) -> SceneId {
        self.position.scene_id()
    }

    /// The scene being shown, `None` once the story has ended.
    pub fn current_scene(&self) -> Option<&Scene> {
        match self.position {
            Position::At(id) => self.story.get(id),
            Position::Ended { .. } => None,
        }
    }

    /// Options on offer right now; empty unless the active scene is a
    /// choice scene.
    pub fn choices(&self) -> &[Choice] {
        match self.current_scene() {
            Some(scene) => scene.choices(),
            None => &[],
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.position, Position::Ended { .. })
    }

    pub fn stats(&self) -> &StatVector {
        &self.stats
    }

    pub fn mood(&self) -> Mood {
        self.stats.derive_mood()
    }

    pub fn store(&self) -> &S {
        self.tracker.store()
    }

    /// Pick option `index` of the active choice scene.
    ///
    /// The target is resolved, and with autosave on the new position is
    /// saved, before anything changes: on error the stats and position are
    /// left exactly as they were.
    pub fn choose(&mut self, index: usize) -> Result<Step<'_>, ReaderError> {
        let current = self.active_id()?;
        let graph = SceneGraph::new(&self.story, self.config.dangling);
        let scene = graph.resolve(current)?;
        let choice = graph.choice(scene, index)?;
        let next = graph.apply_choice(scene, index)?.scene().map(|s| s.id);
        let stats = self.stats.apply_impact(&choice.impact);
        self.move_to(current, next, Some(stats))
    }

    /// Advance past an auto scene. On a terminal scene this ends the story.
    pub fn advance(&mut self) -> Result<Step<'_>, ReaderError> {
        let current = self.active_id()?;
        let graph = SceneGraph::new(&self.story, self.config.dangling);
        let scene = graph.resolve(current)?;
        let next = graph.advance_auto(scene)?.scene().map(|s| s.id);
        self.move_to(current, next, None)
    }

    /// Persist the current position.
    pub fn save(&mut self) -> Result<(), ReaderError> {
        let scene = self.position.scene_id();
        self.tracker.save(&self.story.title, scene)?;
        Ok(())
    }

    /// Forget saved progress and start over with default stats.
    pub fn reset(&mut self) -> Result<(), ReaderError> {
        if !self.story.contains(SceneId::START) {
            return Err(SceneError::NotFound(SceneId::START).into());
        }
        self.tracker.reset(&self.story.title)?;
        self.stats = self.config.default_stats.clone();
        self.position = Position::At(SceneId::START);
        Ok(())
    }

    pub fn into_store(self) -> S {
        self.tracker.into_store()
    }

    fn active_id(&self) -> Result<SceneId, ReaderError> {
        match self.position {
            Position::At(id) => Ok(id),
            Position::Ended { .. } => Err(ReaderError::Ended),
        }
    }

    /// Commit a move, plus the stats a choice produced. With autosave on,
    /// the new position is written first and a failed write commits nothing.
    fn move_to(
        &mut self,
        from: SceneId,
        next: Option<SceneId>,
        stats: Option<StatVector>,
    ) -> Result<Step<'_>, ReaderError> {
        let position = match next {
            Some(id) => Position::At(id),
            None => Position::Ended { last: from },
        };
        if self.config.autosave {
            self.tracker.save(&self.story.title, position.scene_id())?;
        }

        if let Some(stats) = stats {
            self.stats = stats;
            tracing::debug!(
                story = %self.story.title,
                mood = %self.stats.derive_mood(),
                "impact applied"
            );
        }
        self.position = position;
        match position {
            Position::At(id) => {
                tracing::debug!(story = %self.story.title, %from, to = %id, "scene transition");
            }
            Position::Ended { last } => {
                tracing::info!(story = %self.story.title, %last, "story ended");
            }
        }

        Ok(match self.current_scene() {
            Some(scene) => Step::Scene(scene),
            None => Step::Ended,
        })
    }
}

//! Stories — ordered scene collections, loading, validation and lint.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::scene::{Scene, SceneId, Transition};

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("story '{0}' has no scenes")]
    Empty(String),
    #[error("scene id {0} is used more than once")]
    DuplicateSceneId(SceneId),
    #[error("scene {0} has a choice transition with no options")]
    EmptyChoices(SceneId),
}

/// A named, ordered collection of scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Story {
    pub title: String,
    pub scenes: Vec<Scene>,
}

/// How serious a lint finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// A single lint finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryIssue {
    pub severity: Severity,
    pub scene: Option<SceneId>,
    pub message: String,
}

impl fmt::Display for StoryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        match self.scene {
            Some(id) => write!(f, "{level}: scene {id}: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

impl Story {
    pub fn new(title: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            title: title.into(),
            scenes,
        }
    }

    /// Load and validate a story from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Story, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a story from a RON string.
    pub fn parse_ron(input: &str) -> Result<Story, StoryError> {
        let story: Story = ron::from_str(input)?;
        story.validate()?;
        Ok(story)
    }

    /// Parse and validate a story from a JSON string.
    pub fn parse_json(input: &str) -> Result<Story, StoryError> {
        let story: Story = serde_json::from_str(input)?;
        story.validate()?;
        Ok(story)
    }

    /// Reject structural errors: no scenes, duplicate ids, or a choice
    /// transition without options.
    ///
    /// References to missing scenes are allowed here; what they mean is
    /// decided at play time.
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.scenes.is_empty() {
            return Err(StoryError::Empty(self.title.clone()));
        }
        let mut seen = FxHashSet::default();
        for scene in &self.scenes {
            if !seen.insert(scene.id) {
                return Err(StoryError::DuplicateSceneId(scene.id));
            }
            if let Some(Transition::Choice { options }) = &scene.next_scene {
                if options.is_empty() {
                    return Err(StoryError::EmptyChoices(scene.id));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.id == id)
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scene ids reachable from `start` by following every transition.
    pub fn reachable_from(&self, start: SceneId) -> FxHashSet<SceneId> {
        let index: FxHashMap<SceneId, &Scene> =
            self.scenes.iter().map(|scene| (scene.id, scene)).collect();
        let mut reached = FxHashSet::default();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            let Some(scene) = index.get(&id) else {
                continue;
            };
            if !reached.insert(id) {
                continue;
            }
            if let Some(transition) = &scene.next_scene {
                queue.extend(transition.targets());
            }
        }
        reached
    }

    /// Check the story for broken links and authoring mistakes.
    ///
    /// `stat_names` is the stat schema impacts are checked against; pass an
    /// empty slice to skip that check.
    pub fn lint(&self, stat_names: &[&str]) -> Vec<StoryIssue> {
        let mut issues = Vec::new();
        let mut push = |severity, scene, message: String| {
            issues.push(StoryIssue {
                severity,
                scene,
                message,
            })
        };

        if self.scenes.is_empty() {
            push(Severity::Error, None, "story has no scenes".to_string());
            return issues;
        }

        let mut seen = FxHashSet::default();
        for scene in &self.scenes {
            if !seen.insert(scene.id) {
                push(
                    Severity::Error,
                    Some(scene.id),
                    "scene id is used more than once".to_string(),
                );
            }
        }

        for scene in &self.scenes {
            let Some(transition) = &scene.next_scene else {
                continue;
            };
            if let Transition::Choice { options } = transition {
                if options.is_empty() {
                    push(
                        Severity::Error,
                        Some(scene.id),
                        "choice transition has no options".to_string(),
                    );
                }
                for (i, choice) in options.iter().enumerate() {
                    if choice.text.trim().is_empty() {
                        push(
                            Severity::Warning,
                            Some(scene.id),
                            format!("choice {} has no text", i + 1),
                        );
                    }
                    if !stat_names.is_empty() {
                        for stat in choice.impact.keys() {
                            if !stat_names.contains(&stat.as_str()) {
                                push(
                                    Severity::Warning,
                                    Some(scene.id),
                                    format!(
                                        "choice {} impacts unknown stat '{}' which will be ignored",
                                        i + 1,
                                        stat
                                    ),
                                );
                            }
                        }
                    }
                }
            }
            for target in transition.targets() {
                if !seen.contains(&target) {
                    push(
                        Severity::Error,
                        Some(scene.id),
                        format!("references missing scene {target}"),
                    );
                }
            }
        }

        if !seen.contains(&SceneId::START) {
            push(
                Severity::Warning,
                None,
                format!("no scene with id {}, readers without a save cannot start", SceneId::START),
            );
        } else {
            let reachable = self.reachable_from(SceneId::START);
            for scene in &self.scenes {
                if !reachable.contains(&scene.id) {
                    push(
                        Severity::Warning,
                        Some(scene.id),
                        format!("unreachable from scene {}", SceneId::START),
                    );
                }
            }
        }

        issues
    }
}

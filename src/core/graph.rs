//! Scene graph engine — resolves scenes and follows transitions.
//!
//! The graph never advances on its own: every step is driven by the caller
//! (a tap for auto scenes, a click for choice scenes). It also never touches
//! stats; applying a choice's impact is the caller's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::scene::{Choice, Scene, SceneId, Transition, TransitionKind};
use crate::schema::story::Story;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("scene not found: {0}")]
    NotFound(SceneId),
    #[error("scene {scene} has a {actual} transition, expected {expected}")]
    InvalidState {
        scene: SceneId,
        expected: TransitionKind,
        actual: TransitionKind,
    },
    #[error("scene {scene} has {len} choices, no choice at index {index}")]
    ChoiceOutOfRange {
        scene: SceneId,
        index: usize,
        len: usize,
    },
}

/// What an unresolved transition target means during play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DanglingPolicy {
    /// Surface `SceneError::NotFound` so the UI can show a broken-link message.
    #[default]
    Error,
    /// Treat the missing target as the end of the story.
    End,
}

/// Result of following a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'a> {
    Scene(&'a Scene),
    Ended,
}

impl<'a> Step<'a> {
    pub fn scene(&self) -> Option<&'a Scene> {
        match *self {
            Self::Scene(scene) => Some(scene),
            Self::Ended => None,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// A read-only view over a story's scenes with a dangling-reference policy.
#[derive(Debug, Clone, Copy)]
pub struct SceneGraph<'a> {
    story: &'a Story,
    policy: DanglingPolicy,
}

impl<'a> SceneGraph<'a> {
    pub fn new(story: &'a Story, policy: DanglingPolicy) -> Self {
        Self { story, policy }
    }

    pub fn story(&self) -> &'a Story {
        self.story
    }

    pub fn policy(&self) -> DanglingPolicy {
        self.policy
    }

    pub fn resolve(&self, id: SceneId) -> Result<&'a Scene, SceneError> {
        self.story.get(id).ok_or(SceneError::NotFound(id))
    }

    /// The choice at `index` in a choice scene.
    pub fn choice(&self, current: &'a Scene, index: usize) -> Result<&'a Choice, SceneError> {
        let options = match &current.next_scene {
            Some(Transition::Choice { options }) => options,
            _ => {
                return Err(SceneError::InvalidState {
                    scene: current.id,
                    expected: TransitionKind::Choice,
                    actual: current.transition_kind(),
                })
            }
        };
        options.get(index).ok_or(SceneError::ChoiceOutOfRange {
            scene: current.id,
            index,
            len: options.len(),
        })
    }

    /// Follow the choice at `index` from a choice scene.
    pub fn apply_choice(&self, current: &'a Scene, index: usize) -> Result<Step<'a>, SceneError> {
        let choice = self.choice(current, index)?;
        tracing::debug!(
            story = %self.story.title,
            from = %current.id,
            to = %choice.next_scene_id,
            choice = %choice.text,
            "following choice"
        );
        self.follow(current.id, choice.next_scene_id)
    }

    /// Follow an auto transition. A scene without a transition is terminal
    /// and yields `Step::Ended`.
    pub fn advance_auto(&self, current: &'a Scene) -> Result<Step<'a>, SceneError> {
        match &current.next_scene {
            Some(Transition::Auto { next_scene_id }) => {
                tracing::debug!(
                    story = %self.story.title,
                    from = %current.id,
                    to = %next_scene_id,
                    "auto-advancing"
                );
                self.follow(current.id, *next_scene_id)
            }
            Some(Transition::Choice { .. }) => Err(SceneError::InvalidState {
                scene: current.id,
                expected: TransitionKind::Auto,
                actual: TransitionKind::Choice,
            }),
            None => Ok(Step::Ended),
        }
    }

    fn follow(&self, from: SceneId, target: SceneId) -> Result<Step<'a>, SceneError> {
        match self.resolve(target) {
            Ok(scene) => Ok(Step::Scene(scene)),
            Err(err) => match self.policy {
                DanglingPolicy::Error => Err(err),
                DanglingPolicy::End => {
                    tracing::warn!(
                        story = %self.story.title,
                        %from,
                        %target,
                        "transition target missing, ending story"
                    );
                    Ok(Step::Ended)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::scene::Impact;

    fn scene(id: u32, next: Option<Transition>) -> Scene {
        Scene {
            next_scene: next,
            ..Scene::template(SceneId(id))
        }
    }

    fn choice(text: &str, to: u32) -> Choice {
        Choice {
            text: text.to_string(),
            next_scene_id: SceneId(to),
            impact: Impact::new(),
        }
    }

    fn make_story() -> Story {
        Story::new(
            "Graph",
            vec![
                scene(
                    0,
                    Some(Transition::Choice {
                        options: vec![choice("A", 1), choice("B", 2), choice("Broken", 42)],
                    }),
                ),
                scene(1, Some(Transition::Auto { next_scene_id: SceneId(2) })),
                scene(2, None),
                scene(3, Some(Transition::Auto { next_scene_id: SceneId(99) })),
            ],
        )
    }

    #[test]
    fn resolve_existing_and_missing() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        assert_eq!(graph.resolve(SceneId(1)).unwrap().id, SceneId(1));
        assert_eq!(
            graph.resolve(SceneId(7)).unwrap_err(),
            SceneError::NotFound(SceneId(7))
        );
    }

    #[test]
    fn apply_choice_moves_to_target() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        let start = graph.resolve(SceneId(0)).unwrap();
        let step = graph.apply_choice(start, 1).unwrap();
        assert_eq!(step.scene().map(|s| s.id), Some(SceneId(2)));
    }

    #[test]
    fn apply_choice_out_of_range() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        let start = graph.resolve(SceneId(0)).unwrap();
        assert_eq!(
            graph.apply_choice(start, 3).unwrap_err(),
            SceneError::ChoiceOutOfRange {
                scene: SceneId(0),
                index: 3,
                len: 3
            }
        );
    }

    #[test]
    fn apply_choice_on_auto_scene_is_invalid() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        let auto = graph.resolve(SceneId(1)).unwrap();
        assert!(matches!(
            graph.apply_choice(auto, 0),
            Err(SceneError::InvalidState {
                expected: TransitionKind::Choice,
                actual: TransitionKind::Auto,
                ..
            })
        ));
    }

    #[test]
    fn dangling_choice_surfaces_not_found_by_default() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::default());
        let start = graph.resolve(SceneId(0)).unwrap();
        assert_eq!(
            graph.apply_choice(start, 2).unwrap_err(),
            SceneError::NotFound(SceneId(42))
        );
    }

    #[test]
    fn dangling_choice_ends_under_end_policy() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::End);
        let start = graph.resolve(SceneId(0)).unwrap();
        assert!(graph.apply_choice(start, 2).unwrap().is_ended());
    }

    #[test]
    fn advance_auto_follows_edge() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        let auto = graph.resolve(SceneId(1)).unwrap();
        assert_eq!(
            graph.advance_auto(auto).unwrap().scene().map(|s| s.id),
            Some(SceneId(2))
        );
    }

    #[test]
    fn advance_auto_on_choice_scene_is_invalid() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        let start = graph.resolve(SceneId(0)).unwrap();
        assert_eq!(
            graph.advance_auto(start).unwrap_err(),
            SceneError::InvalidState {
                scene: SceneId(0),
                expected: TransitionKind::Auto,
                actual: TransitionKind::Choice,
            }
        );
    }

    #[test]
    fn advance_auto_on_terminal_scene_ends() {
        let story = make_story();
        let graph = SceneGraph::new(&story, DanglingPolicy::Error);
        let last = graph.resolve(SceneId(2)).unwrap();
        assert_eq!(graph.advance_auto(last).unwrap(), Step::Ended);
    }

    #[test]
    fn dangling_auto_follows_policy() {
        let story = make_story();
        let broken = story.get(SceneId(3)).unwrap();

        let strict = SceneGraph::new(&story, DanglingPolicy::Error);
        assert_eq!(
            strict.advance_auto(broken).unwrap_err(),
            SceneError::NotFound(SceneId(99))
        );

        let lenient = SceneGraph::new(&story, DanglingPolicy::End);
        assert!(lenient.advance_auto(broken).unwrap().is_ended());
    }

    #[test]
    fn error_messages() {
        let err = SceneError::InvalidState {
            scene: SceneId(4),
            expected: TransitionKind::Auto,
            actual: TransitionKind::Choice,
        };
        assert_eq!(err.to_string(), "scene 4 has a choice transition, expected auto");
        assert_eq!(SceneError::NotFound(SceneId(9)).to_string(), "scene not found: 9");
    }
}

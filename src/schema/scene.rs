use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Newtype wrapper for scene IDs. Unique within a story and stable across
/// sessions, since it doubles as the saved progress marker.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SceneId(pub u32);

impl SceneId {
    /// The entry point every story starts from when there is no saved progress.
    pub const START: SceneId = SceneId(0);
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial stat-delta map attached to a choice.
pub type Impact = BTreeMap<String, i32>;

/// A single narrative beat: display content plus the directive that says
/// where the story goes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scene {
    pub id: SceneId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub background_image: String,
    #[serde(default)]
    pub character_image: String,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub dialogue: String,
    /// Emotional tone of the scene itself. Unrelated to the mood derived
    /// from the reader's stats.
    #[serde(default)]
    pub mood: Option<String>,
    /// `None` marks a terminal scene.
    #[serde(default)]
    pub next_scene: Option<Transition>,
}

/// How a scene hands off to the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum Transition {
    /// Advance on an explicit tap, no input required.
    Auto {
        #[serde(rename = "nextSceneId")]
        next_scene_id: SceneId,
    },
    /// Let the reader pick one of several options. Never empty in a
    /// validated story.
    Choice { options: Vec<Choice> },
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Auto { .. } => TransitionKind::Auto,
            Self::Choice { .. } => TransitionKind::Choice,
        }
    }

    /// Every scene id this transition can lead to, in option order.
    pub fn targets(&self) -> Vec<SceneId> {
        match self {
            Self::Auto { next_scene_id } => vec![*next_scene_id],
            Self::Choice { options } => options.iter().map(|c| c.next_scene_id).collect(),
        }
    }
}

/// Discriminant of a `Transition`, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Auto,
    Choice,
    /// The scene has no transition at all.
    Terminal,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Choice => "choice",
            Self::Terminal => "terminal",
        };
        f.write_str(s)
    }
}

/// One option of a choice transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Choice {
    pub text: String,
    pub next_scene_id: SceneId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub impact: Impact,
}

impl Scene {
    /// The blank scene the maker clones when adding a new one.
    pub fn template(id: SceneId) -> Self {
        Self {
            id,
            title: format!("Scene {}", u64::from(id.0) + 1),
            background_image: String::new(),
            character_image: String::new(),
            character_name: String::new(),
            dialogue: String::new(),
            mood: None,
            next_scene: None,
        }
    }

    pub fn transition_kind(&self) -> TransitionKind {
        self.next_scene
            .as_ref()
            .map_or(TransitionKind::Terminal, Transition::kind)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_scene.is_none()
    }

    /// Options of a choice scene; empty for auto and terminal scenes.
    pub fn choices(&self) -> &[Choice] {
        match &self.next_scene {
            Some(Transition::Choice { options }) => options,
            _ => &[],
        }
    }
}

//! Maker session — the visual novel editor's in-memory state.
//!
//! Every edit computes the next scene collection and pushes it onto a linear
//! undo/redo history. Sessions are plain values: one per user, persisted
//! explicitly through a `KeyValueStore`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::core::history::History;
use crate::core::progress::{KeyValueStore, StoreError};
use crate::schema::scene::{Scene, SceneId, Transition};
use crate::schema::story::{Story, StoryError};

/// Storage key the editor session is persisted under.
pub const MAKER_STORAGE_KEY: &str = "novel-maker-storage";

/// Current export document version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum MakerError {
    #[error("scene not found: {0}")]
    SceneNotFound(SceneId),
    #[error("cannot delete scene {0}: it is the only scene left")]
    LastScene(SceneId),
    #[error("no unused scene id left")]
    IdsExhausted,
    #[error("invalid scene collection: {0}")]
    Invalid(#[from] StoryError),
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Which image of a scene an asset change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSlot {
    Background,
    Character,
}

/// A partial scene update. Absent fields are left alone; `mood` and
/// `nextScene` accept an explicit `null` to clear them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub mood: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_scene: Option<Option<Transition>>,
}

/// Maps a present field (even `null`) to `Some`, leaving absence to `default`.
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ScenePatch {
    pub fn apply(&self, scene: &mut Scene) {
        if let Some(title) = &self.title {
            scene.title = title.clone();
        }
        if let Some(background) = &self.background_image {
            scene.background_image = background.clone();
        }
        if let Some(character) = &self.character_image {
            scene.character_image = character.clone();
        }
        if let Some(name) = &self.character_name {
            scene.character_name = name.clone();
        }
        if let Some(dialogue) = &self.dialogue {
            scene.dialogue = dialogue.clone();
        }
        if let Some(mood) = &self.mood {
            scene.mood = mood.clone();
        }
        if let Some(next) = &self.next_scene {
            scene.next_scene = next.clone();
        }
    }
}

/// Export metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentMetadata {
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// The maker's JSON export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MakerDocument {
    pub version: u32,
    pub scenes: Vec<Scene>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MakerSession {
    history: History<Vec<Scene>>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl Default for MakerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MakerSession {
    /// A fresh session holding a single blank scene.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            history: History::new(vec![Scene::template(SceneId::START)]),
            created_at: now,
            last_modified: now,
        }
    }

    /// Start editing an existing collection, e.g. a published story.
    pub fn from_scenes(scenes: Vec<Scene>) -> Result<Self, MakerError> {
        check_collection(&scenes)?;
        let now = Utc::now();
        Ok(Self {
            history: History::new(scenes),
            created_at: now,
            last_modified: now,
        })
    }

    pub fn scenes(&self) -> &[Scene] {
        self.history.present()
    }

    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes().iter().find(|scene| scene.id == id)
    }

    pub fn len(&self) -> usize {
        self.scenes().len()
    }

    /// A session never holds an empty collection; kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.scenes().is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Append a blank scene with a fresh id.
    pub fn add_scene(&mut self) -> Result<SceneId, MakerError> {
        let id = self.fresh_id()?;
        let mut next = self.scenes().to_vec();
        next.push(Scene::template(id));
        self.commit("add scene", next);
        Ok(id)
    }

    /// Copy a scene under a fresh id, placed right after the original.
    pub fn duplicate_scene(&mut self, id: SceneId) -> Result<SceneId, MakerError> {
        let index = self.index_of(id)?;
        let fresh = self.fresh_id()?;
        let mut next = self.scenes().to_vec();
        let mut copy = next[index].clone();
        copy.id = fresh;
        copy.title = format!("{} (copy)", copy.title);
        next.insert(index + 1, copy);
        self.commit("duplicate scene", next);
        Ok(fresh)
    }

    /// Merge `patch` into a scene. The scene id itself never changes.
    pub fn update_scene(&mut self, id: SceneId, patch: &ScenePatch) -> Result<(), MakerError> {
        let index = self.index_of(id)?;
        if let Some(Some(Transition::Choice { options })) = &patch.next_scene {
            if options.is_empty() {
                return Err(StoryError::EmptyChoices(id).into());
            }
        }
        let mut next = self.scenes().to_vec();
        patch.apply(&mut next[index]);
        self.commit("update scene", next);
        Ok(())
    }

    /// Swap the background or character image of a scene.
    pub fn set_asset(
        &mut self,
        id: SceneId,
        slot: AssetSlot,
        uri: impl Into<String>,
    ) -> Result<(), MakerError> {
        let uri = uri.into();
        let patch = match slot {
            AssetSlot::Background => ScenePatch {
                background_image: Some(uri),
                ..ScenePatch::default()
            },
            AssetSlot::Character => ScenePatch {
                character_image: Some(uri),
                ..ScenePatch::default()
            },
        };
        self.update_scene(id, &patch)
    }

    /// Remove a scene. The last remaining scene cannot be deleted.
    pub fn delete_scene(&mut self, id: SceneId) -> Result<(), MakerError> {
        let index = self.index_of(id)?;
        if self.len() == 1 {
            return Err(MakerError::LastScene(id));
        }
        let mut next = self.scenes().to_vec();
        next.remove(index);
        self.commit("delete scene", next);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo();
        if undone {
            self.last_modified = Utc::now();
            tracing::debug!(remaining = self.history.past_len(), "undo");
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo();
        if redone {
            self.last_modified = Utc::now();
            tracing::debug!(remaining = self.history.future_len(), "redo");
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Snapshot the current scenes as a story a reader session can play.
    pub fn to_story(&self, title: impl Into<String>) -> Story {
        Story::new(title, self.scenes().to_vec())
    }

    pub fn export(&self) -> MakerDocument {
        MakerDocument {
            version: DOCUMENT_VERSION,
            scenes: self.scenes().to_vec(),
            metadata: DocumentMetadata {
                created_at: self.created_at,
                last_modified: self.last_modified,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, MakerError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Load an exported document. The version is checked before the rest of
    /// the document is parsed, so newer formats report a version mismatch
    /// rather than a field error.
    pub fn from_json(input: &str) -> Result<Self, MakerError> {
        #[derive(Deserialize)]
        struct VersionHeader {
            version: u32,
        }

        let header: VersionHeader = serde_json::from_str(input)?;
        if header.version != DOCUMENT_VERSION {
            return Err(MakerError::VersionMismatch {
                expected: DOCUMENT_VERSION,
                found: header.version,
            });
        }
        let document: MakerDocument = serde_json::from_str(input)?;
        Self::from_document(document)
    }

    pub fn from_document(document: MakerDocument) -> Result<Self, MakerError> {
        if document.version != DOCUMENT_VERSION {
            return Err(MakerError::VersionMismatch {
                expected: DOCUMENT_VERSION,
                found: document.version,
            });
        }
        check_collection(&document.scenes)?;
        Ok(Self {
            history: History::new(document.scenes),
            created_at: document.metadata.created_at,
            last_modified: document.metadata.last_modified,
        })
    }

    /// Write the session to `store` under `MAKER_STORAGE_KEY`. Undo history
    /// is not persisted.
    pub fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), MakerError> {
        let json = serde_json::to_string(&self.export())?;
        store.set(MAKER_STORAGE_KEY, &json)?;
        tracing::info!(scenes = self.len(), "maker session persisted");
        Ok(())
    }

    /// Restore a persisted session, or start a fresh one when nothing usable
    /// is stored.
    pub fn restore<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let raw = match store.get(MAKER_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read maker storage, starting fresh");
                return Self::new();
            }
        };
        match Self::from_json(&raw) {
            Ok(session) => {
                tracing::info!(scenes = session.len(), "maker session restored");
                session
            }
            Err(e) => {
                tracing::warn!(error = %e, "corrupt maker storage, starting fresh");
                Self::new()
            }
        }
    }

    /// Forget everything, including undo history.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn index_of(&self, id: SceneId) -> Result<usize, MakerError> {
        self.scenes()
            .iter()
            .position(|scene| scene.id == id)
            .ok_or(MakerError::SceneNotFound(id))
    }

    /// One past the highest id, or the lowest unused id once the highest
    /// is `u32::MAX`.
    fn fresh_id(&self) -> Result<SceneId, MakerError> {
        let Some(max) = self.scenes().iter().map(|scene| scene.id).max() else {
            return Ok(SceneId::START);
        };
        if let Some(next) = max.0.checked_add(1) {
            return Ok(SceneId(next));
        }
        let mut used: Vec<u32> = self.scenes().iter().map(|scene| scene.id.0).collect();
        used.sort_unstable();
        let mut candidate = 0u32;
        for id in used {
            if id != candidate {
                break;
            }
            candidate = candidate.checked_add(1).ok_or(MakerError::IdsExhausted)?;
        }
        tracing::debug!(id = candidate, "highest scene id taken, reusing a gap");
        Ok(SceneId(candidate))
    }

    fn commit(&mut self, action: &str, next: Vec<Scene>) {
        if next == *self.history.present() {
            tracing::trace!(action, "edit changed nothing");
            return;
        }
        self.history.push(next);
        self.last_modified = Utc::now();
        tracing::debug!(action, scenes = self.len(), "edit committed");
    }
}

fn check_collection(scenes: &[Scene]) -> Result<(), StoryError> {
    Story::new("", scenes.to_vec()).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::MemoryStore;
    use crate::schema::scene::{Choice, Impact};

    fn patch_dialogue(text: &str) -> ScenePatch {
        ScenePatch {
            dialogue: Some(text.to_string()),
            ..ScenePatch::default()
        }
    }

    #[test]
    fn new_session_has_one_template_scene() {
        let session = MakerSession::new();
        assert_eq!(session.len(), 1);
        assert_eq!(session.scenes()[0].id, SceneId(0));
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn add_scene_uses_fresh_ids() {
        let mut session = MakerSession::new();
        assert_eq!(session.add_scene().unwrap(), SceneId(1));
        assert_eq!(session.add_scene().unwrap(), SceneId(2));
        session.delete_scene(SceneId(1)).unwrap();
        assert_eq!(session.add_scene().unwrap(), SceneId(3));
        assert_eq!(session.scene(SceneId(3)).unwrap().title, "Scene 4");
    }

    #[test]
    fn duplicate_inserts_copy_after_original() {
        let mut session = MakerSession::new();
        session.add_scene().unwrap();
        session
            .update_scene(SceneId(0), &patch_dialogue("Hello there."))
            .unwrap();
        let copy = session.duplicate_scene(SceneId(0)).unwrap();
        assert_eq!(copy, SceneId(2));
        let ids: Vec<SceneId> = session.scenes().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SceneId(0), SceneId(2), SceneId(1)]);
        let duplicated = session.scene(copy).unwrap();
        assert_eq!(duplicated.dialogue, "Hello there.");
        assert_eq!(duplicated.title, "Scene 1 (copy)");
    }

    #[test]
    fn duplicate_missing_scene_fails() {
        let mut session = MakerSession::new();
        assert!(matches!(
            session.duplicate_scene(SceneId(8)),
            Err(MakerError::SceneNotFound(SceneId(8)))
        ));
        assert!(!session.can_undo());
    }

    #[test]
    fn add_after_max_id_reuses_lowest_gap() {
        let mut session = MakerSession::from_scenes(vec![
            Scene::template(SceneId(0)),
            Scene::template(SceneId(u32::MAX)),
        ])
        .unwrap();
        assert_eq!(session.add_scene().unwrap(), SceneId(1));
        assert_eq!(session.duplicate_scene(SceneId(u32::MAX)).unwrap(), SceneId(2));
        assert_eq!(session.len(), 4);
        assert!(session.to_story("Ids").validate().is_ok());
    }

    #[test]
    fn add_after_only_max_id_starts_from_zero() {
        let mut session =
            MakerSession::from_scenes(vec![Scene::template(SceneId(u32::MAX))]).unwrap();
        assert_eq!(session.scenes()[0].title, "Scene 4294967296");
        assert_eq!(session.add_scene().unwrap(), SceneId(0));
    }

    #[test]
    fn update_merges_only_given_fields() {
        let mut session = MakerSession::new();
        session
            .update_scene(
                SceneId(0),
                &ScenePatch {
                    character_name: Some("Hana".to_string()),
                    mood: Some(Some("shy".to_string())),
                    ..ScenePatch::default()
                },
            )
            .unwrap();
        session
            .update_scene(SceneId(0), &patch_dialogue("Hi."))
            .unwrap();
        let scene = &session.scenes()[0];
        assert_eq!(scene.character_name, "Hana");
        assert_eq!(scene.dialogue, "Hi.");
        assert_eq!(scene.mood.as_deref(), Some("shy"));
        assert_eq!(scene.title, "Scene 1");
    }

    #[test]
    fn patch_null_clears_optional_fields() {
        let mut session = MakerSession::new();
        session
            .update_scene(
                SceneId(0),
                &ScenePatch {
                    mood: Some(Some("tense".to_string())),
                    next_scene: Some(Some(Transition::Auto {
                        next_scene_id: SceneId(0),
                    })),
                    ..ScenePatch::default()
                },
            )
            .unwrap();

        let clear: ScenePatch = serde_json::from_str(r#"{"mood": null, "nextScene": null}"#).unwrap();
        assert_eq!(clear.mood, Some(None));
        assert_eq!(clear.next_scene, Some(None));
        session.update_scene(SceneId(0), &clear).unwrap();
        assert_eq!(session.scenes()[0].mood, None);
        assert!(session.scenes()[0].is_terminal());

        let untouched: ScenePatch = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        assert_eq!(untouched.mood, None);
        assert_eq!(untouched.next_scene, None);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result: Result<ScenePatch, _> = serde_json::from_str(r#"{"id": 4}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_rejects_empty_choice_list() {
        let mut session = MakerSession::new();
        let patch = ScenePatch {
            next_scene: Some(Some(Transition::Choice { options: vec![] })),
            ..ScenePatch::default()
        };
        assert!(matches!(
            session.update_scene(SceneId(0), &patch),
            Err(MakerError::Invalid(StoryError::EmptyChoices(SceneId(0))))
        ));
        assert!(!session.can_undo());
    }

    #[test]
    fn noop_update_adds_no_history() {
        let mut session = MakerSession::new();
        session
            .update_scene(SceneId(0), &ScenePatch::default())
            .unwrap();
        assert!(!session.can_undo());
    }

    #[test]
    fn set_asset_targets_slot() {
        let mut session = MakerSession::new();
        session
            .set_asset(SceneId(0), AssetSlot::Background, "/bg/park.png")
            .unwrap();
        session
            .set_asset(SceneId(0), AssetSlot::Character, "/chars/hana.png")
            .unwrap();
        let scene = &session.scenes()[0];
        assert_eq!(scene.background_image, "/bg/park.png");
        assert_eq!(scene.character_image, "/chars/hana.png");
        assert!(session.undo());
        assert_eq!(session.scenes()[0].character_image, "");
        assert_eq!(session.scenes()[0].background_image, "/bg/park.png");
    }

    #[test]
    fn cannot_delete_last_scene() {
        let mut session = MakerSession::new();
        assert!(matches!(
            session.delete_scene(SceneId(0)),
            Err(MakerError::LastScene(SceneId(0)))
        ));
        assert_eq!(session.len(), 1);

        session.add_scene().unwrap();
        session.delete_scene(SceneId(0)).unwrap();
        assert!(matches!(
            session.delete_scene(SceneId(1)),
            Err(MakerError::LastScene(SceneId(1)))
        ));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn undo_redo_through_edits() {
        let mut session = MakerSession::new();
        session.add_scene().unwrap();
        session.add_scene().unwrap();
        assert_eq!(session.len(), 3);

        assert!(session.undo());
        assert_eq!(session.len(), 2);
        assert!(session.can_redo());

        let before_redo = session.scenes().to_vec();
        assert!(session.undo());
        assert!(session.redo());
        assert_eq!(session.scenes(), before_redo.as_slice());

        session.update_scene(SceneId(1), &patch_dialogue("New")).unwrap();
        assert!(!session.can_redo());
    }

    #[test]
    fn from_scenes_rejects_empty_and_duplicates() {
        assert!(matches!(
            MakerSession::from_scenes(Vec::new()),
            Err(MakerError::Invalid(StoryError::Empty(_)))
        ));
        assert!(matches!(
            MakerSession::from_scenes(vec![
                Scene::template(SceneId(1)),
                Scene::template(SceneId(1))
            ]),
            Err(MakerError::Invalid(StoryError::DuplicateSceneId(SceneId(1))))
        ));
    }

    #[test]
    fn export_import_round_trip() {
        let mut session = MakerSession::new();
        let id = session.add_scene().unwrap();
        session
            .update_scene(
                SceneId(0),
                &ScenePatch {
                    next_scene: Some(Some(Transition::Choice {
                        options: vec![Choice {
                            text: "Go".to_string(),
                            next_scene_id: id,
                            impact: Impact::from([("trust".to_string(), 5)]),
                        }],
                    })),
                    ..ScenePatch::default()
                },
            )
            .unwrap();

        let json = session.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["metadata"]["createdAt"].is_string());
        assert!(value["metadata"]["lastModified"].is_string());

        let imported = MakerSession::from_json(&json).unwrap();
        assert_eq!(imported.scenes(), session.scenes());
        assert_eq!(imported.created_at(), session.created_at());
        assert!(!imported.can_undo());
    }

    #[test]
    fn import_rejects_other_versions() {
        let json = r#"{"version": 2, "scenes": [], "metadata": {}, "extra": true}"#;
        assert!(matches!(
            MakerSession::from_json(json),
            Err(MakerError::VersionMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn import_rejects_empty_collection_and_unknown_fields() {
        let now = Utc::now().to_rfc3339();
        let empty = format!(
            r#"{{"version": 1, "scenes": [], "metadata": {{"createdAt": "{now}", "lastModified": "{now}"}}}}"#
        );
        assert!(matches!(
            MakerSession::from_json(&empty),
            Err(MakerError::Invalid(StoryError::Empty(_)))
        ));

        let unknown = format!(
            r#"{{"version": 1, "scenes": [{{"id": 0}}], "author": "x", "metadata": {{"createdAt": "{now}", "lastModified": "{now}"}}}}"#
        );
        assert!(matches!(
            MakerSession::from_json(&unknown),
            Err(MakerError::Json(_))
        ));
    }

    #[test]
    fn persist_and_restore() {
        let mut store = MemoryStore::new();
        let mut session = MakerSession::new();
        session.add_scene().unwrap();
        session.persist(&mut store).unwrap();

        let restored = MakerSession::restore(&store);
        assert_eq!(restored.scenes(), session.scenes());
    }

    #[test]
    fn restore_falls_back_to_fresh_session() {
        let store = MemoryStore::new();
        assert_eq!(MakerSession::restore(&store).len(), 1);

        let mut corrupt = MemoryStore::new();
        corrupt.set(MAKER_STORAGE_KEY, "{not json").unwrap();
        let restored = MakerSession::restore(&corrupt);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.scenes()[0].id, SceneId(0));
    }

    #[test]
    fn to_story_is_playable_snapshot() {
        let mut session = MakerSession::new();
        session.add_scene().unwrap();
        let story = session.to_story("Draft");
        session.delete_scene(SceneId(1)).unwrap();
        assert_eq!(story.title, "Draft");
        assert_eq!(story.len(), 2);
        assert!(story.validate().is_ok());
    }

    #[test]
    fn clear_drops_history() {
        let mut session = MakerSession::new();
        session.add_scene().unwrap();
        session.clear();
        assert_eq!(session.len(), 1);
        assert!(!session.can_undo());
    }
}

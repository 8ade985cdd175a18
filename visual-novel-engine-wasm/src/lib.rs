//! WASM bindings for visual-novel-engine — powers the browser reader and maker.

use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

use visual_novel_engine::core::config::EngineConfig;
use visual_novel_engine::core::graph::Step;
use visual_novel_engine::core::maker::{AssetSlot, MakerSession, ScenePatch};
use visual_novel_engine::core::progress::{KeyValueStore, MemoryStore, StoreError};
use visual_novel_engine::core::reader::ReaderSession;
use visual_novel_engine::schema::scene::SceneId;
use visual_novel_engine::schema::story::Story;

// ---------------------------------------------------------------------------
// Embedded sample story — compiled into the WASM binary
// ---------------------------------------------------------------------------
const SAMPLE_STORY: &str = include_str!("../../stories/coffee_shop.ron");

// ---------------------------------------------------------------------------
// Browser local storage
// ---------------------------------------------------------------------------

/// `KeyValueStore` over `window.localStorage`.
pub struct BrowserStorage(web_sys::Storage);

impl BrowserStorage {
    /// The page's local storage, if the browser exposes one.
    pub fn local() -> Option<Self> {
        web_sys::window()?.local_storage().ok().flatten().map(Self)
    }
}

fn backend_error(e: JsValue) -> StoreError {
    StoreError::Backend(format!("{e:?}"))
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.get_item(key).map_err(backend_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0.set_item(key, value).map_err(backend_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.0.remove_item(key).map_err(backend_error)
    }
}

/// Local storage when available, otherwise an in-memory store (tests, workers).
fn default_store() -> Box<dyn KeyValueStore> {
    match BrowserStorage::local() {
        Some(storage) => Box::new(storage),
        None => Box::new(MemoryStore::new()),
    }
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct StatsInfo<'a> {
    stats: BTreeMap<&'a str, u8>,
    mood: &'static str,
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn step_json(step: Step<'_>) -> Result<String, JsError> {
    to_json(&step.scene())
}

// ---------------------------------------------------------------------------
// ReaderDemo — plays one story
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ReaderDemo {
    session: ReaderSession<Box<dyn KeyValueStore>>,
}

#[wasm_bindgen]
impl ReaderDemo {
    /// Open a story given as RON, resuming saved progress.
    #[wasm_bindgen(constructor)]
    pub fn new(story_ron: &str) -> Result<ReaderDemo, JsError> {
        let story = Story::parse_ron(story_ron)
            .map_err(|e| JsError::new(&format!("Story parse error: {e}")))?;
        Self::open(story)
    }

    /// Open a story given as JSON (`{"title": ..., "scenes": [...]}`).
    pub fn from_json(story_json: &str) -> Result<ReaderDemo, JsError> {
        let story = Story::parse_json(story_json)
            .map_err(|e| JsError::new(&format!("Story parse error: {e}")))?;
        Self::open(story)
    }

    /// Open the bundled sample story.
    pub fn sample() -> Result<ReaderDemo, JsError> {
        Self::new(SAMPLE_STORY)
    }

    pub fn title(&self) -> String {
        self.session.story().title.clone()
    }

    /// The active scene as JSON, or `null` once the story has ended.
    pub fn current_scene(&self) -> Result<String, JsError> {
        to_json(&self.session.current_scene())
    }

    pub fn current_scene_id(&self) -> u32 {
        self.session.current_id().0
    }

    /// Pick option `index`. Returns the next scene as JSON, or `null` at the end.
    pub fn choose(&mut self, index: usize) -> Result<String, JsError> {
        let step = self.session.choose(index).map_err(js_error)?;
        step_json(step)
    }

    /// Advance past an auto scene. Returns the next scene as JSON, or `null`.
    pub fn advance(&mut self) -> Result<String, JsError> {
        let step = self.session.advance().map_err(js_error)?;
        step_json(step)
    }

    pub fn is_ended(&self) -> bool {
        self.session.is_ended()
    }

    pub fn save(&mut self) -> Result<(), JsError> {
        self.session.save().map_err(js_error)
    }

    pub fn reset(&mut self) -> Result<(), JsError> {
        self.session.reset().map_err(js_error)
    }

    /// Current stats and mood as JSON: `{"stats": {...}, "mood": "neutral"}`.
    pub fn stats(&self) -> Result<String, JsError> {
        let stats = self.session.stats();
        to_json(&StatsInfo {
            stats: stats.iter().collect(),
            mood: stats.derive_mood().label(),
        })
    }

    pub fn mood(&self) -> String {
        self.session.mood().label().to_string()
    }
}

// Private helpers
impl ReaderDemo {
    fn open(story: Story) -> Result<ReaderDemo, JsError> {
        let session = ReaderSession::start(story, default_store(), EngineConfig::default())
            .map_err(js_error)?;
        Ok(ReaderDemo { session })
    }
}

// ---------------------------------------------------------------------------
// MakerDemo — the story editor
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct MakerDemo {
    session: MakerSession,
    store: Box<dyn KeyValueStore>,
}

#[wasm_bindgen]
impl MakerDemo {
    /// A fresh editor with a single blank scene.
    #[wasm_bindgen(constructor)]
    pub fn new() -> MakerDemo {
        MakerDemo {
            session: MakerSession::new(),
            store: default_store(),
        }
    }

    /// Reopen the last persisted editor session, or start fresh.
    pub fn restore() -> MakerDemo {
        let store = default_store();
        MakerDemo {
            session: MakerSession::restore(&*store),
            store,
        }
    }

    /// All scenes as a JSON array.
    pub fn scenes(&self) -> Result<String, JsError> {
        to_json(&self.session.scenes())
    }

    pub fn add_scene(&mut self) -> Result<u32, JsError> {
        self.session
            .add_scene()
            .map(|id| id.0)
            .map_err(js_error)
    }

    pub fn duplicate_scene(&mut self, id: u32) -> Result<u32, JsError> {
        self.session
            .duplicate_scene(SceneId(id))
            .map(|fresh| fresh.0)
            .map_err(js_error)
    }

    /// Merge a JSON patch into a scene. `null` clears `mood` or `nextScene`.
    ///
    /// Expected JSON shape:
    /// ```json
    /// {
    ///   "dialogue": "Hello!",
    ///   "mood": null,
    ///   "nextScene": { "kind": "auto", "nextSceneId": 2 }
    /// }
    /// ```
    pub fn update_scene(&mut self, id: u32, patch_json: &str) -> Result<(), JsError> {
        let patch: ScenePatch = serde_json::from_str(patch_json)
            .map_err(|e| JsError::new(&format!("Invalid patch JSON: {e}")))?;
        self.session
            .update_scene(SceneId(id), &patch)
            .map_err(js_error)
    }

    pub fn delete_scene(&mut self, id: u32) -> Result<(), JsError> {
        self.session.delete_scene(SceneId(id)).map_err(js_error)
    }

    pub fn set_background(&mut self, id: u32, uri: &str) -> Result<(), JsError> {
        self.session
            .set_asset(SceneId(id), AssetSlot::Background, uri)
            .map_err(js_error)
    }

    pub fn set_character_image(&mut self, id: u32, uri: &str) -> Result<(), JsError> {
        self.session
            .set_asset(SceneId(id), AssetSlot::Character, uri)
            .map_err(js_error)
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    /// The versioned export document as pretty JSON.
    pub fn export_json(&self) -> Result<String, JsError> {
        self.session.to_json().map_err(js_error)
    }

    /// Replace the editor contents with an exported document. Clears history.
    pub fn import_json(&mut self, json: &str) -> Result<(), JsError> {
        self.session = MakerSession::from_json(json).map_err(js_error)?;
        Ok(())
    }

    pub fn persist(&mut self) -> Result<(), JsError> {
        self.session.persist(&mut *self.store).map_err(js_error)
    }

    /// Start over with a single blank scene.
    pub fn clear(&mut self) {
        self.session.clear();
    }

    /// Play the current draft in a reader.
    pub fn playtest(&self, title: &str) -> Result<ReaderDemo, JsError> {
        let story = self.session.to_story(title);
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let session =
            ReaderSession::start(story, store, EngineConfig::default()).map_err(js_error)?;
        Ok(ReaderDemo { session })
    }
}

impl Default for MakerDemo {
    fn default() -> Self {
        Self::new()
    }
}

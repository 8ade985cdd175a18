//! Story library — the content store reader sessions are opened from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::{ConfigError, EngineConfig};
use crate::core::progress::KeyValueStore;
use crate::core::reader::{ReaderError, ReaderSession};
use crate::schema::story::{Story, StoryError};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("story error in {path}: {source}")]
    Story {
        path: PathBuf,
        #[source]
        source: StoryError,
    },
    #[error("invalid story: {0}")]
    InvalidStory(#[from] StoryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("story not found: {0}")]
    StoryNotFound(String),
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),
}

/// All loaded stories, keyed by title, plus the config sessions start with.
/// Built via `StoryLibrary::builder()`.
#[derive(Debug, Clone, Default)]
pub struct StoryLibrary {
    stories: BTreeMap<String, Story>,
    config: EngineConfig,
}

/// Builder for constructing a `StoryLibrary`.
#[derive(Debug, Default)]
pub struct StoryLibraryBuilder {
    stories_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    /// Directly provided stories (for testing without files).
    stories: Vec<Story>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
}

impl StoryLibrary {
    pub fn builder() -> StoryLibraryBuilder {
        StoryLibraryBuilder::default()
    }

    pub fn get(&self, title: &str) -> Option<&Story> {
        self.stories.get(title)
    }

    /// Story titles in sorted order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.stories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a reader session for `title`, resuming from `store`.
    pub fn open_reader<S: KeyValueStore>(
        &self,
        title: &str,
        store: S,
    ) -> Result<ReaderSession<S>, LibraryError> {
        let story = self
            .get(title)
            .ok_or_else(|| LibraryError::StoryNotFound(title.to_string()))?;
        Ok(ReaderSession::start(
            story.clone(),
            store,
            self.config.clone(),
        )?)
    }
}

impl StoryLibraryBuilder {
    /// Load every `.ron` file in `path` as a story.
    pub fn stories_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.stories_dir = Some(path.into());
        self
    }

    /// Load the engine config from a RON file.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Provide stories directly (for testing without files).
    pub fn with_stories(mut self, stories: Vec<Story>) -> Self {
        self.stories.extend(stories);
        self
    }

    /// Provide config directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load and validate everything. Stories from the directory are added
    /// after directly provided ones, so a file overrides a provided story
    /// with the same title.
    pub fn build(self) -> Result<StoryLibrary, LibraryError> {
        let mut config = self.config.unwrap_or_default();
        if let Some(ref path) = self.config_path {
            config = EngineConfig::load_from_ron(path)?;
            tracing::info!(path = %path.display(), "engine config loaded");
        }

        let mut stories = BTreeMap::new();
        for story in self.stories {
            story.validate()?;
            stories.insert(story.title.clone(), story);
        }

        if let Some(ref dir) = self.stories_dir {
            load_ron_files_from_dir(dir, |path| {
                let story = Story::load_from_ron(path).map_err(|source| LibraryError::Story {
                    path: path.to_path_buf(),
                    source,
                })?;
                tracing::info!(
                    title = %story.title,
                    scenes = story.len(),
                    path = %path.display(),
                    "story loaded"
                );
                if stories.contains_key(&story.title) {
                    tracing::warn!(title = %story.title, "story defined twice, keeping the later one");
                }
                stories.insert(story.title.clone(), story);
                Ok(())
            })?;
        }

        Ok(StoryLibrary { stories, config })
    }
}

/// Load all .ron files from a directory in file-name order, calling `loader`
/// for each.
fn load_ron_files_from_dir<F>(dir: &Path, mut loader: F) -> Result<(), LibraryError>
where
    F: FnMut(&Path) -> Result<(), LibraryError>,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        }
    }
    paths.sort();
    for path in &paths {
        loader(path)?;
    }
    Ok(())
}

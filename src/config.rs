use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub display_name: String,
    pub shuffle_questions: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            display_name: "Player".to_string(),
            shuffle_questions: false,
            log_level: "info".to_string(),
        }
    }
}

/// Per-run overrides coming from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub shuffle_questions: bool,
}

impl Config {
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(id) = &overrides.user_id {
            self.user_id = id.clone();
        }
        if let Some(name) = &overrides.display_name {
            self.display_name = name.clone();
        }
        if overrides.shuffle_questions {
            self.shuffle_questions = true;
        }
        self
    }
}

pub trait ConfigStore {
    /// `Ok(None)` when nothing is stored yet, `InvalidData` when the stored
    /// config cannot be parsed.
    fn load(&self) -> std::io::Result<Option<Config>>;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "quizr") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("quizr_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> std::io::Result<Option<Config>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        serde_json::from_slice::<Config>(&bytes)
            .map(Some)
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

//! User settings read and written by popup actions.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{app_config_path, config_env_dirs, ConfigPathError, APP_DIR};
use crate::runtime::UiThread;
use crate::scope::ScopeId;
use crate::translator::Lang;

const SETTINGS_FILE: &str = "settings.json";

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read settings: {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write settings: {path}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse settings")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub primary_language: Lang,
    pub last_source_lang: Lang,
    pub last_target_lang: Lang,
    /// Promoted translations open in the pinned dialog instead of a fresh popup.
    pub prefer_pinned_dialog: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            primary_language: Lang::English,
            last_source_lang: Lang::Auto,
            last_target_lang: Lang::Auto,
            prefer_pinned_dialog: false,
        }
    }
}

impl Settings {
    /// Picks the target language for `text`.
    ///
    /// Text already in the primary language goes to English, or away from
    /// English when English is primary; anything else goes to the primary language.
    pub fn target_lang_for(&self, text: &str) -> Lang {
        let primary = match self.primary_language {
            Lang::Auto => Lang::English,
            lang => lang,
        };
        if Lang::guess(text) != Some(primary) {
            return primary;
        }
        if primary != Lang::English {
            return Lang::English;
        }
        match self.last_target_lang {
            Lang::Auto | Lang::English => Lang::ChineseSimplified,
            lang => lang,
        }
    }
}

pub trait SettingsStore {
    fn load(&self) -> SettingsResult<Settings>;
    fn save(&self, settings: &Settings) -> SettingsResult<()>;
}

/// `settings.json` next to `config.json`.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn with_default_path() -> SettingsResult<Self> {
        let (xdg_config_home, home) = config_env_dirs();
        Self::with_dirs(xdg_config_home.as_deref(), home.as_deref())
    }

    fn with_dirs(xdg_config_home: Option<&Path>, home: Option<&Path>) -> SettingsResult<Self> {
        app_config_path(APP_DIR, SETTINGS_FILE, xdg_config_home, home)
            .map(Self::at)
            .map_err(|error| match error {
                ConfigPathError::MissingHomeDirectory => SettingsError::MissingHomeDirectory,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> SettingsResult<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| SettingsError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, settings: &Settings) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let serialized = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, serialized).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    saved: RefCell<Option<Settings>>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> SettingsResult<Settings> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> SettingsResult<()> {
        *self.saved.borrow_mut() = Some(settings.clone());
        Ok(())
    }
}

struct SettingsInner {
    thread: UiThread,
    current: RefCell<Settings>,
    store: Box<dyn SettingsStore>,
}

/// Settings shared by every popup; each update is persisted immediately.
///
/// Updates are confined to the thread that loaded the settings.
#[derive(Clone)]
pub struct SharedSettings {
    inner: Rc<SettingsInner>,
}

impl SharedSettings {
    pub fn load(store: impl SettingsStore + 'static) -> Self {
        Self::load_on(store, UiThread::current())
    }

    pub(crate) fn load_on(store: impl SettingsStore + 'static, thread: UiThread) -> Self {
        let current = store.load().unwrap_or_else(|err| {
            tracing::warn!(?err, "failed to load settings; using defaults");
            Settings::default()
        });
        Self {
            inner: Rc::new(SettingsInner {
                thread,
                current: RefCell::new(current),
                store: Box::new(store),
            }),
        }
    }

    pub fn in_memory(settings: Settings) -> Self {
        let store = MemorySettingsStore::default();
        *store.saved.borrow_mut() = Some(settings);
        Self::load(store)
    }

    pub fn snapshot(&self) -> Settings {
        self.inner.current.borrow().clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut Settings)) {
        self.inner.thread.assert_confined("SharedSettings::update");
        let snapshot = {
            let mut current = self.inner.current.borrow_mut();
            apply(&mut current);
            current.clone()
        };
        if let Err(err) = self.inner.store.save(&snapshot) {
            tracing::warn!(?err, "failed to persist settings");
        }
    }

    pub fn target_lang_for(&self, text: &str) -> Lang {
        self.inner.current.borrow().target_lang_for(text)
    }

    pub fn update_last_languages(&self, source: Lang, target: Lang) {
        self.update(|settings| {
            settings.last_source_lang = source;
            settings.last_target_lang = target;
        });
    }

    pub fn set_prefer_pinned_dialog(&self, prefer: bool) {
        self.update(|settings| settings.prefer_pinned_dialog = prefer);
    }
}

impl fmt::Debug for SharedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSettings")
            .field(&*self.inner.current.borrow())
            .finish()
    }
}

/// Opens the host's settings page.
pub trait SettingsPrompt {
    fn open_settings(&self, scope: &ScopeId);
}

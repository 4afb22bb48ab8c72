//! Saved words shown by the word-of-the-day dialog, plus their JSON exchange format.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{app_config_path, config_env_dirs, ConfigPathError, APP_DIR};
use crate::translator::Lang;

const WORDBOOK_FILE: &str = "wordbook.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBookItem {
    #[serde(default)]
    pub id: Option<u64>,
    pub word: String,
    pub source_language: Lang,
    pub target_language: Lang,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl WordBookItem {
    pub fn new(word: impl Into<String>, source_language: Lang, target_language: Lang) -> Self {
        Self {
            id: None,
            word: word.into(),
            source_language,
            target_language,
            phonetic: None,
            explanation: None,
            tags: Vec::new(),
            created_at: 0,
        }
    }
}

pub type WordBookResult<T> = std::result::Result<T, WordBookError>;

#[derive(Debug, Error)]
pub enum WordBookError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read word book: {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write word book: {path}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to write word book export")]
    Io(#[from] io::Error),
    #[error("failed to encode word book")]
    Json(#[from] serde_json::Error),
}

pub trait WordBookExporter {
    fn name(&self) -> &'static str;

    fn extension(&self) -> &'static str;

    fn available_for_import(&self) -> bool;

    fn export(&self, words: &[WordBookItem], output: &mut dyn Write) -> WordBookResult<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonWordBookExporter;

impl WordBookExporter for JsonWordBookExporter {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn available_for_import(&self) -> bool {
        true
    }

    fn export(&self, words: &[WordBookItem], output: &mut dyn Write) -> WordBookResult<()> {
        serde_json::to_writer_pretty(&mut *output, words)?;
        output.flush()?;
        Ok(())
    }
}

/// Reads words previously written by [`JsonWordBookExporter`].
pub fn import_json(input: impl Read) -> WordBookResult<Vec<WordBookItem>> {
    Ok(serde_json::from_reader(input)?)
}

/// `wordbook.json` next to `settings.json`, written with [`JsonWordBookExporter`].
#[derive(Debug, Clone)]
pub struct WordBookFile {
    path: PathBuf,
}

impl WordBookFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn with_default_path() -> WordBookResult<Self> {
        let (xdg_config_home, home) = config_env_dirs();
        app_config_path(
            APP_DIR,
            WORDBOOK_FILE,
            xdg_config_home.as_deref(),
            home.as_deref(),
        )
        .map(Self::at)
        .map_err(|error| match error {
            ConfigPathError::MissingHomeDirectory => WordBookError::MissingHomeDirectory,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty word book.
    pub fn load(&self) -> WordBookResult<Vec<WordBookItem>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(WordBookError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        import_json(BufReader::new(file))
    }

    pub fn save(&self, words: &[WordBookItem]) -> WordBookResult<()> {
        let write_error = |source| WordBookError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let file = File::create(&self.path).map_err(write_error)?;
        JsonWordBookExporter.export(words, &mut BufWriter::new(file))
    }
}

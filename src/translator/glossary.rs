use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Lang, TranslateBackend, TranslateError, TranslateRequest, TranslateResult, Translation};

#[derive(Debug, Error)]
pub enum GlossaryError {
    #[error("failed to read glossary: {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse glossary")]
    Parse(#[from] serde_json::Error),
}

/// Offline backend translating whole phrases from a JSON object of `source: target` pairs.
#[derive(Debug, Clone, Default)]
pub struct GlossaryBackend {
    target_lang: Lang,
    entries: HashMap<String, String>,
}

impl GlossaryBackend {
    pub fn from_json(target_lang: Lang, serialized: &str) -> Result<Self, GlossaryError> {
        let raw: HashMap<String, String> = serde_json::from_str(serialized)?;
        let entries = raw
            .into_iter()
            .map(|(source, target)| (normalize(&source), target))
            .collect();
        Ok(Self {
            target_lang,
            entries,
        })
    }

    pub fn load(target_lang: Lang, path: &Path) -> Result<Self, GlossaryError> {
        let contents = fs::read_to_string(path).map_err(|source| GlossaryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(target_lang, &contents)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl TranslateBackend for GlossaryBackend {
    fn is_configured(&self) -> bool {
        !self.entries.is_empty()
    }

    fn translate_blocking(&self, request: &TranslateRequest) -> TranslateResult<Translation> {
        if self.entries.is_empty() {
            return Err(TranslateError::NotConfigured);
        }
        if request.target_lang != self.target_lang {
            return Err(TranslateError::UnsupportedLanguage {
                source_lang: request.source_lang,
                target_lang: request.target_lang,
            });
        }
        let translation = self
            .entries
            .get(&normalize(&request.text))
            .ok_or_else(|| TranslateError::NotFound {
                text: request.text.clone(),
            })?;

        let source_lang = match request.source_lang {
            Lang::Auto => Lang::guess(&request.text).unwrap_or(Lang::Auto),
            lang => lang,
        };
        Ok(Translation {
            original: request.text.clone(),
            translation: translation.clone(),
            source_lang,
            target_lang: self.target_lang,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glossary() -> GlossaryBackend {
        GlossaryBackend::from_json(Lang::English, r#"{ "Hola": "hello", "gato": "cat" }"#)
            .expect("glossary parses")
    }

    #[test]
    fn lookup_ignores_case_and_surrounding_space() {
        let translation = glossary()
            .translate_blocking(&TranslateRequest::new("  hola ", Lang::Auto, Lang::English))
            .expect("hola is known");

        assert_eq!(translation.translation, "hello");
        assert_eq!(translation.target_lang, Lang::English);
    }

    #[test]
    fn unknown_phrase_and_wrong_target_are_errors() {
        let backend = glossary();
        assert!(matches!(
            backend.translate_blocking(&TranslateRequest::new("perro", Lang::Auto, Lang::English)),
            Err(TranslateError::NotFound { .. })
        ));
        assert!(matches!(
            backend.translate_blocking(&TranslateRequest::new("gato", Lang::Auto, Lang::French)),
            Err(TranslateError::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn empty_glossary_reports_unconfigured() {
        let backend = GlossaryBackend::from_json(Lang::English, "{}").expect("empty parses");
        assert!(!backend.is_configured());
        assert!(GlossaryBackend::from_json(Lang::English, "{ nope").is_err());
    }
}

//! Boundary to the translation provider.
//!
//! The UI side only sees [`Translator`]; results always come back through a
//! [`Completion`], success and failure alike.

mod glossary;
mod lang;

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::{spawn_worker, Completion, WorkerFailure};

pub use glossary::{GlossaryBackend, GlossaryError};
pub use lang::Lang;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub original: String,
    pub translation: String,
    pub source_lang: Lang,
    pub target_lang: Lang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: Lang,
    pub target_lang: Lang,
}

impl TranslateRequest {
    pub fn new(text: impl Into<String>, source_lang: Lang, target_lang: Lang) -> Self {
        Self {
            text: text.into(),
            source_lang,
            target_lang,
        }
    }
}

pub type TranslateResult<T> = std::result::Result<T, TranslateError>;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translator is not configured")]
    NotConfigured,
    #[error("unsupported language pair {source_lang} -> {target_lang}")]
    UnsupportedLanguage { source_lang: Lang, target_lang: Lang },
    #[error("network request failed: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
    #[error("translation provider returned {code}: {message}")]
    Provider { code: u16, message: String },
    #[error("no translation found for {text:?}")]
    NotFound { text: String },
    #[error("translation worker failed")]
    Worker(#[source] WorkerFailure),
}

pub type TranslationCompletion = Completion<TranslateResult<Translation>>;

pub trait Translator {
    /// Returns `false` when the provider cannot be used yet. Implementations may
    /// surface a configuration prompt as a side effect.
    fn check_configuration(&self) -> bool;

    /// Starts a translation. The result must be delivered through `completion`.
    fn translate(&self, request: TranslateRequest, completion: TranslationCompletion);
}

/// Synchronous provider run off the UI thread by [`BlockingTranslator`].
pub trait TranslateBackend: Send + Sync + 'static {
    fn is_configured(&self) -> bool;

    fn translate_blocking(&self, request: &TranslateRequest) -> TranslateResult<Translation>;
}

pub struct BlockingTranslator<B> {
    backend: Arc<B>,
    on_unconfigured: Option<Box<dyn Fn()>>,
}

impl<B: TranslateBackend> BlockingTranslator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            on_unconfigured: None,
        }
    }

    /// Hook run whenever a configuration check fails.
    pub fn with_configuration_prompt(mut self, prompt: impl Fn() + 'static) -> Self {
        self.on_unconfigured = Some(Box::new(prompt));
        self
    }
}

impl<B: TranslateBackend> Translator for BlockingTranslator<B> {
    fn check_configuration(&self) -> bool {
        if self.backend.is_configured() {
            return true;
        }
        tracing::warn!("translator backend is not configured");
        if let Some(prompt) = &self.on_unconfigured {
            prompt();
        }
        false
    }

    fn translate(&self, request: TranslateRequest, completion: TranslationCompletion) {
        let backend = Arc::clone(&self.backend);
        spawn_worker(
            completion,
            move || backend.translate_blocking(&request),
            |failure| Err(TranslateError::Worker(failure)),
        );
    }
}

/// Full error text including every `source()` in the chain.
pub fn error_report(error: &(dyn StdError + 'static)) -> String {
    let mut report = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        report.push_str("\ncaused by: ");
        report.push_str(&cause.to_string());
        source = cause.source();
    }
    report
}

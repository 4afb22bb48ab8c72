use crate::cache::CacheError;
use crate::clipboard::ClipboardError;
use crate::dispose::DisposeError;
use crate::settings::SettingsError;
use crate::state::StateError;
use crate::translator::{GlossaryError, TranslateError};
use crate::wordbook::WordBookError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Dispose(#[from] DisposeError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Glossary(#[from] GlossaryError),
    #[error(transparent)]
    WordBook(#[from] WordBookError),
    #[error("console i/o failed")]
    Io(#[from] std::io::Error),
}

pub mod app;
pub mod cache;
pub mod clipboard;
pub mod config;
pub mod console;
pub mod dialog;
pub mod dispose;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod popup;
pub mod runtime;
pub mod scope;
pub mod settings;
pub mod state;
pub mod translator;
pub mod wordbook;

#[cfg(test)]
mod test_support;

pub use error::{AppError, AppResult};

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Entrypoint used by the console binary: popups for each line read from stdin.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting transpop");

    let host = console::ConsoleHost::from_env(Rc::new(RefCell::new(io::stdout())))?;
    host.run(io::stdin().lock())?;

    tracing::info!("console input closed");
    Ok(())
}

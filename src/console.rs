//! Line-oriented host that drives popups from standard input.

use std::cell::RefCell;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::app::{Collaborators, TranslationUi};
use crate::clipboard::{ClipboardBackend, WlCopyBackend};
use crate::config::{load_app_config, AppConfig};
use crate::dialog::{DialogFactory, TranslationDialogView, WordOfTheDayView};
use crate::error::AppResult;
use crate::geometry::{Bounds, Point};
use crate::popup::{
    AnchorTracker, CardState, EditingContext, PopupHandle, PopupPosition, PopupSurface,
    PopupSurfaceFactory,
};
use crate::runtime::UiExecutor;
use crate::scope::ScopeId;
use crate::settings::{JsonSettingsStore, SettingsPrompt, SharedSettings};
use crate::translator::{BlockingTranslator, GlossaryBackend, Lang, Translation, Translator};
use crate::wordbook::{WordBookFile, WordBookItem};

/// Path of a JSON glossary replacing the built-in one.
pub const GLOSSARY_ENV: &str = "TRANSPOP_GLOSSARY";

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);
const GLOSSARY_TARGET: Lang = Lang::ChineseSimplified;
const DEFAULT_GLOSSARY: &str = r#"{
    "hello": "你好",
    "thank you": "谢谢",
    "cat": "猫",
    "good morning": "早上好",
    "translation": "翻译"
}"#;

pub type Sink = Rc<RefCell<dyn Write>>;

fn emit(sink: &Sink, line: impl Display) {
    if let Err(err) = writeln!(sink.borrow_mut(), "{line}") {
        tracing::warn!(error = %err, "failed to write console output");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Translate(String),
    Pin,
    Dialog,
    Words,
    CopyError,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        ":pin" => Command::Pin,
        ":dialog" => Command::Dialog,
        ":words" => Command::Words,
        ":copy" => Command::CopyError,
        ":quit" | ":q" => Command::Quit,
        other if other.starts_with(':') => Command::Unknown(other.to_string()),
        text => Command::Translate(text.to_string()),
    }
}

struct ConsoleSurface {
    sink: Sink,
    translation: RefCell<Option<String>>,
    error: RefCell<Option<String>>,
}

impl PopupSurface for ConsoleSurface {
    fn show(&self, anchor: &AnchorTracker, position: PopupPosition) {
        let point = anchor.point();
        tracing::debug!(x = point.x, y = point.y, ?position, "console popup anchored");
    }

    fn hide(&self) {
        emit(&self.sink, "[popup] closed");
    }

    fn show_card(&self, card: CardState) {
        match card {
            CardState::Processing => emit(&self.sink, "[popup] translating..."),
            CardState::Result => {
                if let Some(text) = self.translation.borrow().as_deref() {
                    emit(&self.sink, format_args!("[popup] {text}"));
                }
            }
            CardState::Error => {
                if let Some(message) = self.error.borrow().as_deref() {
                    emit(&self.sink, format_args!("[popup] error: {message}"));
                }
            }
        }
    }

    fn set_translation(&self, translation: &Translation) {
        *self.translation.borrow_mut() = Some(translation.translation.clone());
    }

    fn set_error_message(&self, message: &str) {
        *self.error.borrow_mut() = Some(message.to_string());
    }

    fn set_actions_visible(&self, _visible: bool) {}

    fn content_bounds(&self) -> Option<Bounds> {
        None
    }
}

struct ConsoleSurfaces {
    sink: Sink,
}

impl PopupSurfaceFactory for ConsoleSurfaces {
    fn create_surface(&self, _editor: &dyn EditingContext, max_width: u32) -> Rc<dyn PopupSurface> {
        tracing::trace!(max_width, "creating console popup surface");
        Rc::new(ConsoleSurface {
            sink: Rc::clone(&self.sink),
            translation: RefCell::new(None),
            error: RefCell::new(None),
        })
    }
}

struct ConsoleEditor;

impl EditingContext for ConsoleEditor {
    fn scope(&self) -> ScopeId {
        ScopeId::Application
    }

    fn scroll_to_caret(&self) {}

    fn host_window_width(&self) -> Option<u32> {
        None
    }
}

struct ConsoleDialogView {
    sink: Sink,
}

impl TranslationDialogView for ConsoleDialogView {
    fn show(&self) {
        emit(&self.sink, "[dialog] open");
    }

    fn close(&self) {
        emit(&self.sink, "[dialog] closed");
    }

    fn apply_translation(&self, translation: &Translation) {
        emit(
            &self.sink,
            format_args!(
                "[dialog] {} ({}) -> {} ({})",
                translation.original,
                translation.source_lang,
                translation.translation,
                translation.target_lang
            ),
        );
    }

    fn translate(&self, text: &str, source: Lang, target: Lang) {
        emit(
            &self.sink,
            format_args!("[dialog] translating {text:?} {source} -> {target}"),
        );
    }
}

struct ConsoleWordsView {
    sink: Sink,
}

impl WordOfTheDayView for ConsoleWordsView {
    fn show(&self) {
        emit(&self.sink, "[words] open");
    }

    fn close(&self) {
        emit(&self.sink, "[words] closed");
    }

    fn set_words(&self, words: &[WordBookItem]) {
        emit(&self.sink, format_args!("[words] {} saved", words.len()));
        for word in words {
            let explanation = word.explanation.as_deref().unwrap_or("-");
            emit(&self.sink, format_args!("  {}: {explanation}", word.word));
        }
    }
}

struct ConsoleDialogs {
    sink: Sink,
}

impl DialogFactory for ConsoleDialogs {
    fn translation_dialog(&self, _scope: &ScopeId) -> Box<dyn TranslationDialogView> {
        Box::new(ConsoleDialogView {
            sink: Rc::clone(&self.sink),
        })
    }

    fn word_of_the_day_dialog(
        &self,
        _scope: &ScopeId,
        _words: &[WordBookItem],
    ) -> Box<dyn WordOfTheDayView> {
        Box::new(ConsoleWordsView {
            sink: Rc::clone(&self.sink),
        })
    }
}

struct ConsolePrompt {
    sink: Sink,
}

impl SettingsPrompt for ConsolePrompt {
    fn open_settings(&self, scope: &ScopeId) {
        emit(
            &self.sink,
            format_args!("[settings] edit settings.json to configure {scope}"),
        );
    }
}

/// Glossary translator for the console, from [`GLOSSARY_ENV`] or the built-in table.
pub fn glossary_translator(path: Option<PathBuf>) -> AppResult<BlockingTranslator<GlossaryBackend>> {
    let backend = match path {
        Some(path) => GlossaryBackend::load(GLOSSARY_TARGET, &path)?,
        None => GlossaryBackend::from_json(GLOSSARY_TARGET, DEFAULT_GLOSSARY)?,
    };
    tracing::info!(entries = backend.len(), "glossary loaded");
    Ok(BlockingTranslator::new(backend)
        .with_configuration_prompt(|| tracing::warn!("glossary is empty; set {GLOSSARY_ENV}")))
}

pub struct ConsoleHost {
    ui: TranslationUi,
    sink: Sink,
    editor: Rc<dyn EditingContext>,
    words: RefCell<Vec<WordBookItem>>,
    wordbook: Option<WordBookFile>,
}

impl ConsoleHost {
    pub fn new(
        config: AppConfig,
        settings: SharedSettings,
        translator: Rc<dyn Translator>,
        clipboard: Rc<dyn ClipboardBackend>,
        sink: Sink,
    ) -> Self {
        let ui = TranslationUi::new(
            UiExecutor::new(),
            config,
            Collaborators {
                translator,
                settings,
                clipboard,
                settings_prompt: Rc::new(ConsolePrompt {
                    sink: Rc::clone(&sink),
                }),
                dialogs: Rc::new(ConsoleDialogs {
                    sink: Rc::clone(&sink),
                }),
                surfaces: Rc::new(ConsoleSurfaces {
                    sink: Rc::clone(&sink),
                }),
            },
        );
        Self {
            ui,
            sink,
            editor: Rc::new(ConsoleEditor),
            words: RefCell::new(Vec::new()),
            wordbook: None,
        }
    }

    /// Loads remembered words from `file` and saves new ones back to it.
    pub fn with_wordbook(mut self, file: WordBookFile) -> Self {
        match file.load() {
            Ok(words) => *self.words.borrow_mut() = words,
            Err(err) => {
                tracing::warn!(error = %err, path = ?file.path(), "failed to load word book");
            }
        }
        self.wordbook = Some(file);
        self
    }

    /// Wires the host from `config.json`, `settings.json` and the environment.
    pub fn from_env(sink: Sink) -> AppResult<Self> {
        let config = load_app_config();
        let settings = SharedSettings::load(JsonSettingsStore::with_default_path()?);
        let glossary = std::env::var_os(GLOSSARY_ENV).map(PathBuf::from);
        let translator = glossary_translator(glossary)?;
        let wordbook = WordBookFile::with_default_path()?;
        Ok(Self::new(
            config,
            settings,
            Rc::new(translator),
            Rc::new(WlCopyBackend),
            sink,
        )
        .with_wordbook(wordbook))
    }

    pub fn ui(&self) -> &TranslationUi {
        &self.ui
    }

    /// Processes lines until `:quit`, end of input or a read failure, then
    /// shuts the UI down. Lines that are not UTF-8 are reported and skipped.
    pub fn run(&self, input: impl BufRead) -> AppResult<()> {
        let mut read_error = None;
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(error = %err, "skipping unreadable console line");
                    emit(&self.sink, format_args!("error: {err}"));
                    continue;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "console input failed");
                    emit(&self.sink, format_args!("error: {err}"));
                    read_error = Some(err);
                    break;
                }
            };
            match self.handle_line(&line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "console command failed");
                    emit(&self.sink, format_args!("error: {err}"));
                }
            }
        }
        self.ui.shutdown();
        match read_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Returns `false` once the user asked to quit.
    pub fn handle_line(&self, line: &str) -> AppResult<bool> {
        let scope = ScopeId::Application;
        match parse_command(line) {
            Command::Quit => return Ok(false),
            Command::Empty => {}
            Command::Unknown(command) => {
                emit(&self.sink, format_args!("unknown command {command}"));
            }
            Command::Pin => {
                if self.ui.pin_current(&scope).is_none() {
                    emit(&self.sink, "nothing to pin");
                }
            }
            Command::Dialog => {
                self.ui.show_dialog(&scope)?;
            }
            Command::Words => {
                let words = self.words.borrow().clone();
                self.ui.show_word_of_the_day(&scope, &words)?;
            }
            Command::CopyError => {
                let copied = self
                    .ui
                    .current_popup(&scope)
                    .is_some_and(|popup| popup.copy_error());
                if !copied {
                    emit(&self.sink, "no error to copy");
                }
            }
            Command::Translate(text) => {
                let popup = self.ui.show_popup(
                    Rc::clone(&self.editor),
                    &text,
                    AnchorTracker::new(Point::default()),
                    PopupPosition::Below,
                )?;
                self.settle(&popup);
                if let Some(translation) = popup.translation() {
                    self.remember(translation);
                }
            }
        }
        Ok(true)
    }

    fn remember(&self, translation: Translation) {
        let mut word = WordBookItem::new(
            translation.original,
            translation.source_lang,
            translation.target_lang,
        );
        word.explanation = Some(translation.translation);
        word.created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        let mut words = self.words.borrow_mut();
        if words.iter().any(|known| known.word == word.word) {
            return;
        }
        let next_id = words.iter().filter_map(|known| known.id).max().map_or(1, |id| id + 1);
        word.id = Some(next_id);
        words.push(word);
        if let Some(file) = &self.wordbook {
            if let Err(err) = file.save(&words) {
                tracing::warn!(error = %err, path = ?file.path(), "failed to save word book");
            }
        }
    }

    // Pumps the executor until the popup shows a final card or goes away.
    fn settle(&self, popup: &PopupHandle) {
        let executor = self.ui.executor();
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        loop {
            executor.run_pending();
            if popup.is_disposed()
                || matches!(
                    popup.visible_card(),
                    Some(CardState::Result | CardState::Error)
                )
            {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("translation did not settle in time");
                return;
            }
            executor.wait(deadline - now);
        }
    }
}

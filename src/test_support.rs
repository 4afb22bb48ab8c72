//! Recording doubles for every collaborator the popup runtime drives.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::clipboard::{ClipboardBackend, ClipboardError, ClipboardResult};
use crate::config::AppConfig;
use crate::dialog::{DialogFactory, TranslationDialogView, WordOfTheDayView};
use crate::geometry::Bounds;
use crate::input::PointerEventBus;
use crate::popup::{
    AnchorTracker, CardState, EditingContext, PopupController, PopupHandle, PopupPosition,
    PopupServices, PopupSurface, PopupSurfaceFactory,
};
use crate::runtime::{ManualClock, UiExecutor, UiThread};
use crate::scope::{Scope, ScopeId};
use crate::settings::{Settings, SettingsPrompt, SharedSettings};
use crate::translator::{
    Lang, TranslateError, TranslateRequest, Translation, TranslationCompletion, Translator,
};
use crate::wordbook::WordBookItem;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SurfaceCall {
    Show(PopupPosition),
    Hide,
    ShowCard(CardState),
    Translation(String),
    ErrorMessage(String),
    ActionsVisible(bool),
    Revalidate,
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    calls: RefCell<Vec<SurfaceCall>>,
    bounds: Cell<Option<Bounds>>,
    reenter: RefCell<Option<Weak<PopupController>>>,
}

impl RecordingSurface {
    pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn hide_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == SurfaceCall::Hide)
            .count()
    }

    pub(crate) fn action_toggles(&self) -> Vec<bool> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::ActionsVisible(visible) => Some(*visible),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn set_content_bounds(&self, bounds: Option<Bounds>) {
        self.bounds.set(bounds);
    }

    /// Makes `hide` call back into the popup, like a host hide listener does.
    pub(crate) fn reenter_hide_on(&self, popup: &PopupHandle) {
        *self.reenter.borrow_mut() = Some(Rc::downgrade(popup));
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl PopupSurface for RecordingSurface {
    fn show(&self, _anchor: &AnchorTracker, position: PopupPosition) {
        self.record(SurfaceCall::Show(position));
    }

    fn hide(&self) {
        self.record(SurfaceCall::Hide);
        let popup = self.reenter.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(popup) = popup {
            popup.hide();
        }
    }

    fn show_card(&self, card: CardState) {
        self.record(SurfaceCall::ShowCard(card));
    }

    fn set_translation(&self, translation: &Translation) {
        self.record(SurfaceCall::Translation(translation.translation.clone()));
    }

    fn set_error_message(&self, message: &str) {
        self.record(SurfaceCall::ErrorMessage(message.to_string()));
    }

    fn set_actions_visible(&self, visible: bool) {
        self.record(SurfaceCall::ActionsVisible(visible));
    }

    fn content_bounds(&self) -> Option<Bounds> {
        self.bounds.get()
    }

    fn revalidate(&self) {
        self.record(SurfaceCall::Revalidate);
    }
}

/// Hands out one shared [`RecordingSurface`] and remembers the widths asked for.
#[derive(Default)]
pub(crate) struct RecordingSurfaces {
    pub(crate) surface: Rc<RecordingSurface>,
    widths: RefCell<Vec<u32>>,
}

impl RecordingSurfaces {
    pub(crate) fn widths(&self) -> Vec<u32> {
        self.widths.borrow().clone()
    }
}

impl PopupSurfaceFactory for RecordingSurfaces {
    fn create_surface(&self, _editor: &dyn EditingContext, max_width: u32) -> Rc<dyn PopupSurface> {
        self.widths.borrow_mut().push(max_width);
        self.surface.clone()
    }
}

pub(crate) struct RecordingEditor {
    scope: ScopeId,
    width: Option<u32>,
    scrolls: Cell<usize>,
}

impl RecordingEditor {
    pub(crate) fn new(scope: ScopeId, width: Option<u32>) -> Self {
        Self {
            scope,
            width,
            scrolls: Cell::new(0),
        }
    }

    pub(crate) fn scrolls(&self) -> usize {
        self.scrolls.get()
    }
}

impl EditingContext for RecordingEditor {
    fn scope(&self) -> ScopeId {
        self.scope.clone()
    }

    fn scroll_to_caret(&self) {
        self.scrolls.set(self.scrolls.get() + 1);
    }

    fn host_window_width(&self) -> Option<u32> {
        self.width
    }
}

/// Translator whose requests stay pending until a test resolves them.
pub(crate) struct ScriptedTranslator {
    configured: Cell<bool>,
    checks: Cell<usize>,
    prompts: Cell<usize>,
    pending: RefCell<Vec<(TranslateRequest, Option<TranslationCompletion>)>>,
}

impl Default for ScriptedTranslator {
    fn default() -> Self {
        Self {
            configured: Cell::new(true),
            checks: Cell::new(0),
            prompts: Cell::new(0),
            pending: RefCell::new(Vec::new()),
        }
    }
}

impl ScriptedTranslator {
    pub(crate) fn set_configured(&self, configured: bool) {
        self.configured.set(configured);
    }

    pub(crate) fn configuration_checks(&self) -> usize {
        self.checks.get()
    }

    pub(crate) fn configuration_prompts(&self) -> usize {
        self.prompts.get()
    }

    pub(crate) fn requests(&self) -> Vec<TranslateRequest> {
        self.pending
            .borrow()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    /// Resolves the oldest request that has not been answered yet.
    pub(crate) fn resolve_next(&self, result: Result<&str, TranslateError>) {
        let index = self
            .pending
            .borrow()
            .iter()
            .position(|(_, completion)| completion.is_some())
            .expect("an unanswered request");
        self.resolve_request(index, result);
    }

    pub(crate) fn resolve_request(&self, index: usize, result: Result<&str, TranslateError>) {
        let (request, completion) = {
            let mut pending = self.pending.borrow_mut();
            let (request, completion) = &mut pending[index];
            (
                request.clone(),
                completion.take().expect("request not answered yet"),
            )
        };
        completion.complete(result.map(|text| Translation {
            original: request.text,
            translation: text.to_string(),
            source_lang: request.source_lang,
            target_lang: request.target_lang,
        }));
    }
}

impl Translator for ScriptedTranslator {
    fn check_configuration(&self) -> bool {
        self.checks.set(self.checks.get() + 1);
        if !self.configured.get() {
            self.prompts.set(self.prompts.get() + 1);
        }
        self.configured.get()
    }

    fn translate(&self, request: TranslateRequest, completion: TranslationCompletion) {
        self.pending.borrow_mut().push((request, Some(completion)));
    }
}

#[derive(Default)]
pub(crate) struct RecordingClipboard {
    copied: RefCell<Vec<String>>,
    fail: Cell<bool>,
}

impl RecordingClipboard {
    pub(crate) fn copied(&self) -> Vec<String> {
        self.copied.borrow().clone()
    }

    pub(crate) fn fail_with_status(&self) {
        self.fail.set(true);
    }
}

impl ClipboardBackend for RecordingClipboard {
    fn copy_text(&self, text: &str) -> ClipboardResult<()> {
        if self.fail.get() {
            return Err(ClipboardError::CommandFailed {
                status: "exit status: 1".to_string(),
            });
        }
        self.copied.borrow_mut().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingPrompt {
    opened: RefCell<Vec<ScopeId>>,
}

impl RecordingPrompt {
    pub(crate) fn opened(&self) -> Vec<ScopeId> {
        self.opened.borrow().clone()
    }
}

impl SettingsPrompt for RecordingPrompt {
    fn open_settings(&self, scope: &ScopeId) {
        self.opened.borrow_mut().push(scope.clone());
    }
}

type Log = Rc<RefCell<Vec<String>>>;

struct RecordingTranslationView {
    log: Log,
}

impl TranslationDialogView for RecordingTranslationView {
    fn show(&self) {
        self.log.borrow_mut().push("show".to_string());
    }

    fn close(&self) {
        self.log.borrow_mut().push("close".to_string());
    }

    fn apply_translation(&self, translation: &Translation) {
        self.log
            .borrow_mut()
            .push(format!("apply:{}", translation.translation));
    }

    fn translate(&self, text: &str, source: Lang, target: Lang) {
        self.log
            .borrow_mut()
            .push(format!("translate:{text}:{source}->{target}"));
    }
}

struct RecordingWordsView {
    log: Log,
}

impl WordOfTheDayView for RecordingWordsView {
    fn show(&self) {
        self.log.borrow_mut().push("show".to_string());
    }

    fn close(&self) {
        self.log.borrow_mut().push("close".to_string());
    }

    fn set_words(&self, words: &[WordBookItem]) {
        self.log.borrow_mut().push(format!("words:{}", words.len()));
    }
}

#[derive(Default)]
pub(crate) struct RecordingDialogs {
    translation_log: Log,
    words_log: Log,
    translation_created: Cell<usize>,
    words_created: Cell<usize>,
}

impl RecordingDialogs {
    pub(crate) fn translation_log(&self) -> Vec<String> {
        self.translation_log.borrow().clone()
    }

    pub(crate) fn words_log(&self) -> Vec<String> {
        self.words_log.borrow().clone()
    }

    pub(crate) fn translation_created(&self) -> usize {
        self.translation_created.get()
    }

    pub(crate) fn words_created(&self) -> usize {
        self.words_created.get()
    }
}

impl DialogFactory for RecordingDialogs {
    fn translation_dialog(&self, _scope: &ScopeId) -> Box<dyn TranslationDialogView> {
        self.translation_created.set(self.translation_created.get() + 1);
        Box::new(RecordingTranslationView {
            log: Rc::clone(&self.translation_log),
        })
    }

    fn word_of_the_day_dialog(
        &self,
        _scope: &ScopeId,
        _words: &[WordBookItem],
    ) -> Box<dyn WordOfTheDayView> {
        self.words_created.set(self.words_created.get() + 1);
        Box::new(RecordingWordsView {
            log: Rc::clone(&self.words_log),
        })
    }
}

/// Fully wired popup collaborators on a manual clock.
pub(crate) struct Harness {
    pub(crate) clock: Rc<ManualClock>,
    pub(crate) executor: UiExecutor,
    pub(crate) translator: Rc<ScriptedTranslator>,
    pub(crate) settings: SharedSettings,
    pub(crate) pointer_bus: PointerEventBus,
    pub(crate) clipboard: Rc<RecordingClipboard>,
    pub(crate) prompt: Rc<RecordingPrompt>,
    pub(crate) dialogs: Rc<RecordingDialogs>,
    pub(crate) editor: Rc<RecordingEditor>,
    pub(crate) surface: Rc<RecordingSurface>,
    pub(crate) scope: Scope,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_scope(Scope::new(ScopeId::session("test"), UiThread::current()))
    }

    pub(crate) fn with_scope(scope: Scope) -> Self {
        let clock = Rc::new(ManualClock::new());
        let executor = UiExecutor::with_clock(clock.clone());
        let pointer_bus = PointerEventBus::new(executor.ui_thread());
        Self {
            clock,
            executor,
            translator: Rc::new(ScriptedTranslator::default()),
            settings: SharedSettings::in_memory(Settings::default()),
            pointer_bus,
            clipboard: Rc::new(RecordingClipboard::default()),
            prompt: Rc::new(RecordingPrompt::default()),
            dialogs: Rc::new(RecordingDialogs::default()),
            editor: Rc::new(RecordingEditor::new(scope.id().clone(), Some(1600))),
            surface: Rc::new(RecordingSurface::default()),
            scope,
        }
    }

    pub(crate) fn settle_delay(&self) -> Duration {
        AppConfig::default().settle_delay()
    }

    pub(crate) fn services(&self) -> PopupServices {
        PopupServices {
            executor: self.executor.clone(),
            translator: self.translator.clone(),
            settings: self.settings.clone(),
            pointer_bus: self.pointer_bus.clone(),
            clipboard: self.clipboard.clone(),
            settings_prompt: self.prompt.clone(),
            dialogs: self.dialogs.clone(),
            settle_delay: self.settle_delay(),
        }
    }

    /// A popup bound to the harness scope, not yet shown.
    pub(crate) fn popup(&self, text: &str) -> PopupHandle {
        PopupController::new(
            text,
            self.editor.clone(),
            self.surface.clone(),
            self.scope.handle(),
            self.services(),
        )
    }
}

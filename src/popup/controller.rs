use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::cache::{Resource, ResourceKind};
use crate::clipboard::ClipboardBackend;
use crate::dialog::{self, DialogFactory, TranslationDialog};
use crate::dispose::Disposable;
use crate::geometry::Point;
use crate::input::{PointerEvent, PointerEventBus, PointerSubscription};
use crate::runtime::{UiExecutor, UiThread};
use crate::scope::{ScopeHandle, ScopeId};
use crate::settings::{SettingsPrompt, SharedSettings};
use crate::state::{PopupEvent, PopupState, StateMachine};
use crate::translator::{
    error_report, Lang, TranslateError, TranslateRequest, TranslateResult, Translation,
    Translator,
};

use super::card::{CardState, RequestToken, TokenSource};
use super::hover::HoverTracker;
use super::indicator::ProcessIndicator;
use super::surface::{AnchorTracker, EditingContext, PopupPosition, PopupSurface};

pub type PopupHandle = Rc<PopupController>;

/// Links rendered inside the error card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLink {
    Settings,
    TranslatorConfiguration,
}

/// Collaborators shared by every popup of one UI instance.
#[derive(Clone)]
pub struct PopupServices {
    pub executor: UiExecutor,
    pub translator: Rc<dyn Translator>,
    pub settings: SharedSettings,
    pub pointer_bus: PointerEventBus,
    pub clipboard: Rc<dyn ClipboardBackend>,
    pub settings_prompt: Rc<dyn SettingsPrompt>,
    pub dialogs: Rc<dyn DialogFactory>,
    /// Delay before a result or error card becomes visible.
    pub settle_delay: Duration,
}

/// One anchored overlay: its translate requests, card rendering and teardown.
///
/// All methods must be called on the UI thread. Every mutating entry point
/// is a no-op once the popup is disposed.
pub struct PopupController {
    text: String,
    scope: ScopeHandle,
    editor: Rc<dyn EditingContext>,
    surface: Rc<dyn PopupSurface>,
    services: PopupServices,
    thread: UiThread,
    disposable: Disposable,
    indicator: ProcessIndicator,
    anchor: RefCell<Option<AnchorTracker>>,
    lifecycle: RefCell<StateMachine>,
    card: Cell<CardState>,
    rendered_card: Cell<Option<CardState>>,
    tokens: TokenSource,
    translation: RefCell<Option<Translation>>,
    last_error: RefCell<Option<Rc<TranslateError>>>,
    hover: HoverTracker,
    subscription: RefCell<Option<PointerSubscription>>,
    weak_self: Weak<PopupController>,
}

impl PopupController {
    pub fn new(
        text: impl Into<String>,
        editor: Rc<dyn EditingContext>,
        surface: Rc<dyn PopupSurface>,
        scope: ScopeHandle,
        services: PopupServices,
    ) -> PopupHandle {
        let thread = services.executor.ui_thread();
        Rc::new_cyclic(|weak_self: &Weak<PopupController>| {
            let disposable = Disposable::new(format!("popup:{}", scope.id()));
            let indicator = ProcessIndicator::new();
            if let Err(err) = disposable.register_child(indicator.disposable()) {
                tracing::warn!(error = %err, "process indicator not bound to popup");
            }

            let teardown = weak_self.clone();
            disposable.on_dispose(move || {
                if let Some(popup) = teardown.upgrade() {
                    popup.teardown();
                }
            });

            Self {
                text: text.into(),
                scope,
                editor,
                surface,
                services,
                thread,
                disposable,
                indicator,
                anchor: RefCell::new(None),
                lifecycle: RefCell::new(StateMachine::new()),
                card: Cell::new(CardState::Processing),
                rendered_card: Cell::new(None),
                tokens: TokenSource::default(),
                translation: RefCell::new(None),
                last_error: RefCell::new(None),
                hover: HoverTracker::default(),
                subscription: RefCell::new(None),
                weak_self: weak_self.clone(),
            }
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scope(&self) -> &ScopeId {
        self.scope.id()
    }

    pub fn state(&self) -> PopupState {
        self.lifecycle.borrow().state()
    }

    pub fn is_showing(&self) -> bool {
        self.state() == PopupState::Showing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }

    /// Card the controller currently considers active.
    pub fn card(&self) -> CardState {
        self.card.get()
    }

    /// Card last pushed to the surface, after the settle delay.
    pub fn visible_card(&self) -> Option<CardState> {
        self.rendered_card.get()
    }

    pub fn translation(&self) -> Option<Translation> {
        self.translation.borrow().clone()
    }

    pub fn last_error(&self) -> Option<Rc<TranslateError>> {
        self.last_error.borrow().clone()
    }

    pub fn latest_token(&self) -> Option<RequestToken> {
        self.tokens.latest()
    }

    /// Whether the pin and copy-error actions are currently revealed.
    pub fn actions_visible(&self) -> bool {
        self.hover.is_inside()
    }

    pub fn anchor_point(&self) -> Option<Point> {
        self.anchor.borrow().as_ref().map(AnchorTracker::point)
    }

    pub fn indicator(&self) -> &ProcessIndicator {
        &self.indicator
    }

    /// Puts the popup on screen and starts the first translation.
    ///
    /// Calling it again while showing does nothing.
    pub fn show(&self, anchor: AnchorTracker, position: PopupPosition) {
        self.thread.assert_confined("PopupController::show");
        if self.is_disposed() {
            tracing::debug!(scope = %self.scope.id(), "show ignored on disposed popup");
            return;
        }
        if !self.services.translator.check_configuration() {
            tracing::info!(scope = %self.scope.id(), "translator not configured; hiding popup");
            self.hide();
            return;
        }
        if self.is_showing() {
            return;
        }
        if !self.bind_to_scope() {
            self.hide();
            return;
        }
        if let Err(err) = self.lifecycle.borrow_mut().transition(PopupEvent::Show) {
            tracing::debug!(error = %err, "popup cannot be shown");
            return;
        }

        self.editor.scroll_to_caret();
        if let Err(err) = self.disposable.register_child(anchor.disposable()) {
            tracing::warn!(error = %err, "anchor tracker not bound to popup");
        }
        self.surface.show(&anchor, position);
        *self.anchor.borrow_mut() = Some(anchor);
        self.subscribe_pointer();
        tracing::info!(scope = %self.scope.id(), chars = self.text.chars().count(), "popup shown");

        let target = self.services.settings.target_lang_for(&self.text);
        self.translate(Lang::Auto, target);
    }

    fn bind_to_scope(&self) -> bool {
        if self.disposable.has_parent() {
            return true;
        }
        let Some(root) = self.scope.root() else {
            tracing::debug!(scope = %self.scope.id(), "scope closed before popup was shown");
            return false;
        };
        match root.register_child(&self.disposable) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "popup not bound to its scope");
                !self.is_disposed()
            }
        }
    }

    fn subscribe_pointer(&self) {
        let popup = self.weak_self.clone();
        let subscription = self.services.pointer_bus.subscribe(move |event| {
            if let Some(popup) = popup.upgrade() {
                popup.on_pointer_event(event);
            }
        });
        *self.subscription.borrow_mut() = Some(subscription);
    }

    /// Switches to the processing card and issues a fresh request.
    ///
    /// Earlier in-flight requests are left to finish; their results are dropped.
    pub fn translate(&self, source: Lang, target: Lang) -> Option<RequestToken> {
        self.thread.assert_confined("PopupController::translate");
        if self.is_disposed() {
            return None;
        }

        let token = self.tokens.mint();
        self.translation.borrow_mut().take();
        self.last_error.borrow_mut().take();
        self.card.set(CardState::Processing);
        self.indicator.resume();
        self.schedule_card(CardState::Processing, Duration::ZERO);

        let popup = self.weak_self.clone();
        let completion = self.services.executor.completion(
            move |result: TranslateResult<Translation>| match popup.upgrade() {
                Some(popup) => popup.on_translate_complete(token, result),
                None => tracing::debug!(%token, "popup released before translation arrived"),
            },
        );
        tracing::debug!(%token, %source, %target, "translation requested");
        self.services.translator.translate(
            TranslateRequest::new(self.text.clone(), source, target),
            completion,
        );
        Some(token)
    }

    fn on_translate_complete(&self, token: RequestToken, result: TranslateResult<Translation>) {
        self.thread
            .assert_confined("PopupController::on_translate_complete");
        if self.is_disposed() {
            tracing::debug!(%token, "dropping translation for disposed popup");
            return;
        }
        if !self.tokens.is_latest(token) {
            tracing::debug!(%token, latest = ?self.tokens.latest(), "dropping stale translation");
            return;
        }

        self.indicator.suspend();
        match result {
            Ok(translation) => {
                self.surface.set_translation(&translation);
                *self.translation.borrow_mut() = Some(translation);
                self.card.set(CardState::Result);
                self.schedule_card(CardState::Result, self.services.settle_delay);
            }
            Err(err) => {
                tracing::warn!(%token, error = %err, "translation failed");
                self.surface.set_error_message(&err.to_string());
                *self.last_error.borrow_mut() = Some(Rc::new(err));
                self.card.set(CardState::Error);
                self.schedule_card(CardState::Error, self.services.settle_delay);
            }
        }
    }

    fn schedule_card(&self, card: CardState, delay: Duration) {
        let popup = self.weak_self.clone();
        self.services.executor.schedule_after(delay, move || {
            if let Some(popup) = popup.upgrade() {
                popup.render_card(card);
            }
        });
    }

    // Skipped when a newer card has been selected since scheduling.
    fn render_card(&self, card: CardState) {
        if self.is_disposed() || self.card.get() != card {
            return;
        }
        self.surface.show_card(card);
        self.surface.revalidate();
        self.rendered_card.set(Some(card));
    }

    /// Promotes the held result into the translation dialog of the same scope.
    pub fn pin(&self) -> Option<Rc<TranslationDialog>> {
        self.thread.assert_confined("PopupController::pin");
        if self.is_disposed() || self.card.get() != CardState::Result {
            return None;
        }
        let translation = self.translation.borrow().clone()?;

        self.hide();
        self.services.settings.set_prefer_pinned_dialog(true);
        let dialog = self.translation_dialog()?;
        dialog.apply_translation(&translation);
        tracing::info!(scope = %self.scope.id(), "translation pinned");
        Some(dialog)
    }

    /// Persists the pair as last used and translates again.
    pub fn change_languages(&self, source: Lang, target: Lang) -> Option<RequestToken> {
        self.thread
            .assert_confined("PopupController::change_languages");
        if self.is_disposed() {
            return None;
        }
        self.services.settings.update_last_languages(source, target);
        self.translate(source, target)
    }

    /// Hands `text` to the translation dialog on the next UI tick.
    pub fn open_in_dialog(&self, text: impl Into<String>, source: Lang, target: Lang) {
        self.thread.assert_confined("PopupController::open_in_dialog");
        if self.is_disposed() {
            return;
        }
        let Some(popup) = self.weak_self.upgrade() else {
            return;
        };
        let text = text.into();
        // Holds the popup until the tick, even if it is hidden and released first.
        self.services.executor.post(move || {
            popup.show_on_translation_dialog(&text, source, target);
        });
    }

    pub fn apply_spell_fix(&self, spell: &str) {
        let target = self.services.settings.target_lang_for(spell);
        self.open_in_dialog(spell, Lang::Auto, target);
    }

    fn show_on_translation_dialog(&self, text: &str, source: Lang, target: Lang) {
        self.hide();
        self.services.settings.set_prefer_pinned_dialog(true);
        if let Some(dialog) = self.translation_dialog() {
            dialog.translate(text, source, target);
        }
    }

    fn translation_dialog(&self) -> Option<Rc<TranslationDialog>> {
        let Some(cache) = self.scope.cache() else {
            tracing::warn!(scope = %self.scope.id(), "scope closed; translation dialog unavailable");
            return None;
        };
        match dialog::show_translation_dialog(&cache, self.services.dialogs.as_ref()) {
            Ok(dialog) => Some(dialog),
            Err(err) => {
                tracing::warn!(error = %err, "failed to open translation dialog");
                None
            }
        }
    }

    pub fn activate_error_link(&self, link: ErrorLink) {
        self.thread
            .assert_confined("PopupController::activate_error_link");
        self.hide();
        match link {
            ErrorLink::Settings => self.services.settings_prompt.open_settings(self.scope.id()),
            ErrorLink::TranslatorConfiguration => {
                self.services.translator.check_configuration();
            }
        }
    }

    /// Copies the retained error with its causes, then hides the popup.
    pub fn copy_error(&self) -> bool {
        self.thread.assert_confined("PopupController::copy_error");
        let Some(error) = self.last_error() else {
            return false;
        };
        let report = error_report(&*error);
        if let Err(err) = self.services.clipboard.copy_text(&report) {
            tracing::warn!(error = %err, "failed to copy translation error");
        }
        self.hide();
        true
    }

    pub fn on_translator_changed(&self) {
        self.hide();
    }

    pub fn on_pointer_event(&self, event: &PointerEvent) {
        self.thread.assert_confined("PopupController::on_pointer_event");
        if self.is_disposed() {
            return;
        }
        if let Some(inside) = self.hover.observe(event, self.surface.content_bounds()) {
            self.surface.set_actions_visible(inside);
        }
    }

    /// Idempotent; the first call tears the popup down.
    pub fn hide(&self) {
        self.thread.assert_confined("PopupController::hide");
        self.disposable.dispose();
    }

    pub fn dispose(&self) {
        self.hide();
    }

    fn teardown(&self) {
        if let Err(err) = self.lifecycle.borrow_mut().transition(PopupEvent::Dispose) {
            tracing::debug!(error = %err, "popup lifecycle already closed");
        }
        let subscription = self.subscription.borrow_mut().take();
        drop(subscription);
        self.indicator.suspend();
        self.surface.hide();
        tracing::debug!(scope = %self.scope.id(), "popup disposed");
    }
}

impl Resource for PopupController {
    const KIND: ResourceKind = ResourceKind::Popup;

    fn disposable(&self) -> &Disposable {
        &self.disposable
    }
}

impl fmt::Debug for PopupController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupController")
            .field("scope", self.scope.id())
            .field("state", &self.state())
            .field("card", &self.card.get())
            .field("latest_token", &self.tokens.latest())
            .finish()
    }
}

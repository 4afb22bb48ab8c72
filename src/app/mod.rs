//! Host-facing entry points: popups and dialogs looked up per editing scope.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clipboard::ClipboardBackend;
use crate::config::AppConfig;
use crate::dialog::{self, DialogFactory, TranslationDialog, WordOfTheDayDialog};
use crate::error::AppResult;
use crate::input::PointerEventBus;
use crate::popup::{
    AnchorTracker, EditingContext, PopupController, PopupHandle, PopupPosition, PopupServices,
    PopupSurfaceFactory,
};
use crate::runtime::UiExecutor;
use crate::scope::{Scope, ScopeId, ScopeRegistry};
use crate::settings::{SettingsPrompt, SharedSettings};
use crate::translator::Translator;
use crate::wordbook::WordBookItem;


/// External services the UI drives.
pub struct Collaborators {
    pub translator: Rc<dyn Translator>,
    pub settings: SharedSettings,
    pub clipboard: Rc<dyn ClipboardBackend>,
    pub settings_prompt: Rc<dyn SettingsPrompt>,
    pub dialogs: Rc<dyn DialogFactory>,
    pub surfaces: Rc<dyn PopupSurfaceFactory>,
}

/// Owns every scope and the single popup/dialog slots inside them.
pub struct TranslationUi {
    config: AppConfig,
    scopes: RefCell<ScopeRegistry>,
    services: PopupServices,
    surfaces: Rc<dyn PopupSurfaceFactory>,
}

impl TranslationUi {
    pub fn new(executor: UiExecutor, config: AppConfig, collaborators: Collaborators) -> Self {
        let thread = executor.ui_thread();
        let services = PopupServices {
            pointer_bus: PointerEventBus::new(thread),
            translator: collaborators.translator,
            settings: collaborators.settings,
            clipboard: collaborators.clipboard,
            settings_prompt: collaborators.settings_prompt,
            dialogs: collaborators.dialogs,
            settle_delay: config.settle_delay(),
            executor,
        };
        Self {
            config,
            scopes: RefCell::new(ScopeRegistry::new(thread)),
            services,
            surfaces: collaborators.surfaces,
        }
    }

    pub fn executor(&self) -> &UiExecutor {
        &self.services.executor
    }

    pub fn pointer_bus(&self) -> &PointerEventBus {
        &self.services.pointer_bus
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.services.settings
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn assert_confined(&self, operation: &str) {
        self.services.executor.ui_thread().assert_confined(operation);
    }

    fn scope(&self, id: &ScopeId) -> Scope {
        self.scopes.borrow_mut().get_or_create(id)
    }

    fn live_scope(&self, id: &ScopeId) -> Option<Scope> {
        self.scopes.borrow().get(id)
    }

    /// Replaces any popup of the editor's scope with a new one and shows it.
    pub fn show_popup(
        &self,
        editor: Rc<dyn EditingContext>,
        text: &str,
        anchor: AnchorTracker,
        position: PopupPosition,
    ) -> AppResult<PopupHandle> {
        self.assert_confined("TranslationUi::show_popup");
        let scope = self.scope(&editor.scope());
        let popup = scope.cache().replace(|| {
            let max_width = self.config.popup_max_width(editor.host_window_width());
            let surface = self.surfaces.create_surface(editor.as_ref(), max_width);
            PopupController::new(
                text,
                Rc::clone(&editor),
                surface,
                scope.handle(),
                self.services.clone(),
            )
        })?;
        popup.show(anchor, position);
        Ok(popup)
    }

    pub fn current_popup(&self, scope: &ScopeId) -> Option<PopupHandle> {
        self.live_scope(scope)?.cache().peek::<PopupController>()
    }

    pub fn current_dialog(&self, scope: &ScopeId) -> Option<Rc<TranslationDialog>> {
        self.live_scope(scope)?.cache().peek::<TranslationDialog>()
    }

    pub fn show_dialog(&self, scope: &ScopeId) -> AppResult<Rc<TranslationDialog>> {
        self.assert_confined("TranslationUi::show_dialog");
        let scope = self.scope(scope);
        Ok(dialog::show_translation_dialog(
            scope.cache(),
            self.services.dialogs.as_ref(),
        )?)
    }

    /// Shows the word-of-the-day dialog, refreshing its words on every call.
    pub fn show_word_of_the_day(
        &self,
        scope: &ScopeId,
        words: &[WordBookItem],
    ) -> AppResult<Rc<WordOfTheDayDialog>> {
        self.assert_confined("TranslationUi::show_word_of_the_day");
        let scope = self.scope(scope);
        Ok(dialog::show_word_of_the_day(
            scope.cache(),
            self.services.dialogs.as_ref(),
            words,
        )?)
    }

    /// Enablement check for the host's pin action.
    pub fn can_pin(&self, scope: &ScopeId) -> bool {
        self.current_popup(scope)
            .is_some_and(|popup| popup.is_showing())
    }

    pub fn pin_current(&self, scope: &ScopeId) -> Option<Rc<TranslationDialog>> {
        self.current_popup(scope)?.pin()
    }

    /// A different translation engine was selected; every open popup goes away.
    pub fn translator_changed(&self) {
        self.assert_confined("TranslationUi::translator_changed");
        let scopes = self.scopes.borrow().live_scopes();
        for scope in scopes {
            if let Some(popup) = scope.cache().peek::<PopupController>() {
                popup.on_translator_changed();
            }
        }
    }

    pub fn live_scopes(&self) -> Vec<ScopeId> {
        self.scopes
            .borrow()
            .live_scopes()
            .iter()
            .map(|scope| scope.id().clone())
            .collect()
    }

    /// Disposes the scope and everything cached in it.
    pub fn close_scope(&self, id: &ScopeId) -> bool {
        self.assert_confined("TranslationUi::close_scope");
        let removed = self.scopes.borrow_mut().remove(id);
        removed.is_some_and(|scope| scope.dispose())
    }

    pub fn shutdown(&self) {
        self.assert_confined("TranslationUi::shutdown");
        let scopes = self.scopes.borrow_mut().drain();
        for scope in scopes {
            scope.dispose();
        }
        tracing::info!("translation ui shut down");
    }
}

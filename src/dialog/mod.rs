//! Longer-lived dialogs a popup result can be promoted into.

use std::rc::Rc;

use crate::cache::{CacheResult, Resource, ResourceCache, ResourceKind};
use crate::dispose::Disposable;
use crate::scope::ScopeId;
use crate::translator::{Lang, Translation};
use crate::wordbook::WordBookItem;

pub trait TranslationDialogView {
    fn show(&self);

    /// Invoked once, when the dialog is disposed.
    fn close(&self);

    fn apply_translation(&self, translation: &Translation);

    fn translate(&self, text: &str, source: Lang, target: Lang);
}

pub trait WordOfTheDayView {
    fn show(&self);

    /// Invoked once, when the dialog is disposed.
    fn close(&self);

    fn set_words(&self, words: &[WordBookItem]);
}

pub trait DialogFactory {
    fn translation_dialog(&self, scope: &ScopeId) -> Box<dyn TranslationDialogView>;

    fn word_of_the_day_dialog(
        &self,
        scope: &ScopeId,
        words: &[WordBookItem],
    ) -> Box<dyn WordOfTheDayView>;
}

/// A cached resource that can be (re)displayed.
pub trait ShowableResource: Resource {
    fn show(&self);
}

fn closing_disposable(label: &str, close: impl FnOnce() + 'static) -> Disposable {
    let disposable = Disposable::new(label);
    disposable.on_dispose(close);
    disposable
}

pub struct TranslationDialog {
    view: Rc<dyn TranslationDialogView>,
    disposable: Disposable,
}

impl TranslationDialog {
    pub fn new(view: Box<dyn TranslationDialogView>) -> Rc<Self> {
        let view: Rc<dyn TranslationDialogView> = Rc::from(view);
        let closing = Rc::clone(&view);
        Rc::new(Self {
            view,
            disposable: closing_disposable("translation-dialog", move || closing.close()),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }

    pub fn close(&self) {
        self.disposable.dispose();
    }

    pub fn apply_translation(&self, translation: &Translation) {
        if !self.is_disposed() {
            self.view.apply_translation(translation);
        }
    }

    pub fn translate(&self, text: &str, source: Lang, target: Lang) {
        if !self.is_disposed() {
            self.view.translate(text, source, target);
        }
    }
}

impl Resource for TranslationDialog {
    const KIND: ResourceKind = ResourceKind::TranslationDialog;

    fn disposable(&self) -> &Disposable {
        &self.disposable
    }
}

impl ShowableResource for TranslationDialog {
    fn show(&self) {
        if !self.is_disposed() {
            self.view.show();
        }
    }
}

pub struct WordOfTheDayDialog {
    view: Rc<dyn WordOfTheDayView>,
    disposable: Disposable,
}

impl WordOfTheDayDialog {
    pub fn new(view: Box<dyn WordOfTheDayView>) -> Rc<Self> {
        let view: Rc<dyn WordOfTheDayView> = Rc::from(view);
        let closing = Rc::clone(&view);
        Rc::new(Self {
            view,
            disposable: closing_disposable("word-of-the-day-dialog", move || closing.close()),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }

    pub fn close(&self) {
        self.disposable.dispose();
    }

    pub fn set_words(&self, words: &[WordBookItem]) {
        if !self.is_disposed() {
            self.view.set_words(words);
        }
    }
}

impl Resource for WordOfTheDayDialog {
    const KIND: ResourceKind = ResourceKind::SecondaryDialog;

    fn disposable(&self) -> &Disposable {
        &self.disposable
    }
}

impl ShowableResource for WordOfTheDayDialog {
    fn show(&self) {
        if !self.is_disposed() {
            self.view.show();
        }
    }
}

/// Get-or-create, then run `on_before_show` and show, on every call.
pub fn show_cached<T, B, F>(cache: &ResourceCache, on_before_show: B, factory: F) -> CacheResult<Rc<T>>
where
    T: ShowableResource,
    B: FnOnce(&T),
    F: FnOnce() -> Rc<T>,
{
    let dialog = cache.acquire(factory)?;
    on_before_show(&dialog);
    dialog.show();
    Ok(dialog)
}

pub fn show_translation_dialog(
    cache: &ResourceCache,
    factory: &dyn DialogFactory,
) -> CacheResult<Rc<TranslationDialog>> {
    show_cached(
        cache,
        |_| {},
        || TranslationDialog::new(factory.translation_dialog(cache.scope())),
    )
}

pub fn show_word_of_the_day(
    cache: &ResourceCache,
    factory: &dyn DialogFactory,
    words: &[WordBookItem],
) -> CacheResult<Rc<WordOfTheDayDialog>> {
    show_cached(
        cache,
        |dialog: &WordOfTheDayDialog| dialog.set_words(words),
        || WordOfTheDayDialog::new(factory.word_of_the_day_dialog(cache.scope(), words)),
    )
}

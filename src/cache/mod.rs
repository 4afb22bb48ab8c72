//! Per-scope store holding at most one live instance per resource kind.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::dispose::{DisposeError, Disposable};
use crate::runtime::UiThread;
use crate::scope::ScopeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Popup,
    TranslationDialog,
    SecondaryDialog,
}

/// A cacheable UI resource. Its [`Disposable`] is bound to the scope on insertion.
pub trait Resource: 'static {
    const KIND: ResourceKind;

    fn disposable(&self) -> &Disposable;
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("scope {scope} is already disposed")]
    ScopeDisposed { scope: ScopeId },
    #[error("{kind:?} slot in scope {scope} holds a different resource type")]
    KindMismatch { scope: ScopeId, kind: ResourceKind },
    #[error("failed to bind {kind:?} to scope {scope}: {source}")]
    Bind {
        scope: ScopeId,
        kind: ResourceKind,
        #[source]
        source: DisposeError,
    },
}

struct Slot {
    generation: u64,
    instance: Rc<dyn Any>,
    disposable: Disposable,
}

struct CacheInner {
    scope: ScopeId,
    owner: Disposable,
    thread: UiThread,
    slots: RefCell<HashMap<ResourceKind, Slot>>,
    next_generation: Cell<u64>,
}

impl CacheInner {
    fn clear_slot(&self, kind: ResourceKind, generation: u64) {
        self.thread.assert_confined("ResourceCache::clear_slot");
        let removed = {
            let mut slots = self.slots.borrow_mut();
            match slots.get(&kind) {
                Some(slot) if slot.generation == generation => slots.remove(&kind),
                _ => None,
            }
        };
        if removed.is_some() {
            tracing::debug!(scope = %self.scope, ?kind, "cache slot cleared");
        }
    }
}

#[derive(Clone)]
pub struct ResourceCache {
    inner: Rc<CacheInner>,
}

/// Back-reference that does not keep the cache (or its scope) alive.
#[derive(Clone, Default)]
pub struct WeakResourceCache {
    inner: Weak<CacheInner>,
}

impl ResourceCache {
    pub(crate) fn new(scope: ScopeId, owner: Disposable, thread: UiThread) -> Self {
        Self {
            inner: Rc::new(CacheInner {
                scope,
                owner,
                thread,
                slots: RefCell::new(HashMap::new()),
                next_generation: Cell::new(1),
            }),
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.inner.scope
    }

    pub fn downgrade(&self) -> WeakResourceCache {
        WeakResourceCache {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns the cached instance of `T`, creating it with `factory` if absent.
    ///
    /// `factory` runs at most once per live slot.
    pub fn acquire<T, F>(&self, factory: F) -> CacheResult<Rc<T>>
    where
        T: Resource,
        F: FnOnce() -> Rc<T>,
    {
        self.inner.thread.assert_confined("ResourceCache::acquire");
        if let Some(existing) = self.live::<T>()? {
            return Ok(existing);
        }
        self.insert(factory)
    }

    /// Disposes any live instance of `T` and stores a fresh one.
    pub fn replace<T, F>(&self, factory: F) -> CacheResult<Rc<T>>
    where
        T: Resource,
        F: FnOnce() -> Rc<T>,
    {
        self.inner.thread.assert_confined("ResourceCache::replace");
        let previous = self.inner.slots.borrow_mut().remove(&T::KIND);
        if let Some(previous) = previous {
            tracing::debug!(scope = %self.inner.scope, kind = ?T::KIND, "replacing cached resource");
            previous.disposable.dispose();
        }
        self.insert(factory)
    }

    /// Non-creating lookup.
    pub fn peek<T: Resource>(&self) -> Option<Rc<T>> {
        self.inner.thread.assert_confined("ResourceCache::peek");
        self.live::<T>().ok().flatten()
    }

    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.inner
            .slots
            .borrow()
            .get(&kind)
            .is_some_and(|slot| !slot.disposable.is_disposed())
    }

    pub fn live_kinds(&self) -> Vec<ResourceKind> {
        self.inner
            .slots
            .borrow()
            .iter()
            .filter(|(_, slot)| !slot.disposable.is_disposed())
            .map(|(kind, _)| *kind)
            .collect()
    }

    fn live<T: Resource>(&self) -> CacheResult<Option<Rc<T>>> {
        let slots = self.inner.slots.borrow();
        match slots.get(&T::KIND) {
            Some(slot) if !slot.disposable.is_disposed() => Rc::clone(&slot.instance)
                .downcast::<T>()
                .map(Some)
                .map_err(|_| CacheError::KindMismatch {
                    scope: self.inner.scope.clone(),
                    kind: T::KIND,
                }),
            _ => Ok(None),
        }
    }

    fn insert<T, F>(&self, factory: F) -> CacheResult<Rc<T>>
    where
        T: Resource,
        F: FnOnce() -> Rc<T>,
    {
        let kind = T::KIND;
        if self.inner.owner.is_disposed() {
            return Err(CacheError::ScopeDisposed {
                scope: self.inner.scope.clone(),
            });
        }

        let instance = factory();
        let disposable = instance.disposable().clone();
        self.inner
            .owner
            .register_child(&disposable)
            .map_err(|source| CacheError::Bind {
                scope: self.inner.scope.clone(),
                kind,
                source,
            })?;

        let generation = self.inner.next_generation.get();
        self.inner.next_generation.set(generation + 1);
        let erased: Rc<dyn Any> = instance.clone();
        self.inner.slots.borrow_mut().insert(
            kind,
            Slot {
                generation,
                instance: erased,
                disposable: disposable.clone(),
            },
        );

        let cache = Rc::downgrade(&self.inner);
        disposable.on_dispose(move || {
            if let Some(cache) = cache.upgrade() {
                cache.clear_slot(kind, generation);
            }
        });
        tracing::debug!(scope = %self.inner.scope, ?kind, generation, "cached new resource");
        Ok(instance)
    }
}

impl WeakResourceCache {
    pub fn upgrade(&self) -> Option<ResourceCache> {
        self.inner.upgrade().map(|inner| ResourceCache { inner })
    }
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("scope", &self.inner.scope)
            .field("live", &self.live_kinds())
            .finish()
    }
}

impl fmt::Debug for WeakResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(cache) => write!(f, "WeakResourceCache({:?})", cache.scope()),
            None => f.write_str("WeakResourceCache(<dropped>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    fn counted(label: &str) -> (Disposable, Rc<Cell<u32>>) {
        let disposable = Disposable::new(label);
        let teardowns = Rc::new(Cell::new(0));
        let hook = Rc::clone(&teardowns);
        disposable.on_dispose(move || hook.set(hook.get() + 1));
        (disposable, teardowns)
    }

    macro_rules! fake_resource {
        ($name:ident, $kind:expr) => {
            #[derive(Debug)]
            struct $name {
                disposable: Disposable,
                teardowns: Rc<Cell<u32>>,
            }

            impl $name {
                fn new(label: &str) -> Rc<Self> {
                    let (disposable, teardowns) = counted(label);
                    Rc::new(Self {
                        disposable,
                        teardowns,
                    })
                }
            }

            impl Resource for $name {
                const KIND: ResourceKind = $kind;

                fn disposable(&self) -> &Disposable {
                    &self.disposable
                }
            }
        };
    }

    fake_resource!(FakePopup, ResourceKind::Popup);
    fake_resource!(FakeDialog, ResourceKind::TranslationDialog);
    fake_resource!(FakeWords, ResourceKind::SecondaryDialog);

    fn scope() -> Scope {
        Scope::new(ScopeId::session("cache-test"), UiThread::current())
    }

    #[test]
    fn acquire_twice_returns_the_same_instance_and_runs_factory_once() {
        let scope = scope();
        let calls = Cell::new(0);
        let factory = || {
            calls.set(calls.get() + 1);
            FakePopup::new("popup")
        };

        let first = scope.cache().acquire(factory).expect("first acquire");
        let second = scope
            .cache()
            .acquire(|| {
                calls.set(calls.get() + 1);
                FakePopup::new("popup")
            })
            .expect("second acquire");

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn disposed_instance_clears_its_slot_and_next_acquire_recreates() {
        let scope = scope();
        let first = scope
            .cache()
            .acquire(|| FakePopup::new("popup"))
            .expect("first acquire");

        first.disposable.dispose();
        assert!(scope.cache().peek::<FakePopup>().is_none());
        assert!(!scope.cache().contains(ResourceKind::Popup));

        let second = scope
            .cache()
            .acquire(|| FakePopup::new("popup"))
            .expect("second acquire");
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(!second.disposable.is_disposed());
    }

    #[test]
    fn peek_never_creates() {
        let scope = scope();
        assert!(scope.cache().peek::<FakePopup>().is_none());
        assert!(scope.cache().live_kinds().is_empty());
    }

    #[test]
    fn scope_dispose_tears_down_every_slot_exactly_once() {
        let scope = scope();
        let popup = scope
            .cache()
            .acquire(|| FakePopup::new("popup"))
            .expect("popup");
        let dialog = scope
            .cache()
            .acquire(|| FakeDialog::new("dialog"))
            .expect("dialog");
        let words = scope
            .cache()
            .acquire(|| FakeWords::new("words"))
            .expect("words");
        assert_eq!(scope.cache().live_kinds().len(), 3);

        dialog.disposable.dispose();
        scope.dispose();
        scope.dispose();

        assert_eq!(popup.teardowns.get(), 1);
        assert_eq!(dialog.teardowns.get(), 1);
        assert_eq!(words.teardowns.get(), 1);
        assert!(scope.cache().live_kinds().is_empty());
    }

    #[test]
    fn acquire_after_scope_dispose_fails_without_calling_factory() {
        let scope = scope();
        scope.dispose();

        let err = scope
            .cache()
            .acquire::<FakePopup, _>(|| panic!("factory must not run"))
            .expect_err("disposed scope rejects acquisition");
        assert!(matches!(err, CacheError::ScopeDisposed { .. }));
    }

    #[test]
    fn replace_disposes_the_previous_instance() {
        let scope = scope();
        let first = scope
            .cache()
            .acquire(|| FakePopup::new("first"))
            .expect("first");

        let second = scope
            .cache()
            .replace(|| FakePopup::new("second"))
            .expect("second");

        assert_eq!(first.teardowns.get(), 1);
        let current = scope.cache().peek::<FakePopup>().expect("second is cached");
        assert!(Rc::ptr_eq(&current, &second));
    }

    #[test]
    fn resource_already_owned_elsewhere_is_not_cached() {
        let scope = scope();
        let elsewhere = Disposable::new("elsewhere");
        let err = scope
            .cache()
            .acquire(|| {
                let popup = FakePopup::new("owned");
                elsewhere
                    .register_child(&popup.disposable)
                    .expect("pre-owned");
                popup
            })
            .expect_err("owned resource cannot be rebound");

        assert!(matches!(err, CacheError::Bind { .. }));
        assert!(scope.cache().peek::<FakePopup>().is_none());
    }

    #[test]
    fn weak_cache_does_not_outlive_scope() {
        let weak = {
            let scope = scope();
            scope.cache().downgrade()
        };
        assert!(weak.upgrade().is_none());
    }
}

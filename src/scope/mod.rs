//! Lifetime boundaries under which UI resources are cached and disposed together.

use std::collections::HashMap;
use std::fmt;

use crate::cache::{ResourceCache, WeakResourceCache};
use crate::dispose::{Disposable, WeakDisposable};
use crate::runtime::UiThread;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Application,
    Session(String),
}

impl ScopeId {
    pub fn session(name: impl Into<String>) -> Self {
        Self::Session(name.into())
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => f.write_str("application"),
            Self::Session(name) => write!(f, "session:{name}"),
        }
    }
}

/// One live scope: the root of its disposal tree plus its resource cache.
#[derive(Debug, Clone)]
pub struct Scope {
    id: ScopeId,
    root: Disposable,
    cache: ResourceCache,
}

impl Scope {
    pub fn new(id: ScopeId, thread: UiThread) -> Self {
        let root = Disposable::new(format!("scope:{id}"));
        let cache = ResourceCache::new(id.clone(), root.clone(), thread);
        Self { id, root, cache }
    }

    pub fn id(&self) -> &ScopeId {
        &self.id
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn disposable(&self) -> &Disposable {
        &self.root
    }

    /// Back-reference for resources living inside this scope.
    pub fn handle(&self) -> ScopeHandle {
        ScopeHandle {
            id: self.id.clone(),
            root: self.root.downgrade(),
            cache: self.cache.downgrade(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.root.is_disposed()
    }

    /// Terminal teardown of every resource cached under this scope.
    pub fn dispose(&self) -> bool {
        let disposed = self.root.dispose();
        if disposed {
            tracing::info!(scope = %self.id, "scope disposed");
        }
        disposed
    }
}

/// Non-owning view of a [`Scope`]; lookups fail once the scope is gone.
#[derive(Debug, Clone)]
pub struct ScopeHandle {
    id: ScopeId,
    root: WeakDisposable,
    cache: WeakResourceCache,
}

impl ScopeHandle {
    pub fn id(&self) -> &ScopeId {
        &self.id
    }

    pub fn root(&self) -> Option<Disposable> {
        self.root.upgrade().filter(|root| !root.is_disposed())
    }

    pub fn cache(&self) -> Option<ResourceCache> {
        self.root()?;
        self.cache.upgrade()
    }
}

/// Explicit scope lookup owned by whoever owns the scopes.
#[derive(Debug)]
pub struct ScopeRegistry {
    thread: UiThread,
    scopes: HashMap<ScopeId, Scope>,
}

impl ScopeRegistry {
    pub fn new(thread: UiThread) -> Self {
        Self {
            thread,
            scopes: HashMap::new(),
        }
    }

    /// Returns the live scope for `id`, creating it on first use.
    pub fn get_or_create(&mut self, id: &ScopeId) -> Scope {
        self.thread.assert_confined("ScopeRegistry::get_or_create");
        if let Some(scope) = self.scopes.get(id).filter(|scope| !scope.is_disposed()) {
            return scope.clone();
        }
        tracing::debug!(scope = %id, "creating scope");
        let scope = Scope::new(id.clone(), self.thread);
        self.scopes.insert(id.clone(), scope.clone());
        scope
    }

    pub fn get(&self, id: &ScopeId) -> Option<Scope> {
        self.scopes
            .get(id)
            .filter(|scope| !scope.is_disposed())
            .cloned()
    }

    /// Detaches the scope; the caller disposes it outside any registry borrow.
    pub fn remove(&mut self, id: &ScopeId) -> Option<Scope> {
        self.thread.assert_confined("ScopeRegistry::remove");
        self.scopes.remove(id)
    }

    pub fn drain(&mut self) -> Vec<Scope> {
        self.thread.assert_confined("ScopeRegistry::drain");
        self.scopes.drain().map(|(_, scope)| scope).collect()
    }

    pub fn live_scopes(&self) -> Vec<Scope> {
        self.scopes
            .values()
            .filter(|scope| !scope.is_disposed())
            .cloned()
            .collect()
    }
}

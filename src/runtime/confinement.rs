use std::thread::{self, ThreadId};

/// Identity of the thread that owns all popup, cache and card state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiThread {
    owner: ThreadId,
}

impl UiThread {
    /// Binds confinement to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// A thread identity that is never the caller's.
    #[cfg(test)]
    pub(crate) fn foreign() -> Self {
        let owner = thread::spawn(|| thread::current().id())
            .join()
            .expect("foreign thread joins");
        Self { owner }
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panics when called from any thread other than the owner.
    #[track_caller]
    pub fn assert_confined(&self, operation: &str) {
        if self.is_current() {
            return;
        }
        let current = thread::current();
        tracing::error!(
            operation,
            thread = ?current.id(),
            owner = ?self.owner,
            "UI-confined operation entered from a foreign thread"
        );
        panic!(
            "{operation} must run on the UI thread (owner {:?}, called from {:?})",
            self.owner,
            current.id()
        );
    }
}

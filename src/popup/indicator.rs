use std::cell::Cell;
use std::rc::Rc;

use crate::dispose::Disposable;

/// Spinner shown on the processing card. Owned by its popup.
#[derive(Debug, Clone)]
pub struct ProcessIndicator {
    running: Rc<Cell<bool>>,
    disposable: Disposable,
}

impl ProcessIndicator {
    pub fn new() -> Self {
        let running = Rc::new(Cell::new(false));
        let disposable = Disposable::new("process-indicator");
        let stop = Rc::clone(&running);
        disposable.on_dispose(move || stop.set(false));
        Self {
            running,
            disposable,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn resume(&self) {
        if !self.disposable.is_disposed() {
            self.running.set(true);
        }
    }

    pub fn suspend(&self) {
        self.running.set(false);
    }

    pub fn disposable(&self) -> &Disposable {
        &self.disposable
    }
}

impl Default for ProcessIndicator {
    fn default() -> Self {
        Self::new()
    }
}

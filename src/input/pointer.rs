use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::geometry::Point;
use crate::runtime::UiThread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Moved,
    Dragged,
    Pressed,
    Released,
}

/// What the host reports as the component under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    PinControl,
    PopupContent,
    Menu,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub target: PointerTarget,
    /// Whether the originating component is still on screen.
    pub target_visible: bool,
    pub screen_point: Point,
}

impl PointerEvent {
    pub const fn moved(target: PointerTarget, screen_point: Point) -> Self {
        Self {
            kind: PointerEventKind::Moved,
            target,
            target_visible: true,
            screen_point,
        }
    }

    pub fn with_hidden_target(mut self) -> Self {
        self.target_visible = false;
        self
    }
}

type Listener = Rc<dyn Fn(&PointerEvent)>;

struct BusInner {
    thread: UiThread,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
    registrations: Cell<usize>,
    deregistrations: Cell<usize>,
}

impl BusInner {
    fn remove(&self, id: u64) {
        self.thread.assert_confined("PointerEventBus::unsubscribe");
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            before != listeners.len()
        };
        if removed {
            self.deregistrations.set(self.deregistrations.get() + 1);
            tracing::trace!(id, "pointer listener removed");
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|(listener_id, _)| *listener_id == id)
    }
}

/// Platform-wide pointer motion stream.
#[derive(Clone)]
pub struct PointerEventBus {
    inner: Rc<BusInner>,
}

/// Live registration on a [`PointerEventBus`]; dropping it deregisters the listener.
pub struct PointerSubscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl PointerEventBus {
    pub fn new(thread: UiThread) -> Self {
        Self {
            inner: Rc::new(BusInner {
                thread,
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                registrations: Cell::new(0),
                deregistrations: Cell::new(0),
            }),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&PointerEvent) + 'static) -> PointerSubscription {
        self.inner.thread.assert_confined("PointerEventBus::subscribe");
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        self.inner
            .registrations
            .set(self.inner.registrations.get() + 1);
        tracing::trace!(id, "pointer listener added");
        PointerSubscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every listener registered when dispatch started and
    /// still registered when its turn comes.
    pub fn dispatch(&self, event: &PointerEvent) {
        self.inner.thread.assert_confined("PointerEventBus::dispatch");
        let snapshot: Vec<(u64, Listener)> = self.inner.listeners.borrow().clone();
        for (id, listener) in snapshot {
            if self.inner.is_registered(id) {
                listener(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn registrations(&self) -> usize {
        self.inner.registrations.get()
    }

    pub fn deregistrations(&self) -> usize {
        self.inner.deregistrations.get()
    }
}

impl PointerSubscription {
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.is_registered(self.id))
    }
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

impl fmt::Debug for PointerEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerEventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl fmt::Debug for PointerSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

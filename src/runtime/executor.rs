use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::confinement::UiThread;

type Task = Box<dyn FnOnce()>;
type ReplyHandler = Box<dyn FnOnce(Box<dyn Any + Send>)>;

enum Envelope {
    Reply { id: u64, value: Box<dyn Any + Send> },
    Abandon { id: u64 },
}

struct Timer {
    due: Instant,
    seq: u64,
    task: Task,
}

struct ExecutorInner {
    thread: UiThread,
    clock: Rc<dyn Clock>,
    tasks: RefCell<VecDeque<Task>>,
    timers: RefCell<Vec<Timer>>,
    handlers: RefCell<HashMap<u64, ReplyHandler>>,
    next_id: Cell<u64>,
    inbox_tx: mpsc::Sender<Envelope>,
    inbox_rx: mpsc::Receiver<Envelope>,
    parked: RefCell<VecDeque<Envelope>>,
}

/// Cooperative scheduler for the UI thread.
///
/// Background work never touches UI state directly: it holds a [`Completion`]
/// and the value it delivers is handed to the registered callback the next
/// time the owner thread calls [`UiExecutor::run_pending`].
#[derive(Clone)]
pub struct UiExecutor {
    inner: Rc<ExecutorInner>,
}

/// `Send` reply handle for one background result.
///
/// Dropping it without calling [`Completion::complete`] abandons the callback.
pub struct Completion<T> {
    id: u64,
    sender: Option<mpsc::Sender<Envelope>>,
    _value: PhantomData<fn(T)>,
}

impl UiExecutor {
    pub fn new() -> Self {
        Self::with_clock(Rc::new(SystemClock))
    }

    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        Self {
            inner: Rc::new(ExecutorInner {
                thread: UiThread::current(),
                clock,
                tasks: RefCell::new(VecDeque::new()),
                timers: RefCell::new(Vec::new()),
                handlers: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
                inbox_tx,
                inbox_rx,
                parked: RefCell::new(VecDeque::new()),
            }),
        }
    }

    pub fn ui_thread(&self) -> UiThread {
        self.inner.thread
    }

    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id.wrapping_add(1));
        id
    }

    /// Queues `task` for the next drain.
    pub fn post(&self, task: impl FnOnce() + 'static) {
        self.inner.thread.assert_confined("UiExecutor::post");
        self.inner.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Runs `task` once `delay` has elapsed on the executor clock.
    pub fn schedule_after(&self, delay: Duration, task: impl FnOnce() + 'static) {
        self.inner.thread.assert_confined("UiExecutor::schedule_after");
        if delay.is_zero() {
            self.post(task);
            return;
        }
        let due = self.now() + delay;
        let seq = self.next_id();
        self.inner.timers.borrow_mut().push(Timer {
            due,
            seq,
            task: Box::new(task),
        });
    }

    /// Registers `callback` and returns the handle a worker uses to feed it.
    pub fn completion<T, F>(&self, callback: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(T) + 'static,
    {
        self.inner.thread.assert_confined("UiExecutor::completion");
        let id = self.next_id();
        let handler: ReplyHandler = Box::new(move |value| match value.downcast::<T>() {
            Ok(value) => callback(*value),
            Err(_) => tracing::error!(id, "reply delivered with an unexpected type"),
        });
        self.inner.handlers.borrow_mut().insert(id, handler);
        Completion {
            id,
            sender: Some(self.inner.inbox_tx.clone()),
            _value: PhantomData,
        }
    }

    /// Number of completions handed out and not yet delivered or abandoned.
    pub fn pending_replies(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.inner.tasks.borrow().is_empty()
            || !self.inner.timers.borrow().is_empty()
            || !self.inner.parked.borrow().is_empty()
            || self.pending_replies() > 0
    }

    /// Drains replies, due timers and posted tasks until a round runs nothing.
    pub fn run_pending(&self) -> usize {
        self.inner.thread.assert_confined("UiExecutor::run_pending");
        let mut ran = 0;
        loop {
            let round = self.dispatch_replies() + self.run_due_timers() + self.run_posted();
            if round == 0 {
                return ran;
            }
            ran += round;
        }
    }

    /// Parks until a reply arrives, the next timer is due, or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.inner.thread.assert_confined("UiExecutor::wait");
        if !self.inner.parked.borrow().is_empty() {
            return true;
        }
        let now = self.now();
        let timeout = self
            .inner
            .timers
            .borrow()
            .iter()
            .map(|timer| timer.due.saturating_duration_since(now))
            .min()
            .map_or(timeout, |until_timer| until_timer.min(timeout));
        match self.inner.inbox_rx.recv_timeout(timeout) {
            Ok(envelope) => {
                self.inner.parked.borrow_mut().push_back(envelope);
                true
            }
            Err(_) => false,
        }
    }

    fn dispatch_replies(&self) -> usize {
        let mut envelopes = std::mem::take(&mut *self.inner.parked.borrow_mut());
        while let Ok(envelope) = self.inner.inbox_rx.try_recv() {
            envelopes.push_back(envelope);
        }

        let mut ran = 0;
        for envelope in envelopes {
            match envelope {
                Envelope::Reply { id, value } => {
                    let handler = self.inner.handlers.borrow_mut().remove(&id);
                    if let Some(handler) = handler {
                        handler(value);
                        ran += 1;
                    }
                }
                Envelope::Abandon { id } => {
                    if self.inner.handlers.borrow_mut().remove(&id).is_some() {
                        tracing::debug!(id, "completion dropped without a reply");
                    }
                }
            }
        }
        ran
    }

    fn run_due_timers(&self) -> usize {
        let now = self.now();
        let mut due: Vec<Timer> = {
            let mut timers = self.inner.timers.borrow_mut();
            let (due, waiting): (Vec<Timer>, Vec<Timer>) = std::mem::take(&mut *timers)
                .into_iter()
                .partition(|timer| timer.due <= now);
            *timers = waiting;
            due
        };
        due.sort_by_key(|timer| (timer.due, timer.seq));

        let ran = due.len();
        for timer in due {
            (timer.task)();
        }
        ran
    }

    fn run_posted(&self) -> usize {
        let tasks = std::mem::take(&mut *self.inner.tasks.borrow_mut());
        let ran = tasks.len();
        for task in tasks {
            task();
        }
        ran
    }
}

impl Default for UiExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UiExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiExecutor")
            .field("thread", &self.inner.thread)
            .field("tasks", &self.inner.tasks.borrow().len())
            .field("timers", &self.inner.timers.borrow().len())
            .field("pending_replies", &self.pending_replies())
            .finish()
    }
}

impl<T: Send + 'static> Completion<T> {
    /// Delivers `value` to the UI thread.
    pub fn complete(mut self, value: T) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let envelope = Envelope::Reply {
            id: self.id,
            value: Box::new(value),
        };
        if sender.send(envelope).is_err() {
            tracing::debug!(id = self.id, "executor gone before reply was delivered");
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Envelope::Abandon { id: self.id });
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.id)
            .field("pending", &self.sender.is_some())
            .finish()
    }
}

//! Ownership tree for teardown.
//!
//! Every resource that needs cleanup owns a [`Disposable`] node. A node may be
//! registered as the child of exactly one parent; disposing a node marks it
//! disposed first, then disposes its children, then runs its own callbacks.
//! Each node is torn down at most once no matter how many paths reach it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

pub type DisposeResult<T> = std::result::Result<T, DisposeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisposeError {
    #[error("registering {child} under {parent} would create a cycle")]
    Cycle { parent: String, child: String },
    #[error("{child} is already owned by {owner}")]
    AlreadyOwned { child: String, owner: String },
    #[error("{parent} is already disposed; {child} was disposed instead of registered")]
    ParentDisposed { parent: String, child: String },
}

type Callback = Box<dyn FnOnce()>;

struct Node {
    label: String,
    disposed: Cell<bool>,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<Rc<Node>>>,
    callbacks: RefCell<Vec<Callback>>,
}

impl Node {
    fn dispose(self: &Rc<Self>) -> bool {
        if self.disposed.replace(true) {
            return false;
        }
        tracing::trace!(label = %self.label, "dispose");

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children.iter().rev() {
            child.dispose();
        }

        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }

        let parent = std::mem::take(&mut *self.parent.borrow_mut());
        if let Some(parent) = parent.upgrade() {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, self));
        }
        true
    }

    fn has_ancestor(&self, candidate: &Rc<Node>) -> bool {
        let mut current = self.parent.borrow().upgrade();
        while let Some(node) = current {
            if Rc::ptr_eq(&node, candidate) {
                return true;
            }
            current = node.parent.borrow().upgrade();
        }
        false
    }
}

/// Handle to one node of the disposal tree. Clones share the node.
#[derive(Clone)]
pub struct Disposable {
    node: Rc<Node>,
}

/// Non-owning handle, used by callbacks that must not keep a node alive.
#[derive(Clone, Default)]
pub struct WeakDisposable {
    node: Weak<Node>,
}

impl Disposable {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                label: label.into(),
                disposed: Cell::new(false),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                callbacks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.node.label
    }

    pub fn is_disposed(&self) -> bool {
        self.node.disposed.get()
    }

    pub fn child_count(&self) -> usize {
        self.node.children.borrow().len()
    }

    pub fn has_parent(&self) -> bool {
        self.node.parent.borrow().upgrade().is_some()
    }

    pub fn ptr_eq(&self, other: &Disposable) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub fn downgrade(&self) -> WeakDisposable {
        WeakDisposable {
            node: Rc::downgrade(&self.node),
        }
    }

    /// Tears the node down. Returns `true` only for the call that did the work.
    pub fn dispose(&self) -> bool {
        self.node.dispose()
    }

    /// Runs `callback` when this node is disposed, or right away if it already was.
    pub fn on_dispose(&self, callback: impl FnOnce() + 'static) {
        if self.is_disposed() {
            callback();
            return;
        }
        self.node.callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Makes `child` a dependent of `self`.
    ///
    /// A child registered under an already disposed parent is disposed on the
    /// spot so it cannot leak, and the call reports [`DisposeError::ParentDisposed`].
    pub fn register_child(&self, child: &Disposable) -> DisposeResult<()> {
        if Rc::ptr_eq(&self.node, &child.node) || self.node.has_ancestor(&child.node) {
            return Err(DisposeError::Cycle {
                parent: self.node.label.clone(),
                child: child.node.label.clone(),
            });
        }
        if let Some(owner) = child.node.parent.borrow().upgrade() {
            return Err(DisposeError::AlreadyOwned {
                child: child.node.label.clone(),
                owner: owner.label.clone(),
            });
        }
        if child.is_disposed() {
            return Ok(());
        }
        if self.is_disposed() {
            child.dispose();
            return Err(DisposeError::ParentDisposed {
                parent: self.node.label.clone(),
                child: child.node.label.clone(),
            });
        }

        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node.children.borrow_mut().push(Rc::clone(&child.node));
        Ok(())
    }
}

impl WeakDisposable {
    pub fn upgrade(&self) -> Option<Disposable> {
        self.node.upgrade().map(|node| Disposable { node })
    }

    /// Disposes the node if it is still alive.
    pub fn dispose(&self) -> bool {
        self.upgrade().is_some_and(|disposable| disposable.dispose())
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("label", &self.node.label)
            .field("disposed", &self.node.disposed.get())
            .field("children", &self.node.children.borrow().len())
            .finish()
    }
}

impl fmt::Debug for WeakDisposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(disposable) => write!(f, "WeakDisposable({disposable:?})"),
            None => f.write_str("WeakDisposable(<dropped>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(node: &Disposable) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let hook = Rc::clone(&count);
        node.on_dispose(move || hook.set(hook.get() + 1));
        count
    }

    #[test]
    fn dispose_runs_callbacks_exactly_once() {
        let node = Disposable::new("node");
        let count = counter(&node);

        assert!(node.dispose());
        assert!(!node.dispose());
        assert!(node.is_disposed());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn dispose_cascades_to_children_and_grandchildren() {
        let root = Disposable::new("root");
        let child = Disposable::new("child");
        let grandchild = Disposable::new("grandchild");
        root.register_child(&child).expect("child registers");
        child
            .register_child(&grandchild)
            .expect("grandchild registers");
        let child_count = counter(&child);
        let grandchild_count = counter(&grandchild);

        root.dispose();

        assert!(child.is_disposed());
        assert!(grandchild.is_disposed());
        assert_eq!(child_count.get(), 1);
        assert_eq!(grandchild_count.get(), 1);
    }

    #[test]
    fn disposed_child_detaches_from_its_parent() {
        let root = Disposable::new("root");
        let child = Disposable::new("child");
        root.register_child(&child).expect("child registers");
        assert_eq!(root.child_count(), 1);

        child.dispose();

        assert_eq!(root.child_count(), 0);
        assert!(!child.has_parent());
        assert!(!root.is_disposed());
    }

    #[test]
    fn registering_an_ancestor_as_child_is_rejected() {
        let root = Disposable::new("root");
        let child = Disposable::new("child");
        root.register_child(&child).expect("child registers");

        let err = child
            .register_child(&root)
            .expect_err("ancestor must not become a child");
        assert!(matches!(err, DisposeError::Cycle { .. }));
        assert!(matches!(
            root.register_child(&root),
            Err(DisposeError::Cycle { .. })
        ));
    }

    #[test]
    fn second_owner_is_rejected() {
        let first = Disposable::new("first");
        let second = Disposable::new("second");
        let child = Disposable::new("child");
        first.register_child(&child).expect("first owner registers");

        let err = second
            .register_child(&child)
            .expect_err("child already has an owner");
        assert_eq!(
            err,
            DisposeError::AlreadyOwned {
                child: "child".to_string(),
                owner: "first".to_string(),
            }
        );
    }

    #[test]
    fn registering_under_disposed_parent_disposes_the_child() {
        let parent = Disposable::new("parent");
        parent.dispose();
        let child = Disposable::new("child");
        let count = counter(&child);

        let err = parent
            .register_child(&child)
            .expect_err("disposed parent cannot adopt");

        assert!(matches!(err, DisposeError::ParentDisposed { .. }));
        assert!(child.is_disposed());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn callback_registered_after_dispose_runs_immediately() {
        let node = Disposable::new("node");
        node.dispose();

        let count = counter(&node);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn reentrant_dispose_from_callback_is_a_no_op() {
        let node = Disposable::new("node");
        let again = node.downgrade();
        let reentered = Rc::new(Cell::new(None));
        let seen = Rc::clone(&reentered);
        node.on_dispose(move || seen.set(Some(again.dispose())));

        node.dispose();

        assert_eq!(reentered.get(), Some(false));
    }

    #[test]
    fn child_callback_disposing_the_parent_tears_down_siblings_once() {
        let parent = Disposable::new("parent");
        let first = Disposable::new("first");
        let second = Disposable::new("second");
        parent.register_child(&first).expect("first registers");
        parent.register_child(&second).expect("second registers");
        let weak_parent = parent.downgrade();
        first.on_dispose(move || {
            weak_parent.dispose();
        });
        let parent_count = counter(&parent);
        let second_count = counter(&second);

        first.dispose();

        assert!(parent.is_disposed());
        assert!(second.is_disposed());
        assert_eq!(parent_count.get(), 1);
        assert_eq!(second_count.get(), 1);
        assert_eq!(parent.child_count(), 0);
    }

    #[test]
    fn weak_handle_does_not_keep_node_alive() {
        let node = Disposable::new("node");
        let weak = node.downgrade();
        drop(node);

        assert!(weak.upgrade().is_none());
        assert!(!weak.dispose());
    }
}

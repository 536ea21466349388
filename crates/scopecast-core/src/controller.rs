#![forbid(unsafe_code)]

//! Single-slot scoped state cell.
//!
//! # Design
//!
//! [`Controller<T>`] holds at most one value. Observers registered with
//! [`Observable::observe`] are activated with the value when it is set and
//! return a [`Scope`]; the controller keeps those scopes and closes them when
//! the value is reset or replaced.
//!
//! Values are stored as `Rc<T>` so that observers can be called with `&T`
//! while no `RefCell` borrow is held. Every callback into user code runs
//! without an outstanding borrow of the controller's interior.
//!
//! # Invariants
//!
//! 1. At most one value is current. `set` while active closes every live
//!    scope before any new activation runs.
//! 2. Scopes are closed in subscription-registration order, both on `set`
//!    and on `reset`.
//! 3. Every scope is closed exactly once: on replacement, on reset, on
//!    [`CancelMode::CloseScope`], or when the last handle is dropped.
//! 4. Observers registered while a value is current are activated
//!    immediately.
//!
//! # Reentrancy
//!
//! A `set` or `reset` issued from inside an activation or a teardown of the
//! *same* controller is queued and applied after the in-flight operation
//! finishes, in FIFO order. Subscribing from inside a callback is applied
//! immediately. An operation queue that fails to drain after
//! [`MAX_SETTLE_ROUNDS`] rounds is treated as a programming error and
//! panics.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::logging::{debug, trace};
use crate::observable::{Observable, ObserverFn};
use crate::scope::Scope;
use crate::subscription::{CancelMode, Subscription};

/// Upper bound on queued operations applied by one outermost `set`/`reset`.
pub const MAX_SETTLE_ROUNDS: usize = 10_000;

const DEFAULT_LABEL: &str = "controller";

enum Op<T> {
    Set(T),
    Reset,
}

struct Entry<T> {
    id: u64,
    observer: ObserverFn<T>,
}

struct ControllerInner<T> {
    label: &'static str,
    value: Option<Rc<T>>,
    /// Registered observers in registration order.
    observers: Vec<Entry<T>>,
    /// Live scopes, keyed by observer id and kept sorted by it, so dropping
    /// the inner closes them in registration order as well.
    scopes: Vec<(u64, Scope)>,
    next_id: u64,
    /// True while an operation is being applied.
    busy: bool,
    queue: VecDeque<Op<T>>,
}

/// A mutable single-slot cell that drives scoped activations.
///
/// Cloning a `Controller` creates a new handle to the **same** cell.
///
/// ```
/// use scopecast_core::{Controller, Observable, Scope};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let uri = Controller::new();
/// let l = Rc::clone(&log);
/// uri.subscribe(move |v: &String| {
///     l.borrow_mut().push(format!("open {v}"));
///     let l = Rc::clone(&l);
///     let v = v.clone();
///     Scope::new(move || l.borrow_mut().push(format!("close {v}")))
/// })
/// .forget();
///
/// uri.set("a".to_string());
/// uri.set("b".to_string());
/// uri.reset();
/// assert_eq!(*log.borrow(), ["open a", "close a", "open b", "close b"]);
/// ```
pub struct Controller<T> {
    inner: Rc<RefCell<ControllerInner<T>>>,
}

/// Non-owning handle to a [`Controller`].
///
/// Observers that need to mutate the controller they are registered on
/// should capture a weak handle to avoid a reference cycle.
pub struct WeakController<T> {
    inner: Weak<RefCell<ControllerInner<T>>>,
}

impl<T> Clone for Controller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Clone for WeakController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Controller<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Controller")
                .field("label", &inner.label)
                .field("value", &inner.value)
                .field("observers", &inner.observers.len())
                .field("scopes", &inner.scopes.len())
                .finish(),
            Err(_) => f.debug_struct("Controller").finish_non_exhaustive(),
        }
    }
}

impl<T: 'static> Controller<T> {
    /// Create an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::with_label(DEFAULT_LABEL)
    }

    /// Create an empty controller whose log events carry `label`.
    #[must_use]
    pub fn with_label(label: &'static str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                label,
                value: None,
                observers: Vec::new(),
                scopes: Vec::new(),
                next_id: 0,
                busy: false,
                queue: VecDeque::new(),
            })),
        }
    }

    /// Make `value` current, closing the scopes of the previous value first.
    pub fn set(&self, value: T) {
        self.submit(Op::Set(value));
    }

    /// Close all live scopes and return to empty. No-op if already empty.
    pub fn reset(&self) {
        self.submit(Op::Reset);
    }

    /// Whether a value is current.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.borrow().value.is_some()
    }

    /// Inspect the current value.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let current = self.inner.borrow().value.clone();
        f(current.as_deref())
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.with(|value| value.cloned())
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Number of scopes currently held open.
    #[must_use]
    pub fn live_scope_count(&self) -> usize {
        self.inner.borrow().scopes.len()
    }

    /// Label used in log events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.inner.borrow().label
    }

    /// Create a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakController<T> {
        WeakController {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn submit(&self, op: Op<T>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.busy {
                debug!(
                    "{}: queued reentrant {} ({} pending)",
                    inner.label,
                    op.name(),
                    inner.queue.len() + 1
                );
                inner.queue.push_back(op);
                return;
            }
        }
        self.exclusive(move |this| this.apply(op));
    }

    /// Run `f` with the busy flag held, then drain queued operations.
    ///
    /// If the controller is already busy, `f` runs inline and the outer
    /// caller is responsible for draining.
    fn exclusive(&self, f: impl FnOnce(&Self)) {
        let already_busy = std::mem::replace(&mut self.inner.borrow_mut().busy, true);
        if already_busy {
            f(self);
            return;
        }

        let _guard = BusyGuard { inner: &self.inner };
        f(self);

        let mut rounds = 0usize;
        loop {
            let next = self.inner.borrow_mut().queue.pop_front();
            let Some(op) = next else { break };
            rounds += 1;
            if rounds > MAX_SETTLE_ROUNDS {
                let label = self.inner.borrow().label;
                panic!("{label}: reentrant set/reset did not settle after {MAX_SETTLE_ROUNDS} rounds");
            }
            self.apply(op);
        }
    }

    fn apply(&self, op: Op<T>) {
        match op {
            Op::Set(value) => {
                self.teardown();
                self.activate(value);
            }
            Op::Reset => {
                if self.is_active() {
                    self.teardown();
                }
            }
        }
    }

    fn teardown(&self) {
        let (previous, scopes) = {
            let mut inner = self.inner.borrow_mut();
            let scopes = std::mem::take(&mut inner.scopes);
            if inner.value.is_some() {
                trace!("{}: teardown of {} scopes", inner.label, scopes.len());
            }
            (inner.value.take(), scopes)
        };
        for (_, scope) in scopes {
            scope.close();
        }
        drop(previous);
    }

    fn activate(&self, value: T) {
        let value = Rc::new(value);
        let observers: Vec<(u64, ObserverFn<T>)> = {
            let mut inner = self.inner.borrow_mut();
            inner.value = Some(Rc::clone(&value));
            trace!("{}: activate {} observers", inner.label, inner.observers.len());
            inner
                .observers
                .iter()
                .map(|entry| (entry.id, Rc::clone(&entry.observer)))
                .collect()
        };

        for (id, observer) in observers {
            // An earlier activation may have unsubscribed this observer.
            let registered = self
                .inner
                .borrow()
                .observers
                .iter()
                .any(|entry| entry.id == id);
            if !registered {
                continue;
            }
            let scope = observer(&value);
            self.record_scope(id, scope);
        }
    }

    /// Keep `scope` in registration order. Observers subscribed during an
    /// activation record their scope before the observer that registered
    /// them.
    fn record_scope(&self, id: u64, scope: Scope) {
        let mut inner = self.inner.borrow_mut();
        let at = inner.scopes.partition_point(|(other, _)| *other < id);
        inner.scopes.insert(at, (id, scope));
    }

    fn cancel(inner: &Weak<RefCell<ControllerInner<T>>>, id: u64, mode: CancelMode) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let closing: Vec<Scope> = {
            let mut inner = inner.borrow_mut();
            inner.observers.retain(|entry| entry.id != id);
            match mode {
                CancelMode::KeepScope => Vec::new(),
                CancelMode::CloseScope => {
                    let (closing, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.scopes)
                        .into_iter()
                        .partition(|(scope_id, _)| *scope_id == id);
                    inner.scopes = kept;
                    closing.into_iter().map(|(_, scope)| scope).collect()
                }
            }
        };
        for scope in closing {
            scope.close();
        }
    }
}

impl<T: 'static> Observable for Controller<T> {
    type Value = T;

    fn observe(&self, observer: ObserverFn<T>) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push(Entry {
                id,
                observer: Rc::clone(&observer),
            });
            id
        };

        let current = self.inner.borrow().value.clone();
        if let Some(value) = current {
            self.exclusive(move |this| {
                let scope = observer(&value);
                this.record_scope(id, scope);
            });
        }

        let weak = Rc::downgrade(&self.inner);
        Subscription::from_fn(
            move |mode| Controller::cancel(&weak, id, mode),
            CancelMode::KeepScope,
        )
    }
}

impl<T: 'static> WeakController<T> {
    /// Upgrade to a strong handle if the controller is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Controller<T>> {
        self.inner.upgrade().map(|inner| Controller { inner })
    }

    /// `set` through the weak handle. No-op if the controller is gone.
    pub fn set(&self, value: T) {
        if let Some(controller) = self.upgrade() {
            controller.set(value);
        }
    }

    /// `reset` through the weak handle. No-op if the controller is gone.
    pub fn reset(&self) {
        if let Some(controller) = self.upgrade() {
            controller.reset();
        }
    }
}

impl<T> Op<T> {
    fn name(&self) -> &'static str {
        match self {
            Op::Set(_) => "set",
            Op::Reset => "reset",
        }
    }
}

struct BusyGuard<'a, T> {
    inner: &'a RefCell<ControllerInner<T>>,
}

impl<T> Drop for BusyGuard<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.busy = false;
            if std::thread::panicking() {
                inner.queue.clear();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

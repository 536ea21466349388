#![forbid(unsafe_code)]

//! Derived signals over other observables.
//!
//! Combinators hold clones of their operands and nothing else. Each
//! subscription to a combinator is wired straight through to the operands, so
//! the derived activation state is always a projection of the operands'
//! current state.
//!
//! # Invariants
//!
//! 1. [`And`] is active with `(a, b)` iff both operands are active.
//! 2. [`Not`] is active iff its operand is inactive, including before the
//!    operand has ever been set. Replacing a controller's value is
//!    reset-then-set, so `Not` briefly activates during a replacement.
//! 3. An operand going from active to inactive closes the derived scope
//!    exactly once.
//! 4. Cancelling a subscription to a combinator closes its live scope.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::observable::{Observable, ObserverFn};
use crate::scope::Scope;
use crate::subscription::{CancelMode, Subscription};

/// A pair of values that are current at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Both<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> Both<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A, B> From<(A, B)> for Both<A, B> {
    fn from((first, second): (A, B)) -> Self {
        Self::new(first, second)
    }
}

// ---------------------------------------------------------------------------
// And
// ---------------------------------------------------------------------------

/// Active while both operands are active. See [`Observable::and`].
///
/// Each activation of the left operand opens a nested subscription on the
/// right operand; the nested subscription lives exactly as long as that left
/// activation.
#[derive(Clone)]
pub struct And<A, B> {
    left: A,
    right: B,
}

impl<A, B> And<A, B> {
    pub fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

impl<A, B> Observable for And<A, B>
where
    A: Observable,
    B: Observable + Clone + 'static,
    A::Value: Clone,
    B::Value: Clone,
{
    type Value = Both<A::Value, B::Value>;

    fn observe(&self, observer: ObserverFn<Self::Value>) -> Subscription {
        let right = self.right.clone();
        self.left
            .observe(Rc::new(move |first: &A::Value| {
                let first = first.clone();
                let observer = Rc::clone(&observer);
                right
                    .observe(Rc::new(move |second: &B::Value| {
                        observer(&Both::new(first.clone(), second.clone()))
                    }))
                    .into_scope()
            }))
            .closing()
    }
}

impl<A, B> fmt::Debug for And<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("And").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Not
// ---------------------------------------------------------------------------

/// Unit signal active while the operand is inactive. See [`Observable::not`].
#[derive(Clone)]
pub struct Not<A> {
    operand: A,
}

impl<A> Not<A> {
    pub fn new(operand: A) -> Self {
        Self { operand }
    }
}

/// Per-subscription bookkeeping for [`Not`].
struct NotWatch {
    observer: ObserverFn<()>,
    /// Scope of the current "operand is inactive" activation.
    open: RefCell<Option<Scope>>,
    operand_active: Cell<bool>,
    cancelled: Cell<bool>,
}

impl NotWatch {
    fn enter(&self) {
        if self.cancelled.get() || self.operand_active.get() {
            return;
        }
        let scope = (self.observer)(&());
        if self.cancelled.get() {
            // Cancelled from inside the activation.
            scope.close();
            return;
        }
        let previous = self.open.replace(Some(scope));
        drop(previous);
    }

    fn exit(&self) {
        let previous = self.open.borrow_mut().take();
        drop(previous);
    }
}

impl<A> Observable for Not<A>
where
    A: Observable,
{
    type Value = ();

    fn observe(&self, observer: ObserverFn<()>) -> Subscription {
        let watch = Rc::new(NotWatch {
            observer,
            open: RefCell::new(None),
            operand_active: Cell::new(false),
            cancelled: Cell::new(false),
        });

        let on_operand = Rc::clone(&watch);
        let operand = self.operand.observe(Rc::new(move |_: &A::Value| {
            on_operand.operand_active.set(true);
            on_operand.exit();
            let reopen = Rc::clone(&on_operand);
            Scope::new(move || {
                reopen.operand_active.set(false);
                reopen.enter();
            })
        }));

        // No replay from the operand means it is empty right now.
        watch.enter();

        Subscription::from_fn(
            move |_| {
                watch.cancelled.set(true);
                operand.close();
                watch.exit();
            },
            CancelMode::CloseScope,
        )
    }
}

impl<A> fmt::Debug for Not<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Not").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Map / Filter
// ---------------------------------------------------------------------------

/// Projection of activation values. See [`Observable::map`].
pub struct Map<A, F> {
    source: A,
    f: Rc<F>,
}

impl<A: Clone, F> Clone for Map<A, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            f: Rc::clone(&self.f),
        }
    }
}

impl<A, F> Map<A, F> {
    pub fn new(source: A, f: F) -> Self {
        Self {
            source,
            f: Rc::new(f),
        }
    }
}

impl<A, F, R> Observable for Map<A, F>
where
    A: Observable,
    F: Fn(&A::Value) -> R + 'static,
    R: 'static,
{
    type Value = R;

    fn observe(&self, observer: ObserverFn<R>) -> Subscription {
        let f = Rc::clone(&self.f);
        self.source
            .observe(Rc::new(move |value: &A::Value| observer(&f(value))))
            .closing()
    }
}

/// Activations restricted by a predicate. See [`Observable::filter`].
pub struct Filter<A, P> {
    source: A,
    predicate: Rc<P>,
}

impl<A: Clone, P> Clone for Filter<A, P> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            predicate: Rc::clone(&self.predicate),
        }
    }
}

impl<A, P> Filter<A, P> {
    pub fn new(source: A, predicate: P) -> Self {
        Self {
            source,
            predicate: Rc::new(predicate),
        }
    }
}

impl<A, P> Observable for Filter<A, P>
where
    A: Observable,
    P: Fn(&A::Value) -> bool + 'static,
{
    type Value = A::Value;

    fn observe(&self, observer: ObserverFn<A::Value>) -> Subscription {
        let predicate = Rc::clone(&self.predicate);
        self.source
            .observe(Rc::new(move |value: &A::Value| {
                if predicate(value) {
                    observer(value)
                } else {
                    Scope::none()
                }
            }))
            .closing()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

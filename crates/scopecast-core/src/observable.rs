#![forbid(unsafe_code)]

//! The [`Observable`] trait: anything observers can attach scopes to.

use std::rc::Rc;

use crate::combinators::{And, Filter, Map, Not};
use crate::scope::Scope;
use crate::subscription::Subscription;

/// Shared observer callback.
///
/// Observers are `Fn` rather than `FnMut` so that a derived signal may hold
/// several live activations of the same observer, and so that an activation
/// may trigger further activations without a borrow conflict.
pub type ObserverFn<T> = Rc<dyn Fn(&T) -> Scope>;

/// A source of scoped activations.
///
/// Implementors guarantee:
///
/// 1. An observer is activated with a value while that value is current and
///    the scope it returns is closed exactly once when the value stops being
///    current.
/// 2. An observer registered while a value is current is activated
///    immediately (replay-on-subscribe).
/// 3. For one observer, the previous scope is closed before the next
///    activation runs.
pub trait Observable {
    /// The value handed to observers on activation.
    type Value: 'static;

    /// Register a shared observer.
    fn observe(&self, observer: ObserverFn<Self::Value>) -> Subscription;

    /// Register a closure observer.
    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Self::Value) -> Scope + 'static,
        Self: Sized,
    {
        self.observe(Rc::new(observer))
    }

    /// Signal that is active with both values while `self` and `other` are
    /// both active.
    fn and<B>(&self, other: &B) -> And<Self, B>
    where
        B: Observable + Clone,
        Self: Sized + Clone,
    {
        And::new(self.clone(), other.clone())
    }

    /// Unit signal that is active exactly while `self` is inactive.
    fn not(&self) -> Not<Self>
    where
        Self: Sized + Clone,
    {
        Not::new(self.clone())
    }

    /// Project each activation value through `f`.
    fn map<R, F>(&self, f: F) -> Map<Self, F>
    where
        F: Fn(&Self::Value) -> R + 'static,
        R: 'static,
        Self: Sized + Clone,
    {
        Map::new(self.clone(), f)
    }

    /// Only activate for values matching `predicate`.
    fn filter<P>(&self, predicate: P) -> Filter<Self, P>
    where
        P: Fn(&Self::Value) -> bool + 'static,
        Self: Sized + Clone,
    {
        Filter::new(self.clone(), predicate)
    }
}

/// Signal active while both `a` and `b` are active.
pub fn both_active<A, B>(a: &A, b: &B) -> And<A, B>
where
    A: Observable + Clone,
    B: Observable + Clone,
{
    a.and(b)
}

/// Signal active while `a` is inactive.
pub fn inactive_of<A>(a: &A) -> Not<A>
where
    A: Observable + Clone,
{
    a.not()
}

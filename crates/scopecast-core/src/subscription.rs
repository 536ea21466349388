#![forbid(unsafe_code)]

//! Registration handles returned by [`Observable::observe`].
//!
//! [`Observable::observe`]: crate::Observable::observe

use std::fmt;

use crate::scope::Scope;

/// What happens to an observer's live scope when its subscription ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Stop future activations. A scope created by an earlier activation
    /// stays with its controller until the next reset or replacement.
    KeepScope,
    /// Stop future activations and close the live scope immediately.
    CloseScope,
}

/// RAII registration guard.
///
/// Dropping a subscription cancels it. Subscriptions to a
/// [`Controller`](crate::Controller) cancel with [`CancelMode::KeepScope`];
/// subscriptions to derived signals cancel with [`CancelMode::CloseScope`]
/// because they have no reset of their own.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce(CancelMode)>>,
    on_drop: CancelMode,
}

impl Subscription {
    /// Build a subscription from a cancel hook. `on_drop` is the mode used
    /// when the guard is dropped without an explicit cancel.
    pub fn from_fn(cancel: impl FnOnce(CancelMode) + 'static, on_drop: CancelMode) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            on_drop,
        }
    }

    /// A subscription with nothing to cancel.
    pub fn empty() -> Self {
        Self {
            cancel: None,
            on_drop: CancelMode::KeepScope,
        }
    }

    /// Stop receiving activations. See [`CancelMode::KeepScope`].
    pub fn unsubscribe(mut self) {
        self.cancel_with(CancelMode::KeepScope);
    }

    /// Stop receiving activations and close the live scope now.
    pub fn close(mut self) {
        self.cancel_with(CancelMode::CloseScope);
    }

    /// Turn the subscription into a scope that closes it, live scope
    /// included. This is how derived signals nest subscriptions inside
    /// activations.
    pub fn into_scope(mut self) -> Scope {
        match self.cancel.take() {
            Some(cancel) => Scope::new(move || cancel(CancelMode::CloseScope)),
            None => Scope::none(),
        }
    }

    /// Make dropping this guard close the live scope as well.
    pub fn closing(mut self) -> Self {
        self.on_drop = CancelMode::CloseScope;
        self
    }

    /// Keep the registration for as long as the observable lives.
    pub fn forget(mut self) {
        self.cancel = None;
    }

    /// Whether the subscription is still registered through this guard.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_with(&mut self, mode: CancelMode) {
        if let Some(cancel) = self.cancel.take() {
            cancel(mode);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mode = self.on_drop;
        self.cancel_with(mode);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .field("on_drop", &self.on_drop)
            .finish()
    }
}

#![forbid(unsafe_code)]

//! Cleanup actions paired with an activation.
//!
//! A [`Scope`] is what an observer hands back when it is activated with a
//! value. The owning controller keeps it for as long as the value stays
//! current, then closes it exactly once: on replacement, on reset, or when
//! the controller itself goes away.

use std::fmt;

/// A cleanup action that runs exactly once.
///
/// Closing happens either explicitly through [`close()`](Scope::close) or
/// implicitly on drop, whichever comes first. A scope built with
/// [`Scope::none()`] does nothing when closed.
#[must_use = "dropping a Scope closes it immediately"]
pub struct Scope {
    on_close: Option<Box<dyn FnOnce()>>,
}

impl Scope {
    /// Wrap a cleanup closure.
    pub fn new(on_close: impl FnOnce() + 'static) -> Self {
        Self {
            on_close: Some(Box::new(on_close)),
        }
    }

    /// A scope with nothing to clean up.
    pub fn none() -> Self {
        Self { on_close: None }
    }

    /// Combine two scopes. Closing the result closes `self` first, then
    /// `other`.
    pub fn and(self, other: Scope) -> Self {
        Scope::new(move || {
            self.close();
            other.close();
        })
    }

    /// Run the cleanup action now.
    pub fn close(mut self) {
        self.run();
    }

    /// Whether closing this scope has any effect.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.on_close.is_none()
    }

    fn run(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::none()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("armed", &self.on_close.is_some())
            .finish()
    }
}

impl FromIterator<Scope> for Scope {
    /// Collect scopes into one that closes them in iteration order.
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        let scopes: Vec<Scope> = iter.into_iter().collect();
        if scopes.is_empty() {
            return Scope::none();
        }
        Scope::new(move || {
            for scope in scopes {
                scope.close();
            }
        })
    }
}

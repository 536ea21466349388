#![forbid(unsafe_code)]

//! Scoped broadcast receivers.
//!
//! A [`BroadcastRegistrar`] registers a handler for every [`Intent`] that
//! matches an [`IntentFilter`] and hands back a [`Scope`] that unregisters
//! it. Returning that scope from a controller observer keeps the receiver
//! registered exactly while the controller's value is current.
//!
//! [`LocalBroadcasts`] is the in-process implementation: `send` delivers
//! synchronously to matching receivers in registration order.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use scopecast_core::Scope;
use tracing::trace;

/// The screen turned off.
pub const ACTION_SCREEN_OFF: &str = "scopecast.intent.action.SCREEN_OFF";
/// Tear down the contents shown for the intent's uri.
pub const ACTION_STOP_WEB_CONTENT: &str = "scopecast.intent.action.STOP_WEB_CONTENT";
/// Change whether touch input is accepted for the intent's uri.
pub const ACTION_ENABLE_TOUCH_INPUT: &str = "scopecast.intent.action.ENABLE_TOUCH_INPUT";

/// A broadcast message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    action: String,
    uri: Option<String>,
    touchable: Option<bool>,
}

impl Intent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            uri: None,
            touchable: None,
        }
    }

    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_touchable(mut self, touchable: bool) -> Self {
        self.touchable = Some(touchable);
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Uri string the intent is addressed to, if any.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Touch flag carried by the intent. Absent means not touchable.
    pub fn is_touchable(&self) -> bool {
        self.touchable.unwrap_or(false)
    }
}

/// Set of actions a receiver is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentFilter {
    actions: Vec<String>,
}

impl IntentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single action.
    pub fn for_action(action: impl Into<String>) -> Self {
        Self::new().add_action(action)
    }

    #[must_use]
    pub fn add_action(mut self, action: impl Into<String>) -> Self {
        let action = action.into();
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    pub fn matches(&self, intent: &Intent) -> bool {
        self.actions.iter().any(|a| a == intent.action())
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }
}

/// Broadcast handler callback.
pub type IntentHandler = Rc<dyn Fn(&Intent)>;

/// Registration of scoped broadcast receivers.
pub trait BroadcastRegistrar {
    /// Register `handler` for intents matching `filter`. Closing the returned
    /// scope unregisters it.
    fn register(&self, filter: IntentFilter, handler: IntentHandler) -> Scope;
}

struct Receiver {
    id: u64,
    filter: IntentFilter,
    handler: IntentHandler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    receivers: Vec<Receiver>,
}

/// In-process broadcast bus.
///
/// Cloning creates a new handle to the same bus.
#[derive(Clone, Default)]
pub struct LocalBroadcasts {
    registry: Rc<RefCell<Registry>>,
}

impl LocalBroadcasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `intent` to every matching receiver. Returns how many
    /// receivers were called.
    ///
    /// Receivers unregistered by an earlier handler during the same send are
    /// skipped.
    pub fn send(&self, intent: &Intent) -> usize {
        let targets: Vec<(u64, IntentHandler)> = self
            .registry
            .borrow()
            .receivers
            .iter()
            .filter(|r| r.filter.matches(intent))
            .map(|r| (r.id, Rc::clone(&r.handler)))
            .collect();
        trace!(action = intent.action(), targets = targets.len(), "broadcast");

        let mut delivered = 0;
        for (id, handler) in targets {
            if !self.is_registered(id) {
                continue;
            }
            handler(intent);
            delivered += 1;
        }
        delivered
    }

    /// Number of registered receivers.
    pub fn receiver_count(&self) -> usize {
        self.registry.borrow().receivers.len()
    }

    /// Number of registered receivers listening for `action`.
    pub fn receiver_count_for(&self, action: &str) -> usize {
        self.registry
            .borrow()
            .receivers
            .iter()
            .filter(|r| r.filter.actions().iter().any(|a| a == action))
            .count()
    }

    fn is_registered(&self, id: u64) -> bool {
        self.registry.borrow().receivers.iter().any(|r| r.id == id)
    }

    fn unregister(registry: &Weak<RefCell<Registry>>, id: u64) {
        let Some(registry) = registry.upgrade() else {
            return;
        };
        let removed = {
            let mut registry = registry.borrow_mut();
            let position = registry.receivers.iter().position(|r| r.id == id);
            position.map(|i| registry.receivers.remove(i))
        };
        drop(removed);
    }
}

impl BroadcastRegistrar for LocalBroadcasts {
    fn register(&self, filter: IntentFilter, handler: IntentHandler) -> Scope {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            trace!(id, actions = ?filter.actions(), "register receiver");
            registry.receivers.push(Receiver {
                id,
                filter,
                handler,
            });
            id
        };
        let registry = Rc::downgrade(&self.registry);
        Scope::new(move || LocalBroadcasts::unregister(&registry, id))
    }
}

impl fmt::Debug for LocalBroadcasts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBroadcasts")
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

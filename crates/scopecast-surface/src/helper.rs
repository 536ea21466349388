#![forbid(unsafe_code)]

//! Lifecycle helper for a surface that displays content for a uri.
//!
//! The helper models its lifecycle as three controllers:
//!
//! - `created`: active from construction until [`SurfaceHelper::on_destroy`].
//! - `has_uri`: the uri of the current start params. Broadcast receivers for
//!   screen-off, stop and touch-input intents are registered exactly while a
//!   uri is active.
//! - `contents`: the contents being displayed. The host displays them, takes
//!   audio focus, and is told the component closed when they go away.
//!
//! Destroying the surface resets `created`; the `has_uri AND NOT created`
//! signal then resets the contents and the uri, which closes every receiver
//! and display scope.
//!
//! # Deferred finish
//!
//! Tearing down contents in response to a broadcast schedules a finish
//! callback after a grace period. The task captures the instance id current
//! at scheduling time and only calls [`SurfaceHost::finish`] if that id is
//! still current when it fires, so start params arriving during the grace
//! period keep the surface alive.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use scopecast_core::{Controller, Observable, Scope, Subscription, WeakController, observers};
use tracing::debug;

use crate::broadcast::{
    ACTION_ENABLE_TOUCH_INPUT, ACTION_SCREEN_OFF, ACTION_STOP_WEB_CONTENT, BroadcastRegistrar,
    Intent, IntentFilter,
};
use crate::config::SurfaceConfig;
use crate::error::Result;
use crate::params::{Bundle, ContentUri, StartParams};
use crate::scheduler::Scheduler;

/// The platform object hosting the surface.
pub trait SurfaceHost<C> {
    /// Show `contents`. Closing the returned scope hides them.
    fn display(&self, contents: &C) -> Scope;

    /// Route volume keys to the media stream while contents are shown.
    fn set_volume_control_stream(&self) {}

    /// Take audio focus for `contents`.
    fn request_audio_focus(&self, contents: &C);

    /// The displayed contents went away.
    fn component_closed(&self, instance_id: Option<&str>);

    /// The surface should finish.
    fn finish(&self, uri: &ContentUri);
}

/// Mutable surface flags shared with observers.
#[derive(Debug, Default)]
struct SurfaceState {
    instance_id: RefCell<Option<String>>,
    remote_control: Cell<bool>,
    touch_input: Cell<bool>,
}

/// Collaborators captured by observers and deferred tasks.
struct Shared<C> {
    host: Rc<dyn SurfaceHost<C>>,
    broadcasts: Rc<dyn BroadcastRegistrar>,
    scheduler: Rc<dyn Scheduler>,
    config: SurfaceConfig,
    state: SurfaceState,
}

/// Finish the host after the grace period unless new start params arrive.
fn maybe_finish_later<C: 'static>(shared: &Rc<Shared<C>>, uri: &ContentUri) {
    debug!(%uri, "maybe finish later");
    let captured = shared.state.instance_id.borrow().clone();
    let task_shared = Rc::clone(shared);
    let uri = uri.clone();
    // Not cancelled on new start params; the instance id check below covers it.
    let _handle = shared.scheduler.post_delayed(
        shared.config.teardown_grace_period,
        Box::new(move || {
            let current = task_shared.state.instance_id.borrow().clone();
            if captured.is_some() && captured == current {
                task_shared.host.finish(&uri);
            } else {
                debug!(%uri, ?captured, ?current, "instance changed; not finishing");
            }
        }),
    );
}

/// Register a receiver for `action` that only fires for intents addressed to
/// `uri`.
fn receive_for_uri<C: 'static>(
    shared: &Rc<Shared<C>>,
    uri: &ContentUri,
    action: &'static str,
    on_match: impl Fn(&Rc<Shared<C>>, &ContentUri, &Intent) + 'static,
) -> Scope {
    let handler_shared = Rc::clone(shared);
    let uri = uri.clone();
    shared.broadcasts.register(
        IntentFilter::for_action(action),
        Rc::new(move |intent: &Intent| {
            debug!(action = intent.action(), uri = ?intent.uri(), "intent received");
            if !uri.matches(intent.uri()) {
                if handler_shared.config.log_broadcast_mismatches {
                    debug!(current = %uri, intent = ?intent.uri(), "intent for another uri");
                }
                return;
            }
            on_match(&handler_shared, &uri, intent);
        }),
    )
}

/// Lifecycle helper for a content surface.
///
/// Dropping the helper destroys it (see [`on_destroy`](Self::on_destroy)).
pub struct SurfaceHelper<C: 'static> {
    created: Controller<()>,
    has_uri: Controller<ContentUri>,
    contents: Controller<C>,
    shared: Rc<Shared<C>>,
    _subscriptions: Vec<Subscription>,
}

impl<C: 'static> SurfaceHelper<C> {
    pub fn new(
        host: Rc<dyn SurfaceHost<C>>,
        broadcasts: Rc<dyn BroadcastRegistrar>,
        scheduler: Rc<dyn Scheduler>,
        config: SurfaceConfig,
    ) -> Self {
        let created = Controller::with_label("surface.created");
        let has_uri = Controller::with_label("surface.has_uri");
        let contents = Controller::with_label("surface.contents");
        let shared = Rc::new(Shared {
            host,
            broadcasts,
            scheduler,
            config,
            state: SurfaceState::default(),
        });

        let mut subscriptions = Vec::new();

        // Screen turned off while a uri is active.
        subscriptions.push(has_uri.subscribe({
            let shared = Rc::clone(&shared);
            let contents = contents.downgrade();
            move |uri: &ContentUri| {
                let on_screen_off = Rc::clone(&shared);
                let contents = contents.clone();
                let uri = uri.clone();
                shared.broadcasts.register(
                    IntentFilter::for_action(ACTION_SCREEN_OFF),
                    Rc::new(move |_: &Intent| {
                        contents.reset();
                        maybe_finish_later(&on_screen_off, &uri);
                    }),
                )
            }
        }));

        // Requests to tear down the contents for this uri.
        subscriptions.push(has_uri.subscribe({
            let shared = Rc::clone(&shared);
            let contents = contents.downgrade();
            move |uri: &ContentUri| {
                let contents = contents.clone();
                receive_for_uri(&shared, uri, ACTION_STOP_WEB_CONTENT, move |shared, uri, _| {
                    contents.reset();
                    maybe_finish_later(shared, uri);
                })
            }
        }));

        // Touch input toggles for this uri.
        subscriptions.push(has_uri.subscribe({
            let shared = Rc::clone(&shared);
            move |uri: &ContentUri| {
                receive_for_uri(&shared, uri, ACTION_ENABLE_TOUCH_INPUT, |shared, _, intent| {
                    shared.state.touch_input.set(intent.is_touchable());
                })
            }
        }));

        // The host shows each new contents.
        subscriptions.push(contents.subscribe({
            let shared = Rc::clone(&shared);
            move |value: &C| shared.host.display(value)
        }));

        subscriptions.push(contents.subscribe({
            let shared = Rc::clone(&shared);
            move |value: &C| {
                shared.host.set_volume_control_stream();
                if !shared.state.remote_control.get() {
                    shared.host.request_audio_focus(value);
                }
                let closed = Rc::clone(&shared);
                Scope::new(move || {
                    let instance_id = closed.state.instance_id.borrow().clone();
                    closed.host.component_closed(instance_id.as_deref());
                })
            }
        }));

        // Destroyed while start params are live: drop the contents and uri.
        subscriptions.push(
            has_uri
                .and(&created.not())
                .map(|both| both.first.clone())
                .subscribe(observers::on_enter(destroy_cascade(
                    has_uri.downgrade(),
                    contents.downgrade(),
                ))),
        );

        created.set(());

        Self {
            created,
            has_uri,
            contents,
            shared,
            _subscriptions: subscriptions,
        }
    }

    /// Start (or restart) the surface with new parameters.
    pub fn on_new_start_params(&self, params: StartParams<C>) {
        let StartParams {
            uri,
            contents,
            remote_control,
            touch_input,
        } = params;
        let state = &self.shared.state;
        state.remote_control.set(remote_control);
        state.touch_input.set(touch_input);
        debug!(content_uri = %uri, "new start params");

        let instance_id = uri.instance_id().to_string();
        self.has_uri.set(uri);
        self.contents.set(contents);
        // Observers see the previous instance id while reacting to the new
        // contents.
        *state.instance_id.borrow_mut() = Some(instance_id);
    }

    /// Validate launch extras and start with them. Rejected extras leave the
    /// surface untouched.
    pub fn on_new_bundle(&self, bundle: Bundle<C>) -> Result<()> {
        let params = StartParams::from_bundle(bundle)?;
        self.on_new_start_params(params);
        Ok(())
    }

    /// Destroy the surface. Live start params are torn down through the
    /// destroy cascade; the helper should be dropped afterwards.
    pub fn on_destroy(&self) {
        self.created.reset();
    }

    #[must_use]
    pub fn instance_id(&self) -> Option<String> {
        self.shared.state.instance_id.borrow().clone()
    }

    #[must_use]
    pub fn is_touch_input_enabled(&self) -> bool {
        self.shared.state.touch_input.get()
    }

    #[must_use]
    pub fn is_remote_control_mode(&self) -> bool {
        self.shared.state.remote_control.get()
    }

    /// Uri of the current start params, if any.
    #[must_use]
    pub fn current_uri(&self) -> Option<ContentUri> {
        self.has_uri.get()
    }

    /// Whether contents are being displayed.
    #[must_use]
    pub fn has_contents(&self) -> bool {
        self.contents.is_active()
    }

    /// Whether the helper has not been destroyed yet.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created.is_active()
    }
}

fn destroy_cascade<C: 'static>(
    has_uri: WeakController<ContentUri>,
    contents: WeakController<C>,
) -> impl Fn(&ContentUri) + 'static {
    move |uri: &ContentUri| {
        debug!(%uri, "destroyed with live start params");
        contents.reset();
        has_uri.reset();
    }
}

impl<C: 'static> Drop for SurfaceHelper<C> {
    fn drop(&mut self) {
        self.created.reset();
    }
}

impl<C: 'static> fmt::Debug for SurfaceHelper<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHelper")
            .field("created", &self.created.is_active())
            .field("uri", &self.has_uri.get())
            .field("has_contents", &self.contents.is_active())
            .field("state", &self.shared.state)
            .finish()
    }
}

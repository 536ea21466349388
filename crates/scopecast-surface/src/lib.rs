#![forbid(unsafe_code)]

//! Content surface lifecycle on top of scopecast controllers.
//!
//! [`SurfaceHelper`] ties a displayed surface to the start parameters it was
//! launched with. Platform services are reached through narrow traits:
//!
//! - [`SurfaceHost`]: displays contents and receives lifecycle callbacks.
//! - [`BroadcastRegistrar`]: scoped broadcast receivers.
//! - [`Scheduler`]: cancellable delayed tasks.
//!
//! In-process implementations ([`LocalBroadcasts`], [`ManualScheduler`]) are
//! provided for embedding and tests.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod helper;
pub mod params;
pub mod scheduler;

pub use broadcast::{BroadcastRegistrar, Intent, IntentFilter, IntentHandler, LocalBroadcasts};
pub use config::SurfaceConfig;
pub use error::{ConfigError, Result, StartParamsError, SurfaceError};
pub use helper::{SurfaceHelper, SurfaceHost};
pub use params::{Bundle, ContentUri, StartParams};
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskHandle};

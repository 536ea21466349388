#![forbid(unsafe_code)]

//! Scopecast public facade crate.
//!
//! Re-exports the controller primitives and the surface lifecycle helper
//! under one dependency.

pub use scopecast_core::{
    CancelMode, Controller, Observable, Scope, Subscription, WeakController, observers,
};
pub use scopecast_surface::{SurfaceConfig, SurfaceHelper, SurfaceHost};

pub mod prelude {
    pub use scopecast_core as core;
    pub use scopecast_surface as surface;

    pub use scopecast_core::{Controller, Observable, Scope, Subscription};
}

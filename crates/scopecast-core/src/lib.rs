#![forbid(unsafe_code)]

//! Scoped reactive state.
//!
//! This crate provides the primitives the rest of scopecast is built on:
//!
//! - [`Controller`]: a single-slot cell. Setting a value activates every
//!   observer; resetting or replacing it closes the [`Scope`] each observer
//!   returned.
//! - [`Observable`]: the trait shared by controllers and derived signals.
//! - [`Subscription`]: RAII registration guard.
//! - Combinators ([`And`], [`Not`], [`Map`], [`Filter`]) that derive new
//!   signals from existing ones without storage of their own.
//!
//! # Architecture
//!
//! Everything here is single-threaded (`Rc<RefCell<..>>`), and all effects
//! are synchronous: when `set` or `reset` returns, every teardown and
//! activation it caused has run.
//!
//! # Example
//!
//! ```
//! use scopecast_core::{observers, Controller, Observable};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let created: Controller<()> = Controller::new();
//! let uri: Controller<String> = Controller::new();
//! let destroyed = Rc::new(Cell::new(false));
//!
//! let flag = Rc::clone(&destroyed);
//! let _cascade = uri
//!     .and(&created.not())
//!     .subscribe(observers::on_enter(move |_| flag.set(true)));
//!
//! created.set(());
//! uri.set("cast://app".into());
//! assert!(!destroyed.get());
//!
//! created.reset();
//! assert!(destroyed.get());
//! ```

mod logging;

pub mod combinators;
pub mod controller;
pub mod observable;
pub mod observers;
pub mod scope;
pub mod subscription;

pub use combinators::{And, Both, Filter, Map, Not};
pub use controller::{Controller, WeakController};
pub use observable::{Observable, ObserverFn, both_active, inactive_of};
pub use scope::Scope;
pub use subscription::{CancelMode, Subscription};

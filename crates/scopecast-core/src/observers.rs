#![forbid(unsafe_code)]

//! Observer adapters for side effects that only care about one edge of an
//! activation.

use std::rc::Rc;

use crate::scope::Scope;

/// Run `f` on activation; nothing on deactivation.
pub fn on_enter<T, F>(f: F) -> impl Fn(&T) -> Scope + 'static
where
    T: 'static,
    F: Fn(&T) + 'static,
{
    move |value: &T| {
        f(value);
        Scope::none()
    }
}

/// Run `f` with the activation value when it is deactivated.
pub fn on_exit<T, F>(f: F) -> impl Fn(&T) -> Scope + 'static
where
    T: Clone + 'static,
    F: Fn(&T) + 'static,
{
    let f = Rc::new(f);
    move |value: &T| {
        let f = Rc::clone(&f);
        let value = value.clone();
        Scope::new(move || f(&value))
    }
}

#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scopecast_core::{Controller, Observable, Scope, Subscription};

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    SetA(u8),
    ResetA,
    SetB(u8),
    ResetB,
    SubscribeA,
    SubscribeAnd,
    SubscribeNot,
    /// Subscriber that resets `b` whenever `a` activates.
    SubscribeReentrant,
    Unsubscribe(u8),
    Close(u8),
}

fn counted(open: &Rc<Cell<i64>>) -> Scope {
    open.set(open.get() + 1);
    let open = Rc::clone(open);
    Scope::new(move || open.set(open.get() - 1))
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    if ops.len() > 256 {
        return;
    }

    let a: Controller<u8> = Controller::with_label("fuzz.a");
    let b: Controller<u8> = Controller::with_label("fuzz.b");
    let open = Rc::new(Cell::new(0i64));
    let mut subs: Vec<Subscription> = Vec::new();

    for op in ops {
        match op {
            FuzzOp::SetA(v) => a.set(v),
            FuzzOp::ResetA => a.reset(),
            FuzzOp::SetB(v) => b.set(v),
            FuzzOp::ResetB => b.reset(),
            FuzzOp::SubscribeA => {
                let open = Rc::clone(&open);
                subs.push(a.subscribe(move |_| counted(&open)));
            }
            FuzzOp::SubscribeAnd => {
                let open = Rc::clone(&open);
                subs.push(a.and(&b).subscribe(move |_| counted(&open)));
            }
            FuzzOp::SubscribeNot => {
                let open = Rc::clone(&open);
                subs.push(a.not().subscribe(move |_| counted(&open)));
            }
            FuzzOp::SubscribeReentrant => {
                let b = b.downgrade();
                subs.push(a.subscribe(move |_| {
                    b.reset();
                    Scope::none()
                }));
            }
            FuzzOp::Unsubscribe(i) => {
                if !subs.is_empty() {
                    let idx = usize::from(i) % subs.len();
                    subs.swap_remove(idx).unsubscribe();
                }
            }
            FuzzOp::Close(i) => {
                if !subs.is_empty() {
                    let idx = usize::from(i) % subs.len();
                    subs.swap_remove(idx).close();
                }
            }
        }
        assert!(open.get() >= 0, "scope closed more than once");
    }

    a.reset();
    b.reset();
    subs.clear();
    assert_eq!(open.get(), 0, "scope leaked past teardown");
    assert_eq!(a.live_scope_count(), 0);
    assert_eq!(b.live_scope_count(), 0);
});

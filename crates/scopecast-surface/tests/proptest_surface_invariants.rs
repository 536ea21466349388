#![forbid(unsafe_code)]

//! Property-based invariant tests for `SurfaceHelper`.
//!
//! Arbitrary sequences of start params, broadcasts, clock advances and a
//! final destroy must keep:
//!
//! 1. Receivers registered iff a uri is current (three of them).
//! 2. Displayed contents balanced: every display is hidden exactly once.
//! 3. `finish` only for the uri whose instance is still current when the
//!    grace period expires.
//! 4. Nothing registered or displayed after destroy.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use scopecast_core::Scope;
use scopecast_surface::broadcast::{ACTION_SCREEN_OFF, ACTION_STOP_WEB_CONTENT};
use scopecast_surface::{
    ContentUri, Intent, LocalBroadcasts, ManualScheduler, StartParams, SurfaceConfig,
    SurfaceHelper, SurfaceHost,
};
use web_time::Duration;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Start(u8),
    ScreenOff,
    Stop(u8),
    Advance(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4).prop_map(Op::Start),
        1 => Just(Op::ScreenOff),
        2 => (0u8..4).prop_map(Op::Stop),
        3 => (0u16..500).prop_map(Op::Advance),
    ]
}

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Ledger {
    displayed: usize,
    hidden: usize,
    finished: Vec<String>,
}

#[derive(Clone, Default)]
struct LedgerHost(Rc<RefCell<Ledger>>);

impl SurfaceHost<u8> for LedgerHost {
    fn display(&self, _: &u8) -> Scope {
        self.0.borrow_mut().displayed += 1;
        let ledger = Rc::clone(&self.0);
        Scope::new(move || ledger.borrow_mut().hidden += 1)
    }

    fn request_audio_focus(&self, _: &u8) {}

    fn component_closed(&self, _: Option<&str>) {}

    fn finish(&self, uri: &ContentUri) {
        self.0.borrow_mut().finished.push(uri.to_string());
    }
}

fn uri(n: u8) -> String {
    format!("cast://app/session-{n}")
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn surface_lifecycle_invariants(ops in prop::collection::vec(op(), 0..48)) {
        let host = LedgerHost::default();
        let bus = LocalBroadcasts::new();
        let clock = ManualScheduler::new();
        let helper = SurfaceHelper::new(
            Rc::new(host.clone()),
            Rc::new(bus.clone()),
            Rc::new(clock.clone()),
            SurfaceConfig::default(),
        );

        for op in ops {
            let before = host.0.borrow().finished.len();
            match op {
                Op::Start(n) => {
                    let uri = ContentUri::parse(&uri(n)).expect("valid uri");
                    helper.on_new_start_params(StartParams::new(uri, n, false, false));
                }
                Op::ScreenOff => {
                    bus.send(&Intent::new(ACTION_SCREEN_OFF));
                }
                Op::Stop(n) => {
                    bus.send(&Intent::new(ACTION_STOP_WEB_CONTENT).with_uri(uri(n)));
                }
                Op::Advance(ms) => {
                    clock.advance(Duration::from_millis(u64::from(ms)));
                }
            }

            let expected_receivers = if helper.current_uri().is_some() { 3 } else { 0 };
            prop_assert_eq!(bus.receiver_count(), expected_receivers);

            let ledger = host.0.borrow();
            let live = usize::from(helper.has_contents());
            prop_assert_eq!(ledger.displayed - ledger.hidden, live);

            let instance = helper.instance_id();
            for finished in &ledger.finished[before..] {
                let finished = ContentUri::parse(finished).expect("valid uri");
                prop_assert_eq!(Some(finished.instance_id()), instance.as_deref());
            }
        }

        helper.on_destroy();
        prop_assert_eq!(bus.receiver_count(), 0);
        prop_assert!(helper.current_uri().is_none());
        let ledger = host.0.borrow();
        prop_assert_eq!(ledger.displayed, ledger.hidden);
    }
}

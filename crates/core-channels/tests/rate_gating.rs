//! Notification gating: the 100 ms per-channel floor, change
//! detection, and the guarantee that a burst's final value reaches
//! subscribers.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_audit::AuditLogger;
use core_channels::{ChannelHub, SimHost, SimPv, SubscriberCallbacks};
use core_pv::{PvProtocol, RequestType};

fn hub_with_host() -> (ChannelHub, SimHost) {
    let host = SimHost::new();
    let audit = Arc::new(AuditLogger::with_root(false, std::env::temp_dir()));
    (ChannelHub::with_sim_host(host.clone(), audit), host)
}

#[test]
fn hundred_updates_in_a_second_reach_widgets_at_most_eleven_times() {
    let (hub, host) = hub_with_host();
    host.define_pv("R4", SimPv::numeric(-1.0));

    let seen: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let callbacks = SubscriberCallbacks::new().on_value(move |data| {
        sink.borrow_mut().push(data.numeric_value);
    });
    let _handle = hub.subscribe("R4", RequestType::TimeDouble, 1, callbacks);

    let t0 = Instant::now();
    hub.dispatch(PvProtocol::Ca, t0); // connection
    hub.dispatch(PvProtocol::Ca, t0); // initial value (-1.0)
    seen.borrow_mut().clear();

    // 100 updates 0.0..=99.0 spread over one second.
    for i in 0..100u32 {
        host.set_number("R4", f64::from(i));
        hub.dispatch(PvProtocol::Ca, t0 + Duration::from_millis(u64::from(i) * 10));
    }
    // A trailing flush delivers the gated tail of the burst.
    hub.dispatch(PvProtocol::Ca, t0 + Duration::from_millis(1200));

    let delivered = seen.borrow();
    assert!(
        delivered.len() <= 11,
        "expected at most 11 deliveries, got {}: {delivered:?}",
        delivered.len()
    );
    assert_eq!(delivered.last().copied(), Some(99.0), "last value must not be lost");

    // Deliveries are strictly increasing: each one reads the cache,
    // so no stale value is ever replayed.
    for pair in delivered.windows(2) {
        assert!(pair[1] > pair[0], "{delivered:?}");
    }
}

#[test]
fn unchanged_values_are_not_redelivered() {
    let (hub, host) = hub_with_host();
    host.define_pv("STEADY", SimPv::numeric(4.0));

    let count = Rc::new(RefCell::new(0u32));
    let counter = count.clone();
    let callbacks = SubscriberCallbacks::new().on_value(move |_| {
        *counter.borrow_mut() += 1;
    });
    let _handle = hub.subscribe("STEADY", RequestType::TimeDouble, 1, callbacks);

    let mut now = Instant::now();
    hub.dispatch(PvProtocol::Ca, now);
    now += Duration::from_millis(200);
    hub.dispatch(PvProtocol::Ca, now);
    assert_eq!(*count.borrow(), 1);

    // Same value, same severity: cached but not fanned out.
    for _ in 0..5 {
        host.set_number("STEADY", 4.0);
        now += Duration::from_millis(200);
        hub.dispatch(PvProtocol::Ca, now);
    }
    assert_eq!(*count.borrow(), 1);

    // A severity change alone is a change.
    host.set_severity("STEADY", 2);
    now += Duration::from_millis(200);
    hub.dispatch(PvProtocol::Ca, now);
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn first_value_after_reconnect_bypasses_the_floor() {
    let (hub, host) = hub_with_host();
    host.define_pv("HOPPER", SimPv::numeric(1.0));

    let seen: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let callbacks = SubscriberCallbacks::new().on_value(move |data| {
        sink.borrow_mut().push(data.numeric_value);
    });
    let _handle = hub.subscribe("HOPPER", RequestType::TimeDouble, 1, callbacks);

    let t0 = Instant::now();
    hub.dispatch(PvProtocol::Ca, t0);
    hub.dispatch(PvProtocol::Ca, t0);
    assert_eq!(seen.borrow().as_slice(), &[1.0]);

    // Bounce the PV within the floor window; the post-reconnect value
    // still goes out because connection resets the gates.
    host.remove_pv("HOPPER");
    hub.dispatch(PvProtocol::Ca, t0 + Duration::from_millis(10));
    host.define_pv("HOPPER", SimPv::numeric(2.0));
    hub.dispatch(PvProtocol::Ca, t0 + Duration::from_millis(20));
    assert_eq!(seen.borrow().last().copied(), Some(2.0));
}

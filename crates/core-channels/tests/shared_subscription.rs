//! Channel sharing and fan-out behavior.
//!
//! Events produced while a dispatch is being handled (for example the
//! initial monitor value triggered by the subscribe that the
//! connection handler issues) surface on the next dispatch, so tests
//! pump the hub a few times with explicit instants.

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

fn pump(hub: &ChannelHub, now: Instant, times: usize) {
    for _ in 0..times {
        hub.dispatch(PvProtocol::Ca, now);
    }
}

fn recorder() -> (Rc<RefCell<Vec<f64>>>, SubscriberCallbacks) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let callbacks = SubscriberCallbacks::new().on_value(move |data| {
        sink.borrow_mut().push(data.numeric_value);
    });
    (seen, callbacks)
}

#[test]
fn two_meters_share_one_channel() {
    let (hub, host) = hub_with_host();
    host.define_pv("R1", SimPv::numeric(0.0));

    let (seen_a, callbacks_a) = recorder();
    let (seen_b, callbacks_b) = recorder();
    let handle_a = hub.subscribe("R1", RequestType::TimeDouble, 1, callbacks_a);
    let handle_b = hub.subscribe("R1", RequestType::TimeDouble, 1, callbacks_b);
    assert!(handle_a.is_valid() && handle_b.is_valid());

    assert_eq!(hub.unique_channel_count(), 1);
    assert_eq!(hub.total_subscription_count(), 2);

    let t0 = Instant::now();
    pump(&hub, t0, 2);
    assert_eq!(hub.connected_channel_count(), 1);

    host.set_number("R1", 42.0);
    pump(&hub, t0 + Duration::from_millis(200), 1);

    // Both or neither observe each value: no partial fan-out.
    assert_eq!(*seen_a.borrow(), *seen_b.borrow());
    assert_eq!(seen_a.borrow().last().copied(), Some(42.0));

    // Dropping one handle keeps the channel; dropping the last
    // destroys it.
    drop(handle_b);
    assert_eq!(hub.unique_channel_count(), 1);
    assert_eq!(hub.total_subscription_count(), 1);
    drop(handle_a);
    assert_eq!(hub.unique_channel_count(), 0);
}

#[test]
fn distinct_request_types_make_distinct_channels() {
    let (hub, host) = hub_with_host();
    host.define_pv("R2", SimPv::numeric(7.0));

    let (_seen_a, callbacks_a) = recorder();
    let _string_handle = hub.subscribe("R2", RequestType::TimeString, 1, callbacks_a);
    let (_seen_b, callbacks_b) = recorder();
    let _double_handle = hub.subscribe("R2", RequestType::TimeDouble, 1, callbacks_b);

    assert_eq!(hub.unique_channel_count(), 2);
}

#[test]
fn late_subscriber_gets_cached_state_synchronously() {
    let (hub, host) = hub_with_host();
    host.define_pv("READY", SimPv::numeric(5.5).with_severity(1));

    let (_seen, callbacks) = recorder();
    let _first = hub.subscribe("READY", RequestType::TimeDouble, 1, callbacks);
    pump(&hub, Instant::now(), 2); // connection, then initial value

    // Second subscriber arrives after connect: connection, access and
    // value replay before subscribe() returns.
    let events: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let conn_log = events.clone();
    let value_log = events.clone();
    let callbacks = SubscriberCallbacks::new()
        .on_value(move |data| {
            value_log
                .borrow_mut()
                .push(format!("value:{}", data.numeric_value));
        })
        .on_connection(move |connected, _| {
            conn_log.borrow_mut().push(format!("conn:{connected}"));
        });
    let _second = hub.subscribe("READY", RequestType::TimeDouble, 1, callbacks);

    let log = events.borrow();
    assert_eq!(log.first().map(String::as_str), Some("conn:true"));
    assert!(log.iter().any(|entry| entry == "value:5.5"));
}

#[test]
fn disconnect_clears_value_and_reconnect_redelivers() {
    let (hub, host) = hub_with_host();
    host.define_pv("FLAKY", SimPv::numeric(1.0));

    let connected_states: Rc<RefCell<Vec<(bool, bool)>>> = Rc::new(RefCell::new(Vec::new()));
    let conn_log = connected_states.clone();
    let (seen, callbacks) = recorder();
    let callbacks = callbacks.on_connection(move |connected, data| {
        conn_log.borrow_mut().push((connected, data.has_value));
    });
    let _handle = hub.subscribe("FLAKY", RequestType::TimeDouble, 1, callbacks);
    let t0 = Instant::now();
    pump(&hub, t0, 2);
    assert_eq!(seen.borrow().as_slice(), &[1.0]);

    host.remove_pv("FLAKY");
    pump(&hub, t0, 1);
    // connected == false implies has_value == false.
    assert_eq!(connected_states.borrow().last(), Some(&(false, false)));
    assert_eq!(hub.connected_channel_count(), 0);

    // Reconnection resets the gates, so the fresh value goes out
    // immediately even at the same instant.
    host.define_pv("FLAKY", SimPv::numeric(2.0));
    pump(&hub, t0, 2);
    assert_eq!(connected_states.borrow().last().map(|s| s.0), Some(true));
    assert_eq!(seen.borrow().last().copied(), Some(2.0));
}

#[test]
fn unsubscribe_during_fan_out_is_safe() {
    let (hub, host) = hub_with_host();
    host.define_pv("SELF", SimPv::numeric(0.0));

    let handle_cell: Rc<RefCell<Option<core_channels::SubscriptionHandle>>> =
        Rc::new(RefCell::new(None));
    let dropper = handle_cell.clone();
    let calls = Rc::new(RefCell::new(0u32));
    let counter = calls.clone();
    let callbacks = SubscriberCallbacks::new().on_value(move |_| {
        *counter.borrow_mut() += 1;
        // Drop our own subscription from inside the callback.
        if let Some(mut handle) = dropper.borrow_mut().take() {
            handle.reset();
        }
    });
    let handle = hub.subscribe("SELF", RequestType::TimeDouble, 1, callbacks);
    *handle_cell.borrow_mut() = Some(handle);

    pump(&hub, Instant::now(), 2);
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(
        hub.unique_channel_count(),
        0,
        "self-unsubscribe destroys the channel"
    );

    // Later traffic reaches nobody and must not panic.
    host.set_number("SELF", 9.0);
    pump(&hub, Instant::now(), 2);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn absent_pv_never_connects_but_subscribe_succeeds_structurally() {
    let (hub, _host) = hub_with_host();
    let (seen, callbacks) = recorder();
    let handle = hub.subscribe("NO:SUCH:PV", RequestType::TimeDouble, 1, callbacks);
    assert!(handle.is_valid());
    assert_eq!(hub.unique_channel_count(), 1);
    pump(&hub, Instant::now(), 5);
    assert_eq!(hub.connected_channel_count(), 0);
    assert!(seen.borrow().is_empty());
}

#[test]
fn empty_name_or_missing_value_callback_yields_invalid_handle() {
    let (hub, _host) = hub_with_host();
    let (_seen, callbacks) = recorder();
    let handle = hub.subscribe("   ", RequestType::TimeDouble, 1, callbacks);
    assert!(!handle.is_valid());

    let handle = hub.subscribe("PV", RequestType::TimeDouble, 1, SubscriberCallbacks::new());
    assert!(!handle.is_valid());
    assert_eq!(hub.unique_channel_count(), 0);
}

#[test]
fn enum_labels_enrich_the_string_value() {
    let (hub, host) = hub_with_host();
    host.define_pv(
        "MODE",
        SimPv::enumerated(1, vec!["Off".into(), "On".into()]),
    );

    let labels: Rc<RefCell<Vec<(u16, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = labels.clone();
    let callbacks = SubscriberCallbacks::new().on_value(move |data| {
        sink.borrow_mut()
            .push((data.enum_value, data.string_value.clone()));
    });
    let _handle = hub.subscribe("MODE", RequestType::TimeEnum, 1, callbacks);
    // Connection, then initial enum value, then control info with the
    // label list (each round-trips through the queue once).
    pump(&hub, Instant::now(), 3);

    let observed = labels.borrow();
    assert!(
        observed
            .iter()
            .any(|(ordinal, label)| *ordinal == 1 && label == "On"),
        "control info should backfill the enum label, saw {observed:?}"
    );
}

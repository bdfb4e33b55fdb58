//! Channel summaries and rate-window accounting for the statistics
//! view.

use std::sync::Arc;
use std::time::{Duration, Instant};

use core_audit::AuditLogger;
use core_channels::{ChannelHub, SimHost, SimPv, SubscriberCallbacks};
use core_pv::{AlarmSeverity, PvProtocol, RequestType};

fn hub_with_host() -> (ChannelHub, SimHost) {
    let host = SimHost::new();
    let audit = Arc::new(AuditLogger::with_root(false, std::env::temp_dir()));
    (ChannelHub::with_sim_host(host.clone(), audit), host)
}

#[test]
fn summaries_sort_case_insensitively_and_count_subscribers() {
    let (hub, host) = hub_with_host();
    host.define_pv("beta", SimPv::numeric(0.0).with_severity(2));
    host.define_pv("Alpha", SimPv::numeric(0.0).writable(true));

    let _one = hub.subscribe(
        "beta",
        RequestType::TimeDouble,
        1,
        SubscriberCallbacks::new().on_value(|_| {}),
    );
    let _two = hub.subscribe(
        "beta",
        RequestType::TimeDouble,
        1,
        SubscriberCallbacks::new().on_value(|_| {}),
    );
    let _three = hub.subscribe(
        "Alpha",
        RequestType::TimeDouble,
        1,
        SubscriberCallbacks::new().on_value(|_| {}),
    );

    let t0 = Instant::now();
    hub.dispatch(PvProtocol::Ca, t0);
    hub.dispatch(PvProtocol::Ca, t0);

    let summaries = hub.channel_summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].pv_name, "Alpha");
    assert_eq!(summaries[1].pv_name, "beta");
    assert!(summaries[0].writable);
    assert!(!summaries[1].writable);
    assert_eq!(summaries[1].subscriber_count, 2);
    assert_eq!(summaries[1].severity, AlarmSeverity::Major);
    assert!(summaries.iter().all(|summary| summary.connected));
}

#[test]
fn update_counters_reset_with_the_rate_window() {
    let (hub, host) = hub_with_host();
    host.define_pv("TICKER", SimPv::numeric(0.0));
    let _handle = hub.subscribe(
        "TICKER",
        RequestType::TimeDouble,
        1,
        SubscriberCallbacks::new().on_value(|_| {}),
    );

    let t0 = Instant::now();
    hub.dispatch(PvProtocol::Ca, t0);
    hub.dispatch(PvProtocol::Ca, t0);
    for i in 1..=3u64 {
        host.set_number("TICKER", i as f64);
        hub.dispatch(PvProtocol::Ca, t0 + Duration::from_millis(i * 200));
    }

    let summary = &hub.channel_summaries()[0];
    assert_eq!(summary.update_count, 4, "initial value plus three changes");

    assert_eq!(hub.elapsed_seconds_since_reset(), 0.0, "window not started yet");
    hub.reset_update_counters();
    assert_eq!(hub.channel_summaries()[0].update_count, 0);
    std::thread::sleep(Duration::from_millis(20));
    assert!(hub.elapsed_seconds_since_reset() > 0.0);

    host.set_number("TICKER", 99.0);
    hub.dispatch(PvProtocol::Ca, t0 + Duration::from_millis(2000));
    let summary = &hub.channel_summaries()[0];
    assert_eq!(summary.update_count, 1);
    assert!(summary.updates_per_second > 0.0);
}

//! Strip-chart and cartesian-plot buffers fed through live channels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use core_audit::AuditLogger;
use core_channels::{ChannelHub, SimHost, SimPv};
use core_model::{
    CartesianConfig, CartesianTrace, StripChartConfig, StripChartPen, StripChartUnits,
};
use core_pv::PvProtocol;
use core_runtime::{CartesianRuntime, StripChartRuntime};

fn harness() -> (ChannelHub, SimHost) {
    let host = SimHost::new();
    let audit = Arc::new(AuditLogger::with_root(false, std::env::temp_dir()));
    (ChannelHub::with_sim_host(host.clone(), audit), host)
}

fn pump(hub: &ChannelHub, base: Instant, step: &mut u64) {
    *step += 1;
    hub.dispatch(PvProtocol::Ca, base + Duration::from_millis(*step * 200));
}

#[test]
fn strip_chart_samples_latest_pen_values_into_rings() {
    let (hub, host) = harness();
    host.define_pv("RING:I", SimPv::numeric(100.0));
    host.define_pv("RING:LT", SimPv::numeric(10.0));

    let mut chart = StripChartRuntime::new(
        StripChartConfig {
            period: 4.0,
            units: StripChartUnits::Seconds,
            pens: vec![
                StripChartPen {
                    channel: "RING:I".into(),
                    ..StripChartPen::default()
                },
                StripChartPen {
                    channel: "RING:LT".into(),
                    ..StripChartPen::default()
                },
            ],
            ..StripChartConfig::default()
        },
        Duration::from_secs(1),
    );
    chart.start(&hub);
    assert_eq!(chart.pen_count(), 2);
    assert_eq!(chart.ring_capacity(), 4);

    let base = Instant::now();
    let mut step = 0;
    pump(&hub, base, &mut step);
    pump(&hub, base, &mut step);

    // The chart samples on its own clock, not per event.
    chart.sample();
    host.set_number("RING:I", 101.0);
    pump(&hub, base, &mut step);
    chart.sample();
    chart.sample();

    assert_eq!(chart.pen_samples(0), vec![100.0, 101.0, 101.0]);
    assert_eq!(chart.pen_samples(1), vec![10.0, 10.0, 10.0]);

    // The ring wraps once the span fills.
    for i in 0..4 {
        host.set_number("RING:I", 200.0 + f64::from(i));
        pump(&hub, base, &mut step);
        chart.sample();
    }
    let samples = chart.pen_samples(0);
    assert_eq!(samples.len(), 4);
    assert_eq!(samples.last().copied(), Some(203.0));
}

#[test]
fn cartesian_array_channels_replace_trace_buffers() {
    let (hub, host) = harness();
    host.define_pv("ORBIT:X", SimPv::numeric_array(vec![1.0, 2.0, 3.0]));
    host.define_pv("ORBIT:Y", SimPv::numeric_array(vec![4.0, 5.0, 6.0]));

    let mut plot = CartesianRuntime::new(CartesianConfig {
        count: "64".into(),
        traces: vec![CartesianTrace {
            x_channel: "ORBIT:X".into(),
            y_channel: "ORBIT:Y".into(),
            color: 14,
        }],
        ..CartesianConfig::default()
    });
    plot.start(&hub);
    let base = Instant::now();
    let mut step = 0;
    pump(&hub, base, &mut step);
    pump(&hub, base, &mut step);

    let trace = plot.trace(0);
    assert_eq!(trace.xs, vec![1.0, 2.0, 3.0]);
    assert_eq!(trace.ys, vec![4.0, 5.0, 6.0]);

    host.set_numbers("ORBIT:X", vec![7.0, 8.0]);
    pump(&hub, base, &mut step);
    let trace = plot.trace(0);
    assert_eq!(trace.xs, vec![7.0, 8.0], "arrays replace, not append");
    assert_eq!(trace.ys, vec![4.0, 5.0, 6.0]);
}

#[test]
fn cartesian_scalar_channels_append_with_a_cap() {
    let (hub, host) = harness();
    host.define_pv("T", SimPv::numeric(0.0));

    let mut plot = CartesianRuntime::new(CartesianConfig {
        count: "3".into(),
        traces: vec![CartesianTrace {
            x_channel: String::new(),
            y_channel: "T".into(),
            color: 14,
        }],
        ..CartesianConfig::default()
    });
    plot.start(&hub);
    let base = Instant::now();
    let mut step = 0;
    pump(&hub, base, &mut step);
    pump(&hub, base, &mut step);

    for value in [1.0, 2.0, 3.0] {
        host.set_number("T", value);
        pump(&hub, base, &mut step);
    }
    let trace = plot.trace(0);
    assert!(trace.xs.is_empty());
    // Oldest points fall off once the cap is reached.
    assert_eq!(trace.ys, vec![1.0, 2.0, 3.0]);

    host.set_number("T", 4.0);
    pump(&hub, base, &mut step);
    assert_eq!(plot.trace(0).ys, vec![2.0, 3.0, 4.0]);
}

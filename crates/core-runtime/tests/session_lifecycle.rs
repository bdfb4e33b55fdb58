//! Whole-display execute-mode lifecycle.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_audit::AuditLogger;
use core_channels::{ChannelHub, SimHost, SimPv};
use core_colors::{LimitSource, PvLimits};
use core_model::{
    BasicAttrs, Display, GraphicAttrs, MeterConfig, Rect, SliderConfig, TextConfig, Widget,
    WidgetKind,
};
use core_pv::PvProtocol;
use core_render::UpdateCoordinator;
use core_runtime::{DisplaySession, RuntimeContext, WidgetRuntime};

fn context() -> (RuntimeContext, SimHost) {
    let host = SimHost::new();
    let audit = Arc::new(AuditLogger::with_root(false, std::env::temp_dir()));
    let ctx = RuntimeContext {
        hub: ChannelHub::with_sim_host(host.clone(), audit),
        coordinator: Rc::new(RefCell::new(UpdateCoordinator::new())),
    };
    (ctx, host)
}

fn sample_display() -> Display {
    Display {
        file_name: "sample.adl".into(),
        widgets: vec![
            Widget::new(
                Rect::new(0, 0, 50, 20),
                WidgetKind::Text(TextConfig {
                    text: "Beam current".into(),
                    ..TextConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(0, 30, 80, 80),
                WidgetKind::Meter(MeterConfig {
                    channel: "BEAM:I".into(),
                    ..MeterConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(0, 120, 120, 30),
                WidgetKind::Slider(SliderConfig {
                    channel: "BEAM:SET".into(),
                    ..SliderConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(100, 0, 40, 20),
                WidgetKind::Rectangle(BasicAttrs::default(), GraphicAttrs::default()),
            ),
        ],
        ..Display::default()
    }
}

#[test]
fn execute_mode_subscribes_only_what_needs_channels() {
    let (ctx, host) = context();
    host.define_pv("BEAM:I", SimPv::numeric(101.5).with_limits(0.0, 200.0, 1));
    host.define_pv("BEAM:SET", SimPv::numeric(100.0).writable(true));

    let mut session = DisplaySession::new(sample_display(), ctx.clone(), 1);
    assert_eq!(session.widget_count(), 4);
    assert!(!session.is_executing());
    assert_eq!(ctx.hub.unique_channel_count(), 0);

    session.set_execute(true);
    assert!(session.is_executing());
    // Static text and rectangle stay off the network.
    assert_eq!(ctx.hub.unique_channel_count(), 2);

    let t0 = Instant::now();
    for i in 0..4u64 {
        ctx.hub
            .dispatch(PvProtocol::Ca, t0 + Duration::from_millis(i * 200));
    }

    let Some(WidgetRuntime::Monitor(meter)) = session.runtime_at(&[1]) else {
        panic!("expected the meter runtime");
    };
    let state = meter.state();
    assert!(state.connected);
    assert_eq!(state.value, 101.5);
    // Channel-sourced limits resolved from control info.
    assert_eq!(state.limits.low, 0.0);
    assert_eq!(state.limits.high, 200.0);
    assert_eq!(state.limits.precision, 1);

    session.set_execute(false);
    assert_eq!(ctx.hub.unique_channel_count(), 0);
    let Some(WidgetRuntime::Monitor(meter)) = session.runtime_at(&[1]) else {
        panic!("expected the meter runtime");
    };
    assert!(!meter.state().connected, "stop resets to disconnected");
}

#[test]
fn user_limits_ignore_control_info() {
    let (ctx, host) = context();
    host.define_pv("VAL", SimPv::numeric(1.0).with_limits(-100.0, 100.0, 5));

    let display = Display {
        widgets: vec![Widget::new(
            Rect::new(0, 0, 40, 40),
            WidgetKind::Meter(MeterConfig {
                channel: "VAL".into(),
                limits: PvLimits {
                    low_source: LimitSource::User,
                    low_default: -1.0,
                    high_source: LimitSource::User,
                    high_default: 1.0,
                    precision_source: LimitSource::Default,
                    precision_default: 2,
                    ..PvLimits::default()
                },
                ..MeterConfig::default()
            }),
        )],
        ..Display::default()
    };
    let mut session = DisplaySession::new(display, ctx.clone(), 1);
    session.set_execute(true);
    let t0 = Instant::now();
    for i in 0..3u64 {
        ctx.hub
            .dispatch(PvProtocol::Ca, t0 + Duration::from_millis(i * 200));
    }

    let Some(WidgetRuntime::Monitor(meter)) = session.runtime_at(&[0]) else {
        panic!("expected the meter runtime");
    };
    let limits = meter.state().limits;
    assert_eq!(limits.low, -1.0);
    assert_eq!(limits.high, 1.0);
    assert_eq!(limits.precision, 2);
}

#[test]
fn monitor_on_a_string_field_presents_as_disconnected() {
    let (ctx, host) = context();
    host.define_pv("LABEL", SimPv::text("hello"));

    let display = Display {
        widgets: vec![Widget::new(
            Rect::new(0, 0, 40, 40),
            WidgetKind::Meter(MeterConfig {
                channel: "LABEL".into(),
                ..MeterConfig::default()
            }),
        )],
        ..Display::default()
    };
    let mut session = DisplaySession::new(display, ctx.clone(), 1);
    session.set_execute(true);
    for _ in 0..3 {
        ctx.hub.dispatch(PvProtocol::Ca, Instant::now());
    }

    let Some(WidgetRuntime::Monitor(meter)) = session.runtime_at(&[0]) else {
        panic!("expected the meter runtime");
    };
    let state = meter.state();
    assert!(!state.connected);
    assert_eq!(state.severity.as_i16(), 3);
    // The structural channel stays alive awaiting a server change.
    assert_eq!(ctx.hub.unique_channel_count(), 1);
}

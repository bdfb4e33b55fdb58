//! Heatmap buffers sized from PV-published dimensions, including the
//! PVA structure path used by camera geometry.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use core_audit::AuditLogger;
use core_channels::{ChannelHub, SimHost, SimPv};
use core_model::HeatmapConfig;
use core_pv::PvProtocol;
use core_render::UpdateCoordinator;
use core_runtime::HeatmapRuntime;
use serde_json::json;

fn harness() -> (ChannelHub, SimHost, Rc<RefCell<UpdateCoordinator>>) {
    let host = SimHost::new();
    let audit = Arc::new(AuditLogger::with_root(false, std::env::temp_dir()));
    (
        ChannelHub::with_sim_host(host.clone(), audit),
        host,
        Rc::new(RefCell::new(UpdateCoordinator::new())),
    )
}

#[test]
fn literal_dimensions_size_the_buffer() {
    let (hub, host, _coordinator) = harness();
    host.define_pv("CAM:DATA", SimPv::numeric_array(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));

    let mut heatmap = HeatmapRuntime::new(HeatmapConfig {
        data_channel: "CAM:DATA".into(),
        width_source: "3".into(),
        height_source: "2".into(),
        ..HeatmapConfig::default()
    });
    heatmap.start(&hub);
    for _ in 0..2 {
        hub.dispatch(PvProtocol::Ca, Instant::now());
    }

    let state = heatmap.state();
    assert_eq!((state.width, state.height), (3, 2));
    assert_eq!(state.cells, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn pva_dimension_source_resizes_at_runtime() {
    let (hub, host, _coordinator) = harness();
    host.define_pv("CAM:DATA", SimPv::numeric_array(vec![0.5; 4]));
    host.define_pv(
        "Camera",
        SimPv::structure(json!({
            "dimension": [ { "size": 2 }, { "size": 2 } ]
        })),
    );

    let mut heatmap = HeatmapRuntime::new(HeatmapConfig {
        data_channel: "CAM:DATA".into(),
        width_source: "pva://Camera.dimension[0].size".into(),
        height_source: "pva://Camera.dimension[1].size".into(),
        ..HeatmapConfig::default()
    });
    heatmap.start(&hub);
    for _ in 0..3 {
        hub.dispatch(PvProtocol::Ca, Instant::now());
        hub.dispatch(PvProtocol::Pva, Instant::now());
    }

    let state = heatmap.state();
    assert_eq!((state.width, state.height), (2, 2));
    assert_eq!(state.cells, vec![0.5; 4]);

    // A camera reconfiguration reaches the buffer.
    host.set_structure(
        "Camera",
        json!({ "dimension": [ { "size": 4 }, { "size": 1 } ] }),
    );
    for i in 1..=2u64 {
        hub.dispatch(
            PvProtocol::Pva,
            Instant::now() + std::time::Duration::from_millis(i * 200),
        );
    }
    let state = heatmap.state();
    assert_eq!((state.width, state.height), (4, 1));
    assert_eq!(state.cells.len(), 4);
}

#[test]
fn data_without_dimensions_stays_empty() {
    let (hub, host, _coordinator) = harness();
    host.define_pv("CAM:DATA", SimPv::numeric_array(vec![1.0, 2.0]));

    let mut heatmap = HeatmapRuntime::new(HeatmapConfig {
        data_channel: "CAM:DATA".into(),
        ..HeatmapConfig::default()
    });
    heatmap.start(&hub);
    for _ in 0..2 {
        hub.dispatch(PvProtocol::Ca, Instant::now());
    }
    let state = heatmap.state();
    assert_eq!((state.width, state.height), (0, 0));
    assert!(state.cells.is_empty());
}

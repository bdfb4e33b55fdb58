//! Property-based checks on the adaptive throttle.

use std::time::{Duration, Instant};

use core_render::{
    UpdateCoordinator, WidgetId, BASE_INTERVAL_MS, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
};
use proptest::prelude::*;

proptest! {
    // Whatever lateness pattern arrives, the interval stays inside
    // [base, ceiling] and never below the floor.
    #[test]
    fn interval_stays_bounded(latenesses in prop::collection::vec(0u64..400, 1..300)) {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        c.tick(t); // arm
        for lateness in latenesses {
            t += c.current_interval() + Duration::from_millis(lateness);
            c.tick(t);
            let interval = c.current_interval().as_millis() as u64;
            prop_assert!(interval >= BASE_INTERVAL_MS.min(MIN_INTERVAL_MS));
            prop_assert!(interval >= BASE_INTERVAL_MS);
            prop_assert!(interval <= MAX_INTERVAL_MS);
        }
    }

    // Every requested widget is repainted exactly once per pass, no
    // matter how requests interleave with passes.
    #[test]
    fn each_request_repaints_once(ids in prop::collection::vec(0u64..20, 0..100)) {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        c.tick(t);
        for id in &ids {
            c.request_update(WidgetId(*id));
        }
        t += c.current_interval();
        let out = c.tick(t);
        prop_assert!(out.fired);
        // Drained set is the deduplicated request set, order of first
        // request preserved.
        let mut expected = Vec::new();
        for id in &ids {
            if !expected.contains(&WidgetId(*id)) {
                expected.push(WidgetId(*id));
            }
        }
        prop_assert_eq!(out.repaint, expected);
        // Nothing left behind.
        t += c.current_interval();
        prop_assert!(c.tick(t).repaint.is_empty());
    }
}

//! Property tests for the spot pools, fade ramps and pointer bounds

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;

use lamco_pointer::pointer::animation::ramp;
use lamco_pointer::pointer::spot::{SpotManager, SpotPolicy};
use lamco_pointer::pointer::state::PointerState;
use lamco_pointer::pointer::{IdBits, PointerCoords, Viewport};

fn policy(max_spots: usize) -> SpotPolicy {
    SpotPolicy {
        max_spots,
        max_recycled: 4,
        pressure_scales: false,
        min_scale: 0.5,
    }
}

proptest! {
    #[test]
    fn pool_never_exceeds_capacity(
        max_spots in 1usize..8,
        frames in prop::collection::vec((any::<u32>(), 0u64..150), 1..40),
    ) {
        let mut manager = SpotManager::new(policy(max_spots));
        let coords: Vec<PointerCoords> = (0..32)
            .map(|i| PointerCoords::new(i as f32, i as f32, 1.0))
            .collect();
        let index: Vec<u32> = (0..32).collect();

        for (mask, fade_ms) in frames {
            manager.upsert(0, &coords, &index, IdBits::from_mask(mask));
            manager.advance_fades(Duration::from_millis(fade_ms), Duration::from_millis(200));

            let spots = manager.spots(0);
            prop_assert!(spots.len() <= max_spots);

            let live: Vec<u32> = spots.iter().filter(|s| !s.is_fading()).map(|s| s.id()).collect();
            let unique: HashSet<u32> = live.iter().copied().collect();
            prop_assert_eq!(unique.len(), live.len());
        }
    }

    #[test]
    fn fade_is_monotonic_without_overshoot(
        start in 0.0f32..=1.0,
        fade_in in any::<bool>(),
        steps in prop::collection::vec(0u64..200, 1..50),
    ) {
        let target = if fade_in { 1.0 } else { 0.0 };
        let duration = Duration::from_millis(500);
        let mut alpha = start;

        for step in steps {
            let next = ramp(alpha, target, Duration::from_millis(step), duration);
            if fade_in {
                prop_assert!(next >= alpha);
            } else {
                prop_assert!(next <= alpha);
            }
            prop_assert!((0.0..=1.0).contains(&next));
            alpha = next;
        }
    }

    #[test]
    fn position_stays_in_viewport(
        width in 1i32..4000,
        height in 1i32..4000,
        moves in prop::collection::vec((-5000.0f32..5000.0, -5000.0f32..5000.0), 1..30),
    ) {
        let mut state = PointerState::new(1000);
        state.set_viewport(Viewport::new(0, 0, 0, width, height));
        let bounds = state.bounds().unwrap();

        for (dx, dy) in moves {
            state.move_by(dx, dy);
            let (x, y) = state.position();
            prop_assert!(bounds.contains(x, y));
        }
    }
}

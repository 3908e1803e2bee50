//! Touch Spot Pools
//!
//! Each display has an ordered pool of spots (oldest first) bounded by
//! `max_spots`. A spot that is no longer referenced by an update gets the
//! [`INVALID_SPOT_ID`] sentinel and fades out; the scheduler removes it when
//! its alpha reaches zero.
//!
//! Sprite handles leaving a spot are *retired*: the render pass hides them and
//! then either parks them in the bounded recycled list or releases them to
//! the sprite controller.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, trace};

use super::animation::ramp;
use super::error::PointerError;
use super::sprite::{SpriteHandle, SpriteId, BASE_LAYER_SPOT};
use super::types::{DisplayId, IdBits, PointerCoords};

/// Id carried by a spot that is fading out and no longer addressable
pub const INVALID_SPOT_ID: u32 = u32::MAX;

/// Which spot bitmap to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpotIcon {
    /// Contact hovering (zero pressure)
    Hover,
    /// Contact touching
    Touch,
}

/// One touch indicator
#[derive(Debug)]
pub struct Spot {
    id: u32,
    arrival: u64,
    sprite: Option<SpriteHandle>,
    alpha: f32,
    scale: f32,
    x: f32,
    y: f32,
    layer: i32,
    icon: SpotIcon,
    last_icon: Option<SpotIcon>,
    dirty: bool,
}

impl Spot {
    fn new(id: u32, arrival: u64, sprite: Option<SpriteHandle>) -> Self {
        Self {
            id,
            arrival,
            sprite,
            alpha: 1.0,
            scale: 1.0,
            x: 0.0,
            y: 0.0,
            layer: BASE_LAYER_SPOT + id as i32,
            icon: SpotIcon::Hover,
            last_icon: None,
            dirty: true,
        }
    }

    /// Touch id, or [`INVALID_SPOT_ID`] while fading out
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Arrival sequence; lower is older
    pub fn arrival(&self) -> u64 {
        self.arrival
    }

    /// Whether the spot is fading out for release
    pub fn is_fading(&self) -> bool {
        self.id == INVALID_SPOT_ID
    }

    /// Current opacity
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Current scale
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Current position
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Sprite layer
    pub fn layer(&self) -> i32 {
        self.layer
    }

    /// Desired icon
    pub fn icon(&self) -> SpotIcon {
        self.icon
    }

    /// Rendering handle, if one has been acquired
    pub fn sprite_id(&self) -> Option<SpriteId> {
        self.sprite.as_ref().map(SpriteHandle::id)
    }

    /// Record new contact state
    fn update(&mut self, coords: &PointerCoords, icon: SpotIcon, scale: f32) {
        self.x = coords.x;
        self.y = coords.y;
        self.icon = icon;
        self.scale = scale;
        self.layer = BASE_LAYER_SPOT + self.id as i32;
        self.dirty = true;
    }

    /// Icon to push in the next render pass, if it differs from the last one
    pub(crate) fn take_icon_change(&mut self) -> Option<SpotIcon> {
        if self.last_icon == Some(self.icon) {
            return None;
        }
        self.last_icon = Some(self.icon);
        Some(self.icon)
    }

    /// Forget the last applied icon so the next pass re-sends it
    pub(crate) fn invalidate(&mut self) {
        self.last_icon = None;
        self.dirty = true;
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Behaviour knobs for spot pools
#[derive(Debug, Clone, Copy)]
pub struct SpotPolicy {
    /// Maximum spots per display, fading ones included
    pub max_spots: usize,
    /// Maximum parked sprite handles
    pub max_recycled: usize,
    /// Scale spots by contact pressure
    pub pressure_scales: bool,
    /// Lower bound for pressure scaling
    pub min_scale: f32,
}

/// Outcome of a spot update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpotChanges {
    /// Spots created
    pub created: usize,
    /// Spots that started fading out
    pub fading: usize,
    /// Spots evicted to make room
    pub evicted: usize,
    /// Ids skipped because the update had no coordinates for them
    pub skipped: usize,
}

impl SpotChanges {
    /// Whether the fade animation must run
    pub fn needs_animation(&self) -> bool {
        self.fading > 0
    }
}

/// Per-display spot pools plus the recycled handle list
#[derive(Debug)]
pub struct SpotManager {
    policy: SpotPolicy,
    pools: BTreeMap<DisplayId, Vec<Spot>>,
    recycled: Vec<SpriteHandle>,
    retired: Vec<SpriteHandle>,
    next_arrival: u64,
}

impl SpotManager {
    /// Create empty pools
    pub fn new(policy: SpotPolicy) -> Self {
        Self {
            policy,
            pools: BTreeMap::new(),
            recycled: Vec::with_capacity(policy.max_recycled),
            retired: Vec::new(),
            next_arrival: 0,
        }
    }

    /// Spots on a display, oldest first
    pub fn spots(&self, display_id: DisplayId) -> &[Spot] {
        self.pools.get(&display_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Displays that currently have spots
    pub fn displays(&self) -> impl Iterator<Item = DisplayId> + '_ {
        self.pools.keys().copied()
    }

    /// Live (non-fading) spot with the given id
    pub fn spot(&self, display_id: DisplayId, id: u32) -> Option<&Spot> {
        self.spots(display_id).iter().find(|s| s.id == id && !s.is_fading())
    }

    /// Number of parked handles
    pub fn recycled_len(&self) -> usize {
        self.recycled.len()
    }

    /// Apply one frame of touch state to a display
    ///
    /// Every id in `id_bits` with coordinates ends up as a live spot at those
    /// coordinates; every other live spot starts fading out.
    pub fn upsert(
        &mut self,
        display_id: DisplayId,
        coords: &[PointerCoords],
        id_to_index: &[u32],
        id_bits: IdBits,
    ) -> SpotChanges {
        let mut changes = SpotChanges::default();
        let mut spots = self.pools.remove(&display_id).unwrap_or_default();

        // Lifted contacts fade first so eviction never picks a contact still down
        for spot in spots.iter_mut() {
            if !spot.is_fading() && !id_bits.has(spot.id) {
                Self::begin_fade(spot);
                changes.fading += 1;
            }
        }

        for id in id_bits.iter() {
            let Some(contact) = id_to_index
                .get(id as usize)
                .and_then(|&index| coords.get(index as usize))
            else {
                trace!("{} has no coordinates, skipping", PointerError::InvalidSpotId(id));
                changes.skipped += 1;
                continue;
            };

            let icon = if contact.pressure > 0.0 {
                SpotIcon::Touch
            } else {
                SpotIcon::Hover
            };
            let scale = if self.policy.pressure_scales {
                contact.pressure.clamp(self.policy.min_scale, 1.0)
            } else {
                1.0
            };

            let index = match spots.iter().position(|s| s.id == id) {
                Some(index) => index,
                None => {
                    changes.evicted += self.make_room(&mut spots);
                    let sprite = self.recycled.pop();
                    spots.push(Spot::new(id, self.next_arrival, sprite));
                    self.next_arrival += 1;
                    changes.created += 1;
                    spots.len() - 1
                }
            };
            spots[index].update(contact, icon, scale);
        }

        if !spots.is_empty() {
            self.pools.insert(display_id, spots);
        }

        if changes != SpotChanges::default() {
            debug!("Spots on display {}: {:?}", display_id, changes);
        }
        changes
    }

    /// Fade out and release every live spot on one display
    pub fn release_display(&mut self, display_id: DisplayId) -> usize {
        self.pools
            .get_mut(&display_id)
            .map(|spots| {
                spots
                    .iter_mut()
                    .filter(|s| !s.is_fading())
                    .map(Self::begin_fade)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Fade out and release every live spot on every display
    pub fn release_all(&mut self) -> usize {
        self.pools
            .values_mut()
            .flat_map(|spots| spots.iter_mut())
            .filter(|s| !s.is_fading())
            .map(Self::begin_fade)
            .count()
    }

    /// Advance fading spots; returns whether any is still fading
    pub fn advance_fades(&mut self, elapsed: Duration, fade_duration: Duration) -> bool {
        let mut keep_animating = false;
        let mut retired = Vec::new();

        self.pools.retain(|_, spots| {
            spots.retain_mut(|spot| {
                if !spot.is_fading() {
                    return true;
                }
                spot.alpha = ramp(spot.alpha, 0.0, elapsed, fade_duration);
                if spot.alpha <= 0.0 {
                    retired.extend(spot.sprite.take());
                    return false;
                }
                spot.dirty = true;
                keep_animating = true;
                true
            });
            !spots.is_empty()
        });

        self.retired.extend(retired);
        keep_animating
    }

    /// Number of spots that need a sprite handle
    pub fn missing_handles(&self) -> usize {
        self.pools
            .values()
            .flat_map(|spots| spots.iter())
            .filter(|s| s.sprite.is_none())
            .count()
    }

    /// Hand freshly acquired sprites to spots that lack one, oldest first
    ///
    /// Handles nobody needs any more are retired.
    pub fn install_handles(&mut self, handles: Vec<SpriteHandle>) {
        let mut handles = handles.into_iter();
        for spot in self.pools.values_mut().flat_map(|spots| spots.iter_mut()) {
            if spot.sprite.is_none() {
                match handles.next() {
                    Some(handle) => {
                        spot.sprite = Some(handle);
                        spot.invalidate();
                    }
                    None => break,
                }
            }
        }
        self.retired.extend(handles);
    }

    /// Take handles waiting to be hidden
    pub fn take_retired(&mut self) -> Vec<SpriteHandle> {
        std::mem::take(&mut self.retired)
    }

    /// Whether handles are waiting to be hidden
    pub fn has_retired(&self) -> bool {
        !self.retired.is_empty()
    }

    /// Park hidden handles for reuse; returns those that did not fit
    pub fn recycle(&mut self, handles: Vec<SpriteHandle>) -> Vec<SpriteHandle> {
        let mut overflow = Vec::new();
        for handle in handles {
            if self.recycled.len() < self.policy.max_recycled {
                self.recycled.push(handle);
            } else {
                overflow.push(handle);
            }
        }
        overflow
    }

    /// Take every parked handle
    pub fn drain_recycled(&mut self) -> Vec<SpriteHandle> {
        std::mem::take(&mut self.recycled)
    }

    /// Mutable spots, for the render pass
    pub(crate) fn spots_mut(&mut self) -> impl Iterator<Item = (DisplayId, &mut Spot)> + '_ {
        self.pools
            .iter_mut()
            .flat_map(|(&display_id, spots)| spots.iter_mut().map(move |s| (display_id, s)))
    }

    /// Re-send everything about the spot holding `sprite`
    pub(crate) fn invalidate_sprite(&mut self, sprite: SpriteId) {
        if let Some((_, spot)) = self.spots_mut().find(|(_, s)| s.sprite_id() == Some(sprite)) {
            spot.invalidate();
        }
    }

    /// Evict until there is room for one more spot; returns evictions
    fn make_room(&mut self, spots: &mut Vec<Spot>) -> usize {
        let capacity = self.policy.max_spots.max(1);
        let mut evicted = 0;
        while spots.len() >= capacity {
            let victim = match Self::oldest_fading(spots) {
                Some(index) => index,
                None => 0,
            };
            let spot = spots.remove(victim);
            debug!(
                "Evicting spot (id={}, fading={}) to stay within {} spots",
                spot.id,
                spot.is_fading(),
                capacity
            );
            self.retired.extend(spot.sprite);
            evicted += 1;
        }
        evicted
    }

    /// Index of the oldest fading spot
    ///
    /// Arrival order is total, so ties cannot occur between live entries.
    fn oldest_fading(spots: &[Spot]) -> Option<usize> {
        spots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_fading())
            .min_by_key(|(_, s)| s.arrival)
            .map(|(index, _)| index)
    }

    fn begin_fade(spot: &mut Spot) {
        spot.id = INVALID_SPOT_ID;
        spot.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SpotPolicy {
        SpotPolicy {
            max_spots: 3,
            max_recycled: 2,
            pressure_scales: false,
            min_scale: 0.5,
        }
    }

    fn coords(n: usize) -> Vec<PointerCoords> {
        (0..n)
            .map(|i| PointerCoords::new(10.0 * i as f32, 20.0 * i as f32, 1.0))
            .collect()
    }

    /// Identity index map: id n uses coords[n]
    fn identity() -> Vec<u32> {
        (0..32).collect()
    }

    fn live_ids(manager: &SpotManager, display: DisplayId) -> Vec<u32> {
        manager
            .spots(display)
            .iter()
            .filter(|s| !s.is_fading())
            .map(Spot::id)
            .collect()
    }

    #[test]
    fn test_upsert_creates_and_positions() {
        let mut manager = SpotManager::new(policy());
        let changes = manager.upsert(0, &coords(3), &identity(), IdBits::with_ids(&[1, 2]));

        assert_eq!(changes.created, 2);
        assert_eq!(live_ids(&manager, 0), vec![1, 2]);
        assert_eq!(manager.spot(0, 2).unwrap().position(), (20.0, 40.0));
        assert_eq!(manager.spot(0, 2).unwrap().layer(), BASE_LAYER_SPOT + 2);
    }

    #[test]
    fn test_absent_id_starts_fading() {
        let mut manager = SpotManager::new(policy());
        manager.upsert(0, &coords(4), &identity(), IdBits::with_ids(&[1, 2, 3]));
        let arrival_1 = manager.spot(0, 1).unwrap().arrival();

        let changes = manager.upsert(0, &coords(4), &identity(), IdBits::with_ids(&[1, 3]));

        assert_eq!(changes.created, 0);
        assert_eq!(changes.fading, 1);
        assert_eq!(live_ids(&manager, 0), vec![1, 3]);
        assert_eq!(manager.spot(0, 1).unwrap().arrival(), arrival_1);
        assert_eq!(manager.spots(0).iter().filter(|s| s.is_fading()).count(), 1);
    }

    #[test]
    fn test_eviction_prefers_oldest_fading() {
        let mut manager = SpotManager::new(policy());
        let all = coords(8);
        manager.upsert(0, &all, &identity(), IdBits::with_ids(&[0, 1, 2]));
        // id 0 (oldest) lifts and fades
        manager.upsert(0, &all, &identity(), IdBits::with_ids(&[1, 2]));
        let b = manager.spot(0, 1).unwrap().arrival();
        let c = manager.spot(0, 2).unwrap().arrival();

        let changes = manager.upsert(0, &all, &identity(), IdBits::with_ids(&[1, 2, 5]));

        assert_eq!(changes.evicted, 1);
        assert_eq!(manager.spots(0).len(), 3);
        assert!(manager.spots(0).iter().all(|s| !s.is_fading()));
        assert_eq!(manager.spot(0, 1).unwrap().arrival(), b);
        assert_eq!(manager.spot(0, 2).unwrap().arrival(), c);
        assert!(manager.spot(0, 5).is_some());
    }

    #[test]
    fn test_eviction_without_fading_drops_oldest() {
        let mut manager = SpotManager::new(policy());
        let all = coords(8);
        manager.upsert(0, &all, &identity(), IdBits::with_ids(&[0, 1, 2]));
        manager.upsert(0, &all, &identity(), IdBits::with_ids(&[0, 1, 2, 3]));

        assert_eq!(manager.spots(0).len(), 3);
        assert!(manager.spot(0, 0).is_none());
        assert_eq!(live_ids(&manager, 0), vec![1, 2, 3]);
    }

    #[test]
    fn test_lift_and_land_at_capacity_keeps_current_contacts() {
        let mut manager = SpotManager::new(policy());
        let all = coords(8);
        manager.upsert(0, &all, &identity(), IdBits::with_ids(&[0, 1, 2]));

        // Finger 1 lifts while finger 3 lands in the same frame
        let changes = manager.upsert(0, &all, &identity(), IdBits::with_ids(&[0, 2, 3]));

        assert_eq!(changes.fading, 1);
        assert_eq!(changes.evicted, 1);
        assert_eq!(live_ids(&manager, 0), vec![0, 2, 3]);
        assert_eq!(manager.spots(0).len(), 3);
        assert!(manager.spots(0).iter().all(|s| !s.is_fading()));
    }

    #[test]
    fn test_missing_coordinates_are_skipped() {
        let mut manager = SpotManager::new(policy());
        let changes = manager.upsert(0, &coords(2), &[0, 1, 9], IdBits::with_ids(&[1, 2, 4]));

        assert_eq!(changes.skipped, 2);
        assert_eq!(live_ids(&manager, 0), vec![1]);
    }

    #[test]
    fn test_pressure_selects_icon_and_scale() {
        let mut manager = SpotManager::new(SpotPolicy {
            pressure_scales: true,
            ..policy()
        });
        let contacts = [
            PointerCoords::new(0.0, 0.0, 0.0),
            PointerCoords::new(5.0, 5.0, 0.8),
        ];
        manager.upsert(0, &contacts, &[0, 1], IdBits::with_ids(&[0, 1]));

        let hover = manager.spot(0, 0).unwrap();
        assert_eq!(hover.icon(), SpotIcon::Hover);
        assert_eq!(hover.scale(), 0.5);
        let touch = manager.spot(0, 1).unwrap();
        assert_eq!(touch.icon(), SpotIcon::Touch);
        assert_eq!(touch.scale(), 0.8);
    }

    #[test]
    fn test_fade_removes_and_retires_handle() {
        let mut manager = SpotManager::new(policy());
        manager.upsert(0, &coords(2), &identity(), IdBits::with_ids(&[1]));
        manager.install_handles(vec![SpriteHandle::new(7)]);
        manager.release_display(0);

        let fade = Duration::from_millis(200);
        assert!(manager.advance_fades(Duration::from_millis(100), fade));
        assert_eq!(manager.spots(0)[0].alpha(), 0.5);
        assert!(!manager.advance_fades(Duration::from_millis(150), fade));
        assert!(manager.spots(0).is_empty());
        assert_eq!(manager.displays().count(), 0);

        let retired = manager.take_retired();
        assert_eq!(retired, vec![SpriteHandle::new(7)]);
    }

    #[test]
    fn test_recycle_is_bounded() {
        let mut manager = SpotManager::new(policy());
        let overflow = manager.recycle(vec![
            SpriteHandle::new(1),
            SpriteHandle::new(2),
            SpriteHandle::new(3),
        ]);

        assert_eq!(manager.recycled_len(), 2);
        assert_eq!(overflow, vec![SpriteHandle::new(3)]);

        // New spots reuse parked handles before asking for fresh ones
        manager.upsert(0, &coords(2), &identity(), IdBits::with_ids(&[0, 1]));
        assert_eq!(manager.missing_handles(), 0);
        assert_eq!(manager.recycled_len(), 0);
    }

    #[test]
    fn test_displays_are_independent() {
        let mut manager = SpotManager::new(policy());
        manager.upsert(0, &coords(2), &identity(), IdBits::with_ids(&[0]));
        manager.upsert(1, &coords(2), &identity(), IdBits::with_ids(&[0, 1]));

        assert_eq!(manager.release_display(1), 2);
        assert_eq!(live_ids(&manager, 0), vec![0]);
        assert!(live_ids(&manager, 1).is_empty());
        assert_eq!(manager.release_all(), 1);
    }
}

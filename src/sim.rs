//! Headless collaborators
//!
//! In-memory stand-ins for the icon policy, the sprite compositor and the
//! display's vsync source. The demo binary and the tests drive the
//! controller through these; nothing here touches a real display.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::pointer::error::{PointerError, Result};
use crate::pointer::event_loop::DisplayPulse;
use crate::pointer::policy::{
    AdditionalResources, PointerAnimation, PointerPolicy, PointerResources,
};
use crate::pointer::sprite::{
    IconUpdate, SpriteController, SpriteHandle, SpriteIcon, SpriteId, SpriteUpdate,
};
use crate::pointer::types::{DisplayId, IconId};

/// Icon ids served by [`StaticIconPolicy`]
pub mod icons {
    use crate::pointer::types::IconId;

    /// Default arrow
    pub const ARROW: IconId = 1000;
    /// Hand
    pub const HAND: IconId = 1002;
    /// Animated busy indicator
    pub const WAIT: IconId = 1004;
    /// Text beam
    pub const TEXT: IconId = 1008;
    /// User-supplied icon
    pub const CUSTOM: IconId = -1;
    /// Spot for a hovering contact
    pub const SPOT_HOVER: IconId = 2000;
    /// Spot for a touching contact
    pub const SPOT_TOUCH: IconId = 2001;
    /// Pointer icon in spot presentation
    pub const SPOT_ANCHOR: IconId = 2002;

    /// Frames in the [`WAIT`] animation
    pub const WAIT_FRAMES: usize = 4;
    /// Time per [`WAIT`] frame (ms)
    pub const WAIT_FRAME_MS: u64 = 100;
}

/// Solid square icon whose every byte is `fill`
fn solid_icon(style: IconId, size: u32, fill: u8) -> SpriteIcon {
    let hotspot = size as f32 / 2.0;
    SpriteIcon::new(
        style,
        size,
        size,
        (hotspot, hotspot),
        vec![fill; (size * size * 4) as usize],
    )
}

/// Icon policy with a fixed set of procedurally generated icons
///
/// Every display gets the same icons. Loads can be made to fail to exercise
/// the keep-previous path.
#[derive(Debug, Default)]
pub struct StaticIconPolicy {
    loads: AtomicUsize,
    fail_loads: Mutex<bool>,
}

impl StaticIconPolicy {
    /// Create the policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `load_pointer_resources` calls so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Make every following load fail (or succeed again)
    pub fn fail_loads(&self, fail: bool) {
        *self.fail_loads.lock() = fail;
    }

    fn check(&self, resource: &'static str, display_id: DisplayId) -> Result<()> {
        if *self.fail_loads.lock() {
            return Err(PointerError::ResourceLoadFailed {
                resource,
                display_id,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl PointerPolicy for StaticIconPolicy {
    fn load_pointer_icon(&self, display_id: DisplayId) -> Result<SpriteIcon> {
        self.check("pointer icon", display_id)?;
        Ok(solid_icon(icons::ARROW, 16, 0xff))
    }

    fn load_pointer_resources(&self, display_id: DisplayId) -> Result<PointerResources> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.check("spot resources", display_id)?;
        Ok(PointerResources {
            spot_hover: solid_icon(icons::SPOT_HOVER, 24, 0x40),
            spot_touch: solid_icon(icons::SPOT_TOUCH, 24, 0x80),
            spot_anchor: solid_icon(icons::SPOT_ANCHOR, 8, 0xc0),
        })
    }

    fn load_additional_mouse_resources(
        &self,
        display_id: DisplayId,
    ) -> Result<AdditionalResources> {
        self.check("additional mouse resources", display_id)?;

        let mut additional = AdditionalResources::default();
        additional
            .icons
            .insert(icons::HAND, solid_icon(icons::HAND, 16, 0x10));
        additional
            .icons
            .insert(icons::TEXT, solid_icon(icons::TEXT, 16, 0x20));

        // Frame n is filled with byte n so tests can tell frames apart
        let frames = (0..icons::WAIT_FRAMES)
            .map(|n| solid_icon(icons::WAIT, 16, n as u8))
            .collect();
        additional.animations.insert(
            icons::WAIT,
            PointerAnimation {
                frames,
                duration_per_frame: Duration::from_millis(icons::WAIT_FRAME_MS),
            },
        );
        Ok(additional)
    }

    fn default_pointer_icon_id(&self) -> IconId {
        icons::ARROW
    }

    fn custom_pointer_icon_id(&self) -> IconId {
        icons::CUSTOM
    }
}

/// Last visual state applied to a simulated sprite
#[derive(Debug, Clone, Default)]
pub struct SpriteRecord {
    /// Layer
    pub layer: i32,
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Opacity
    pub alpha: f32,
    /// Scale
    pub scale: f32,
    /// Display
    pub display_id: DisplayId,
    /// Visibility
    pub visible: bool,
    /// Current bitmap
    pub icon: Option<SpriteIcon>,
    /// Number of updates received
    pub updates: usize,
}

#[derive(Debug, Default)]
struct SpriteTable {
    next_id: u64,
    live: HashSet<u64>,
    records: HashMap<u64, SpriteRecord>,
    acquired: usize,
    released: usize,
    fail_acquires: usize,
    fail_updates: bool,
    open_transactions: usize,
    transactions: usize,
}

/// Sprite controller that records every update in memory
#[derive(Debug, Default)]
pub struct RecordingSpriteController {
    table: Mutex<SpriteTable>,
}

impl RecordingSpriteController {
    /// Create an empty compositor
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state of a sprite, released ones included
    pub fn sprite(&self, id: SpriteId) -> Option<SpriteRecord> {
        self.table.lock().records.get(&id.0).cloned()
    }

    /// Live sprites currently visible
    pub fn visible_sprites(&self) -> Vec<(SpriteId, SpriteRecord)> {
        let table = self.table.lock();
        let mut visible: Vec<_> = table
            .live
            .iter()
            .filter_map(|id| table.records.get(id).map(|r| (SpriteId(*id), r)))
            .filter(|(_, record)| record.visible)
            .map(|(id, record)| (id, record.clone()))
            .collect();
        visible.sort_by_key(|(id, _)| *id);
        visible
    }

    /// Sprites acquired and not yet released
    pub fn live_count(&self) -> usize {
        self.table.lock().live.len()
    }

    /// Total acquisitions
    pub fn acquired(&self) -> usize {
        self.table.lock().acquired
    }

    /// Total releases
    pub fn released(&self) -> usize {
        self.table.lock().released
    }

    /// Completed transactions
    pub fn transactions(&self) -> usize {
        self.table.lock().transactions
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.table.lock().open_transactions > 0
    }

    /// Fail the next `count` acquisitions
    pub fn fail_next_acquires(&self, count: usize) {
        self.table.lock().fail_acquires = count;
    }

    /// Reject every update while set
    pub fn fail_updates(&self, fail: bool) {
        self.table.lock().fail_updates = fail;
    }
}

impl SpriteController for RecordingSpriteController {
    fn acquire(&self) -> Result<SpriteHandle> {
        let mut table = self.table.lock();
        if table.fail_acquires > 0 {
            table.fail_acquires -= 1;
            return Err(PointerError::SpriteAcquisitionFailed(
                "simulated exhaustion".to_string(),
            ));
        }

        table.next_id += 1;
        let id = table.next_id;
        table.live.insert(id);
        table.records.insert(id, SpriteRecord::default());
        table.acquired += 1;
        trace!("Acquired sprite {}", id);
        Ok(SpriteHandle::new(id))
    }

    fn release(&self, handle: SpriteHandle) {
        let mut table = self.table.lock();
        if table.live.remove(&handle.id().0) {
            table.released += 1;
            trace!("Released {}", handle.id());
        }
    }

    fn update(&self, sprite: SpriteId, update: &SpriteUpdate) -> Result<()> {
        let mut table = self.table.lock();
        if table.fail_updates {
            return Err(PointerError::SpriteUpdateFailed {
                sprite: sprite.0,
                reason: "simulated rejection".to_string(),
            });
        }
        if !table.live.contains(&sprite.0) {
            return Err(PointerError::SpriteUpdateFailed {
                sprite: sprite.0,
                reason: "sprite was released".to_string(),
            });
        }

        let record = table.records.entry(sprite.0).or_default();
        record.layer = update.layer;
        record.x = update.x;
        record.y = update.y;
        record.alpha = update.alpha;
        record.scale = update.scale;
        record.display_id = update.display_id;
        record.visible = update.visible;
        match &update.icon {
            IconUpdate::Unchanged => {}
            IconUpdate::Set(icon) => record.icon = Some(icon.clone()),
            IconUpdate::Clear => record.icon = None,
        }
        record.updates += 1;
        Ok(())
    }

    fn open_transaction(&self) {
        self.table.lock().open_transactions += 1;
    }

    fn close_transaction(&self) {
        let mut table = self.table.lock();
        table.open_transactions = table.open_transactions.saturating_sub(1);
        table.transactions += 1;
    }
}

/// Spawn a simulated vsync source
///
/// Pulses stop when the receiver is dropped. Missed ticks are skipped, like a
/// display that does not queue frames.
pub fn spawn_vsync(interval: Duration) -> (mpsc::Receiver<DisplayPulse>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(4);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let timestamp = ticker.tick().await;
            match tx.try_send(DisplayPulse { timestamp }) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => trace!("Vsync pulse dropped"),
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
        debug!("Simulated vsync stopped");
    });
    (rx, handle)
}

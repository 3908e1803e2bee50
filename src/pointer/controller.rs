//! Pointer Controller
//!
//! Thread-safe facade over the pointer state machine and the spot pools.
//!
//! # Architecture
//!
//! ```text
//!  input threads                         pointer loop (tokio task)
//!  ─────────────                         ─────────────────────────
//!  move_by / set_spots / fade ...        WakeRequest / DisplayPulse / timers
//!        │                                          │
//!        ▼                                          ▼
//!  lock ─> mutate ─> post wake ──mpsc──>  animate(now)   (lock held)
//!                                         render(now)
//!                                           ├─ load resources   (lock released)
//!                                           ├─ acquire sprites  (lock released)
//!                                           ├─ build plan       (lock held)
//!                                           ├─ apply plan       (lock released)
//!                                           └─ commit outcome   (lock held)
//! ```
//!
//! Collaborators ([`PointerPolicy`], [`SpriteController`]) are only ever
//! invoked from the loop and never while the state lock is held.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::animation::{AnimationScheduler, BitmapTimeline};
use super::error::{recovery_action, PointerError, RecoveryAction, Result};
use super::event_loop::{DisplayPulse, PointerLoop, WakeRequest};
use super::policy::{
    load_resources, AdditionalLoad, AdditionalResources, LoadedResources, PointerPolicy,
    PointerResources, ReloadScope, ResourceRequest,
};
use super::sprite::{
    IconUpdate, SpriteController, SpriteHandle, SpriteIcon, SpriteId, SpriteUpdate,
    BASE_LAYER_POINTER,
};
use super::spot::{SpotIcon, SpotManager};
use super::state::{FadeEffect, FadeState, PointerState, ViewportChange};
use super::types::{
    Bounds, DisplayId, IconId, IdBits, InactivityTimeout, PointerCoords, Presentation,
    Transition, Viewport,
};
use crate::config::PointerConfig;

/// Animated icon currently on the pointer
#[derive(Debug, Clone, Copy)]
struct ActiveBitmap {
    icon_id: IconId,
    timeline: BitmapTimeline,
}

/// Everything guarded by the state lock
struct Locked {
    state: PointerState,
    spots: SpotManager,
    scheduler: AnimationScheduler,

    resources: PointerResources,
    pointer_icon: SpriteIcon,
    additional: AdditionalResources,
    custom_icon: Option<SpriteIcon>,
    bitmap: Option<ActiveBitmap>,
    bitmap_frame_dirty: bool,

    pointer_sprite: Option<SpriteHandle>,
    pointer_dirty: bool,

    pending_reload: Option<ResourceRequest>,
    render_requested: bool,
}

/// Pointer sprite part of a render plan
struct PointerPlan {
    sprite: SpriteId,
    update: SpriteUpdate,
    icon_generation: Option<u64>,
    frame_sent: bool,
}

/// Sprite updates computed under the lock, applied without it
#[derive(Default)]
struct RenderPlan {
    pointer: Option<PointerPlan>,
    spots: Vec<(SpriteId, SpriteUpdate)>,
    retired: Vec<SpriteHandle>,
}

impl RenderPlan {
    fn is_empty(&self) -> bool {
        self.pointer.is_none() && self.spots.is_empty() && self.retired.is_empty()
    }
}

/// What the sprite controller accepted
struct RenderOutcome {
    pointer_ok: bool,
    failed_spots: Vec<SpriteId>,
}

/// Point-in-time view of one spot
#[derive(Debug, Clone, PartialEq)]
pub struct SpotSnapshot {
    /// Display the spot is on
    pub display_id: DisplayId,
    /// Touch id, `None` while fading out
    pub id: Option<u32>,
    /// Opacity
    pub alpha: f32,
    /// Scale
    pub scale: f32,
    /// Position
    pub position: (f32, f32),
    /// Icon kind
    pub icon: SpotIcon,
    /// Rendering handle, if acquired
    pub sprite: Option<SpriteId>,
}

/// Point-in-time view of the controller, for diagnostics and tests
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    /// Pointer position
    pub position: (f32, f32),
    /// Pointer alpha
    pub alpha: f32,
    /// Pointer fade state
    pub fade_state: FadeState,
    /// Presentation mode
    pub presentation: Presentation,
    /// Requested icon id
    pub requested_icon: IconId,
    /// Whether the requested icon still has to reach the sprite controller
    pub icon_pending: bool,
    /// Current frame of an animated icon
    pub animation_frame: Option<usize>,
    /// Pointer rendering handle
    pub pointer_sprite: Option<SpriteId>,
    /// All spots, per display oldest first
    pub spots: Vec<SpotSnapshot>,
    /// Parked sprite handles
    pub recycled_sprites: usize,
    /// Whether an animation wake is armed
    pub animating: bool,
}

/// Pointer and touch-spot presentation controller
///
/// All methods take `&self` and may be called from any thread. Visual
/// changes are carried out asynchronously by the loop started with
/// [`PointerController::spawn`].
pub struct PointerController {
    policy: Arc<dyn PointerPolicy>,
    sprites: Arc<dyn SpriteController>,
    config: PointerConfig,
    default_icon_id: IconId,
    custom_icon_id: IconId,
    wakes: mpsc::UnboundedSender<WakeRequest>,
    locked: Mutex<Locked>,
}

impl PointerController {
    /// Create a controller without starting its loop
    ///
    /// The returned receiver carries the wake requests the controller posts;
    /// hand it to a [`PointerLoop`]. A resource load and a render pass are
    /// already queued on it.
    pub fn new(
        policy: Arc<dyn PointerPolicy>,
        sprites: Arc<dyn SpriteController>,
        config: PointerConfig,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<WakeRequest>)> {
        config.check()?;

        let default_icon_id = policy.default_pointer_icon_id();
        let custom_icon_id = policy.custom_pointer_icon_id();
        let (wakes, wake_rx) = mpsc::unbounded_channel();

        let state = PointerState::new(default_icon_id);
        let initial_reload = ResourceRequest {
            display_id: state.display_id(),
            scope: ReloadScope::All,
            include_additional: state.presentation() == Presentation::Pointer,
        };

        let locked = Locked {
            state,
            spots: SpotManager::new(config.spot_policy()),
            scheduler: AnimationScheduler::new(config.frame_interval()),
            resources: PointerResources::default(),
            pointer_icon: SpriteIcon::default(),
            additional: AdditionalResources::default(),
            custom_icon: None,
            bitmap: None,
            bitmap_frame_dirty: false,
            pointer_sprite: None,
            pointer_dirty: true,
            pending_reload: Some(initial_reload),
            render_requested: true,
        };

        let controller = Arc::new(Self {
            policy,
            sprites,
            config,
            default_icon_id,
            custom_icon_id,
            wakes,
            locked: Mutex::new(locked),
        });
        controller.post(WakeRequest::Render);

        debug!(
            "Pointer controller created (default icon {}, custom icon {})",
            default_icon_id, custom_icon_id
        );
        Ok((controller, wake_rx))
    }

    /// Create a controller and spawn its loop on the current tokio runtime
    ///
    /// Without `pulses` the loop paces animation with its own timer.
    pub fn spawn(
        policy: Arc<dyn PointerPolicy>,
        sprites: Arc<dyn SpriteController>,
        config: PointerConfig,
        pulses: Option<mpsc::Receiver<DisplayPulse>>,
    ) -> Result<(Arc<Self>, JoinHandle<()>)> {
        let (controller, wake_rx) = Self::new(policy, sprites, config)?;
        let pointer_loop = PointerLoop::new(Arc::downgrade(&controller), wake_rx, pulses);
        let handle = tokio::spawn(pointer_loop.run());
        info!("Pointer loop started");
        Ok((controller, handle))
    }

    /// Configuration in use
    pub fn config(&self) -> &PointerConfig {
        &self.config
    }

    // === Queries ===

    /// Bounds the pointer is confined to, `None` without a valid viewport
    pub fn bounds(&self) -> Option<Bounds> {
        self.locked.lock().state.bounds()
    }

    /// Pointer position
    pub fn position(&self) -> (f32, f32) {
        self.locked.lock().state.position()
    }

    /// Button bitmask
    pub fn button_state(&self) -> u32 {
        self.locked.lock().state.button_state()
    }

    /// Display of the active viewport
    pub fn display_id(&self) -> DisplayId {
        self.locked.lock().state.display_id()
    }

    /// Presentation mode
    pub fn presentation(&self) -> Presentation {
        self.locked.lock().state.presentation()
    }

    /// Pointer fade state
    pub fn fade_state(&self) -> FadeState {
        self.locked.lock().state.fade_state()
    }

    /// Consistent view of the whole controller
    pub fn snapshot(&self) -> ControllerSnapshot {
        let mut guard = self.locked.lock();
        let locked = &mut *guard;
        let spots = locked
            .spots
            .spots_mut()
            .map(|(display_id, spot)| SpotSnapshot {
                display_id,
                id: (!spot.is_fading()).then(|| spot.id()),
                alpha: spot.alpha(),
                scale: spot.scale(),
                position: spot.position(),
                icon: spot.icon(),
                sprite: spot.sprite_id(),
            })
            .collect();

        ControllerSnapshot {
            position: locked.state.position(),
            alpha: locked.state.alpha(),
            fade_state: locked.state.fade_state(),
            presentation: locked.state.presentation(),
            requested_icon: locked.state.requested_icon(),
            icon_pending: locked.state.icon_pending(),
            animation_frame: locked.bitmap.map(|b| b.timeline.frame_index()),
            pointer_sprite: locked.pointer_sprite.as_ref().map(SpriteHandle::id),
            spots,
            recycled_sprites: locked.spots.recycled_len(),
            animating: locked.scheduler.is_pending(),
        }
    }

    // === Pointer mutators ===

    /// Move the pointer by a delta; `(0, 0)` is ignored
    pub fn move_by(&self, dx: f32, dy: f32) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.state.move_by(dx, dy) {
            trace!("Pointer moved by ({:.1}, {:.1})", dx, dy);
            guard.pointer_dirty = true;
            self.note_activity(&mut guard, now);
            self.request_render(&mut guard);
        }
    }

    /// Move the pointer to a position, clamped into bounds
    pub fn set_position(&self, x: f32, y: f32) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.state.set_position(x, y) {
            guard.pointer_dirty = true;
            self.note_activity(&mut guard, now);
            self.request_render(&mut guard);
        }
    }

    /// Replace the button bitmask
    pub fn set_button_state(&self, button_state: u32) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.state.set_button_state(button_state) {
            trace!("Button state: {:#x}", button_state);
            self.note_activity(&mut guard, now);
        }
    }

    /// Fade the pointer out
    pub fn fade(&self, transition: Transition) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        guard.state.disarm_inactivity();
        let effect = guard.state.fade(transition);
        debug!("fade({:?}) -> {:?}", transition, effect);
        self.apply_fade_effect(&mut guard, effect, now);
    }

    /// Fade the pointer in and restart the inactivity timer
    pub fn unfade(&self, transition: Transition) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        let effect = guard.state.unfade(transition);
        debug!("unfade({:?}) -> {:?}", transition, effect);
        self.apply_fade_effect(&mut guard, effect, now);
        self.arm_inactivity(&mut guard, now);
    }

    /// Select how long idle time elapses before the pointer fades
    pub fn set_inactivity_timeout(&self, timeout: InactivityTimeout) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.state.set_inactivity_timeout(timeout) {
            debug!("Inactivity timeout set to {:?}", timeout);
            self.arm_inactivity(&mut guard, now);
        }
    }

    /// Switch the display the pointer lives on, or its bounds
    pub fn set_display_viewport(&self, viewport: Viewport) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        match guard.state.set_viewport(viewport) {
            ViewportChange::Unchanged => {}
            ViewportChange::Clamped => {
                guard.pointer_dirty = true;
                self.request_render(&mut guard);
            }
            ViewportChange::Reset { display_changed } => {
                info!(
                    "Display viewport now {:?} (display changed: {})",
                    viewport, display_changed
                );
                guard.pointer_dirty = true;
                if guard.spots.release_all() > 0 {
                    self.request_animation(&mut guard, now);
                }
                self.request_reload(&mut guard, ReloadScope::All);
            }
        }
    }

    /// Switch between cursor, spots and nothing
    pub fn set_presentation(&self, presentation: Presentation) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        let previous = guard.state.presentation();
        if !guard.state.set_presentation(presentation) {
            return;
        }

        if previous == Presentation::Spot && guard.spots.release_all() > 0 {
            self.request_animation(&mut guard, now);
        }
        if presentation == Presentation::Pointer && guard.additional.is_empty() {
            self.request_reload(&mut guard, ReloadScope::AdditionalOnly);
        }
        guard.pointer_dirty = true;
        self.request_render(&mut guard);
    }

    /// Request a pointer icon by id
    pub fn update_pointer_icon(&self, icon_id: IconId) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.state.request_icon(icon_id) {
            debug!("Pointer icon requested: {}", icon_id);
            self.note_activity(&mut guard, now);
            self.request_render(&mut guard);
        }
    }

    /// Show a user-supplied icon
    pub fn set_custom_pointer_icon(&self, icon: SpriteIcon) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        debug!("Custom pointer icon set: {:?}", icon);
        guard.custom_icon = Some(icon);
        if !guard.state.request_icon(self.custom_icon_id) {
            guard.state.mark_icon_pending();
        }
        self.note_activity(&mut guard, now);
        self.request_render(&mut guard);
    }

    /// Reload every icon from the policy
    pub fn reload_pointer_resources(&self) {
        let mut guard = self.locked.lock();
        self.request_reload(&mut guard, ReloadScope::All);
    }

    // === Spot mutators ===

    /// Apply one frame of touch contacts to a display
    ///
    /// `id_to_index[id]` is the index into `coords` for every id set in
    /// `id_bits`; ids without coordinates are skipped. Ignored unless the
    /// presentation is [`Presentation::Spot`].
    pub fn set_spots(
        &self,
        coords: &[PointerCoords],
        id_to_index: &[u32],
        id_bits: IdBits,
        display_id: DisplayId,
    ) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.state.presentation() != Presentation::Spot {
            trace!("Ignoring spots outside spot presentation");
            return;
        }

        let changes = guard.spots.upsert(display_id, coords, id_to_index, id_bits);
        if changes.needs_animation() {
            self.request_animation(&mut guard, now);
        }
        self.request_render(&mut guard);
    }

    /// Fade out every spot on one display
    pub fn clear_spots(&self, display_id: DisplayId) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.spots.release_display(display_id) > 0 {
            debug!("Clearing spots on display {}", display_id);
            self.request_animation(&mut guard, now);
            self.request_render(&mut guard);
        }
    }

    /// Fade out every spot on every display
    pub fn clear_all_spots(&self) {
        let now = Instant::now();
        let mut guard = self.locked.lock();
        if guard.spots.release_all() > 0 {
            self.request_animation(&mut guard, now);
            self.request_render(&mut guard);
        }
    }

    // === Loop side ===

    /// Advance every running animation to `now`
    ///
    /// Returns whether animation continues; if so the next wake is already
    /// armed.
    pub fn animate(&self, now: Instant) -> bool {
        let mut guard = self.locked.lock();
        let locked = &mut *guard;
        let Some(elapsed) = locked.scheduler.begin_advance(now) else {
            return false;
        };
        trace!("Animating, {:?} since last frame", elapsed);

        let mut keep_animating = false;
        if locked.state.is_fading() {
            keep_animating |= locked
                .state
                .advance_fade(elapsed, self.config.pointer_fade_duration());
            locked.pointer_dirty = true;
        }
        keep_animating |= locked
            .spots
            .advance_fades(elapsed, self.config.spot_fade_duration());
        keep_animating |= Self::advance_bitmap(locked, now);

        if keep_animating {
            self.request_animation(locked, now);
        }
        keep_animating
    }

    /// Fire an inactivity timeout armed with `generation`
    ///
    /// Stale generations are ignored.
    pub fn handle_inactivity_timeout(&self, generation: u64, now: Instant) {
        let mut guard = self.locked.lock();
        if !guard.state.take_inactivity(generation) {
            trace!("Stale inactivity timeout (generation {})", generation);
            return;
        }
        debug!("Pointer inactive, fading out");
        let effect = guard.state.fade(Transition::Animated);
        self.apply_fade_effect(&mut guard, effect, now);
    }

    /// Push pending visual changes to the sprite controller
    pub fn render(&self, now: Instant) {
        self.reload_resources();
        self.acquire_sprites(now);

        let plan = {
            let mut guard = self.locked.lock();
            guard.render_requested = false;
            self.build_plan(&mut guard, now)
        };
        if plan.is_empty() {
            return;
        }

        let outcome = self.apply_plan(&plan);
        self.commit(plan, outcome, now);
    }

    // === Internals ===

    fn post(&self, request: WakeRequest) {
        if self.wakes.send(request).is_err() {
            trace!("Pointer loop gone, dropping {:?}", request);
        }
    }

    fn request_render(&self, locked: &mut Locked) {
        if !locked.render_requested {
            locked.render_requested = true;
            self.post(WakeRequest::Render);
        }
    }

    fn request_animation(&self, locked: &mut Locked, now: Instant) {
        if let Some(at) = locked.scheduler.request(now) {
            self.post(WakeRequest::Animate { at });
        }
    }

    fn request_reload(&self, locked: &mut Locked, scope: ReloadScope) {
        let request = ResourceRequest {
            display_id: locked.state.display_id(),
            scope,
            include_additional: locked.state.presentation() == Presentation::Pointer,
        };
        locked.pending_reload = Some(match locked.pending_reload {
            Some(pending) => pending.merge(request),
            None => request,
        });
        self.request_render(locked);
    }

    fn arm_inactivity(&self, locked: &mut Locked, now: Instant) {
        let delay = self
            .config
            .inactivity_delay(locked.state.inactivity_timeout());
        let timer = locked.state.arm_inactivity(now, delay);
        if let Some(at) = timer.deadline() {
            self.post(WakeRequest::InactivityTimeout {
                at,
                generation: timer.generation(),
            });
        }
    }

    fn note_activity(&self, locked: &mut Locked, now: Instant) {
        if locked.state.note_activity() {
            locked.pointer_dirty = true;
            self.request_render(locked);
        }
        self.arm_inactivity(locked, now);
    }

    fn apply_fade_effect(&self, locked: &mut Locked, effect: FadeEffect, now: Instant) {
        match effect {
            FadeEffect::None => {}
            FadeEffect::Render => {
                locked.pointer_dirty = true;
                self.request_render(locked);
            }
            FadeEffect::Animate => self.request_animation(locked, now),
        }
    }

    fn advance_bitmap(locked: &mut Locked, now: Instant) -> bool {
        if locked.state.presentation() != Presentation::Pointer {
            return false;
        }
        let Some(active) = locked.bitmap.as_mut() else {
            return false;
        };
        let Some(animation) = locked
            .additional
            .animations
            .get(&active.icon_id)
            .filter(|a| a.is_playable())
        else {
            locked.bitmap = None;
            return false;
        };

        if let Some(frame) =
            active
                .timeline
                .advance(now, animation.frames.len(), animation.duration_per_frame)
        {
            trace!("Icon {} frame {}", active.icon_id, frame);
            locked.bitmap_frame_dirty = true;
        }
        true
    }

    /// Resolve the icon the pointer sprite should show
    ///
    /// Starts or stops the bitmap animation to match.
    fn resolve_pointer_icon(&self, locked: &mut Locked, now: Instant) -> SpriteIcon {
        locked.bitmap = None;
        if locked.state.presentation() == Presentation::Spot {
            return locked.resources.spot_anchor.clone();
        }

        let icon_id = locked.state.requested_icon();
        if icon_id == self.default_icon_id {
            return locked.pointer_icon.clone();
        }
        if icon_id == self.custom_icon_id {
            if let Some(icon) = &locked.custom_icon {
                return icon.clone();
            }
        }
        if let Some(animation) = locked
            .additional
            .animations
            .get(&icon_id)
            .filter(|a| a.is_playable())
        {
            locked.bitmap = Some(ActiveBitmap {
                icon_id,
                timeline: BitmapTimeline::start(now),
            });
            let first = animation.frames[0].clone();
            self.request_animation(locked, now);
            return first;
        }
        if let Some(icon) = locked.additional.icons.get(&icon_id) {
            return icon.clone();
        }

        warn!("{}, using default pointer icon", PointerError::IconNotFound(icon_id));
        locked.pointer_icon.clone()
    }

    fn current_frame(locked: &Locked) -> Option<SpriteIcon> {
        let active = locked.bitmap?;
        let animation = locked.additional.animations.get(&active.icon_id)?;
        animation.frames.get(active.timeline.frame_index()).cloned()
    }

    fn install_resources(locked: &mut Locked, loaded: LoadedResources) {
        if let Some(resources) = loaded.resources {
            locked.resources = resources;
        }
        if let Some(icon) = loaded.pointer_icon {
            locked.pointer_icon = icon;
        }
        match loaded.additional {
            AdditionalLoad::Loaded(additional) => locked.additional = additional,
            AdditionalLoad::Failed => {}
            AdditionalLoad::Cleared => locked.additional = AdditionalResources::default(),
        }

        locked.state.mark_icon_pending();
        locked.pointer_dirty = true;
        for (_, spot) in locked.spots.spots_mut() {
            spot.invalidate();
        }
    }

    fn reload_resources(&self) {
        let Some(request) = self.locked.lock().pending_reload.take() else {
            return;
        };

        let loaded = load_resources(self.policy.as_ref(), request);

        let mut guard = self.locked.lock();
        Self::install_resources(&mut guard, loaded);
        debug!("Pointer resources installed for display {}", request.display_id);
    }

    fn acquire_sprites(&self, now: Instant) {
        let (need_pointer, need_spots) = {
            let guard = self.locked.lock();
            (guard.pointer_sprite.is_none(), guard.spots.missing_handles())
        };
        if !need_pointer && need_spots == 0 {
            return;
        }

        let mut failed = false;
        let mut pointer = None;
        if need_pointer {
            match self.sprites.acquire() {
                Ok(handle) => pointer = Some(handle),
                Err(e) => {
                    warn!("Pointer sprite unavailable, retrying next frame: {}", e);
                    failed = true;
                }
            }
        }

        let mut handles = Vec::with_capacity(need_spots);
        for _ in 0..need_spots {
            match self.sprites.acquire() {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!("Spot sprite unavailable, retrying next frame: {}", e);
                    failed = true;
                    break;
                }
            }
        }

        let mut guard = self.locked.lock();
        if let Some(handle) = pointer {
            guard.pointer_sprite = Some(handle);
            guard.pointer_dirty = true;
            guard.state.mark_icon_pending();
        }
        guard.spots.install_handles(handles);
        if failed {
            self.request_animation(&mut guard, now);
        }
    }

    fn build_plan(&self, locked: &mut Locked, now: Instant) -> RenderPlan {
        let mut plan = RenderPlan {
            retired: locked.spots.take_retired(),
            ..RenderPlan::default()
        };

        let pointer_needs_update =
            locked.pointer_dirty || locked.state.icon_pending() || locked.bitmap_frame_dirty;
        if let Some(sprite) = locked.pointer_sprite.as_ref().map(SpriteHandle::id) {
            if pointer_needs_update {
                let mut icon_generation = None;
                let mut frame_sent = false;
                let icon = if locked.state.icon_pending() {
                    icon_generation = Some(locked.state.icon_generation());
                    IconUpdate::Set(self.resolve_pointer_icon(locked, now))
                } else if locked.bitmap_frame_dirty {
                    match Self::current_frame(locked) {
                        Some(frame) => {
                            frame_sent = true;
                            IconUpdate::Set(frame)
                        }
                        None => IconUpdate::Unchanged,
                    }
                } else {
                    IconUpdate::Unchanged
                };

                let (x, y) = locked.state.position();
                let alpha = locked.state.alpha();
                let visible = alpha > 0.0
                    && locked.state.presentation() != Presentation::Hidden
                    && locked.state.viewport().is_valid();
                plan.pointer = Some(PointerPlan {
                    sprite,
                    update: SpriteUpdate {
                        layer: BASE_LAYER_POINTER,
                        x,
                        y,
                        alpha,
                        scale: 1.0,
                        display_id: locked.state.display_id(),
                        visible,
                        icon,
                    },
                    icon_generation,
                    frame_sent,
                });
                locked.pointer_dirty = false;
                locked.bitmap_frame_dirty = false;
            }
        }

        let resources = &locked.resources;
        for (display_id, spot) in locked.spots.spots_mut() {
            let Some(sprite) = spot.sprite_id() else {
                continue;
            };
            if !spot.take_dirty() {
                continue;
            }
            let icon = match spot.take_icon_change() {
                Some(SpotIcon::Touch) => IconUpdate::Set(resources.spot_touch.clone()),
                Some(SpotIcon::Hover) => IconUpdate::Set(resources.spot_hover.clone()),
                None => IconUpdate::Unchanged,
            };
            let (x, y) = spot.position();
            plan.spots.push((
                sprite,
                SpriteUpdate {
                    layer: spot.layer(),
                    x,
                    y,
                    alpha: spot.alpha(),
                    scale: spot.scale(),
                    display_id,
                    visible: spot.alpha() > 0.0,
                    icon,
                },
            ));
        }

        plan
    }

    fn apply_plan(&self, plan: &RenderPlan) -> RenderOutcome {
        self.sprites.open_transaction();

        let pointer_ok = match &plan.pointer {
            Some(pointer) => match self.sprites.update(pointer.sprite, &pointer.update) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Pointer sprite update rejected: {}", e);
                    false
                }
            },
            None => true,
        };

        let mut failed_spots = Vec::new();
        for (sprite, update) in &plan.spots {
            if let Err(e) = self.sprites.update(*sprite, update) {
                warn!("Spot sprite update rejected: {}", e);
                if recovery_action(&e) == RecoveryAction::RetryNextFrame {
                    failed_spots.push(*sprite);
                }
            }
        }

        let cleared = SpriteUpdate::cleared();
        for handle in &plan.retired {
            if let Err(e) = self.sprites.update(handle.id(), &cleared) {
                warn!("Could not hide retired {}: {}", handle.id(), e);
            }
        }

        self.sprites.close_transaction();
        RenderOutcome {
            pointer_ok,
            failed_spots,
        }
    }

    fn commit(&self, plan: RenderPlan, outcome: RenderOutcome, now: Instant) {
        let overflow = {
            let mut guard = self.locked.lock();
            let locked = &mut *guard;
            let mut retry = false;

            if let Some(pointer) = plan.pointer {
                if outcome.pointer_ok {
                    if let Some(generation) = pointer.icon_generation {
                        locked.state.commit_icon(generation);
                    }
                } else {
                    locked.pointer_dirty = true;
                    locked.bitmap_frame_dirty |= pointer.frame_sent;
                    retry = true;
                }
            }

            for sprite in outcome.failed_spots {
                locked.spots.invalidate_sprite(sprite);
                retry = true;
            }

            if retry {
                self.request_animation(locked, now);
            }
            locked.spots.recycle(plan.retired)
        };

        for handle in overflow {
            trace!("Releasing {}", handle.id());
            self.sprites.release(handle);
        }
    }
}

impl Drop for PointerController {
    fn drop(&mut self) {
        let locked = self.locked.get_mut();
        let mut handles: Vec<SpriteHandle> = locked.pointer_sprite.take().into_iter().collect();
        locked.spots.release_all();
        locked.spots.advance_fades(Duration::MAX, Duration::ZERO);
        handles.extend(locked.spots.take_retired());
        handles.extend(locked.spots.drain_recycled());
        for handle in handles {
            self.sprites.release(handle);
        }
    }
}

//! Pointer State Machine
//!
//! Position, buttons, icon request, presentation, fade and the inactivity
//! timer of the one mouse cursor. Pure state; the controller decides when to
//! render.
//!
//! # Fade states
//!
//! ```text
//!            fade(Animated)              ramp reaches 0
//!  Visible ─────────────────> FadingOut ───────────────> Hidden
//!     ▲  ◀── activity cancels ──┘  │                       │
//!     │                            │ unfade(Animated)      │ unfade(Animated)
//!     │       ramp reaches 1       ▼                       │
//!     └──────────────────────── FadingIn <─────────────────┘
//! ```
//!
//! Immediate transitions jump straight to `Visible` or `Hidden`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::animation::ramp;
use super::types::{
    Bounds, DisplayId, IconId, InactivityTimeout, Presentation, Transition, Viewport,
};

/// Direction of the alpha ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// Not animating
    Steady,
    /// Ramping toward 1
    In,
    /// Ramping toward 0
    Out,
}

/// Observable fade state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Fully shown
    Visible,
    /// Ramping out
    FadingOut,
    /// Fully faded
    Hidden,
    /// Ramping in
    FadingIn,
}

/// What a fade request needs from the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeEffect {
    /// Nothing changed
    None,
    /// Alpha jumped, render once
    Render,
    /// Ramp started, animation required
    Animate,
}

/// Viewport transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportChange {
    /// Same viewport as before
    Unchanged,
    /// Same display and size, position clamped into the new bounds
    Clamped,
    /// Display or size changed, pointer recentred
    Reset {
        /// Whether the display identity changed
        display_changed: bool,
    },
}

/// Generation-tagged inactivity deadline
#[derive(Debug, Clone, Copy, Default)]
pub struct InactivityTimer {
    deadline: Option<Instant>,
    generation: u64,
}

impl InactivityTimer {
    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Armed deadline
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Cursor state
#[derive(Debug)]
pub struct PointerState {
    x: f32,
    y: f32,
    button_state: u32,
    viewport: Viewport,
    presentation: Presentation,
    requested_icon: IconId,
    icon_pending: bool,
    icon_generation: u64,
    fade_direction: FadeDirection,
    alpha: f32,
    inactivity_timeout: InactivityTimeout,
    inactivity: InactivityTimer,
}

impl PointerState {
    /// Initial state: hidden, at the origin, no viewport
    pub fn new(default_icon: IconId) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            button_state: 0,
            viewport: Viewport::invalid(),
            presentation: Presentation::Pointer,
            requested_icon: default_icon,
            icon_pending: true,
            icon_generation: 0,
            fade_direction: FadeDirection::Steady,
            alpha: 0.0,
            inactivity_timeout: InactivityTimeout::Normal,
            inactivity: InactivityTimer::default(),
        }
    }

    /// Current position
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Bounds of the active viewport
    pub fn bounds(&self) -> Option<Bounds> {
        self.viewport.bounds()
    }

    /// Active viewport
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Display of the active viewport
    pub fn display_id(&self) -> DisplayId {
        self.viewport.display_id
    }

    /// Button bitmask
    pub fn button_state(&self) -> u32 {
        self.button_state
    }

    /// Presentation mode
    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    /// Requested icon id
    pub fn requested_icon(&self) -> IconId {
        self.requested_icon
    }

    /// Whether an icon change awaits a render pass
    pub fn icon_pending(&self) -> bool {
        self.icon_pending
    }

    /// Counter bumped on every icon change
    pub fn icon_generation(&self) -> u64 {
        self.icon_generation
    }

    /// Current alpha
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Inactivity timeout selection
    pub fn inactivity_timeout(&self) -> InactivityTimeout {
        self.inactivity_timeout
    }

    /// Inactivity timer
    pub fn inactivity(&self) -> InactivityTimer {
        self.inactivity
    }

    /// Observable fade state
    pub fn fade_state(&self) -> FadeState {
        match self.fade_direction {
            FadeDirection::Out => FadeState::FadingOut,
            FadeDirection::In => FadeState::FadingIn,
            FadeDirection::Steady if self.alpha > 0.0 => FadeState::Visible,
            FadeDirection::Steady => FadeState::Hidden,
        }
    }

    /// Whether the ramp is running
    pub fn is_fading(&self) -> bool {
        self.fade_direction != FadeDirection::Steady
    }

    /// Move to a position, clamped to bounds
    ///
    /// Ignored without a viewport or when either coordinate is not finite.
    pub fn set_position(&mut self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        let Some(bounds) = self.bounds() else {
            return false;
        };
        let (x, y) = bounds.clamp(x, y);
        self.x = x;
        self.y = y;
        true
    }

    /// Move by a delta; a zero delta is ignored
    pub fn move_by(&mut self, dx: f32, dy: f32) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        self.set_position(self.x + dx, self.y + dy)
    }

    /// Replace the button bitmask
    pub fn set_button_state(&mut self, state: u32) -> bool {
        if self.button_state == state {
            return false;
        }
        self.button_state = state;
        true
    }

    /// Request an icon; returns whether it differs from the current request
    pub fn request_icon(&mut self, icon: IconId) -> bool {
        if self.requested_icon == icon {
            return false;
        }
        self.requested_icon = icon;
        self.mark_icon_pending();
        true
    }

    /// Force the icon to be resolved again on the next render pass
    pub fn mark_icon_pending(&mut self) {
        self.icon_pending = true;
        self.icon_generation += 1;
    }

    /// Clear the pending flag if no newer change arrived since `generation`
    pub fn commit_icon(&mut self, generation: u64) -> bool {
        if self.icon_generation != generation {
            return false;
        }
        self.icon_pending = false;
        true
    }

    /// Change presentation; returns whether it changed
    pub fn set_presentation(&mut self, presentation: Presentation) -> bool {
        if self.presentation == presentation {
            return false;
        }
        debug!(
            "Pointer presentation changed: {:?} -> {:?}",
            self.presentation, presentation
        );
        self.presentation = presentation;
        self.mark_icon_pending();
        true
    }

    /// Apply a new viewport
    pub fn set_viewport(&mut self, viewport: Viewport) -> ViewportChange {
        if viewport == self.viewport {
            return ViewportChange::Unchanged;
        }

        let old = std::mem::replace(&mut self.viewport, viewport);
        let display_changed = old.display_id != viewport.display_id;
        let resized = old.width() != viewport.width() || old.height() != viewport.height();

        if display_changed || resized {
            let (x, y) = viewport.bounds().map(|b| b.center()).unwrap_or((0.0, 0.0));
            self.x = x;
            self.y = y;
            debug!(
                "Viewport reset: display {} -> {}, pointer centred at ({:.1}, {:.1})",
                old.display_id, viewport.display_id, x, y
            );
            ViewportChange::Reset { display_changed }
        } else {
            if let Some(bounds) = viewport.bounds() {
                (self.x, self.y) = bounds.clamp(self.x, self.y);
            }
            ViewportChange::Clamped
        }
    }

    /// Fade out
    ///
    /// A no-op from `Hidden` and `FadingIn`, and for a repeated animated fade.
    pub fn fade(&mut self, transition: Transition) -> FadeEffect {
        match (self.fade_state(), transition) {
            (FadeState::Hidden | FadeState::FadingIn, _) => FadeEffect::None,
            (FadeState::FadingOut, Transition::Animated) => FadeEffect::None,
            (_, Transition::Immediate) => {
                self.fade_direction = FadeDirection::Steady;
                self.alpha = 0.0;
                FadeEffect::Render
            }
            (FadeState::Visible, Transition::Animated) => {
                self.fade_direction = FadeDirection::Out;
                FadeEffect::Animate
            }
        }
    }

    /// Fade in
    pub fn unfade(&mut self, transition: Transition) -> FadeEffect {
        match (self.fade_state(), transition) {
            (FadeState::Visible, _) => FadeEffect::None,
            (_, Transition::Immediate) => {
                self.fade_direction = FadeDirection::Steady;
                self.alpha = 1.0;
                FadeEffect::Render
            }
            (FadeState::FadingIn, Transition::Animated) => FadeEffect::None,
            (FadeState::Hidden | FadeState::FadingOut, Transition::Animated) => {
                self.fade_direction = FadeDirection::In;
                FadeEffect::Animate
            }
        }
    }

    /// Renewed activity: a running fade-out is cancelled
    pub fn note_activity(&mut self) -> bool {
        if self.fade_direction != FadeDirection::Out {
            return false;
        }
        debug!("Activity during fade-out, pointer visible again");
        self.fade_direction = FadeDirection::Steady;
        self.alpha = 1.0;
        true
    }

    /// Advance the alpha ramp; returns whether it keeps running
    pub fn advance_fade(&mut self, elapsed: Duration, duration: Duration) -> bool {
        let target = match self.fade_direction {
            FadeDirection::Steady => return false,
            FadeDirection::In => 1.0,
            FadeDirection::Out => 0.0,
        };
        self.alpha = ramp(self.alpha, target, elapsed, duration);
        if self.alpha == target {
            self.fade_direction = FadeDirection::Steady;
            false
        } else {
            true
        }
    }

    /// Select the inactivity delay; returns whether it changed
    pub fn set_inactivity_timeout(&mut self, timeout: InactivityTimeout) -> bool {
        if self.inactivity_timeout == timeout {
            return false;
        }
        self.inactivity_timeout = timeout;
        true
    }

    /// Arm the inactivity timer, superseding any armed one
    pub fn arm_inactivity(&mut self, now: Instant, delay: Duration) -> InactivityTimer {
        self.inactivity.generation += 1;
        self.inactivity.deadline = Some(now + delay);
        self.inactivity
    }

    /// Disarm the inactivity timer
    pub fn disarm_inactivity(&mut self) {
        if self.inactivity.deadline.take().is_some() {
            self.inactivity.generation += 1;
        }
    }

    /// Consume a firing timer if it is still the armed one
    pub fn take_inactivity(&mut self, generation: u64) -> bool {
        if self.inactivity.generation != generation || self.inactivity.deadline.is_none() {
            return false;
        }
        self.inactivity.deadline = None;
        true
    }
}

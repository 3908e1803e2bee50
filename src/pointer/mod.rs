//! Pointer and touch-spot presentation
//!
//! Owns the visual state of the mouse cursor and of touch spot indicators,
//! and animates them (fades, animated icons) independently of the threads
//! that deliver input.
//!
//! # Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Spot pools | [`spot`] | Per-display spots, eviction, handle recycling |
//! | Scheduler | [`animation`] | Coalesced wakes, fade ramps, icon frames |
//! | Pointer state | [`state`] | Position, icon, presentation, fade, idle timer |
//! | Controller | [`controller`] | Locking facade, render passes |
//! | Event loop | [`event_loop`] | tokio task merging wakes, timers and vsync |
//!
//! # Architecture
//!
//! ```text
//! Input pipeline
//!   └─> PointerController (parking_lot::Mutex<Locked>)
//!       ├─> PointerState ──────┐
//!       ├─> SpotManager ───────┼─> render plan
//!       └─> AnimationScheduler ┘        │
//!                                       ▼
//! PointerLoop (tokio task, Weak ref)
//!   ├─> PointerPolicy     (icons, lock released)
//!   └─> SpriteController  (sprites, lock released)
//! ```
//!
//! # Timing
//!
//! | Constant | Default |
//! |----------|---------|
//! | Pointer fade | 500 ms |
//! | Spot fade | 200 ms |
//! | Inactivity (normal / short) | 15 s / 3 s |
//! | Max spots per display | 12 |
//! | Max recycled sprites | 12 |
//!
//! All of these come from [`crate::config::PointerConfig`].

pub mod animation;
pub mod controller;
pub mod error;
pub mod event_loop;
pub mod policy;
pub mod sprite;
pub mod spot;
pub mod state;
pub mod types;

pub use controller::{ControllerSnapshot, PointerController, SpotSnapshot};
pub use error::{classify_error, recovery_action, ErrorType, PointerError, RecoveryAction, Result};
pub use event_loop::{DisplayPulse, PointerLoop, WakeRequest};
pub use policy::{AdditionalResources, PointerAnimation, PointerPolicy, PointerResources};
pub use sprite::{
    IconUpdate, SpriteController, SpriteHandle, SpriteIcon, SpriteId, SpriteUpdate,
    BASE_LAYER_POINTER, BASE_LAYER_SPOT,
};
pub use spot::{SpotIcon, INVALID_SPOT_ID};
pub use state::FadeState;
pub use types::{
    buttons, Bounds, DisplayId, IconId, IdBits, InactivityTimeout, PointerCoords, Presentation,
    Transition, Viewport, DEFAULT_DISPLAY_ID, INVALID_DISPLAY_ID,
};

//! # lamco-pointer
//!
//! Pointer and touch-spot presentation controller.
//!
//! The controller owns the on-screen state of one mouse cursor and of any
//! number of touch spot indicators, and animates them (fade in/out, animated
//! icons, spot fade-out) on its own tokio task, independently of the threads
//! that deliver input.
//!
//! # Architecture
//!
//! ```text
//! lamco-pointer
//!   ├─> PointerController (thread-safe facade, one state lock)
//!   │     ├─> PointerState       (position, icon, presentation, fade, idle timer)
//!   │     ├─> SpotManager        (per-display spot pools, handle recycling)
//!   │     └─> AnimationScheduler (coalesced frame wakes)
//!   ├─> PointerLoop (tokio task: wakes, timers, display pulses)
//!   └─> Collaborators (traits)
//!         ├─> PointerPolicy      (icon loading)
//!         └─> SpriteController   (compositing)
//! ```
//!
//! # Data Flow
//!
//! **Input Path:** Input pipeline → `PointerController` → wake request → `PointerLoop`
//!
//! **Render Path:** `PointerLoop` → animate → render plan → `SpriteController`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lamco_pointer::config::PointerConfig;
//! use lamco_pointer::pointer::{PointerController, Transition, Viewport};
//! use lamco_pointer::sim::{RecordingSpriteController, StaticIconPolicy};
//!
//! # async fn demo() -> lamco_pointer::pointer::Result<()> {
//! let (pointer, _task) = PointerController::spawn(
//!     Arc::new(StaticIconPolicy::new()),
//!     Arc::new(RecordingSpriteController::new()),
//!     PointerConfig::default(),
//!     None,
//! )?;
//! pointer.set_display_viewport(Viewport::new(0, 0, 0, 1920, 1080));
//! pointer.unfade(Transition::Animated);
//! pointer.move_by(12.0, -4.0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration (TOML timing constants and demo settings)
pub mod config;

/// Pointer and touch-spot presentation
///
/// This module provides the controller and its building blocks:
///
/// - **Spot pools**: bounded per-display spots with fade-out and recycling
/// - **Animation**: one coalesced wake drives fades and icon frames
/// - **State machine**: visible / fading out / hidden / fading in
/// - **Event loop**: tokio task holding a weak controller reference
pub mod pointer;

/// Headless collaborators for demos and tests
pub mod sim;

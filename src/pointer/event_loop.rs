//! Pointer Event Loop
//!
//! One tokio task per controller. It merges four wake sources into calls
//! back into the controller:
//!
//! - [`WakeRequest::Render`]: something changed, push it to the sprites
//! - [`WakeRequest::Animate`]: an animation frame is due at `at`
//! - [`WakeRequest::InactivityTimeout`]: idle deadline with its generation
//! - [`DisplayPulse`]: vsync from the display; paces due animation frames
//!
//! The loop holds a [`Weak`] reference only. It exits once the controller is
//! dropped, which also closes the wake channel.

use std::sync::Weak;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use super::controller::PointerController;

/// Request posted by the controller to its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeRequest {
    /// Run a render pass
    Render,
    /// Advance animation at `at`
    Animate {
        /// Wake time
        at: Instant,
    },
    /// Fire the inactivity timeout armed with `generation` at `at`
    InactivityTimeout {
        /// Deadline
        at: Instant,
        /// Generation the timer was armed with
        generation: u64,
    },
}

/// Vertical sync notification from the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPulse {
    /// Frame time
    pub timestamp: Instant,
}

impl DisplayPulse {
    /// Pulse for the current instant
    pub fn now() -> Self {
        Self {
            timestamp: Instant::now(),
        }
    }
}

#[derive(Debug)]
enum LoopEvent {
    Wake(WakeRequest),
    Pulse(DisplayPulse),
    PulsesClosed,
    AnimationDue,
    InactivityDue,
    Closed,
}

/// Wake adapter driving one [`PointerController`]
pub struct PointerLoop {
    controller: Weak<PointerController>,
    wakes: mpsc::UnboundedReceiver<WakeRequest>,
    pulses: Option<mpsc::Receiver<DisplayPulse>>,
    animate_at: Option<Instant>,
    inactivity: Option<(Instant, u64)>,
}

impl PointerLoop {
    /// Create a loop for `controller`
    pub fn new(
        controller: Weak<PointerController>,
        wakes: mpsc::UnboundedReceiver<WakeRequest>,
        pulses: Option<mpsc::Receiver<DisplayPulse>>,
    ) -> Self {
        Self {
            controller,
            wakes,
            pulses,
            animate_at: None,
            inactivity: None,
        }
    }

    /// Run until the controller is dropped
    pub async fn run(mut self) {
        debug!(
            "Pointer loop running ({} display pulses)",
            if self.pulses.is_some() { "with" } else { "without" }
        );

        loop {
            let event = self.next_event().await;
            match event {
                LoopEvent::Closed => break,
                LoopEvent::PulsesClosed => {
                    debug!("Display pulses ended, falling back to timer pacing");
                    self.pulses = None;
                    continue;
                }
                _ => {}
            }

            let Some(controller) = self.controller.upgrade() else {
                break;
            };
            self.dispatch(&controller, event);
        }

        debug!("Pointer loop stopped");
    }

    async fn next_event(&mut self) -> LoopEvent {
        let animate_at = self.animate_at;
        let inactivity_at = self.inactivity.map(|(at, _)| at);
        let has_pulses = self.pulses.is_some();
        let now = Instant::now();

        tokio::select! {
            request = self.wakes.recv() => match request {
                Some(request) => LoopEvent::Wake(request),
                None => LoopEvent::Closed,
            },
            pulse = next_pulse(&mut self.pulses), if has_pulses => match pulse {
                Some(pulse) => LoopEvent::Pulse(pulse),
                None => LoopEvent::PulsesClosed,
            },
            _ = sleep_until(animate_at.unwrap_or(now)), if animate_at.is_some() => {
                LoopEvent::AnimationDue
            }
            _ = sleep_until(inactivity_at.unwrap_or(now)), if inactivity_at.is_some() => {
                LoopEvent::InactivityDue
            }
        }
    }

    fn dispatch(&mut self, controller: &PointerController, event: LoopEvent) {
        match event {
            LoopEvent::Wake(WakeRequest::Render) => controller.render(Instant::now()),
            LoopEvent::Wake(WakeRequest::Animate { at }) => {
                trace!("Animation frame due at {:?}", at);
                self.animate_at = Some(at);
            }
            LoopEvent::Wake(WakeRequest::InactivityTimeout { at, generation }) => {
                self.inactivity = Some((at, generation));
            }
            LoopEvent::Pulse(pulse) => {
                if self.animate_at.take().is_some() {
                    Self::tick(controller, pulse.timestamp);
                }
            }
            LoopEvent::AnimationDue => {
                self.animate_at = None;
                Self::tick(controller, Instant::now());
            }
            LoopEvent::InactivityDue => {
                if let Some((_, generation)) = self.inactivity.take() {
                    let now = Instant::now();
                    controller.handle_inactivity_timeout(generation, now);
                    controller.render(now);
                }
            }
            LoopEvent::PulsesClosed | LoopEvent::Closed => {}
        }
    }

    fn tick(controller: &PointerController, now: Instant) {
        controller.animate(now);
        controller.render(now);
    }
}

async fn next_pulse(pulses: &mut Option<mpsc::Receiver<DisplayPulse>>) -> Option<DisplayPulse> {
    match pulses {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

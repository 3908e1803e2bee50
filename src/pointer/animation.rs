//! Animation Scheduler
//!
//! One timeline drives two kinds of animation: alpha fades (pointer and
//! spots) and bitmap cycling for animated icons. Both are advanced from
//! elapsed wall time, so late or skipped wake-ups never desynchronize them.
//!
//! # Timing
//!
//! ```text
//! request(now) ──> armed_at = now, wake_at = max(now, last_eval) + frame_interval
//!                        │
//!        wake / vsync ───┘
//!                        ▼
//! begin_advance(now) ──> elapsed = now - armed_at   (pending cleared)
//!                        │
//!                        ├─> ramp() each fading alpha by elapsed / fade_duration
//!                        └─> BitmapTimeline::advance() by whole frames
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct PendingWake {
    armed_at: Instant,
    wake_at: Instant,
}

/// Coalescing wake scheduler shared by all animations
#[derive(Debug)]
pub struct AnimationScheduler {
    frame_interval: Duration,
    pending: Option<PendingWake>,
    last_evaluation: Option<Instant>,
}

impl AnimationScheduler {
    /// Create a scheduler that wakes once per `frame_interval`
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            pending: None,
            last_evaluation: None,
        }
    }

    /// Arm a wake unless one is already pending
    ///
    /// Returns the wake time when a new wake was armed, `None` when the
    /// request was coalesced into the pending one.
    pub fn request(&mut self, now: Instant) -> Option<Instant> {
        if self.pending.is_some() {
            return None;
        }

        let base = match self.last_evaluation {
            Some(last) if last > now => last,
            _ => now,
        };
        let wake_at = base + self.frame_interval;
        self.pending = Some(PendingWake {
            armed_at: base,
            wake_at,
        });
        trace!("Animation armed for {:?}", wake_at);
        Some(wake_at)
    }

    /// Whether a wake is armed
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time of the armed wake
    pub fn wake_at(&self) -> Option<Instant> {
        self.pending.map(|p| p.wake_at)
    }

    /// Consume the armed wake
    ///
    /// Returns the time elapsed since it was armed, or `None` if nothing was
    /// pending (a stray pulse).
    pub fn begin_advance(&mut self, now: Instant) -> Option<Duration> {
        let pending = self.pending.take()?;
        let elapsed = now.saturating_duration_since(pending.armed_at);
        self.last_evaluation = Some(match self.last_evaluation {
            Some(last) if last > now => last,
            _ => now,
        });
        Some(elapsed)
    }

    /// Frame interval
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

/// Move `alpha` toward `target` by `elapsed / duration`, never past it
pub fn ramp(alpha: f32, target: f32, elapsed: Duration, duration: Duration) -> f32 {
    let step = if duration.is_zero() {
        1.0
    } else {
        elapsed.as_secs_f32() / duration.as_secs_f32()
    };

    if target >= alpha {
        (alpha + step).min(target)
    } else {
        (alpha - step).max(target)
    }
}

/// Frame position inside an animated icon
#[derive(Debug, Clone, Copy)]
pub struct BitmapTimeline {
    frame_index: usize,
    last_frame_time: Instant,
}

impl BitmapTimeline {
    /// Start at the first frame
    pub fn start(now: Instant) -> Self {
        Self {
            frame_index: 0,
            last_frame_time: now,
        }
    }

    /// Current frame
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Advance by the number of whole frames elapsed since the last change
    ///
    /// Returns the new frame index when it changed. The frame clock moves by
    /// whole frames only, so the remainder carries into the next advance.
    pub fn advance(
        &mut self,
        now: Instant,
        frame_count: usize,
        duration_per_frame: Duration,
    ) -> Option<usize> {
        if frame_count == 0 || duration_per_frame.is_zero() {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.last_frame_time);
        if elapsed < duration_per_frame {
            return None;
        }

        let incr = (elapsed.as_nanos() / duration_per_frame.as_nanos()) as u64;
        let advanced = duration_per_frame.saturating_mul(incr.min(u32::MAX as u64) as u32);
        self.last_frame_time += advanced;
        self.frame_index = ((self.frame_index as u64 + incr) % frame_count as u64) as usize;
        Some(self.frame_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn test_requests_coalesce() {
        let mut scheduler = AnimationScheduler::new(FRAME);
        let now = Instant::now();

        assert_eq!(scheduler.request(now), Some(now + FRAME));
        assert_eq!(scheduler.request(now + Duration::from_millis(5)), None);
        assert_eq!(scheduler.wake_at(), Some(now + FRAME));
    }

    #[test]
    fn test_advance_reports_elapsed_since_arm() {
        let mut scheduler = AnimationScheduler::new(FRAME);
        let now = Instant::now();
        scheduler.request(now);

        let elapsed = scheduler.begin_advance(now + Duration::from_millis(40));
        assert_eq!(elapsed, Some(Duration::from_millis(40)));
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.begin_advance(now + Duration::from_millis(50)), None);
    }

    #[test]
    fn test_never_armed_before_last_evaluation() {
        let mut scheduler = AnimationScheduler::new(FRAME);
        let now = Instant::now();
        scheduler.request(now);
        scheduler.begin_advance(now + Duration::from_millis(100));

        // A caller with a stale timestamp must not arm in the past
        let wake = scheduler.request(now).unwrap();
        assert_eq!(wake, now + Duration::from_millis(100) + FRAME);
    }

    #[test]
    fn test_ramp_clamps_at_target() {
        let fade = Duration::from_millis(500);
        assert_eq!(ramp(1.0, 0.0, Duration::from_millis(250), fade), 0.5);
        assert_eq!(ramp(0.1, 0.0, Duration::from_millis(250), fade), 0.0);
        assert_eq!(ramp(0.9, 1.0, Duration::from_millis(250), fade), 1.0);
        assert_eq!(ramp(0.5, 0.0, Duration::ZERO, fade), 0.5);
        assert_eq!(ramp(0.5, 1.0, Duration::from_millis(1), Duration::ZERO), 1.0);
    }

    #[test]
    fn test_bitmap_advances_by_whole_frames() {
        let per_frame = Duration::from_millis(100);
        let start = Instant::now();
        let mut timeline = BitmapTimeline::start(start);

        assert_eq!(timeline.advance(start + Duration::from_millis(50), 4, per_frame), None);
        assert_eq!(
            timeline.advance(start + Duration::from_millis(250), 4, per_frame),
            Some(2)
        );
        // 50ms remainder carries over: 250 + 60 = 310 is past the 300 boundary
        assert_eq!(
            timeline.advance(start + Duration::from_millis(310), 4, per_frame),
            Some(3)
        );
    }

    #[test]
    fn test_bitmap_advances_on_exact_frame_boundary() {
        let per_frame = Duration::from_millis(100);
        let start = Instant::now();
        let mut timeline = BitmapTimeline::start(start);

        assert_eq!(timeline.advance(start + per_frame, 4, per_frame), Some(1));
        assert_eq!(timeline.advance(start + per_frame * 3, 4, per_frame), Some(3));
    }

    #[test]
    fn test_bitmap_wraps() {
        let per_frame = Duration::from_millis(100);
        let start = Instant::now();
        let mut timeline = BitmapTimeline::start(start);

        assert_eq!(
            timeline.advance(start + Duration::from_millis(1050), 4, per_frame),
            Some(2)
        );
        assert_eq!(timeline.frame_index(), 2);
    }
}

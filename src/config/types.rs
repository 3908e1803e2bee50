//! Configuration type definitions

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pointer::error::{PointerError, Result};
use crate::pointer::spot::SpotPolicy;
use crate::pointer::types::{DisplayId, InactivityTimeout, DEFAULT_DISPLAY_ID};

/// Pointer controller timing and capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerConfig {
    /// Duration of the pointer fade in either direction (ms)
    #[serde(default = "default_pointer_fade_duration_ms")]
    pub pointer_fade_duration_ms: u64,

    /// Duration of a spot fade-out (ms)
    #[serde(default = "default_spot_fade_duration_ms")]
    pub spot_fade_duration_ms: u64,

    /// Idle time before the pointer fades with the normal timeout (ms)
    #[serde(default = "default_inactivity_timeout_normal_ms")]
    pub inactivity_timeout_normal_ms: u64,

    /// Idle time before the pointer fades with the short timeout (ms)
    #[serde(default = "default_inactivity_timeout_short_ms")]
    pub inactivity_timeout_short_ms: u64,

    /// Maximum spots per display, fading ones included
    #[serde(default = "default_max_spots")]
    pub max_spots: usize,

    /// Maximum sprite handles kept for reuse
    #[serde(default = "default_max_recycled_sprites")]
    pub max_recycled_sprites: usize,

    /// Animation frame interval when no display pulse arrives first (ms)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Scale spots by contact pressure
    #[serde(default)]
    pub pressure_scales_spots: bool,

    /// Smallest spot scale when scaling by pressure
    #[serde(default = "default_min_spot_scale")]
    pub min_spot_scale: f32,
}

fn default_pointer_fade_duration_ms() -> u64 {
    500
}

fn default_spot_fade_duration_ms() -> u64 {
    200
}

fn default_inactivity_timeout_normal_ms() -> u64 {
    15_000
}

fn default_inactivity_timeout_short_ms() -> u64 {
    3_000
}

fn default_max_spots() -> usize {
    12
}

fn default_max_recycled_sprites() -> usize {
    12
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_min_spot_scale() -> f32 {
    0.5
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            pointer_fade_duration_ms: default_pointer_fade_duration_ms(),
            spot_fade_duration_ms: default_spot_fade_duration_ms(),
            inactivity_timeout_normal_ms: default_inactivity_timeout_normal_ms(),
            inactivity_timeout_short_ms: default_inactivity_timeout_short_ms(),
            max_spots: default_max_spots(),
            max_recycled_sprites: default_max_recycled_sprites(),
            frame_interval_ms: default_frame_interval_ms(),
            pressure_scales_spots: false,
            min_spot_scale: default_min_spot_scale(),
        }
    }
}

impl PointerConfig {
    /// Pointer fade duration
    pub fn pointer_fade_duration(&self) -> Duration {
        Duration::from_millis(self.pointer_fade_duration_ms)
    }

    /// Spot fade duration
    pub fn spot_fade_duration(&self) -> Duration {
        Duration::from_millis(self.spot_fade_duration_ms)
    }

    /// Animation frame interval
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Idle delay for a timeout selection
    pub fn inactivity_delay(&self, timeout: InactivityTimeout) -> Duration {
        match timeout {
            InactivityTimeout::Normal => Duration::from_millis(self.inactivity_timeout_normal_ms),
            InactivityTimeout::Short => Duration::from_millis(self.inactivity_timeout_short_ms),
        }
    }

    /// Spot pool behaviour
    pub fn spot_policy(&self) -> SpotPolicy {
        SpotPolicy {
            max_spots: self.max_spots,
            max_recycled: self.max_recycled_sprites,
            pressure_scales: self.pressure_scales_spots,
            min_scale: self.min_spot_scale,
        }
    }

    /// Check the values a controller cannot work with
    pub fn check(&self) -> Result<()> {
        if self.max_spots == 0 {
            return Err(PointerError::InvalidConfig(
                "max_spots must be at least 1".to_string(),
            ));
        }
        if self.frame_interval_ms == 0 {
            return Err(PointerError::InvalidConfig(
                "frame_interval_ms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_spot_scale) {
            return Err(PointerError::InvalidConfig(format!(
                "min_spot_scale ({}) must be within [0, 1]",
                self.min_spot_scale
            )));
        }
        if self.inactivity_timeout_short_ms > self.inactivity_timeout_normal_ms {
            return Err(PointerError::InvalidConfig(format!(
                "inactivity_timeout_short_ms ({}) cannot exceed inactivity_timeout_normal_ms ({})",
                self.inactivity_timeout_short_ms, self.inactivity_timeout_normal_ms
            )));
        }
        Ok(())
    }
}

/// Scripted demo session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Display the demo drives
    #[serde(default = "default_demo_display_id")]
    pub display_id: DisplayId,

    /// Logical display width
    #[serde(default = "default_demo_width")]
    pub width: i32,

    /// Logical display height
    #[serde(default = "default_demo_height")]
    pub height: i32,

    /// Simulated vsync interval (ms)
    #[serde(default = "default_vsync_interval_ms")]
    pub vsync_interval_ms: u64,

    /// Delay between scripted input events (ms)
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Simultaneous touch contacts in the spot phase
    #[serde(default = "default_touch_contacts")]
    pub touch_contacts: u32,
}

fn default_demo_display_id() -> DisplayId {
    DEFAULT_DISPLAY_ID
}

fn default_demo_width() -> i32 {
    1920
}

fn default_demo_height() -> i32 {
    1080
}

fn default_vsync_interval_ms() -> u64 {
    16
}

fn default_step_interval_ms() -> u64 {
    20
}

fn default_touch_contacts() -> u32 {
    3
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            display_id: default_demo_display_id(),
            width: default_demo_width(),
            height: default_demo_height(),
            vsync_interval_ms: default_vsync_interval_ms(),
            step_interval_ms: default_step_interval_ms(),
            touch_contacts: default_touch_contacts(),
        }
    }
}

impl DemoConfig {
    /// Simulated vsync interval
    pub fn vsync_interval(&self) -> Duration {
        Duration::from_millis(self.vsync_interval_ms)
    }

    /// Delay between scripted steps
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}

//! Shared pointer types
//!
//! Display identity, viewports, presentation modes and the touch id bitset
//! used by spot updates.

use serde::{Deserialize, Serialize};

/// Display identifier
pub type DisplayId = i32;

/// Sentinel for "no display"
pub const INVALID_DISPLAY_ID: DisplayId = -1;

/// Built-in display
pub const DEFAULT_DISPLAY_ID: DisplayId = 0;

/// Pointer icon identifier as understood by the icon policy
pub type IconId = i32;

/// Highest touch id representable in an [`IdBits`] set
pub const MAX_POINTER_ID: u32 = 31;

/// Mouse button bits for `set_button_state`
pub mod buttons {
    /// Primary (left) button
    pub const PRIMARY: u32 = 1 << 0;
    /// Secondary (right) button
    pub const SECONDARY: u32 = 1 << 1;
    /// Tertiary (middle) button
    pub const TERTIARY: u32 = 1 << 2;
    /// Back side button
    pub const BACK: u32 = 1 << 3;
    /// Forward side button
    pub const FORWARD: u32 = 1 << 4;
}

/// Fade transition style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transition {
    /// Jump straight to the final alpha
    Immediate,
    /// Ramp alpha over the configured fade duration
    #[default]
    Animated,
}

/// Pointer presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    /// Mouse cursor with the requested icon
    #[default]
    Pointer,

    /// Touch spots, pointer sprite shows the spot anchor
    Spot,

    /// Nothing drawn
    Hidden,
}

impl std::fmt::Display for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pointer => write!(f, "Pointer"),
            Self::Spot => write!(f, "Spot"),
            Self::Hidden => write!(f, "Hidden"),
        }
    }
}

impl std::str::FromStr for Presentation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pointer" | "cursor" | "mouse" => Ok(Self::Pointer),
            "spot" | "spots" | "touch" => Ok(Self::Spot),
            "hidden" | "none" | "off" => Ok(Self::Hidden),
            _ => Err(format!("Unknown presentation: {}", s)),
        }
    }
}

/// Inactivity timeout selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InactivityTimeout {
    /// Regular idle delay
    #[default]
    Normal,
    /// Short idle delay (e.g. while a stylus hovers)
    Short,
}

/// Logical bounds and display identity the pointer is confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Display this viewport belongs to
    pub display_id: DisplayId,
    /// Left edge (inclusive)
    pub logical_left: i32,
    /// Top edge (inclusive)
    pub logical_top: i32,
    /// Right edge (exclusive)
    pub logical_right: i32,
    /// Bottom edge (exclusive)
    pub logical_bottom: i32,
}

impl Viewport {
    /// Create a viewport from its edges
    pub fn new(display_id: DisplayId, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            display_id,
            logical_left: left,
            logical_top: top,
            logical_right: right,
            logical_bottom: bottom,
        }
    }

    /// Viewport that matches no display
    pub fn invalid() -> Self {
        Self::new(INVALID_DISPLAY_ID, 0, 0, 0, 0)
    }

    /// Width in logical pixels, zero when the edges do not fit an `i32` span
    pub fn width(&self) -> i32 {
        self.logical_right.checked_sub(self.logical_left).unwrap_or(0)
    }

    /// Height in logical pixels, zero when the edges do not fit an `i32` span
    pub fn height(&self) -> i32 {
        self.logical_bottom.checked_sub(self.logical_top).unwrap_or(0)
    }

    /// Whether the viewport names a display with a non-empty area
    pub fn is_valid(&self) -> bool {
        self.display_id != INVALID_DISPLAY_ID && self.width() > 0 && self.height() > 0
    }

    /// Inclusive pointer bounds, `None` for an invalid viewport
    pub fn bounds(&self) -> Option<Bounds> {
        if !self.is_valid() {
            return None;
        }
        Some(Bounds {
            min_x: self.logical_left as f32,
            min_y: self.logical_top as f32,
            max_x: (self.logical_right - 1) as f32,
            max_y: (self.logical_bottom - 1) as f32,
        })
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Inclusive pointer bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum x
    pub min_x: f32,
    /// Minimum y
    pub min_y: f32,
    /// Maximum x
    pub max_x: f32,
    /// Maximum y
    pub max_y: f32,
}

impl Bounds {
    /// Nearest in-bounds point
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }

    /// Check if a point is within bounds
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Center point
    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }
}

/// Coordinates of one touch contact
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerCoords {
    /// X position in display coordinates
    pub x: f32,
    /// Y position in display coordinates
    pub y: f32,
    /// Contact pressure; zero means hovering
    pub pressure: f32,
}

impl PointerCoords {
    /// Create coordinates for a contact
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }
}

/// Set of touch ids (0..=31)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IdBits(u32);

impl IdBits {
    /// Create from a raw mask, bit `n` set means id `n` is present
    pub const fn from_mask(mask: u32) -> Self {
        Self(mask)
    }

    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing the given ids; ids above [`MAX_POINTER_ID`] are ignored
    pub fn with_ids(ids: &[u32]) -> Self {
        let mut bits = Self::empty();
        for &id in ids {
            bits.mark(id);
        }
        bits
    }

    /// Raw mask
    pub fn mask(&self) -> u32 {
        self.0
    }

    /// Add an id; ids above [`MAX_POINTER_ID`] are ignored
    pub fn mark(&mut self, id: u32) {
        if id <= MAX_POINTER_ID {
            self.0 |= 1 << id;
        }
    }

    /// Remove an id
    pub fn clear(&mut self, id: u32) {
        if id <= MAX_POINTER_ID {
            self.0 &= !(1 << id);
        }
    }

    /// Check membership
    pub fn has(&self, id: u32) -> bool {
        id <= MAX_POINTER_ID && self.0 & (1 << id) != 0
    }

    /// Whether no id is present
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of ids present
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        let mut remaining = self.0;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let id = remaining.trailing_zeros();
            remaining &= remaining - 1;
            Some(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_from_str() {
        assert_eq!(
            "pointer".parse::<Presentation>().unwrap(),
            Presentation::Pointer
        );
        assert_eq!("touch".parse::<Presentation>().unwrap(), Presentation::Spot);
        assert_eq!("off".parse::<Presentation>().unwrap(), Presentation::Hidden);
        assert!("sparkles".parse::<Presentation>().is_err());
    }

    #[test]
    fn test_viewport_bounds() {
        let viewport = Viewport::new(0, 0, 0, 1920, 1080);
        let bounds = viewport.bounds().unwrap();
        assert_eq!(bounds.max_x, 1919.0);
        assert_eq!(bounds.max_y, 1079.0);
        assert_eq!(bounds.clamp(-5.0, 5000.0), (0.0, 1079.0));
        assert_eq!(bounds.center(), (959.5, 539.5));
    }

    #[test]
    fn test_invalid_viewport_has_no_bounds() {
        assert!(Viewport::invalid().bounds().is_none());
        assert!(Viewport::new(3, 0, 0, 0, 100).bounds().is_none());
        assert!(Viewport::new(INVALID_DISPLAY_ID, 0, 0, 10, 10).bounds().is_none());
    }

    #[test]
    fn test_extreme_edges_are_invalid() {
        let viewport = Viewport::new(0, i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(viewport.width(), 0);
        assert_eq!(viewport.height(), 0);
        assert!(!viewport.is_valid());
        assert!(viewport.bounds().is_none());

        let reversed = Viewport::new(0, i32::MAX, 0, i32::MIN, 10);
        assert_eq!(reversed.width(), 0);
        assert!(!reversed.is_valid());
    }

    #[test]
    fn test_id_bits() {
        let mut bits = IdBits::with_ids(&[3, 1, 2, 40]);
        assert_eq!(bits.count(), 3);
        assert!(bits.has(1));
        assert!(!bits.has(40));
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        bits.clear(2);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!IdBits::empty().iter().any(|_| true));
        assert_eq!(IdBits::from_mask(1 << 31).iter().collect::<Vec<_>>(), vec![31]);
    }
}

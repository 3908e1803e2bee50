//! Sprite rendering collaborator
//!
//! The controller never composites pixels itself. It hands a [`SpriteUpdate`]
//! per sprite to a [`SpriteController`] once the state lock is released.

use std::fmt;
use std::sync::Arc;

use super::error::Result;
use super::types::{DisplayId, IconId, INVALID_DISPLAY_ID};

/// Layer of the pointer sprite
pub const BASE_LAYER_POINTER: i32 = 0;

/// Base layer of spot sprites; a spot is drawn at `BASE_LAYER_SPOT + id`
pub const BASE_LAYER_SPOT: i32 = 1;

/// Icon bitmap plus hotspot
///
/// Pixel data is shared, so cloning an icon is cheap.
#[derive(Clone, Default)]
pub struct SpriteIcon {
    /// Icon id this bitmap was loaded for
    pub style: IconId,
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Hotspot X offset
    pub hotspot_x: f32,
    /// Hotspot Y offset
    pub hotspot_y: f32,
    /// Pixel data (RGBA)
    pub pixels: Arc<[u8]>,
}

impl SpriteIcon {
    /// Create an icon from RGBA pixels
    pub fn new(style: IconId, width: u32, height: u32, hotspot: (f32, f32), pixels: Vec<u8>) -> Self {
        Self {
            style,
            width,
            height,
            hotspot_x: hotspot.0,
            hotspot_y: hotspot.1,
            pixels: pixels.into(),
        }
    }

    /// Whether the icon carries a bitmap
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Same style and the very same pixel buffer
    pub fn same_as(&self, other: &SpriteIcon) -> bool {
        self.style == other.style
            && self.width == other.width
            && self.height == other.height
            && Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for SpriteIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteIcon")
            .field("style", &self.style)
            .field("size", &(self.width, self.height))
            .field("hotspot", &(self.hotspot_x, self.hotspot_y))
            .finish()
    }
}

/// Identifier of a sprite inside the sprite controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u64);

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sprite#{}", self.0)
    }
}

/// Owned rendering handle
///
/// Deliberately neither `Clone` nor `Copy`: whoever holds the handle owns the
/// sprite, so a handle can only ever sit in one place.
#[derive(Debug, PartialEq, Eq)]
pub struct SpriteHandle {
    id: SpriteId,
}

impl SpriteHandle {
    /// Wrap a sprite controller identifier
    pub fn new(id: u64) -> Self {
        Self { id: SpriteId(id) }
    }

    /// Identifier used for updates
    pub fn id(&self) -> SpriteId {
        self.id
    }
}

/// Icon change carried by an update
#[derive(Debug, Clone, Default)]
pub enum IconUpdate {
    /// Keep the current bitmap
    #[default]
    Unchanged,
    /// Replace the bitmap
    Set(SpriteIcon),
    /// Drop the bitmap
    Clear,
}

/// Complete visual state for one sprite
#[derive(Debug, Clone)]
pub struct SpriteUpdate {
    /// Z-order layer
    pub layer: i32,
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Opacity in [0, 1]
    pub alpha: f32,
    /// Uniform scale
    pub scale: f32,
    /// Display to draw on
    pub display_id: DisplayId,
    /// Whether the sprite is drawn at all
    pub visible: bool,
    /// Bitmap change
    pub icon: IconUpdate,
}

impl SpriteUpdate {
    /// Hidden sprite without a bitmap, used before a handle is recycled
    pub fn cleared() -> Self {
        Self {
            layer: 0,
            x: 0.0,
            y: 0.0,
            alpha: 0.0,
            scale: 1.0,
            display_id: INVALID_DISPLAY_ID,
            visible: false,
            icon: IconUpdate::Clear,
        }
    }
}

/// Sprite compositing collaborator
///
/// Only ever called from the pointer event loop with the controller's state
/// lock released.
pub trait SpriteController: Send + Sync {
    /// Obtain a fresh sprite
    fn acquire(&self) -> Result<SpriteHandle>;

    /// Give a sprite back
    fn release(&self, handle: SpriteHandle);

    /// Apply a visual state to a sprite
    fn update(&self, sprite: SpriteId, update: &SpriteUpdate) -> Result<()>;

    /// Start batching updates
    fn open_transaction(&self) {}

    /// Flush batched updates
    fn close_transaction(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_identity() {
        let icon = SpriteIcon::new(1000, 2, 2, (0.0, 0.0), vec![255; 16]);
        let copy = icon.clone();
        let twin = SpriteIcon::new(1000, 2, 2, (0.0, 0.0), vec![255; 16]);

        assert!(icon.is_valid());
        assert!(icon.same_as(&copy));
        assert!(!icon.same_as(&twin));
        assert!(!SpriteIcon::default().is_valid());
    }

    #[test]
    fn test_cleared_update() {
        let update = SpriteUpdate::cleared();
        assert!(!update.visible);
        assert!(matches!(update.icon, IconUpdate::Clear));
        assert_eq!(update.display_id, INVALID_DISPLAY_ID);
    }
}

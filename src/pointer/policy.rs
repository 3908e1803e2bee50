//! Icon policy collaborator and resource loading
//!
//! The policy owns icon selection and bitmap decoding. The controller only
//! asks it for resources keyed by display, always from the event loop and
//! never with the state lock held.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::Result;
use super::sprite::SpriteIcon;
use super::types::{DisplayId, IconId};

/// Icons used by touch spots
#[derive(Debug, Clone, Default)]
pub struct PointerResources {
    /// Spot for a hovering contact
    pub spot_hover: SpriteIcon,
    /// Spot for a touching contact
    pub spot_touch: SpriteIcon,
    /// Pointer icon while in spot presentation
    pub spot_anchor: SpriteIcon,
}

/// Multi-frame pointer icon
#[derive(Debug, Clone)]
pub struct PointerAnimation {
    /// Frames in display order
    pub frames: Vec<SpriteIcon>,
    /// Time each frame stays on screen
    pub duration_per_frame: Duration,
}

impl PointerAnimation {
    /// Whether the animation can be cycled
    pub fn is_playable(&self) -> bool {
        !self.frames.is_empty() && !self.duration_per_frame.is_zero()
    }
}

/// Icons and animations beyond the default pointer
#[derive(Debug, Clone, Default)]
pub struct AdditionalResources {
    /// Static icons by id
    pub icons: HashMap<IconId, SpriteIcon>,
    /// Animated icons by id
    pub animations: HashMap<IconId, PointerAnimation>,
}

impl AdditionalResources {
    /// Whether nothing is loaded
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty() && self.animations.is_empty()
    }
}

/// Icon policy interface
///
/// Any type providing these capabilities can drive the controller; tests use
/// fakes.
pub trait PointerPolicy: Send + Sync {
    /// Default pointer icon for a display
    fn load_pointer_icon(&self, display_id: DisplayId) -> Result<SpriteIcon>;

    /// Spot icons for a display
    fn load_pointer_resources(&self, display_id: DisplayId) -> Result<PointerResources>;

    /// Additional mouse icons and animations for a display
    fn load_additional_mouse_resources(&self, display_id: DisplayId)
        -> Result<AdditionalResources>;

    /// Id that selects the default pointer icon
    fn default_pointer_icon_id(&self) -> IconId;

    /// Id reserved for user-supplied icons
    fn custom_pointer_icon_id(&self) -> IconId;
}

/// How much to reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadScope {
    /// Spot resources, pointer icon and (in pointer presentation) additional icons
    All,
    /// Additional mouse icons only
    AdditionalOnly,
}

/// Pending resource load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Display to load for
    pub display_id: DisplayId,
    /// What to load
    pub scope: ReloadScope,
    /// Whether additional mouse resources are wanted
    pub include_additional: bool,
}

impl ResourceRequest {
    /// Merge a newer request into this one; the wider scope wins
    pub fn merge(self, newer: ResourceRequest) -> ResourceRequest {
        let scope = if self.scope == ReloadScope::All || newer.scope == ReloadScope::All {
            ReloadScope::All
        } else {
            ReloadScope::AdditionalOnly
        };
        ResourceRequest {
            display_id: newer.display_id,
            scope,
            include_additional: newer.include_additional,
        }
    }
}

/// Outcome for additional resources
#[derive(Debug, Clone)]
pub enum AdditionalLoad {
    /// Fresh resources
    Loaded(AdditionalResources),
    /// Load failed, keep whatever is installed
    Failed,
    /// Not wanted in the current presentation, drop installed ones
    Cleared,
}

/// Result of one resource load; `None` slots keep their previous value
#[derive(Debug, Clone)]
pub struct LoadedResources {
    /// Request that produced this load
    pub request: ResourceRequest,
    /// Spot resources
    pub resources: Option<PointerResources>,
    /// Default pointer icon
    pub pointer_icon: Option<SpriteIcon>,
    /// Additional mouse resources
    pub additional: AdditionalLoad,
}

/// Query the policy for everything a request asks for
///
/// Failures are logged here and leave the corresponding slot empty.
pub fn load_resources(policy: &dyn PointerPolicy, request: ResourceRequest) -> LoadedResources {
    let display_id = request.display_id;
    debug!("Loading pointer resources: {:?}", request);

    let (resources, pointer_icon) = match request.scope {
        ReloadScope::All => {
            let resources = policy
                .load_pointer_resources(display_id)
                .map_err(|e| warn!("Keeping previous spot resources: {}", e))
                .ok();
            let pointer_icon = policy
                .load_pointer_icon(display_id)
                .map_err(|e| warn!("Keeping previous pointer icon: {}", e))
                .ok();
            (resources, pointer_icon)
        }
        ReloadScope::AdditionalOnly => (None, None),
    };

    let additional = if request.include_additional {
        match policy.load_additional_mouse_resources(display_id) {
            Ok(loaded) => AdditionalLoad::Loaded(loaded),
            Err(e) => {
                warn!("Keeping previous additional mouse resources: {}", e);
                AdditionalLoad::Failed
            }
        }
    } else if request.scope == ReloadScope::All {
        AdditionalLoad::Cleared
    } else {
        AdditionalLoad::Failed
    };

    LoadedResources {
        request,
        resources,
        pointer_icon,
        additional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::error::PointerError;

    struct BrokenPolicy;

    impl PointerPolicy for BrokenPolicy {
        fn load_pointer_icon(&self, display_id: DisplayId) -> Result<SpriteIcon> {
            Ok(SpriteIcon::new(1000, 1, 1, (0.0, 0.0), vec![0; 4 * display_id.max(1) as usize]))
        }

        fn load_pointer_resources(&self, display_id: DisplayId) -> Result<PointerResources> {
            Err(PointerError::ResourceLoadFailed {
                resource: "spot resources",
                display_id,
                reason: "missing".to_string(),
            })
        }

        fn load_additional_mouse_resources(
            &self,
            display_id: DisplayId,
        ) -> Result<AdditionalResources> {
            Err(PointerError::ResourceLoadFailed {
                resource: "additional mouse resources",
                display_id,
                reason: "missing".to_string(),
            })
        }

        fn default_pointer_icon_id(&self) -> IconId {
            1000
        }

        fn custom_pointer_icon_id(&self) -> IconId {
            -1
        }
    }

    #[test]
    fn test_failed_slots_are_empty() {
        let request = ResourceRequest {
            display_id: 0,
            scope: ReloadScope::All,
            include_additional: true,
        };
        let loaded = load_resources(&BrokenPolicy, request);

        assert!(loaded.resources.is_none());
        assert!(loaded.pointer_icon.is_some());
        assert!(matches!(loaded.additional, AdditionalLoad::Failed));
    }

    #[test]
    fn test_full_reload_without_additional_clears_them() {
        let request = ResourceRequest {
            display_id: 0,
            scope: ReloadScope::All,
            include_additional: false,
        };
        let loaded = load_resources(&BrokenPolicy, request);
        assert!(matches!(loaded.additional, AdditionalLoad::Cleared));
    }

    #[test]
    fn test_request_merge_keeps_widest_scope() {
        let full = ResourceRequest {
            display_id: 0,
            scope: ReloadScope::All,
            include_additional: false,
        };
        let additional = ResourceRequest {
            display_id: 1,
            scope: ReloadScope::AdditionalOnly,
            include_additional: true,
        };

        let merged = full.merge(additional);
        assert_eq!(merged.scope, ReloadScope::All);
        assert_eq!(merged.display_id, 1);
        assert!(merged.include_additional);
    }
}

//! Pointer Controller Error Types
//!
//! None of these errors is fatal to input delivery. Every failure degrades
//! visual fidelity only, and `recovery_action` tells the caller how.

use thiserror::Error;

use super::types::{DisplayId, IconId};

/// Result type for pointer controller operations
pub type Result<T> = std::result::Result<T, PointerError>;

/// Pointer controller error types
#[derive(Error, Debug)]
pub enum PointerError {
    /// Icon policy could not load a resource
    #[error("Failed to load {resource} for display {display_id}: {reason}")]
    ResourceLoadFailed {
        /// Resource kind ("pointer icon", "spot resources", ...)
        resource: &'static str,
        /// Display the resource was requested for
        display_id: DisplayId,
        /// Collaborator-supplied reason
        reason: String,
    },

    /// Requested icon is not among the loaded resources
    #[error("No resource for pointer icon {0}")]
    IconNotFound(IconId),

    /// Sprite controller could not supply a rendering handle
    #[error("Sprite acquisition failed: {0}")]
    SpriteAcquisitionFailed(String),

    /// Sprite controller rejected an update
    #[error("Sprite {sprite} update failed: {reason}")]
    SpriteUpdateFailed {
        /// Raw sprite identifier
        sprite: u64,
        /// Collaborator-supplied reason
        reason: String,
    },

    /// Spot update referenced an id without coordinates
    #[error("Invalid spot id {0}")]
    InvalidSpotId(u32),

    /// Controller configuration is unusable
    #[error("Invalid pointer configuration: {0}")]
    InvalidConfig(String),
}

/// Error classification for recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Icon policy failures
    Resource,
    /// Sprite controller failures
    Sprite,
    /// Malformed spot updates
    Spot,
    /// Configuration errors
    Config,
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &PointerError) -> ErrorType {
    match error {
        PointerError::ResourceLoadFailed { .. } | PointerError::IconNotFound(_) => {
            ErrorType::Resource
        }
        PointerError::SpriteAcquisitionFailed(_) | PointerError::SpriteUpdateFailed { .. } => {
            ErrorType::Sprite
        }
        PointerError::InvalidSpotId(_) => ErrorType::Spot,
        PointerError::InvalidConfig(_) => ErrorType::Config,
    }
}

/// Recovery action to take after error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Keep the last successfully loaded value
    KeepPrevious,

    /// Skip this item for the current render pass and retry on the next tick
    RetryNextFrame,

    /// Ignore the offending item
    Skip,

    /// Propagate to the caller
    Fail,
}

/// Determine recovery action for error
pub fn recovery_action(error: &PointerError) -> RecoveryAction {
    match classify_error(error) {
        ErrorType::Resource => RecoveryAction::KeepPrevious,
        ErrorType::Sprite => RecoveryAction::RetryNextFrame,
        ErrorType::Spot => RecoveryAction::Skip,
        ErrorType::Config => RecoveryAction::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let error = PointerError::ResourceLoadFailed {
            resource: "pointer icon",
            display_id: 0,
            reason: "missing".to_string(),
        };
        assert_eq!(classify_error(&error), ErrorType::Resource);

        let error = PointerError::SpriteAcquisitionFailed("out of surfaces".to_string());
        assert_eq!(classify_error(&error), ErrorType::Sprite);

        let error = PointerError::InvalidSpotId(40);
        assert_eq!(classify_error(&error), ErrorType::Spot);

        let error = PointerError::InvalidConfig("max_spots".to_string());
        assert_eq!(classify_error(&error), ErrorType::Config);
    }

    #[test]
    fn test_recovery_actions() {
        assert_eq!(
            recovery_action(&PointerError::IconNotFound(1004)),
            RecoveryAction::KeepPrevious
        );
        assert_eq!(
            recovery_action(&PointerError::SpriteUpdateFailed {
                sprite: 3,
                reason: "surface lost".to_string()
            }),
            RecoveryAction::RetryNextFrame
        );
        assert_eq!(
            recovery_action(&PointerError::InvalidSpotId(7)),
            RecoveryAction::Skip
        );
        assert_eq!(
            recovery_action(&PointerError::InvalidConfig("max_spots".to_string())),
            RecoveryAction::Fail
        );
    }

    #[test]
    fn test_error_display() {
        let error = PointerError::ResourceLoadFailed {
            resource: "spot resources",
            display_id: 2,
            reason: "no density bucket".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to load spot resources for display 2: no density bucket"
        );
    }
}

//! Scene errors

use thiserror::Error;

use super::component::ComponentState;
use super::transform::TransformError;
use super::{ComponentId, EntityId};

/// Errors reported by [`Scene`](super::Scene) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Entity was destroyed or never existed
    #[error("Entity {0:?} no longer exists")]
    StaleEntity(EntityId),

    /// Component was destroyed or never existed
    #[error("Component {0:?} no longer exists")]
    StaleComponent(ComponentId),

    /// Reparenting would make an entity its own ancestor
    #[error("Cannot parent entity {child:?} under {parent:?}: it is the entity itself or one of its descendants")]
    HierarchyCycle {
        /// Entity being reparented
        child: EntityId,
        /// Requested parent
        parent: EntityId,
    },

    /// Lifecycle state machine violation
    #[error("Invalid component transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: ComponentState,
        /// Requested state
        to: ComponentState,
    },

    /// Component is running one of its own hooks and cannot be borrowed
    #[error("Component {0:?} is busy running a lifecycle hook")]
    ComponentBusy(ComponentId),

    /// Component exists but is not of the requested type
    #[error("Component {component:?} is a {found}, not a {expected}")]
    TypeMismatch {
        /// Component handle
        component: ComponentId,
        /// Requested type
        expected: &'static str,
        /// Actual type
        found: &'static str,
    },

    /// Transform hierarchy failure
    #[error(transparent)]
    Transform(#[from] TransformError),
}

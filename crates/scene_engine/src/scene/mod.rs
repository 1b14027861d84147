//! Scene management system
//!
//! Runtime scene model following Game Engine Architecture Chapter 11.2.7
//! (scene graphs) and 16.6 (game object lifecycle):
//!
//! ```text
//! Scene
//!  ├── TransformTree   (one node per entity, lazy world poses)
//!  ├── Entities        (name, active flag, ordered components)
//!  └── Components      (behaviour + lifecycle state machine)
//! ```
//!
//! Children are expressed purely through transform parenting. Every handle
//! is generational; using one after its target was destroyed yields
//! [`SceneError::StaleEntity`] or [`SceneError::StaleComponent`].

mod collision;
mod component;
mod entity;
mod error;
mod transform;
mod world;

#[cfg(test)]
mod tests;

pub use collision::{
    collision_event, Collision, CollisionCallbackHandle, CollisionHandler, CollisionPhase, COLLISION_ENTER,
    COLLISION_EXIT, COLLISION_STAY,
};
pub use component::{downcast_mut, downcast_ref, AsAny, Component, ComponentContext, ComponentState};
pub use entity::{ComponentId, EntityId};
pub use error::SceneError;
pub use transform::{NodeId, TransformError, TransformTree};
pub use world::Scene;

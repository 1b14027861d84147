//! Component behaviours and their lifecycle
//!
//! A component is user behaviour attached to exactly one entity. The scene
//! drives it through a fixed state machine and calls the matching hook on
//! each transition:
//!
//! ```text
//! Created ──start──▶ Started ──enable──▶ Enabled ◀──▶ Disabled
//!    │                  │                                │
//!    └──────────────────┴──────────destroy───────────────┘──▶ Destroyed
//! ```
//!
//! `Destroyed` is terminal. An enabled component is always disabled before
//! it is destroyed.

use std::any::Any;

use crate::events::EventScheduler;
use crate::foundation::math::Transform;

use super::error::SceneError;
use super::world::Scene;
use super::{ComponentId, EntityId};

/// Lifecycle state of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
    /// Attached, `on_create` has run, waiting for the next lifecycle pass
    Created,
    /// `on_start` has run
    Started,
    /// Receiving per-frame updates
    Enabled,
    /// Started but not receiving updates
    Disabled,
    /// Torn down; no further callbacks
    Destroyed,
}

impl ComponentState {
    /// Whether the state machine allows moving from `self` to `next`
    pub const fn can_transition_to(self, next: Self) -> bool {
        use ComponentState::{Created, Destroyed, Disabled, Enabled, Started};
        matches!(
            (self, next),
            (Created, Started | Destroyed)
                | (Started, Enabled | Disabled | Destroyed)
                | (Enabled, Disabled)
                | (Disabled, Enabled | Destroyed)
        )
    }

    /// Checked transition
    pub fn transition(self, next: Self) -> Result<Self, SceneError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SceneError::InvalidTransition { from: self, to: next })
        }
    }

    /// Whether `on_start` has already run
    pub const fn has_started(self) -> bool {
        matches!(self, Self::Started | Self::Enabled | Self::Disabled)
    }
}

/// Lifecycle hook selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Create,
    Start,
    Enable,
    Update,
    Disable,
    Destroy,
}

impl Hook {
    pub(crate) const fn for_state(state: ComponentState) -> Option<Self> {
        match state {
            ComponentState::Created => None,
            ComponentState::Started => Some(Self::Start),
            ComponentState::Enabled => Some(Self::Enable),
            ComponentState::Disabled => Some(Self::Disable),
            ComponentState::Destroyed => Some(Self::Destroy),
        }
    }

    pub(crate) fn call(self, component: &mut dyn Component, ctx: &mut ComponentContext<'_>) {
        match self {
            Self::Create => component.on_create(ctx),
            Self::Start => component.on_start(ctx),
            Self::Enable => component.on_enable(ctx),
            Self::Update => component.on_update(ctx),
            Self::Disable => component.on_disable(ctx),
            Self::Destroy => component.on_destroy(ctx),
        }
    }
}

/// Upcast helper so boxed components can be downcast to their concrete type
pub trait AsAny: Any {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as `Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour attached to an entity
///
/// Every hook has an empty default, so implementors only override what they
/// need. Hooks receive a [`ComponentContext`] giving full access to the scene,
/// which means a hook may create or destroy entities, add components, or
/// raise events. Structural changes made from inside a hook follow the
/// deferral rules of the scene: new components start on the next pass,
/// destruction happens at the end of the pass.
pub trait Component: AsAny {
    /// Called once, immediately when the component is attached
    fn on_create(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once, on the first lifecycle pass where the component is active
    fn on_start(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called whenever the component becomes active
    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once per frame while enabled
    fn on_update(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called whenever the component stops being active
    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once, when the component is torn down
    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Name used in log output
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Downcast a component trait object to its concrete type
pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

/// Mutably downcast a component trait object to its concrete type
pub fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

/// What a component sees while one of its hooks runs
pub struct ComponentContext<'a> {
    scene: &'a mut Scene,
    entity: EntityId,
    component: ComponentId,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, entity: EntityId, component: ComponentId) -> Self {
        Self {
            scene,
            entity,
            component,
        }
    }

    /// Entity owning the running component
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Handle of the running component
    pub const fn component_id(&self) -> ComponentId {
        self.component
    }

    /// Scene the component lives in
    pub fn scene(&self) -> &Scene {
        &*self.scene
    }

    /// Mutable access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut *self.scene
    }

    /// Event scheduler shared with the frame driver
    pub fn events(&self) -> &EventScheduler {
        self.scene.events()
    }

    /// Frame index of the running lifecycle pass
    pub fn frame(&self) -> u64 {
        self.scene.frame()
    }

    /// Seconds since the previous frame
    pub fn delta_time(&self) -> f32 {
        self.scene.delta_time()
    }

    /// World transform of the owning entity
    pub fn world_transform(&self) -> Result<Transform, SceneError> {
        self.scene.world_transform(self.entity)
    }

    /// Name of the owning entity
    pub fn entity_name(&self) -> Result<&str, SceneError> {
        self.scene.entity_name(self.entity)
    }
}

//! Entity and component handles and their bookkeeping records

use super::component::{Component, ComponentState, Hook};
use super::transform::NodeId;

slotmap::new_key_type! {
    /// Generational handle to an entity
    pub struct EntityId;

    /// Generational handle to an attached component
    pub struct ComponentId;
}

/// Per-entity record
#[derive(Debug)]
pub(crate) struct EntityRecord {
    pub name: String,
    pub active: bool,
    pub node: NodeId,
    /// Attached components in insertion order
    pub components: Vec<ComponentId>,
    pub destroy_pending: bool,
}

impl EntityRecord {
    pub fn new(name: String, node: NodeId) -> Self {
        Self {
            name,
            active: true,
            node,
            components: Vec::new(),
            destroy_pending: false,
        }
    }
}

/// Per-component record
pub(crate) struct ComponentSlot {
    pub entity: EntityId,
    /// The component's own enabled flag, independent of its entity
    pub enabled: bool,
    pub state: ComponentState,
    /// `None` while one of the component's hooks is running
    pub behaviour: Option<Box<dyn Component>>,
    pub type_name: &'static str,
    /// Hooks raised against the component while it was running one
    pub deferred: Vec<Hook>,
    pub destroy_pending: bool,
}

impl ComponentSlot {
    pub fn new(entity: EntityId, behaviour: Box<dyn Component>, enabled: bool) -> Self {
        let type_name = behaviour.name();
        Self {
            entity,
            enabled,
            state: ComponentState::Created,
            behaviour: Some(behaviour),
            type_name,
            deferred: Vec::new(),
            destroy_pending: false,
        }
    }
}

impl std::fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("entity", &self.entity)
            .field("type", &self.type_name)
            .field("enabled", &self.enabled)
            .field("state", &self.state)
            .field("busy", &self.behaviour.is_none())
            .finish_non_exhaustive()
    }
}

//! Scene: entity storage and the component lifecycle pass
//!
//! The scene owns every entity, component and transform node. Handles
//! ([`EntityId`], [`ComponentId`], [`NodeId`]) are generational slotmap keys,
//! so a handle to something that was destroyed is detected instead of
//! aliasing a newer object.
//!
//! ## Lifecycle pass
//!
//! [`Scene::run_lifecycle_pass`] runs once per frame:
//!
//! 1. Start pending components: `on_start`, then `on_enable` when active.
//!    Components attached during this step start on the next pass.
//! 2. Update every enabled component. Entities are visited in
//!    [`UpdateOrder`]; components of one entity in attachment order.
//!    The visiting order is snapshotted before the first update runs.
//! 3. Tear down everything marked for destruction, children before parents.
//!
//! Mutations made from inside hooks never invalidate the iteration in
//! progress: new components wait for the next start step, destruction waits
//! for the end of the pass.

use std::any::type_name;

use slotmap::{SecondaryMap, SlotMap};

use crate::core::config::{SceneConfig, UpdateOrder};
use crate::events::EventScheduler;
use crate::foundation::logging::SCENE;
use crate::foundation::math::{Transform, Vec3};

use super::component::{downcast_mut, downcast_ref, Component, ComponentContext, ComponentState, Hook};
use super::entity::{ComponentSlot, EntityRecord};
use super::error::SceneError;
use super::transform::{NodeId, TransformError, TransformTree};
use super::{ComponentId, EntityId};

/// Runtime scene: entities, their components and the transform hierarchy
#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    events: EventScheduler,
    transforms: TransformTree,
    entities: SlotMap<EntityId, EntityRecord>,
    owners: SecondaryMap<NodeId, EntityId>,
    creation_order: Vec<EntityId>,
    components: SlotMap<ComponentId, ComponentSlot>,
    pending_start: Vec<ComponentId>,
    pending_destroy: Vec<EntityId>,
    pending_component_destroy: Vec<ComponentId>,
    /// Hooks still owed to busy components whose slot was reclaimed
    orphaned_hooks: Vec<(ComponentId, Vec<Hook>)>,
    frame: u64,
    delta_time: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default(), EventScheduler::default())
    }
}

fn stale_entity(entity: EntityId) -> SceneError {
    log::warn!(target: SCENE, "Operation on stale entity {entity:?}");
    SceneError::StaleEntity(entity)
}

fn stale_component(component: ComponentId) -> SceneError {
    log::warn!(target: SCENE, "Operation on stale component {component:?}");
    SceneError::StaleComponent(component)
}

impl Scene {
    /// Create an empty scene sharing `events` with the rest of the engine
    pub fn new(config: SceneConfig, events: EventScheduler) -> Self {
        let capacity = config.initial_entity_capacity;
        Self {
            config,
            events,
            transforms: TransformTree::with_capacity(capacity),
            entities: SlotMap::with_capacity_and_key(capacity),
            owners: SecondaryMap::with_capacity(capacity),
            creation_order: Vec::with_capacity(capacity),
            components: SlotMap::with_key(),
            pending_start: Vec::new(),
            pending_destroy: Vec::new(),
            pending_component_destroy: Vec::new(),
            orphaned_hooks: Vec::new(),
            frame: 0,
            delta_time: 0.0,
        }
    }

    /// Scene configuration
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Change the update traversal order; applies from the next update step
    pub fn set_update_order(&mut self, order: UpdateOrder) {
        self.config.update_order = order;
    }

    /// Event scheduler handle
    pub const fn events(&self) -> &EventScheduler {
        &self.events
    }

    /// Frame index of the last lifecycle pass
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Delta time of the last lifecycle pass
    pub const fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Transform hierarchy
    pub const fn transforms(&self) -> &TransformTree {
        &self.transforms
    }

    /// Mutable transform hierarchy for pose edits
    ///
    /// Reparenting goes through [`Scene::set_parent`] so component activity
    /// follows the hierarchy.
    pub fn transforms_mut(&mut self) -> &mut TransformTree {
        &mut self.transforms
    }

    fn record(&self, entity: EntityId) -> Result<&EntityRecord, SceneError> {
        self.entities.get(entity).ok_or_else(|| stale_entity(entity))
    }

    fn record_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord, SceneError> {
        self.entities.get_mut(entity).ok_or_else(|| stale_entity(entity))
    }

    fn slot(&self, component: ComponentId) -> Result<&ComponentSlot, SceneError> {
        self.components.get(component).ok_or_else(|| stale_component(component))
    }

    // ---------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------

    /// Create a root entity with an identity transform
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.create_entity_with_transform(name, Transform::identity())
    }

    /// Create a root entity with the given local transform
    pub fn create_entity_with_transform(&mut self, name: impl Into<String>, local: Transform) -> EntityId {
        let node = self.transforms.insert(local);
        let entity = self.entities.insert(EntityRecord::new(name.into(), node));
        self.owners.insert(node, entity);
        self.creation_order.push(entity);
        log::debug!(target: SCENE, "Created entity {entity:?}");
        entity
    }

    /// Create an entity parented under `parent`
    pub fn create_child(&mut self, parent: EntityId, name: impl Into<String>) -> Result<EntityId, SceneError> {
        self.record(parent)?;
        let child = self.create_entity(name);
        self.set_parent(child, Some(parent), false)?;
        Ok(child)
    }

    /// Whether the handle refers to a live entity
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live entities in creation order
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.creation_order.iter().copied()
    }

    /// Entity name
    pub fn entity_name(&self, entity: EntityId) -> Result<&str, SceneError> {
        Ok(self.record(entity)?.name.as_str())
    }

    /// Rename an entity
    pub fn set_entity_name(&mut self, entity: EntityId, name: impl Into<String>) -> Result<(), SceneError> {
        self.record_mut(entity)?.name = name.into();
        Ok(())
    }

    /// First entity with the given name, in creation order
    pub fn find_entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.creation_order
            .iter()
            .copied()
            .find(|&entity| self.entities.get(entity).is_some_and(|record| record.name == name))
    }

    /// Whether the entity is waiting for the destruction step
    pub fn is_destroy_pending(&self, entity: EntityId) -> Result<bool, SceneError> {
        Ok(self.record(entity)?.destroy_pending)
    }

    /// Mark an entity and all of its descendants for destruction
    ///
    /// Teardown runs at the end of the current (or next) lifecycle pass.
    /// Until then the entities stay alive and keep updating.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<(), SceneError> {
        let node = self.record(entity)?.node;
        let subtree = self.transforms.subtree(node)?;
        for node in subtree.into_iter().rev() {
            let Some(&owner) = self.owners.get(node) else {
                continue;
            };
            if let Some(record) = self.entities.get_mut(owner) {
                if !record.destroy_pending {
                    record.destroy_pending = true;
                    self.pending_destroy.push(owner);
                }
            }
        }
        log::debug!(target: SCENE, "Entity {entity:?} marked for destruction");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------------

    /// Transform node of an entity
    pub fn transform_node(&self, entity: EntityId) -> Result<NodeId, SceneError> {
        Ok(self.record(entity)?.node)
    }

    /// Entity owning a transform node
    pub fn entity_of_node(&self, node: NodeId) -> Option<EntityId> {
        self.owners.get(node).copied()
    }

    /// Parent entity
    pub fn parent(&self, entity: EntityId) -> Result<Option<EntityId>, SceneError> {
        let node = self.transform_node(entity)?;
        Ok(self.transforms.parent(node)?.and_then(|parent| self.entity_of_node(parent)))
    }

    /// Child entities in attachment order
    pub fn children(&self, entity: EntityId) -> Result<Vec<EntityId>, SceneError> {
        let node = self.transform_node(entity)?;
        Ok(self
            .transforms
            .children(node)?
            .iter()
            .filter_map(|&child| self.entity_of_node(child))
            .collect())
    }

    fn child_entities(&self, entity: EntityId) -> Vec<EntityId> {
        self.entities
            .get(entity)
            .and_then(|record| self.transforms.children(record.node).ok())
            .map(|children| children.iter().filter_map(|&child| self.entity_of_node(child)).collect())
            .unwrap_or_default()
    }

    /// Reparent an entity, or make it a root with `None`
    ///
    /// Components whose effective activity changes are enabled or disabled
    /// immediately.
    pub fn set_parent(
        &mut self,
        child: EntityId,
        parent: Option<EntityId>,
        preserve_world: bool,
    ) -> Result<(), SceneError> {
        let node = self.transform_node(child)?;
        let parent_node = parent.map(|parent| self.transform_node(parent)).transpose()?;

        self.transforms
            .set_parent(node, parent_node, preserve_world)
            .map_err(|err| match (err, parent) {
                (TransformError::Cycle { .. }, Some(parent)) => SceneError::HierarchyCycle { child, parent },
                (other, _) => other.into(),
            })?;

        self.sync_subtree(child);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    /// Local transform of an entity
    pub fn local_transform(&self, entity: EntityId) -> Result<Transform, SceneError> {
        Ok(self.transforms.local(self.transform_node(entity)?)?)
    }

    /// World transform of an entity
    pub fn world_transform(&self, entity: EntityId) -> Result<Transform, SceneError> {
        Ok(self.transforms.world(self.transform_node(entity)?)?)
    }

    /// Replace the local transform of an entity
    pub fn set_local_transform(&mut self, entity: EntityId, local: Transform) -> Result<(), SceneError> {
        let node = self.transform_node(entity)?;
        Ok(self.transforms.set_local(node, local)?)
    }

    /// Set local position, Euler rotation in degrees and scale in one call
    pub fn set_transform(
        &mut self,
        entity: EntityId,
        position: Vec3,
        euler_degrees: Vec3,
        scale: Vec3,
    ) -> Result<(), SceneError> {
        self.set_local_transform(entity, Transform::from_euler_degrees(position, euler_degrees, scale))
    }

    /// Resolve every stale world transform
    pub fn commit_transforms(&self) -> usize {
        self.transforms.commit()
    }

    // ---------------------------------------------------------------------
    // Activity
    // ---------------------------------------------------------------------

    /// The entity's own active flag
    pub fn active_self(&self, entity: EntityId) -> Result<bool, SceneError> {
        Ok(self.record(entity)?.active)
    }

    /// Whether the entity and all of its ancestors are active
    pub fn active_in_hierarchy(&self, entity: EntityId) -> Result<bool, SceneError> {
        self.record(entity)?;
        Ok(self.effective_active(entity))
    }

    /// Set the entity's own active flag
    ///
    /// Started components on the entity and its descendants are enabled or
    /// disabled immediately when their effective activity changes.
    pub fn set_active(&mut self, entity: EntityId, active: bool) -> Result<(), SceneError> {
        let record = self.record_mut(entity)?;
        if record.active == active {
            return Ok(());
        }
        record.active = active;
        log::debug!(target: SCENE, "Entity {entity:?} active = {active}");
        self.sync_subtree(entity);
        Ok(())
    }

    fn effective_active(&self, entity: EntityId) -> bool {
        let Some(record) = self.entities.get(entity) else {
            return false;
        };
        if !record.active {
            return false;
        }
        let Ok(mut ancestors) = self.transforms.ancestors(record.node) else {
            return false;
        };
        ancestors.all(|node| {
            self.entity_of_node(node)
                .and_then(|owner| self.entities.get(owner))
                .is_some_and(|owner| owner.active)
        })
    }

    fn component_active(&self, component: ComponentId) -> bool {
        self.components
            .get(component)
            .is_some_and(|slot| slot.enabled && self.effective_active(slot.entity))
    }

    fn sync_subtree(&mut self, root: EntityId) {
        let Some(node) = self.entities.get(root).map(|record| record.node) else {
            return;
        };
        let Ok(nodes) = self.transforms.subtree(node) else {
            return;
        };
        let entities: Vec<EntityId> = nodes.into_iter().filter_map(|node| self.entity_of_node(node)).collect();
        for entity in entities {
            let components = self
                .entities
                .get(entity)
                .map(|record| record.components.clone())
                .unwrap_or_default();
            for component in components {
                self.sync_component(component);
            }
        }
    }

    /// Bring a started component's Enabled/Disabled state in line with its effective activity.
    fn sync_component(&mut self, component: ComponentId) {
        let Some(slot) = self.components.get(component) else {
            return;
        };
        if !slot.state.has_started() || slot.destroy_pending {
            return;
        }
        let state = slot.state;
        let desired = self.component_active(component);
        let next = match (state, desired) {
            (ComponentState::Started | ComponentState::Disabled, true) => ComponentState::Enabled,
            (ComponentState::Enabled, false) => ComponentState::Disabled,
            _ => return,
        };
        let _ = self.transition(component, next);
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Attach a component and run its `on_create` hook
    ///
    /// `on_start`/`on_enable` run on the next lifecycle pass.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<ComponentId, SceneError> {
        self.attach(entity, Box::new(component), true)
    }

    /// Attach a component with its own enabled flag cleared
    ///
    /// It starts once [`Scene::set_component_enabled`] turns it on.
    pub fn add_disabled_component<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> Result<ComponentId, SceneError> {
        self.attach(entity, Box::new(component), false)
    }

    fn attach(&mut self, entity: EntityId, behaviour: Box<dyn Component>, enabled: bool) -> Result<ComponentId, SceneError> {
        self.record(entity)?;
        let slot = ComponentSlot::new(entity, behaviour, enabled);
        let type_name = slot.type_name;
        let id = self.components.insert(slot);
        if let Some(record) = self.entities.get_mut(entity) {
            record.components.push(id);
        }
        self.pending_start.push(id);
        log::debug!(target: SCENE, "Attached {type_name} as {id:?} to {entity:?}");
        self.invoke(id, Hook::Create);
        Ok(id)
    }

    /// First component of type `T` on an entity
    pub fn find_component<T: Component>(&self, entity: EntityId) -> Result<Option<ComponentId>, SceneError> {
        let record = self.record(entity)?;
        Ok(record.components.iter().copied().find(|&id| {
            self.components
                .get(id)
                .and_then(|slot| slot.behaviour.as_deref())
                .is_some_and(|behaviour| behaviour.as_any().is::<T>())
        }))
    }

    /// Borrow the first component of type `T` on an entity
    ///
    /// A component that is running one of its own hooks is not visible.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Result<Option<&T>, SceneError> {
        let Some(id) = self.find_component::<T>(entity)? else {
            return Ok(None);
        };
        Ok(self
            .components
            .get(id)
            .and_then(|slot| slot.behaviour.as_deref())
            .and_then(|behaviour| downcast_ref::<T>(behaviour)))
    }

    /// Mutably borrow the first component of type `T` on an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Result<Option<&mut T>, SceneError> {
        let Some(id) = self.find_component::<T>(entity)? else {
            return Ok(None);
        };
        Ok(self
            .components
            .get_mut(id)
            .and_then(|slot| slot.behaviour.as_deref_mut())
            .and_then(|behaviour| downcast_mut::<T>(behaviour)))
    }

    /// Borrow a component by handle
    pub fn component<T: Component>(&self, component: ComponentId) -> Result<&T, SceneError> {
        let slot = self.slot(component)?;
        let behaviour = slot.behaviour.as_deref().ok_or(SceneError::ComponentBusy(component))?;
        downcast_ref::<T>(behaviour).ok_or(SceneError::TypeMismatch {
            component,
            expected: type_name::<T>(),
            found: slot.type_name,
        })
    }

    /// Mutably borrow a component by handle
    pub fn component_mut<T: Component>(&mut self, component: ComponentId) -> Result<&mut T, SceneError> {
        let slot = self
            .components
            .get_mut(component)
            .ok_or_else(|| stale_component(component))?;
        let found = slot.type_name;
        let behaviour = slot.behaviour.as_deref_mut().ok_or(SceneError::ComponentBusy(component))?;
        downcast_mut::<T>(behaviour).ok_or(SceneError::TypeMismatch {
            component,
            expected: type_name::<T>(),
            found,
        })
    }

    /// Components of an entity in attachment order
    pub fn component_ids(&self, entity: EntityId) -> Result<&[ComponentId], SceneError> {
        Ok(self.record(entity)?.components.as_slice())
    }

    /// Whether the handle refers to a live component
    pub fn contains_component(&self, component: ComponentId) -> bool {
        self.components.contains_key(component)
    }

    /// Lifecycle state of a component
    pub fn component_state(&self, component: ComponentId) -> Result<ComponentState, SceneError> {
        Ok(self.slot(component)?.state)
    }

    /// Entity owning a component
    pub fn component_owner(&self, component: ComponentId) -> Result<EntityId, SceneError> {
        Ok(self.slot(component)?.entity)
    }

    /// The component's own enabled flag
    pub fn is_component_enabled(&self, component: ComponentId) -> Result<bool, SceneError> {
        Ok(self.slot(component)?.enabled)
    }

    /// Set the component's own enabled flag
    ///
    /// A started component is enabled or disabled immediately when its
    /// effective activity changes.
    pub fn set_component_enabled(&mut self, component: ComponentId, enabled: bool) -> Result<(), SceneError> {
        let slot = self
            .components
            .get_mut(component)
            .ok_or_else(|| stale_component(component))?;
        if slot.enabled == enabled {
            return Ok(());
        }
        slot.enabled = enabled;
        self.sync_component(component);
        Ok(())
    }

    /// Mark a single component for destruction at the end of the pass
    pub fn destroy_component(&mut self, component: ComponentId) -> Result<(), SceneError> {
        let slot = self
            .components
            .get_mut(component)
            .ok_or_else(|| stale_component(component))?;
        if !slot.destroy_pending {
            slot.destroy_pending = true;
            self.pending_component_destroy.push(component);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lifecycle pass
    // ---------------------------------------------------------------------

    /// Run one full lifecycle pass: start, update, destroy
    pub fn run_lifecycle_pass(&mut self, frame: u64, delta_time: f32) {
        self.frame = frame;
        self.delta_time = delta_time;

        let started = self.start_pending_components();
        let updated = self.update_components();
        let destroyed = self.process_destructions();
        log::trace!(
            target: SCENE,
            "Frame {frame}: {started} started, {updated} updated, {destroyed} entities destroyed"
        );
    }

    /// Start components attached before this call
    ///
    /// Components whose entity is inactive stay pending until it activates.
    /// Returns the number of components started.
    pub fn start_pending_components(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_start);
        let mut waiting = Vec::new();
        let mut started = 0;

        for id in pending {
            let Some(slot) = self.components.get(id) else {
                continue;
            };
            if slot.state != ComponentState::Created || slot.destroy_pending {
                continue;
            }
            if !self.component_active(id) {
                waiting.push(id);
                continue;
            }
            if self.transition(id, ComponentState::Started).is_ok() {
                started += 1;
                // on_start may have deactivated its own entity
                self.sync_component(id);
            }
        }

        waiting.append(&mut self.pending_start);
        self.pending_start = waiting;
        started
    }

    /// Run `on_update` on every enabled component
    ///
    /// Returns the number of updates delivered.
    pub fn update_components(&mut self) -> usize {
        let order = self.update_order();
        let mut updated = 0;

        for entity in order {
            let Some(record) = self.entities.get(entity) else {
                continue;
            };
            let components = record.components.clone();
            for id in components {
                let enabled = self
                    .components
                    .get(id)
                    .is_some_and(|slot| slot.state == ComponentState::Enabled);
                if enabled {
                    self.invoke(id, Hook::Update);
                    updated += 1;
                }
            }
        }
        updated
    }

    fn update_order(&self) -> Vec<EntityId> {
        match self.config.update_order {
            UpdateOrder::HierarchyDepthFirst => self
                .transforms
                .depth_first()
                .into_iter()
                .filter_map(|node| self.entity_of_node(node))
                .collect(),
            UpdateOrder::Insertion => self.creation_order.clone(),
        }
    }

    /// Tear down every component and entity marked for destruction
    ///
    /// Destruction requested by teardown hooks is processed in the same call.
    /// Returns the number of entities reclaimed.
    pub fn process_destructions(&mut self) -> usize {
        let mut destroyed = 0;
        loop {
            let components = std::mem::take(&mut self.pending_component_destroy);
            let entities = std::mem::take(&mut self.pending_destroy);
            if components.is_empty() && entities.is_empty() {
                break;
            }
            for id in components {
                self.teardown_component(id);
            }
            for entity in entities {
                destroyed += self.teardown_entity(entity);
            }
        }
        destroyed
    }

    fn teardown_entity(&mut self, entity: EntityId) -> usize {
        let mut destroyed = 0;
        // Hooks may attach children or components mid-teardown; repeat until none remain.
        loop {
            let children = self.child_entities(entity);
            let components = self
                .entities
                .get(entity)
                .map(|record| record.components.clone())
                .unwrap_or_default();
            if children.is_empty() && components.is_empty() {
                break;
            }
            for child in children {
                destroyed += self.teardown_entity(child);
            }
            for id in components {
                self.teardown_component(id);
            }
        }

        let Some(record) = self.entities.remove(entity) else {
            return destroyed;
        };
        if let Err(err) = self.transforms.remove(record.node) {
            log::error!(target: SCENE, "Entity {entity:?} lost its transform: {err}");
        }
        self.owners.remove(record.node);
        self.creation_order.retain(|&other| other != entity);
        log::debug!(target: SCENE, "Destroyed entity {entity:?} '{}'", record.name);
        destroyed + 1
    }

    fn teardown_component(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        slot.destroy_pending = true;

        if slot.state == ComponentState::Enabled {
            let _ = self.transition(id, ComponentState::Disabled);
        }
        match self.components.get(id).map(|slot| slot.state) {
            // Never started: dropped without further callbacks
            Some(ComponentState::Created) => {
                if let Some(slot) = self.components.get_mut(id) {
                    slot.state = ComponentState::Destroyed;
                }
            }
            Some(ComponentState::Started | ComponentState::Disabled) => {
                let _ = self.transition(id, ComponentState::Destroyed);
            }
            _ => {}
        }

        if let Some(slot) = self.components.remove(id) {
            if let Some(record) = self.entities.get_mut(slot.entity) {
                record.components.retain(|&other| other != id);
            }
            if slot.behaviour.is_none() && !slot.deferred.is_empty() {
                // Running a hook right now; invoke delivers these once it returns
                self.orphaned_hooks.push((id, slot.deferred));
            }
            log::debug!(target: SCENE, "Destroyed component {id:?} ({})", slot.type_name);
        }
    }

    /// Tear down every entity immediately
    pub fn clear(&mut self) {
        let roots: Vec<EntityId> = self
            .transforms
            .roots()
            .iter()
            .filter_map(|&node| self.entity_of_node(node))
            .collect();
        for entity in roots {
            let _ = self.destroy_entity(entity);
        }
        let destroyed = self.process_destructions();
        self.pending_start.clear();
        log::info!(target: SCENE, "Scene cleared, {destroyed} entities destroyed");
    }

    // ---------------------------------------------------------------------
    // Hook dispatch
    // ---------------------------------------------------------------------

    fn transition(&mut self, id: ComponentId, next: ComponentState) -> Result<(), SceneError> {
        let slot = self.components.get_mut(id).ok_or_else(|| stale_component(id))?;
        match slot.state.transition(next) {
            Ok(state) => slot.state = state,
            Err(err) => {
                log::error!(target: SCENE, "{} {id:?}: {err}", slot.type_name);
                return Err(err);
            }
        }
        if let Some(hook) = Hook::for_state(next) {
            self.invoke(id, hook);
        }
        Ok(())
    }

    /// Run a hook on a component, draining hooks queued while it ran.
    fn invoke(&mut self, id: ComponentId, hook: Hook) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        let entity = slot.entity;
        let Some(mut behaviour) = slot.behaviour.take() else {
            log::trace!(target: SCENE, "Deferring {hook:?} for busy component {id:?}");
            slot.deferred.push(hook);
            return;
        };

        let mut next = Some(hook);
        while let Some(current) = next {
            current.call(&mut *behaviour, &mut ComponentContext::new(self, entity, id));
            next = match self.components.get_mut(id) {
                Some(slot) if !slot.deferred.is_empty() => Some(slot.deferred.remove(0)),
                _ => None,
            };
        }

        match self.components.get_mut(id) {
            Some(slot) => slot.behaviour = Some(behaviour),
            // Torn down from inside its own hook, e.g. by `clear`
            None => self.finish_orphaned(id, entity, behaviour),
        }
    }

    /// Deliver the teardown hooks owed to a component reclaimed while busy, then drop it.
    fn finish_orphaned(&mut self, id: ComponentId, entity: EntityId, mut behaviour: Box<dyn Component>) {
        let Some(index) = self.orphaned_hooks.iter().position(|(orphan, _)| *orphan == id) else {
            return;
        };
        let (_, hooks) = self.orphaned_hooks.remove(index);
        for hook in hooks {
            hook.call(&mut *behaviour, &mut ComponentContext::new(self, entity, id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Health(i32);
    impl Component for Health {}

    struct Armor;
    impl Component for Armor {}

    #[test]
    fn test_create_and_find_entities() {
        let mut scene = Scene::default();
        let ship = scene.create_entity("ship");
        let turret = scene.create_child(ship, "turret").unwrap();

        assert_eq!(scene.find_entity_by_name("turret"), Some(turret));
        assert_eq!(scene.find_entity_by_name("missing"), None);
        assert_eq!(scene.parent(turret).unwrap(), Some(ship));
        assert_eq!(scene.children(ship).unwrap(), vec![turret]);
        assert_eq!(scene.entity_count(), 2);

        scene.set_entity_name(turret, "gun").unwrap();
        assert_eq!(scene.entity_name(turret).unwrap(), "gun");
    }

    #[test]
    fn test_stale_entity_is_reported() {
        let mut scene = Scene::default();
        let entity = scene.create_entity("doomed");
        scene.destroy_entity(entity).unwrap();
        scene.run_lifecycle_pass(0, 0.016);

        assert!(!scene.contains(entity));
        assert_eq!(scene.entity_name(entity), Err(SceneError::StaleEntity(entity)));
        assert_eq!(scene.set_active(entity, false), Err(SceneError::StaleEntity(entity)));
        assert!(matches!(scene.add_component(entity, Armor), Err(SceneError::StaleEntity(_))));
        assert_eq!(scene.destroy_entity(entity), Err(SceneError::StaleEntity(entity)));

        // Slot reuse does not resurrect the old handle
        let replacement = scene.create_entity("replacement");
        assert_ne!(replacement, entity);
        assert!(scene.world_transform(entity).is_err());
    }

    #[test]
    fn test_stale_component_is_reported() {
        let mut scene = Scene::default();
        let entity = scene.create_entity("e");
        let armor = scene.add_component(entity, Armor).unwrap();
        scene.destroy_component(armor).unwrap();
        scene.run_lifecycle_pass(0, 0.0);

        assert!(!scene.contains_component(armor));
        assert_eq!(scene.component_state(armor), Err(SceneError::StaleComponent(armor)));
        assert_eq!(scene.set_component_enabled(armor, false), Err(SceneError::StaleComponent(armor)));
        assert!(scene.component_ids(entity).unwrap().is_empty());
    }

    #[test]
    fn test_get_component_by_type() {
        let mut scene = Scene::default();
        let entity = scene.create_entity("e");
        scene.add_component(entity, Armor).unwrap();
        let health = scene.add_component(entity, Health(10)).unwrap();

        assert_eq!(scene.get_component::<Health>(entity).unwrap().map(|h| h.0), Some(10));
        if let Some(h) = scene.get_component_mut::<Health>(entity).unwrap() {
            h.0 -= 3;
        }
        assert_eq!(scene.component::<Health>(health).unwrap().0, 7);
        assert!(matches!(
            scene.component::<Armor>(health),
            Err(SceneError::TypeMismatch { .. })
        ));
        assert_eq!(scene.find_component::<Health>(entity).unwrap(), Some(health));

        let other = scene.create_entity("other");
        assert!(scene.get_component::<Health>(other).unwrap().is_none());
    }

    #[test]
    fn test_cycle_maps_to_entity_error() {
        let mut scene = Scene::default();
        let root = scene.create_entity("root");
        let child = scene.create_child(root, "child").unwrap();

        assert_eq!(
            scene.set_parent(root, Some(child), true),
            Err(SceneError::HierarchyCycle { child: root, parent: child })
        );
        assert_eq!(scene.parent(root).unwrap(), None);
    }

    #[test]
    fn test_active_in_hierarchy() {
        let mut scene = Scene::default();
        let root = scene.create_entity("root");
        let child = scene.create_child(root, "child").unwrap();
        let grandchild = scene.create_child(child, "grandchild").unwrap();

        scene.set_active(root, false).unwrap();
        assert!(scene.active_self(grandchild).unwrap());
        assert!(!scene.active_in_hierarchy(grandchild).unwrap());

        scene.set_active(root, true).unwrap();
        scene.set_active(child, false).unwrap();
        assert!(scene.active_in_hierarchy(root).unwrap());
        assert!(!scene.active_in_hierarchy(grandchild).unwrap());

        scene.set_parent(grandchild, Some(root), true).unwrap();
        assert!(scene.active_in_hierarchy(grandchild).unwrap());
    }

    #[test]
    fn test_set_transform_from_euler() {
        let mut scene = Scene::default();
        let entity = scene.create_entity("e");
        scene
            .set_transform(entity, Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 45.0, 0.0), Vec3::new(2.0, 2.0, 2.0))
            .unwrap();

        let world = scene.world_transform(entity).unwrap();
        approx::assert_relative_eq!(world.position, Vec3::new(1.0, 2.0, 3.0));
        approx::assert_relative_eq!(world.euler_degrees(), Vec3::new(0.0, 45.0, 0.0), epsilon = 1e-3);
        assert_eq!(scene.commit_transforms(), 0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut scene = Scene::default();
        let root = scene.create_entity("root");
        scene.create_child(root, "child").unwrap();
        scene.add_component(root, Armor).unwrap();

        scene.clear();

        assert_eq!(scene.entity_count(), 0);
        assert!(scene.transforms().is_empty());
        assert_eq!(scene.entities().count(), 0);
    }
}

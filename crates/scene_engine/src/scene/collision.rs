//! Collision callbacks as a component
//!
//! Physics lives outside the scene; whatever resolves contacts reports them
//! by raising `collision.enter` / `collision.stay` / `collision.exit` events
//! carrying the entity that collided (`"entity"`) and, optionally, what it
//! hit (`"other"`). A [`CollisionHandler`] listens for those events while it
//! is enabled and forwards the ones about its own entity to its callbacks.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::events::{EventArg, EventObject, EventScheduler, ListenerHandle};
use crate::foundation::logging::GAMEPLAY;

use super::component::{Component, ComponentContext};
use super::EntityId;

/// Event raised when two colliders start touching
pub const COLLISION_ENTER: &str = "collision.enter";
/// Event raised every frame two colliders keep touching
pub const COLLISION_STAY: &str = "collision.stay";
/// Event raised when two colliders separate
pub const COLLISION_EXIT: &str = "collision.exit";

/// Contact phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionPhase {
    /// Contact began
    Enter,
    /// Contact continues
    Stay,
    /// Contact ended
    Exit,
}

impl CollisionPhase {
    /// Event name for this phase
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Enter => COLLISION_ENTER,
            Self::Stay => COLLISION_STAY,
            Self::Exit => COLLISION_EXIT,
        }
    }

    const ALL: [Self; 3] = [Self::Enter, Self::Stay, Self::Exit];
}

/// A reported contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// Entity owning the handler
    pub entity: EntityId,
    /// The other party, when the reporter knows it
    pub other: Option<EntityId>,
}

/// Build the event a physics adapter raises for a contact
pub fn collision_event(phase: CollisionPhase, entity: EntityId, other: Option<EntityId>) -> EventObject {
    let event = EventObject::immediate(phase.event_name()).with_arg("entity", EventArg::Entity(entity));
    match other {
        Some(other) => event.with_arg("other", EventArg::Entity(other)),
        None => event,
    }
}

/// Handle returned by the `register_on_*` methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionCallbackHandle(u32);

type CollisionCallback = Rc<dyn Fn(&Collision)>;

#[derive(Default)]
struct Callbacks {
    enter: BTreeMap<CollisionCallbackHandle, CollisionCallback>,
    stay: BTreeMap<CollisionCallbackHandle, CollisionCallback>,
    exit: BTreeMap<CollisionCallbackHandle, CollisionCallback>,
    next_handle: u32,
}

impl Callbacks {
    fn phase_mut(&mut self, phase: CollisionPhase) -> &mut BTreeMap<CollisionCallbackHandle, CollisionCallback> {
        match phase {
            CollisionPhase::Enter => &mut self.enter,
            CollisionPhase::Stay => &mut self.stay,
            CollisionPhase::Exit => &mut self.exit,
        }
    }

    fn snapshot(&self, phase: CollisionPhase) -> Vec<CollisionCallback> {
        let callbacks = match phase {
            CollisionPhase::Enter => &self.enter,
            CollisionPhase::Stay => &self.stay,
            CollisionPhase::Exit => &self.exit,
        };
        callbacks.values().cloned().collect()
    }
}

/// Component forwarding collision events about its entity to callbacks
///
/// Callbacks for one phase run in registration order. A callback may
/// register or unregister callbacks; the change applies from the next event.
#[derive(Default)]
pub struct CollisionHandler {
    callbacks: Rc<RefCell<Callbacks>>,
    subscriptions: Vec<(CollisionPhase, ListenerHandle)>,
    events: Option<EventScheduler>,
}

impl CollisionHandler {
    /// Create a handler with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one phase
    pub fn register(&mut self, phase: CollisionPhase, callback: impl Fn(&Collision) + 'static) -> CollisionCallbackHandle {
        let mut callbacks = self.callbacks.borrow_mut();
        let handle = CollisionCallbackHandle(callbacks.next_handle);
        callbacks.next_handle += 1;
        callbacks.phase_mut(phase).insert(handle, Rc::new(callback));
        handle
    }

    /// Remove a callback; returns whether it was registered for that phase
    pub fn unregister(&mut self, phase: CollisionPhase, handle: CollisionCallbackHandle) -> bool {
        self.callbacks.borrow_mut().phase_mut(phase).remove(&handle).is_some()
    }

    /// Register a contact-began callback
    pub fn register_on_enter(&mut self, callback: impl Fn(&Collision) + 'static) -> CollisionCallbackHandle {
        self.register(CollisionPhase::Enter, callback)
    }

    /// Remove a contact-began callback
    pub fn unregister_on_enter(&mut self, handle: CollisionCallbackHandle) -> bool {
        self.unregister(CollisionPhase::Enter, handle)
    }

    /// Register a contact-continues callback
    pub fn register_on_stay(&mut self, callback: impl Fn(&Collision) + 'static) -> CollisionCallbackHandle {
        self.register(CollisionPhase::Stay, callback)
    }

    /// Remove a contact-continues callback
    pub fn unregister_on_stay(&mut self, handle: CollisionCallbackHandle) -> bool {
        self.unregister(CollisionPhase::Stay, handle)
    }

    /// Register a contact-ended callback
    pub fn register_on_exit(&mut self, callback: impl Fn(&Collision) + 'static) -> CollisionCallbackHandle {
        self.register(CollisionPhase::Exit, callback)
    }

    /// Remove a contact-ended callback
    pub fn unregister_on_exit(&mut self, handle: CollisionCallbackHandle) -> bool {
        self.unregister(CollisionPhase::Exit, handle)
    }

    /// Whether the handler is currently listening for collision events
    pub fn is_listening(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    fn unsubscribe(&mut self) {
        let Some(events) = self.events.take() else {
            return;
        };
        for (phase, handle) in self.subscriptions.drain(..) {
            events.unregister_listener(phase.event_name(), handle);
        }
    }
}

impl Component for CollisionHandler {
    fn on_enable(&mut self, ctx: &mut ComponentContext<'_>) {
        self.unsubscribe();
        let owner = ctx.entity();
        let events = ctx.events().clone();

        for phase in CollisionPhase::ALL {
            let callbacks = Rc::clone(&self.callbacks);
            let handle = events.register_listener(phase.event_name(), move |event: &EventObject| {
                if event.get_entity("entity") != Some(owner) {
                    return;
                }
                let collision = Collision {
                    entity: owner,
                    other: event.get_entity("other"),
                };
                let snapshot = callbacks.borrow().snapshot(phase);
                for callback in snapshot {
                    callback(&collision);
                }
            });
            self.subscriptions.push((phase, handle));
        }
        log::debug!(target: GAMEPLAY, "Collision handler on {owner:?} listening");
        self.events = Some(events);
    }

    fn on_disable(&mut self, ctx: &mut ComponentContext<'_>) {
        self.unsubscribe();
        log::debug!(target: GAMEPLAY, "Collision handler on {:?} stopped listening", ctx.entity());
    }
}

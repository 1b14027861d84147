//! Event system following Game Engine Architecture Ch 16.8
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Registration system (only notify interested listeners)
//! - Queuing support (immediate + deferred delivery by frame)
//!
//! Queued events are ordered by target frame (ascending), then priority
//! (descending), then insertion order. Listeners of one event name run in
//! registration order, against a snapshot of the listener list taken when
//! that event starts dispatching.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::core::config::EventConfig;
use crate::foundation::logging::EVENTS;
use crate::foundation::math::Vec3;
use crate::scene::EntityId;

/// Interned event name
///
/// Cloning shares the underlying string; hashing and comparison use its contents.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventName(Rc<str>);

impl EventName {
    /// Create a new event name
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    /// Name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self(Rc::from(name))
    }
}

impl From<&EventName> for EventName {
    fn from(name: &EventName) -> Self {
        name.clone()
    }
}

/// Dispatch priority of queued events targeting the same frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EventPriority {
    /// Dispatched after every other priority
    Low,
    /// Default priority
    #[default]
    Medium,
    /// Dispatched before every other priority
    High,
}

/// Variant for type-safe event arguments
/// Uses key-value pairs to avoid order dependency problems
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Vector value
    Vec3(Vec3),
    /// Entity reference
    Entity(EntityId),
}

/// Event with a name, a target frame, a priority and key-value arguments
#[derive(Debug, Clone)]
pub struct EventObject {
    /// Name listeners are registered under
    pub name: EventName,
    /// Frame at (or after) which a queued event is dispatched
    pub target_frame: u64,
    /// Ordering among events of the same frame
    pub priority: EventPriority,
    args: HashMap<String, EventArg>,
}

impl EventObject {
    /// Create a new event
    pub fn new(name: impl Into<EventName>, target_frame: u64, priority: EventPriority) -> Self {
        Self {
            name: name.into(),
            target_frame,
            priority,
            args: HashMap::new(),
        }
    }

    /// Create an event meant for immediate dispatch
    ///
    /// The target frame is stamped by [`EventScheduler::raise_immediate`].
    pub fn immediate(name: impl Into<EventName>) -> Self {
        Self::new(name, 0, EventPriority::Medium)
    }

    /// Add an argument to the event (builder pattern)
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: EventArg) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Iterate over all arguments
    pub fn args(&self) -> impl Iterator<Item = (&str, &EventArg)> {
        self.args.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Get a boolean argument if present
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_arg(key) {
            Some(EventArg::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get an integer argument if present
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get_arg(key) {
            Some(EventArg::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get a float argument if present
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get_arg(key) {
            Some(EventArg::Float(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get a text argument if present
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get_arg(key) {
            Some(EventArg::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Get a vector argument if present
    pub fn get_vec3(&self, key: &str) -> Option<Vec3> {
        match self.get_arg(key) {
            Some(EventArg::Vec3(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get an entity argument if present
    pub fn get_entity(&self, key: &str) -> Option<EntityId> {
        match self.get_arg(key) {
            Some(EventArg::Entity(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Identifier returned by [`EventScheduler::register_listener`]
///
/// Handles increase monotonically and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    /// Raw handle value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Listener callback; receives the event with its name, payload and frame
pub type Listener = Rc<dyn Fn(&EventObject)>;

/// Event scheduling errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Queued event targets a frame beyond the configured horizon
    #[error("Event '{name}' targets frame {target_frame}, beyond horizon of {max_horizon} frames from frame {current_frame}")]
    HorizonExceeded {
        /// Event name
        name: String,
        /// Requested target frame
        target_frame: u64,
        /// Frame of the last flush
        current_frame: u64,
        /// Configured horizon
        max_horizon: u64,
    },
}

struct QueuedEvent {
    event: EventObject,
    sequence: u64,
}

// BinaryHeap pops the greatest element, so "greater" means "dispatched first".
impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .target_frame
            .cmp(&self.event.target_frame)
            .then_with(|| self.event.priority.cmp(&other.event.priority))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for QueuedEvent {}

struct SchedulerState {
    queue: BinaryHeap<QueuedEvent>,
    listeners: HashMap<EventName, Vec<(ListenerHandle, Listener)>>,
    next_handle: u64,
    next_sequence: u64,
    current_frame: u64,
    config: EventConfig,
}

/// Priority-ordered deferred event dispatch plus a listener registry
///
/// This is a cheap, clonable handle: clones share one scheduler, which lets
/// listeners raise events or (un)register listeners while being dispatched.
/// Single-threaded by construction.
#[derive(Clone)]
pub struct EventScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl EventScheduler {
    /// Create a new empty event scheduler
    pub fn new(config: EventConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                queue: BinaryHeap::new(),
                listeners: HashMap::new(),
                next_handle: 0,
                next_sequence: 0,
                current_frame: 0,
                config,
            })),
        }
    }

    /// Replace the scheduler configuration
    pub fn set_config(&self, config: EventConfig) {
        self.state.borrow_mut().config = config;
    }

    /// Frame passed to the most recent [`EventScheduler::flush`]
    pub fn current_frame(&self) -> u64 {
        self.state.borrow().current_frame
    }

    /// Register a listener for an event name
    ///
    /// Returns a handle for later unregistration.
    pub fn register_listener(
        &self,
        name: impl Into<EventName>,
        callback: impl Fn(&EventObject) + 'static,
    ) -> ListenerHandle {
        let name = name.into();
        let mut state = self.state.borrow_mut();
        let handle = ListenerHandle(state.next_handle);
        state.next_handle += 1;
        log::trace!(target: EVENTS, "Registered listener {} for '{}'", handle.0, name);
        state
            .listeners
            .entry(name)
            .or_default()
            .push((handle, Rc::new(callback)));
        handle
    }

    /// Unregister a listener
    ///
    /// Unknown or already removed handles are a no-op. Returns whether a
    /// listener was removed. Safe to call while `name` is being dispatched;
    /// the in-flight dispatch still reaches its snapshot of listeners.
    pub fn unregister_listener(&self, name: &str, handle: ListenerHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(listeners) = state.listeners.get_mut(name) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != handle);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            state.listeners.remove(name);
        }
        removed
    }

    /// Number of listeners currently registered for a name
    pub fn listener_count(&self, name: &str) -> usize {
        self.state.borrow().listeners.get(name).map_or(0, Vec::len)
    }

    /// Dispatch an event synchronously to every listener of its name
    ///
    /// The queue is untouched. The event's target frame is set to the current
    /// frame. Listeners may raise further events; immediate raises from inside
    /// a listener are dispatched before it returns.
    pub fn raise_immediate(&self, mut event: EventObject) {
        event.target_frame = self.current_frame();
        self.dispatch(&event);
    }

    /// Queue an event for dispatch at its target frame
    ///
    /// Fails only when a maximum horizon is configured and the event targets
    /// a frame past it.
    pub fn raise_queued(&self, event: EventObject) -> Result<(), EventError> {
        let mut state = self.state.borrow_mut();

        if let Some(max_horizon) = state.config.max_horizon_frames {
            if event.target_frame > state.current_frame.saturating_add(max_horizon) {
                log::warn!(
                    target: EVENTS,
                    "Rejected event '{}' for frame {} (horizon {} from frame {})",
                    event.name, event.target_frame, max_horizon, state.current_frame
                );
                return Err(EventError::HorizonExceeded {
                    name: event.name.to_string(),
                    target_frame: event.target_frame,
                    current_frame: state.current_frame,
                    max_horizon,
                });
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(QueuedEvent { event, sequence });

        if state.queue.len() == state.config.queue_warn_threshold.saturating_add(1) {
            log::warn!(
                target: EVENTS,
                "Event queue holds {} pending events; some may target frames that never arrive",
                state.queue.len()
            );
        }
        Ok(())
    }

    /// Dispatch every queued event whose target frame is at or before `current_frame`
    ///
    /// Events queued by listeners during the flush are dispatched in the same
    /// flush when they are already due. Returns the number of events popped.
    pub fn flush(&self, current_frame: u64) -> usize {
        self.state.borrow_mut().current_frame = current_frame;

        let mut dispatched = 0;
        while let Some(event) = self.pop_due(current_frame) {
            self.dispatch(&event);
            dispatched += 1;
        }
        dispatched
    }

    /// Number of events waiting in the queue
    pub fn pending_count(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Drop every queued event without dispatching it
    pub fn clear_queue(&self) {
        let mut state = self.state.borrow_mut();
        log::debug!(target: EVENTS, "Discarding {} queued events", state.queue.len());
        state.queue.clear();
    }

    fn pop_due(&self, current_frame: u64) -> Option<EventObject> {
        let mut state = self.state.borrow_mut();
        if state.queue.peek()?.event.target_frame > current_frame {
            return None;
        }
        state.queue.pop().map(|queued| queued.event)
    }

    fn dispatch(&self, event: &EventObject) {
        // Snapshot so listeners can mutate the registry without affecting this pass.
        let snapshot: Vec<Listener> = match self.state.borrow().listeners.get(event.name.as_str()) {
            Some(listeners) => listeners.iter().map(|(_, listener)| Rc::clone(listener)).collect(),
            None => {
                log::trace!(target: EVENTS, "No listeners for '{}'", event.name);
                return;
            }
        };

        for listener in snapshot {
            listener(event);
        }
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new(EventConfig::default())
    }
}

impl fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventScheduler")
            .field("pending", &state.queue.len())
            .field("listener_names", &state.listeners.len())
            .field("current_frame", &state.current_frame)
            .finish()
    }
}

//! # Scene Engine
//!
//! Runtime scene model for games: a transform hierarchy, entities with
//! lifecycle-driven components, and a frame-based deferred event scheduler.
//!
//! ## Features
//!
//! - **Transform Hierarchy**: local TRS poses with lazily cached world poses
//! - **Component Lifecycle**: create/start/enable/update/disable/destroy hooks
//!   driven deterministically once per frame, with same-frame-safe mutation
//! - **Event Scheduler**: immediate or frame-targeted dispatch with priorities
//! - **Generational Handles**: stale entity/component handles are detected
//! - **Config Files**: engine configuration in TOML or RON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct Spinner;
//!
//! impl Component for Spinner {
//!     fn on_update(&mut self, ctx: &mut ComponentContext<'_>) {
//!         let entity = ctx.entity();
//!         let angle = ctx.delta_time();
//!         if let Ok(node) = ctx.scene().transform_node(entity) {
//!             let spin = Quat::from_axis_angle(&Vec3::y_axis(), angle);
//!             let _ = ctx.scene_mut().transforms_mut().rotate_local(node, spin);
//!         }
//!     }
//! }
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let entity = engine.scene_mut().create_entity("spinner");
//!         engine.scene_mut().add_component(entity, Spinner)?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default().with_max_frames(60);
//!     let mut app = MyApp;
//!     Engine::run(config, &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;
pub mod events;
pub mod foundation;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError, CONFIG_CHANGED};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{EngineConfig, EventConfig, LoggingConfig, SceneConfig, UpdateOrder},
        events::{EventArg, EventError, EventObject, EventPriority, EventScheduler, ListenerHandle},
        foundation::{
            logging::LogChannels,
            math::{Mat4, Quat, Transform, Vec3},
            time::FrameClock,
        },
        scene::{
            Collision, CollisionHandler, CollisionPhase, Component, ComponentContext, ComponentId, ComponentState,
            EntityId, NodeId, Scene, SceneError, TransformTree,
        },
        AppError, Application, Engine, EngineError,
    };
}

//! Application trait and lifecycle management

use crate::engine::{Engine, EngineError};
use crate::events::EventError;
use crate::scene::SceneError;
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive gameplay with the engine's frame loop.
pub trait Application {
    /// Initialize the application
    ///
    /// Called once after the engine is created. Build the initial scene here:
    /// create entities, attach components, register event listeners.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Update the application
    ///
    /// Called every frame after due events were dispatched and the scene's
    /// lifecycle pass ran, before transforms are committed.
    ///
    /// # Arguments
    /// * `engine` - Mutable reference to the engine
    /// * `delta_time` - Time since last frame in seconds
    fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError>;

    /// Cleanup the application
    ///
    /// Called once when the frame loop stops, before the scene is cleared.
    fn cleanup(&mut self, _engine: &mut Engine) {}
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Scene operation failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Event could not be scheduled
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Game logic error
    #[error("Game logic error: {0}")]
    GameLogic(String),
}

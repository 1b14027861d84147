//! # Core Engine Module
//!
//! Shared configuration for every runtime subsystem.

pub mod config;

pub use config::{EngineConfig, EventConfig, LoggingConfig, SceneConfig, UpdateOrder};
pub use crate::config::{Config, ConfigError};

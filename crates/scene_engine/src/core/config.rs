//! # Engine Configuration
//!
//! Consolidates the configuration of every runtime subsystem into one
//! serializable tree that can be loaded from TOML or RON.
//!
//! ## Configuration Categories
//!
//! - **Logging**: level and enabled log channels
//! - **Events**: queue growth guards for the deferred event scheduler
//! - **Scene**: per-frame update ordering and storage sizing
//! - **Frame**: fixed time step and frame limits for the frame driver

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::foundation::logging::LogChannels;

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
    /// Channels allowed to emit log output
    pub channels: LogChannels,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            channels: LogChannels::all(),
        }
    }
}

/// # Event Scheduler Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Reject queued events targeting a frame further than this many frames ahead
    ///
    /// `None` disables the check; events may then wait indefinitely.
    pub max_horizon_frames: Option<u64>,
    /// Log a warning whenever the queue grows past this many pending events
    pub queue_warn_threshold: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            max_horizon_frames: None,
            queue_warn_threshold: 4096,
        }
    }
}

impl EventConfig {
    /// Set the maximum scheduling horizon
    pub const fn with_max_horizon(mut self, frames: u64) -> Self {
        self.max_horizon_frames = Some(frames);
        self
    }
}

/// Order in which entities receive their per-frame component updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateOrder {
    /// Depth-first over the transform hierarchy: a parent updates before its
    /// children, siblings in child-list order, roots in creation order
    #[default]
    HierarchyDepthFirst,
    /// Entity creation order, ignoring the hierarchy
    Insertion,
}

/// # Scene Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Per-frame update traversal order
    pub update_order: UpdateOrder,
    /// Entity slots reserved up front
    pub initial_entity_capacity: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            update_order: UpdateOrder::default(),
            initial_entity_capacity: 256,
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration handed to the frame driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Advance time by a fixed step instead of the wall clock
    pub fixed_delta_time: Option<f32>,
    /// Stop the frame driver after this many frames
    pub max_frames: Option<u64>,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Event scheduler configuration
    pub events: EventConfig,
    /// Scene configuration
    pub scene: SceneConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_delta_time: None,
            max_frames: None,
            logging: LoggingConfig::default(),
            events: EventConfig::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// Use a fixed time step
    pub fn with_fixed_delta_time(mut self, delta_time: f32) -> Self {
        self.fixed_delta_time = Some(delta_time);
        self
    }

    /// Stop after a number of frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Set the event scheduler configuration
    pub fn with_events(mut self, events: EventConfig) -> Self {
        self.events = events;
        self
    }

    /// Set the scene configuration
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "Unknown log level: {}",
                self.logging.level
            )));
        }

        if let Some(delta) = self.fixed_delta_time {
            if !(delta.is_finite() && delta > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "Fixed delta time must be positive, got {delta}"
                )));
            }
        }

        if self.events.max_horizon_frames == Some(0) {
            return Err(ConfigError::Invalid(
                "Event horizon of zero frames would reject every future event".to_string(),
            ));
        }

        Ok(())
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let config = EngineConfig::new().with_log_level("loud");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let config = EngineConfig::new().with_events(EventConfig::default().with_max_horizon(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let config = EngineConfig::new()
            .with_fixed_delta_time(0.25)
            .with_events(EventConfig::default().with_max_horizon(120))
            .with_scene(SceneConfig {
                update_order: UpdateOrder::Insertion,
                initial_entity_capacity: 8,
            });
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        std::fs::write(&path, "(max_frames: Some(10))").unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.max_frames, Some(10));
        assert_eq!(loaded.scene, SceneConfig::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EngineConfig::load_from_file("engine.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}

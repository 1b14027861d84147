//! Logging utilities and structured logging support
//!
//! Engine subsystems log through the `log` facade using one target per
//! channel, so the channel mask can be applied as `env_logger` filters.

pub use log::{debug, error, info, trace, warn};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Log target for scene and entity lifecycle messages
pub const SCENE: &str = "scene";
/// Log target for transform hierarchy messages
pub const TRANSFORM: &str = "transform";
/// Log target for event scheduler messages
pub const EVENTS: &str = "events";
/// Log target for gameplay code
pub const GAMEPLAY: &str = "gameplay";
/// Log target for configuration messages
pub const CONFIG: &str = "config";

bitflags! {
    /// Set of enabled log channels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LogChannels: u32 {
        /// Scene and entity lifecycle
        const SCENE = 1 << 0;
        /// Transform hierarchy
        const TRANSFORM = 1 << 1;
        /// Event scheduler
        const EVENTS = 1 << 2;
        /// Gameplay code
        const GAMEPLAY = 1 << 3;
        /// Configuration
        const CONFIG = 1 << 4;
    }
}

impl Default for LogChannels {
    fn default() -> Self {
        Self::all()
    }
}

impl LogChannels {
    /// Log targets paired with their channel flag
    pub const TARGETS: [(Self, &'static str); 5] = [
        (Self::SCENE, SCENE),
        (Self::TRANSFORM, TRANSFORM),
        (Self::EVENTS, EVENTS),
        (Self::GAMEPLAY, GAMEPLAY),
        (Self::CONFIG, CONFIG),
    ];

    /// Targets of every channel not in this set
    pub fn disabled_targets(self) -> impl Iterator<Item = &'static str> {
        Self::TARGETS
            .into_iter()
            .filter(move |(flag, _)| !self.contains(*flag))
            .map(|(_, target)| target)
    }
}

/// Build the `env_logger` filter string for a level and channel mask
pub fn filter_spec(level: &str, channels: LogChannels) -> String {
    let mut spec = level.to_string();
    for target in channels.disabled_targets() {
        spec.push(',');
        spec.push_str(target);
        spec.push_str("=off");
    }
    spec
}

/// Initialize logging with an explicit level and channel mask
///
/// `RUST_LOG` still takes precedence when set. Calling this more than once
/// is harmless; later calls are ignored.
pub fn init_with(level: &str, channels: LogChannels) {
    let spec = filter_spec(level, channels);
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&spec);
    if let Ok(env_spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_spec);
    }
    if builder.try_init().is_err() {
        log::debug!(target: CONFIG, "Logger already initialized, keeping existing filters");
    }
}

//! Frame driver
//!
//! Ticks the scene and the event scheduler once per logical frame, always in
//! the same order:
//!
//! 1. Dispatch queued events that are due this frame
//! 2. Run the scene lifecycle pass (starts, updates, deferred destruction)
//! 3. Run the application's update
//! 4. Commit transforms so external readers see resolved world poses
//! 5. Advance the frame counter

use crate::{
    application::{AppError, Application},
    config::ConfigError,
    core::config::EngineConfig,
    events::{EventArg, EventError, EventObject, EventScheduler},
    foundation::{
        logging::{self, CONFIG},
        time::FrameClock,
    },
    scene::{Scene, SceneError},
};
use thiserror::Error;

/// Event raised immediately whenever [`Engine::apply_config`] succeeds
pub const CONFIG_CHANGED: &str = "config.changed";

/// Main engine struct
///
/// Owns the scene, the shared event scheduler and the frame clock.
#[derive(Debug)]
pub struct Engine {
    scene: Scene,
    events: EventScheduler,
    clock: FrameClock,
    config: EngineConfig,
    running: bool,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        let events = EventScheduler::new(config.events.clone());
        let scene = Scene::new(config.scene.clone(), events.clone());
        let clock = config
            .fixed_delta_time
            .map_or_else(FrameClock::new, FrameClock::fixed);

        Ok(Self {
            scene,
            events,
            clock,
            config,
            running: true,
        })
    }

    /// Run the frame loop with the given application
    ///
    /// Initializes logging from the configuration, then steps until
    /// [`Engine::quit`] is called or the configured frame limit is reached.
    pub fn run<T: Application>(config: EngineConfig, app: &mut T) -> Result<(), EngineError> {
        logging::init_with(&config.logging.level, config.logging.channels);
        let mut engine = Self::new(config)?;

        app.initialize(&mut engine)?;

        log::info!("Starting main loop...");
        while engine.running {
            if engine
                .config
                .max_frames
                .is_some_and(|limit| engine.clock.frame() >= limit)
            {
                log::info!("Frame limit reached");
                break;
            }
            engine.step(app)?;
        }

        app.cleanup(&mut engine);
        engine.scene.clear();
        engine.events.clear_queue();

        log::info!(
            "Engine shutdown complete after {} frames ({:.1} fps)",
            engine.clock.frame(),
            engine.clock.average_fps()
        );
        Ok(())
    }

    /// Run exactly one frame
    pub fn step<T: Application + ?Sized>(&mut self, app: &mut T) -> Result<(), EngineError> {
        let delta_time = self.clock.begin_frame();
        let frame = self.clock.frame();

        let dispatched = self.events.flush(frame);
        self.scene.run_lifecycle_pass(frame, delta_time);
        app.update(self, delta_time)?;
        let committed = self.scene.commit_transforms();

        log::trace!("Frame {frame}: {dispatched} events dispatched, {committed} transforms committed");
        self.clock.end_frame();
        Ok(())
    }

    /// Swap the configuration at runtime
    ///
    /// Logging filters are fixed once the logger is installed; every other
    /// section takes effect from the next frame. Listeners of
    /// [`CONFIG_CHANGED`] are notified immediately.
    pub fn apply_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;

        self.events.set_config(config.events.clone());
        self.scene.set_update_order(config.scene.update_order);
        if config.fixed_delta_time != self.config.fixed_delta_time {
            self.clock.set_fixed_delta(config.fixed_delta_time);
        }
        self.config = config;

        log::info!(target: CONFIG, "Configuration applied at frame {}", self.frame());
        self.events.raise_immediate(
            EventObject::immediate(CONFIG_CHANGED).with_arg("frame", EventArg::Int(self.frame_index())),
        );
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)]
    const fn frame_index(&self) -> i64 {
        self.clock.frame() as i64
    }

    /// Request engine shutdown after the current frame
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the frame loop keeps going
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Get the scene
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get mutable access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Get the event scheduler
    pub const fn events(&self) -> &EventScheduler {
        &self.events
    }

    /// Get the active configuration
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current logical frame number
    pub const fn frame(&self) -> u64 {
        self.clock.frame()
    }

    /// Get the current frame delta time
    pub const fn delta_time(&self) -> f32 {
        self.clock.delta_time()
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scene operation failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Event scheduling failed
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Application callback failed
    #[error("Application error: {0}")]
    Application(Box<AppError>),
}

impl From<AppError> for EngineError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Engine(inner) => inner,
            other => Self::Application(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EventConfig;
    use crate::events::EventPriority;
    use crate::scene::{Component, ComponentContext};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Trace = Rc<RefCell<Vec<String>>>;

    struct Ticker {
        trace: Trace,
    }

    impl Component for Ticker {
        fn on_update(&mut self, ctx: &mut ComponentContext<'_>) {
            self.trace.borrow_mut().push(format!("component {}", ctx.frame()));
        }
    }

    struct TraceApp {
        trace: Trace,
        quit_at: u64,
    }

    impl Application for TraceApp {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            let trace = Rc::clone(&self.trace);
            engine.events().register_listener("tick", move |event| {
                trace.borrow_mut().push(format!("event {}", event.target_frame));
            });
            engine
                .events()
                .raise_queued(EventObject::new("tick", 1, EventPriority::Medium))?;

            let entity = engine.scene_mut().create_entity("ticker");
            engine.scene_mut().add_component(
                entity,
                Ticker {
                    trace: Rc::clone(&self.trace),
                },
            )?;
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
            self.trace.borrow_mut().push(format!("app {}", engine.frame()));
            if engine.frame() + 1 >= self.quit_at {
                engine.quit();
            }
            Ok(())
        }

        fn cleanup(&mut self, _engine: &mut Engine) {
            self.trace.borrow_mut().push("cleanup".to_string());
        }
    }

    #[test]
    fn test_frame_order() {
        let trace = Trace::default();
        let mut app = TraceApp {
            trace: Rc::clone(&trace),
            quit_at: 2,
        };

        Engine::run(EngineConfig::new().with_fixed_delta_time(0.1), &mut app).unwrap();

        assert_eq!(
            *trace.borrow(),
            vec!["component 0", "app 0", "event 1", "component 1", "app 1", "cleanup"]
        );
    }

    #[test]
    fn test_max_frames_stops_loop() {
        let trace = Trace::default();
        let mut app = TraceApp {
            trace: Rc::clone(&trace),
            quit_at: u64::MAX,
        };

        let config = EngineConfig::new().with_fixed_delta_time(0.1).with_max_frames(3);
        Engine::run(config, &mut app).unwrap();

        let app_frames = trace.borrow().iter().filter(|line| line.starts_with("app")).count();
        assert_eq!(app_frames, 3);
    }

    #[test]
    fn test_apply_config_notifies_listeners() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.events().register_listener(CONFIG_CHANGED, move |event| {
            sink.borrow_mut().push(event.get_int("frame"));
        });

        let config = EngineConfig::new().with_events(EventConfig::default().with_max_horizon(5));
        engine.apply_config(config.clone()).unwrap();

        assert_eq!(*seen.borrow(), vec![Some(0)]);
        assert_eq!(engine.config(), &config);
        assert!(engine
            .events()
            .raise_queued(EventObject::new("far", 50, EventPriority::Low))
            .is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = EngineConfig::new().with_log_level("shouting");
        assert!(matches!(Engine::new(bad), Err(EngineError::Config(_))));

        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let bad = EngineConfig::new().with_fixed_delta_time(-1.0);
        assert!(engine.apply_config(bad).is_err());
    }
}

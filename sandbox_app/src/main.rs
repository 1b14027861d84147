//! Sandbox level
//!
//! Exercises the scene engine without any rendering: a walking skeleton rig
//! re-synced through a self-requeueing event, a camera tracking it, a pool
//! of bullets recycled with `set_active`, a target counting hits through a
//! collision handler, and a light that gameplay code destroys mid-run.
//!
//! Usage: `sandbox [config.toml|config.ron]` (defaults to `sandbox.toml`).

mod components;

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::foundation::logging::GAMEPLAY;
use scene_engine::prelude::*;

use components::{hit_counter, Bullet, LightSource, LookAt, SkeletonRig};

const BULLET_POOL: usize = 8;
const BULLET_SPEED: f32 = 12.0;
const FIRE_INTERVAL: u64 = 15;
const LIGHT_OFF_FRAME: u64 = 240;
const REPORT_INTERVAL: u64 = 120;

struct SandboxApp {
    rng: StdRng,
    camera: Option<EntityId>,
    target: Option<EntityId>,
    light: Option<EntityId>,
    bullets: Vec<EntityId>,
    hits: Rc<Cell<u32>>,
    shots: u32,
}

impl SandboxApp {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            camera: None,
            target: None,
            light: None,
            bullets: Vec::with_capacity(BULLET_POOL),
            hits: Rc::new(Cell::new(0)),
            shots: 0,
        }
    }

    /// Launch the first pooled bullet that is not in flight
    fn fire(&mut self, scene: &mut Scene) -> Result<(), AppError> {
        let (Some(camera), Some(target)) = (self.camera, self.target) else {
            return Ok(());
        };
        let mut idle = None;
        for &bullet in &self.bullets {
            if !scene.active_self(bullet)? {
                idle = Some(bullet);
                break;
            }
        }
        let Some(bullet) = idle else {
            log::debug!(target: GAMEPLAY, "Bullet pool exhausted");
            return Ok(());
        };

        let muzzle = scene.world_transform(camera)?.position;
        let aim = scene.world_transform(target)?.position;
        let spread = Vec3::new(
            self.rng.gen_range(-0.4..0.4),
            self.rng.gen_range(-0.4..0.4),
            0.0,
        );
        let velocity = (aim + spread - muzzle).normalize() * BULLET_SPEED;

        let node = scene.transform_node(bullet)?;
        scene.transforms_mut().set_world_position(node, muzzle).map_err(SceneError::from)?;
        if let Some(projectile) = scene.get_component_mut::<Bullet>(bullet)? {
            projectile.launch(velocity);
        }
        scene.set_active(bullet, true)?;
        self.shots += 1;
        Ok(())
    }
}

impl Application for SandboxApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let scene = engine.scene_mut();

        let camera = scene.create_entity("Camera");
        scene.set_transform(
            camera,
            Vec3::new(0.0, 5.0, 10.0),
            Vec3::new(-15.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        )?;
        scene.add_component(camera, LookAt::new("Zombie"))?;

        let light = scene.create_entity("Light");
        scene.set_transform(light, Vec3::new(0.0, 200.0, 600.0), Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))?;
        scene.add_component(light, LightSource { intensity: 1.5 })?;

        let zombie = scene.create_entity("Zombie");
        let rig = scene.add_component(zombie, SkeletonRig::new())?;
        log::info!(
            target: GAMEPLAY,
            "Zombie rig has {} joints",
            scene.component::<SkeletonRig>(rig)?.joint_count()
        );

        let target = scene.create_entity("Target");
        scene.set_transform(target, Vec3::new(0.0, 1.0, -6.0), Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))?;
        scene.add_component(target, hit_counter(&self.hits))?;

        let pool = scene.create_entity("BulletPool");
        for i in 0..BULLET_POOL {
            let bullet = scene.create_child(pool, format!("Bullet{i}"))?;
            scene.set_active(bullet, false)?;
            scene.add_component(bullet, Bullet::new(target))?;
            self.bullets.push(bullet);
        }

        self.camera = Some(camera);
        self.target = Some(target);
        self.light = Some(light);
        log::info!(target: GAMEPLAY, "Sandbox level loaded with {} entities", scene.entity_count());
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        let frame = engine.frame();

        if frame % FIRE_INTERVAL == 0 {
            self.fire(engine.scene_mut())?;
        }

        if frame == LIGHT_OFF_FRAME {
            if let Some(light) = self.light.take() {
                engine.scene_mut().destroy_entity(light)?;
            }
        }

        if frame % REPORT_INTERVAL == 0 {
            let scene = engine.scene();
            let zombie = scene
                .find_entity_by_name("Zombie")
                .map(|zombie| scene.world_transform(zombie))
                .transpose()?;
            log::info!(
                target: GAMEPLAY,
                "Frame {frame}: {} shots, {} hits, {} events pending, zombie at {:?}",
                self.shots,
                self.hits.get(),
                engine.events().pending_count(),
                zombie.map(|pose| pose.position)
            );
        }
        Ok(())
    }

    fn cleanup(&mut self, _engine: &mut Engine) {
        log::info!(target: GAMEPLAY, "Sandbox finished: {} shots, {} hits", self.shots, self.hits.get());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "sandbox.toml".to_string());
    let mut config = EngineConfig::load_or_default(&path)?;
    config.fixed_delta_time.get_or_insert(1.0 / 60.0);
    config.max_frames.get_or_insert(600);

    let mut app = SandboxApp::new(0x5eed);
    Engine::run(config, &mut app)?;
    Ok(())
}

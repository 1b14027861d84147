//! Gameplay components used by the sandbox level

use std::cell::Cell;
use std::rc::Rc;

use scene_engine::events::{EventArg, EventObject, EventPriority, ListenerHandle};
use scene_engine::foundation::logging::GAMEPLAY;
use scene_engine::prelude::*;
use scene_engine::scene::{collision_event, COLLISION_ENTER};

/// Event that asks the rig to re-sync its joints; it re-queues itself every frame
pub const CUSTOM_UPDATE: &str = "CustomUpdate";

/// Argument naming the re-queue chain an event belongs to
const CHAIN: &str = "chain";

/// Joint name, rest offset from the rig root, and swing direction
const JOINTS: [(&str, [f32; 3], f32); 8] = [
    ("Head", [0.0, 1.7, 0.0], 0.0),
    ("Hips", [0.0, 1.0, 0.0], 0.0),
    ("LeftShoulder", [-0.2, 1.45, 0.0], 0.6),
    ("RightShoulder", [0.2, 1.45, 0.0], -0.6),
    ("LeftHand", [-0.25, 1.0, 0.0], 1.0),
    ("RightHand", [0.25, 1.0, 0.0], -1.0),
    ("LeftFoot", [-0.1, 0.0, 0.0], -0.8),
    ("RightFoot", [0.1, 0.0, 0.0], 0.8),
];

const WALK_SPEED: f32 = 0.4;
const STRIDE_RATE: f32 = 6.0;

/// Procedurally animated skeleton
///
/// Builds one child entity per joint when attached. Joint poses are pushed
/// to the children whenever a `CustomUpdate` event has been dispatched since
/// the last update. Each enable starts a fresh re-queue chain; a chain left
/// over from before a disable dies at its next event.
#[derive(Default)]
pub struct SkeletonRig {
    joints: Vec<(EntityId, Vec3, f32)>,
    resync: Rc<Cell<bool>>,
    chain: Rc<Cell<i64>>,
    listener: Option<ListenerHandle>,
    elapsed: f32,
}

impl SkeletonRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn sync_joints(&self, ctx: &mut ComponentContext<'_>) -> Result<(), SceneError> {
        let root = ctx.world_transform()?;
        let stride = (self.elapsed * STRIDE_RATE).sin();
        let scene = ctx.scene_mut();

        for &(joint, rest, swing) in &self.joints {
            let offset = rest + Vec3::new(0.0, 0.0, swing * stride * 0.3);
            let node = scene.transform_node(joint)?;
            let tree = scene.transforms_mut();
            tree.set_world_position(node, root.transform_point(offset))?;
            tree.set_world_rotation(node, root.rotation * Quat::from_axis_angle(&Vec3::x_axis(), swing * stride * 0.5))?;
        }
        Ok(())
    }
}

impl Component for SkeletonRig {
    fn on_create(&mut self, ctx: &mut ComponentContext<'_>) {
        let owner = ctx.entity();
        let scene = ctx.scene_mut();
        for (name, rest, swing) in JOINTS {
            let joint = match scene.create_child(owner, name) {
                Ok(joint) => joint,
                Err(err) => {
                    log::error!(target: GAMEPLAY, "Could not build joint {name}: {err}");
                    continue;
                }
            };
            if let Ok(node) = scene.transform_node(joint) {
                let _ = scene.transforms_mut().set_world_scale(node, Vec3::new(0.1, 0.1, 0.1));
            }
            self.joints.push((joint, Vec3::from(rest), swing));
        }
        log::info!(target: GAMEPLAY, "Rig built with {} joints", self.joints.len());
    }

    fn on_enable(&mut self, ctx: &mut ComponentContext<'_>) {
        let events = ctx.events().clone();
        let chain = self.chain.get() + 1;
        self.chain.set(chain);

        let resync = Rc::clone(&self.resync);
        let current = Rc::clone(&self.chain);
        let requeue = events.clone();
        self.listener = Some(events.register_listener(CUSTOM_UPDATE, move |event| {
            if event.get_int(CHAIN) != Some(current.get()) {
                return;
            }
            resync.set(true);
            let next = EventObject::new(CUSTOM_UPDATE, event.target_frame + 1, EventPriority::Medium)
                .with_arg(CHAIN, EventArg::Int(current.get()));
            if let Err(err) = requeue.raise_queued(next) {
                log::warn!(target: GAMEPLAY, "Rig stopped re-syncing: {err}");
            }
        }));

        let first = EventObject::new(CUSTOM_UPDATE, ctx.frame() + 1, EventPriority::Medium)
            .with_arg(CHAIN, EventArg::Int(chain));
        if let Err(err) = events.raise_queued(first) {
            log::warn!(target: GAMEPLAY, "Rig could not schedule its first sync: {err}");
        }
    }

    fn on_update(&mut self, ctx: &mut ComponentContext<'_>) {
        self.elapsed += ctx.delta_time();

        let step = Vec3::new(0.0, 0.0, -WALK_SPEED * ctx.delta_time());
        let owner = ctx.entity();
        if let Ok(node) = ctx.scene().transform_node(owner) {
            let _ = ctx.scene_mut().transforms_mut().translate_local(node, step);
        }

        if self.resync.replace(false) {
            if let Err(err) = self.sync_joints(ctx) {
                log::warn!(target: GAMEPLAY, "Joint sync failed: {err}");
            }
        }
    }

    fn on_disable(&mut self, ctx: &mut ComponentContext<'_>) {
        if let Some(handle) = self.listener.take() {
            ctx.events().unregister_listener(CUSTOM_UPDATE, handle);
        }
    }
}

/// Keeps its entity pointed at another entity
pub struct LookAt {
    target_name: &'static str,
    target: Option<EntityId>,
}

impl LookAt {
    pub const fn new(target_name: &'static str) -> Self {
        Self {
            target_name,
            target: None,
        }
    }
}

impl Component for LookAt {
    fn on_start(&mut self, ctx: &mut ComponentContext<'_>) {
        self.target = ctx.scene().find_entity_by_name(self.target_name);
    }

    fn on_update(&mut self, ctx: &mut ComponentContext<'_>) {
        let Some(target) = self.target else {
            return;
        };
        let owner = ctx.entity();
        let scene = ctx.scene_mut();
        let (Ok(node), Ok(goal)) = (scene.transform_node(owner), scene.world_transform(target)) else {
            // Target is gone
            self.target = None;
            return;
        };
        let _ = scene.transforms_mut().look_at(node, goal.position, Vec3::y());
    }
}

/// Pooled projectile
///
/// Flies while its entity is active. Reports a collision against `target`
/// when it comes close enough, then returns itself to the pool by
/// deactivating its entity.
pub struct Bullet {
    velocity: Vec3,
    age: f32,
    target: EntityId,
}

impl Bullet {
    const LIFETIME: f32 = 2.5;
    const HIT_RADIUS: f32 = 0.75;

    pub fn new(target: EntityId) -> Self {
        Self {
            velocity: Vec3::zeros(),
            age: 0.0,
            target,
        }
    }

    pub fn launch(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.age = 0.0;
    }
}

impl Component for Bullet {
    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.age = 0.0;
    }

    fn on_update(&mut self, ctx: &mut ComponentContext<'_>) {
        self.age += ctx.delta_time();
        let owner = ctx.entity();
        let delta = self.velocity * ctx.delta_time();
        let scene = ctx.scene_mut();

        let Ok(node) = scene.transform_node(owner) else {
            return;
        };
        let _ = scene.transforms_mut().translate_world(node, delta);

        let hit = match (scene.world_transform(owner), scene.world_transform(self.target)) {
            (Ok(bullet), Ok(target)) => (bullet.position - target.position).magnitude() <= Self::HIT_RADIUS,
            _ => false,
        };
        if hit {
            // Stand-in for the physics adapter
            scene
                .events()
                .raise_immediate(collision_event(CollisionPhase::Enter, self.target, Some(owner)));
        }
        if hit || self.age >= Self::LIFETIME {
            let _ = scene.set_active(owner, false);
        }
    }
}

/// Light source that gameplay code removes at runtime
pub struct LightSource {
    pub intensity: f32,
}

impl Component for LightSource {
    fn on_start(&mut self, ctx: &mut ComponentContext<'_>) {
        log::info!(target: GAMEPLAY, "Light on at frame {} ({:.1})", ctx.frame(), self.intensity);
    }

    fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) {
        log::info!(target: GAMEPLAY, "Light destroyed at frame {}", ctx.frame());
    }
}

/// Target that counts hits reported through its collision handler
pub fn hit_counter(hits: &Rc<Cell<u32>>) -> CollisionHandler {
    let mut handler = CollisionHandler::new();
    let hits = Rc::clone(hits);
    handler.register_on_enter(move |collision| {
        hits.set(hits.get() + 1);
        log::debug!(
            target: GAMEPLAY,
            "{} on {:?} from {:?}",
            COLLISION_ENTER,
            collision.entity,
            collision.other
        );
    });
    handler
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rig_keeps_one_sync_chain_across_toggles() {
        let mut scene = Scene::default();
        let events = scene.events().clone();
        let zombie = scene.create_entity("Zombie");
        scene.add_component(zombie, SkeletonRig::new()).unwrap();
        scene.run_lifecycle_pass(0, 0.016);
        assert_eq!(scene.children(zombie).unwrap().len(), JOINTS.len());

        for _ in 0..3 {
            scene.set_active(zombie, false).unwrap();
            scene.set_active(zombie, true).unwrap();
        }
        assert_eq!(events.listener_count(CUSTOM_UPDATE), 1);

        for frame in 1..5 {
            events.flush(frame);
            scene.run_lifecycle_pass(frame, 0.016);
        }
        assert_eq!(events.pending_count(), 1);
    }
}

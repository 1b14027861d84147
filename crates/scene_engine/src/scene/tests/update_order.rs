//! Per-frame update traversal order

use super::{call_log, CallLog, Probe};
use crate::core::config::{SceneConfig, UpdateOrder};
use crate::events::EventScheduler;
use crate::scene::Scene;

fn updates(log: &CallLog) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|(_, hook)| *hook == "update")
        .map(|(label, _)| label.clone())
        .collect()
}

/// Roots `a`, `b`, then `a1` created last under `a`, `a1x` under `a1`
fn build(scene: &mut Scene, log: &CallLog) {
    let a = scene.create_entity("a");
    let b = scene.create_entity("b");
    let a1 = scene.create_child(a, "a1").unwrap();
    let a1x = scene.create_child(a1, "a1x").unwrap();
    for (entity, label) in [(a1x, "a1x"), (b, "b"), (a1, "a1"), (a, "a")] {
        scene.add_component(entity, Probe::new(label, log)).unwrap();
    }
}

#[test]
fn test_hierarchy_order_updates_parents_first() {
    let log = call_log();
    let mut scene = Scene::default();
    build(&mut scene, &log);

    scene.run_lifecycle_pass(0, 0.0);

    assert_eq!(updates(&log), vec!["a", "a1", "a1x", "b"]);
}

#[test]
fn test_insertion_order_follows_creation() {
    let log = call_log();
    let config = SceneConfig {
        update_order: UpdateOrder::Insertion,
        ..SceneConfig::default()
    };
    let mut scene = Scene::new(config, EventScheduler::default());
    build(&mut scene, &log);

    scene.run_lifecycle_pass(0, 0.0);

    assert_eq!(updates(&log), vec!["a", "b", "a1", "a1x"]);
}

#[test]
fn test_components_of_one_entity_update_in_attachment_order() {
    let log = call_log();
    let mut scene = Scene::default();
    let entity = scene.create_entity("e");
    for label in ["first", "second", "third"] {
        scene.add_component(entity, Probe::new(label, &log)).unwrap();
    }

    scene.run_lifecycle_pass(0, 0.0);

    assert_eq!(updates(&log), vec!["first", "second", "third"]);
}

#[test]
fn test_reparenting_changes_hierarchy_order() {
    let log = call_log();
    let mut scene = Scene::default();
    build(&mut scene, &log);
    let b = scene.find_entity_by_name("b").unwrap();
    let a1 = scene.find_entity_by_name("a1").unwrap();

    scene.set_parent(a1, Some(b), true).unwrap();
    scene.run_lifecycle_pass(0, 0.0);

    assert_eq!(updates(&log), vec!["a", "b", "a1", "a1x"]);
}

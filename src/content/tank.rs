use std::sync::Arc;

use anyhow::Result;
use glam::Vec3;
use indexmap::IndexSet;
use log::debug;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::GridError;
use crate::kernel::Kernel;
use crate::message::ActionMessage;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::{NodeKind, SceneGraph, SceneNode, CONTENT};

use super::{delete_actions, merge_vec3, require_scene};

const CONTAINER: &str = "tanks";
const ACTIONS: &[&str] = &["tank.create", "tank.set", "tank.destroy"];

/// Live tanks plus the pool of destroyed ones kept around for reuse.
#[derive(Debug, Default)]
struct Fleet {
    active: IndexSet<String>,
    free: IndexSet<String>,
}

impl Fleet {
    /// Picks the id for a new tank and whether its nodes already exist.
    fn allocate(&mut self, requested: Option<&str>) -> Result<(String, bool), GridError> {
        if let Some(id) = requested {
            if self.active.contains(id) {
                return Err(GridError::InvalidArgument(format!("tank already exists: {id}")));
            }
            let recycled = self.free.shift_remove(id);
            self.active.insert(id.to_string());
            return Ok((id.to_string(), recycled));
        }
        if let Some(id) = self.free.shift_remove_index(0) {
            self.active.insert(id.clone());
            return Ok((id, true));
        }
        let id = (0..)
            .map(|n| format!("tank{n}"))
            .find(|id| !self.active.contains(id))
            .unwrap_or_default();
        self.active.insert(id.clone());
        Ok((id, false))
    }

    fn release(&mut self, id: &str) -> bool {
        if self.active.shift_remove(id) {
            self.free.insert(id.to_string());
            true
        } else {
            false
        }
    }
}

/// Tron tank objects, created and destroyed on demand.
#[derive(Debug, Default)]
pub struct TankModule {
    fleet: Arc<Mutex<Fleet>>,
}

impl GridModule for TankModule {
    fn description(&self) -> Option<&str> {
        Some("Tron tank objects")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        graph.add_node(SceneNode::new(CONTAINER, NodeKind::Group).under(CONTENT))?;

        let fleet = Arc::clone(&self.fleet);
        let scene = graph.clone();
        kernel.create_action("tank.create", move |_, message, reply| {
            let allocated = fleet.lock().allocate(message.str_param("tankId"));
            let (id, recycled) = match allocated {
                Ok(allocated) => allocated,
                Err(err) => return reply.error(err.to_string()),
            };
            if !recycled {
                if let Err(err) = build_tank(&scene, &id) {
                    fleet.lock().active.shift_remove(&id);
                    return reply.error(format!("{err:#}"));
                }
            }
            reset_tank(&scene, &id);
            apply_params(&scene, &id, message);
            debug!("tank created: {id} (recycled: {recycled})");
            reply.ok(json!({ "tankId": id }))
        })?;

        let fleet = Arc::clone(&self.fleet);
        let scene = graph.clone();
        kernel.create_action("tank.set", move |_, message, reply| {
            let Some(id) = message.str_param("tankId") else {
                return reply.error(GridError::MissingField("tankId").to_string());
            };
            if fleet.lock().active.contains(id) {
                apply_params(&scene, id, message);
            } else {
                debug!("tank.set ignored for unknown tank {id}");
            }
            reply.done()
        })?;

        let fleet = Arc::clone(&self.fleet);
        kernel.create_action("tank.destroy", move |_, message, reply| {
            let Some(id) = message.str_param("tankId") else {
                return reply.error(GridError::MissingField("tankId").to_string());
            };
            if fleet.lock().release(id) {
                graph.set_enabled(id, false);
            }
            reply.done()
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        delete_actions(kernel, ACTIONS);
        if let Ok(graph) = require_scene(resources) {
            graph.remove_subtree(CONTAINER);
        }
        *self.fleet.lock() = Fleet::default();
        Ok(())
    }
}

/// Tank `id` is a translate node holding the hull, which holds the gun.
fn build_tank(graph: &SceneGraph, id: &str) -> Result<()> {
    let hull = format!("{id}.hull");
    graph.add_node(SceneNode::new(id, NodeKind::Translate).under(CONTAINER))?;
    graph.add_node(SceneNode::new(hull.as_str(), NodeKind::Rotate).under(id))?;
    graph.add_node(
        SceneNode::new(format!("{id}.body"), NodeKind::Geometry)
            .under(hull.as_str())
            .with_color(Vec3::new(0.2, 0.8, 1.0))
            .with_geometry("tank-body"),
    )?;
    graph.add_node(SceneNode::new(format!("{id}.gun"), NodeKind::Rotate).under(hull.as_str()))?;
    graph.add_node(
        SceneNode::new(format!("{id}.barrel"), NodeKind::Geometry)
            .under(format!("{id}.gun"))
            .with_geometry("tank-gun"),
    )?;
    Ok(())
}

fn reset_tank(graph: &SceneGraph, id: &str) {
    graph.update(id, |node| {
        node.position = Vec3::ZERO;
        node.enabled = true;
    });
    graph.update(&format!("{id}.hull"), |node| node.rotation = Vec3::ZERO);
    graph.update(&format!("{id}.gun"), |node| node.rotation = Vec3::ZERO);
}

fn apply_params(graph: &SceneGraph, id: &str, message: &ActionMessage) {
    if let Some(pos) = message.param("pos") {
        graph.update(id, |node| node.position = merge_vec3(pos, node.position));
    }
    if let Some(dir) = message.f64_param("dir") {
        graph.update(&format!("{id}.hull"), |node| node.rotation.y = dir as f32);
    }
    if let Some(gun_dir) = message.f64_param("gunDir") {
        graph.update(&format!("{id}.gun"), |node| node.rotation.y = gun_dir as f32);
    }
    if let Some(visible) = message.bool_param("visible") {
        graph.set_enabled(id, visible);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{harness, SCENE, TANK};
    use super::*;
    use crate::kernel::Outcome;

    fn create(kernel: &Kernel, message: ActionMessage) -> Outcome {
        kernel.call(message).unwrap()
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let (kernel, manager) = harness(&[SCENE, TANK]);
        let first = create(&kernel, ActionMessage::new("tank.create"));
        let second = create(
            &kernel,
            ActionMessage::new("tank.create")
                .with_param("pos", json!({ "x": 10, "z": -5 }))
                .with_param("dir", 90),
        );
        assert_eq!(first.data(), Some(&json!({ "tankId": "tank0" })));
        assert_eq!(second.data(), Some(&json!({ "tankId": "tank1" })));

        let graph = require_scene(manager.resources()).unwrap();
        assert_eq!(graph.get("tank1").unwrap().position, Vec3::new(10.0, 0.0, -5.0));
        assert_eq!(graph.get("tank1.hull").unwrap().rotation.y, 90.0);
    }

    #[test]
    fn destroyed_tanks_are_recycled() {
        let (kernel, manager) = harness(&[SCENE, TANK]);
        create(&kernel, ActionMessage::new("tank.create"));
        create(&kernel, ActionMessage::new("tank.create"));
        kernel
            .call(ActionMessage::new("tank.destroy").with_param("tankId", "tank0"))
            .unwrap();
        let graph = require_scene(manager.resources()).unwrap();
        assert!(!graph.is_visible("tank0"));

        let recycled = create(&kernel, ActionMessage::new("tank.create"));
        assert_eq!(recycled.data(), Some(&json!({ "tankId": "tank0" })));
        assert!(graph.is_visible("tank0.barrel"));
    }

    #[test]
    fn requested_id_must_be_free() {
        let (kernel, _) = harness(&[SCENE, TANK]);
        let named = ActionMessage::new("tank.create").with_param("tankId", "alpha");
        assert_eq!(
            create(&kernel, named.clone()).data(),
            Some(&json!({ "tankId": "alpha" }))
        );
        assert!(matches!(create(&kernel, named), Outcome::Failed(_)));
    }

    #[test]
    fn set_requires_tank_id() {
        let (kernel, manager) = harness(&[SCENE, TANK]);
        let outcome = kernel.call(ActionMessage::new("tank.set")).unwrap();
        assert_eq!(
            outcome,
            Outcome::Failed(crate::error::ActionFailure::Handler(json!(
                "param expected: tankId"
            )))
        );

        create(&kernel, ActionMessage::new("tank.create"));
        kernel
            .call(
                ActionMessage::new("tank.set")
                    .with_param("tankId", "tank0")
                    .with_param("gunDir", 45)
                    .with_param("pos", json!({ "y": 2 })),
            )
            .unwrap();
        let graph = require_scene(manager.resources()).unwrap();
        assert_eq!(graph.get("tank0.gun").unwrap().rotation.y, 45.0);
        assert_eq!(graph.get("tank0").unwrap().position, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn unload_removes_all_tank_nodes() {
        let (kernel, manager) = harness(&[SCENE, TANK]);
        create(&kernel, ActionMessage::new("tank.create"));
        manager.unload(&kernel, Some(&[TANK.to_string()]));
        let graph = require_scene(manager.resources()).unwrap();
        assert!(!graph.contains("tank0"));
        assert!(!graph.contains(CONTAINER));
        assert!(!kernel.has_action("tank.create"));
    }
}

use std::sync::Arc;

use anyhow::Result;
use glam::Vec3;
use indexmap::IndexSet;
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::GridError;
use crate::kernel::Kernel;
use crate::message::ActionMessage;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::{NodeKind, SceneGraph, SceneNode, CONTENT};

use super::{delete_actions, merge_vec3, require_scene};

const CONTAINER: &str = "prims";
const ACTIONS: &[&str] = &["prims.create", "prims.set", "prims.delete"];
const SHAPES: &[&str] = &["teapot", "box", "sphere"];

/// Geometric primitives created and deleted by id.
#[derive(Debug, Default)]
pub struct PrimsModule {
    prims: Arc<Mutex<IndexSet<String>>>,
}

impl GridModule for PrimsModule {
    fn description(&self) -> Option<&str> {
        Some("Geometric primitives")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        graph.add_node(SceneNode::new(CONTAINER, NodeKind::Group).under(CONTENT))?;

        let prims = Arc::clone(&self.prims);
        let scene = graph.clone();
        kernel.create_action("prims.create", move |_, message, reply| {
            let Some(id) = message.str_param("primId") else {
                return reply.error(GridError::MissingField("primId").to_string());
            };
            let Some(shape) = message.str_param("type") else {
                return reply.error(GridError::MissingField("type").to_string());
            };
            if !SHAPES.contains(&shape) {
                return reply.error(
                    GridError::InvalidArgument(format!("unsupported prim type: {shape}"))
                        .to_string(),
                );
            }
            if !prims.lock().insert(id.to_string()) {
                return reply.error(
                    GridError::InvalidArgument(format!("ID used by another prim: {id}"))
                        .to_string(),
                );
            }
            if let Err(err) = build_prim(&scene, id, shape) {
                prims.lock().shift_remove(id);
                return reply.error(format!("{err:#}"));
            }
            apply_params(&scene, id, message);
            debug!("prim created: {id} ({shape})");
            reply.done()
        })?;

        let prims = Arc::clone(&self.prims);
        let scene = graph.clone();
        kernel.create_action("prims.set", move |_, message, reply| {
            let Some(id) = message.str_param("primId") else {
                return reply.error(GridError::MissingField("primId").to_string());
            };
            if !prims.lock().contains(id) {
                return reply.error(format!("prim not found: {id}"));
            }
            apply_params(&scene, id, message);
            reply.done()
        })?;

        let prims = Arc::clone(&self.prims);
        kernel.create_action("prims.delete", move |_, message, reply| {
            let Some(id) = message.str_param("primId") else {
                return reply.error(GridError::MissingField("primId").to_string());
            };
            if prims.lock().shift_remove(id) {
                graph.remove_subtree(&node_id(id));
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
        self.prims.lock().clear();
        Ok(())
    }
}

fn node_id(id: &str) -> String {
    format!("{CONTAINER}.{id}")
}

/// Prim `id` is a translate node over pitch and yaw rotations holding the
/// shape, which carries the scale and base colour.
fn build_prim(graph: &SceneGraph, id: &str, shape: &str) -> Result<()> {
    let root = node_id(id);
    graph.add_node(SceneNode::new(root.as_str(), NodeKind::Translate).under(CONTAINER))?;
    graph.add_node(SceneNode::new(format!("{root}.pitch"), NodeKind::Rotate).under(root.as_str()))?;
    graph.add_node(
        SceneNode::new(format!("{root}.yaw"), NodeKind::Rotate).under(format!("{root}.pitch")),
    )?;
    graph.add_node(
        SceneNode::new(format!("{root}.shape"), NodeKind::Geometry)
            .under(format!("{root}.yaw"))
            .with_geometry(shape),
    )?;
    Ok(())
}

fn apply_params(graph: &SceneGraph, id: &str, message: &ActionMessage) {
    let root = node_id(id);
    if let Some(visible) = message.bool_param("visible") {
        graph.set_enabled(&root, visible);
    }
    if let Some(pos) = message.param("pos") {
        graph.update(&root, |node| node.position = merge_vec3(pos, node.position));
    }
    if let Some(angle) = message.f64_param("rotateX") {
        graph.update(&format!("{root}.pitch"), |node| node.rotation.x = angle as f32);
    }
    if let Some(angle) = message.f64_param("rotateY") {
        graph.update(&format!("{root}.yaw"), |node| node.rotation.y = angle as f32);
    }
    let shape = format!("{root}.shape");
    if let Some(scale) = message.param("scale") {
        graph.update(&shape, |node| node.scale = merge_vec3(scale, node.scale));
    }
    if let Some(color) = message.param("material").and_then(|m| m.get("baseColor")) {
        graph.update(&shape, |node| node.color = merge_color(color, node.color));
    }
}

/// Merges a partial `{r, g, b}` colour onto `base`.
fn merge_color(value: &Value, base: Vec3) -> Vec3 {
    let channel = |key: &str, fallback: f32| {
        value
            .get(key)
            .and_then(Value::as_f64)
            .map_or(fallback, |n| n as f32)
    };
    Vec3::new(channel("r", base.x), channel("g", base.y), channel("b", base.z))
}

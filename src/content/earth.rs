use anyhow::Result;
use glam::Vec3;
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;

use crate::kernel::{Kernel, Subscription};
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::{NodeKind, SceneNode, CONTENT};

use super::{delete_actions, require_scene};

const ROOT_NODE: &str = "earth";
const PITCH: &str = "earth.pitch";
const YAW: &str = "earth.yaw";
const SPIN: &str = "earth.spin";
const CLOUDS_SPIN: &str = "earth.clouds.spin";
const SPIN_STEP: f32 = -0.02;
const CLOUDS_STEP: f32 = -0.06;

/// The Earth with a cloud layer, spinning on every `tick`.
#[derive(Debug, Default)]
pub struct EarthModule {
    ticker: Mutex<Option<Subscription>>,
}

impl GridModule for EarthModule {
    fn description(&self) -> Option<&str> {
        Some("The Earth with color, specular and emission maps, with a cloud layer")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        graph.add_node(SceneNode::new(ROOT_NODE, NodeKind::Group).under(CONTENT))?;
        graph.add_node(SceneNode::new(PITCH, NodeKind::Rotate).under(ROOT_NODE))?;
        graph.add_node(SceneNode::new(YAW, NodeKind::Rotate).under(PITCH))?;
        graph.add_node(
            SceneNode::new("earth.tilt", NodeKind::Rotate)
                .under(YAW)
                .with_rotation(Vec3::new(0.0, 0.0, 195.0)),
        )?;
        graph.add_node(SceneNode::new(SPIN, NodeKind::Rotate).under("earth.tilt"))?;
        graph.add_node(
            SceneNode::new("earth.surface", NodeKind::Geometry)
                .under(SPIN)
                .with_scale(Vec3::splat(2.0))
                .with_geometry("sphere"),
        )?;
        graph.add_node(SceneNode::new(CLOUDS_SPIN, NodeKind::Rotate).under("earth.tilt"))?;
        graph.add_node(
            SceneNode::new("earth.clouds", NodeKind::Geometry)
                .under(CLOUDS_SPIN)
                .with_scale(Vec3::splat(2.02))
                .with_geometry("sphere"),
        )?;

        let setter = graph.clone();
        kernel.create_action("earth.set", move |_, message, reply| {
            if let Some(visible) = message.bool_param("visible") {
                setter.set_enabled(ROOT_NODE, visible);
            }
            if let Some(angle) = message.f64_param("rotateX") {
                setter.update(PITCH, |node| node.rotation.x = angle as f32);
            }
            if let Some(angle) = message.f64_param("rotateY") {
                setter.update(YAW, |node| node.rotation.y = angle as f32);
            }
            reply.done()
        })?;

        let spinner = graph.clone();
        let handle = kernel.on_event("tick", move |_, _| {
            spinner.update(SPIN, |node| node.rotation.y += SPIN_STEP);
            spinner.update(CLOUDS_SPIN, |node| node.rotation.y += CLOUDS_STEP);
        })?;
        *self.ticker.lock() = Some(handle);
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        if let Some(handle) = self.ticker.lock().take() {
            kernel.un_event(handle);
        }
        delete_actions(kernel, &["earth.set"]);
        if let Ok(graph) = require_scene(resources) {
            let removed = graph.remove_subtree(ROOT_NODE);
            debug!("removed {} earth nodes", removed.len());
        }
        Ok(())
    }
}

use anyhow::Result;
use glam::Vec3;
use serde_json::Value;

use crate::kernel::Kernel;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::{NodeKind, SceneNode, CONTENT};

use super::{delete_actions, require_scene};

const ROOT_NODE: &str = "teapot";
const PITCH: &str = "teapot.pitch";
const YAW: &str = "teapot.yaw";

#[derive(Debug, Default)]
pub struct TeapotModule;

impl GridModule for TeapotModule {
    fn description(&self) -> Option<&str> {
        Some("Newell teapot primitive")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        graph.add_node(SceneNode::new(ROOT_NODE, NodeKind::Group).under(CONTENT))?;
        graph.add_node(SceneNode::new(PITCH, NodeKind::Rotate).under(ROOT_NODE))?;
        graph.add_node(SceneNode::new(YAW, NodeKind::Rotate).under(PITCH))?;
        graph.add_node(
            SceneNode::new("teapot.mesh", NodeKind::Geometry)
                .under(YAW)
                .with_color(Vec3::new(0.5, 0.5, 0.9))
                .with_geometry("teapot"),
        )?;

        kernel.create_action("demos.teapot.set", move |_, message, reply| {
            if let Some(visible) = message.bool_param("visible") {
                graph.set_enabled(ROOT_NODE, visible);
            }
            if let Some(angle) = message.f64_param("rotateX") {
                graph.update(PITCH, |node| node.rotation.x = angle as f32);
            }
            if let Some(angle) = message.f64_param("rotateY") {
                graph.update(YAW, |node| node.rotation.y = angle as f32);
            }
            reply.done()
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        delete_actions(kernel, &["demos.teapot.set"]);
        if let Ok(graph) = require_scene(resources) {
            graph.remove_subtree(ROOT_NODE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{harness, SCENE, TEAPOT};
    use super::*;
    use crate::message::ActionMessage;

    #[test]
    fn set_rotates_and_hides() {
        let (kernel, manager) = harness(&[SCENE, TEAPOT]);
        let graph = require_scene(manager.resources()).unwrap();
        assert!(graph.is_visible("teapot.mesh"));

        kernel
            .call(
                ActionMessage::new("demos.teapot.set")
                    .with_param("rotateY", 90)
                    .with_param("visible", false),
            )
            .unwrap();
        assert_eq!(graph.get(YAW).unwrap().rotation.y, 90.0);
        assert!(!graph.is_visible("teapot.mesh"));
    }
}

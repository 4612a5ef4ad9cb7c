use anyhow::Result;
use glam::Vec3;
use serde_json::Value;

use crate::kernel::Kernel;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::{NodeKind, SceneNode, CONTENT};

use super::{delete_actions, require_scene};

const NODE: &str = "floor";

/// Grid floor like in Tron.
#[derive(Debug, Default)]
pub struct FloorModule;

impl GridModule for FloorModule {
    fn description(&self) -> Option<&str> {
        Some("Grid floor like in Tron")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        graph.add_node(
            SceneNode::new(NODE, NodeKind::Geometry)
                .under(CONTENT)
                .with_position(Vec3::new(0.0, -10.0, 0.0))
                .with_color(Vec3::new(0.0, 0.6, 1.0))
                .with_geometry("grid"),
        )?;

        let shower = graph.clone();
        kernel.create_action("floor.show", move |_, _, reply| {
            shower.set_enabled(NODE, true);
            reply.done()
        })?;
        kernel.create_action("floor.hide", move |_, _, reply| {
            graph.set_enabled(NODE, false);
            reply.done()
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        delete_actions(kernel, &["floor.show", "floor.hide"]);
        if let Ok(graph) = require_scene(resources) {
            graph.remove_subtree(NODE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{harness, FLOOR, SCENE};
    use super::*;
    use crate::message::ActionMessage;

    #[test]
    fn show_and_hide_toggle_the_floor() {
        let (kernel, manager) = harness(&[SCENE, FLOOR]);
        let graph = require_scene(manager.resources()).unwrap();
        kernel.call(ActionMessage::new("floor.hide")).unwrap();
        assert!(!graph.is_visible(NODE));
        kernel.call(ActionMessage::new("floor.show")).unwrap();
        assert!(graph.is_visible(NODE));
    }
}

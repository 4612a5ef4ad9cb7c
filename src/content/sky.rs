use anyhow::Result;
use glam::Vec3;
use serde_json::Value;

use crate::kernel::Kernel;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::{NodeKind, SceneNode, SKY};

use super::{delete_actions, require_scene};

const NODE: &str = "milkyway";

/// Milky Way sky sphere, hung under the scene's `sky` group so it moves
/// with the camera only.
#[derive(Debug, Default)]
pub struct MilkyWayModule;

impl GridModule for MilkyWayModule {
    fn description(&self) -> Option<&str> {
        Some("Milky Way sky sphere")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        graph.add_node(
            SceneNode::new(NODE, NodeKind::Geometry)
                .under(SKY)
                .with_scale(Vec3::splat(1000.0))
                .with_geometry("sphere"),
        )?;

        let shower = graph.clone();
        kernel.create_action("milkyway.show", move |_, _, reply| {
            shower.set_enabled(NODE, true);
            reply.done()
        })?;
        kernel.create_action("milkyway.hide", move |_, _, reply| {
            graph.set_enabled(NODE, false);
            reply.done()
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        delete_actions(kernel, &["milkyway.show", "milkyway.hide"]);
        if let Ok(graph) = require_scene(resources) {
            graph.remove_subtree(NODE);
        }
        Ok(())
    }
}

use anyhow::Result;
use serde_json::{json, Value};

use crate::error::GridResult;
use crate::kernel::Kernel;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::SceneGraph;

use super::{delete_actions, merge_vec3, require_scene, vec3_json};

const UPDATED: &str = "camera.updated";
const ACTIONS: &[&str] = &["camera.set", "camera.reset", "camera.get"];

/// Basic camera controls on the scene's viewing transform.
#[derive(Debug, Default)]
pub struct CameraModule;

impl GridModule for CameraModule {
    fn description(&self) -> Option<&str> {
        Some("Controls the camera")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        let graph = require_scene(resources)?;
        kernel.create_event(UPDATED)?;

        let setter = graph.clone();
        kernel.create_action("camera.set", move |kernel, message, reply| {
            let mut look_at = setter.look_at();
            if let Some(eye) = message.param("eye") {
                look_at.eye = merge_vec3(eye, look_at.eye);
            }
            if let Some(look) = message.param("look") {
                look_at.look = merge_vec3(look, look_at.look);
            }
            if let Some(up) = message.param("up") {
                look_at.up = merge_vec3(up, look_at.up);
            }
            setter.set_look_at(look_at);
            reply.finish(announce(kernel, &setter).map(|()| None))
        })?;

        let original = graph.look_at();
        let resetter = graph.clone();
        kernel.create_action("camera.reset", move |kernel, _, reply| {
            resetter.set_look_at(original);
            reply.finish(announce(kernel, &resetter).map(|()| None))
        })?;

        kernel.create_action("camera.get", move |_, _, reply| {
            let mut state = camera_state(&graph);
            state["viewProjection"] = json!(graph.view_projection().to_cols_array().to_vec());
            reply.ok(state)
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, _resources: &SharedResources) -> Result<()> {
        delete_actions(kernel, ACTIONS);
        kernel.delete_event(UPDATED);
        Ok(())
    }
}

fn camera_state(graph: &SceneGraph) -> Value {
    let look_at = graph.look_at();
    json!({
        "eye": vec3_json(look_at.eye),
        "look": vec3_json(look_at.look),
        "up": vec3_json(look_at.up),
    })
}

fn announce(kernel: &Kernel, graph: &SceneGraph) -> GridResult<()> {
    kernel.fire_event(UPDATED, Some(camera_state(graph)))
}

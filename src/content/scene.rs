use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use crate::error::GridError;
use crate::kernel::Kernel;
use crate::modules::GridModule;
use crate::resources::SharedResources;
use crate::scene::SceneGraph;

use super::{delete_actions, require_scene, CANVAS_KEY, SCENE_KEY};

const DEFAULT_CANVAS: &str = "theCanvas";
const DEFAULT_DT: f64 = 1.0 / 60.0;
const MAX_TICKS: f64 = 100_000.0;
const ACTIONS: &[&str] = &["scene.tick", "scene.get"];

/// Owns the scene skeleton the other content modules graft onto, and the
/// `tick` event that drives their animation.
#[derive(Debug, Default)]
pub struct SceneModule {
    frames: Arc<AtomicU64>,
}

impl GridModule for SceneModule {
    fn description(&self) -> Option<&str> {
        Some("Scene graph skeleton with camera, lights and content groups")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, config: &Value) -> Result<()> {
        let canvas_id = config
            .get(CANVAS_KEY)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CANVAS)
            .to_string();

        resources.insert(SCENE_KEY, SceneGraph::with_skeleton()?);
        resources.insert(CANVAS_KEY, canvas_id);
        kernel.create_event("tick")?;

        let frames = Arc::clone(&self.frames);
        kernel.create_action("scene.tick", move |kernel, message, reply| {
            let count = message.f64_param("count").unwrap_or(1.0);
            if !(0.0..=MAX_TICKS).contains(&count) {
                return reply.error(
                    GridError::InvalidArgument(format!(
                        "tick count must be between 0 and {MAX_TICKS}, got {count}"
                    ))
                    .to_string(),
                );
            }
            let count = count as u64;
            let dt = message.f64_param("dt").unwrap_or(DEFAULT_DT);
            let result = (0..count).try_for_each(|_| {
                let frame = frames.fetch_add(1, Ordering::Relaxed) + 1;
                kernel.fire_event("tick", Some(json!({ "frame": frame, "dt": dt })))
            });
            reply.finish(result.map(|()| None))
        })?;

        let query = resources.clone();
        kernel.create_action("scene.get", move |_, _, reply| {
            let result = require_scene(&query).and_then(|graph| {
                let canvas_id = query.get::<String>(CANVAS_KEY);
                Ok(json!({
                    "canvasId": canvas_id.as_deref(),
                    "nodes": serde_json::to_value(graph.all_nodes())?,
                }))
            });
            reply.finish(result.map(Some).map_err(|err| format!("{err:#}")))
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        delete_actions(kernel, ACTIONS);
        kernel.delete_event("tick");
        resources.remove(SCENE_KEY);
        resources.remove(CANVAS_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{harness, SCENE};
    use super::*;
    use crate::message::ActionMessage;
    use parking_lot::Mutex;

    #[test]
    fn init_publishes_scene_and_canvas() {
        let (kernel, manager) = harness(&[SCENE]);
        let resources = manager.resources();
        assert_eq!(require_scene(resources).unwrap().len(), 6);
        assert_eq!(
            resources.get::<String>(CANVAS_KEY).as_deref().map(String::as_str),
            Some("theCanvas")
        );
        let outcome = kernel.call(ActionMessage::new("scene.get")).unwrap();
        let data = outcome.data().unwrap();
        assert_eq!(data["canvasId"], json!("theCanvas"));
        assert_eq!(data["nodes"][0]["id"], json!("root"));
    }

    #[test]
    fn tick_fires_once_per_frame() {
        let (kernel, _) = harness(&[SCENE]);
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        kernel
            .on_event("tick", move |_, params| sink.lock().push(params["frame"].clone()))
            .unwrap();
        kernel
            .call(ActionMessage::new("scene.tick").with_param("count", 3))
            .unwrap();
        assert_eq!(frames.lock().as_slice(), [json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn oversized_tick_count_is_rejected() {
        let (kernel, _) = harness(&[SCENE]);
        let ticks = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&ticks);
        kernel.on_event("tick", move |_, _| *sink.lock() += 1).unwrap();
        for count in [json!(1e15), json!(-1)] {
            let outcome = kernel
                .call(ActionMessage::new("scene.tick").with_param("count", count))
                .unwrap();
            assert!(matches!(outcome, crate::kernel::Outcome::Failed(_)));
        }
        assert_eq!(*ticks.lock(), 0);
    }

    #[test]
    fn unload_takes_everything_back() {
        let (kernel, manager) = harness(&[SCENE]);
        manager.unload(&kernel, None);
        assert!(!kernel.has_event("tick"));
        assert!(!kernel.has_action("scene.tick"));
        assert!(!manager.resources().contains(SCENE_KEY));
    }
}

//! Built-in demo modules.
//!
//! Each module only talks to the kernel and the shared resources, exactly
//! as a third-party bundle would. They keep a headless scene tree so the
//! runtime has something to show without a renderer.

mod camera;
mod earth;
mod floor;
mod mouse;
mod prims;
mod scene;
mod sky;
mod tank;
mod teapot;

use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec3;
use serde_json::{json, Value};

use crate::kernel::Kernel;
use crate::modules::ModuleCatalog;
use crate::resources::SharedResources;
use crate::scene::SceneGraph;

pub use camera::CameraModule;
pub use earth::EarthModule;
pub use floor::FloorModule;
pub use mouse::MouseModule;
pub use prims::PrimsModule;
pub use scene::SceneModule;
pub use sky::MilkyWayModule;
pub use tank::TankModule;
pub use teapot::TeapotModule;

/// Resource key of the shared [`SceneGraph`].
pub const SCENE_KEY: &str = "scene";
/// Resource key of the canvas id the scene was configured with.
pub const CANVAS_KEY: &str = "canvasId";
/// Resource key of the shared [`crate::input::PointerState`].
pub const POINTER_KEY: &str = "input.pointer";

pub const SCENE: &str = "scenes/scene";
pub const CAMERA: &str = "camera/camera";
pub const EARTH: &str = "objects/planets/earth";
pub const TEAPOT: &str = "objects/prims/teapot";
pub const PRIMS: &str = "objects/prims/prims";
pub const FLOOR: &str = "objects/floors/grid";
pub const MILKY_WAY: &str = "objects/skies/milkyway";
pub const TANK: &str = "objects/vehicles/tank/tank";
pub const MOUSE: &str = "input/mouse";

/// Catalog holding every built-in module under its canonical id.
pub fn catalog() -> ModuleCatalog {
    let mut catalog = ModuleCatalog::default();
    catalog
        .register_module(SCENE, SceneModule::default)
        .register_module(CAMERA, CameraModule::default)
        .register_module(EARTH, EarthModule::default)
        .register_module(TEAPOT, TeapotModule::default)
        .register_module(PRIMS, PrimsModule::default)
        .register_module(FLOOR, FloorModule::default)
        .register_module(MILKY_WAY, MilkyWayModule::default)
        .register_module(TANK, TankModule::default)
        .register_module(MOUSE, MouseModule::default);
    catalog
}

fn require_scene(resources: &SharedResources) -> Result<Arc<SceneGraph>> {
    resources
        .get::<SceneGraph>(SCENE_KEY)
        .with_context(|| format!("no scene graph available; load {SCENE} first"))
}

fn delete_actions(kernel: &Kernel, ids: &[&str]) {
    for id in ids {
        kernel.delete_action(id);
    }
}

/// Merges a partial `{x, y, z}` object onto `base`. Numbers in array form
/// are accepted too.
fn merge_vec3(value: &Value, base: Vec3) -> Vec3 {
    match value {
        Value::Array(items) => {
            let component = |index: usize, fallback: f32| {
                items
                    .get(index)
                    .and_then(Value::as_f64)
                    .map_or(fallback, |n| n as f32)
            };
            Vec3::new(component(0, base.x), component(1, base.y), component(2, base.z))
        }
        Value::Object(fields) => {
            let component = |key: &str, fallback: f32| {
                fields
                    .get(key)
                    .and_then(Value::as_f64)
                    .map_or(fallback, |n| n as f32)
            };
            Vec3::new(component("x", base.x), component("y", base.y), component("z", base.z))
        }
        _ => base,
    }
}

fn vec3_json(v: Vec3) -> Value {
    json!({ "x": v.x, "y": v.y, "z": v.z })
}

/// Kernel with the built-in catalog installed and `ids` loaded.
#[cfg(test)]
fn harness(ids: &[&str]) -> (Kernel, crate::modules::ModuleManager) {
    use crate::modules::{LoadPolicy, ModuleManager};

    let kernel = Kernel::new();
    let manager = ModuleManager::install(
        &kernel,
        Arc::new(catalog()),
        SharedResources::new(),
        LoadPolicy::FailFast,
    )
    .unwrap();
    let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    let report = manager.load(&kernel, &ids, &json!({ "canvasId": "theCanvas" }));
    assert!(report.is_success(), "{:?}", report.failed);
    (kernel, manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_builtin_modules() {
        let catalog = catalog();
        assert_eq!(
            catalog.ids(),
            vec![SCENE, CAMERA, EARTH, TEAPOT, PRIMS, FLOOR, MILKY_WAY, TANK, MOUSE]
        );
    }

    #[test]
    fn partial_vectors_merge() {
        let base = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(merge_vec3(&json!({ "y": 5 }), base), Vec3::new(1.0, 5.0, 3.0));
        assert_eq!(merge_vec3(&json!([7, 8]), base), Vec3::new(7.0, 8.0, 3.0));
        assert_eq!(merge_vec3(&json!("nope"), base), base);
    }
}

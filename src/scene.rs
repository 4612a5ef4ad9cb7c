use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use glam::{Mat4, Vec3};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Ids of the nodes every scene starts with.
pub const ROOT: &str = "root";
pub const LOOK_AT: &str = "lookat";
pub const CAMERA: &str = "camera";
pub const SKY: &str = "sky";
pub const LIGHTS: &str = "lights";
pub const CONTENT: &str = "content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Group,
    LookAt,
    Camera,
    Light,
    Rotate,
    Translate,
    Geometry,
}

/// One node of the headless scene tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
}

impl SceneNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: None,
            enabled: default_enabled(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            color: default_color(),
            geometry: None,
        }
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_geometry(mut self, geometry: impl Into<String>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn default_enabled() -> bool {
    true
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

/// Viewing transform of the scene's `lookat` node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAt {
    pub eye: Vec3,
    pub look: Vec3,
    pub up: Vec3,
}

impl Default for LookAt {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, -10.0),
            look: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

impl LookAt {
    pub fn view_matrix(&self) -> Mat4 {
        let up = if self.up.length_squared() > f32::EPSILON {
            self.up.normalize()
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.eye, self.look, up)
    }
}

/// Perspective projection of the scene's `camera` node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Optics {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Optics {
    fn default() -> Self {
        Self {
            fovy: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

impl Optics {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fovy.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }
}

/// Thread-safe scene tree shared between the content modules.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Arc<RwLock<IndexMap<String, SceneNode>>>,
    look_at: Arc<RwLock<LookAt>>,
    optics: Arc<RwLock<Optics>>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
            look_at: Arc::clone(&self.look_at),
            optics: Arc::clone(&self.optics),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding the standard skeleton: a root with the
    /// viewing transform, the camera below it and the `sky`, `lights`
    /// and `content` groups below the camera.
    pub fn with_skeleton() -> Result<Self> {
        let graph = Self::new();
        graph.add_node(SceneNode::new(ROOT, NodeKind::Group))?;
        graph.add_node(SceneNode::new(LOOK_AT, NodeKind::LookAt).under(ROOT))?;
        graph.add_node(SceneNode::new(CAMERA, NodeKind::Camera).under(LOOK_AT))?;
        graph.add_node(SceneNode::new(SKY, NodeKind::Group).under(CAMERA))?;
        graph.add_node(
            SceneNode::new(LIGHTS, NodeKind::Light)
                .under(CAMERA)
                .with_position(Vec3::new(-1.0, -0.5, -1.0)),
        )?;
        graph.add_node(SceneNode::new(CONTENT, NodeKind::Group).under(LIGHTS))?;
        Ok(graph)
    }

    /// Inserts a node. Its parent, if any, must already exist and its id
    /// must be unused.
    pub fn add_node(&self, node: SceneNode) -> Result<()> {
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&node.id) {
            bail!("scene node '{}' already exists", node.id);
        }
        if let Some(parent) = &node.parent {
            if !nodes.contains_key(parent) {
                return Err(anyhow!(
                    "parent '{parent}' of scene node '{}' does not exist",
                    node.id
                ));
            }
        }
        nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Removes a node and everything below it, returning the removed ids.
    pub fn remove_subtree(&self, id: &str) -> Vec<String> {
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(id) {
            return Vec::new();
        }
        let mut removed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < removed.len() {
            let parent = removed[cursor].clone();
            removed.extend(
                nodes
                    .values()
                    .filter(|node| node.parent.as_deref() == Some(parent.as_str()))
                    .map(|node| node.id.clone()),
            );
            cursor += 1;
        }
        for id in &removed {
            nodes.shift_remove(id);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<SceneNode> {
        self.nodes.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Applies a mutation to the requested node.
    pub fn update<F, R>(&self, id: &str, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneNode) -> R,
    {
        let mut nodes = self.nodes.write();
        nodes.get_mut(id).map(updater)
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        self.update(id, |node| node.enabled = enabled).is_some()
    }

    /// True when the node and all of its ancestors are enabled.
    pub fn is_visible(&self, id: &str) -> bool {
        let nodes = self.nodes.read();
        let mut current = nodes.get(id);
        while let Some(node) = current {
            if !node.enabled {
                return false;
            }
            current = node.parent.as_deref().and_then(|parent| nodes.get(parent));
        }
        nodes.contains_key(id)
    }

    pub fn children(&self, id: &str) -> Vec<String> {
        self.nodes
            .read()
            .values()
            .filter(|node| node.parent.as_deref() == Some(id))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Snapshot of every node in insertion order.
    pub fn all_nodes(&self) -> Vec<SceneNode> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn look_at(&self) -> LookAt {
        *self.look_at.read()
    }

    pub fn set_look_at(&self, look_at: LookAt) {
        *self.look_at.write() = look_at;
    }

    pub fn optics(&self) -> Optics {
        *self.optics.read()
    }

    pub fn set_optics(&self, optics: Optics) {
        *self.optics.write() = optics;
    }

    pub fn view_projection(&self) -> Mat4 {
        self.optics().projection_matrix() * self.look_at().view_matrix()
    }
}

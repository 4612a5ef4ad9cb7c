//! Kernel of a browser 3D demo platform, rewritten in Rust.
//!
//! Independently written modules collaborate only through a small kernel:
//! named events with subscriptions, named actions invoked with JSON
//! messages that may chain further actions, and a lifecycle manager that
//! loads and unloads modules by id. Rendering stays outside the crate;
//! the built-in content modules keep a headless scene tree instead.

pub mod app;
pub mod content;
pub mod error;
pub mod input;
pub mod kernel;
pub mod message;
pub mod modules;
pub mod resources;
pub mod scene;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{Runtime, RuntimeConfig};
pub use error::{ActionFailure, GridError, GridResult, ModuleFault};
pub use input::{MouseButton, PointerState};
pub use kernel::{Action, Kernel, Outcome, Reply, Subscription};
pub use message::ActionMessage;
pub use modules::{
    Bundle, GridModule, LoadPolicy, LoadReport, ModuleCatalog, ModuleDescriptor, ModuleManager,
    ModuleResolver, ModuleState, UnloadReport,
};
pub use resources::SharedResources;
pub use scene::{SceneGraph, SceneNode};

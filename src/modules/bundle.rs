use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ModuleFault;
use crate::kernel::Kernel;
use crate::resources::SharedResources;

pub type InitFn = dyn Fn(&Kernel, &SharedResources, &Value) -> Result<()> + Send + Sync;
pub type DestroyFn = dyn Fn(&Kernel, &SharedResources) -> Result<()> + Send + Sync;

/// Typed form of the module capability contract.
///
/// `init` registers the module's actions and events and grafts whatever it
/// needs onto the shared resources; `destroy` must undo all of that.
pub trait GridModule: Send + Sync + 'static {
    fn description(&self) -> Option<&str> {
        None
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, config: &Value) -> Result<()>;

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()>;
}

/// What a resolver hands back for a module id: an optional description and
/// the two lifecycle capabilities. Bundles assembled by hand may lack one of
/// them, in which case the manager rejects them before calling anything.
#[derive(Clone, Default)]
pub struct Bundle {
    description: Option<String>,
    init: Option<Arc<InitFn>>,
    destroy: Option<Arc<DestroyFn>>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_module<M: GridModule>(module: M) -> Self {
        let module = Arc::new(module);
        let init_module = Arc::clone(&module);
        let destroy_module = Arc::clone(&module);
        Self {
            description: module.description().map(str::to_string),
            init: Some(Arc::new(
                move |kernel: &Kernel, resources: &SharedResources, config: &Value| {
                    init_module.init(kernel, resources, config)
                },
            )),
            destroy: Some(Arc::new(
                move |kernel: &Kernel, resources: &SharedResources| {
                    destroy_module.destroy(kernel, resources)
                },
            )),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Kernel, &SharedResources, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    pub fn with_destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(&Kernel, &SharedResources) -> Result<()> + Send + Sync + 'static,
    {
        self.destroy = Some(Arc::new(destroy));
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Checks the capability contract.
    pub(crate) fn verify(self, id: &str) -> Result<LoadedBundle, ModuleFault> {
        let Some(init) = self.init else {
            return Err(ModuleFault::MissingCapability {
                id: id.to_string(),
                method: "init",
            });
        };
        let Some(destroy) = self.destroy else {
            return Err(ModuleFault::MissingCapability {
                id: id.to_string(),
                method: "destroy",
            });
        };
        Ok(LoadedBundle {
            description: self
                .description
                .unwrap_or_else(|| "no description".to_string()),
            init,
            destroy,
        })
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("description", &self.description)
            .field("init", &self.init.is_some())
            .field("destroy", &self.destroy.is_some())
            .finish()
    }
}

/// A bundle that passed the contract check.
#[derive(Clone)]
pub(crate) struct LoadedBundle {
    pub description: String,
    pub init: Arc<InitFn>,
    pub destroy: Arc<DestroyFn>,
}

/// A resolved bundle and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub bundle: Bundle,
    pub source: String,
}

/// Turns a module id into a bundle.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, id: &str) -> Result<ResolvedModule>;
}

type Factory = Arc<dyn Fn() -> Bundle + Send + Sync>;

/// Resolver backed by a table of factories registered up front.
#[derive(Clone)]
pub struct ModuleCatalog {
    scheme: String,
    factories: IndexMap<String, Factory>,
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new("builtin")
    }
}

impl ModuleCatalog {
    /// `scheme` prefixes the source locator reported for each module.
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            factories: IndexMap::new(),
        }
    }

    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Bundle + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    /// Registers a typed module; a fresh instance is built on every load.
    pub fn register_module<M, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        M: GridModule,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register(id, move || Bundle::from_module(factory()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }
}

impl ModuleResolver for ModuleCatalog {
    fn resolve(&self, id: &str) -> Result<ResolvedModule> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| anyhow!("no module registered under '{id}'"))?;
        Ok(ResolvedModule {
            bundle: factory(),
            source: format!("{}:{id}", self.scheme),
        })
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("scheme", &self.scheme)
            .field("modules", &self.ids())
            .finish()
    }
}

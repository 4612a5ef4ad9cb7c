//! Module lifecycle manager.
//!
//! Loads and unloads named bundles through the kernel's own action surface
//! (`module.load`, `module.unload`, `module.get`). Every call into a
//! bundle's `init` or `destroy` is isolated: errors and panics become
//! `task.failed`/`error` events and a Failed record, never a fault inside
//! the kernel.

mod bundle;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{GridError, GridResult, ModuleFault};
use crate::kernel::{Kernel, Reply};
use crate::message::ActionMessage;
use crate::resources::SharedResources;

pub use bundle::{
    Bundle, DestroyFn, GridModule, InitFn, ModuleCatalog, ModuleResolver, ResolvedModule,
};

use bundle::LoadedBundle;

const LOAD_TASK: &str = "module.loading";
const UNLOAD_TASK: &str = "module.unloading";

/// What happens to the remaining ids of a `module.load` call once one of
/// them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// Stop at the first failure and report the rest as aborted.
    #[default]
    FailFast,
    /// Keep going and report every failure at the end.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Loading,
    Loaded,
    Failed,
    Unloading,
    Unloaded,
}

/// Public view of a module record, as returned by `module.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub description: String,
    pub src: String,
    pub actions: Vec<String>,
    pub state: ModuleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct ModuleRecord {
    descriptor: ModuleDescriptor,
    bundle: Option<LoadedBundle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// Ids that were already loaded or previously failed.
    pub skipped: Vec<ModuleFault>,
    pub failed: Vec<ModuleFault>,
    /// Ids never attempted because an earlier one failed under fail-fast.
    pub aborted: Vec<String>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn failure_message(&self) -> String {
        self.failed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnloadReport {
    pub unloaded: Vec<String>,
    pub faults: Vec<ModuleFault>,
}

struct ManagerShared {
    resolver: Arc<dyn ModuleResolver>,
    resources: SharedResources,
    policy: LoadPolicy,
    records: Mutex<IndexMap<String, ModuleRecord>>,
    initializing: Mutex<Vec<String>>,
}

/// Handle to the lifecycle manager installed on a kernel.
#[derive(Clone)]
pub struct ModuleManager {
    shared: Arc<ManagerShared>,
}

impl ModuleManager {
    /// Registers `module.load`, `module.unload` and `module.get` on
    /// `kernel` and starts attributing created actions to the module whose
    /// `init` is running.
    pub fn install(
        kernel: &Kernel,
        resolver: Arc<dyn ModuleResolver>,
        resources: SharedResources,
        policy: LoadPolicy,
    ) -> GridResult<Self> {
        let manager = Self {
            shared: Arc::new(ManagerShared {
                resolver,
                resources,
                policy,
                records: Mutex::new(IndexMap::new()),
                initializing: Mutex::new(Vec::new()),
            }),
        };

        let observer = manager.clone();
        kernel.on_event("action.created", move |_, params| observer.attribute(params))?;

        let loader = manager.clone();
        kernel.create_action("module.load", move |kernel, message, reply| {
            loader.handle_load(kernel, message, reply)
        })?;
        let unloader = manager.clone();
        kernel.create_action("module.unload", move |kernel, message, reply| {
            unloader.handle_unload(kernel, message, reply)
        })?;
        let query = manager.clone();
        kernel.create_action("module.get", move |_, message, reply| {
            query.handle_get(message, reply)
        })?;

        Ok(manager)
    }

    pub fn policy(&self) -> LoadPolicy {
        self.shared.policy
    }

    pub fn resources(&self) -> &SharedResources {
        &self.shared.resources
    }

    pub fn state(&self, id: &str) -> Option<ModuleState> {
        self.shared
            .records
            .lock()
            .get(id)
            .map(|record| record.descriptor.state)
    }

    pub fn descriptor(&self, id: &str) -> Option<ModuleDescriptor> {
        self.shared
            .records
            .lock()
            .get(id)
            .map(|record| record.descriptor.clone())
    }

    pub fn descriptors(&self) -> IndexMap<String, ModuleDescriptor> {
        self.shared
            .records
            .lock()
            .iter()
            .map(|(id, record)| (id.clone(), record.descriptor.clone()))
            .collect()
    }

    /// Ids in the Loaded state, in load order.
    pub fn loaded_ids(&self) -> Vec<String> {
        self.shared
            .records
            .lock()
            .iter()
            .filter(|(_, record)| record.descriptor.state == ModuleState::Loaded)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Loads `ids` in order. `configs` is handed to every module's `init`.
    pub fn load(&self, kernel: &Kernel, ids: &[String], configs: &Value) -> LoadReport {
        let mut report = LoadReport::default();
        for (index, id) in ids.iter().enumerate() {
            match self.load_one(kernel, id, configs) {
                Ok(()) => report.loaded.push(id.clone()),
                Err(fault @ (ModuleFault::AlreadyLoaded(_) | ModuleFault::PreviouslyFailed(_))) => {
                    report.skipped.push(fault)
                }
                Err(fault) => {
                    report.failed.push(fault);
                    if self.shared.policy == LoadPolicy::FailFast {
                        let rest = ids[index + 1..].to_vec();
                        if !rest.is_empty() {
                            warn!("aborting load of {}", rest.join(", "));
                            kernel.notify(
                                "task.aborted",
                                json!({ "taskId": LOAD_TASK, "modules": rest }),
                            );
                        }
                        report.aborted = rest;
                        break;
                    }
                }
            }
        }
        report
    }

    /// Unloads the given ids, or every Loaded module (most recent first)
    /// when `ids` is `None`.
    pub fn unload(&self, kernel: &Kernel, ids: Option<&[String]>) -> UnloadReport {
        let targets = match ids {
            Some(ids) => ids.to_vec(),
            None => {
                let mut loaded = self.loaded_ids();
                loaded.reverse();
                loaded
            }
        };

        let mut report = UnloadReport::default();
        for id in targets {
            match self.state(&id) {
                Some(ModuleState::Loaded) => {
                    if let Some(fault) = self.unload_one(kernel, &id) {
                        report.faults.push(fault);
                    }
                    report.unloaded.push(id);
                }
                Some(ModuleState::Failed) => {
                    self.shared.records.lock().shift_remove(&id);
                    debug!("cleared failed module record: {id}");
                }
                Some(state) => debug!("ignoring unload of {id} while {state:?}"),
                None => debug!("ignoring unload of unknown module {id}"),
            }
        }
        report
    }

    fn load_one(&self, kernel: &Kernel, id: &str, configs: &Value) -> Result<(), ModuleFault> {
        if let Some(state) = self.state(id) {
            let fault = match state {
                ModuleState::Failed => ModuleFault::PreviouslyFailed(id.to_string()),
                _ => ModuleFault::AlreadyLoaded(id.to_string()),
            };
            warn!("{fault}");
            kernel.notify("error", json!({ "error": fault.to_string() }));
            return Err(fault);
        }

        kernel.notify(
            "task.started",
            json!({
                "taskId": LOAD_TASK,
                "module": id,
                "description": format!("Loading module {id}"),
            }),
        );
        self.shared.records.lock().insert(
            id.to_string(),
            ModuleRecord {
                descriptor: ModuleDescriptor {
                    description: String::new(),
                    src: String::new(),
                    actions: Vec::new(),
                    state: ModuleState::Loading,
                    error: None,
                },
                bundle: None,
            },
        );

        let resolved = match self.shared.resolver.resolve(id) {
            Ok(resolved) => resolved,
            Err(err) => {
                let fault = ModuleFault::Unresolved {
                    id: id.to_string(),
                    reason: format!("{err:#}"),
                };
                return Err(self.fail(kernel, id, fault));
            }
        };
        self.update(id, |record| record.descriptor.src = resolved.source.clone());

        let bundle = match resolved.bundle.verify(id) {
            Ok(bundle) => bundle,
            Err(fault) => return Err(self.fail(kernel, id, fault)),
        };
        self.update(id, |record| {
            record.descriptor.description = bundle.description.clone()
        });

        self.shared.initializing.lock().push(id.to_string());
        let outcome = guarded(|| (bundle.init)(kernel, &self.shared.resources, configs));
        self.shared.initializing.lock().pop();

        if let Err(reason) = outcome {
            let fault = ModuleFault::InitFailed {
                id: id.to_string(),
                reason,
            };
            return Err(self.fail(kernel, id, fault));
        }

        kernel.notify("task.finished", json!({ "taskId": LOAD_TASK, "module": id }));
        let descriptor = self.update(id, |record| {
            record.descriptor.state = ModuleState::Loaded;
            record.bundle = Some(bundle);
            record.descriptor.clone()
        });
        info!("module loaded: {id}");
        if let Some(descriptor) = descriptor {
            kernel.notify("module.loaded", descriptor_event(id, &descriptor));
        }
        Ok(())
    }

    fn unload_one(&self, kernel: &Kernel, id: &str) -> Option<ModuleFault> {
        let bundle = self
            .update(id, |record| {
                record.descriptor.state = ModuleState::Unloading;
                record.bundle.take()
            })
            .flatten();

        let fault = bundle.and_then(|bundle| {
            let outcome = guarded(|| (bundle.destroy)(kernel, &self.shared.resources));
            outcome.err().map(|reason| ModuleFault::DestroyFailed {
                id: id.to_string(),
                reason,
            })
        });
        if let Some(fault) = &fault {
            error!("{fault}");
            kernel.notify(
                "task.failed",
                json!({ "taskId": UNLOAD_TASK, "module": id, "error": fault.to_string() }),
            );
            kernel.notify("error", json!({ "error": fault.to_string() }));
        }

        let record = self.shared.records.lock().shift_remove(id);
        if let Some(mut record) = record {
            let leftovers: Vec<&String> = record
                .descriptor
                .actions
                .iter()
                .filter(|action| kernel.has_action(action))
                .collect();
            if !leftovers.is_empty() {
                warn!("module {id} left actions registered after destroy: {leftovers:?}");
            }
            record.descriptor.state = ModuleState::Unloaded;
            info!("module unloaded: {id}");
            kernel.notify("module.unloaded", descriptor_event(id, &record.descriptor));
        }
        fault
    }

    /// Records a load fault, rolls back anything the module registered and
    /// publishes the failure.
    fn fail(&self, kernel: &Kernel, id: &str, fault: ModuleFault) -> ModuleFault {
        error!("{fault}");
        let created = self
            .update(id, |record| {
                record.descriptor.state = ModuleState::Failed;
                record.descriptor.error = Some(fault.to_string());
                std::mem::take(&mut record.descriptor.actions)
            })
            .unwrap_or_default();
        for action in created {
            kernel.delete_action(&action);
        }
        kernel.notify(
            "task.failed",
            json!({ "taskId": LOAD_TASK, "module": id, "error": fault.to_string() }),
        );
        kernel.notify("error", json!({ "error": fault.to_string() }));
        fault
    }

    fn update<R>(&self, id: &str, updater: impl FnOnce(&mut ModuleRecord) -> R) -> Option<R> {
        let mut records = self.shared.records.lock();
        records.get_mut(id).map(updater)
    }

    fn attribute(&self, params: &Value) {
        let Some(action) = params.get("action").and_then(Value::as_str) else {
            return;
        };
        let Some(id) = self.shared.initializing.lock().last().cloned() else {
            return;
        };
        self.update(&id, |record| record.descriptor.actions.push(action.to_string()));
    }

    fn handle_load(&self, kernel: &Kernel, message: &ActionMessage, reply: Reply) {
        let ids = match module_ids(message) {
            Ok(Some(ids)) => ids,
            Ok(None) => return reply.error(GridError::MissingField("modules").to_string()),
            Err(err) => return reply.error(err.to_string()),
        };
        let configs = message.param("configs").cloned().unwrap_or_else(|| json!({}));
        let report = self.load(kernel, &ids, &configs);
        if report.is_success() {
            reply.done()
        } else {
            reply.error(report.failure_message())
        }
    }

    fn handle_unload(&self, kernel: &Kernel, message: &ActionMessage, reply: Reply) {
        match module_ids(message) {
            Ok(ids) => {
                self.unload(kernel, ids.as_deref());
                reply.done()
            }
            Err(err) => reply.error(err.to_string()),
        }
    }

    fn handle_get(&self, message: &ActionMessage, reply: Reply) {
        let result = match message.str_param("moduleId") {
            Some(id) => self
                .descriptor(id)
                .map(serde_json::to_value)
                .transpose(),
            None => serde_json::to_value(self.descriptors()).map(Some),
        };
        reply.finish(result)
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleManager")
            .field("policy", &self.shared.policy)
            .field("modules", &self.descriptors())
            .finish()
    }
}

fn module_ids(message: &ActionMessage) -> GridResult<Option<Vec<String>>> {
    let Some(value) = message.param("modules") else {
        return Ok(None);
    };
    let items = value
        .as_array()
        .ok_or_else(|| GridError::InvalidArgument("modules must be a list of ids".into()))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| GridError::InvalidArgument(format!("module id must be a string: {item}")))
        })
        .collect::<GridResult<Vec<_>>>()
        .map(Some)
}

fn descriptor_event(id: &str, descriptor: &ModuleDescriptor) -> Value {
    let mut event = serde_json::to_value(descriptor).unwrap_or_else(|_| json!({}));
    if let Value::Object(fields) = &mut event {
        fields.insert("module".into(), json!(id));
    }
    event
}

/// Runs a bundle callback, turning errors and panics into a message.
fn guarded<F>(callback: F) -> Result<(), String>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Outcome;
    use anyhow::anyhow;

    fn catalog() -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new("test");
        catalog.register("a", || {
            Bundle::new()
                .with_description("module a")
                .with_init(|kernel, _, _| {
                    kernel.create_action("a.ping", |_, _, r| r.ok(json!("pong")))?;
                    Ok(())
                })
                .with_destroy(|kernel, _| {
                    kernel.delete_action("a.ping");
                    Ok(())
                })
        });
        catalog.register("b", || {
            Bundle::new()
                .with_init(|kernel, _, _| {
                    kernel.create_action("b.half", |_, _, r| r.done())?;
                    Err(anyhow!("b is broken"))
                })
                .with_destroy(|_, _| Ok(()))
        });
        catalog.register("c", || {
            Bundle::new()
                .with_init(|kernel, resources, config| {
                    resources.insert("c.config", config.clone());
                    kernel.create_action("c.go", |_, _, r| r.done())?;
                    Ok(())
                })
                .with_destroy(|kernel, _| {
                    kernel.delete_action("c.go");
                    Ok(())
                })
        });
        catalog.register("panics", || {
            Bundle::new()
                .with_init(|_, _, _| panic!("init exploded"))
                .with_destroy(|_, _| Ok(()))
        });
        catalog.register("bad-destroy", || {
            Bundle::new()
                .with_init(|_, _, _| Ok(()))
                .with_destroy(|_, _| Err(anyhow!("cannot let go")))
        });
        catalog.register("no-destroy", || Bundle::new().with_init(|_, _, _| Ok(())));
        catalog
    }

    fn setup(policy: LoadPolicy) -> (Kernel, ModuleManager) {
        let kernel = Kernel::new();
        let manager = ModuleManager::install(
            &kernel,
            Arc::new(catalog()),
            SharedResources::new(),
            policy,
        )
        .unwrap();
        (kernel, manager)
    }

    fn events(kernel: &Kernel, names: &[&str]) -> Arc<Mutex<Vec<(String, Value)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in names {
            let sink = Arc::clone(&seen);
            let event = name.to_string();
            kernel
                .on_event(name, move |_, params| {
                    sink.lock().push((event.clone(), params.clone()))
                })
                .unwrap();
        }
        seen
    }

    fn load(kernel: &Kernel, ids: &[&str]) -> Outcome {
        kernel
            .call(ActionMessage::new("module.load").with_param("modules", json!(ids)))
            .unwrap()
    }

    #[test]
    fn load_attributes_created_actions() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        assert!(load(&kernel, &["a"]).is_completed());
        let descriptor = manager.descriptor("a").unwrap();
        assert_eq!(descriptor.actions, vec!["a.ping"]);
        assert_eq!(descriptor.description, "module a");
        assert_eq!(descriptor.src, "test:a");
        assert_eq!(descriptor.state, ModuleState::Loaded);
    }

    #[test]
    fn fail_fast_records_failure_and_aborts_rest() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        let seen = events(&kernel, &["task.failed", "task.aborted", "module.loaded"]);
        let outcome = load(&kernel, &["a", "b", "c"]);

        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(manager.state("a"), Some(ModuleState::Loaded));
        assert_eq!(manager.state("b"), Some(ModuleState::Failed));
        assert_eq!(manager.state("c"), None);
        assert!(!kernel.has_action("b.half"));

        let names: Vec<String> = seen.lock().iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, vec!["module.loaded", "task.failed", "task.aborted"]);
        assert_eq!(seen.lock()[2].1["modules"], json!(["c"]));
    }

    #[test]
    fn continue_policy_loads_past_failures() {
        let (kernel, manager) = setup(LoadPolicy::Continue);
        let outcome = load(&kernel, &["b", "c"]);
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(manager.state("b"), Some(ModuleState::Failed));
        assert_eq!(manager.state("c"), Some(ModuleState::Loaded));
    }

    #[test]
    fn duplicate_load_is_reported_and_skipped() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        let errors = events(&kernel, &["error"]);
        load(&kernel, &["a"]);
        let report = manager.load(&kernel, &["a".into(), "c".into()], &json!({}));
        assert_eq!(report.skipped, vec![ModuleFault::AlreadyLoaded("a".into())]);
        assert_eq!(report.loaded, vec!["c"]);
        assert!(report.is_success());
        assert_eq!(errors.lock().len(), 1);
    }

    #[test]
    fn panicking_init_is_isolated() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        let outcome = load(&kernel, &["panics"]);
        match outcome {
            Outcome::Failed(failure) => {
                assert!(failure.to_string().contains("init exploded"), "{failure}")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(manager.state("panics"), Some(ModuleState::Failed));
        assert!(load(&kernel, &["a"]).is_completed());
    }

    #[test]
    fn contract_and_resolution_failures() {
        let (kernel, manager) = setup(LoadPolicy::Continue);
        load(&kernel, &["no-destroy", "ghost"]);
        let missing = manager.descriptor("no-destroy").unwrap();
        assert_eq!(missing.state, ModuleState::Failed);
        assert!(missing.error.unwrap().contains("no-destroy.destroy"));
        assert_eq!(manager.state("ghost"), Some(ModuleState::Failed));
    }

    #[test]
    fn failed_module_is_terminal_until_cleared() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        load(&kernel, &["b"]);
        let report = manager.load(&kernel, &["b".into()], &json!({}));
        assert_eq!(report.skipped, vec![ModuleFault::PreviouslyFailed("b".into())]);

        manager.unload(&kernel, Some(&["b".to_string()]));
        assert_eq!(manager.state("b"), None);
    }

    #[test]
    fn unload_all_only_destroys_loaded_modules() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        load(&kernel, &["a", "b"]);
        let unloaded = events(&kernel, &["module.unloaded"]);

        let outcome = kernel.call(ActionMessage::new("module.unload")).unwrap();
        assert!(outcome.is_completed());
        assert!(!kernel.has_action("a.ping"));
        assert_eq!(manager.state("a"), None);
        assert_eq!(manager.state("b"), Some(ModuleState::Failed));
        let seen = unloaded.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1["module"], json!("a"));
        assert_eq!(seen[0].1["state"], json!("unloaded"));
    }

    #[test]
    fn unload_unknown_id_is_ignored() {
        let (kernel, _) = setup(LoadPolicy::FailFast);
        let outcome = kernel
            .call(ActionMessage::new("module.unload").with_param("modules", json!(["nope"])))
            .unwrap();
        assert!(outcome.is_completed());
    }

    #[test]
    fn destroy_fault_still_removes_record() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        load(&kernel, &["bad-destroy"]);
        let failed = events(&kernel, &["task.failed"]);
        let report = manager.unload(&kernel, None);
        assert_eq!(report.unloaded, vec!["bad-destroy"]);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(manager.state("bad-destroy"), None);
        assert_eq!(failed.lock().len(), 1);
    }

    #[test]
    fn configs_reach_init() {
        let (kernel, manager) = setup(LoadPolicy::FailFast);
        kernel
            .call(
                ActionMessage::new("module.load")
                    .with_param("modules", json!(["c"]))
                    .with_param("configs", json!({ "canvasId": "theCanvas" })),
            )
            .unwrap();
        let config = manager.resources().get::<Value>("c.config").unwrap();
        assert_eq!(*config, json!({ "canvasId": "theCanvas" }));
    }

    #[test]
    fn module_get_reports_one_or_all() {
        let (kernel, _) = setup(LoadPolicy::FailFast);
        load(&kernel, &["a", "b"]);

        let all = kernel.call(ActionMessage::new("module.get")).unwrap();
        let all = all.data().unwrap();
        assert_eq!(all["a"]["state"], json!("loaded"));
        assert_eq!(all["b"]["state"], json!("failed"));
        assert_eq!(all["a"]["actions"], json!(["a.ping"]));

        let one = kernel
            .call(ActionMessage::new("module.get").with_param("moduleId", "a"))
            .unwrap();
        assert_eq!(one.data().unwrap()["src"], json!("test:a"));

        let none = kernel
            .call(ActionMessage::new("module.get").with_param("moduleId", "zzz"))
            .unwrap();
        assert_eq!(none, Outcome::Completed(None));
    }

    #[test]
    fn missing_modules_param_is_an_error() {
        let (kernel, _) = setup(LoadPolicy::FailFast);
        let outcome = kernel.call(ActionMessage::new("module.load")).unwrap();
        assert_eq!(
            outcome,
            Outcome::Failed(crate::error::ActionFailure::Handler(json!(
                "param expected: modules"
            )))
        );
    }

    #[test]
    fn nested_load_attributes_to_inner_module() {
        let mut catalog = catalog();
        catalog.register("outer", || {
            Bundle::new()
                .with_init(|kernel, _, _| {
                    kernel.create_action("outer.first", |_, _, r| r.done())?;
                    kernel.dispatch(
                        ActionMessage::new("module.load").with_param("modules", json!(["a"])),
                    )?;
                    kernel.create_action("outer.second", |_, _, r| r.done())?;
                    Ok(())
                })
                .with_destroy(|_, _| Ok(()))
        });
        let kernel = Kernel::new();
        let manager = ModuleManager::install(
            &kernel,
            Arc::new(catalog),
            SharedResources::new(),
            LoadPolicy::FailFast,
        )
        .unwrap();
        load(&kernel, &["outer"]);
        assert_eq!(
            manager.descriptor("outer").unwrap().actions,
            vec!["outer.first", "outer.second"]
        );
        assert_eq!(manager.descriptor("a").unwrap().actions, vec!["a.ping"]);
    }
}

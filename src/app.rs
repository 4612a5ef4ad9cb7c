use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::content::{self, SCENE_KEY};
use crate::error::GridError;
use crate::kernel::{Kernel, Outcome};
use crate::message::ActionMessage;
use crate::modules::{LoadPolicy, ModuleManager, ModuleResolver};
use crate::resources::SharedResources;
use crate::scene::SceneGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    pub load_policy: LoadPolicy,
}

/// A kernel with the lifecycle manager installed, ready to take messages.
#[derive(Debug, Clone)]
pub struct Runtime {
    kernel: Kernel,
    manager: ModuleManager,
    config: RuntimeConfig,
}

impl Runtime {
    /// Runtime resolving module ids against the built-in content catalog.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::with_resolver(config, Arc::new(content::catalog()))
    }

    pub fn with_resolver(config: RuntimeConfig, resolver: Arc<dyn ModuleResolver>) -> Result<Self> {
        let kernel = Kernel::new();
        let manager = ModuleManager::install(
            &kernel,
            resolver,
            SharedResources::new(),
            config.load_policy,
        )
        .context("failed to install the module manager")?;
        Ok(Self {
            kernel,
            manager,
            config,
        })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }

    pub fn resources(&self) -> &SharedResources {
        self.manager.resources()
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// The scene graph, once `scenes/scene` is loaded.
    pub fn scene(&self) -> Option<Arc<SceneGraph>> {
        self.resources().get::<SceneGraph>(SCENE_KEY)
    }

    pub fn send(&self, message: ActionMessage) -> Result<Outcome, GridError> {
        self.kernel.call(message)
    }

    /// Sends a message given as JSON and describes the outcome as JSON.
    pub fn send_value(&self, value: Value) -> Value {
        match ActionMessage::from_value(value) {
            Ok(message) => outcome_json(&self.send(message)),
            Err(err) => json!({ "ok": false, "error": format!("malformed message: {err}") }),
        }
    }

    /// Sends each message in order. Stops after the first failing step
    /// unless `keep_going` is set.
    pub fn run_script(&self, script: Vec<ActionMessage>, keep_going: bool) -> ScriptReport {
        let mut report = ScriptReport::default();
        for (index, message) in script.into_iter().enumerate() {
            let action = message.action_id().map(str::to_string);
            let outcome = self.send(message);
            let failed = !matches!(outcome, Ok(Outcome::Completed(_)));
            report.steps.push(ScriptStep {
                index,
                action,
                outcome,
            });
            if failed && !keep_going {
                info!("script stopped at step {index}");
                break;
            }
        }
        report
    }
}

/// Parses a script: a JSON array of action messages.
pub fn parse_script(text: &str) -> Result<Vec<ActionMessage>> {
    serde_json::from_str(text).context("script must be a JSON array of action messages")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub index: usize,
    pub action: Option<String>,
    pub outcome: Result<Outcome, GridError>,
}

impl ScriptStep {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Ok(Outcome::Completed(_)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptReport {
    pub steps: Vec<ScriptStep>,
}

impl ScriptReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|step| !step.is_success()).count()
    }
}

/// JSON view of a send result: `{ok, data}`, `{ok: false, error}` or
/// `{ok: false, pending: true}`.
pub fn outcome_json(outcome: &Result<Outcome, GridError>) -> Value {
    match outcome {
        Ok(Outcome::Completed(Some(data))) => json!({ "ok": true, "data": data }),
        Ok(Outcome::Completed(None)) => json!({ "ok": true }),
        Ok(Outcome::Failed(failure)) => json!({ "ok": false, "error": failure.to_value() }),
        Ok(Outcome::Pending) => json!({ "ok": false, "pending": true }),
        Err(err) => json!({ "ok": false, "error": err.to_string() }),
    }
}

pub fn write_step(out: &mut impl Write, step: &ScriptStep) -> io::Result<()> {
    let action = step.action.as_deref().unwrap_or("(none)");
    match &step.outcome {
        Ok(Outcome::Completed(Some(data))) => {
            writeln!(out, "[{}] {action} -> ok {data}", step.index)
        }
        Ok(Outcome::Completed(None)) => writeln!(out, "[{}] {action} -> ok", step.index),
        Ok(Outcome::Failed(failure)) => {
            writeln!(out, "[{}] {action} -> failed: {failure}", step.index)
        }
        Ok(Outcome::Pending) => writeln!(out, "[{}] {action} -> pending", step.index),
        Err(err) => writeln!(out, "[{}] {action} -> rejected: {err}", step.index),
    }
}

/// Writes the loaded modules and the scene nodes as they stand.
pub fn write_final_state(out: &mut impl Write, runtime: &Runtime) -> io::Result<()> {
    writeln!(out, "Loaded modules:")?;
    for (id, descriptor) in runtime.manager().descriptors() {
        write!(out, " - {id} [{:?}] {}", descriptor.state, descriptor.description)?;
        if !descriptor.actions.is_empty() {
            write!(out, " actions={}", descriptor.actions.join(","))?;
        }
        writeln!(out)?;
    }

    let Some(scene) = runtime.scene() else {
        return writeln!(out, "No scene loaded");
    };
    writeln!(out, "Final scene nodes:")?;
    for node in scene.all_nodes() {
        writeln!(
            out,
            " - {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2}){}",
            node.id,
            node.position.x,
            node.position.y,
            node.position.z,
            node.rotation.x,
            node.rotation.y,
            node.rotation.z,
            if scene.is_visible(&node.id) { "" } else { " hidden" }
        )?;
    }
    Ok(())
}

pub fn print_final_state(runtime: &Runtime) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = write_final_state(&mut out, runtime) {
        log::error!("failed to print final state: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{SCENE, TANK};
    use crate::modules::ModuleState;

    fn load(ids: &[&str]) -> ActionMessage {
        ActionMessage::new("module.load").with_param("modules", json!(ids))
    }

    #[test]
    fn script_runs_in_order() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let script = parse_script(
            r#"[
                { "action": "module.load", "modules": ["scenes/scene", "objects/vehicles/tank/tank"] },
                { "action": "tank.create", "pos": { "x": 3 } },
                { "action": "scene.tick", "count": 2 }
            ]"#,
        )
        .unwrap();
        let report = runtime.run_script(script, false);
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.failures(), 0);
        assert_eq!(runtime.manager().state(TANK), Some(ModuleState::Loaded));
        assert_eq!(
            report.steps[1].outcome,
            Ok(Outcome::Completed(Some(json!({ "tankId": "tank0" }))))
        );
    }

    #[test]
    fn script_stops_at_first_failure_unless_told_otherwise() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let script = vec![
            ActionMessage::new("tank.fly"),
            load(&[SCENE]),
        ];
        let report = runtime.run_script(script.clone(), false);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(
            report.steps[0].outcome,
            Err(GridError::ActionNotFound("tank.fly".into()))
        );

        let report = runtime.run_script(script, true);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn send_value_describes_outcomes() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        assert_eq!(
            runtime.send_value(json!({ "action": "module.get", "moduleId": "nothing" })),
            json!({ "ok": true })
        );
        assert_eq!(
            runtime.send_value(json!({ "action": "nope" })),
            json!({ "ok": false, "error": "action not supported: 'nope'" })
        );
        assert_eq!(runtime.send_value(json!([1, 2]))["ok"], json!(false));
    }

    #[test]
    fn final_state_lists_modules_and_nodes() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        runtime.send(load(&[SCENE])).unwrap();
        runtime
            .send(ActionMessage::new("module.load").with_param("modules", json!(["bogus"])))
            .unwrap();
        let mut out = Vec::new();
        write_final_state(&mut out, &runtime).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(" - scenes/scene [Loaded]"), "{text}");
        assert!(text.contains(" - bogus [Failed]"), "{text}");
        assert!(text.contains(" - content pos=(0.00, 0.00, 0.00)"), "{text}");
    }

    #[test]
    fn config_reads_policy() {
        let config: RuntimeConfig = serde_json::from_value(json!({ "loadPolicy": "continue" })).unwrap();
        assert_eq!(config.load_policy, LoadPolicy::Continue);
        let config: RuntimeConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.load_policy, LoadPolicy::FailFast);
    }
}

#![cfg(target_arch = "wasm32")]

use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::app::{Runtime, RuntimeConfig};

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
}

/// Browser handle on a runtime. Messages and results cross the boundary
/// as JSON strings.
#[wasm_bindgen]
pub struct WasmGrid {
    runtime: Runtime,
}

#[wasm_bindgen]
impl WasmGrid {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmGrid, JsValue> {
        let config = match config_json {
            Some(text) => serde_json::from_str::<RuntimeConfig>(&text)
                .map_err(|err| JsValue::from_str(&format!("invalid config: {err}")))?,
            None => RuntimeConfig::default(),
        };
        let runtime = Runtime::new(config)
            .map_err(|err| JsValue::from_str(&format!("failed to start runtime: {err:#}")))?;
        log_to_console(&format!(
            "grid ready with {} actions",
            runtime.kernel().action_ids().len()
        ));
        Ok(WasmGrid { runtime })
    }

    /// Sends one message and returns the outcome as JSON.
    pub fn send(&self, message_json: &str) -> String {
        let result = match serde_json::from_str::<Value>(message_json) {
            Ok(value) => self.runtime.send_value(value),
            Err(err) => serde_json::json!({ "ok": false, "error": format!("invalid JSON: {err}") }),
        };
        if result["ok"] == Value::Bool(false) {
            log_to_console(&format!("send failed: {}", result));
        }
        result.to_string()
    }

    /// Ids of every registered action, as a JSON array.
    pub fn actions(&self) -> String {
        Value::from(self.runtime.kernel().action_ids()).to_string()
    }
}

fn log_to_console(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

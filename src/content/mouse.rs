use anyhow::Result;
use glam::Vec2;
use serde_json::{json, Value};

use crate::error::GridError;
use crate::input::{MouseButton, PointerEventKind, PointerState};
use crate::kernel::Kernel;
use crate::modules::GridModule;
use crate::resources::SharedResources;

use super::POINTER_KEY;

/// Canvas mouse events. Without a DOM to listen on, events arrive through
/// the `mouse.inject` action.
#[derive(Debug, Default)]
pub struct MouseModule;

impl GridModule for MouseModule {
    fn description(&self) -> Option<&str> {
        Some("Canvas mouse events")
    }

    fn init(&self, kernel: &Kernel, resources: &SharedResources, _config: &Value) -> Result<()> {
        for kind in PointerEventKind::ALL {
            kernel.create_event(kind.event_name())?;
        }
        resources.insert(POINTER_KEY, PointerState::new());

        let shared = resources.clone();
        kernel.create_action("mouse.inject", move |kernel, message, reply| {
            let Some(name) = message.str_param("type") else {
                return reply.error(GridError::MissingField("type").to_string());
            };
            let Some(kind) = PointerEventKind::from_name(name) else {
                return reply.error(
                    GridError::InvalidArgument(format!("unknown mouse event type: {name}"))
                        .to_string(),
                );
            };
            let Some(pointer) = shared.get::<PointerState>(POINTER_KEY) else {
                return reply.error("pointer state is gone");
            };

            let button = message
                .str_param("button")
                .and_then(MouseButton::from_name)
                .unwrap_or(MouseButton::LEFT);
            let position = Vec2::new(
                message.f64_param("canvasX").unwrap_or(0.0) as f32,
                message.f64_param("canvasY").unwrap_or(0.0) as f32,
            );
            let params = match kind {
                PointerEventKind::Down => {
                    pointer.set_button_down(button);
                    pointer.set_position(position);
                    json!({ "canvasX": position.x, "canvasY": position.y })
                }
                PointerEventKind::Move => {
                    pointer.set_position(position);
                    json!({ "canvasX": position.x, "canvasY": position.y })
                }
                PointerEventKind::Up => {
                    pointer.set_button_up(button);
                    json!({})
                }
                PointerEventKind::Wheel => {
                    let delta = message.f64_param("delta").unwrap_or(0.0);
                    pointer.scroll(delta as f32);
                    json!({ "delta": delta })
                }
            };
            reply.finish(kernel.fire_event(kind.event_name(), Some(params)).map(|()| None))
        })?;
        Ok(())
    }

    fn destroy(&self, kernel: &Kernel, resources: &SharedResources) -> Result<()> {
        kernel.delete_action("mouse.inject");
        for kind in PointerEventKind::ALL {
            kernel.delete_event(kind.event_name());
        }
        resources.remove(POINTER_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{harness, MOUSE};
    use super::*;
    use crate::message::ActionMessage;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn inject(kernel: &Kernel, params: Value) {
        let mut message = ActionMessage::new("mouse.inject");
        if let Value::Object(fields) = params {
            message.params = fields;
        }
        assert!(kernel.call(message).unwrap().is_completed());
    }

    #[test]
    fn injected_events_update_pointer_and_fire() {
        let (kernel, manager) = harness(&[MOUSE]);
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&moves);
        kernel
            .on_event("mouse.move", move |_, params| sink.lock().push(params.clone()))
            .unwrap();

        inject(&kernel, json!({ "type": "down", "canvasX": 4, "canvasY": 8 }));
        inject(&kernel, json!({ "type": "move", "canvasX": 5, "canvasY": 9 }));
        inject(&kernel, json!({ "type": "wheel", "delta": 2 }));

        let pointer = manager.resources().get::<PointerState>(POINTER_KEY).unwrap();
        assert!(pointer.is_button_down(MouseButton::LEFT));
        assert_eq!(pointer.position(), Vec2::new(5.0, 9.0));
        assert_eq!(pointer.wheel(), 2.0);
        assert_eq!(moves.lock().as_slice(), [json!({ "canvasX": 5.0, "canvasY": 9.0 })]);

        inject(&kernel, json!({ "type": "up" }));
        assert!(!pointer.is_button_down(MouseButton::LEFT));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let (kernel, _) = harness(&[MOUSE]);
        let outcome = kernel
            .call(ActionMessage::new("mouse.inject").with_param("type", "click"))
            .unwrap();
        assert!(!outcome.is_completed());
    }

    #[test]
    fn unload_removes_events() {
        let (kernel, manager) = harness(&[MOUSE]);
        manager.unload(&kernel, None);
        assert!(!kernel.has_event("mouse.down"));
        assert!(!manager.resources().contains(POINTER_KEY));
    }
}

use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const MIDDLE: Self = Self(1);
    pub const RIGHT: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Parses names such as `left`, `Mouse3` or a bare index.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" => return Some(Self::LEFT),
            "middle" => return Some(Self::MIDDLE),
            "right" => return Some(Self::RIGHT),
            _ => {}
        }
        if let Ok(index) = name.parse::<u8>() {
            return Some(Self(index));
        }
        let prefix = name.get(..5)?;
        if !prefix.eq_ignore_ascii_case("mouse") {
            return None;
        }
        let suffix = &name[5..];
        if suffix.is_empty() {
            return Some(Self::LEFT);
        }
        let index = suffix.parse::<u8>().ok()?;
        Some(Self(index.saturating_sub(1)))
    }
}

/// Kind of pointer event, named after the event it is published as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Wheel,
}

impl PointerEventKind {
    pub const ALL: [PointerEventKind; 4] = [Self::Down, Self::Move, Self::Up, Self::Wheel];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "down" | "mousedown" | "mouse.down" => Some(Self::Down),
            "move" | "mousemove" | "mouse.move" => Some(Self::Move),
            "up" | "mouseup" | "mouse.up" => Some(Self::Up),
            "wheel" | "mousewheel" | "mouse.wheel" => Some(Self::Wheel),
            _ => None,
        }
    }

    pub fn event_name(self) -> &'static str {
        match self {
            Self::Down => "mouse.down",
            Self::Move => "mouse.move",
            Self::Up => "mouse.up",
            Self::Wheel => "mouse.wheel",
        }
    }
}

/// Thread-safe pointer snapshot shared with the content modules.
#[derive(Debug, Default)]
pub struct PointerState {
    buttons: RwLock<HashSet<MouseButton>>,
    position: RwLock<Vec2>,
    wheel: RwLock<f32>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button_down(&self, button: MouseButton) {
        self.buttons.write().insert(button);
    }

    pub fn set_button_up(&self, button: MouseButton) {
        self.buttons.write().remove(&button);
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.read().contains(&button)
    }

    pub fn set_position(&self, position: Vec2) {
        *self.position.write() = position;
    }

    pub fn position(&self) -> Vec2 {
        *self.position.read()
    }

    /// Adds a wheel delta and returns the accumulated total.
    pub fn scroll(&self, delta: f32) -> f32 {
        let mut wheel = self.wheel.write();
        *wheel += delta;
        *wheel
    }

    pub fn wheel(&self) -> f32 {
        *self.wheel.read()
    }

    pub fn reset(&self) {
        self.buttons.write().clear();
        *self.position.write() = Vec2::ZERO;
        *self.wheel.write() = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_names_are_supported() {
        assert_eq!(MouseButton::from_name("Mouse1"), Some(MouseButton::LEFT));
        assert_eq!(MouseButton::from_name("mouse3"), Some(MouseButton::RIGHT));
        assert_eq!(MouseButton::from_name("middle"), Some(MouseButton::MIDDLE));
        assert_eq!(MouseButton::from_name("4").map(MouseButton::index), Some(4));
        assert_eq!(MouseButton::from_name("key"), None);
    }

    #[test]
    fn pointer_state_tracks_buttons_and_wheel() {
        let state = PointerState::new();
        state.set_button_down(MouseButton::LEFT);
        assert!(state.is_button_down(MouseButton::LEFT));
        state.set_button_up(MouseButton::LEFT);
        assert!(!state.is_button_down(MouseButton::LEFT));

        state.set_position(Vec2::new(10.0, 20.0));
        assert_eq!(state.scroll(3.0), 3.0);
        assert_eq!(state.scroll(-1.0), 2.0);

        state.reset();
        assert_eq!(state.position(), Vec2::ZERO);
        assert_eq!(state.wheel(), 0.0);
    }

    #[test]
    fn event_kinds_map_to_event_names() {
        assert_eq!(
            PointerEventKind::from_name("mousedown").map(PointerEventKind::event_name),
            Some("mouse.down")
        );
        assert_eq!(PointerEventKind::from_name("click"), None);
    }
}

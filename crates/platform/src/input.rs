//! Input handling for keyboard and mouse.
//!
//! Every key and mouse button moves through three states:
//! `Released -> Pressed -> Held`. The first down event marks a key
//! `Pressed`; further down events (OS auto-repeat) and the "hit" and
//! "held" polls promote it to `Held`; the up event resets it. This makes
//! `key_hit` report a fresh press exactly once, no matter how long the
//! key stays down.

use std::collections::HashMap;

pub use winit::keyboard::KeyCode;

/// Per-key press state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyState {
    /// Not currently down.
    #[default]
    Released,
    /// Down, and the press has not been observed by a `hit` poll yet.
    Pressed,
    /// Down, press already observed or repeated.
    Held,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Left,
        }
    }
}

/// Tracks the current state of keyboard and mouse input.
///
/// One instance is owned by the application shell and mutated at the
/// event-dispatch boundary; consumers poll it, they never install
/// callbacks.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashMap<KeyCode, KeyState>,
    buttons: HashMap<MouseButton, KeyState>,
    mouse_position: (f32, f32),
}

impl InputState {
    /// Create a new input state with everything released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a key-down event (including auto-repeats).
    pub fn on_key_down(&mut self, key: KeyCode) {
        let state = self.keys.entry(key).or_default();
        *state = match state {
            KeyState::Released => KeyState::Pressed,
            _ => KeyState::Held,
        };
    }

    /// Handle a key-up event.
    pub fn on_key_up(&mut self, key: KeyCode) {
        self.keys.insert(key, KeyState::Released);
    }

    /// Handle a mouse-button-down event.
    pub fn on_button_down(&mut self, button: MouseButton) {
        let state = self.buttons.entry(button).or_default();
        *state = match state {
            KeyState::Released => KeyState::Pressed,
            _ => KeyState::Held,
        };
    }

    /// Handle a mouse-button-up event.
    pub fn on_button_up(&mut self, button: MouseButton) {
        self.buttons.insert(button, KeyState::Released);
    }

    /// Handle mouse movement.
    pub fn on_mouse_moved(&mut self, x: f32, y: f32) {
        self.mouse_position = (x, y);
    }

    /// Returns true when the key was first pressed down, exactly once per
    /// press. Observing the press promotes the key to `Held`.
    pub fn key_hit(&mut self, key: KeyCode) -> bool {
        hit(self.keys.entry(key).or_default())
    }

    /// Returns true as long as the key is down, promoting it to `Held`.
    pub fn key_held(&mut self, key: KeyCode) -> bool {
        held(self.keys.entry(key).or_default())
    }

    /// Returns true when the mouse button was first pressed down, exactly
    /// once per press.
    pub fn button_hit(&mut self, button: MouseButton) -> bool {
        hit(self.buttons.entry(button).or_default())
    }

    /// Returns true as long as the mouse button is down.
    pub fn button_held(&mut self, button: MouseButton) -> bool {
        held(self.buttons.entry(button).or_default())
    }

    /// Get the current mouse position in window coordinates.
    pub fn mouse_position(&self) -> (f32, f32) {
        self.mouse_position
    }
}

fn hit(state: &mut KeyState) -> bool {
    if *state == KeyState::Pressed {
        *state = KeyState::Held;
        true
    } else {
        false
    }
}

fn held(state: &mut KeyState) -> bool {
    if *state == KeyState::Released {
        false
    } else {
        *state = KeyState::Held;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_reports_press_exactly_once() {
        let mut input = InputState::new();
        input.on_key_down(KeyCode::Space);

        assert!(input.key_hit(KeyCode::Space));
        assert!(!input.key_hit(KeyCode::Space));
        assert!(input.key_held(KeyCode::Space));

        input.on_key_up(KeyCode::Space);
        assert!(!input.key_hit(KeyCode::Space));
        assert!(!input.key_held(KeyCode::Space));
    }

    #[test]
    fn test_auto_repeat_promotes_to_held() {
        let mut input = InputState::new();
        input.on_key_down(KeyCode::KeyW);
        input.on_key_down(KeyCode::KeyW);

        // The repeat consumed the fresh press before any poll saw it.
        assert!(!input.key_hit(KeyCode::KeyW));
        assert!(input.key_held(KeyCode::KeyW));
    }

    #[test]
    fn test_held_poll_consumes_fresh_press() {
        let mut input = InputState::new();
        input.on_key_down(KeyCode::Enter);

        assert!(input.key_held(KeyCode::Enter));
        assert!(!input.key_hit(KeyCode::Enter));
    }

    #[test]
    fn test_release_and_repress() {
        let mut input = InputState::new();
        input.on_key_down(KeyCode::Escape);
        assert!(input.key_hit(KeyCode::Escape));

        input.on_key_up(KeyCode::Escape);
        input.on_key_down(KeyCode::Escape);
        assert!(input.key_hit(KeyCode::Escape));
    }

    #[test]
    fn test_unseen_key_is_released() {
        let mut input = InputState::new();
        assert!(!input.key_hit(KeyCode::KeyQ));
        assert!(!input.key_held(KeyCode::KeyQ));
    }

    #[test]
    fn test_mouse_buttons_share_the_state_machine() {
        let mut input = InputState::new();
        input.on_button_down(MouseButton::Left);

        assert!(input.button_hit(MouseButton::Left));
        assert!(!input.button_hit(MouseButton::Left));
        assert!(input.button_held(MouseButton::Left));

        input.on_button_up(MouseButton::Left);
        assert!(!input.button_held(MouseButton::Left));
    }

    #[test]
    fn test_mouse_position_tracked() {
        let mut input = InputState::new();
        assert_eq!(input.mouse_position(), (0.0, 0.0));

        input.on_mouse_moved(640.0, 360.0);
        assert_eq!(input.mouse_position(), (640.0, 360.0));
    }
}

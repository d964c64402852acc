// Input translation for keyboard and mouse
// Turns winit events into the generic pointer stream the camera consumes,
// plus key presses the viewer maps to actions.

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::viewer::ViewerAction;

/// Pixels of a precise (touchpad) scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    /// Positive = away from the user = zoom in.
    Wheel { lines: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    KeyPressed(KeyCode),
}

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: (f32, f32),
    primary_down: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            mouse_position: (0.0, 0.0),
            primary_down: false,
        }
    }

    /// Feed a winit WindowEvent. Returns the translated event, if any.
    /// Key repeats are swallowed so a held key fires its shortcut once.
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                match event.state {
                    ElementState::Pressed => {
                        let fresh = self.keys_held.insert(key);
                        (fresh && !event.repeat).then_some(InputEvent::KeyPressed(key))
                    }
                    ElementState::Released => {
                        self.keys_held.remove(&key);
                        None
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
                let (x, y) = self.mouse_position;
                Some(InputEvent::Pointer(PointerEvent::Move { x, y }))
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                let (x, y) = self.mouse_position;
                match state {
                    ElementState::Pressed => {
                        self.primary_down = true;
                        Some(InputEvent::Pointer(PointerEvent::Down { x, y }))
                    }
                    ElementState::Released => {
                        let was_down = std::mem::replace(&mut self.primary_down, false);
                        was_down.then_some(InputEvent::Pointer(PointerEvent::Up))
                    }
                }
            }
            WindowEvent::CursorLeft { .. } => {
                let was_down = std::mem::replace(&mut self.primary_down, false);
                was_down.then_some(InputEvent::Pointer(PointerEvent::Up))
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = wheel_lines(*delta);
                (lines != 0.0).then_some(InputEvent::Pointer(PointerEvent::Wheel { lines }))
            }
            WindowEvent::Focused(false) => {
                self.keys_held.clear();
                None
            }
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.primary_down
    }
}

/// Vertical wheel motion in lines.
pub fn wheel_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
    }
}

/// Keyboard shortcuts for the panel buttons.
pub fn shortcut(key: KeyCode) -> Option<ViewerAction> {
    match key {
        KeyCode::Space | KeyCode::KeyM => Some(ViewerAction::ToggleMorph),
        KeyCode::KeyR => Some(ViewerAction::ResetView),
        KeyCode::KeyA => Some(ViewerAction::ToggleAutoRotate),
        KeyCode::Equal | KeyCode::NumpadAdd => Some(ViewerAction::ZoomIn),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(ViewerAction::ZoomOut),
        KeyCode::Escape => Some(ViewerAction::Deselect),
        KeyCode::BracketRight => Some(ViewerAction::SelectNext),
        KeyCode::BracketLeft => Some(ViewerAction::SelectPrevious),
        _ => None,
    }
}

/// Input events dispatched to scene controllers.
///
/// The engine does not own a window. The application pumps its event loop
/// and hands `InputEvent`s to `Scene::frame` or `Scene::process_event`;
/// `InputEvent::from_window_event` converts winit window events.

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A user or window event, as seen by controllers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown {
        key: KeyCode,
        /// Auto-repeat of a held key
        repeat: bool,
    },
    KeyUp {
        key: KeyCode,
    },
    /// Cursor position in physical pixels, origin top-left
    PointerMoved {
        x: f64,
        y: f64,
    },
    MouseButtonDown {
        button: MouseButton,
    },
    MouseButtonUp {
        button: MouseButton,
    },
    /// Scroll amount, in lines when the platform reports lines, pixels otherwise
    MouseWheel {
        delta_x: f32,
        delta_y: f32,
    },
    Resized {
        width: u32,
        height: u32,
    },
    /// The user asked to close the window
    Quit,
}

impl InputEvent {
    /// Convert a winit window event
    ///
    /// Returns None for events controllers have no use for (focus, redraw,
    /// keys without a physical key code, ...).
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let PhysicalKey::Code(key) = key_event.physical_key else {
                    return None;
                };
                Some(match key_event.state {
                    ElementState::Pressed => InputEvent::KeyDown { key, repeat: key_event.repeat },
                    ElementState::Released => InputEvent::KeyUp { key },
                })
            }
            WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::MouseInput { state, button, .. } => Some(match state {
                ElementState::Pressed => InputEvent::MouseButtonDown { button: *button },
                ElementState::Released => InputEvent::MouseButtonUp { button: *button },
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let (delta_x, delta_y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                    MouseScrollDelta::PixelDelta(position) => (position.x as f32, position.y as f32),
                };
                Some(InputEvent::MouseWheel { delta_x, delta_y })
            }
            WindowEvent::Resized(size) => Some(InputEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CloseRequested => Some(InputEvent::Quit),
            _ => None,
        }
    }

    /// True for a press (first or repeated) of `key`
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        matches!(self, InputEvent::KeyDown { key: pressed, .. } if *pressed == key)
    }

    /// True for a first press of `key` (auto-repeat excluded)
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        matches!(self, InputEvent::KeyDown { key: pressed, repeat: false } if *pressed == key)
    }
}

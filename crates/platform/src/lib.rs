//! Platform abstraction layer for the triangle sample.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Input handling (keyboard, mouse)
//! - Raw window handles for Vulkan surface creation

mod input;
mod window;

pub use input::{InputState, KeyCode, KeyState, MouseButton};
pub use window::{Surface, Window};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::EventLoop;

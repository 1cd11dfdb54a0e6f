//! First Triangle - Main Entry Point
//!
//! Opens a fixed-size window and renders one static triangle per frame.
//! Pass `-warp` (or `/warp`) to select the software rasterizer.

use anyhow::Result;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowId;

use triangle_core::{LaunchOptions, Timer};
use triangle_platform::{InputState, KeyCode, Window};
use triangle_renderer::Renderer;
use triangle_rhi::adapter::AdapterCriteria;

mod hello;

use hello::HelloTriangle;

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;
const WINDOW_TITLE: &str = "My First Triangle";

struct App {
    options: LaunchOptions,
    window: Option<Window>,
    renderer: Option<Renderer>,
    input: InputState,
    timer: Timer,
    occluded: bool,
}

impl App {
    fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            window: None,
            renderer: None,
            input: InputState::new(),
            timer: Timer::new(),
            occluded: false,
        }
    }

    /// Stops or restarts frame production with window visibility, keeping
    /// idle time out of the frame timer.
    fn set_occluded(&mut self, event_loop: &ActiveEventLoop, occluded: bool) {
        if self.occluded == occluded {
            return;
        }
        self.occluded = occluded;

        if let Some(ref mut renderer) = self.renderer
            && let Err(e) = renderer.set_idle(occluded)
        {
            error!("Failed to switch idle state: {}", e);
            event_loop.exit();
            return;
        }

        if occluded {
            debug!("Window occluded, frame loop idle");
            self.timer.stop();
        } else {
            debug!("Window visible, frame loop rendering");
            self.timer.start();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let title = self.options.decorate_title(WINDOW_TITLE);
        let window = match Window::new(event_loop, WINDOW_WIDTH, WINDOW_HEIGHT, &title) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let criteria = AdapterCriteria {
            allow_software: self.options.use_software_adapter,
            ..Default::default()
        };

        match Renderer::new(&window, Box::new(HelloTriangle::new()), criteria) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
                self.timer.reset();
            }
            Err(e) => {
                error!("Failed to create renderer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Occluded(occluded) => {
                self.set_occluded(event_loop, occluded);
            }
            WindowEvent::RedrawRequested => {
                if self.input.key_hit(KeyCode::Escape) {
                    info!("Escape pressed, shutting down");
                    event_loop.exit();
                    return;
                }

                let delta = self.timer.delta_secs();
                if let Some(ref mut renderer) = self.renderer
                    && let Err(e) = renderer.render_frame(delta, &mut self.input)
                {
                    error!("Render error: {}", e);
                    event_loop.exit();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.on_key_down(key);
                    } else {
                        self.input.on_key_up(key);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .on_mouse_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if state.is_pressed() {
                    self.input.on_button_down(button.into());
                } else {
                    self.input.on_button_up(button.into());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.occluded {
            // Suspend in the OS event wait until visibility changes.
            event_loop.set_control_flow(ControlFlow::Wait);
        } else {
            event_loop.set_control_flow(ControlFlow::Poll);
            if let Some(ref window) = self.window {
                window.request_redraw();
            }
        }
    }
}

fn main() -> Result<()> {
    triangle_core::init_logging();

    let options = LaunchOptions::parse(std::env::args());
    info!(
        "Starting First Triangle (software adapter: {})",
        options.use_software_adapter
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(options);
    event_loop.run_app(&mut app)?;

    Ok(())
}

use std::sync::Arc;

use anyhow::{anyhow, Context};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod config;
mod export;
mod input;
mod logging;

use app::{App, RenderState};
use config::AppConfig;
use input::Key;
use logging::{init_logging, LoggingConfig};

/// Physical key → [`Key`]. Unmapped keys are ignored.
fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Space => Key::Space,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::Digit5 => Key::Digit5,
        KeyCode::Digit6 => Key::Digit6,
        KeyCode::Digit7 => Key::Digit7,
        KeyCode::Digit8 => Key::Digit8,
        KeyCode::Tab => Key::Tab,
        KeyCode::Equal | KeyCode::NumpadAdd => Key::Equal,
        KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,
        KeyCode::BracketRight => Key::BracketRight,
        KeyCode::BracketLeft => Key::BracketLeft,
        KeyCode::Period => Key::Period,
        KeyCode::Comma => Key::Comma,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyV => Key::V,
        KeyCode::Delete | KeyCode::Backspace => Key::Delete,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F5 => Key::F5,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Handler: winit ApplicationHandler
// ---------------------------------------------------------------------------

struct Handler {
    config: AppConfig,
    window: Option<Arc<Window>>,
    app: Option<App>,
    /// Set when the app cannot run at all; reported by `main`.
    fatal: Option<anyhow::Error>,
}

impl Handler {
    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(app) = &mut self.app {
            app.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for Handler {
    /// Called once on desktop when the event loop starts.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let (w, h) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title("Organic Gradient")
            .with_inner_size(winit::dpi::LogicalSize::new(w, h));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fatal = Some(anyhow!("failed to create window: {e}"));
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created ({w}×{h})");

        let app = App::new(Arc::clone(&window), self.config.clone());
        if app.state() == RenderState::Unsupported {
            self.fatal = Some(anyhow!(
                "GPU rendering is not supported on this system (no compatible adapter)"
            ));
            event_loop.exit();
            return;
        }
        self.window = Some(window);
        self.app = Some(app);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                self.exit(event_loop);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat,
                        ..
                    },
                ..
            } => {
                let Some(key) = map_key(code) else {
                    return;
                };
                // Holding a nudge key repeats it; everything else fires once.
                let repeatable = matches!(
                    key,
                    Key::Equal
                        | Key::Minus
                        | Key::BracketLeft
                        | Key::BracketRight
                        | Key::Period
                        | Key::Comma
                        | Key::F
                        | Key::G
                );
                if repeat && !repeatable {
                    return;
                }
                let quit = match &mut self.app {
                    Some(app) => app
                        .on_key_pressed(key)
                        .is_some_and(|action| app.handle_action(action)),
                    None => false,
                };
                if quit {
                    log::info!("Quit requested, exiting");
                    self.exit(event_loop);
                }
            }

            WindowEvent::Resized(new_size) => {
                if let Some(app) = &mut self.app {
                    app.resize(new_size.width, new_size.height);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(app) = &mut self.app {
                    match app.render() {
                        Ok(()) => {}
                        // Surface lost / outdated: reconfigure and try again next frame.
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            if let Some(window) = &self.window {
                                let size = window.inner_size();
                                app.resize(size.width, size.height);
                            }
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("GPU out of memory, exiting");
                            self.exit(event_loop);
                        }
                        Err(e) => log::warn!("render error: {e:?}"),
                    }
                }
            }

            _ => {}
        }
    }

    /// Drive continuous redraws.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_logging(LoggingConfig {
        env_filter: config.log_filter.clone(),
        ..Default::default()
    });
    for warning in AppConfig::warnings(|key| std::env::var(key).ok()) {
        log::warn!("{warning}");
    }

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = Handler {
        config,
        window: None,
        app: None,
        fatal: None,
    };
    event_loop.run_app(&mut handler).context("event loop error")?;

    match handler.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

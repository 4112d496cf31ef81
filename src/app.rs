use anyhow::{Context, Result, anyhow, bail};
use cogbat_core::{ImageHandle, Key, Scene};
use cogbat_experiment::config::GeneralConfig;
use cogbat_experiment::{AbortKey, ExperimentError, InputSampler, Screen};
use cogbat_render::{SkiaRenderer, load_font};
use cogbat_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Icon, Window, WindowId},
};

const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Maps a physical key to the battery's key set. Everything else is dropped.
fn map_key(code: KeyCode, abort: AbortKey) -> Option<Key> {
    Some(match code {
        KeyCode::F12 if abort == AbortKey::F12 => Key::Abort,
        KeyCode::Escape if abort == AbortKey::Escape => Key::Abort,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Return,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,
        KeyCode::Digit0 | KeyCode::Numpad0 => Key::Digit(0),
        KeyCode::Digit1 | KeyCode::Numpad1 => Key::Digit(1),
        KeyCode::Digit2 | KeyCode::Numpad2 => Key::Digit(2),
        KeyCode::Digit3 | KeyCode::Numpad3 => Key::Digit(3),
        KeyCode::Digit4 | KeyCode::Numpad4 => Key::Digit(4),
        KeyCode::Digit5 | KeyCode::Numpad5 => Key::Digit(5),
        KeyCode::Digit6 | KeyCode::Numpad6 => Key::Digit(6),
        KeyCode::Digit7 | KeyCode::Numpad7 => Key::Digit(7),
        KeyCode::Digit8 | KeyCode::Numpad8 => Key::Digit(8),
        KeyCode::Digit9 | KeyCode::Numpad9 => Key::Digit(9),
        _ => return None,
    })
}

/// Drops queued answers but keeps an abort pressed in the same frame.
fn discard_answers(keys: &mut VecDeque<Key>) {
    keys.retain(|k| *k == Key::Abort);
}

fn load_icon(path: &Path) -> Result<Icon> {
    let image = image::open(path)
        .with_context(|| format!("reading icon {}", path.display()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Icon::from_rgba(image.into_raw(), width, height).context("building window icon")
}

/// Window-side state driven by winit callbacks.
struct WindowState {
    general: GeneralConfig,
    icon: Option<Icon>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    size: PhysicalSize<u32>,
    keys: VecDeque<Key>,
    open_error: Option<anyhow::Error>,
}

impl WindowState {
    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let g = &self.general;
        let mut attributes = Window::default_attributes()
            .with_title("Cognitive Battery")
            .with_resizable(false)
            .with_decorations(!g.borderless)
            .with_window_icon(self.icon.clone());
        if g.fullscreen {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .ok_or_else(|| anyhow!("No monitor available"))?;
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        } else {
            attributes = attributes.with_inner_size(PhysicalSize::new(g.width, g.height));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        tracing::info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            fullscreen = g.fullscreen,
            "window opened"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.size = size;
        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 || new_size == self.size {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                tracing::warn!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                tracing::warn!(error = %e, "failed to resize buffer");
            }
        }
        self.size = new_size;
        tracing::info!(width = new_size.width, height = new_size.height, "display resized");
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.open_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::warn!("window close requested");
                self.keys.push_back(Key::Abort);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code, self.general.abort_key) {
                        self.keys.push_back(key);
                    }
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }
}

/// Fullscreen (or windowed) display plus keyboard, driven from the battery's
/// own loop by pumping winit events whenever it presents or polls.
pub struct WinitFrontend {
    event_loop: EventLoop<()>,
    state: WindowState,
    renderer: SkiaRenderer,
    timer: HighPrecisionTimer,
}

impl WinitFrontend {
    pub fn open(general: &GeneralConfig) -> Result<Self> {
        let mut event_loop = EventLoop::new()?;
        let icon = general.icon.as_deref().map(load_icon).transpose()?;
        let mut state = WindowState {
            general: general.clone(),
            icon,
            window: None,
            pixels: None,
            size: PhysicalSize::new(general.width, general.height),
            keys: VecDeque::new(),
            open_error: None,
        };

        let started = Instant::now();
        while state.pixels.is_none() {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut state);
            if let Some(e) = state.open_error.take() {
                return Err(e.context("opening the battery window"));
            }
            if let PumpStatus::Exit(code) = status {
                bail!("event loop exited with code {code} before the window opened");
            }
            if started.elapsed() > OPEN_TIMEOUT {
                bail!("window did not open within {OPEN_TIMEOUT:?}");
            }
        }

        let font = general.font.as_deref().map(load_font).transpose()?;
        if font.is_none() {
            tracing::warn!("no font configured, text will not be drawn");
        }
        let renderer = SkiaRenderer::new(state.size.width, state.size.height, font)?;
        Ok(Self {
            event_loop,
            state,
            renderer,
            timer: HighPrecisionTimer::new(),
        })
    }

    fn pump(&mut self) {
        let status = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.state);
        if let PumpStatus::Exit(code) = status {
            tracing::warn!(code, "event loop exited");
            self.state.keys.push_back(Key::Abort);
        }
    }
}

impl Screen for WinitFrontend {
    fn size(&self) -> (u32, u32) {
        (self.state.size.width, self.state.size.height)
    }

    fn present(&mut self, scene: &Scene) -> cogbat_experiment::Result<()> {
        self.pump();
        let display = |e: &dyn std::fmt::Display| ExperimentError::Display(e.to_string());
        let size = self.state.size;
        if self.renderer.size() != (size.width, size.height) {
            self.renderer.resize(size.width, size.height).map_err(|e| display(&e))?;
        }
        let pixels = self
            .state
            .pixels
            .as_mut()
            .ok_or_else(|| ExperimentError::Display("window is closed".into()))?;
        let stats = self
            .renderer
            .render_scene(scene, pixels.frame_mut(), &mut self.timer)
            .map_err(|e| display(&e))?;
        pixels.render().map_err(|e| display(&e))?;
        tracing::trace!(
            elements = stats.elements,
            draw_us = stats.draw.as_micros() as u64,
            total_us = stats.total.as_micros() as u64,
            "frame presented"
        );
        Ok(())
    }

    fn load_image(&mut self, path: &Path) -> cogbat_experiment::Result<ImageHandle> {
        self.renderer.load_image(path).map_err(|e| ExperimentError::Asset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl InputSampler for WinitFrontend {
    fn poll(&mut self) -> Vec<Key> {
        self.pump();
        self.state.keys.drain(..).collect()
    }

    fn clear(&mut self) {
        self.pump();
        discard_answers(&mut self.state.keys);
    }
}

impl Drop for WinitFrontend {
    fn drop(&mut self) {
        let stats = self.timer.calibration_stats();
        tracing::info!(
            avg_frame_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            max_frame_ms = stats.max_frame_time_ns / 1e6,
            "presentation timing"
        );
        if let Some(window) = &self.state.window {
            window.set_cursor_visible(true);
        }
    }
}

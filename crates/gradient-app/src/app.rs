use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gradient_core::blend::BlendMode;
use gradient_core::clock::{PlayState, Timeline};
use gradient_core::params::{FLOW_INTENSITY_RANGE, NOISE_SCALE_RANGE, SPEED_RANGE};
use gradient_core::presets::Preset;
use gradient_core::quality::{FrameGate, FramePolicy};
use gradient_core::settings::PersistedSettings;
use gradient_core::share::ShareableGradient;
use gradient_core::store::GradientStore;
use gradient_gpu::readback::{fit_to_device, render_offscreen, FrameReader};
use gradient_gpu::renderer::preferred_format;
use gradient_gpu::{GpuContext, GpuError, PresentPass, StackRenderer};
use winit::window::Window;

use crate::config::AppConfig;
use crate::export::{image_file_name, timestamp_ms, ExportWorker, VideoCapture};
use crate::input::{
    nudge, toggled_grain, InputAction, InputState, Key, FLOW_STEP, NOISE_SCALE_STEP, SPEED_STEP,
};

const TITLE: &str = "Organic Gradient";
const SAVE_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Simple FPS counter: logs to console once per second
// ---------------------------------------------------------------------------

struct FpsCounter {
    frames: u32,
    last_report: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
        }
    }

    /// Increment the frame count. Returns the FPS value if a full second has
    /// elapsed since the last report.
    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.last_report.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last_report = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Render state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Ready,
    /// The device was lost; nothing is drawn until a retry succeeds.
    ContextLost,
    /// No usable GPU adapter.
    Unsupported,
}

/// Window title for the current state. Doubles as the fallback panel when
/// nothing can be drawn.
pub fn window_title(state: RenderState, play: PlayState, recording: Option<(u32, u32)>) -> String {
    match state {
        RenderState::Unsupported => format!("{TITLE}: GPU rendering is not supported here"),
        RenderState::ContextLost => format!("{TITLE}: rendering context lost (F5 to retry)"),
        RenderState::Ready => {
            let mut title = TITLE.to_string();
            if !play.is_playing() {
                title.push_str(" (paused)");
            }
            if let Some((done, total)) = recording {
                title.push_str(&format!(" [REC {done}/{total}]"));
            }
            title
        }
    }
}

// ---------------------------------------------------------------------------
// GPU resources tied to one device
// ---------------------------------------------------------------------------

struct Gpu {
    surface: wgpu::Surface<'static>,
    ctx: GpuContext,
    surface_config: wgpu::SurfaceConfiguration,
    stack: StackRenderer,
    present: PresentPass,
    /// Recording frames on their way back from the GPU.
    frames: FrameReader<PathBuf>,
    lost: Arc<AtomicBool>,
}

impl Gpu {
    fn new(window: Arc<Window>, policy: &FramePolicy) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;
        let ctx = pollster::block_on(GpuContext::for_surface(instance, &surface))?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        ctx.device.set_device_lost_callback(move |reason, message| {
            log::error!("GPU device lost ({reason:?}): {message}");
            flag.store(true, Ordering::SeqCst);
        });

        let caps = surface.get_capabilities(&ctx.adapter);
        let format = preferred_format(&caps.formats).ok_or(GpuError::NoAdapter)?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);
        log::info!("Surface configured: {width}×{height} {format:?} Fifo");

        let (rw, rh) = policy.render_size((width, height), window.scale_factor());
        let stack = StackRenderer::new(&ctx.device, rw, rh);
        let present = PresentPass::new(&ctx.device, format);

        Ok(Self {
            surface,
            ctx,
            surface_config,
            stack,
            present,
            frames: FrameReader::default(),
            lost,
        })
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    window: Arc<Window>,
    config: AppConfig,
    gpu: Option<Gpu>,
    state: RenderState,

    store: GradientStore,
    timeline: Timeline,
    policy: FramePolicy,
    gate: FrameGate,
    current_preset_idx: usize,

    input: InputState,
    exporter: Option<ExportWorker>,
    recording: Option<VideoCapture>,

    saved_revision: u64,
    last_save: Instant,
    last_frame: Instant,
    fps: FpsCounter,
    title: String,
}

impl App {
    pub fn new(window: Arc<Window>, config: AppConfig) -> Self {
        let quality = config.device_quality();
        let policy = quality.policy();
        log::info!("device quality {quality:?}: {policy:?}");

        let mut store = GradientStore::new();
        match PersistedSettings::load(&config.settings_path) {
            Ok(Some(saved)) => {
                store.apply_persisted(&saved);
                log::info!("loaded settings from {}", config.settings_path.display());
            }
            Ok(None) => {}
            Err(e) => log::warn!("ignoring saved settings: {e}"),
        }
        if let Some(link) = &config.share_link {
            match ShareableGradient::parse(link) {
                Some(shared) => store.import_settings(&shared),
                None => log::warn!("could not import share link {link:?}"),
            }
        }

        let exporter = ExportWorker::spawn()
            .map_err(|e| log::error!("capture disabled: {e:#}"))
            .ok();

        let mut app = Self {
            window,
            config,
            gpu: None,
            state: RenderState::ContextLost,
            saved_revision: store.revision(),
            store,
            timeline: Timeline::new(),
            policy,
            gate: FrameGate::new(),
            current_preset_idx: 0,
            input: InputState::new(),
            exporter,
            recording: None,
            last_save: Instant::now(),
            last_frame: Instant::now(),
            fps: FpsCounter::new(),
            title: String::new(),
        };
        app.init_gpu();
        app
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// (Re)create every GPU resource. Used at startup and by retry.
    fn init_gpu(&mut self) {
        self.gpu = None;
        match Gpu::new(Arc::clone(&self.window), &self.policy) {
            Ok(gpu) => {
                self.gpu = Some(gpu);
                self.state = RenderState::Ready;
            }
            Err(GpuError::NoAdapter) => {
                log::debug!("no suitable GPU adapter");
                self.state = RenderState::Unsupported;
            }
            Err(e) => {
                log::error!("GPU initialisation failed: {e}");
                self.state = RenderState::ContextLost;
            }
        }
        self.last_frame = Instant::now();
        self.update_title();
    }

    fn on_context_lost(&mut self) {
        if self.state == RenderState::ContextLost {
            return;
        }
        log::error!("rendering context lost, press F5 to retry");
        self.gpu = None;
        self.recording = None;
        self.state = RenderState::ContextLost;
        self.update_title();
    }

    fn update_title(&mut self) {
        let recording = self
            .recording
            .as_ref()
            .map(|r| (r.captured(), r.total_frames()));
        let title = window_title(self.state, self.store.play_state(), recording);
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }

    // -------------------------------------------------------------------------
    // Resize
    // -------------------------------------------------------------------------

    /// Reconfigure the surface and rebuild size-dependent GPU resources.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        let scale_factor = self.window.scale_factor();
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        gpu.surface_config.width = new_width;
        gpu.surface_config.height = new_height;
        gpu.surface.configure(&gpu.ctx.device, &gpu.surface_config);

        let (rw, rh) = self
            .policy
            .render_size((new_width, new_height), scale_factor);
        gpu.stack.resize(&gpu.ctx.device, rw, rh);

        log::debug!("Surface resized to {new_width}×{new_height}, rendering at {rw}×{rh}");
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    pub fn on_key_pressed(&self, key: Key) -> Option<InputAction> {
        self.input.on_key(key)
    }

    /// Apply an action to the app state.
    ///
    /// Returns `true` if the app should exit.
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::TogglePlay => {
                self.store.toggle_play();
            }

            InputAction::LoadPreset(preset) => {
                if let Some(idx) = Preset::ALL.iter().position(|&p| p == preset) {
                    self.current_preset_idx = idx;
                }
                self.store.apply_preset(preset);
            }

            InputAction::CycleNextPreset => {
                self.current_preset_idx = (self.current_preset_idx + 1) % Preset::ALL.len();
                self.store.apply_preset(Preset::ALL[self.current_preset_idx]);
            }

            InputAction::NextColorScheme => {
                self.store.next_color_scheme();
            }

            InputAction::ComplexityUp => self.store.edit_focused(|p| {
                p.set_complexity(p.complexity.saturating_add(1));
                log::debug!("complexity → {}", p.complexity);
            }),
            InputAction::ComplexityDown => self.store.edit_focused(|p| {
                p.set_complexity(p.complexity.saturating_sub(1));
                log::debug!("complexity → {}", p.complexity);
            }),
            InputAction::NoiseScaleUp => self.store.edit_focused(|p| {
                p.set_noise_scale(nudge(p.noise_scale, NOISE_SCALE_STEP, &NOISE_SCALE_RANGE));
                log::debug!("noise scale → {:.2}", p.noise_scale);
            }),
            InputAction::NoiseScaleDown => self.store.edit_focused(|p| {
                p.set_noise_scale(nudge(p.noise_scale, -NOISE_SCALE_STEP, &NOISE_SCALE_RANGE));
                log::debug!("noise scale → {:.2}", p.noise_scale);
            }),
            InputAction::SpeedUp => self.store.edit_focused(|p| {
                p.set_speed(nudge(p.speed, SPEED_STEP, &SPEED_RANGE));
                log::debug!("speed → {:.2}", p.speed);
            }),
            InputAction::SpeedDown => self.store.edit_focused(|p| {
                p.set_speed(nudge(p.speed, -SPEED_STEP, &SPEED_RANGE));
                log::debug!("speed → {:.2}", p.speed);
            }),
            InputAction::FlowUp => self.store.edit_focused(|p| {
                p.set_flow_intensity(nudge(p.flow_intensity, FLOW_STEP, &FLOW_INTENSITY_RANGE));
                log::debug!("flow intensity → {:.2}", p.flow_intensity);
            }),
            InputAction::FlowDown => self.store.edit_focused(|p| {
                p.set_flow_intensity(nudge(p.flow_intensity, -FLOW_STEP, &FLOW_INTENSITY_RANGE));
                log::debug!("flow intensity → {:.2}", p.flow_intensity);
            }),
            InputAction::ToggleGrain => self.store.edit_focused(|p| {
                p.set_grain_amount(toggled_grain(p.grain_amount));
                log::debug!("grain → {:.2}", p.grain_amount);
            }),

            InputAction::ToggleMultiLayer => {
                let on = !self.store.multi_layer_mode();
                self.store.set_multi_layer_mode(on);
            }
            InputAction::AddLayer => {
                let id = self.store.add_layer();
                log::info!("added {id}");
            }
            InputAction::RemoveLayer => {
                let id = self.store.layers().active_id().to_string();
                if self.store.remove_layer(&id) {
                    log::info!("removed {id}");
                } else {
                    log::info!("{id} is the last layer and stays");
                }
            }
            InputAction::MoveLayer(direction) => {
                let id = self.store.layers().active_id().to_string();
                if self.store.move_layer(&id, direction) {
                    log::info!("moved {id} {direction:?}");
                }
            }
            InputAction::NextLayer => {
                let id = self.store.cycle_active_layer();
                log::info!("active layer: {id}");
            }
            InputAction::NextBlendMode => {
                let mut mode = BlendMode::Normal;
                self.store.edit_active_layer(|layer| {
                    layer.blend_mode = layer.blend_mode.next();
                    mode = layer.blend_mode;
                });
                log::info!("blend mode: {}", mode.name());
            }
            InputAction::ToggleLayerVisibility => {
                self.store.edit_active_layer(|layer| {
                    layer.visible = !layer.visible;
                    log::info!("{} {}", layer.id, if layer.visible { "shown" } else { "hidden" });
                });
            }

            InputAction::ExportImage => self.export_image(),
            InputAction::ToggleRecording => self.toggle_recording(),
            InputAction::Share => {
                log::info!("share link: ?{}", self.store.shareable().to_query());
            }

            InputAction::Reset => {
                self.current_preset_idx = 0;
                self.store.reset_to_defaults();
            }

            InputAction::Retry => {
                if self.state == RenderState::Ready {
                    log::debug!("retry ignored, rendering is fine");
                } else {
                    log::info!("retrying GPU initialisation");
                    self.init_gpu();
                }
            }

            InputAction::Quit => return true,
        }
        self.update_title();
        false
    }

    // -------------------------------------------------------------------------
    // Capture
    // -------------------------------------------------------------------------

    fn export_image(&mut self) {
        let (Some(gpu), Some(exporter)) = (&self.gpu, &self.exporter) else {
            log::warn!("image export unavailable");
            return;
        };
        let requested = self
            .config
            .image
            .export_size((gpu.surface_config.width, gpu.surface_config.height));
        let (w, h) = fit_to_device(&gpu.ctx.device, requested);
        if (w, h) != requested {
            log::warn!(
                "{}×{} is beyond this GPU's limits, exporting at {w}×{h}",
                requested.0,
                requested.1
            );
        }

        let snapshot = self.store.snapshot(&self.policy, &self.timeline);
        match render_offscreen(&gpu.ctx.device, &gpu.ctx.queue, &snapshot, w, h) {
            Ok(pixels) => {
                let format = self.config.image.format;
                let path = self
                    .config
                    .export_dir
                    .join(image_file_name(timestamp_ms(), format));
                log::info!("exporting {w}×{h} image to {}", path.display());
                exporter.submit(path, w, h, pixels, format);
            }
            Err(e) => log::error!("image export failed: {e}"),
        }
    }

    fn toggle_recording(&mut self) {
        if let Some(rec) = self.recording.take() {
            log::info!(
                "recording stopped after {} frames in {}",
                rec.captured(),
                rec.dir().display()
            );
            return;
        }
        if self.gpu.is_none() || self.exporter.is_none() {
            log::warn!("recording unavailable");
            return;
        }
        let dir = self
            .config
            .export_dir
            .join(format!("recording-{}", timestamp_ms()));
        let rec = VideoCapture::new(dir, self.config.video);
        log::info!(
            "recording {} frames at {} fps into {}",
            rec.total_frames(),
            self.config.video.fps,
            rec.dir().display()
        );
        self.recording = Some(rec);
    }

    /// Queue the live composite for the running recording if a sample is
    /// due, and hand finished read-backs to the export thread.
    fn capture_video_frame(&mut self, dt: f32) {
        let (Some(gpu), Some(exporter)) = (&mut self.gpu, &self.exporter) else {
            return;
        };
        if let Some(rec) = &mut self.recording {
            if let Some(path) = rec.advance(dt) {
                let (w, h) = gpu.stack.size();
                let queued = gpu.frames.submit(
                    &gpu.ctx.device,
                    &gpu.ctx.queue,
                    gpu.stack.output_texture(),
                    w,
                    h,
                    path,
                );
                if !queued {
                    log::debug!("read-back ring full, skipping a recording sample");
                    rec.give_back();
                }
            }
        }
        for (path, frame) in gpu.frames.poll(&gpu.ctx.device) {
            exporter.submit_frame(path, frame);
        }

        let Some(rec) = &self.recording else {
            return;
        };
        if rec.is_finished() {
            log::info!(
                "recording finished: {} frames in {}",
                rec.captured(),
                rec.dir().display()
            );
            self.recording = None;
        }
    }

    // -------------------------------------------------------------------------
    // Settings persistence
    // -------------------------------------------------------------------------

    fn maybe_save(&mut self, force: bool) {
        if self.store.revision() == self.saved_revision {
            return;
        }
        if !force && self.last_save.elapsed() < SAVE_INTERVAL {
            return;
        }
        self.last_save = Instant::now();
        self.saved_revision = self.store.revision();
        if let Err(e) = self.store.persisted().save(&self.config.settings_path) {
            log::warn!("could not save settings: {e}");
        }
    }

    /// Flush settings and in-flight recording frames before exit.
    pub fn shutdown(&mut self) {
        self.maybe_save(true);
        self.recording = None;
        if let (Some(gpu), Some(exporter)) = (&mut self.gpu, &self.exporter) {
            for (path, frame) in gpu.frames.finish(&gpu.ctx.device) {
                exporter.submit_frame(path, frame);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Run one frame: advance clocks, encode every layer, composite, present.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.maybe_save(false);

        if self.gpu.as_ref().is_some_and(Gpu::is_lost) {
            self.on_context_lost();
        }
        if self.state != RenderState::Ready {
            return Ok(());
        }
        let Some(dt) = self.gate.admit(dt, self.policy.frame_skip) else {
            return Ok(());
        };

        self.store.tick(&mut self.timeline, dt, &self.policy);

        if let Some(fps) = self.fps.tick() {
            let focused = self.store.focused_params();
            log::debug!(
                "FPS: {:.1}  scheme: {}  speed: {:.2}  complexity: {}  t: {:.2}",
                fps,
                self.store.color_scheme(),
                focused.speed,
                focused.complexity,
                self.timeline.main().elapsed(),
            );
        }

        let snapshot = self.store.snapshot(&self.policy, &self.timeline);
        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };

        let output = gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        gpu.stack
            .encode(&gpu.ctx.device, &gpu.ctx.queue, &mut encoder, &snapshot);
        gpu.present.encode(
            &gpu.ctx.device,
            &mut encoder,
            gpu.stack.output_view(),
            &surface_view,
        );

        gpu.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.capture_video_frame(dt);
        self.update_title();
        Ok(())
    }
}

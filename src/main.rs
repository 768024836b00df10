// main.rs - desktop host: window, render loop, loaders and control channel

mod camera;
mod loader;
mod renderer;

use anyhow::{Context, Result};
use camera::ViewerCamera;
use clap::{Parser, ValueEnum};
use loader::{LoadEvent, MediaFetcher};
use renderer::Renderer;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stereo_viewer::adapter::MediaDimensions;
use stereo_viewer::config::ViewerConfig;
use stereo_viewer::control::{self, ControlClient, ControlEvent, ControlMessage};
use stereo_viewer::immersive::{ImmersiveSessionTracker, MirrorSurface, SessionState};
use stereo_viewer::media::{parse_query, MediaDescriptor, SourceKind};
use stereo_viewer::params::ModelOrientation;
use stereo_viewer::stereo::MonoEye;
use stereo_viewer::{AdapterRegistry, ViewDispatcher};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "webp", "mp4", "webm", "ogg", "glb", "gltf",
];
const MODEL_SCALE_STEP: f32 = 0.1;
/// How often an idle window wakes to drain the load and control channels.
const IDLE_TICK: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EyeArg {
    Left,
    Right,
}

#[derive(Parser, Debug)]
#[command(name = "stereo_viewer", version, about = "Flat, side-by-side, VR180, VR360 and glTF viewer")]
struct Cli {
    /// Media path, URL, or query string such as `src=room.jpg&type=vr360`
    source: Option<String>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// WebSocket URL of the selection server
    #[arg(long)]
    control: Option<String>,

    /// HTTP base URL used to fetch the last selection at startup
    #[arg(long)]
    server: Option<String>,

    /// Eye shown when not presenting in stereo
    #[arg(long, value_enum)]
    mono_eye: Option<EyeArg>,

    /// Use the hemisphere blackout split for VR180
    #[arg(long)]
    legacy_half_turn: bool,

    #[arg(long)]
    no_vsync: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_json_file(path)?,
            None => ViewerConfig::default(),
        };
        if let Some(url) = &self.control {
            config.control_url = Some(url.clone());
        }
        if let Some(url) = &self.server {
            config.server_url = Some(url.clone());
        }
        if let Some(eye) = self.mono_eye {
            config.mono_eye = match eye {
                EyeArg::Left => MonoEye::Left,
                EyeArg::Right => MonoEye::Right,
            };
        }
        config.legacy_half_turn |= self.legacy_half_turn;
        if self.no_vsync {
            config.vsync = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// The egui overlay is the window's mirror surface; it hides while the
/// stereo session owns the whole window.
struct Overlay {
    visible: bool,
}

/// Outside a stereo session the window only redraws after something changed.
struct FrameScheduler {
    dirty: bool,
}

impl FrameScheduler {
    fn new() -> Self {
        Self { dirty: true }
    }

    fn mark(&mut self) {
        self.dirty = true;
    }

    /// `continuous` asks for a frame regardless.
    fn take(&mut self, continuous: bool) -> bool {
        std::mem::take(&mut self.dirty) || continuous
    }
}

impl MirrorSurface for Overlay {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

enum UiAction {
    Open,
    ResetView,
    ToggleFullscreen,
    ToggleSession,
    ToggleMonoEye,
    SetVsync(bool),
    ModelScale(f32),
    Orientation(ModelOrientation),
    Exit,
}

struct StatusLine {
    mode: String,
    source: String,
    mono_eye: MonoEye,
    session: SessionState,
    loading: bool,
    connected: Option<bool>,
    message: String,
    model_scale: f32,
    orientation: ModelOrientation,
    vsync: bool,
    fps: f32,
}

struct Viewer {
    renderer: Renderer,
    dispatcher: ViewDispatcher,
    camera: ViewerCamera,
    session: ImmersiveSessionTracker,
    overlay: Overlay,
    fetcher: MediaFetcher,
    loads: Sender<LoadEvent>,
    control: Option<ControlClient>,
    config: ViewerConfig,
    loading: Option<String>,
    connected: Option<bool>,
    message: String,
    rebuild_at: Option<Instant>,
    frames: FrameScheduler,
}

impl Viewer {
    fn show(&mut self, descriptor: MediaDescriptor) {
        let src = descriptor.source_ref.clone();
        let ready = self
            .renderer
            .decoded_size(&src)
            .map(|(w, h)| MediaDimensions::new(w, h));
        let needs_decode = descriptor.kind() == SourceKind::Image && ready.is_none();

        match self.dispatcher.activate(&mut self.renderer, descriptor, ready) {
            Ok(mode) => {
                self.message = format!("{} view", mode.label());
                if needs_decode {
                    self.loading = Some(src.clone());
                    loader::start_load_image(src, self.fetcher.clone(), self.loads.clone());
                }
            }
            // already logged by the dispatcher
            Err(e) => self.message = e.to_string(),
        }
        self.start_model_loads();
    }

    fn start_model_loads(&mut self) {
        for (src, token) in self.renderer.take_model_requests() {
            loader::start_load_model(src, token, self.fetcher.clone(), self.loads.clone());
        }
    }

    fn handle_load(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Image { src, image } => {
                if self.loading.as_deref() == Some(src.as_str()) {
                    self.loading = None;
                }
                let dims = MediaDimensions::new(image.width(), image.height());
                self.renderer.stash_image(src.clone(), image);
                if let Err(e) = self.dispatcher.media_ready(&mut self.renderer, &src, dims) {
                    log::error!("failed to show {src}: {e}");
                    self.message = e.to_string();
                }
            }
            LoadEvent::ImageFailed { src, error } => {
                log::error!("failed to load {src}: {error}");
                if self.loading.as_deref() == Some(src.as_str()) {
                    self.loading = None;
                }
                self.message = format!("failed to load {src}");
            }
            LoadEvent::Model { token, result } => match result {
                Ok(model) => {
                    if self.renderer.attach_model(token, &model) {
                        self.dispatcher
                            .model_loaded(&mut self.renderer, token, Ok(model.bounds));
                    } else {
                        log::debug!("dropping superseded model load {}", token.0);
                    }
                }
                Err(e) => {
                    self.message = "model failed to load".into();
                    self.dispatcher.model_loaded(&mut self.renderer, token, Err(e));
                }
            },
        }
    }

    fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Connected => self.connected = Some(true),
            ControlEvent::Disconnected => self.connected = Some(false),
            ControlEvent::Message(ControlMessage::Selection(selection)) => {
                match selection.descriptor(&self.config.media_base) {
                    Some(descriptor) => self.show(descriptor),
                    None => log::warn!("selection without files ignored"),
                }
            }
            ControlEvent::Message(ControlMessage::Params(value)) => {
                match self.dispatcher.apply_params_json(&mut self.renderer, &value) {
                    Ok(changed) => log::debug!("params received, changed: {changed}"),
                    Err(e) => log::warn!("rejected params: {e}"),
                }
            }
        }
    }

    fn change_model_scale(&mut self, delta: f32) {
        let scale = self.dispatcher.params().model_scale + delta;
        match self.dispatcher.set_model_scale(&mut self.renderer, scale) {
            Ok(()) => self.publish_params(),
            Err(e) => log::warn!("{e}"),
        }
    }

    fn set_orientation(&mut self, orientation: ModelOrientation) {
        let mut params = *self.dispatcher.params();
        params.model_orientation = orientation;
        match self.dispatcher.set_params(&mut self.renderer, params) {
            Ok(()) => self.publish_params(),
            Err(e) => log::warn!("{e}"),
        }
    }

    fn publish_params(&self) {
        if let Some(client) = &self.control {
            client.send(&self.dispatcher.params_payload());
        }
    }

    fn toggle_session(&mut self) {
        if self.session.is_presenting() {
            self.session.session_ended(&mut self.overlay);
        } else {
            self.session.session_started(&mut self.overlay);
        }
    }

    fn toggle_mono_eye(&mut self) {
        let eye = self.dispatcher.context().mono_eye.toggled();
        log::info!("mono eye: {eye:?}");
        self.dispatcher.set_mono_eye(eye);
    }

    fn open_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Media", MEDIA_EXTENSIONS)
            .pick_file()
        {
            self.show(MediaDescriptor::from_source(path.to_string_lossy(), None));
        }
    }

    fn toggle_fullscreen(&mut self, window: &Window) {
        self.camera.is_fullscreen = !self.camera.is_fullscreen;
        if self.camera.is_fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            window.set_fullscreen(None);
        }
    }

    /// Tear down after a lost surface: leave the stereo session now, rebuild
    /// the renderer once the plan's delay has passed.
    fn context_lost(&mut self) {
        let plan = self.session.context_lost(self.session.is_presenting());
        log::warn!("render context lost, rebuilding in {:?}", plan.reload_after);
        if plan.exit_session {
            self.session.session_ended(&mut self.overlay);
        }
        self.rebuild_at = Some(Instant::now() + plan.reload_after);
    }

    fn rebuild_if_due(&mut self, window: &Window) -> Result<()> {
        match self.rebuild_at {
            Some(at) if Instant::now() >= at => {}
            _ => return Ok(()),
        }
        self.rebuild_at = None;
        self.renderer = pollster::block_on(Renderer::new(window, self.config.vsync))
            .context("failed to rebuild renderer")?;
        self.loading = None;
        self.frames.mark();
        if let Some(descriptor) = self.dispatcher.reset() {
            self.show(descriptor);
        }
        Ok(())
    }

    fn status(&self, fps: f32) -> StatusLine {
        let params = self.dispatcher.params();
        StatusLine {
            mode: self
                .dispatcher
                .current_mode()
                .map_or_else(|| "none".to_string(), |m| m.label().to_string()),
            source: self
                .dispatcher
                .current_descriptor()
                .map(|d| d.filename.clone())
                .unwrap_or_default(),
            mono_eye: self.dispatcher.context().mono_eye,
            session: self.session.state(),
            loading: self.loading.is_some(),
            connected: self.connected,
            message: self.message.clone(),
            model_scale: params.model_scale,
            orientation: params.model_orientation,
            vsync: self.config.vsync,
            fps,
        }
    }

    fn apply(&mut self, action: UiAction, window: &Window, control_flow: &mut ControlFlow) {
        match action {
            UiAction::Open => self.open_dialog(),
            UiAction::ResetView => self.camera.reset(),
            UiAction::ToggleFullscreen => self.toggle_fullscreen(window),
            UiAction::ToggleSession => self.toggle_session(),
            UiAction::ToggleMonoEye => self.toggle_mono_eye(),
            UiAction::SetVsync(vsync) => {
                self.config.vsync = vsync;
                self.renderer.set_vsync(vsync);
            }
            UiAction::ModelScale(delta) => self.change_model_scale(delta),
            UiAction::Orientation(o) => self.set_orientation(o),
            UiAction::Exit => *control_flow = ControlFlow::Exit,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// The descriptor to open first: the command line, else the server's last
/// selection.
fn initial_descriptor(cli_source: Option<&str>, config: &ViewerConfig) -> Option<MediaDescriptor> {
    if let Some(source) = cli_source {
        return parse_query(source).map(|q| q.into_descriptor());
    }
    let server = config.server_url.as_deref()?;
    match control::fetch_last_selection(server) {
        Ok(Some(selection)) => selection.descriptor(&config.media_base),
        Ok(None) => None,
        Err(e) => {
            log::warn!("could not fetch last selection: {e}");
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.load_config()?;
    let initial = initial_descriptor(cli.source.as_deref(), &config);

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Stereo Viewer")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let renderer = pollster::block_on(Renderer::new(&window, config.vsync))?;
    let dispatcher = ViewDispatcher::new(AdapterRegistry::with_defaults(), config.view_context());

    let (load_tx, load_rx): (Sender<LoadEvent>, Receiver<LoadEvent>) = channel();
    let (control_tx, control_rx) = channel();
    let control = match &config.control_url {
        Some(url) => Some(
            ControlClient::spawn(url.clone(), config.reconnect_delay(), control_tx)
                .context("failed to start control channel")?,
        ),
        None => None,
    };

    let mut viewer = Viewer {
        renderer,
        dispatcher,
        camera: ViewerCamera::new(),
        session: ImmersiveSessionTracker::new(config.reload_delay()),
        overlay: Overlay { visible: true },
        fetcher: MediaFetcher::new(config.data_root.clone()),
        loads: load_tx,
        connected: control.as_ref().map(|_| false),
        control,
        config,
        loading: None,
        message: String::new(),
        rebuild_at: None,
        frames: FrameScheduler::new(),
    };
    match initial {
        Some(descriptor) => viewer.show(descriptor),
        None => log::info!("nothing selected yet, press O to open a file"),
    }

    let mut mouse_pressed = false;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;

    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;

    event_loop.run(move |event, _, control_flow| {
        while let Ok(event) = load_rx.try_recv() {
            viewer.handle_load(event);
            viewer.start_model_loads();
            viewer.frames.mark();
        }
        while let Ok(event) = control_rx.try_recv() {
            viewer.handle_control(event);
            viewer.frames.mark();
        }

        match event {
            Event::WindowEvent { event, .. } => {
                viewer.frames.mark();
                if viewer.overlay.visible {
                    let response = viewer
                        .renderer
                        .egui_state
                        .on_event(&viewer.renderer.egui_ctx, &event);
                    if response.consumed {
                        return;
                    }
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        viewer.renderer.resize(new_size);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        viewer.renderer.resize(*new_inner_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => viewer.open_dialog(),
                                Some(VirtualKeyCode::V) => viewer.toggle_session(),
                                Some(VirtualKeyCode::Escape) if viewer.session.is_presenting() => {
                                    viewer.toggle_session()
                                }
                                Some(VirtualKeyCode::M) => viewer.toggle_mono_eye(),
                                Some(VirtualKeyCode::R) => viewer.camera.reset(),
                                Some(
                                    VirtualKeyCode::Plus
                                    | VirtualKeyCode::Equals
                                    | VirtualKeyCode::NumpadAdd,
                                ) => viewer.change_model_scale(MODEL_SCALE_STEP),
                                Some(VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract) => {
                                    viewer.change_model_scale(-MODEL_SCALE_STEP)
                                }
                                Some(VirtualKeyCode::Space) => {
                                    log::info!("play/pause ignored, video decoding is not available")
                                }
                                Some(VirtualKeyCode::F11) => viewer.toggle_fullscreen(&window),
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            mouse_pressed = state == ElementState::Pressed;
                            if !mouse_pressed {
                                last_mouse_pos = None;
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        if mouse_pressed {
                            if let Some(last_pos) = last_mouse_pos {
                                let dx = (position.x - last_pos.x) as f32;
                                let dy = (position.y - last_pos.y) as f32;
                                let mut width = viewer.renderer.size.width as f32;
                                if viewer.session.is_presenting() {
                                    width /= 2.0;
                                }
                                let height = viewer.renderer.size.height as f32;
                                viewer.camera.drag(dx, dy, width, height);
                            }
                            last_mouse_pos = Some(position);
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        viewer.camera.zoom(scroll);
                    }

                    WindowEvent::DroppedFile(path) => {
                        viewer.show(MediaDescriptor::from_source(path.to_string_lossy(), None));
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame_time).as_secs_f32();
                if elapsed >= 1.0 {
                    fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_frame_time = now;
                }

                if viewer.rebuild_at.is_some() {
                    return;
                }

                let presenting = viewer.session.is_presenting();
                let status = viewer.status(fps);
                let mut actions = Vec::new();
                let mut ui = |ctx: &egui::Context| draw_ui(ctx, &status, &mut actions);
                let overlay: Option<&mut dyn FnMut(&egui::Context)> =
                    if viewer.overlay.visible { Some(&mut ui) } else { None };
                let render_result = viewer.renderer.render_frame(
                    &window,
                    &viewer.camera,
                    &mut viewer.dispatcher,
                    presenting,
                    overlay,
                );

                for action in actions {
                    viewer.apply(action, &window, control_flow);
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => viewer.context_lost(),
                    Err(wgpu::SurfaceError::Outdated) => {
                        let size = viewer.renderer.size;
                        viewer.renderer.resize(size);
                        viewer.frames.mark();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                if let Err(e) = viewer.rebuild_if_due(&window) {
                    log::error!("{e:#}");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                let presenting = viewer.session.is_presenting();
                if viewer.session.take_redraw(presenting) {
                    log::debug!("redrawing the window after the stereo session");
                    viewer.frames.mark();
                }
                if viewer.frames.take(presenting) {
                    window.request_redraw();
                }
                if *control_flow != ControlFlow::Exit {
                    *control_flow = if presenting {
                        ControlFlow::Poll
                    } else {
                        ControlFlow::WaitUntil(Instant::now() + IDLE_TICK)
                    };
                }
            }

            _ => {}
        }
    });
}

fn draw_ui(ctx: &egui::Context, status: &StatusLine, actions: &mut Vec<UiAction>) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open...  (O)").clicked() {
                    ui.close_menu();
                    actions.push(UiAction::Open);
                }
                if ui.button("Exit").clicked() {
                    actions.push(UiAction::Exit);
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset view  (R)").clicked() {
                    actions.push(UiAction::ResetView);
                    ui.close_menu();
                }
                if ui.button("Stereo session  (V)").clicked() {
                    actions.push(UiAction::ToggleSession);
                    ui.close_menu();
                }
                if ui.button("Toggle fullscreen  (F11)").clicked() {
                    actions.push(UiAction::ToggleFullscreen);
                    ui.close_menu();
                }
                let eye_label = format!("Mono eye: {:?}  (M)", status.mono_eye);
                if ui.button(eye_label).clicked() {
                    actions.push(UiAction::ToggleMonoEye);
                    ui.close_menu();
                }
                let mut vsync = status.vsync;
                if ui.checkbox(&mut vsync, "VSync").changed() {
                    actions.push(UiAction::SetVsync(vsync));
                }
            });

            ui.menu_button("Model", |ui| {
                ui.horizontal(|ui| {
                    if ui.button("-").clicked() {
                        actions.push(UiAction::ModelScale(-MODEL_SCALE_STEP));
                    }
                    ui.label(format!("scale {:.2}", status.model_scale));
                    if ui.button("+").clicked() {
                        actions.push(UiAction::ModelScale(MODEL_SCALE_STEP));
                    }
                });
                ui.separator();
                for o in [
                    ModelOrientation::Front,
                    ModelOrientation::Right,
                    ModelOrientation::Back,
                    ModelOrientation::Left,
                ] {
                    if ui
                        .radio(status.orientation == o, format!("{o:?}"))
                        .clicked()
                    {
                        actions.push(UiAction::Orientation(o));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!("{} | {}", status.mode, status.source));
            ui.separator();
            let session = match status.session {
                SessionState::Windowed => "windowed",
                SessionState::Immersive => "stereo",
            };
            ui.label(session);
            if status.loading {
                ui.separator();
                ui.spinner();
                ui.label("loading");
            }
            if let Some(connected) = status.connected {
                ui.separator();
                ui.label(if connected { "control: online" } else { "control: offline" });
            }
            if !status.message.is_empty() {
                ui.separator();
                ui.label(&status.message);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{:.0} fps", status.fps));
            });
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let cli = Cli::parse_from([
            "stereo_viewer",
            "--control",
            "ws://localhost:9000/",
            "--mono-eye",
            "right",
            "--legacy-half-turn",
            "--no-vsync",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.control_url.as_deref(), Some("ws://localhost:9000/"));
        assert_eq!(config.mono_eye, MonoEye::Right);
        assert!(config.legacy_half_turn);
        assert!(!config.vsync);
    }

    #[test]
    fn query_on_the_command_line_carries_info() {
        let config = ViewerConfig::default();
        let d = initial_descriptor(Some("src=room.jpg&type=vr360"), &config).unwrap();
        assert_eq!(d.source_ref, "room.jpg");
        assert_eq!(d.info_type(), Some("vr360"));
    }

    #[test]
    fn bad_control_url_is_rejected() {
        let cli = Cli::parse_from(["stereo_viewer", "--control", "http://nope"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn overlay_is_the_mirror() {
        let mut overlay = Overlay { visible: true };
        let mut session = ImmersiveSessionTracker::new(Duration::from_millis(150));
        session.session_started(&mut overlay);
        assert!(!overlay.visible);
        session.session_ended(&mut overlay);
        assert!(overlay.visible);
    }

    #[test]
    fn idle_window_draws_only_after_a_change() {
        let mut frames = FrameScheduler::new();
        assert!(frames.take(false));
        assert!(!frames.take(false));

        frames.mark();
        assert!(frames.take(false));
        assert!(!frames.take(false));

        // a stereo session keeps drawing
        assert!(frames.take(true));
        assert!(frames.take(true));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Main application setup and event loop.

use crate::panels::{FlowsAction, FlowsPanel, LoginPanel, PalettePanel, PropertiesPanel};
use crate::remote::{Remote, RemoteEvent};
use crate::state::{BannerKind, EditorSession, Screen, StudioState};
use egui_wgpu::wgpu;
use flowstudio_client::{ApiError, ClientConfig, FlowClient, SessionHandle};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Fallback backend origin when `FLOWSTUDIO_API_URL` is unset
const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Application errors
#[derive(Debug, Error)]
pub enum StudioError {
    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// HTTP client construction failed
    #[error("Client setup failed: {0}")]
    Client(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("Failed to create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("Failed to find suitable GPU adapter");

        tracing::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Flow Studio Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        window: &Window,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Studio Encoder"),
            });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Studio Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color {
                                r: 0.96,
                                g: 0.96,
                                b: 0.96,
                                a: 1.0,
                            }),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Running state of the application
struct StudioRunning {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    studio: StudioInner,
}

/// Inner application state and panels
struct StudioInner {
    state: StudioState,
    remote: Remote,
    session: SessionHandle,
    client: FlowClient,
    login: LoginPanel,
    flows_panel: FlowsPanel,
    palette: PalettePanel,
    properties: PropertiesPanel,
}

impl StudioInner {
    fn new() -> Result<Self> {
        let config = ClientConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!("{e}; falling back to {DEFAULT_API_URL}");
            ClientConfig::new(DEFAULT_API_URL)
        });
        tracing::info!("Backend origin: {}", config.base_url);

        let session =
            SessionHandle::new(&config).map_err(|e| StudioError::Client(e.to_string()))?;
        let client = FlowClient::new(&config, session.clone())
            .map_err(|e| StudioError::Client(e.to_string()))?;
        let remote = Remote::new()?;

        Ok(Self {
            state: StudioState::new(),
            remote,
            session,
            client,
            login: LoginPanel::new(),
            flows_panel: FlowsPanel::new(),
            palette: PalettePanel::new(),
            properties: PropertiesPanel::new(),
        })
    }

    fn update(&mut self, ctx: &egui::Context) {
        for event in self.remote.poll() {
            self.apply_event(event);
        }

        match self.state.screen {
            Screen::Login => self.login_ui(ctx),
            Screen::Flows => self.flows_ui(ctx),
            Screen::Editor => self.editor_ui(ctx),
        }
    }

    fn apply_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::LoggedIn(Ok(user)) => {
                self.login.in_flight = false;
                tracing::info!(username = %user.username, "signed in");
                self.state.user = Some(user);
                self.state.banner = None;
                self.goto_flows();
            }
            RemoteEvent::LoggedIn(Err(e)) => {
                self.login.fail(match &e {
                    ApiError::Unauthenticated(_) => "invalid username or password".to_string(),
                    other => other.to_string(),
                });
            }

            RemoteEvent::FlowsListed(Ok(flows)) => {
                self.state.flows_loading = false;
                self.state.flows = flows;
            }
            RemoteEvent::FlowsListed(Err(e)) => {
                self.state.flows_loading = false;
                self.surface_error(e, "Couldn't load flows");
            }

            RemoteEvent::FlowCreated(Ok(flow)) => {
                self.flows_panel.create_finished(true);
                self.open_editor_session(flow);
            }
            RemoteEvent::FlowCreated(Err(e)) => {
                self.flows_panel.create_finished(false);
                self.surface_error(e, "Couldn't create the flow");
            }

            RemoteEvent::FlowLoaded(Ok(flow)) => self.open_editor_session(flow),
            RemoteEvent::FlowLoaded(Err(e)) => match e {
                ApiError::NotFound(_) => {
                    self.state.error_banner("That flow no longer exists");
                }
                other => self.surface_error(other, "Couldn't open the flow"),
            },

            RemoteEvent::FlowSaved(result) => self.apply_save_result(result),

            RemoteEvent::FlowDeleted { id, result } => match result {
                Ok(()) => {
                    self.state.flows.retain(|f| f.id != id);
                    tracing::info!(flow = %id, "flow deleted");
                }
                Err(e) => self.surface_error(e, "Couldn't delete the flow"),
            },

            RemoteEvent::ExecutionStarted { flow_id, result } => match result {
                Ok(handle) => {
                    if let Some(editor) = self.editor_for(&flow_id) {
                        editor.execution.starting = false;
                        editor.execution.execution_id = Some(handle.execution_id);
                        editor.execution.error = None;
                    }
                }
                Err(e) if e.is_unauthenticated() => {
                    self.surface_error(e, "Couldn't start the run");
                }
                Err(e) => {
                    if let Some(editor) = self.editor_for(&flow_id) {
                        editor.execution.starting = false;
                        editor.execution.error = Some(e.to_string());
                    }
                }
            },
            RemoteEvent::ExecutionPolled { flow_id, result } => match result {
                Ok(status) => {
                    if let Some(editor) = self.editor_for(&flow_id) {
                        editor.execution.status = Some(status);
                    }
                }
                Err(e) if e.is_unauthenticated() => {
                    self.surface_error(e, "Run status check failed");
                }
                Err(e) => {
                    if let Some(editor) = self.editor_for(&flow_id) {
                        editor.execution.error = Some(e.to_string());
                    }
                }
            },
        }
    }

    fn apply_save_result(&mut self, result: std::result::Result<flowstudio_client::Flow, ApiError>) {
        match result {
            Ok(flow) => {
                if let Some(editor) = self.editor_for(&flow.id) {
                    // The save covered the latest edits only if nothing
                    // changed while it was in flight
                    if editor.pending_save == Some(editor.edit_counter) {
                        editor.dirty = false;
                    }
                    editor.pending_save = None;
                    editor.flow = flow;
                }
            }
            Err(e) => {
                if let Some(editor) = self.state.editor.as_mut() {
                    editor.pending_save = None;
                }
                self.surface_error(e, "Couldn't save the flow");
            }
        }
    }

    fn editor_for(&mut self, flow_id: &str) -> Option<&mut EditorSession> {
        self.state
            .editor
            .as_mut()
            .filter(|editor| editor.flow.id == flow_id)
    }

    /// Map an error onto user-visible state. Unauthenticated errors force a
    /// sign-out; everything else becomes a retryable banner.
    fn surface_error(&mut self, error: ApiError, context: &str) {
        if error.is_unauthenticated() {
            tracing::warn!("forced sign-out: {error}");
            self.session.invalidate();
            self.remote.advance_generation();
            self.state
                .force_sign_out("Your session has expired. Please sign in again.");
            self.login.in_flight = false;
        } else {
            tracing::error!("{context}: {error}");
            self.state.error_banner(format!("{context}: {error}"));
        }
    }

    fn goto_flows(&mut self) {
        self.remote.advance_generation();
        self.state.editor = None;
        self.state.screen = Screen::Flows;
        self.refresh_flows();
    }

    fn refresh_flows(&mut self) {
        self.state.flows_loading = true;
        let client = self.client.clone();
        self.remote.spawn(move |sink| async move {
            sink.send(RemoteEvent::FlowsListed(client.list().await));
        });
    }

    fn open_editor_session(&mut self, flow: flowstudio_client::Flow) {
        self.remote.advance_generation();
        tracing::info!(flow = %flow.id, name = %flow.name, "opening editor");
        self.state.editor = Some(EditorSession::new(flow));
        self.properties = PropertiesPanel::new();
        self.state.screen = Screen::Editor;
        self.state.banner = None;
    }

    fn sign_out(&mut self) {
        let session = self.session.clone();
        self.remote.spawn(move |_sink| async move {
            session.logout().await;
        });
        self.remote.advance_generation();
        self.state.user = None;
        self.state.flows.clear();
        self.state.editor = None;
        self.state.screen = Screen::Login;
        self.state.banner = None;
        self.login = LoginPanel::new();
    }

    fn login_ui(&mut self, ctx: &egui::Context) {
        self.banner_ui(ctx);
        let request = egui::CentralPanel::default()
            .show(ctx, |ui| self.login.ui(ui))
            .inner;

        if let Some(request) = request {
            let session = self.session.clone();
            self.remote.spawn(move |sink| async move {
                let result = session.login(&request.username, &request.password).await;
                sink.send(RemoteEvent::LoggedIn(result));
            });
        }
    }

    fn header_ui(&mut self, ctx: &egui::Context) -> bool {
        let mut signed_out = false;
        egui::TopBottomPanel::top("app_header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Flow Studio").strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign Out").clicked() {
                        signed_out = true;
                    }
                    if let Some(user) = &self.state.user {
                        if self.session.has_role("admin") {
                            ui.label(
                                egui::RichText::new("admin")
                                    .monospace()
                                    .color(egui::Color32::from_rgb(124, 58, 237)),
                            );
                        }
                        ui.label(&user.username);
                    }
                });
            });
        });
        signed_out
    }

    fn banner_ui(&mut self, ctx: &egui::Context) {
        let Some(banner) = self.state.banner.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::TopBottomPanel::top("banner").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let color = match banner.kind {
                    BannerKind::Error => egui::Color32::from_rgb(220, 60, 60),
                    BannerKind::Info => egui::Color32::from_rgb(60, 120, 220),
                };
                ui.label(egui::RichText::new(&banner.message).color(color));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("\u{2715}").clicked() {
                        dismissed = true;
                    }
                });
            });
        });
        if dismissed {
            self.state.banner = None;
        }
    }

    fn flows_ui(&mut self, ctx: &egui::Context) {
        if self.header_ui(ctx) {
            self.sign_out();
            return;
        }
        self.banner_ui(ctx);

        let action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                self.flows_panel
                    .ui(ui, &self.state.flows, self.state.flows_loading)
            })
            .inner;

        match action {
            Some(FlowsAction::Refresh) => self.refresh_flows(),
            Some(FlowsAction::Create(draft)) => {
                let client = self.client.clone();
                self.remote.spawn(move |sink| async move {
                    let result = client.create(&draft, &flowstudio_graph::FlowGraph::new()).await;
                    sink.send(RemoteEvent::FlowCreated(result));
                });
            }
            Some(FlowsAction::Open(id)) => {
                let client = self.client.clone();
                self.remote.spawn(move |sink| async move {
                    sink.send(RemoteEvent::FlowLoaded(client.get(&id).await));
                });
            }
            Some(FlowsAction::Delete(id)) => {
                let client = self.client.clone();
                self.remote.spawn(move |sink| async move {
                    let result = client.delete(&id).await;
                    sink.send(RemoteEvent::FlowDeleted { id, result });
                });
            }
            None => {}
        }
    }

    fn editor_ui(&mut self, ctx: &egui::Context) {
        if self.header_ui(ctx) {
            self.sign_out();
            return;
        }
        self.banner_ui(ctx);

        let mut wants_back = false;
        {
            let StudioInner {
                state,
                remote,
                client,
                palette,
                properties,
                ..
            } = self;
            let Some(editor) = state.editor.as_mut() else {
                state.screen = Screen::Flows;
                return;
            };
            let registry = &state.registry;

            // Editor header: name, dirty marker, save/run controls
            egui::TopBottomPanel::top("editor_header").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("\u{2190} Flows").clicked() {
                        wants_back = true;
                    }
                    ui.separator();
                    ui.label(egui::RichText::new(&editor.flow.name).strong());
                    if editor.dirty {
                        ui.label(
                            egui::RichText::new("\u{25cf} unsaved")
                                .color(egui::Color32::from_rgb(220, 160, 40)),
                        );
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let run_clicked = ui
                            .add_enabled(
                                !editor.execution.in_progress(),
                                egui::Button::new("\u{25b6} Run"),
                            )
                            .clicked();
                        let save_clicked = ui
                            .add_enabled(editor.dirty, egui::Button::new("Save"))
                            .clicked();
                        if editor.save_in_flight() {
                            ui.spinner();
                        }

                        if save_clicked {
                            if editor.save_in_flight() {
                                tracing::warn!(
                                    "save issued while another save is in flight; last write wins"
                                );
                            }
                            editor.pending_save = Some(editor.edit_counter);
                            let client = client.clone();
                            let id = editor.flow.id.clone();
                            let graph = editor.graph.clone();
                            remote.spawn(move |sink| async move {
                                sink.send(RemoteEvent::FlowSaved(client.save(&id, &graph).await));
                            });
                        }

                        if run_clicked {
                            editor.execution = crate::state::ExecutionView {
                                starting: true,
                                ..Default::default()
                            };
                            let client = client.clone();
                            let flow_id = editor.flow.id.clone();
                            remote.spawn(move |sink| async move {
                                match client.execute(&flow_id, None).await {
                                    Ok(handle) => {
                                        let execution_id = handle.execution_id.clone();
                                        sink.send(RemoteEvent::ExecutionStarted {
                                            flow_id: flow_id.clone(),
                                            result: Ok(handle),
                                        });
                                        loop {
                                            tokio::time::sleep(Duration::from_secs(1)).await;
                                            let poll = client
                                                .execution_status(&flow_id, &execution_id)
                                                .await;
                                            let done = match &poll {
                                                Ok(status) => status.status.is_terminal(),
                                                Err(_) => true,
                                            };
                                            sink.send(RemoteEvent::ExecutionPolled {
                                                flow_id: flow_id.clone(),
                                                result: poll,
                                            });
                                            if done {
                                                break;
                                            }
                                        }
                                    }
                                    Err(e) => sink.send(RemoteEvent::ExecutionStarted {
                                        flow_id,
                                        result: Err(e),
                                    }),
                                }
                            });
                        }
                    });
                });

                // Execution progress line
                if editor.execution.starting {
                    ui.label("Starting run...");
                } else if let Some(error) = &editor.execution.error {
                    ui.label(
                        egui::RichText::new(format!("Run failed: {error}"))
                            .color(egui::Color32::from_rgb(220, 60, 60)),
                    );
                } else if let Some(status) = &editor.execution.status {
                    let state_text = match status.status {
                        flowstudio_client::ExecutionState::Running => "running",
                        flowstudio_client::ExecutionState::Completed => "completed",
                        flowstudio_client::ExecutionState::Failed => "failed",
                        flowstudio_client::ExecutionState::Cancelled => "cancelled",
                    };
                    let mut line = format!(
                        "Run {state_text} ({:.0}%)",
                        status.progress.clamp(0.0, 1.0) * 100.0
                    );
                    if let Some(error) = &status.error {
                        line.push_str(&format!(": {error}"));
                    }
                    ui.label(line);
                }
            });

            egui::SidePanel::left("palette_panel")
                .resizable(false)
                .default_width(230.0)
                .show(ctx, |ui| {
                    if let Some((kind, trigger)) = palette.ui(ui, registry) {
                        editor.graph.add_node(kind, trigger);
                        editor.mark_edited();
                    }
                });

            egui::SidePanel::right("properties_panel")
                .resizable(false)
                .default_width(300.0)
                .show(ctx, |ui| {
                    properties.sync(&editor.graph, editor.canvas.selected(), registry);
                    if let Some((node, patch)) = properties.ui(ui, &editor.graph, registry) {
                        editor.graph.update_node_data(&node, patch);
                        editor.mark_edited();
                    }
                });

            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| {
                    let response = editor.canvas.ui(ui, &mut editor.graph, registry);
                    if response.graph_changed {
                        editor.mark_edited();
                    }
                });
        }

        if wants_back {
            self.goto_flows();
        }
    }
}

/// Main application
pub struct StudioApp {
    running: Option<StudioRunning>,
}

impl StudioApp {
    /// Create the application
    pub fn new() -> Self {
        Self { running: None }
    }

    /// Run the application until the window closes
    pub fn run() -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = StudioApp::new();
        event_loop.run_app(&mut app)?;
        Ok(())
    }
}

impl Default for StudioApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for StudioApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        tracing::info!("Creating window...");

        let window_attrs = Window::default_attributes()
            .with_title("Flow Studio")
            .with_inner_size(winit::dpi::LogicalSize::new(1440, 900))
            .with_min_inner_size(winit::dpi::LogicalSize::new(960, 600));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        let graphics = GraphicsState::new(window.clone());
        let egui_ctx = egui::Context::default();

        let studio = match StudioInner::new() {
            Ok(studio) => studio,
            Err(e) => {
                tracing::error!("Startup failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024),
        );

        tracing::info!("Flow Studio initialized");

        self.running = Some(StudioRunning {
            window,
            graphics,
            egui_ctx,
            egui_state,
            studio,
        });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(running) = &mut self.running else {
            return;
        };

        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                running.graphics.resize(new_size);
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let raw_input = running.egui_state.take_egui_input(&running.window);
                let full_output = running.egui_ctx.run(raw_input, |ctx| {
                    running.studio.update(ctx);
                });

                running
                    .egui_state
                    .handle_platform_output(&running.window, full_output.platform_output.clone());

                match running
                    .graphics
                    .render(&running.egui_ctx, full_output, &running.window)
                {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = running.window.inner_size();
                        running.graphics.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("Surface timeout");
                    }
                }

                running.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}

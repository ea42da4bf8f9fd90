//! The visualizer session: one instance owns every piece of mutable state
//! (audio, mode, assets, frame loop and the host services) and exposes the
//! operations a UI layer drives.

use crate::assets::{
    normalize_model, prepare_image, AssetKind, AssetLoader, ImageDecoder, LoadTicket,
    ModelDecoder, ModelFormat, ModelNode, PendingLoad,
};
use crate::audio::{AudioFeatureExtractor, SignalSource};
use crate::constants::{
    camera_fov_radians, CAMERA_DISTANCE, CAMERA_FAR, CAMERA_NEAR, DISTORTION, ROTATION_SPEED,
};
use crate::entity::Motion;
use crate::error::{VizError, VizResult};
use crate::frame::FrameLoop;
use crate::graphics::{DecodedImage, InteractionControls, RenderSurface, SceneHost};
use crate::mode::{Mode, ModeCoordinator};
use crate::shaders::{self, ShaderSummary};
use crate::state::Camera;
use crate::uniforms::{UniformSet, UniformValue};
use glam::Vec3;
use instant::Instant;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Per-instance tuning a host may override.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualizerConfig {
    pub fov_radians: f32,
    pub camera_distance: f32,
    /// Baseline rotation per frame, in radians.
    pub rotation_speed: f32,
    pub distortion: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            fov_radians: camera_fov_radians(),
            camera_distance: CAMERA_DISTANCE,
            rotation_speed: ROTATION_SPEED,
            distortion: DISTORTION,
        }
    }
}

impl VisualizerConfig {
    /// Initial camera for a viewport of `width` x `height` pixels.
    pub fn camera(&self, width: f32, height: f32) -> Camera {
        let mut camera = Camera {
            eye: Vec3::new(0.0, 0.0, self.camera_distance),
            fovy_radians: self.fov_radians,
            znear: CAMERA_NEAR,
            zfar: CAMERA_FAR,
            ..Camera::default()
        };
        camera.set_viewport(width, height);
        camera
    }
}

/// Host services bound at `init`.
pub struct Services {
    pub surface: Box<dyn RenderSurface>,
    pub scene: Box<dyn SceneHost>,
    pub controls: Option<Box<dyn InteractionControls>>,
}

/// What happened to a completed load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Installed,
    /// A newer request or a teardown superseded this one.
    Discarded,
}

pub struct Visualizer {
    config: VisualizerConfig,
    audio: AudioFeatureExtractor,
    coordinator: ModeCoordinator,
    assets: AssetLoader,
    frame_loop: Rc<RefCell<FrameLoop>>,
    surface: Option<Box<dyn RenderSurface>>,
    scene: Option<Box<dyn SceneHost>>,
    controls: Option<Box<dyn InteractionControls>>,
    rotation_multiplier: f32,
    clock: Instant,
}

fn scene_mut(scene: &mut Option<Box<dyn SceneHost>>) -> Option<&mut dyn SceneHost> {
    scene.as_deref_mut().map(|s| s as &mut dyn SceneHost)
}

fn controls_mut(
    controls: &mut Option<Box<dyn InteractionControls>>,
) -> Option<&mut dyn InteractionControls> {
    controls
        .as_deref_mut()
        .map(|c| c as &mut dyn InteractionControls)
}

impl Visualizer {
    pub fn new(
        config: VisualizerConfig,
        frame_loop: Rc<RefCell<FrameLoop>>,
        images: Rc<dyn ImageDecoder>,
    ) -> Self {
        let motion = Motion {
            rotation_step: config.rotation_speed,
            distortion: config.distortion,
        };
        Self {
            config,
            audio: AudioFeatureExtractor::new(),
            coordinator: ModeCoordinator::new(motion),
            assets: AssetLoader::new(images),
            frame_loop,
            surface: None,
            scene: None,
            controls: None,
            rotation_multiplier: 1.0,
            clock: Instant::now(),
        }
    }

    /// Use `decoder` for every supported model format.
    pub fn with_model_decoder(mut self, decoder: Rc<dyn ModelDecoder>) -> Self {
        for format in ModelFormat::ALL {
            self.assets.register_model_decoder(format, decoder.clone());
        }
        self
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn frame_loop(&self) -> &Rc<RefCell<FrameLoop>> {
        &self.frame_loop
    }

    pub fn coordinator(&self) -> &ModeCoordinator {
        &self.coordinator
    }

    pub fn scene(&self) -> Option<&dyn SceneHost> {
        self.scene.as_deref()
    }

    pub fn controls(&self) -> Option<&dyn InteractionControls> {
        self.controls.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_some() && self.scene.is_some()
    }

    fn require_context(&self, operation: &'static str) -> VizResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(VizError::MissingContext(operation))
        }
    }

    /// Bind host services and build the initial (3D) entity.
    pub fn init(&mut self, services: Services) -> VizResult<()> {
        if self.is_initialized() {
            log::warn!("[session] init ignored: already initialized");
            return Ok(());
        }
        self.surface = Some(services.surface);
        self.scene = Some(services.scene);
        self.controls = services.controls;
        self.clock = Instant::now();
        let mode = self.coordinator.mode();
        self.switch_to(mode)
    }

    /// Bind the audio input; later calls only resume a suspended context.
    pub fn connect_audio(&mut self, source: Box<dyn SignalSource>) -> anyhow::Result<()> {
        self.audio.initialize(source)
    }

    pub fn is_audio_connected(&self) -> bool {
        self.audio.is_initialized()
    }

    /// Resume the bound audio context if the browser suspended it. Returns
    /// whether a source is bound.
    pub fn resume_audio(&mut self) -> bool {
        self.audio.resume()
    }

    /// Install the per-frame callback on the session's loop.
    pub fn start(this: &Rc<RefCell<Self>>) {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(this);
        let frame_loop = this.borrow().frame_loop.clone();
        frame_loop.borrow_mut().start(Box::new(move || {
            let Some(session) = weak.upgrade() else {
                return Ok(());
            };
            let mut session = session
                .try_borrow_mut()
                .map_err(|_| anyhow::anyhow!("session busy during frame"))?;
            session.frame()
        }));
    }

    /// One frame: sample audio, update controls and the live entity, render.
    /// Without a scene or surface this does nothing.
    pub fn frame(&mut self) -> anyhow::Result<()> {
        let (Some(surface), Some(scene)) = (self.surface.as_deref_mut(), self.scene.as_deref_mut())
        else {
            return Ok(());
        };
        let features = self.audio.sample();
        let elapsed = self.clock.elapsed().as_secs_f32();
        if let Some(controls) = self.controls.as_deref_mut() {
            if controls.is_enabled() {
                controls.update(scene.camera_mut());
            }
        }
        let viewport = scene.viewport();
        if let Some(entity) = self.coordinator.active_mut() {
            entity.update_frame(&features, elapsed, viewport);
        }
        let draws = self
            .coordinator
            .active()
            .map(|e| e.draw_items())
            .unwrap_or_default();
        surface.render(&draws, scene.camera())
    }

    fn switch_to(&mut self, mode: Mode) -> VizResult<()> {
        let surface = self
            .surface
            .as_deref_mut()
            .ok_or(VizError::MissingContext("mode switch"))?;
        self.coordinator
            .switch_to(mode, surface, scene_mut(&mut self.scene), controls_mut(&mut self.controls))
    }

    fn reset_controls(&mut self) {
        if let (Some(controls), Some(scene)) =
            (self.controls.as_deref_mut(), self.scene.as_deref_mut())
        {
            controls.reset(scene.camera_mut());
        }
    }

    pub fn mode(&self) -> Mode {
        self.coordinator.mode()
    }

    /// Switch modes keeping each mode's asset and shader.
    pub fn switch_mode(&mut self, mode: Mode) -> VizResult<()> {
        self.require_context("mode switch")?;
        let token = self.frame_loop.borrow_mut().pause();
        self.reset_controls();
        let result = self.switch_to(mode);
        self.frame_loop.borrow_mut().resume(token);
        result
    }

    /// Switch modes and drop the target mode's asset and shader choice.
    pub fn switch_mode_and_reset(&mut self, mode: Mode) -> VizResult<()> {
        self.require_context("mode reset")?;
        let token = self.frame_loop.borrow_mut().pause();
        self.reset_controls();
        self.assets.invalidate(match mode {
            Mode::TwoD => AssetKind::Image,
            Mode::ThreeD => AssetKind::Model,
        });
        let result = match self.surface.as_deref_mut() {
            Some(surface) => self.coordinator.reset_to_default(
                mode,
                surface,
                scene_mut(&mut self.scene),
                controls_mut(&mut self.controls),
            ),
            None => Err(VizError::MissingContext("mode reset")),
        };
        self.frame_loop.borrow_mut().resume(token);
        result
    }

    pub fn on_viewport_resize(&mut self, width: f32, height: f32) {
        let (Some(surface), Some(scene)) = (self.surface.as_deref_mut(), self.scene.as_deref_mut())
        else {
            return;
        };
        scene.set_viewport(width, height);
        surface.resize(width.max(1.0) as u32, height.max(1.0) as u32);
        if self.coordinator.mode() == Mode::TwoD {
            if let Some(entity) = self.coordinator.active_mut() {
                entity.resize(surface, scene.camera());
            }
        }
    }

    /// Release everything bound at `init`. In-flight loads become stale.
    pub fn teardown(&mut self) {
        self.frame_loop.borrow_mut().stop();
        self.assets.invalidate_all();
        if let Some(surface) = self.surface.as_deref_mut() {
            match self.scene.as_deref_mut() {
                Some(scene) => self.coordinator.teardown(surface, scene),
                None => self.coordinator.release(surface),
            }
        }
        if let Some(mut controls) = self.controls.take() {
            controls.dispose();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }
        self.scene = None;
        log::info!("[session] torn down");
    }

    // ---------------- shaders ----------------

    pub fn list_shaders_2d(&self) -> Vec<ShaderSummary> {
        shaders::list_available_2d()
    }

    pub fn list_shaders_3d(&self) -> Vec<ShaderSummary> {
        shaders::list_available_3d()
    }

    pub fn current_shader_2d(&self) -> &'static str {
        self.coordinator.shader_2d().id()
    }

    pub fn current_shader_3d(&self) -> &'static str {
        self.coordinator.shader_3d().id()
    }

    /// Select a 2D shader by id; unknown ids select the default. Returns the
    /// id actually selected.
    pub fn change_shader_2d(&mut self, id: &str) -> &'static str {
        match self.surface.as_deref_mut() {
            Some(surface) => self.coordinator.change_shader_2d(id, surface).id,
            None => self.coordinator.select_shader_2d(id).id,
        }
    }

    pub fn change_shader_3d(&mut self, id: &str) -> &'static str {
        match self.surface.as_deref_mut() {
            Some(surface) => self.coordinator.change_shader_3d(id, surface).id,
            None => self.coordinator.select_shader_3d(id).id,
        }
    }

    fn current_params(&self, mode: Mode) -> Vec<(&'static str, UniformValue)> {
        let live = self
            .coordinator
            .active()
            .filter(|_| self.coordinator.mode() == mode)
            .and_then(|e| e.uniforms());
        match live {
            Some(uniforms) => uniforms.iter().collect(),
            None => {
                let shader = match mode {
                    Mode::TwoD => self.coordinator.shader_2d().definition(),
                    Mode::ThreeD => self.coordinator.shader_3d().definition(),
                };
                UniformSet::from_schema(shader).iter().collect()
            }
        }
    }

    /// Current parameter values of the selected 2D shader, in slot order.
    pub fn current_shader_params_2d(&self) -> Vec<(&'static str, UniformValue)> {
        self.current_params(Mode::TwoD)
    }

    pub fn current_shader_params_3d(&self) -> Vec<(&'static str, UniformValue)> {
        self.current_params(Mode::ThreeD)
    }

    fn set_parameter(&mut self, mode: Mode, name: &str, value: UniformValue) -> bool {
        if self.coordinator.mode() != mode {
            return false;
        }
        self.coordinator
            .active_mut()
            .map(|e| e.set_parameter(name, value))
            .unwrap_or(false)
    }

    /// Returns whether the live 2D entity declared `name`.
    pub fn set_parameter_2d(&mut self, name: &str, value: UniformValue) -> bool {
        self.set_parameter(Mode::TwoD, name, value)
    }

    pub fn set_parameter_3d(&mut self, name: &str, value: UniformValue) -> bool {
        self.set_parameter(Mode::ThreeD, name, value)
    }

    /// Rotation per frame becomes `value`, expressed as a multiple of the
    /// baseline rate.
    pub fn set_rotation_speed(&mut self, value: f32) {
        let baseline = self.config.rotation_speed;
        if baseline.abs() <= f32::EPSILON {
            log::warn!("[session] rotation speed ignored: zero baseline");
            return;
        }
        self.rotation_multiplier = value / baseline;
        self.coordinator.set_rotation_step(baseline * self.rotation_multiplier);
    }

    pub fn rotation_multiplier(&self) -> f32 {
        self.rotation_multiplier
    }

    // ---------------- assets ----------------

    pub fn begin_image_load(&mut self, url: &str) -> VizResult<PendingLoad<DecodedImage>> {
        self.require_context("set image")?;
        Ok(self.assets.request_image(url))
    }

    /// Install a decoded image and show it in 2D. Stale results are dropped;
    /// a failed decode leaves the current state untouched.
    pub fn finish_image_load(
        &mut self,
        ticket: LoadTicket,
        result: VizResult<DecodedImage>,
    ) -> VizResult<LoadOutcome> {
        if !self.assets.is_current(ticket) || !self.is_initialized() {
            log::info!("[assets] discarding stale image load (epoch {})", ticket.epoch);
            return Ok(LoadOutcome::Discarded);
        }
        let image = result?;
        let asset = Rc::new(prepare_image(image));
        let token = self.frame_loop.borrow_mut().pause();
        self.reset_controls();
        self.coordinator.set_image(Some(asset));
        let result = self.switch_to(Mode::TwoD);
        self.frame_loop.borrow_mut().resume(token);
        result.map(|_| LoadOutcome::Installed)
    }

    pub fn begin_model_load(
        &mut self,
        url: &str,
        extension: &str,
    ) -> VizResult<PendingLoad<ModelNode>> {
        self.require_context("set model")?;
        self.assets.request_model(url, extension)
    }

    /// Normalize a decoded model, bind the selected 3D shader and show it.
    pub fn finish_model_load(
        &mut self,
        ticket: LoadTicket,
        result: VizResult<ModelNode>,
    ) -> VizResult<LoadOutcome> {
        if !self.assets.is_current(ticket) || !self.is_initialized() {
            log::info!("[assets] discarding stale model load (epoch {})", ticket.epoch);
            return Ok(LoadOutcome::Discarded);
        }
        let root = result?;
        let model = Rc::new(normalize_model(root, self.coordinator.shader_3d().definition()));
        let token = self.frame_loop.borrow_mut().pause();
        self.reset_controls();
        self.coordinator.set_model(Some(model));
        let result = self.switch_to(Mode::ThreeD);
        self.frame_loop.borrow_mut().resume(token);
        result.map(|_| LoadOutcome::Installed)
    }

    /// Load an image and show it on the 2D plane. The session is not
    /// borrowed while the load is in flight.
    pub async fn set_image(this: Rc<RefCell<Self>>, url: String) -> VizResult<LoadOutcome> {
        let PendingLoad { ticket, future } = this.borrow_mut().begin_image_load(&url)?;
        let result = future.await;
        let outcome = this.borrow_mut().finish_image_load(ticket, result);
        outcome
    }

    /// Load a model (`obj`, `fbx`, `glb` or `gltf`) and show it in 3D.
    pub async fn set_model(
        this: Rc<RefCell<Self>>,
        url: String,
        extension: String,
    ) -> VizResult<LoadOutcome> {
        let PendingLoad { ticket, future } = this.borrow_mut().begin_model_load(&url, &extension)?;
        let result = future.await;
        let outcome = this.borrow_mut().finish_model_load(ticket, result);
        outcome
    }
}

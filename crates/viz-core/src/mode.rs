//! Which entity is live: the 2D plane or the 3D object.
//!
//! A switch always tears the current entity down completely (dispose, then
//! detach) before the next one is built, so at most one entity owns GPU
//! resources at any time. Interaction controls are enabled exactly when the
//! 3D entity is live.

use crate::assets::{ImageAsset, PreparedModel};
use crate::entity::{BuildSpec, EntityKind, Motion, VisualEntity};
use crate::error::{VizError, VizResult};
use crate::graphics::{EntityId, GraphicsBackend, InteractionControls, SceneHost};
use crate::shaders::{lookup_2d, lookup_3d, Shader2D, Shader3D, ShaderDefinition};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    TwoD,
    #[default]
    ThreeD,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::TwoD => "2d",
            Mode::ThreeD => "3d",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2d" | "mode2d" => Ok(Mode::TwoD),
            "3d" | "mode3d" | "3d-model" => Ok(Mode::ThreeD),
            other => Err(format!("unknown mode {other:?}")),
        }
    }
}

pub struct ModeCoordinator {
    mode: Mode,
    shader_2d: Shader2D,
    shader_3d: Shader3D,
    image: Option<Rc<ImageAsset>>,
    model: Option<Rc<PreparedModel>>,
    active: Option<VisualEntity>,
    motion: Motion,
    next_id: u64,
}

impl Default for ModeCoordinator {
    fn default() -> Self {
        Self::new(Motion::default())
    }
}

impl ModeCoordinator {
    pub fn new(motion: Motion) -> Self {
        Self {
            mode: Mode::default(),
            shader_2d: Shader2D::default(),
            shader_3d: Shader3D::default(),
            image: None,
            model: None,
            active: None,
            motion,
            next_id: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn active(&self) -> Option<&VisualEntity> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut VisualEntity> {
        self.active.as_mut()
    }

    pub fn shader_2d(&self) -> Shader2D {
        self.shader_2d
    }

    pub fn shader_3d(&self) -> Shader3D {
        self.shader_3d
    }

    pub fn image(&self) -> Option<&Rc<ImageAsset>> {
        self.image.as_ref()
    }

    pub fn model(&self) -> Option<&Rc<PreparedModel>> {
        self.model.as_ref()
    }

    pub fn set_image(&mut self, image: Option<Rc<ImageAsset>>) {
        self.image = image;
    }

    pub fn set_model(&mut self, model: Option<Rc<PreparedModel>>) {
        self.model = model;
    }

    pub fn set_rotation_step(&mut self, step: f32) {
        self.motion.rotation_step = step;
        if let Some(entity) = self.active.as_mut() {
            entity.set_rotation_step(step);
        }
    }

    /// Tear down the live entity and build the one for `mode`. Switching to
    /// the current mode rebuilds it.
    pub fn switch_to<G: GraphicsBackend + ?Sized>(
        &mut self,
        mode: Mode,
        gfx: &mut G,
        scene: Option<&mut dyn SceneHost>,
        controls: Option<&mut dyn InteractionControls>,
    ) -> VizResult<()> {
        let scene = scene.ok_or(VizError::MissingContext("mode switch"))?;

        self.teardown(gfx, scene);

        self.mode = mode;
        let (kind, shader, spec) = match mode {
            Mode::TwoD => (
                EntityKind::Plane,
                self.shader_2d.definition(),
                BuildSpec::Plane(self.image.clone()),
            ),
            Mode::ThreeD => (
                EntityKind::Object,
                self.shader_3d.definition(),
                match self.model.clone() {
                    Some(model) => BuildSpec::Model(model),
                    None => BuildSpec::DefaultObject,
                },
            ),
        };
        self.next_id += 1;
        let mut entity =
            VisualEntity::new(EntityId(self.next_id), kind, shader).with_motion(self.motion);
        let viewport = scene.viewport();
        entity.build(gfx, spec, scene.camera(), viewport);
        scene.attach(entity.id());
        self.active = Some(entity);

        if let Some(controls) = controls {
            controls.set_enabled(mode == Mode::ThreeD);
        }
        log::info!("[mode] switched to {} (shader {})", mode, shader.id);
        Ok(())
    }

    /// Forget the custom asset and shader choice for `mode`, then rebuild it.
    pub fn reset_to_default<G: GraphicsBackend + ?Sized>(
        &mut self,
        mode: Mode,
        gfx: &mut G,
        scene: Option<&mut dyn SceneHost>,
        controls: Option<&mut dyn InteractionControls>,
    ) -> VizResult<()> {
        if scene.is_none() {
            return Err(VizError::MissingContext("reset"));
        }
        match mode {
            Mode::TwoD => {
                self.image = None;
                self.shader_2d = Shader2D::default();
            }
            Mode::ThreeD => {
                self.model = None;
                self.shader_3d = Shader3D::default();
            }
        }
        self.switch_to(mode, gfx, scene, controls)
    }

    /// Dispose and detach the live entity, if any.
    pub fn teardown<G: GraphicsBackend + ?Sized>(
        &mut self,
        gfx: &mut G,
        scene: &mut dyn SceneHost,
    ) {
        if let Some(mut entity) = self.active.take() {
            entity.dispose(gfx);
            scene.detach(entity.id());
        }
    }

    /// Drop the live entity without a scene (used at session teardown).
    pub fn release<G: GraphicsBackend + ?Sized>(&mut self, gfx: &mut G) {
        if let Some(mut entity) = self.active.take() {
            entity.dispose(gfx);
        }
    }

    /// Record the 2D shader choice without touching the live entity.
    pub fn select_shader_2d(&mut self, id: &str) -> &'static ShaderDefinition {
        let shader = lookup_2d(id);
        self.shader_2d = Shader2D::from_id(shader.id);
        shader
    }

    pub fn select_shader_3d(&mut self, id: &str) -> &'static ShaderDefinition {
        let shader = lookup_3d(id);
        self.shader_3d = Shader3D::from_id(shader.id);
        shader
    }

    /// Select a 2D shader; swaps the live program when 2D is active.
    pub fn change_shader_2d<G: GraphicsBackend + ?Sized>(
        &mut self,
        id: &str,
        gfx: &mut G,
    ) -> &'static ShaderDefinition {
        let shader = self.select_shader_2d(id);
        self.swap_if_active(Mode::TwoD, shader, gfx);
        shader
    }

    /// Select a 3D shader; swaps the live program when 3D is active.
    pub fn change_shader_3d<G: GraphicsBackend + ?Sized>(
        &mut self,
        id: &str,
        gfx: &mut G,
    ) -> &'static ShaderDefinition {
        let shader = self.select_shader_3d(id);
        self.swap_if_active(Mode::ThreeD, shader, gfx);
        shader
    }

    fn swap_if_active<G: GraphicsBackend + ?Sized>(
        &mut self,
        mode: Mode,
        shader: &'static ShaderDefinition,
        gfx: &mut G,
    ) {
        if self.mode != mode {
            return;
        }
        if let Some(entity) = self.active.as_mut() {
            entity.swap_shader(gfx, shader);
        }
    }
}

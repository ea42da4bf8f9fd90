//! One renderable object bound to a shader program.
//!
//! A [`VisualEntity`] owns every GPU handle it creates. A flat plane or the
//! default icosahedron has a single surface; a custom model has one surface
//! per mesh node, each with its own [`UniformSet`].

use crate::assets::{ImageAsset, PreparedModel};
use crate::audio::FeatureVector;
use crate::constants::{DISTORTION, ICOSAHEDRON_DETAIL, ICOSAHEDRON_RADIUS, ROTATION_SPEED};
use crate::graphics::{
    icosahedron_mesh, plane_mesh, DrawItem, EntityId, GeometryHandle, GraphicsBackend,
    ProgramHandle, ProgramOptions, TextureHandle,
};
use crate::shaders::ShaderDefinition;
use crate::state::{Camera, Spin};
use crate::uniforms::{FeatureChannel, UniformSet, UniformValue};
use glam::Mat4;
use smallvec::SmallVec;
use std::rc::Rc;

/// Parameter whose presence hands deformation over to the shader.
const SHADER_DEFORMATION_PARAM: &str = "u_spikeAmount";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// Flat surface filling the view (2D mode).
    Plane,
    /// Rotating object (3D mode).
    Object,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    Unbuilt,
    Built,
    Disposed,
}

/// What geometry to build.
#[derive(Clone, Debug)]
pub enum BuildSpec {
    Plane(Option<Rc<ImageAsset>>),
    DefaultObject,
    Model(Rc<PreparedModel>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PlaneFit {
    FillView,
    Fixed,
}

/// Rotation and audio-scale tuning for object entities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// Radians added around X and Y every frame.
    pub rotation_step: f32,
    pub distortion: f32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            rotation_step: ROTATION_SPEED,
            distortion: DISTORTION,
        }
    }
}

#[derive(Debug)]
pub struct Surface {
    pub geometry: GeometryHandle,
    pub program: ProgramHandle,
    pub uniforms: UniformSet,
    /// Node-to-entity transform (normalization container included).
    pub local: Mat4,
}

pub struct VisualEntity {
    id: EntityId,
    kind: EntityKind,
    state: EntityState,
    shader: &'static ShaderDefinition,
    surfaces: SmallVec<[Surface; 1]>,
    texture: Option<TextureHandle>,
    fit: PlaneFit,
    spin: Spin,
    motion: Motion,
    viewport: [f32; 2],
}

impl VisualEntity {
    pub fn new(id: EntityId, kind: EntityKind, shader: &'static ShaderDefinition) -> Self {
        Self {
            id,
            kind,
            state: EntityState::Unbuilt,
            shader,
            surfaces: SmallVec::new(),
            texture: None,
            fit: PlaneFit::FillView,
            spin: Spin::default(),
            motion: Motion::default(),
            viewport: [1.0, 1.0],
        }
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
    pub fn state(&self) -> EntityState {
        self.state
    }
    pub fn shader(&self) -> &'static ShaderDefinition {
        self.shader
    }
    pub fn spin(&self) -> Spin {
        self.spin
    }
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Uniforms of the primary surface.
    pub fn uniforms(&self) -> Option<&UniformSet> {
        self.surfaces.first().map(|s| &s.uniforms)
    }

    pub fn set_rotation_step(&mut self, step: f32) {
        self.motion.rotation_step = step;
    }

    fn program_options(&self) -> ProgramOptions {
        match self.kind {
            EntityKind::Plane => ProgramOptions::PLANE,
            EntityKind::Object => ProgramOptions::OBJECT,
        }
    }

    fn fresh_uniforms(&self) -> UniformSet {
        let mut uniforms = UniformSet::from_schema(self.shader);
        uniforms.set_channel(FeatureChannel::Resolution, UniformValue::Vec2(self.viewport));
        if self.kind == EntityKind::Plane {
            uniforms.bind_texture(self.texture);
        }
        uniforms
    }

    fn push_surface<G: GraphicsBackend + ?Sized>(
        &mut self,
        gfx: &mut G,
        geometry: GeometryHandle,
        local: Mat4,
    ) {
        let uniforms = self.fresh_uniforms();
        let program = gfx.create_program(self.shader, self.program_options());
        self.surfaces.push(Surface {
            geometry,
            program,
            uniforms,
            local,
        });
    }

    /// Allocate geometry, program(s) and uniforms. Only valid once, from
    /// `Unbuilt`.
    pub fn build<G: GraphicsBackend + ?Sized>(
        &mut self,
        gfx: &mut G,
        spec: BuildSpec,
        camera: &Camera,
        viewport: [f32; 2],
    ) {
        if self.state != EntityState::Unbuilt {
            log::warn!("[entity] build ignored for {:?} in state {:?}", self.id, self.state);
            return;
        }
        self.viewport = viewport;
        match spec {
            BuildSpec::Plane(image) => {
                let (w, h) = match image.as_deref() {
                    Some(asset) => {
                        self.fit = PlaneFit::Fixed;
                        self.texture = Some(gfx.create_texture(&asset.image));
                        (asset.plane_size.x, asset.plane_size.y)
                    }
                    None => {
                        self.fit = PlaneFit::FillView;
                        fill_view_size(camera)
                    }
                };
                let geometry = gfx.create_geometry(&plane_mesh(w, h));
                self.push_surface(gfx, geometry, Mat4::IDENTITY);
            }
            BuildSpec::DefaultObject => {
                let mesh = icosahedron_mesh(ICOSAHEDRON_RADIUS, ICOSAHEDRON_DETAIL);
                let geometry = gfx.create_geometry(&mesh);
                self.push_surface(gfx, geometry, Mat4::IDENTITY);
            }
            BuildSpec::Model(model) => {
                let container = model.container_matrix();
                let mut parts = Vec::new();
                model.root.visit(container, &mut |node, world| {
                    if let Some(mesh) = node.mesh.as_ref() {
                        parts.push((mesh, world));
                    }
                });
                for (mesh, local) in parts {
                    let geometry = gfx.create_geometry(mesh);
                    self.push_surface(gfx, geometry, local);
                }
                if self.surfaces.is_empty() {
                    log::warn!("[entity] model has no meshes; nothing will be drawn");
                }
            }
        }
        self.state = EntityState::Built;
        log::debug!(
            "[entity] built {:?} {:?} shader={} surfaces={}",
            self.id,
            self.kind,
            self.shader.id,
            self.surfaces.len()
        );
    }

    /// Push one frame's features and time into every surface, then advance
    /// the object's rotation and audio-driven scale.
    pub fn update_frame(&mut self, features: &FeatureVector, elapsed: f32, viewport: [f32; 2]) {
        if self.state != EntityState::Built {
            return;
        }
        self.viewport = viewport;
        for surface in &mut self.surfaces {
            surface.uniforms.apply_features(features, elapsed, viewport);
        }
        if self.kind == EntityKind::Object {
            self.spin.scale = if self.shader.declares(SHADER_DEFORMATION_PARAM) {
                1.0
            } else {
                1.0 + features.overall * self.motion.distortion
            };
            self.spin.x += self.motion.rotation_step;
            self.spin.y += self.motion.rotation_step;
        }
    }

    /// Replace the program on every surface, carrying time and audio level
    /// over to the new uniforms.
    pub fn swap_shader<G: GraphicsBackend + ?Sized>(
        &mut self,
        gfx: &mut G,
        shader: &'static ShaderDefinition,
    ) {
        if self.state != EntityState::Built {
            self.shader = shader;
            return;
        }
        self.shader = shader;
        let options = self.program_options();
        for i in 0..self.surfaces.len() {
            let mut uniforms = self.fresh_uniforms();
            let previous = &self.surfaces[i].uniforms;
            for channel in [FeatureChannel::Time, FeatureChannel::AudioLevel] {
                if let Some(value) = previous.channel_value(channel) {
                    uniforms.set_channel(channel, value);
                }
            }
            let program = gfx.create_program(shader, options);
            let surface = &mut self.surfaces[i];
            gfx.release_program(surface.program);
            surface.program = program;
            surface.uniforms = uniforms;
        }
        log::debug!("[entity] {:?} now uses {}", self.id, shader.id);
    }

    /// Returns whether any surface declared `name`.
    pub fn set_parameter(&mut self, name: &str, value: UniformValue) -> bool {
        if self.state != EntityState::Built {
            return false;
        }
        let mut stored = false;
        for surface in &mut self.surfaces {
            stored |= surface.uniforms.set(name, value);
        }
        stored
    }

    /// Refit a view-filling plane to the camera frustum. Objects and
    /// image-sized planes keep their geometry.
    pub fn resize<G: GraphicsBackend + ?Sized>(&mut self, gfx: &mut G, camera: &Camera) {
        if self.state != EntityState::Built
            || self.kind != EntityKind::Plane
            || self.fit != PlaneFit::FillView
        {
            return;
        }
        let (w, h) = fill_view_size(camera);
        for surface in &mut self.surfaces {
            let geometry = gfx.create_geometry(&plane_mesh(w, h));
            gfx.release_geometry(surface.geometry);
            surface.geometry = geometry;
        }
    }

    /// Release every handle. Redundant calls are no-ops.
    pub fn dispose<G: GraphicsBackend + ?Sized>(&mut self, gfx: &mut G) {
        match self.state {
            EntityState::Built => {
                for surface in self.surfaces.drain(..) {
                    gfx.release_geometry(surface.geometry);
                    gfx.release_program(surface.program);
                }
                if let Some(texture) = self.texture.take() {
                    gfx.release_texture(texture);
                }
                self.state = EntityState::Disposed;
            }
            EntityState::Unbuilt => self.state = EntityState::Disposed,
            EntityState::Disposed => {}
        }
    }

    /// Entity-to-world transform.
    pub fn model_matrix(&self) -> Mat4 {
        match self.kind {
            EntityKind::Plane => Mat4::IDENTITY,
            EntityKind::Object => self.spin.matrix(),
        }
    }

    pub fn draw_items(&self) -> Vec<DrawItem<'_>> {
        let root = self.model_matrix();
        self.surfaces
            .iter()
            .map(|s| DrawItem {
                geometry: s.geometry,
                program: s.program,
                uniforms: &s.uniforms,
                model: root * s.local,
            })
            .collect()
    }
}

/// Plane size that exactly fills the view at the origin plane.
pub fn fill_view_size(camera: &Camera) -> (f32, f32) {
    let distance = camera.eye.z.abs().max(camera.znear);
    camera.frustum_size_at(distance)
}

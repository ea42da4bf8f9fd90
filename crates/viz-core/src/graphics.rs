//! Seams to the host's graphics, scene and interaction services, plus the
//! CPU-side geometry those services consume.

use crate::shaders::ShaderDefinition;
use crate::state::Camera;
use crate::uniforms::UniformSet;
use glam::{Mat4, Vec3};
use image::{imageops, ImageBuffer, Rgba};
use std::borrow::Cow;

macro_rules! handle {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);
    };
}

handle!(GeometryHandle);
handle!(ProgramHandle);
handle!(TextureHandle);
handle!(EntityId);

/// Triangle mesh with per-vertex position, normal and uv.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Empty means non-indexed triangle list.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Fill missing normals/uvs so every attribute has one entry per vertex.
    pub fn with_complete_attributes(mut self) -> Self {
        let n = self.positions.len();
        if self.normals.len() != n {
            self.normals = self
                .positions
                .iter()
                .map(|p| Vec3::from(*p).normalize_or_zero().to_array())
                .collect();
        }
        if self.uvs.len() != n {
            self.uvs = vec![[0.0, 0.0]; n];
        }
        self
    }
}

/// Axis-aligned plane of `width` x `height` facing +Z, centered at the origin.
pub fn plane_mesh(width: f32, height: f32) -> MeshData {
    let hw = width * 0.5;
    let hh = height * 0.5;
    MeshData {
        positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

const ICO_T: f32 = 1.618_034; // golden ratio

const ICO_VERTICES: [[f32; 3]; 12] = [
    [-1.0, ICO_T, 0.0],
    [1.0, ICO_T, 0.0],
    [-1.0, -ICO_T, 0.0],
    [1.0, -ICO_T, 0.0],
    [0.0, -1.0, ICO_T],
    [0.0, 1.0, ICO_T],
    [0.0, -1.0, -ICO_T],
    [0.0, 1.0, -ICO_T],
    [ICO_T, 0.0, -1.0],
    [ICO_T, 0.0, 1.0],
    [-ICO_T, 0.0, -1.0],
    [-ICO_T, 0.0, 1.0],
];

const ICO_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Subdivided icosahedron projected onto a sphere of `radius`. Each face is
/// split into `(detail + 1)^2` triangles; output is non-indexed.
pub fn icosahedron_mesh(radius: f32, detail: u32) -> MeshData {
    let segments = detail as usize + 1;
    let tris_per_face = segments * segments;
    let mut mesh = MeshData {
        positions: Vec::with_capacity(20 * tris_per_face * 3),
        normals: Vec::with_capacity(20 * tris_per_face * 3),
        uvs: Vec::with_capacity(20 * tris_per_face * 3),
        indices: Vec::new(),
    };
    let mut push = |p: Vec3| {
        let n = p.normalize();
        mesh.positions.push((n * radius).to_array());
        mesh.normals.push(n.to_array());
        let u = 0.5 + n.z.atan2(n.x) / std::f32::consts::TAU;
        let v = 0.5 - n.y.asin() / std::f32::consts::PI;
        mesh.uvs.push([u, v]);
    };
    for face in ICO_FACES {
        let a = Vec3::from(ICO_VERTICES[face[0]]);
        let b = Vec3::from(ICO_VERTICES[face[1]]);
        let c = Vec3::from(ICO_VERTICES[face[2]]);
        // Barycentric grid rows from edge a->c towards b.
        let point = |i: usize, j: usize| -> Vec3 {
            let s = segments as f32;
            a + (b - a) * (j as f32 / s) + (c - a) * (i as f32 / s)
        };
        for i in 0..segments {
            for j in 0..segments - i {
                push(point(i, j));
                push(point(i, j + 1));
                push(point(i + 1, j));
                if j + 1 < segments - i {
                    push(point(i, j + 1));
                    push(point(i + 1, j + 1));
                    push(point(i + 1, j));
                }
            }
        }
    }
    mesh
}

/// RGBA8 image ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// The image scaled down so neither side exceeds `max_dim`, keeping its
    /// aspect ratio. Images that already fit are borrowed as is.
    pub fn fit_within(&self, max_dim: u32) -> Cow<'_, DecodedImage> {
        let longest = self.width.max(self.height);
        if max_dim == 0 || longest <= max_dim {
            return Cow::Borrowed(self);
        }
        let scale = max_dim as f64 / longest as f64;
        let width = ((self.width as f64 * scale).round() as u32).clamp(1, max_dim);
        let height = ((self.height as f64 * scale).round() as u32).clamp(1, max_dim);
        let Some(src) = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(
            self.width,
            self.height,
            self.rgba.as_slice(),
        ) else {
            log::warn!(
                "[assets] {}x{} image has {} bytes; uploading unscaled",
                self.width,
                self.height,
                self.rgba.len()
            );
            return Cow::Borrowed(self);
        };
        let scaled = imageops::resize(&src, width, height, imageops::FilterType::Triangle);
        log::info!(
            "[assets] image scaled {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        Cow::Owned(DecodedImage {
            width,
            height,
            rgba: scaled.into_raw(),
        })
    }
}

/// Per-program pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramOptions {
    pub double_sided: bool,
    pub transparent: bool,
    pub depth_test: bool,
}

impl ProgramOptions {
    pub const PLANE: Self = Self {
        double_sided: false,
        transparent: true,
        depth_test: false,
    };
    pub const OBJECT: Self = Self {
        double_sided: true,
        transparent: false,
        depth_test: true,
    };
}

/// Allocation and release of GPU-side resources.
///
/// Handles are owned by exactly one entity; the core never releases a
/// handle twice.
pub trait GraphicsBackend {
    fn create_geometry(&mut self, mesh: &MeshData) -> GeometryHandle;
    fn release_geometry(&mut self, handle: GeometryHandle);
    fn create_program(
        &mut self,
        shader: &'static ShaderDefinition,
        options: ProgramOptions,
    ) -> ProgramHandle;
    fn release_program(&mut self, handle: ProgramHandle);
    /// Upload an RGBA image, sampled with linear filtering.
    fn create_texture(&mut self, image: &DecodedImage) -> TextureHandle;
    fn release_texture(&mut self, handle: TextureHandle);
}

/// One surface to draw this frame.
pub struct DrawItem<'a> {
    pub geometry: GeometryHandle,
    pub program: ProgramHandle,
    pub uniforms: &'a UniformSet,
    pub model: Mat4,
}

/// The presenting surface. Invoked once per frame after updates.
pub trait RenderSurface: GraphicsBackend {
    fn render(&mut self, draws: &[DrawItem<'_>], camera: &Camera) -> anyhow::Result<()>;
    fn resize(&mut self, width: u32, height: u32);
    fn dispose(&mut self) {}
}

/// Scene membership plus the camera and viewport the scene is viewed with.
pub trait SceneHost {
    fn attach(&mut self, entity: EntityId);
    fn detach(&mut self, entity: EntityId);
    fn is_attached(&self, entity: EntityId) -> bool;
    fn camera(&self) -> &Camera;
    fn camera_mut(&mut self) -> &mut Camera;
    /// Viewport size in pixels.
    fn viewport(&self) -> [f32; 2];
    fn set_viewport(&mut self, width: f32, height: f32);
}

/// Default in-memory scene used by the web frontend and tests.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    attached: Vec<EntityId>,
    camera: Camera,
    viewport: [f32; 2],
}

impl Scene {
    pub fn new(camera: Camera, width: f32, height: f32) -> Self {
        let mut scene = Self {
            attached: Vec::new(),
            camera,
            viewport: [1.0, 1.0],
        };
        scene.set_viewport(width, height);
        scene
    }

    pub fn attached(&self) -> &[EntityId] {
        &self.attached
    }
}

impl SceneHost for Scene {
    fn attach(&mut self, entity: EntityId) {
        if !self.attached.contains(&entity) {
            self.attached.push(entity);
        }
    }

    fn detach(&mut self, entity: EntityId) {
        self.attached.retain(|e| *e != entity);
    }

    fn is_attached(&self, entity: EntityId) -> bool {
        self.attached.contains(&entity)
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    fn viewport(&self) -> [f32; 2] {
        self.viewport
    }

    fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = [width.max(1.0), height.max(1.0)];
        self.camera.set_viewport(width, height);
    }
}

/// Orbit-style camera manipulation.
pub trait InteractionControls {
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn update(&mut self, camera: &mut Camera);
    /// Return the camera to the pose it had when the controls were created.
    fn reset(&mut self, camera: &mut Camera);
    fn dispose(&mut self);
}

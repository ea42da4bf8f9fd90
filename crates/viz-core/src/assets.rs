//! User-supplied images and models.
//!
//! Decoding is delegated to host decoders; this module picks the decoder,
//! stamps every request with a per-kind epoch so late results can be
//! recognised and dropped, and normalizes decoded results into something a
//! [`VisualEntity`](crate::entity::VisualEntity) can build from.

use crate::constants::{IMAGE_MAX_EXTENT, MODEL_TARGET_EXTENT};
use crate::error::{VizError, VizResult};
use crate::graphics::{DecodedImage, MeshData};
use crate::shaders::ShaderDefinition;
use crate::state::Transform;
use fnv::FnvHashMap;
use glam::{Mat4, Vec2, Vec3};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::str::FromStr;

pub type LoadFuture<T> = Pin<Box<dyn Future<Output = VizResult<T>>>>;

/// Fetch and decode an image into RGBA8.
pub trait ImageDecoder {
    fn load(&self, url: &str) -> LoadFuture<DecodedImage>;
}

/// Fetch and decode one 3D model format into a node tree.
pub trait ModelDecoder {
    fn load(&self, url: &str, format: ModelFormat) -> LoadFuture<ModelNode>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Obj,
    Fbx,
    Glb,
    Gltf,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 4] = [Self::Obj, Self::Fbx, Self::Glb, Self::Gltf];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Fbx => "fbx",
            Self::Glb => "glb",
            Self::Gltf => "gltf",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ModelFormat {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ext = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or_else(|| VizError::UnsupportedFormat(s.to_string()))
    }
}

/// Decoded scene-graph node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshData>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn group(name: impl Into<String>, children: Vec<ModelNode>) -> Self {
        Self {
            name: name.into(),
            children,
            ..Default::default()
        }
    }

    pub fn leaf(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            name: name.into(),
            mesh: Some(mesh),
            ..Default::default()
        }
    }

    /// Depth-first walk handing each node its accumulated transform.
    pub fn visit<'a>(&'a self, parent: Mat4, f: &mut dyn FnMut(&'a ModelNode, Mat4)) {
        let world = parent * self.transform.matrix();
        f(self, world);
        for child in &self.children {
            child.visit(world, f);
        }
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.visit(Mat4::IDENTITY, &mut |node, _| {
            if node.mesh.is_some() {
                count += 1;
            }
        });
        count
    }

    /// Axis-aligned bounds of every vertex in the parent's space.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut acc: Option<(Vec3, Vec3)> = None;
        self.visit(Mat4::IDENTITY, &mut |node, world| {
            let Some(mesh) = node.mesh.as_ref() else {
                return;
            };
            for p in &mesh.positions {
                let v = world.transform_point3(Vec3::from(*p));
                acc = Some(match acc {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        });
        acc
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Normalization {
    Applied { scale: f32, center: Vec3 },
    Skipped,
}

/// A decoded model ready to be installed on the 3D entity.
#[derive(Clone, Debug)]
pub struct PreparedModel {
    pub root: ModelNode,
    /// 3D shader selected when the model was prepared.
    pub shader: &'static ShaderDefinition,
    pub normalization: Normalization,
}

impl PreparedModel {
    /// Uniform scale of the wrapping container.
    pub fn container_matrix(&self) -> Mat4 {
        match self.normalization {
            Normalization::Applied { scale, .. } => Mat4::from_scale(Vec3::splat(scale)),
            Normalization::Skipped => Mat4::IDENTITY,
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.root.mesh_count()
    }
}

/// Center the model on its bounding box and scale its longest side to
/// `MODEL_TARGET_EXTENT`. A zero-extent model is kept as decoded.
pub fn normalize_model(mut root: ModelNode, shader: &'static ShaderDefinition) -> PreparedModel {
    let extent = root.bounds().map(|(lo, hi)| (lo, hi, (hi - lo).max_element()));
    let normalization = match extent {
        Some((lo, hi, max_dim)) if max_dim > 0.0 => {
            let center = (lo + hi) * 0.5;
            root.transform.translation -= center;
            let scale = MODEL_TARGET_EXTENT / max_dim;
            log::info!(
                "[assets] model normalized: size={:?} center={:?} scale={:.4} meshes={}",
                hi - lo,
                center,
                scale,
                root.mesh_count()
            );
            Normalization::Applied { scale, center }
        }
        _ => {
            log::warn!("[assets] {}; using model unnormalized", VizError::DegenerateAsset);
            Normalization::Skipped
        }
    };
    PreparedModel {
        root,
        shader,
        normalization,
    }
}

/// Decoded image plus the plane it should be shown on.
#[derive(Clone, Debug)]
pub struct ImageAsset {
    pub image: Rc<DecodedImage>,
    pub plane_size: Vec2,
}

/// Aspect-preserving plane size whose longest side is `max_extent`.
pub fn fit_plane(width: u32, height: u32, max_extent: f32) -> Vec2 {
    let aspect = width as f32 / height.max(1) as f32;
    if aspect > 1.0 {
        Vec2::new(max_extent, max_extent / aspect)
    } else {
        Vec2::new(max_extent * aspect, max_extent)
    }
}

pub fn prepare_image(image: DecodedImage) -> ImageAsset {
    let plane_size = fit_plane(image.width, image.height, IMAGE_MAX_EXTENT);
    ImageAsset {
        image: Rc::new(image),
        plane_size,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Model,
}

/// Issued with every load; compared against the loader's epoch on arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub kind: AssetKind,
    pub epoch: u64,
}

pub struct PendingLoad<T> {
    pub ticket: LoadTicket,
    pub future: LoadFuture<T>,
}

pub struct AssetLoader {
    images: Rc<dyn ImageDecoder>,
    models: FnvHashMap<ModelFormat, Rc<dyn ModelDecoder>>,
    image_epoch: u64,
    model_epoch: u64,
}

impl AssetLoader {
    pub fn new(images: Rc<dyn ImageDecoder>) -> Self {
        Self {
            images,
            models: FnvHashMap::default(),
            image_epoch: 0,
            model_epoch: 0,
        }
    }

    pub fn register_model_decoder(&mut self, format: ModelFormat, decoder: Rc<dyn ModelDecoder>) {
        self.models.insert(format, decoder);
    }

    fn epoch_mut(&mut self, kind: AssetKind) -> &mut u64 {
        match kind {
            AssetKind::Image => &mut self.image_epoch,
            AssetKind::Model => &mut self.model_epoch,
        }
    }

    pub fn epoch(&self, kind: AssetKind) -> u64 {
        match kind {
            AssetKind::Image => self.image_epoch,
            AssetKind::Model => self.model_epoch,
        }
    }

    fn issue(&mut self, kind: AssetKind) -> LoadTicket {
        let epoch = self.epoch_mut(kind);
        *epoch += 1;
        LoadTicket {
            kind,
            epoch: *epoch,
        }
    }

    /// Make every outstanding load of `kind` stale.
    pub fn invalidate(&mut self, kind: AssetKind) {
        *self.epoch_mut(kind) += 1;
    }

    pub fn invalidate_all(&mut self) {
        self.invalidate(AssetKind::Image);
        self.invalidate(AssetKind::Model);
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.epoch(ticket.kind) == ticket.epoch
    }

    /// Start an image load. A newer request supersedes this one.
    pub fn request_image(&mut self, url: &str) -> PendingLoad<DecodedImage> {
        let ticket = self.issue(AssetKind::Image);
        log::info!("[assets] loading image {} (epoch {})", url, ticket.epoch);
        PendingLoad {
            ticket,
            future: self.images.load(url),
        }
    }

    /// Start a model load. Unknown extensions fail before anything is
    /// fetched and leave the epoch untouched.
    pub fn request_model(&mut self, url: &str, extension: &str) -> VizResult<PendingLoad<ModelNode>> {
        let format: ModelFormat = extension.parse()?;
        let decoder = self
            .models
            .get(&format)
            .cloned()
            .ok_or_else(|| VizError::UnsupportedFormat(extension.to_string()))?;
        let ticket = self.issue(AssetKind::Model);
        log::info!("[assets] loading {} model {} (epoch {})", format, url, ticket.epoch);
        Ok(PendingLoad {
            ticket,
            future: decoder.load(url, format),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing_is_case_insensitive() {
        assert_eq!(".GLB".parse::<ModelFormat>().ok(), Some(ModelFormat::Glb));
        assert!(matches!(
            "stl".parse::<ModelFormat>(),
            Err(VizError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn fit_plane_bounds_longest_side() {
        assert_eq!(fit_plane(800, 400, 4.0), Vec2::new(4.0, 2.0));
        assert_eq!(fit_plane(300, 600, 4.0), Vec2::new(2.0, 4.0));
        assert_eq!(fit_plane(500, 500, 4.0), Vec2::new(4.0, 4.0));
    }
}

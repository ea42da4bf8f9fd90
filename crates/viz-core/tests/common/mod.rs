// Shared fakes for host-side integration tests.
// Every fake keeps its observable state behind an Rc so tests can inspect it
// after the fake itself has been boxed into a session.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use viz_core::assets::{ImageDecoder, LoadFuture, ModelDecoder, ModelFormat, ModelNode};
use viz_core::*;

// ---------------- graphics ----------------

#[derive(Default, Debug)]
pub struct GfxLog {
    next: u64,
    pub geometries: HashSet<u64>,
    pub programs: HashSet<u64>,
    pub textures: HashSet<u64>,
    pub double_releases: u32,
    pub renders: u32,
    pub last_draw_count: usize,
    pub fail_render: bool,
    /// Width and height of the most recently created geometry.
    pub last_extent: Option<(f32, f32)>,
    /// Ordered create/release trail, e.g. "create program 3".
    pub events: Vec<String>,
}

impl GfxLog {
    fn allocate(&mut self, what: &str) -> u64 {
        self.next += 1;
        self.events.push(format!("create {} {}", what, self.next));
        self.next
    }

    pub fn live(&self) -> usize {
        self.geometries.len() + self.programs.len() + self.textures.len()
    }
}

#[derive(Clone, Default)]
pub struct FakeGraphics {
    pub log: Rc<RefCell<GfxLog>>,
}

impl FakeGraphics {
    pub fn new() -> Self {
        Self::default()
    }
}

fn release(set: &mut HashSet<u64>, id: u64, double: &mut u32) {
    if !set.remove(&id) {
        *double += 1;
    }
}

impl GraphicsBackend for FakeGraphics {
    fn create_geometry(&mut self, mesh: &MeshData) -> GeometryHandle {
        let mut log = self.log.borrow_mut();
        let (lo, hi) = mesh.positions.iter().fold(
            ([f32::MAX; 2], [f32::MIN; 2]),
            |(lo, hi), p| {
                (
                    [lo[0].min(p[0]), lo[1].min(p[1])],
                    [hi[0].max(p[0]), hi[1].max(p[1])],
                )
            },
        );
        log.last_extent = Some((hi[0] - lo[0], hi[1] - lo[1]));
        let id = log.allocate("geometry");
        log.geometries.insert(id);
        GeometryHandle(id)
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        let mut log = self.log.borrow_mut();
        log.events.push(format!("release geometry {}", handle.0));
        let GfxLog {
            geometries,
            double_releases,
            ..
        } = &mut *log;
        release(geometries, handle.0, double_releases);
    }

    fn create_program(
        &mut self,
        _shader: &'static ShaderDefinition,
        _options: ProgramOptions,
    ) -> ProgramHandle {
        let mut log = self.log.borrow_mut();
        let id = log.allocate("program");
        log.programs.insert(id);
        ProgramHandle(id)
    }

    fn release_program(&mut self, handle: ProgramHandle) {
        let mut log = self.log.borrow_mut();
        log.events.push(format!("release program {}", handle.0));
        let GfxLog {
            programs,
            double_releases,
            ..
        } = &mut *log;
        release(programs, handle.0, double_releases);
    }

    fn create_texture(&mut self, _image: &DecodedImage) -> TextureHandle {
        let mut log = self.log.borrow_mut();
        let id = log.allocate("texture");
        log.textures.insert(id);
        TextureHandle(id)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        let mut log = self.log.borrow_mut();
        log.events.push(format!("release texture {}", handle.0));
        let GfxLog {
            textures,
            double_releases,
            ..
        } = &mut *log;
        release(textures, handle.0, double_releases);
    }
}

impl RenderSurface for FakeGraphics {
    fn render(&mut self, draws: &[DrawItem<'_>], _camera: &Camera) -> anyhow::Result<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_render {
            anyhow::bail!("render failed on purpose");
        }
        log.renders += 1;
        log.last_draw_count = draws.len();
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}
}

// ---------------- controls ----------------

#[derive(Default, Debug)]
pub struct ControlsLog {
    pub enabled: bool,
    pub resets: u32,
    pub updates: u32,
    pub disposed: bool,
    /// When set, every update moves the eye here, as a user drag would.
    pub orbit_to: Option<glam::Vec3>,
}

#[derive(Clone, Default)]
pub struct FakeControls {
    pub log: Rc<RefCell<ControlsLog>>,
}

impl InteractionControls for FakeControls {
    fn set_enabled(&mut self, enabled: bool) {
        self.log.borrow_mut().enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.log.borrow().enabled
    }

    fn update(&mut self, camera: &mut Camera) {
        let mut log = self.log.borrow_mut();
        log.updates += 1;
        if let Some(eye) = log.orbit_to {
            camera.eye = eye;
        }
    }

    fn reset(&mut self, camera: &mut Camera) {
        *camera = VisualizerConfig::default().camera(1600.0, 900.0);
        self.log.borrow_mut().resets += 1;
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed = true;
    }
}

// ---------------- frame scheduling ----------------

#[derive(Default, Debug)]
pub struct SchedulerLog {
    next: u64,
    pub pending: Vec<u64>,
    pub requested: u32,
    pub cancelled: u32,
}

#[derive(Clone, Default)]
pub struct ManualScheduler {
    pub log: Rc<RefCell<SchedulerLog>>,
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> u64 {
        let mut log = self.log.borrow_mut();
        log.next += 1;
        log.requested += 1;
        let id = log.next;
        log.pending.push(id);
        id
    }

    fn cancel_frame(&mut self, id: u64) {
        let mut log = self.log.borrow_mut();
        log.pending.retain(|p| *p != id);
        log.cancelled += 1;
    }
}

impl ManualScheduler {
    pub fn has_pending(&self) -> bool {
        !self.log.borrow().pending.is_empty()
    }

    /// Fire the pending frame, if any. Returns whether one fired.
    pub fn fire(&self, frame_loop: &Rc<RefCell<FrameLoop>>) -> bool {
        let fired = {
            let mut log = self.log.borrow_mut();
            !std::mem::take(&mut log.pending).is_empty()
        };
        if fired {
            FrameLoop::run_frame(frame_loop);
        }
        fired
    }
}

pub fn manual_loop() -> (Rc<RefCell<FrameLoop>>, ManualScheduler) {
    let scheduler = ManualScheduler::default();
    let frame_loop = Rc::new(RefCell::new(FrameLoop::new(Box::new(scheduler.clone()))));
    (frame_loop, scheduler)
}

// ---------------- audio ----------------

#[derive(Default, Debug)]
pub struct SourceLog {
    pub bins: Vec<u8>,
    pub connects: u32,
    pub resumes: u32,
    pub fft_size: usize,
}

#[derive(Clone, Default)]
pub struct FakeSource {
    pub log: Rc<RefCell<SourceLog>>,
}

impl FakeSource {
    pub fn with_bins(bins: Vec<u8>) -> Self {
        let source = Self::default();
        source.log.borrow_mut().bins = bins;
        source
    }
}

impl SignalSource for FakeSource {
    fn connect_analyser(&mut self, fft_size: usize) -> anyhow::Result<()> {
        let mut log = self.log.borrow_mut();
        log.connects += 1;
        log.fft_size = fft_size;
        Ok(())
    }

    fn resume_if_suspended(&mut self) {
        self.log.borrow_mut().resumes += 1;
    }

    fn read_byte_frequency_data(&mut self, out: &mut [u8]) {
        let log = self.log.borrow();
        for (dst, src) in out.iter_mut().zip(log.bins.iter().chain(std::iter::repeat(&0))) {
            *dst = *src;
        }
    }
}

// ---------------- decoders ----------------

pub fn checker_image(width: u32, height: u32) -> DecodedImage {
    DecodedImage {
        width,
        height,
        rgba: vec![255; (width * height * 4) as usize],
    }
}

/// Serves a fixed image; any url containing "broken" fails to decode.
pub struct FixedImages {
    pub image: DecodedImage,
}

impl ImageDecoder for FixedImages {
    fn load(&self, url: &str) -> LoadFuture<DecodedImage> {
        let result = if url.contains("broken") {
            Err(VizError::decode(url, "not an image"))
        } else {
            Ok(self.image.clone())
        };
        Box::pin(std::future::ready(result))
    }
}

/// Serves a fixed node tree; any url containing "broken" fails to decode.
pub struct FixedModels {
    pub root: ModelNode,
    pub calls: Rc<RefCell<Vec<ModelFormat>>>,
}

impl FixedModels {
    pub fn new(root: ModelNode) -> Self {
        Self {
            root,
            calls: Rc::default(),
        }
    }
}

impl ModelDecoder for FixedModels {
    fn load(&self, url: &str, format: ModelFormat) -> LoadFuture<ModelNode> {
        self.calls.borrow_mut().push(format);
        let result = if url.contains("broken") {
            Err(VizError::decode(url, "truncated file"))
        } else {
            Ok(self.root.clone())
        };
        Box::pin(std::future::ready(result))
    }
}

/// Axis-aligned box mesh spanning `min..max`.
pub fn box_mesh(min: [f32; 3], max: [f32; 3]) -> MeshData {
    let mut positions = Vec::new();
    for &x in &[min[0], max[0]] {
        for &y in &[min[1], max[1]] {
            for &z in &[min[2], max[2]] {
                positions.push([x, y, z]);
            }
        }
    }
    MeshData {
        positions,
        ..Default::default()
    }
    .with_complete_attributes()
}

/// Two boxes side by side, 4 x 2 x 2 overall, centred at (3, 1, 1).
pub fn two_part_model() -> ModelNode {
    ModelNode::group(
        "root",
        vec![
            ModelNode::leaf("left", box_mesh([1.0, 0.0, 0.0], [3.0, 2.0, 2.0])),
            ModelNode::leaf("right", box_mesh([3.0, 0.0, 0.0], [5.0, 2.0, 2.0])),
        ],
    )
}

/// Every vertex at the same point.
pub fn point_model() -> ModelNode {
    let mut node = ModelNode::leaf("dot", box_mesh([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]));
    node.transform.translation = glam::Vec3::new(0.5, 0.0, 0.0);
    node
}

// ---------------- sessions ----------------

pub struct Harness {
    pub session: Rc<RefCell<Visualizer>>,
    pub gfx: FakeGraphics,
    pub controls: FakeControls,
    pub scheduler: ManualScheduler,
    pub models: Rc<RefCell<Vec<ModelFormat>>>,
}

pub fn harness() -> Harness {
    harness_with(VisualizerConfig::default())
}

pub fn harness_with(config: VisualizerConfig) -> Harness {
    let (frame_loop, scheduler) = manual_loop();
    let models = FixedModels::new(two_part_model());
    let calls = models.calls.clone();
    let images = FixedImages {
        image: checker_image(800, 400),
    };
    let session = Visualizer::new(config, frame_loop, Rc::new(images))
        .with_model_decoder(Rc::new(models));
    let session = Rc::new(RefCell::new(session));
    let gfx = FakeGraphics::new();
    let controls = FakeControls::default();
    let camera = config.camera(1600.0, 900.0);
    session
        .borrow_mut()
        .init(Services {
            surface: Box::new(gfx.clone()),
            scene: Box::new(Scene::new(camera, 1600.0, 900.0)),
            controls: Some(Box::new(controls.clone())),
        })
        .expect("init");
    Harness {
        session,
        gfx,
        controls,
        scheduler,
        models: calls,
    }
}

pub fn float_of(params: &[(&'static str, UniformValue)], name: &str) -> Option<f32> {
    params
        .iter()
        .find(|(n, _)| *n == name)
        .and_then(|(_, v)| v.as_float())
}

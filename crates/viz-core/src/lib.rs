pub mod assets;
pub mod audio;
pub mod constants;
pub mod entity;
pub mod error;
pub mod frame;
pub mod graphics;
pub mod mode;
pub mod session;
pub mod shaders;
pub mod state;
pub mod uniforms;

pub use assets::{AssetLoader, ImageDecoder, ModelDecoder, ModelFormat, ModelNode, PreparedModel};
pub use audio::{AudioFeatureExtractor, FeatureVector, SignalSource};
pub use entity::{BuildSpec, EntityKind, EntityState, VisualEntity};
pub use error::{VizError, VizResult};
pub use frame::{FrameLoop, FrameScheduler, PauseToken};
pub use graphics::*;
pub use mode::{Mode, ModeCoordinator};
pub use session::{LoadOutcome, Services, Visualizer, VisualizerConfig};
pub use shaders::{ShaderDefinition, ShaderSummary, Shader2D, Shader3D};
pub use state::*;
pub use uniforms::{UniformSet, UniformValue};

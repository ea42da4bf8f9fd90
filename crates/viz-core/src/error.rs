use thiserror::Error;

/// Failures surfaced by the visualizer core.
///
/// Per-frame paths swallow and log these; user-initiated actions (mode
/// switch, image/model load) return them to the caller.
#[derive(Debug, Error)]
pub enum VizError {
    #[error("unsupported model format: {0:?} (expected obj, fbx, glb or gltf)")]
    UnsupportedFormat(String),

    #[error("failed to decode {url}: {reason}")]
    DecodeFailure { url: String, reason: String },

    #[error("asset bounding box has zero extent")]
    DegenerateAsset,

    #[error("{0} requires a live scene, camera and renderer")]
    MissingContext(&'static str),

    #[error("frame callback failed: {0}")]
    CallbackFault(String),

    #[error("no usable rendering device: {0}")]
    DeviceUnavailable(String),
}

impl VizError {
    pub fn decode(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::DecodeFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type VizResult<T> = Result<T, VizError>;

// Shared visual/audio tuning constants used by the core and the web frontend.

// Audio analysis
pub const FFT_SIZE: usize = 512; // analyser transform window
pub const FREQUENCY_BIN_COUNT: usize = FFT_SIZE / 2; // byte magnitudes per sample
pub const BASS_BAND_END: f32 = 0.1; // fraction of bins: [0, 10%)
pub const MID_BAND_END: f32 = 0.4; // fraction of bins: [10%, 40%)
pub const BYTE_MAX: f32 = 255.0;

// Camera
pub const CAMERA_FOV_DEG: f32 = 75.0;
pub const CAMERA_DISTANCE: f32 = 5.0; // eye z; the 2D plane sits at the origin
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;

// Orbit interaction
pub const ORBIT_MIN_DISTANCE: f32 = 0.5;
pub const ORBIT_MAX_DISTANCE: f32 = 50.0;
pub const ORBIT_ROTATE_SPEED: f32 = 0.005; // radians per pointer pixel
pub const ORBIT_ZOOM_SPEED: f32 = 1.0;

// Default 3D geometry
pub const ICOSAHEDRON_RADIUS: f32 = 1.5;
pub const ICOSAHEDRON_DETAIL: u32 = 4;

// 3D motion
pub const ROTATION_SPEED: f32 = 0.005; // baseline radians per frame around X and Y
pub const DISTORTION: f32 = 0.3; // scale = 1 + overall * DISTORTION

// User assets
pub const IMAGE_MAX_EXTENT: f32 = 4.0; // longest side of an image-fitted plane
pub const MODEL_TARGET_EXTENT: f32 = 2.0; // longest side of a normalized model

// Uniform block: one vec4 slot per declared schema parameter
pub const MAX_PARAM_SLOTS: usize = 24;

// Default shader ids per catalog
pub const DEFAULT_SHADER_2D: &str = "laser";
pub const DEFAULT_SHADER_3D: &str = "spiky";

#[inline]
pub fn camera_fov_radians() -> f32 {
    CAMERA_FOV_DEG.to_radians()
}

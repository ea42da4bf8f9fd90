// Host-side tests for tuning constants and their relationships.

use viz_core::constants::*;

#[test]
#[allow(clippy::assertions_on_constants)]
fn audio_bands_partition_the_spectrum() {
    assert_eq!(FREQUENCY_BIN_COUNT * 2, FFT_SIZE);
    assert!(BASS_BAND_END > 0.0 && BASS_BAND_END < MID_BAND_END);
    assert!(MID_BAND_END < 1.0);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn camera_and_orbit_limits_are_consistent() {
    assert!(CAMERA_NEAR > 0.0 && CAMERA_NEAR < CAMERA_FAR);
    assert!(CAMERA_DISTANCE > ORBIT_MIN_DISTANCE && CAMERA_DISTANCE < ORBIT_MAX_DISTANCE);
    assert!((camera_fov_radians() - 75f32.to_radians()).abs() < 1e-6);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn motion_and_asset_extents_are_positive() {
    assert!(ROTATION_SPEED > 0.0);
    assert!(DISTORTION > 0.0);
    assert!(MODEL_TARGET_EXTENT > 0.0);
    assert!(IMAGE_MAX_EXTENT > 0.0);
    // the icosahedron should fit comfortably in view at the default distance
    assert!(ICOSAHEDRON_RADIUS < CAMERA_DISTANCE);
}

#[test]
fn default_shader_ids_resolve() {
    assert_eq!(viz_core::shaders::lookup_2d(DEFAULT_SHADER_2D).id, DEFAULT_SHADER_2D);
    assert_eq!(viz_core::shaders::lookup_3d(DEFAULT_SHADER_3D).id, DEFAULT_SHADER_3D);
}

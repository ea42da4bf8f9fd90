// Host-side tests for spectrum reduction and analyser binding.

mod common;

use common::FakeSource;
use viz_core::audio::{extract_features, AudioFeatureExtractor};
use viz_core::constants::{FFT_SIZE, FREQUENCY_BIN_COUNT};

#[test]
fn uninitialized_extractor_reports_silence() {
    let mut extractor = AudioFeatureExtractor::new();
    let fv = extractor.sample();
    assert_eq!(fv.bass, 0.0);
    assert_eq!(fv.mid, 0.0);
    assert_eq!(fv.treble, 0.0);
    assert_eq!(fv.overall, 0.0);
    assert_eq!(fv.peak, 0.0);
    assert_eq!(fv.energy, 0.0);
    assert!(fv.spectrum.is_empty());
}

#[test]
fn bass_only_buffer_splits_at_floor_boundary() {
    // bins [0, 25) loud, the rest silent; bass ends at floor(256 * 0.1) = 25
    let mut bins = vec![0u8; FREQUENCY_BIN_COUNT];
    bins[..25].fill(255);
    let mut extractor = AudioFeatureExtractor::new();
    extractor
        .initialize(Box::new(FakeSource::with_bins(bins)))
        .unwrap();
    let fv = extractor.sample();
    assert!((fv.bass - 1.0).abs() < 1e-6);
    assert!(fv.mid.abs() < 1e-6);
    assert!(fv.treble.abs() < 1e-6);
    assert!((fv.overall - 25.0 / 256.0).abs() < 1e-4);
    assert!((fv.peak - 1.0).abs() < 1e-6);
    assert_eq!(fv.spectrum.len(), FREQUENCY_BIN_COUNT);
    assert_eq!(fv.spectrum[0], 255);
}

#[test]
fn energy_is_normalized_rms() {
    let fv = extract_features(&[255, 0, 255, 0]);
    let expected = (0.5f32).sqrt();
    assert!((fv.energy - expected).abs() < 1e-5);
    assert!((fv.overall - 0.5).abs() < 1e-6);
}

#[test]
fn raw_band_means_stay_unnormalized() {
    let mut bins = vec![0u8; 20];
    bins[0] = 200;
    bins[1] = 100;
    let fv = extract_features(&bins);
    // bass = bins [0, 2)
    assert!((fv.bass_raw - 150.0).abs() < 1e-4);
    assert!((fv.bass - 150.0 / 255.0).abs() < 1e-6);
}

#[test]
fn initialize_binds_once_then_only_resumes() {
    let first = FakeSource::default();
    let second = FakeSource::default();
    let mut extractor = AudioFeatureExtractor::new();
    extractor.initialize(Box::new(first.clone())).unwrap();
    extractor.initialize(Box::new(second.clone())).unwrap();
    extractor.initialize(Box::new(second.clone())).unwrap();

    let log = first.log.borrow();
    assert_eq!(log.connects, 1);
    assert_eq!(log.fft_size, FFT_SIZE);
    assert_eq!(log.resumes, 3);
    assert_eq!(second.log.borrow().connects, 0);
}

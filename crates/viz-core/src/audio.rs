//! Per-frame reduction of a live spectrum into shader-friendly features.

use crate::constants::{BASS_BAND_END, BYTE_MAX, FFT_SIZE, FREQUENCY_BIN_COUNT, MID_BAND_END};

/// Live audio input able to provide byte-quantized frequency magnitudes.
///
/// The web frontend backs this with a WebAudio `AnalyserNode`.
pub trait SignalSource {
    /// Bind an analyser with the given transform window to the signal.
    fn connect_analyser(&mut self, fft_size: usize) -> anyhow::Result<()>;
    /// Resume the underlying audio context if the host suspended it.
    fn resume_if_suspended(&mut self);
    /// Fill `out` with magnitudes (0..=255), ordered low to high frequency.
    fn read_byte_frequency_data(&mut self, out: &mut [u8]);
}

/// Audio summary for a single frame. All normalized fields are in [0, 1].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
    pub peak: f32,
    pub energy: f32,
    /// Band means before normalization (0..=255).
    pub bass_raw: f32,
    pub mid_raw: f32,
    pub treble_raw: f32,
    pub spectrum: Vec<u8>,
}

impl FeatureVector {
    /// The all-zero vector reported before any source is bound.
    pub fn silent() -> Self {
        Self::default()
    }
}

#[inline]
fn mean(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32
}

/// Band boundaries `(bass_end, mid_end)` for a buffer of `len` bins.
#[inline]
pub fn band_edges(len: usize) -> (usize, usize) {
    let bass_end = (len as f32 * BASS_BAND_END).floor() as usize;
    let mid_end = (len as f32 * MID_BAND_END).floor() as usize;
    (bass_end, mid_end)
}

/// Reduce one spectrum snapshot into a [`FeatureVector`].
pub fn extract_features(bins: &[u8]) -> FeatureVector {
    if bins.is_empty() {
        return FeatureVector::silent();
    }
    let (bass_end, mid_end) = band_edges(bins.len());
    let bass_raw = mean(&bins[..bass_end]);
    let mid_raw = mean(&bins[bass_end..mid_end]);
    let treble_raw = mean(&bins[mid_end..]);

    let overall = mean(bins);
    let peak = bins.iter().copied().max().unwrap_or(0) as f32;
    let mean_sq = bins.iter().map(|&b| (b as f32) * (b as f32)).sum::<f32>() / bins.len() as f32;
    let energy = mean_sq.sqrt();

    FeatureVector {
        bass: bass_raw / BYTE_MAX,
        mid: mid_raw / BYTE_MAX,
        treble: treble_raw / BYTE_MAX,
        overall: overall / BYTE_MAX,
        peak: peak / BYTE_MAX,
        energy: energy / BYTE_MAX,
        bass_raw,
        mid_raw,
        treble_raw,
        spectrum: bins.to_vec(),
    }
}

/// Owns the bound signal source and the reusable analysis buffer.
#[derive(Default)]
pub struct AudioFeatureExtractor {
    source: Option<Box<dyn SignalSource>>,
    buffer: Vec<u8>,
}

impl AudioFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.source.is_some()
    }

    /// Bind `source` on the first call; later calls only resume the bound
    /// context and drop the extra source.
    pub fn initialize(&mut self, source: Box<dyn SignalSource>) -> anyhow::Result<()> {
        if let Some(bound) = self.source.as_mut() {
            bound.resume_if_suspended();
            return Ok(());
        }
        let mut source = source;
        source.connect_analyser(FFT_SIZE)?;
        source.resume_if_suspended();
        self.buffer = vec![0; FREQUENCY_BIN_COUNT];
        self.source = Some(source);
        log::info!("[audio] analyser bound: fft={} bins={}", FFT_SIZE, FREQUENCY_BIN_COUNT);
        Ok(())
    }

    /// Resume the bound context without touching the analyser.
    pub fn resume(&mut self) -> bool {
        match self.source.as_mut() {
            Some(bound) => {
                bound.resume_if_suspended();
                true
            }
            None => false,
        }
    }

    pub fn sample(&mut self) -> FeatureVector {
        let Some(source) = self.source.as_mut() else {
            return FeatureVector::silent();
        };
        source.read_byte_frequency_data(&mut self.buffer);
        extract_features(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_floor_fractional_boundaries() {
        assert_eq!(band_edges(256), (25, 102));
        assert_eq!(band_edges(5), (0, 2));
    }

    #[test]
    fn empty_bass_band_reads_as_zero() {
        let fv = extract_features(&[255, 255, 255, 255, 255]);
        assert_eq!(fv.bass, 0.0);
        assert!((fv.mid - 1.0).abs() < 1e-6);
        assert!((fv.treble - 1.0).abs() < 1e-6);
    }
}

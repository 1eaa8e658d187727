//! Energy-based voice activity filtering.
//!
//! The buffer is cut into fixed frames and each frame's RMS energy is compared
//! against a threshold. Runs of loud frames become speech regions; regions that
//! are too short are dropped, the rest are padded and merged, and only their
//! samples are handed to the recognizer.

use std::ops::Range;

use tracing::debug;

use crate::audio::{SAMPLE_RATE, SampleBuffer};

/// VAD tuning parameters.
#[derive(Clone, Debug)]
pub struct VadConfig {
    /// RMS energy at or above which a frame counts as speech.
    pub energy_threshold: f32,
    /// Frame length in milliseconds.
    pub frame_ms: u32,
    /// Regions shorter than this are treated as noise.
    pub min_speech_ms: u32,
    /// Padding added to both sides of every kept region.
    pub speech_pad_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
            frame_ms: 30,
            min_speech_ms: 250,
            speech_pad_ms: 200,
        }
    }
}

impl VadConfig {
    fn samples_for(ms: u32) -> usize {
        (u64::from(ms) * u64::from(SAMPLE_RATE) / 1000) as usize
    }
}

/// Stateless voice activity filter.
#[derive(Clone, Debug, Default)]
pub struct VoiceActivityFilter {
    config: VadConfig,
}

impl VoiceActivityFilter {
    /// Create a filter with custom tuning.
    pub fn new(config: VadConfig) -> Self {
        Self { config }
    }

    /// Sample ranges that contain speech, padded and merged, in order.
    pub fn speech_regions(&self, samples: &[f32]) -> Vec<Range<usize>> {
        let frame_len = VadConfig::samples_for(self.config.frame_ms).max(1);
        let min_len = VadConfig::samples_for(self.config.min_speech_ms);
        let pad = VadConfig::samples_for(self.config.speech_pad_ms);

        let mut raw: Vec<Range<usize>> = Vec::new();
        let mut current: Option<usize> = None;
        for (i, frame) in samples.chunks(frame_len).enumerate() {
            let start = i * frame_len;
            if rms(frame) >= self.config.energy_threshold {
                let _ = current.get_or_insert(start);
            } else if let Some(begin) = current.take() {
                raw.push(begin..start);
            }
        }
        if let Some(begin) = current {
            raw.push(begin..samples.len());
        }

        let mut merged: Vec<Range<usize>> = Vec::new();
        for region in raw.into_iter().filter(|r| r.len() >= min_len) {
            let padded = region.start.saturating_sub(pad)..(region.end + pad).min(samples.len());
            match merged.last_mut() {
                Some(last) if padded.start <= last.end => last.end = last.end.max(padded.end),
                _ => merged.push(padded),
            }
        }
        merged
    }

    /// Keep only the speech samples of `buffer`. Returns an empty buffer when
    /// nothing loud enough was found.
    pub fn filter(&self, buffer: &SampleBuffer) -> SampleBuffer {
        let samples = buffer.samples();
        let regions = self.speech_regions(samples);
        let kept: Vec<f32> = regions
            .iter()
            .flat_map(|r| samples[r.clone()].iter().copied())
            .collect();
        debug!(
            regions = regions.len(),
            input_samples = samples.len(),
            kept_samples = kept.len(),
            "vad filter applied"
        );
        SampleBuffer::new(kept)
    }
}

/// Root mean square of a frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s * s).sum();
    (sum / frame.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: usize = 16; // samples per millisecond at 16kHz

    fn silence(ms: usize) -> Vec<f32> {
        vec![0.0; ms * MS]
    }

    fn tone(ms: usize) -> Vec<f32> {
        (0..ms * MS)
            .map(|i| 0.5 * (i as f32 * 440.0 * std::f32::consts::TAU / 16_000.0).sin())
            .collect()
    }

    fn concat(parts: &[Vec<f32>]) -> Vec<f32> {
        parts.concat()
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn silence_yields_nothing() {
        let vad = VoiceActivityFilter::default();
        let out = vad.filter(&SampleBuffer::new(silence(2000)));
        assert!(out.is_empty());
    }

    #[test]
    fn empty_input_yields_nothing() {
        let vad = VoiceActivityFilter::default();
        assert!(vad.speech_regions(&[]).is_empty());
        assert!(vad.filter(&SampleBuffer::empty()).is_empty());
    }

    #[test]
    fn speech_is_kept_with_padding() {
        let vad = VoiceActivityFilter::default();
        let samples = concat(&[silence(990), tone(990), silence(990)]);
        let regions = vad.speech_regions(&samples);
        assert_eq!(regions.len(), 1);
        // tone spans 990..1980ms; 200ms pad each side
        assert_eq!(regions[0], (790 * MS)..(2180 * MS));
    }

    #[test]
    fn short_bursts_are_dropped() {
        let vad = VoiceActivityFilter::default();
        let samples = concat(&[silence(600), tone(90), silence(600)]);
        assert!(vad.speech_regions(&samples).is_empty());
    }

    #[test]
    fn nearby_regions_merge() {
        let vad = VoiceActivityFilter::default();
        // 300ms gap is smaller than twice the 200ms pad
        let samples = concat(&[silence(600), tone(300), silence(300), tone(300), silence(600)]);
        let regions = vad.speech_regions(&samples);
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn distant_regions_stay_separate() {
        let vad = VoiceActivityFilter::default();
        let samples = concat(&[tone(300), silence(990), tone(300)]);
        let regions = vad.speech_regions(&samples);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].start, 0);
        assert_eq!(regions[1].end, samples.len());
    }

    #[test]
    fn continuous_speech_is_untouched() {
        let vad = VoiceActivityFilter::default();
        let samples = tone(1200);
        let out = vad.filter(&SampleBuffer::new(samples.clone()));
        assert_eq!(out.samples(), samples.as_slice());
    }

    #[test]
    fn threshold_is_configurable() {
        let quiet: Vec<f32> = tone(600).into_iter().map(|s| s * 0.01).collect();
        assert!(VoiceActivityFilter::default().speech_regions(&quiet).is_empty());

        let sensitive = VoiceActivityFilter::new(VadConfig {
            energy_threshold: 0.001,
            ..VadConfig::default()
        });
        assert_eq!(sensitive.speech_regions(&quiet).len(), 1);
    }
}

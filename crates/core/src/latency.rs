//! Latency bookkeeping for the reblocking pipeline.

use crate::constants::REFERENCE_SAMPLE_RATE;

/// Derives the fixed latency the pipeline reports to the host.
///
/// The transform runs on `frame_size` samples regardless of the host rate,
/// so the announced value is the frame scaled by `rate / 48000`, topped up to
/// at least one whole frame (the reblocking remainder) so the output side can
/// never overtake the transform. `extra_samples` adds delay on top, e.g. to
/// line an echo reference up with an upstream denoiser.
#[derive(Debug, Clone)]
pub struct LatencyAnnouncer {
    frame_size: usize,
    extra_samples: usize,
    sample_rate: f64,
    latency: usize,
}

impl LatencyAnnouncer {
    pub fn new(frame_size: usize, extra_samples: usize, sample_rate: f64) -> Self {
        Self {
            frame_size,
            extra_samples,
            sample_rate,
            latency: compute_latency(frame_size, extra_samples, sample_rate),
        }
    }

    /// Announced latency in samples.
    #[inline]
    pub fn samples(&self) -> usize {
        self.latency
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Recomputes for a new sample rate. Returns the new latency.
    pub fn sample_rate_changed(&mut self, sample_rate: f64) -> usize {
        self.sample_rate = sample_rate;
        self.latency = compute_latency(self.frame_size, self.extra_samples, sample_rate);
        self.latency
    }

    /// Ring capacity (in samples) that can hold the latency plus one frame in flight.
    pub fn ring_capacity(&self, min_frames: usize) -> usize {
        let frames = (self.latency + self.frame_size).div_ceil(self.frame_size);
        frames.max(min_frames).max(2) * self.frame_size
    }
}

fn compute_latency(frame_size: usize, extra_samples: usize, sample_rate: f64) -> usize {
    let block = frame_size + extra_samples;
    let scaled = (sample_rate / REFERENCE_SAMPLE_RATE * block as f64).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled as usize
    } else {
        0
    };
    scaled.max(block)
}

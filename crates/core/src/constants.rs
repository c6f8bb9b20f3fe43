//! Shared constants for Re:Nooice audio processing.

/// Sample rate the transform primitives are tuned for (48kHz)
pub const REFERENCE_SAMPLE_RATE: f64 = 48000.0;

/// Frame size in samples (10ms at 48kHz = 480 samples)
pub const FRAME_SIZE: usize = 480;

/// Scale between normalized float audio and the i16 domain RNNoise expects.
pub const DENOISE_SCALING: f32 = 32767.0;

/// Default length of the statistics window (1s of 10ms frames)
pub const STATS_WINDOW_FRAMES: usize = 100;

/// Default ramp time for the bypass crossfade and the auto-mute gain, in seconds.
pub const DEFAULT_RAMP_SECS: f64 = 0.02;

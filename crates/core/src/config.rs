//! Construction-time switches for the pipeline.

use crate::constants::{DEFAULT_RAMP_SECS, STATS_WINDOW_FRAMES};
use serde::{Deserialize, Serialize};

/// Selects which optional stages run and how they are tuned.
///
/// With every feature disabled the pipeline is a plain latency-compensated
/// reblocker around the transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ramp between dry and processed output when bypass changes.
    #[serde(default = "default_true")]
    pub enable_crossfade: bool,
    /// Auto-mute when the transform's activity score stays below threshold.
    #[serde(default = "default_true")]
    pub enable_gate: bool,
    /// Maintain the sliding activity statistics.
    #[serde(default = "default_true")]
    pub enable_stats: bool,
    /// Full-scale bypass crossfade time, seconds.
    #[serde(default = "default_ramp_secs")]
    pub bypass_ramp_secs: f64,
    /// Full-scale mute/unmute time, seconds.
    #[serde(default = "default_ramp_secs")]
    pub mute_ramp_secs: f64,
    /// Frames held by the statistics window.
    #[serde(default = "default_stats_window")]
    pub stats_window_frames: usize,
    /// Lower bound on ring capacity, in frames.
    #[serde(default = "default_ring_frames")]
    pub ring_frames: usize,
    /// Extra delay in samples at 48kHz, added to the announced latency.
    #[serde(default)]
    pub extra_latency: usize,
}

fn default_true() -> bool {
    true
}

fn default_ramp_secs() -> f64 {
    DEFAULT_RAMP_SECS
}

fn default_stats_window() -> usize {
    STATS_WINDOW_FRAMES
}

fn default_ring_frames() -> usize {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_crossfade: true,
            enable_gate: true,
            enable_stats: true,
            bypass_ramp_secs: default_ramp_secs(),
            mute_ramp_secs: default_ramp_secs(),
            stats_window_frames: default_stats_window(),
            ring_frames: default_ring_frames(),
            extra_latency: 0,
        }
    }
}

impl PipelineConfig {
    /// Reblocking only: no crossfade, gate or statistics.
    pub fn minimal() -> Self {
        Self {
            enable_crossfade: false,
            enable_gate: false,
            enable_stats: false,
            ..Self::default()
        }
    }
}

//! Fixed-frame transform primitives driven by the pipeline.
//!
//! A transform only ever sees complete frames of exactly
//! [`FrameTransform::frame_size`] samples. It keeps its own adaptive state
//! between calls; the pipeline owns it and rebuilds that state on activation.

mod denoise;
mod echo_cancel;
mod passthrough;

pub use denoise::RnnoiseTransform;
pub use echo_cancel::EchoCancelTransform;
pub use passthrough::Passthrough;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stateful block processor with a fixed frame length.
pub trait FrameTransform: Send {
    /// Exact number of samples per call.
    fn frame_size(&self) -> usize;

    /// Whether a second, lockstep reference input is consumed (echo cancellation).
    fn wants_reference(&self) -> bool {
        false
    }

    /// Processes one frame. Returns the activity score in `[0, 1]` when the
    /// transform produces one.
    fn process_frame(
        &mut self,
        input: &[f32],
        reference: Option<&[f32]>,
        output: &mut [f32],
    ) -> Option<f32>;

    /// Discards adaptive state. Called on activation, may allocate.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: FrameTransform + ?Sized> FrameTransform for Box<T> {
    fn frame_size(&self) -> usize {
        (**self).frame_size()
    }

    fn wants_reference(&self) -> bool {
        (**self).wants_reference()
    }

    fn process_frame(
        &mut self,
        input: &[f32],
        reference: Option<&[f32]>,
        output: &mut [f32],
    ) -> Option<f32> {
        (**self).process_frame(input, reference, output)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}

/// Selectable transform implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    /// RNNoise denoiser with voice-activity score.
    #[default]
    Denoise,
    /// WebRTC AEC3 echo canceller fed by a reference input.
    EchoCancel,
    /// Copies frames through unchanged; useful for latency checks.
    Passthrough,
}

impl TransformKind {
    pub fn build(self) -> Result<Box<dyn FrameTransform>> {
        Ok(match self {
            TransformKind::Denoise => Box::new(RnnoiseTransform::new()),
            TransformKind::EchoCancel => Box::new(EchoCancelTransform::new()?),
            TransformKind::Passthrough => Box::new(Passthrough::default()),
        })
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformKind::Denoise => "denoise",
            TransformKind::EchoCancel => "echo-cancel",
            TransformKind::Passthrough => "passthrough",
        })
    }
}

impl FromStr for TransformKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "denoise" => Ok(TransformKind::Denoise),
            "echo-cancel" => Ok(TransformKind::EchoCancel),
            "passthrough" => Ok(TransformKind::Passthrough),
            other => Err(anyhow::anyhow!("Unknown transform: {}", other)),
        }
    }
}

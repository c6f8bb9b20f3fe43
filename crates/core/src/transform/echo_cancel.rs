//! Echo cancellation transform.
//!
//! Uses the aec3 crate (Rust port of WebRTC AEC3) for acoustic echo cancellation.

use super::FrameTransform;
use crate::constants::{FRAME_SIZE, REFERENCE_SAMPLE_RATE};
use aec3::voip::VoipAec3;
use anyhow::{anyhow, Result};

/// Cancels the reference (far-end) signal out of the main input.
pub struct EchoCancelTransform {
    aec: VoipAec3,
    output_buffer: [f32; FRAME_SIZE], // Pre-allocated to avoid heap allocation
    silence: [f32; FRAME_SIZE],
}

// SAFETY: EchoCancelTransform exclusively owns its VoipAec3 instance and is only ever
// moved to the audio thread, never shared by reference across threads.
unsafe impl Send for EchoCancelTransform {}

fn build_aec() -> Result<VoipAec3> {
    VoipAec3::builder(REFERENCE_SAMPLE_RATE as usize, 1, 1)
        .build()
        .map_err(|e| anyhow!("Failed to initialize AEC3: {:?}", e))
}

impl EchoCancelTransform {
    pub fn new() -> Result<Self> {
        Ok(Self {
            aec: build_aec()?,
            output_buffer: [0.0; FRAME_SIZE],
            silence: [0.0; FRAME_SIZE],
        })
    }
}

impl FrameTransform for EchoCancelTransform {
    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }

    fn wants_reference(&self) -> bool {
        true
    }

    /// Falls back to copying the input if AEC3 reports an error.
    fn process_frame(
        &mut self,
        input: &[f32],
        reference: Option<&[f32]>,
        output: &mut [f32],
    ) -> Option<f32> {
        self.output_buffer.fill(0.0);
        let reference = reference.unwrap_or(&self.silence);

        // level_change = false, host gain changes are not tracked
        if let Err(e) = self
            .aec
            .process(input, Some(reference), false, &mut self.output_buffer)
        {
            log::warn!("AEC error: {:?}", e);
            output.copy_from_slice(input);
            return None;
        }

        output.copy_from_slice(&self.output_buffer);
        None
    }

    fn reset(&mut self) -> Result<()> {
        self.aec = build_aec()?;
        Ok(())
    }
}

//! RNNoise denoiser as a frame transform.

use super::FrameTransform;
use crate::constants::{DENOISE_SCALING, FRAME_SIZE};
use anyhow::Result;
use nnnoiseless::DenoiseState;

/// Wraps an nnnoiseless `DenoiseState`.
///
/// RNNoise works on 480-sample frames in the i16 value range, so input is
/// scaled up by 32767 and the output scaled back down. The returned score is
/// the model's voice-activity probability.
pub struct RnnoiseTransform {
    state: Box<DenoiseState<'static>>,
    scaled_in: [f32; FRAME_SIZE],
    scaled_out: [f32; FRAME_SIZE],
}

impl Default for RnnoiseTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl RnnoiseTransform {
    pub fn new() -> Self {
        Self {
            state: DenoiseState::new(),
            scaled_in: [0.0; FRAME_SIZE],
            scaled_out: [0.0; FRAME_SIZE],
        }
    }
}

impl FrameTransform for RnnoiseTransform {
    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }

    fn process_frame(
        &mut self,
        input: &[f32],
        _reference: Option<&[f32]>,
        output: &mut [f32],
    ) -> Option<f32> {
        debug_assert_eq!(input.len(), FRAME_SIZE);
        debug_assert_eq!(output.len(), FRAME_SIZE);

        for (dst, &src) in self.scaled_in.iter_mut().zip(input) {
            *dst = src * DENOISE_SCALING;
        }

        let vad = self
            .state
            .process_frame(&mut self.scaled_out, &self.scaled_in);

        let inv = 1.0 / DENOISE_SCALING;
        for (dst, &src) in output.iter_mut().zip(self.scaled_out.iter()) {
            *dst = src * inv;
        }

        Some(vad.clamp(0.0, 1.0))
    }

    fn reset(&mut self) -> Result<()> {
        self.state = DenoiseState::new();
        self.scaled_in.fill(0.0);
        self.scaled_out.fill(0.0);
        Ok(())
    }
}

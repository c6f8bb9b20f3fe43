use super::FrameTransform;
use crate::constants::FRAME_SIZE;

/// Identity transform with a configurable frame size.
#[derive(Debug, Clone)]
pub struct Passthrough {
    frame_size: usize,
}

impl Passthrough {
    pub fn new(frame_size: usize) -> Self {
        Self { frame_size }
    }
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::new(FRAME_SIZE)
    }
}

impl FrameTransform for Passthrough {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn process_frame(
        &mut self,
        input: &[f32],
        _reference: Option<&[f32]>,
        output: &mut [f32],
    ) -> Option<f32> {
        output.copy_from_slice(input);
        None
    }
}

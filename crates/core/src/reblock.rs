//! Frame reblocker for bridging variable-size host chunks to fixed-size transform frames.

/// Accumulates host-supplied chunks of any length into one fixed-size frame.
///
/// A frame is only ever handed out once it is completely filled; the fill
/// cursor then restarts at zero and the rest of the chunk feeds the next frame.
pub struct FrameReblocker {
    frame: Box<[f32]>,
    pos: usize,
}

impl FrameReblocker {
    /// Allocates the working buffer. Not real-time safe.
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame size must be non-zero");
        Self {
            frame: vec![0.0; frame_size].into_boxed_slice(),
            pos: 0,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame.len()
    }

    /// Samples collected for the frame in progress.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Space left before the current frame is full.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.frame.len() - self.pos
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.pos == self.frame.len()
    }

    /// Copies as much of `chunk` as fits into the current frame.
    /// Returns the number of samples consumed.
    pub fn fill(&mut self, chunk: &[f32]) -> usize {
        let count = chunk.len().min(self.remaining());
        self.frame[self.pos..self.pos + count].copy_from_slice(&chunk[..count]);
        self.pos += count;
        count
    }

    /// Pads the current frame with up to `count` zeros. Used when a lockstep
    /// input (e.g. the echo reference) is missing for a cycle.
    pub fn fill_silence(&mut self, count: usize) -> usize {
        let count = count.min(self.remaining());
        self.frame[self.pos..self.pos + count].fill(0.0);
        self.pos += count;
        count
    }

    /// Hands out the completed frame and rewinds the cursor.
    /// Returns `None` while the frame is still partially filled.
    pub fn take_frame(&mut self) -> Option<&[f32]> {
        if !self.is_full() {
            return None;
        }
        self.pos = 0;
        Some(&self.frame)
    }

    /// Feeds a whole chunk, calling `on_frame` once per completed frame.
    /// Returns the number of frames emitted.
    pub fn push<F>(&mut self, mut chunk: &[f32], mut on_frame: F) -> usize
    where
        F: FnMut(&[f32]),
    {
        let mut emitted = 0;
        while !chunk.is_empty() {
            let consumed = self.fill(chunk);
            chunk = &chunk[consumed..];
            if let Some(frame) = self.take_frame() {
                on_frame(frame);
                emitted += 1;
            }
        }
        emitted
    }

    /// Drops the partially filled frame.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.frame.fill(0.0);
    }
}

//! Sample ring with staged writes, on top of `ringbuf`.
//!
//! The producer half is frozen: [`SampleRing::write`] stages samples that only
//! become visible to [`SampleRing::read`] after [`SampleRing::commit`].
//! Capacity is fixed at creation, so the ring is safe to use from the audio
//! thread once allocated.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::wrap::FrozenProd;
use ringbuf::{HeapCons, HeapRb};
use std::sync::Arc;

/// Both ends of one `HeapRb<f32>`, driven from the same processing call.
///
/// Overrunning the free space or reading past the committed region is a
/// sizing bug in the caller: debug builds assert, release builds clamp to
/// what fits and zero-fill what is missing.
pub struct SampleRing {
    prod: FrozenProd<Arc<HeapRb<f32>>>,
    cons: HeapCons<f32>,
}

impl SampleRing {
    /// Allocates a ring holding `capacity` samples. Not real-time safe.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        let (prod, cons) = HeapRb::<f32>::new(capacity).split();
        Self {
            prod: prod.freeze(),
            cons,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cons.capacity().get()
    }

    /// Committed samples waiting to be read.
    #[inline]
    pub fn readable_len(&self) -> usize {
        self.cons.occupied_len()
    }

    /// Space left for staging, excluding samples staged but not yet committed.
    #[inline]
    pub fn writable_len(&self) -> usize {
        self.prod.fetch();
        self.prod.vacant_len()
    }

    /// Stages `samples` behind the committed region. Returns how many were staged.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let free = self.writable_len();
        debug_assert!(
            samples.len() <= free,
            "ring buffer overrun: writing {} with {} free",
            samples.len(),
            free
        );
        self.prod.push_slice(samples)
    }

    /// Publishes everything staged since the last commit.
    #[inline]
    pub fn commit(&mut self) {
        self.prod.commit();
    }

    /// Consumes `out.len()` samples from the oldest committed position.
    /// Returns the number of samples actually read; the rest of `out` is zeroed.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let count = self.cons.pop_slice(out);
        debug_assert!(
            count == out.len(),
            "ring buffer underrun: reading {} with {} readable",
            out.len(),
            count
        );
        out[count..].fill(0.0);
        count
    }

    /// Discards `count` committed samples, keeping this ring in step with a sibling.
    pub fn skip(&mut self, count: usize) -> usize {
        let skipped = self.cons.skip(count);
        debug_assert!(
            skipped == count,
            "ring buffer underrun: skipping {} with {} readable",
            count,
            skipped
        );
        skipped
    }

    /// Drops all staged and committed data.
    pub fn clear(&mut self) {
        self.prod.discard();
        self.cons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_data_is_invisible_until_commit() {
        let mut rb = SampleRing::new(8);
        assert_eq!(rb.write(&[1.0, 2.0, 3.0]), 3);
        assert_eq!(rb.readable_len(), 0);
        assert_eq!(rb.writable_len(), 5);

        rb.commit();
        assert_eq!(rb.readable_len(), 3);
    }

    #[test]
    fn test_read_in_fifo_order() {
        let mut rb = SampleRing::new(8);
        rb.write(&[1.0, 2.0, 3.0, 4.0]);
        rb.commit();

        let mut out = [0.0f32; 3];
        assert_eq!(rb.read(&mut out), 3);
        assert_eq!(out, [1.0, 2.0, 3.0]);
        assert_eq!(rb.readable_len(), 1);
    }

    #[test]
    fn test_wraps_around_capacity() {
        let mut rb = SampleRing::new(6);
        let mut out = [0.0f32; 4];

        rb.write(&[1.0, 2.0, 3.0, 4.0]);
        rb.commit();
        rb.read(&mut out);

        // Write crosses the end of the storage
        rb.write(&[5.0, 6.0, 7.0, 8.0]);
        rb.commit();
        assert_eq!(rb.readable_len(), 4);

        assert_eq!(rb.read(&mut out), 4);
        assert_eq!(out, [5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_reads_free_space_for_the_next_write() {
        let mut rb = SampleRing::new(4);
        rb.write(&[1.0; 4]);
        rb.commit();
        assert_eq!(rb.writable_len(), 0);

        let mut out = [0.0f32; 4];
        rb.read(&mut out);
        assert_eq!(rb.writable_len(), 4);
        assert_eq!(rb.write(&[2.0; 4]), 4);
    }

    #[test]
    fn test_skip_advances_like_read() {
        let mut rb = SampleRing::new(8);
        rb.write(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        rb.commit();

        assert_eq!(rb.skip(2), 2);
        let mut out = [0.0f32; 3];
        rb.read(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut rb = SampleRing::new(4);
        rb.write(&[1.0, 2.0]);
        rb.commit();
        rb.write(&[3.0]);
        rb.clear();

        assert_eq!(rb.readable_len(), 0);
        assert_eq!(rb.writable_len(), 4);
    }

    #[test]
    #[should_panic(expected = "ring buffer underrun")]
    #[cfg(debug_assertions)]
    fn test_over_read_asserts_in_debug() {
        let mut rb = SampleRing::new(4);
        let mut out = [0.0f32; 2];
        rb.read(&mut out);
    }
}

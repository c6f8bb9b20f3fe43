//! Voice-activity gate with a grace period.
//!
//! Drives the auto-mute smoother: the gate stays open while the activity
//! score is at or above the threshold, and holds open for a grace period
//! after it drops, so brief dips do not cause mute/unmute chatter.

/// Converts a grace period in milliseconds to samples at `sample_rate`.
pub fn grace_period_samples(ms: f32, sample_rate: f64) -> u32 {
    let samples = (f64::from(ms.max(0.0)) * sample_rate / 1000.0).round();
    samples.min(f64::from(u32::MAX)) as u32
}

/// Hysteresis state machine over a per-frame activity score.
#[derive(Debug, Clone)]
pub struct VadGate {
    threshold: f32,
    grace_samples: u32,
    remaining: u32,
    active: bool,
}

impl VadGate {
    /// New gate, open, with a full grace period ahead of it.
    pub fn new(threshold: f32, grace_samples: u32) -> Self {
        Self {
            threshold,
            grace_samples,
            remaining: grace_samples,
            active: true,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn grace_samples(&self) -> u32 {
        self.grace_samples
    }

    /// Samples left before a below-threshold signal mutes.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Changes the grace period; an in-flight countdown is shortened if needed.
    pub fn set_grace_period(&mut self, grace_samples: u32) {
        self.grace_samples = grace_samples;
        self.remaining = self.remaining.min(grace_samples);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Gain the mute smoother should head toward.
    #[inline]
    pub fn target_gain(&self) -> f32 {
        if self.active {
            1.0
        } else {
            0.0
        }
    }

    /// Feeds the score of one processed frame of `frame_len` samples.
    /// Returns whether the gate is open afterwards.
    pub fn update(&mut self, score: f32, frame_len: usize) -> bool {
        if score >= self.threshold {
            self.active = true;
            self.remaining = self.grace_samples;
        } else if self.grace_samples == 0 || self.remaining == 0 {
            self.active = false;
        } else {
            let frame_len = u32::try_from(frame_len).unwrap_or(u32::MAX);
            self.remaining = self.remaining.saturating_sub(frame_len);
        }
        self.active
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        self.active = true;
        self.remaining = self.grace_samples;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 480;

    #[test]
    fn test_grace_period_conversion() {
        assert_eq!(grace_period_samples(0.0, 48000.0), 0);
        assert_eq!(grace_period_samples(10.0, 48000.0), 480);
        assert_eq!(grace_period_samples(1000.0, 44100.0), 44100);
        assert_eq!(grace_period_samples(-5.0, 48000.0), 0);
    }

    #[test]
    fn test_holds_open_for_exactly_grace_frames() {
        let mut gate = VadGate::new(0.5, 5 * FRAME as u32);
        assert!(gate.update(0.9, FRAME));

        for frame in 1..=5 {
            assert!(
                gate.update(0.1, FRAME),
                "gate closed early on frame {}",
                frame
            );
            assert_eq!(gate.target_gain(), 1.0);
        }
        assert!(!gate.update(0.1, FRAME), "gate should close on 6th frame");
        assert_eq!(gate.target_gain(), 0.0);
    }

    #[test]
    fn test_zero_grace_mutes_immediately() {
        let mut gate = VadGate::new(0.5, 0);
        assert!(gate.update(0.6, FRAME));
        assert!(!gate.update(0.4, FRAME));
    }

    #[test]
    fn test_score_at_threshold_counts_as_active() {
        let mut gate = VadGate::new(0.5, 0);
        assert!(gate.update(0.5, FRAME));
    }

    #[test]
    fn test_brief_dip_does_not_close() {
        let mut gate = VadGate::new(0.5, 3 * FRAME as u32);
        gate.update(0.9, FRAME);
        gate.update(0.2, FRAME);
        gate.update(0.2, FRAME);
        // Voice returns before the countdown runs out
        assert!(gate.update(0.8, FRAME));
        assert_eq!(gate.remaining(), 3 * FRAME as u32);
        for _ in 0..3 {
            assert!(gate.update(0.0, FRAME));
        }
        assert!(!gate.update(0.0, FRAME));
    }

    #[test]
    fn test_countdown_is_per_sample() {
        // A grace period shorter than a frame still holds for one frame
        let mut gate = VadGate::new(0.5, 100);
        gate.update(0.9, FRAME);
        assert!(gate.update(0.0, FRAME));
        assert_eq!(gate.remaining(), 0);
        assert!(!gate.update(0.0, FRAME));
    }

    #[test]
    fn test_reopens_after_closing() {
        let mut gate = VadGate::new(0.5, 0);
        gate.update(0.0, FRAME);
        assert!(!gate.is_active());
        assert!(gate.update(0.7, FRAME));
    }

    #[test]
    fn test_shrinking_grace_period_clamps_countdown() {
        let mut gate = VadGate::new(0.5, 10 * FRAME as u32);
        gate.update(0.9, FRAME);
        gate.set_grace_period(FRAME as u32);
        assert_eq!(gate.remaining(), FRAME as u32);
        assert!(gate.update(0.0, FRAME));
        assert!(!gate.update(0.0, FRAME));
    }
}

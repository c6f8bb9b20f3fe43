//! Linear value smoothing for click-free gain changes.
//!
//! [`LinearSmoother`] ramps a gain in `[0, 1]` toward a target by a fixed
//! step per sample. A full-scale ramp takes `time_constant × sample_rate`
//! samples; shorter distances take proportionally fewer. Retargeting mid-ramp
//! continues from the current value, so there is never a jump.

/// Tolerance used when rounding sample counts that should be integral.
const SAMPLE_COUNT_EPSILON: f64 = 1e-6;

/// Linear ramp between gain values, advanced once per output sample.
#[derive(Debug, Clone)]
pub struct LinearSmoother {
    time_constant: f64,
    sample_rate: f64,

    current: f32,
    target: f32,

    // Samples needed for a full 0 -> 1 ramp, and the matching step
    ramp_samples: u32,
    step: f32,
    steps_remaining: u32,
}

impl LinearSmoother {
    /// Creates a smoother resting at `initial`.
    ///
    /// `time_constant` is the duration of a full-scale ramp in seconds.
    pub fn new(time_constant: f64, sample_rate: f64, initial: f32) -> Self {
        let initial = initial.clamp(0.0, 1.0);
        let mut smoother = Self {
            time_constant,
            sample_rate,
            current: initial,
            target: initial,
            ramp_samples: 0,
            step: 1.0,
            steps_remaining: 0,
        };
        smoother.recompute_step();
        smoother
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True while `current` has not yet reached `target`.
    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.current != self.target
    }

    /// Samples needed for a full-scale ramp at the current sample rate.
    pub fn ramp_samples(&self) -> u32 {
        self.ramp_samples
    }

    /// Moves the target without touching `current`.
    pub fn set_target(&mut self, target: f32) {
        let target = target.clamp(0.0, 1.0);
        if target == self.target {
            return;
        }
        self.target = target;
        self.steps_remaining = self.steps_for_distance();
        if self.steps_remaining == 0 {
            self.current = target;
        }
    }

    /// Jumps straight to `value` with no ramp.
    pub fn reset(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        self.current = value;
        self.target = value;
        self.steps_remaining = 0;
    }

    /// Recomputes the per-sample step. Must not run concurrently with [`next`](Self::next).
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.recompute_step();
        if self.is_ramping() {
            self.steps_remaining = self.steps_for_distance();
        }
    }

    /// Advances one sample and returns the new current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.steps_remaining > 0 {
            self.steps_remaining -= 1;
            if self.steps_remaining == 0 {
                self.current = self.target;
            } else if self.current < self.target {
                self.current = (self.current + self.step).min(self.target);
            } else {
                self.current = (self.current - self.step).max(self.target);
            }
        }
        self.current
    }

    fn recompute_step(&mut self) {
        let samples = round_up_samples(self.time_constant * self.sample_rate);
        self.ramp_samples = samples.min(u32::MAX as f64) as u32;
        self.step = if self.ramp_samples == 0 {
            1.0
        } else {
            1.0 / self.ramp_samples as f32
        };
    }

    fn steps_for_distance(&self) -> u32 {
        let distance = f64::from((self.target - self.current).abs());
        round_up_samples(distance * f64::from(self.ramp_samples)) as u32
    }
}

/// `ceil`, but values within rounding noise of an integer snap to it.
fn round_up_samples(samples: f64) -> f64 {
    if !samples.is_finite() || samples <= 0.0 {
        return 0.0;
    }
    let nearest = samples.round();
    if (samples - nearest).abs() < SAMPLE_COUNT_EPSILON {
        nearest
    } else {
        samples.ceil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaches_target_after_time_constant() {
        let mut smoother = LinearSmoother::new(0.02, 48000.0, 0.0);
        assert_eq!(smoother.ramp_samples(), 960);

        smoother.set_target(1.0);
        let mut previous = 0.0;
        for i in 0..960 {
            let value = smoother.next();
            assert!(value <= 1.0, "overshoot at step {}: {}", i, value);
            assert!(value >= previous, "ramp must be monotonic");
            previous = value;
        }
        assert_eq!(smoother.current(), 1.0);
        assert!(!smoother.is_ramping());
    }

    #[test]
    fn test_is_still_ramping_one_sample_early() {
        let mut smoother = LinearSmoother::new(0.02, 48000.0, 0.0);
        smoother.set_target(1.0);
        for _ in 0..959 {
            smoother.next();
        }
        assert!(smoother.is_ramping());
        assert!(smoother.current() < 1.0);
    }

    #[test]
    fn test_ramp_down_never_undershoots() {
        let mut smoother = LinearSmoother::new(0.01, 48000.0, 1.0);
        smoother.set_target(0.0);
        for _ in 0..1000 {
            let value = smoother.next();
            assert!(value >= 0.0);
        }
        assert_eq!(smoother.current(), 0.0);
    }

    #[test]
    fn test_retarget_mid_ramp_is_continuous() {
        let mut smoother = LinearSmoother::new(0.02, 48000.0, 0.0);
        smoother.set_target(1.0);
        for _ in 0..480 {
            smoother.next();
        }
        let midway = smoother.current();
        assert!((midway - 0.5).abs() < 1e-3);

        smoother.set_target(0.0);
        assert_eq!(smoother.current(), midway, "retarget must not jump");
        let next = smoother.next();
        assert!(next < midway && midway - next < 0.002);

        // Roughly half a full ramp back down
        let mut steps = 1;
        while smoother.is_ramping() && steps < 2000 {
            smoother.next();
            steps += 1;
        }
        assert!((480..=481).contains(&steps), "took {} steps", steps);
        assert_eq!(smoother.current(), 0.0);
    }

    #[test]
    fn test_partial_distance_uses_proportional_steps() {
        let mut smoother = LinearSmoother::new(0.02, 48000.0, 0.0);
        smoother.set_target(0.25);
        for _ in 0..240 {
            smoother.next();
        }
        assert_eq!(smoother.current(), 0.25);
    }

    #[test]
    fn test_zero_time_constant_jumps() {
        let mut smoother = LinearSmoother::new(0.0, 48000.0, 0.0);
        smoother.set_target(1.0);
        assert_eq!(smoother.current(), 1.0);
        assert_eq!(smoother.next(), 1.0);
    }

    #[test]
    fn test_sample_rate_change_rescales_ramp() {
        let mut smoother = LinearSmoother::new(0.02, 48000.0, 0.0);
        smoother.set_sample_rate(96000.0);
        assert_eq!(smoother.ramp_samples(), 1920);

        smoother.set_target(1.0);
        for _ in 0..1919 {
            smoother.next();
        }
        assert!(smoother.is_ramping());
        smoother.next();
        assert_eq!(smoother.current(), 1.0);
    }

    #[test]
    fn test_targets_are_clamped() {
        let mut smoother = LinearSmoother::new(0.001, 48000.0, 0.5);
        smoother.set_target(4.0);
        assert_eq!(smoother.target(), 1.0);
        smoother.reset(-1.0);
        assert_eq!(smoother.current(), 0.0);
    }
}

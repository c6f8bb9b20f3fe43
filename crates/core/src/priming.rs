//! Warm-up gate that withholds output until the pipeline is primed.

/// Lifecycle phase of one activation. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Emitting silence while the first processed frame is produced.
    Priming,
    /// Reading real output from the rings.
    Steady,
}

/// Decides how much of each output slice is silence.
///
/// While priming, every slice is silent. The gate flips to steady on the
/// first slice where the output ring holds a whole frame and the silence
/// emitted so far plus this slice reaches the announced latency. On that
/// slice only the remaining deficit is silent, so the output lags the input
/// by exactly `latency` samples however the host chunks its cycles.
#[derive(Debug, Clone)]
pub struct PrimingGate {
    phase: PipelinePhase,
    latency: usize,
    frame_size: usize,
    silence_emitted: usize,
}

impl PrimingGate {
    pub fn new(latency: usize, frame_size: usize) -> Self {
        debug_assert!(latency >= frame_size, "latency must cover one frame");
        Self {
            phase: PipelinePhase::Priming,
            latency,
            frame_size,
            silence_emitted: 0,
        }
    }

    #[inline]
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Silent samples emitted during this activation.
    pub fn silence_emitted(&self) -> usize {
        self.silence_emitted
    }

    /// Plans an output slice of `len` samples given the output ring's
    /// readable sample count. Returns how many leading samples must be silent;
    /// the rest are read from the rings.
    pub fn begin_slice(&mut self, len: usize, readable: usize) -> usize {
        match self.phase {
            PipelinePhase::Steady => 0,
            PipelinePhase::Priming => {
                let deficit = self.latency - self.silence_emitted;
                if readable >= self.frame_size && deficit <= len {
                    self.phase = PipelinePhase::Steady;
                    self.silence_emitted = self.latency;
                    log::debug!(
                        "Pipeline primed after {} samples of silence",
                        self.latency
                    );
                    deficit
                } else {
                    self.silence_emitted = (self.silence_emitted + len).min(self.latency);
                    len
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.phase = PipelinePhase::Priming;
        self.silence_emitted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_until_frame_available() {
        let mut gate = PrimingGate::new(480, 480);
        assert_eq!(gate.begin_slice(64, 0), 64);
        assert_eq!(gate.begin_slice(64, 0), 64);
        assert_eq!(gate.phase(), PipelinePhase::Priming);
        assert_eq!(gate.silence_emitted(), 128);
    }

    #[test]
    fn test_transition_emits_remaining_deficit() {
        let mut gate = PrimingGate::new(480, 480);
        for _ in 0..7 {
            assert_eq!(gate.begin_slice(64, 0), 64);
        }
        // 448 silent so far, frame ready: 32 more silent samples then real output
        assert_eq!(gate.begin_slice(32, 480), 32);
        assert_eq!(gate.phase(), PipelinePhase::Steady);
        assert_eq!(gate.begin_slice(32, 448), 0);
    }

    #[test]
    fn test_waits_for_full_latency_when_larger_than_frame() {
        let mut gate = PrimingGate::new(960, 480);
        assert_eq!(gate.begin_slice(480, 480), 480);
        assert_eq!(gate.phase(), PipelinePhase::Priming);
        assert_eq!(gate.begin_slice(480, 960), 480);
        assert_eq!(gate.phase(), PipelinePhase::Steady);
        assert_eq!(gate.begin_slice(480, 960), 0);
    }

    #[test]
    fn test_never_reverts_to_priming() {
        let mut gate = PrimingGate::new(480, 480);
        gate.begin_slice(480, 480);
        assert_eq!(gate.phase(), PipelinePhase::Steady);
        assert_eq!(gate.begin_slice(100, 0), 0);
        assert_eq!(gate.phase(), PipelinePhase::Steady);

        gate.reset();
        assert_eq!(gate.phase(), PipelinePhase::Priming);
    }
}

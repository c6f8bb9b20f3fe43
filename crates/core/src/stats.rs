//! Sliding-window statistics over per-frame activity scores.
//!
//! Uses a fixed-size ring (allocated once) to avoid allocations on the audio
//! thread. Aggregates are only published once the window has filled.

/// Percentage view of the window, as reported to the control path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub current: f32,
    pub average: f32,
    pub minimum: f32,
    pub maximum: f32,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self {
            current: 0.0,
            average: 0.0,
            minimum: 100.0,
            maximum: 0.0,
        }
    }
}

/// Bounded circular window of scalar samples in `[0, 1]`.
pub struct StatsWindow {
    values: Box<[f32]>,
    cursor: usize,
    running: bool,
    avg: f32,
    min: f32,
    max: f32,
}

impl StatsWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "stats window needs at least one slot");
        Self {
            values: vec![0.0; capacity].into_boxed_slice(),
            cursor: 0,
            running: false,
            avg: 0.0,
            min: 1.0,
            max: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// True once the window has wrapped at least once.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn average(&self) -> f32 {
        self.avg
    }

    pub fn minimum(&self) -> f32 {
        self.min
    }

    pub fn maximum(&self) -> f32 {
        self.max
    }

    /// Appends a value; recomputes the aggregates while running.
    pub fn store(&mut self, value: f32) {
        self.values[self.cursor] = value;
        self.cursor += 1;
        if self.cursor == self.values.len() {
            self.cursor = 0;
            self.running = true;
        }
        if self.running {
            self.recompute();
        }
    }

    /// Forgets every stored value and the cached aggregates.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.cursor = 0;
        self.running = false;
        self.avg = 0.0;
        self.min = 1.0;
        self.max = 0.0;
    }

    /// Aggregates scaled to percent, with `current` as the latest score.
    pub fn snapshot(&self, current: f32) -> StatsSnapshot {
        StatsSnapshot {
            current: current * 100.0,
            average: self.avg * 100.0,
            minimum: self.min * 100.0,
            maximum: self.max * 100.0,
        }
    }

    fn recompute(&mut self) {
        let mut sum = 0.0f32;
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in self.values.iter() {
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        self.avg = sum / self.values.len() as f32;
        self.min = min;
        self.max = max;
    }
}

/// Follows a boolean toggle through the generation counter its writer bumps
/// on every change, so an off/on pair between two reads still registers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleEdge {
    seen: u32,
    state: bool,
}

impl ToggleEdge {
    pub fn new(generation: u32, state: bool) -> Self {
        Self {
            seen: generation,
            state,
        }
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Returns true once for every generation not yet seen, even when the
    /// toggle ended up back in its previous state.
    pub fn changed(&mut self, generation: u32, now: bool) -> bool {
        self.state = now;
        if generation == self.seen {
            return false;
        }
        self.seen = generation;
        true
    }
}

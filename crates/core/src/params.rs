//! Parameter table and the shared, lock-free parameter record.
//!
//! The control path (host automation, CLI, config) writes scalar values while
//! the audio thread reads them once per cycle. Each field is an independent
//! atomic scalar; no update needs consistency across fields.

use crate::stats::StatsSnapshot;
use std::sync::atomic::{AtomicU32, Ordering};

/// Every parameter the pipeline exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Bypass,
    Threshold,
    GracePeriod,
    EnableStats,
    StatCurrent,
    StatAverage,
    StatMinimum,
    StatMaximum,
}

/// Static description of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInfo {
    pub name: &'static str,
    pub symbol: &'static str,
    pub unit: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub automatable: bool,
    pub output_only: bool,
    pub boolean: bool,
}

impl ParamInfo {
    const fn input(name: &'static str, symbol: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            symbol,
            unit,
            default: 0.0,
            min: 0.0,
            max: 1.0,
            automatable: true,
            output_only: false,
            boolean: false,
        }
    }

    const fn meter(name: &'static str, symbol: &'static str, default: f32) -> Self {
        Self {
            name,
            symbol,
            unit: "%",
            default,
            min: 0.0,
            max: 100.0,
            automatable: false,
            output_only: true,
            boolean: false,
        }
    }

    /// Clamps `value` into range, snapping booleans to 0 or 1.
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.default } else { value };
        let value = value.clamp(self.min, self.max);
        if self.boolean {
            if value > 0.5 {
                1.0
            } else {
                0.0
            }
        } else {
            value
        }
    }
}

impl ParamId {
    pub const ALL: [ParamId; 8] = [
        ParamId::Bypass,
        ParamId::Threshold,
        ParamId::GracePeriod,
        ParamId::EnableStats,
        ParamId::StatCurrent,
        ParamId::StatAverage,
        ParamId::StatMinimum,
        ParamId::StatMaximum,
    ];

    pub const fn info(self) -> ParamInfo {
        match self {
            ParamId::Bypass => ParamInfo::input("Bypass", "bypass", ""),
            ParamId::Threshold => ParamInfo {
                default: 0.6,
                ..ParamInfo::input("Threshold", "threshold", "")
            },
            ParamId::GracePeriod => ParamInfo {
                max: 1000.0,
                ..ParamInfo::input("Grace Period", "grace_period", "ms")
            },
            ParamId::EnableStats => ParamInfo {
                automatable: false,
                boolean: true,
                ..ParamInfo::input("Enable Stats", "enable_stats", "")
            },
            ParamId::StatCurrent => ParamInfo::meter("VAD Current", "stat_current", 0.0),
            ParamId::StatAverage => ParamInfo::meter("VAD Average", "stat_average", 0.0),
            ParamId::StatMinimum => ParamInfo::meter("VAD Minimum", "stat_minimum", 100.0),
            ParamId::StatMaximum => ParamInfo::meter("VAD Maximum", "stat_maximum", 0.0),
        }
    }

    /// Looks a parameter up by its symbol.
    pub fn from_symbol(symbol: &str) -> Option<ParamId> {
        Self::ALL.into_iter().find(|id| id.info().symbol == symbol)
    }
}

/// Named-field parameter record shared between the control and audio threads.
#[derive(Debug)]
pub struct Parameters {
    /// Bumped on every change of `enable_stats`
    stats_generation: AtomicU32,
    bypass: AtomicU32,
    threshold: AtomicU32,
    grace_period: AtomicU32,
    enable_stats: AtomicU32,
    stat_current: AtomicU32,
    stat_average: AtomicU32,
    stat_minimum: AtomicU32,
    stat_maximum: AtomicU32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameters {
    pub fn new() -> Self {
        let default = |id: ParamId| AtomicU32::new(id.info().default.to_bits());
        Self {
            stats_generation: AtomicU32::new(0),
            bypass: default(ParamId::Bypass),
            threshold: default(ParamId::Threshold),
            grace_period: default(ParamId::GracePeriod),
            enable_stats: default(ParamId::EnableStats),
            stat_current: default(ParamId::StatCurrent),
            stat_average: default(ParamId::StatAverage),
            stat_minimum: default(ParamId::StatMinimum),
            stat_maximum: default(ParamId::StatMaximum),
        }
    }

    fn slot(&self, id: ParamId) -> &AtomicU32 {
        match id {
            ParamId::Bypass => &self.bypass,
            ParamId::Threshold => &self.threshold,
            ParamId::GracePeriod => &self.grace_period,
            ParamId::EnableStats => &self.enable_stats,
            ParamId::StatCurrent => &self.stat_current,
            ParamId::StatAverage => &self.stat_average,
            ParamId::StatMinimum => &self.stat_minimum,
            ParamId::StatMaximum => &self.stat_maximum,
        }
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.slot(id).load(Ordering::Relaxed))
    }

    /// Writes an input parameter, clamped to its range.
    /// Returns false (and changes nothing) for output-only parameters.
    pub fn set(&self, id: ParamId, value: f32) -> bool {
        let info = id.info();
        if info.output_only {
            return false;
        }
        let bits = info.clamp(value).to_bits();
        let previous = self.slot(id).swap(bits, Ordering::Relaxed);
        if id == ParamId::EnableStats && previous != bits {
            self.stats_generation.fetch_add(1, Ordering::Release);
        }
        true
    }

    /// Counts changes of the stats toggle, including ones undone before the
    /// audio thread looked.
    pub fn stats_generation(&self) -> u32 {
        self.stats_generation.load(Ordering::Acquire)
    }

    pub fn stats_enabled(&self) -> bool {
        self.get(ParamId::EnableStats) > 0.5
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            current: self.get(ParamId::StatCurrent),
            average: self.get(ParamId::StatAverage),
            minimum: self.get(ParamId::StatMinimum),
            maximum: self.get(ParamId::StatMaximum),
        }
    }

    pub(crate) fn publish_current(&self, current_percent: f32) {
        self.stat_current
            .store(current_percent.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn publish_stats(&self, snapshot: &StatsSnapshot) {
        self.stat_current
            .store(snapshot.current.to_bits(), Ordering::Relaxed);
        self.stat_average
            .store(snapshot.average.to_bits(), Ordering::Relaxed);
        self.stat_minimum
            .store(snapshot.minimum.to_bits(), Ordering::Relaxed);
        self.stat_maximum
            .store(snapshot.maximum.to_bits(), Ordering::Relaxed);
    }
}

//! Real-time reblocking pipeline.
//!
//! Host chunks of any length go through a [`FrameReblocker`] into the
//! transform. Each processed frame is gain-gated and staged into the output
//! ring while the unprocessed frame goes into a dry ring of the same size.
//! The consumer side reads both rings in lockstep, crossfading between them
//! when bypass changes, and emits silence until the pipeline is primed.
//!
//! Everything in [`Lifecycle::process_cycle`] is allocation- and lock-free.
//! Buffers are created in [`Lifecycle::on_activate`] and dropped in
//! [`Lifecycle::on_deactivate`].

use crate::config::PipelineConfig;
use crate::latency::LatencyAnnouncer;
use crate::params::{ParamId, Parameters};
use crate::priming::{PipelinePhase, PrimingGate};
use crate::reblock::FrameReblocker;
use crate::ring_buffer::SampleRing;
use crate::smoother::LinearSmoother;
use crate::stats::{StatsSnapshot, StatsWindow, ToggleEdge};
use crate::transform::FrameTransform;
use crate::vad_gate::{grace_period_samples, VadGate};
use anyhow::{Context, Result};
use crossbeam_channel::{Sender, TrySendError};
use log::{info, warn};
use std::sync::Arc;

/// Host-facing lifecycle of a processing unit.
pub trait Lifecycle {
    /// Allocates buffers and resets all state machines. Not real-time safe.
    fn on_activate(&mut self) -> Result<()>;

    /// Releases the buffers allocated by `on_activate`.
    fn on_deactivate(&mut self);

    /// Recomputes rate-dependent state and the announced latency. Never called
    /// concurrently with processing.
    ///
    /// Ring sizes depend on the latency, so an active unit is re-activated in
    /// place: buffers are reallocated, the transform is reset and output is
    /// primed again. Hosts should re-read `latency_samples` afterwards.
    fn sample_rate_changed(&mut self, sample_rate: f64) -> Result<()>;

    /// Processes one host cycle. `output` receives exactly `input.len()` samples.
    fn process_cycle(&mut self, input: &[f32], reference: Option<&[f32]>, output: &mut [f32]);

    fn get_parameter(&self, id: ParamId) -> f32;

    /// Writes an input parameter. Output-only parameters are ignored.
    fn set_parameter(&self, id: ParamId, value: f32);

    /// Latency to report to the host, in samples.
    fn latency_samples(&self) -> usize;
}

/// Per-activation processing state. Everything here is preallocated.
struct Engine {
    reblock: FrameReblocker,
    reference: Option<FrameReblocker>,
    wet: Box<[f32]>,
    dry_scratch: Box<[f32]>,
    out_ring: SampleRing,
    dry_ring: SampleRing,
    priming: PrimingGate,
    bypass: LinearSmoother,
    mute: LinearSmoother,
    gate: VadGate,
    stats: StatsWindow,
    stats_toggle: ToggleEdge,
}

/// Reblocking pipeline around a fixed-frame transform.
pub struct Pipeline<T: FrameTransform> {
    config: PipelineConfig,
    params: Arc<Parameters>,
    transform: T,
    frame_size: usize,
    sample_rate: f64,
    latency: LatencyAnnouncer,
    engine: Option<Engine>,
    stats_sender: Option<Sender<StatsSnapshot>>,
}

impl<T: FrameTransform> Pipeline<T> {
    /// Creates an inactive pipeline. Call [`Lifecycle::on_activate`] before processing.
    pub fn new(transform: T, config: PipelineConfig, sample_rate: f64) -> Self {
        let frame_size = transform.frame_size();
        let latency = LatencyAnnouncer::new(frame_size, config.extra_latency, sample_rate);
        Self {
            config,
            params: Arc::new(Parameters::new()),
            transform,
            frame_size,
            sample_rate,
            latency,
            engine: None,
            stats_sender: None,
        }
    }

    /// Shares an existing parameter record instead of the pipeline's own.
    pub fn with_parameters(mut self, params: Arc<Parameters>) -> Self {
        self.params = params;
        self
    }

    /// Handle for the control path.
    pub fn parameters(&self) -> Arc<Parameters> {
        self.params.clone()
    }

    /// Forwards a snapshot per processed frame while statistics are enabled.
    pub fn set_stats_sender(&mut self, sender: Option<Sender<StatsSnapshot>>) {
        self.stats_sender = sender;
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    /// Current phase, or `None` while deactivated.
    pub fn phase(&self) -> Option<PipelinePhase> {
        self.engine.as_ref().map(|engine| engine.priming.phase())
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    fn build_engine(&self) -> Engine {
        let n = self.frame_size;
        let capacity = self.latency.ring_capacity(self.config.ring_frames);
        let sample_rate = self.sample_rate;
        let stats_generation = self.params.stats_generation();
        let stats_enabled = self.params.stats_enabled();

        Engine {
            reblock: FrameReblocker::new(n),
            reference: self
                .transform
                .wants_reference()
                .then(|| FrameReblocker::new(n)),
            wet: vec![0.0; n].into_boxed_slice(),
            dry_scratch: vec![0.0; n].into_boxed_slice(),
            out_ring: SampleRing::new(capacity),
            dry_ring: SampleRing::new(capacity),
            priming: PrimingGate::new(self.latency.samples(), n),
            bypass: LinearSmoother::new(
                self.config.bypass_ramp_secs,
                sample_rate,
                self.params.get(ParamId::Bypass),
            ),
            mute: LinearSmoother::new(self.config.mute_ramp_secs, sample_rate, 1.0),
            gate: VadGate::new(
                self.params.get(ParamId::Threshold),
                grace_period_samples(self.params.get(ParamId::GracePeriod), sample_rate),
            ),
            stats: StatsWindow::new(self.config.stats_window_frames.max(1)),
            stats_toggle: ToggleEdge::new(stats_generation, stats_enabled),
        }
    }
}

impl<T: FrameTransform> Lifecycle for Pipeline<T> {
    fn on_activate(&mut self) -> Result<()> {
        self.transform
            .reset()
            .context("Failed to reset transform state")?;

        let engine = self.build_engine();
        info!(
            "Pipeline activated: frame={} ring={} latency={} rate={:.0}Hz",
            self.frame_size,
            engine.out_ring.capacity(),
            self.latency.samples(),
            self.sample_rate
        );
        self.params.publish_stats(&StatsSnapshot::default());
        self.engine = Some(engine);
        Ok(())
    }

    fn on_deactivate(&mut self) {
        if self.engine.take().is_some() {
            info!("Pipeline deactivated");
        }
    }

    fn sample_rate_changed(&mut self, sample_rate: f64) -> Result<()> {
        self.sample_rate = sample_rate;
        let latency = self.latency.sample_rate_changed(sample_rate);
        info!(
            "Sample rate changed to {:.0}Hz, latency {} samples",
            sample_rate, latency
        );
        // Ring capacity and smoother steps depend on the rate; re-prime at the new one
        if self.engine.is_some() {
            self.on_activate()?;
        }
        Ok(())
    }

    fn process_cycle(&mut self, input: &[f32], reference: Option<&[f32]>, output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len(), "host must size output like input");

        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => {
                output.fill(0.0);
                return;
            }
        };

        let frames = input.len().min(output.len());
        output[frames..].fill(0.0);
        engine.sync_parameters(&self.params, &self.config, self.sample_rate);

        // Slices end on frame boundaries, so each produces at most one frame
        let mut offset = 0;
        while offset < frames {
            let len = engine.reblock.remaining().min(frames - offset);
            let range = offset..offset + len;

            engine.reblock.fill(&input[range.clone()]);
            if let Some(lane) = engine.reference.as_mut() {
                // A short or missing reference is padded with silence
                let available = match reference {
                    Some(r) if r.len() > range.start => {
                        lane.fill(&r[range.start..r.len().min(range.end)])
                    }
                    _ => 0,
                };
                lane.fill_silence(len - available);
            }

            if engine.reblock.is_full() {
                engine.run_frame(
                    &mut self.transform,
                    &self.params,
                    &self.config,
                    &mut self.stats_sender,
                );
            }

            engine.emit(&mut output[range]);
            offset += len;
        }
    }

    fn get_parameter(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    fn set_parameter(&self, id: ParamId, value: f32) {
        self.params.set(id, value);
    }

    fn latency_samples(&self) -> usize {
        self.latency.samples()
    }
}

impl Engine {
    /// Pulls the control-path values once per cycle.
    fn sync_parameters(&mut self, params: &Parameters, config: &PipelineConfig, sample_rate: f64) {
        let bypass = params.get(ParamId::Bypass);
        if config.enable_crossfade {
            self.bypass.set_target(bypass);
        } else {
            self.bypass.reset(bypass);
        }

        self.gate.set_threshold(params.get(ParamId::Threshold));
        self.gate.set_grace_period(grace_period_samples(
            params.get(ParamId::GracePeriod),
            sample_rate,
        ));

        let generation = params.stats_generation();
        if self.stats_toggle.changed(generation, params.stats_enabled()) {
            self.stats.reset();
            params.publish_stats(&StatsSnapshot::default());
        }
    }

    /// Runs the transform on the completed frame and stages both rings.
    fn run_frame<T: FrameTransform>(
        &mut self,
        transform: &mut T,
        params: &Parameters,
        config: &PipelineConfig,
        stats_sender: &mut Option<Sender<StatsSnapshot>>,
    ) {
        let frame_len = self.wet.len();
        let frame = match self.reblock.take_frame() {
            Some(frame) => frame,
            None => return,
        };

        self.dry_ring.write(frame);
        self.dry_ring.commit();

        let reference = self.reference.as_mut().and_then(|lane| lane.take_frame());
        let score = transform.process_frame(frame, reference, &mut self.wet);

        if let Some(score) = score {
            if config.enable_gate {
                let open = self.gate.update(score, frame_len);
                self.mute.set_target(if open { 1.0 } else { 0.0 });
            }

            params.publish_current(score * 100.0);
            if config.enable_stats && self.stats_toggle.state() {
                self.stats.store(score);
                let snapshot = self.stats.snapshot(score);
                params.publish_stats(&snapshot);

                if let Some(sender) = stats_sender.as_ref() {
                    if let Err(TrySendError::Disconnected(_)) = sender.try_send(snapshot) {
                        warn!("Stats receiver disconnected, disabling sender");
                        *stats_sender = None;
                    }
                }
            }
        }

        for sample in self.wet.iter_mut() {
            *sample *= self.mute.next();
        }

        self.out_ring.write(&self.wet);
        self.out_ring.commit();
    }

    /// Fills one output slice from the rings, honoring priming and bypass.
    fn emit(&mut self, out: &mut [f32]) {
        let silent = self
            .priming
            .begin_slice(out.len(), self.out_ring.readable_len());
        let (head, tail) = out.split_at_mut(silent);
        head.fill(0.0);
        if tail.is_empty() {
            return;
        }

        // Both rings advance by the same amount on every path, or they desynchronize
        let n = tail.len();
        let dry_target = self.bypass.target();
        if self.bypass.is_ramping() || (dry_target > 0.0 && dry_target < 1.0) {
            let raw = &mut self.dry_scratch[..n];
            self.out_ring.read(tail);
            self.dry_ring.read(raw);
            for (wet, &dry) in tail.iter_mut().zip(raw.iter()) {
                let mix = self.bypass.next();
                *wet = wet.mul_add(1.0 - mix, dry * mix);
            }
        } else if dry_target >= 1.0 {
            self.dry_ring.read(tail);
            self.out_ring.skip(n);
        } else {
            self.out_ring.read(tail);
            self.dry_ring.skip(n);
        }
    }
}

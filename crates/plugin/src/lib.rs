use nih_plug::prelude::*;
use renooice_core::{
    FrameTransform, Lifecycle, ParamId, Parameters, Pipeline, PipelineConfig, TransformKind,
};
use std::num::NonZeroU32;
use std::sync::Arc;

struct RenooicePlugin {
    params: Arc<RenooiceParams>,
    shared: Arc<Parameters>,
    // One per channel so bypass returns each channel's own dry signal
    pipelines: Vec<Pipeline<Box<dyn FrameTransform>>>,

    // Preallocated in initialize, sized to the host's max block
    scratch: Vec<f32>,
}

#[derive(Params)]
struct RenooiceParams {
    #[id = "bypass"]
    pub bypass: FloatParam,

    #[id = "threshold"]
    pub threshold: FloatParam,

    #[id = "grace"]
    pub grace_period: FloatParam,

    #[id = "stats"]
    pub enable_stats: BoolParam,
}

impl Default for RenooicePlugin {
    fn default() -> Self {
        Self {
            params: Arc::new(RenooiceParams::default()),
            shared: Arc::new(Parameters::new()),
            pipelines: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

impl Default for RenooiceParams {
    fn default() -> Self {
        let bypass = ParamId::Bypass.info();
        let threshold = ParamId::Threshold.info();
        let grace = ParamId::GracePeriod.info();

        Self {
            bypass: FloatParam::new(
                bypass.name,
                bypass.default,
                FloatRange::Linear {
                    min: bypass.min,
                    max: bypass.max,
                },
            )
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            threshold: FloatParam::new(
                threshold.name,
                threshold.default,
                FloatRange::Linear {
                    min: threshold.min,
                    max: threshold.max,
                },
            )
            .with_step_size(0.01),

            grace_period: FloatParam::new(
                grace.name,
                grace.default,
                FloatRange::Linear {
                    min: grace.min,
                    max: grace.max,
                },
            )
            .with_step_size(1.0)
            .with_unit(" ms"),

            enable_stats: BoolParam::new(ParamId::EnableStats.info().name, false).non_automatable(),
        }
    }
}

/// Copies host parameter values into the record the pipeline reads each cycle.
fn push_parameters(params: &RenooiceParams, shared: &Parameters) {
    shared.set(ParamId::Bypass, params.bypass.value());
    shared.set(ParamId::Threshold, params.threshold.value());
    shared.set(ParamId::GracePeriod, params.grace_period.value());
    shared.set(
        ParamId::EnableStats,
        if params.enable_stats.value() { 1.0 } else { 0.0 },
    );
}

/// Runs each channel in place through its own pipeline.
fn process_channels(
    pipelines: &mut [Pipeline<Box<dyn FrameTransform>>],
    channels: &mut [&mut [f32]],
    scratch: &mut [f32],
) {
    if scratch.is_empty() {
        return;
    }
    for (channel, pipeline) in channels.iter_mut().zip(pipelines.iter_mut()) {
        // Hosts may exceed the announced max block; walk it in scratch-sized pieces
        let mut offset = 0;
        while offset < channel.len() {
            let len = (channel.len() - offset).min(scratch.len());
            let range = offset..offset + len;

            pipeline.process_cycle(&channel[range.clone()], None, &mut scratch[..len]);
            channel[range].copy_from_slice(&scratch[..len]);
            offset += len;
        }
    }
}

impl RenooicePlugin {
    fn prepare(&mut self, sample_rate: f64, channels: usize) -> anyhow::Result<()> {
        if self.pipelines.len() != channels {
            self.pipelines.clear();
            for _ in 0..channels {
                let transform = TransformKind::Denoise.build()?;
                let pipeline = Pipeline::new(transform, PipelineConfig::default(), sample_rate)
                    .with_parameters(self.shared.clone());
                self.pipelines.push(pipeline);
            }
        }

        for pipeline in &mut self.pipelines {
            if pipeline.sample_rate() != sample_rate {
                pipeline.sample_rate_changed(sample_rate)?;
            }
            pipeline.on_activate()?;
        }
        Ok(())
    }
}

impl Plugin for RenooicePlugin {
    const NAME: &'static str = "Renooice";
    const VENDOR: &'static str = "Detair";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
    ];

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        push_parameters(&self.params, &self.shared);

        let channels = audio_io_layout
            .main_input_channels
            .map(NonZeroU32::get)
            .unwrap_or(1) as usize;

        if let Err(e) = self.prepare(buffer_config.sample_rate as f64, channels) {
            nih_error!("Failed to start pipeline: {:#}", e);
            return false;
        }

        let max_block = buffer_config.max_buffer_size.max(1) as usize;
        self.scratch = vec![0.0; max_block];

        if let Some(pipeline) = self.pipelines.first() {
            let latency = pipeline.latency_samples();
            nih_log!(
                "Renooice ready at {:.0}Hz, {} channel(s), latency {} samples",
                buffer_config.sample_rate,
                channels,
                latency
            );
            context.set_latency_samples(latency as u32);
        }

        true
    }

    fn deactivate(&mut self) {
        for pipeline in &mut self.pipelines {
            pipeline.on_deactivate();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        push_parameters(&self.params, &self.shared);

        let num_samples = buffer.samples();
        if num_samples == 0 || self.scratch.is_empty() {
            return ProcessStatus::Normal;
        }

        process_channels(&mut self.pipelines, buffer.as_slice(), &mut self.scratch);

        ProcessStatus::Normal
    }
}

impl ClapPlugin for RenooicePlugin {
    const CLAP_ID: &'static str = "com.detair.renooice";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("RNNoise denoiser with voice-activity gate and dry/wet bypass");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Mono,
        ClapFeature::Stereo,
        ClapFeature::Restoration,
    ];
}

impl Vst3Plugin for RenooicePlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"DetairRenooice01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Restoration];
}

nih_export_clap!(RenooicePlugin);
nih_export_vst3!(RenooicePlugin);

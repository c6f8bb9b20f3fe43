use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;
use log::{info, warn};
use renooice_core::{
    FrameTransform, Lifecycle, Parameters, Pipeline, PipelineConfig, StatsSnapshot, TransformKind,
};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Largest chunk handed to the pipeline per cycle.
const MAX_CHUNK: usize = 2048;

/// Everything needed to open the devices and build the pipeline.
pub struct EngineOptions {
    pub input: String,
    pub output: String,
    pub reference: Option<String>,
    pub transform: TransformKind,
    pub pipeline: PipelineConfig,
    pub sample_rate: u32,
}

/// Live device engine: cpal capture → pipeline thread → cpal playback.
///
/// Device callbacks only move samples through lock-free queues. The
/// processing thread feeds the pipeline whatever chunk length is queued, so
/// the reblocking works against real, irregular callback sizes.
pub struct AudioEngine {
    _input_stream: cpal::Stream,
    _output_stream: cpal::Stream,
    _reference_stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    latency: usize,
    pub params: Arc<Parameters>,
    pub stats: Receiver<StatsSnapshot>,
}

fn find_input(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name == "default" {
        host.default_input_device()
            .context("No default input found")
    } else {
        host.input_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .with_context(|| format!("Input device '{}' not found", name))
    }
}

fn find_output(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name == "default" {
        host.default_output_device()
            .context("No default output found")
    } else {
        host.output_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .with_context(|| format!("Output device '{}' not found", name))
    }
}

impl AudioEngine {
    /// Opens the devices, activates the pipeline and starts streaming.
    pub fn start(options: EngineOptions, params: Arc<Parameters>) -> Result<Self> {
        let host = cpal::default_host();
        info!("Audio host: {}", host.id().name());

        let input_device = find_input(&host, &options.input)?;
        info!("Using input device: {}", input_device.name().unwrap_or_default());
        let output_device = find_output(&host, &options.output)?;
        info!("Using output device: {}", output_device.name().unwrap_or_default());

        let transform = options
            .transform
            .build()
            .with_context(|| format!("Failed to build {} transform", options.transform))?;
        let wants_reference = transform.wants_reference();

        let reference_device = match (&options.reference, wants_reference) {
            (Some(name), true) => match find_input(&host, name) {
                Ok(dev) => {
                    info!("Using reference device: {}", dev.name().unwrap_or_default());
                    Some(dev)
                }
                Err(e) => {
                    warn!("Reference device unavailable, echo reference is silent: {}", e);
                    None
                }
            },
            (None, true) => {
                warn!("{} without --reference runs against silence", options.transform);
                None
            }
            (Some(_), false) => {
                warn!("{} ignores the reference device", options.transform);
                None
            }
            (None, false) => None,
        };

        let sample_rate = options.sample_rate;
        let mut pipeline = Pipeline::new(transform, options.pipeline, sample_rate as f64)
            .with_parameters(params.clone());
        let (stats_tx, stats_rx) = crossbeam_channel::bounded(64);
        pipeline.set_stats_sender(Some(stats_tx));
        pipeline.on_activate()?;
        let latency = pipeline.latency_samples();

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // 100ms of headroom on each queue
        let buffer_size = (sample_rate as usize / 10).max(MAX_CHUNK);

        let rb_in = HeapRb::<f32>::new(buffer_size);
        let (mut prod_in, cons_in) = rb_in.split();

        let rb_out = HeapRb::<f32>::new(buffer_size + latency);
        let (prod_out, mut cons_out) = rb_out.split();

        let rb_ref = HeapRb::<f32>::new(buffer_size);
        let (mut prod_ref, cons_ref) = rb_ref.split();

        let reference_stream = match &reference_device {
            Some(dev) => match dev.build_input_stream(
                &config,
                move |data: &[f32], _| {
                    let _ = prod_ref.push_slice(data);
                },
                |err| warn!("Reference input error: {}", err),
                None,
            ) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!("Failed to open reference device: {}", e);
                    None
                }
            },
            None => None,
        };
        let has_reference = reference_stream.is_some();

        let input_stream = input_device.build_input_stream(
            &config,
            move |data: &[f32], _| {
                let _ = prod_in.push_slice(data);
            },
            |err| warn!("Input error: {}", err),
            None,
        )?;

        let output_stream = output_device.build_output_stream(
            &config,
            move |data: &mut [f32], _| {
                let read = cons_out.pop_slice(data);
                data[read..].fill(0.0);
            },
            |err| warn!("Output error: {}", err),
            None,
        )?;

        let is_running = Arc::new(AtomicBool::new(true));
        let run_flag = is_running.clone();

        let worker = thread::Builder::new()
            .name("renooice-audio".into())
            .spawn(move || {
                let reference = has_reference.then_some(cons_ref);
                process_loop(pipeline, cons_in, reference, prod_out, run_flag);
            })
            .context("Failed to spawn audio processing thread")?;

        input_stream.play()?;
        output_stream.play()?;
        if let Some(stream) = &reference_stream {
            stream.play()?;
        }

        Ok(Self {
            _input_stream: input_stream,
            _output_stream: output_stream,
            _reference_stream: reference_stream,
            is_running,
            worker: Some(worker),
            latency,
            params,
            stats: stats_rx,
        })
    }

    /// Pipeline latency in samples, excluding device buffering.
    pub fn latency_samples(&self) -> usize {
        self.latency
    }
}

fn process_loop(
    mut pipeline: Pipeline<Box<dyn FrameTransform>>,
    mut cons_in: HeapCons<f32>,
    mut cons_ref: Option<HeapCons<f32>>,
    mut prod_out: HeapProd<f32>,
    run_flag: Arc<AtomicBool>,
) {
    let mut input = vec![0.0f32; MAX_CHUNK];
    let mut ref_buf = vec![0.0f32; MAX_CHUNK];
    let mut output = vec![0.0f32; MAX_CHUNK];

    while run_flag.load(Ordering::Relaxed) {
        let chunk = cons_in.occupied_len().min(MAX_CHUNK);
        if chunk == 0 {
            thread::sleep(Duration::from_micros(200));
            continue;
        }

        let read = cons_in.pop_slice(&mut input[..chunk]);
        // Reference lags or stalls are padded with silence to stay aligned
        let reference = match cons_ref.as_mut() {
            Some(cons) => {
                let got = cons.pop_slice(&mut ref_buf[..read]);
                ref_buf[got..read].fill(0.0);
                Some(&ref_buf[..read])
            }
            None => None,
        };

        pipeline.process_cycle(&input[..read], reference, &mut output[..read]);

        // Write Audio - retry briefly if output buffer is full
        let mut retries = 0;
        while prod_out.vacant_len() < read {
            thread::yield_now();
            retries += 1;
            if retries > 100 {
                break;
            }
        }
        let pushed = prod_out.push_slice(&output[..read]);
        if pushed < read {
            warn!("Output queue full, dropped {} samples", read - pushed);
        }
    }

    pipeline.on_deactivate();
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

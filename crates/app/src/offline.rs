//! Offline WAV processing through the live pipeline.
//!
//! Files are cut into host-style chunks (fixed or pseudo-random sizes) so
//! results match what a real-time host would hear for the same audio.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;
use renooice_core::{FrameTransform, Lifecycle, Pipeline};
use std::path::Path;

/// How the input is cut into cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPlan {
    Fixed(usize),
    /// Uniform sizes in `1..=max`, reproducible from `seed`.
    Jitter { max: usize, seed: u64 },
}

impl ChunkPlan {
    pub fn sizes(self) -> ChunkSizes {
        match self {
            ChunkPlan::Fixed(size) => ChunkSizes {
                max: size.max(1),
                state: 0,
            },
            ChunkPlan::Jitter { max, seed } => ChunkSizes {
                max: max.max(1),
                state: seed.max(1),
            },
        }
    }
}

/// Endless iterator of chunk sizes; zero state means fixed.
pub struct ChunkSizes {
    max: usize,
    state: u64,
}

impl Iterator for ChunkSizes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.state == 0 {
            return Some(self.max);
        }
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        Some((self.state % self.max as u64) as usize + 1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OfflineReport {
    pub sample_rate: u32,
    pub input_samples: usize,
    pub output_samples: usize,
    pub cycles: usize,
    pub latency: usize,
}

/// Runs `input` through an active pipeline, one chunk per cycle.
///
/// The input is padded with `latency` samples of silence so the tail is
/// flushed. With `trim_latency` the leading priming silence is dropped and
/// the result lines up sample-for-sample with the input.
pub fn process_samples<T: FrameTransform>(
    pipeline: &mut Pipeline<T>,
    input: &[f32],
    plan: ChunkPlan,
    trim_latency: bool,
) -> (Vec<f32>, usize) {
    let latency = pipeline.latency_samples();
    let total = input.len() + latency;
    let mut padded = Vec::with_capacity(total);
    padded.extend_from_slice(input);
    padded.resize(total, 0.0);

    let mut output = vec![0.0f32; total];
    let mut offset = 0;
    let mut cycles = 0;
    for size in plan.sizes() {
        if offset >= total {
            break;
        }
        let end = (offset + size).min(total);
        pipeline.process_cycle(&padded[offset..end], None, &mut output[offset..end]);
        offset = end;
        cycles += 1;
    }

    if trim_latency {
        output.drain(..latency);
    }
    (output, cycles)
}

/// Reads a WAV file as mono f32, averaging channels.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader =
        WavReader::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Corrupt float WAV data")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("Unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .context("Corrupt PCM WAV data")?
        }
    };

    let gain = 1.0 / channels as f32;
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() * gain)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Writes mono 32-bit float WAV.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create '{}'", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Processes `input` into `output`. The pipeline is (re)activated at the file's rate.
pub fn process_file<T: FrameTransform>(
    pipeline: &mut Pipeline<T>,
    input: &Path,
    output: &Path,
    plan: ChunkPlan,
    trim_latency: bool,
) -> Result<OfflineReport> {
    let (samples, sample_rate) = read_wav(input)?;
    if pipeline.sample_rate() != sample_rate as f64 {
        pipeline.sample_rate_changed(sample_rate as f64)?;
    }
    pipeline.on_activate()?;

    let latency = pipeline.latency_samples();
    info!(
        "Processing {} samples at {}Hz ({:?}, latency {})",
        samples.len(),
        sample_rate,
        plan,
        latency
    );
    let (processed, cycles) = process_samples(pipeline, &samples, plan, trim_latency);
    pipeline.on_deactivate();

    write_wav(output, &processed, sample_rate)?;
    Ok(OfflineReport {
        sample_rate,
        input_samples: samples.len(),
        output_samples: processed.len(),
        cycles,
        latency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use renooice_core::transform::Passthrough;
    use renooice_core::PipelineConfig;

    fn passthrough(sample_rate: f64) -> Pipeline<Passthrough> {
        Pipeline::new(Passthrough::default(), PipelineConfig::minimal(), sample_rate)
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.01).sin() * 0.5).collect()
    }

    #[test]
    fn test_jitter_sizes_stay_in_range() {
        let sizes: Vec<usize> = ChunkPlan::Jitter { max: 37, seed: 9 }
            .sizes()
            .take(1000)
            .collect();
        assert!(sizes.iter().all(|&s| (1..=37).contains(&s)));
        assert!(sizes.iter().any(|&s| s != sizes[0]));
    }

    #[test]
    fn test_fixed_zero_chunk_is_promoted() {
        assert_eq!(ChunkPlan::Fixed(0).sizes().next(), Some(1));
    }

    #[test]
    fn test_trimmed_output_matches_input() {
        let input = tone(48000);
        let mut pipeline = passthrough(48000.0);
        pipeline.on_activate().unwrap();

        let (output, cycles) = process_samples(
            &mut pipeline,
            &input,
            ChunkPlan::Jitter { max: 700, seed: 3 },
            true,
        );
        assert!(cycles > 1);
        assert_eq!(output, input);
    }

    #[test]
    fn test_untrimmed_output_keeps_priming_silence() {
        let input = tone(4800);
        let mut pipeline = passthrough(48000.0);
        pipeline.on_activate().unwrap();

        let (output, _) = process_samples(&mut pipeline, &input, ChunkPlan::Fixed(64), false);
        assert_eq!(output.len(), input.len() + 480);
        assert!(output[..480].iter().all(|&s| s == 0.0));
        assert_eq!(&output[480..], &input[..]);
    }

    #[test]
    fn test_wav_file_round_trip_through_pipeline() {
        let dir = std::env::temp_dir().join(format!("renooice-offline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let in_path = dir.join("in.wav");
        let out_path = dir.join("out.wav");

        // 16-bit stereo source at 96kHz
        let spec = WavSpec {
            channels: 2,
            sample_rate: 96000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&in_path, spec).unwrap();
        for i in 0..9600 {
            let v = ((i % 200) as i16 - 100) * 100;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let mut pipeline = passthrough(48000.0);
        let report = process_file(
            &mut pipeline,
            &in_path,
            &out_path,
            ChunkPlan::Fixed(256),
            true,
        )
        .unwrap();
        assert_eq!(report.sample_rate, 96000);
        assert_eq!(report.latency, 960);
        assert_eq!(report.output_samples, 9600);

        let (original, _) = read_wav(&in_path).unwrap();
        let (processed, rate) = read_wav(&out_path).unwrap();
        assert_eq!(rate, 96000);
        assert_eq!(processed, original);

        let _ = std::fs::remove_dir_all(&dir);
    }
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::warn;
use renooice_core::{ParamId, Parameters, PipelineConfig, TransformKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted user preferences for the command-line front end.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppConfig {
    #[serde(default = "default_device")]
    pub last_input: String,
    #[serde(default = "default_device")]
    pub last_output: String,
    /// Far-end capture for echo cancellation
    #[serde(default)]
    pub reference_device: Option<String>,
    #[serde(default)]
    pub transform: TransformKind,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub grace_period_ms: f32,
    #[serde(default)]
    pub bypass: f32,
    #[serde(default)]
    pub enable_stats: bool,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_threshold() -> f32 {
    ParamId::Threshold.info().default
}

fn default_stats_interval() -> u64 {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_input: default_device(),
            last_output: default_device(),
            reference_device: None,
            transform: TransformKind::default(),
            sample_rate: default_sample_rate(),
            threshold: default_threshold(),
            grace_period_ms: 0.0,
            bypass: 0.0,
            enable_stats: false,
            stats_interval_secs: default_stats_interval(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from disk, or returns default if missing or unreadable.
    pub fn load() -> Self {
        let path = match config_path() {
            Some(path) => path,
            None => return Self::default(),
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Ignoring corrupt config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Saves configuration to disk in JSON format.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path().context("No config directory on this platform")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Pushes the stored control values into a live parameter record.
    pub fn apply(&self, params: &Parameters) {
        params.set(ParamId::Bypass, self.bypass);
        params.set(ParamId::Threshold, self.threshold);
        params.set(ParamId::GracePeriod, self.grace_period_ms);
        params.set(
            ParamId::EnableStats,
            if self.enable_stats { 1.0 } else { 0.0 },
        );
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "renooice", "renooice").map(|dirs| dirs.config_dir().join("config.json"))
}

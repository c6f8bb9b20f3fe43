pub mod config;
pub mod constants;
pub mod latency;
pub mod params;
pub mod pipeline;
pub mod priming;
pub mod reblock;
pub mod ring_buffer;
pub mod smoother;
pub mod stats;
pub mod transform;
pub mod vad_gate;

pub use config::PipelineConfig;
pub use params::{ParamId, Parameters};
pub use pipeline::{Lifecycle, Pipeline};
pub use stats::StatsSnapshot;
pub use transform::{FrameTransform, TransformKind};

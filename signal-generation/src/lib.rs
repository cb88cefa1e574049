// Signal Generation (Layer 2)
// Turns market observations into signals and drives the full pipeline

pub mod config;
pub mod detector;
pub mod pipeline;

pub use config::{
    create_config_template, env_source, PipelineSettings, RunMode, ScheduleConfig, CONFIG_TEMPLATE,
};
pub use detector::{DetectorConfig, SignalDetector};
pub use pipeline::{FinancialPipeline, PipelineStage};

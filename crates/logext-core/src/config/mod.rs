pub mod pipeline;
pub mod settings;

pub use pipeline::PipelineConfig;
pub use settings::LoggerSettings;

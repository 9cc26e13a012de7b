// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod batch;
mod converter;
mod progress;

pub use batch::{BatchConverter, BatchFailure, BatchReport};
pub use converter::{
    ConversionReport, ConversionStage, NotebookConverter, default_assets_dir, document_stem,
};
pub use progress::{PipelineStats, ProgressTracker};

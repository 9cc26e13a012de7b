// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod repository;
pub mod transform;
pub mod utils;

pub use config::{
    AssetsConfig, BatchConfig, Config, FrontmatterConfig, MarkdownConfig, OutputNaming,
    ViewerConfig,
};
pub use error::{ConversionError, Result};
pub use exporter::{JupyterExporter, NotebookExporter};
pub use extractor::MetadataExtractor;
pub use models::{Document, MetaValue, Metadata, Token, TokenKind, TokenStream};
pub use parser::{FrontmatterParser, MarkdownParser, MarkdownRenderer};
pub use pipeline::{
    BatchConverter, BatchReport, ConversionReport, NotebookConverter, PipelineStats,
    ProgressTracker,
};
pub use repository::{
    GitRepository, NotebookScanner, RepositoryMetadata, StaticRepository, ViewerLink,
    open_repository,
};
pub use transform::{AssetRelocator, CodeBlockSeparator, FrontmatterBuilder};
pub use utils::Validator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        let _separator = CodeBlockSeparator::new();
        let _builder = FrontmatterBuilder::new(config.frontmatter.viewer_link_key.clone());
        assert!(config.validate().is_ok());
    }
}

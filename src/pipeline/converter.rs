// file: src/pipeline/converter.rs
// description: single notebook conversion from export to written markdown page
// reference: stages run strictly in order; the page is written only after rendering succeeds

use crate::config::Config;
use crate::error::{ConversionError, Result};
use crate::exporter::NotebookExporter;
use crate::extractor::MetadataExtractor;
use crate::models::Document;
use crate::parser::{MarkdownParser, MarkdownRenderer};
use crate::repository::{RepositoryMetadata, ViewerLink};
use crate::transform::{AssetRelocator, CodeBlockSeparator, FrontmatterBuilder, RelocationReport};
use crate::utils::Validator;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Loaded,
    Parsed,
    CodeBlocksSeparated,
    FrontmatterAdded,
    AssetsProcessed,
    Rendered,
    Written,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loaded => "loaded",
            Self::Parsed => "parsed",
            Self::CodeBlocksSeparated => "code blocks separated",
            Self::FrontmatterAdded => "frontmatter added",
            Self::AssetsProcessed => "assets processed",
            Self::Rendered => "rendered",
            Self::Written => "written",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub notebook: PathBuf,
    pub output: PathBuf,
    pub title: Option<String>,
    pub reading_time_min: u64,
    pub viewer_link: String,
    pub assets_copied: Vec<PathBuf>,
    pub assets_unresolved: Vec<String>,
}

pub struct NotebookConverter {
    exporter: Arc<dyn NotebookExporter>,
    repository: Arc<dyn RepositoryMetadata>,
    parser: MarkdownParser,
    separator: CodeBlockSeparator,
    frontmatter: FrontmatterBuilder,
    renderer: MarkdownRenderer,
    extractor: MetadataExtractor,
    viewer_host: String,
    separate_code_blocks: bool,
}

impl NotebookConverter {
    pub fn new(
        config: &Config,
        exporter: Arc<dyn NotebookExporter>,
        repository: Arc<dyn RepositoryMetadata>,
    ) -> Self {
        Self {
            exporter,
            repository,
            parser: MarkdownParser::with_words_per_minute(config.markdown.words_per_minute),
            separator: CodeBlockSeparator::new(),
            frontmatter: FrontmatterBuilder::new(config.frontmatter.viewer_link_key.clone()),
            renderer: MarkdownRenderer::new(),
            extractor: MetadataExtractor::new(),
            viewer_host: config.viewer.host.clone(),
            separate_code_blocks: config.markdown.separate_code_blocks,
        }
    }

    /// Converts `notebook` into `output`. With `assets_dir`, local images and
    /// files are copied there and referenced as `<output stem>/<file name>`.
    pub fn convert(
        &self,
        notebook: &Path,
        output: &Path,
        assets_dir: Option<&Path>,
    ) -> Result<ConversionReport> {
        Validator::require_existing(notebook)?;

        let raw = self.exporter.export(notebook)?;
        self.stage(notebook, ConversionStage::Loaded);

        let document = self.parser.parse(&raw)?;
        self.stage(notebook, ConversionStage::Parsed);

        let document = if self.separate_code_blocks {
            let separated = self.separator.separate(document);
            self.stage(notebook, ConversionStage::CodeBlocksSeparated);
            separated
        } else {
            document
        };

        let viewer_link =
            ViewerLink::for_notebook(&self.viewer_host, self.repository.as_ref(), notebook)?;
        let document = self.frontmatter.build(document, &viewer_link)?;
        self.stage(notebook, ConversionStage::FrontmatterAdded);

        let (document, assets) = match assets_dir {
            Some(assets_dir) => {
                let relocator = AssetRelocator::new(
                    notebook.parent().unwrap_or(Path::new("")),
                    assets_dir,
                    document_stem(output),
                );
                let relocated = relocator.relocate(document)?;
                self.stage(notebook, ConversionStage::AssetsProcessed);
                relocated
            }
            None => (document, RelocationReport::default()),
        };

        let rendered = self.renderer.render(&document.tokens)?;
        self.stage(notebook, ConversionStage::Rendered);

        Validator::ensure_parent_dir(output)?;
        fs::write(output, rendered)
            .map_err(|e| ConversionError::file_operation(output, e))?;
        self.stage(notebook, ConversionStage::Written);

        let report = self.report(notebook, output, &document, viewer_link, assets);
        info!(
            "Converted {} -> {} ({} min read, {} assets)",
            notebook.display(),
            output.display(),
            report.reading_time_min,
            report.assets_copied.len()
        );
        Ok(report)
    }

    fn stage(&self, notebook: &Path, stage: ConversionStage) {
        debug!("{}: {}", notebook.display(), stage);
    }

    fn report(
        &self,
        notebook: &Path,
        output: &Path,
        document: &Document,
        viewer_link: String,
        assets: RelocationReport,
    ) -> ConversionReport {
        ConversionReport {
            notebook: notebook.to_path_buf(),
            output: output.to_path_buf(),
            title: self.extractor.extract_title(&document.tokens),
            reading_time_min: self.extractor.reading_time_minutes(document),
            viewer_link,
            assets_copied: assets.copied,
            assets_unresolved: assets.unresolved,
        }
    }
}

pub fn document_stem(output: &Path) -> String {
    output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Default location for a page's assets: a directory named after the page, beside it.
pub fn default_assets_dir(output: &Path) -> PathBuf {
    output
        .parent()
        .unwrap_or(Path::new(""))
        .join(document_stem(output))
}

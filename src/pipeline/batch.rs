// file: src/pipeline/batch.rs
// description: converts every notebook under a root directory on blocking worker tasks
// reference: orchestrates asynchronous conversion workflow

use crate::config::Config;
use crate::error::{ConversionError, Result};
use crate::exporter::{JupyterExporter, NotebookExporter};
use crate::pipeline::converter::{
    ConversionReport, NotebookConverter, default_assets_dir, document_stem,
};
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::repository::{NotebookScanner, ScannedNotebook, open_repository};
use crate::utils::Validator;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub notebook: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: String,
    pub finished_at: String,
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub stats: PipelineStats,
    pub converted: Vec<ConversionReport>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        Validator::ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ConversionError::file_operation(path, e))?;
        info!("Batch report written to {}", path.display());
        Ok(())
    }
}

pub struct BatchConverter {
    config: Config,
    exporter: Arc<dyn NotebookExporter>,
    show_progress: bool,
    colored: bool,
}

impl BatchConverter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            exporter: Arc::new(JupyterExporter::new()),
            show_progress: false,
            colored: false,
        }
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn NotebookExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_progress(mut self, colored: bool) -> Self {
        self.show_progress = true;
        self.colored = colored;
        self
    }

    pub async fn run(&self, root: &Path) -> Result<BatchReport> {
        let started_at = Utc::now().to_rfc3339();
        Validator::validate_directory(root)?;

        info!("Scanning for notebooks...");
        let scanner = NotebookScanner::new(&self.config.batch);
        let scan_root = root.to_path_buf();
        let notebooks = tokio::task::spawn_blocking(move || scanner.scan_directory(&scan_root))
            .await
            .map_err(|e| {
                ConversionError::Validation(format!("Notebook scanning task failed: {}", e))
            })?;

        let output_dir = self.config.batch.output_dir.clone();
        if notebooks.is_empty() {
            warn!("No notebooks found under {}", root.display());
        }

        let repository = open_repository(&self.config.viewer, root)?;
        let converter = Arc::new(NotebookConverter::new(
            &self.config,
            self.exporter.clone(),
            repository,
        ));

        let progress = Arc::new(if self.show_progress {
            ProgressTracker::with_color(notebooks.len(), self.colored)
        } else {
            ProgressTracker::hidden(notebooks.len())
        });

        let workers = self.config.batch.parallel_workers.max(1);
        info!("Converting {} notebooks with {} workers...", notebooks.len(), workers);

        let tasks = notebooks.into_iter().map(|notebook| {
            let converter = converter.clone();
            let (output, assets_dir) = self.targets(&notebook, &output_dir);
            let path = notebook.path.clone();

            async move {
                let outcome = tokio::task::spawn_blocking({
                    let path = path.clone();
                    move || converter.convert(&path, &output, assets_dir.as_deref())
                })
                .await;

                match outcome {
                    Ok(result) => (path, result),
                    Err(e) => (
                        path,
                        Err(ConversionError::Validation(format!("Conversion task panicked: {}", e))),
                    ),
                }
            }
        });

        let mut outcomes = stream::iter(tasks).buffer_unordered(workers);
        let mut converted = Vec::new();
        let mut failures = Vec::new();

        while let Some((notebook, result)) = outcomes.next().await {
            progress.set_message(notebook.display().to_string());
            match result {
                Ok(report) => {
                    progress.add_assets(report.assets_copied.len());
                    progress.inc_converted();
                    converted.push(report);
                }
                Err(e) => {
                    progress.inc_failed();
                    if self.config.batch.fail_fast {
                        error!("Stopping batch at {}: {}", notebook.display(), e);
                        return Err(e);
                    }
                    warn!("Failed to convert {}: {}", notebook.display(), e);
                    failures.push(BatchFailure {
                        notebook,
                        error: e.to_string(),
                    });
                }
            }
        }

        let stats = progress.get_stats();
        progress.finish();
        log_final_stats(&stats);

        converted.sort_by(|a, b| a.notebook.cmp(&b.notebook));
        failures.sort_by(|a, b| a.notebook.cmp(&b.notebook));

        Ok(BatchReport {
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            root: root.to_path_buf(),
            output_dir: self.config.batch.output_dir.clone(),
            stats,
            converted,
            failures,
        })
    }

    fn targets(&self, notebook: &ScannedNotebook, output_dir: &Path) -> (PathBuf, Option<PathBuf>) {
        let output = notebook.output_path(output_dir, self.config.batch.naming);
        let assets_dir = self.config.assets.enabled.then(|| {
            match &self.config.assets.directory {
                Some(directory) => directory.join(document_stem(&output)),
                None => default_assets_dir(&output),
            }
        });
        (output, assets_dir)
    }
}

fn log_final_stats(stats: &PipelineStats) {
    info!("=== Conversion Summary ===");
    info!("Duration: {} seconds", stats.duration_secs);
    info!("Notebooks converted: {}", stats.notebooks_converted);
    info!("Notebooks failed: {}", stats.notebooks_failed);
    info!("Success rate: {:.2}%", stats.success_rate());
    info!("Throughput: {:.2} notebooks/sec", stats.notebooks_per_second());
    info!("Assets copied: {}", stats.assets_copied);
    info!("==========================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputNaming;
    use tempfile::TempDir;

    const NOTEBOOK: &str = r##"{"cells": [
        {"cell_type": "markdown", "source": "# Post\n\n![chart](chart.png)"}
    ], "metadata": {}}"##;

    fn config_for(output_dir: &Path) -> Config {
        let mut config = Config::default_config();
        config.viewer.repository = Some("owner/site".to_string());
        config.viewer.branch = Some("main".to_string());
        config.batch.output_dir = output_dir.to_path_buf();
        config.batch.parallel_workers = 2;
        config
    }

    fn write_notebook(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_converts_tree_and_counts_failures() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_notebook(src.path(), "posts/a/index.ipynb", NOTEBOOK);
        write_notebook(src.path(), "posts/b/index.ipynb", NOTEBOOK);
        write_notebook(src.path(), "broken.ipynb", "{not json");

        let report = BatchConverter::new(config_for(out.path()))
            .run(src.path())
            .await
            .unwrap();

        assert_eq!(report.stats.notebooks_converted, 2);
        assert_eq!(report.stats.notebooks_failed, 1);
        assert_eq!(report.failures[0].notebook, src.path().join("broken.ipynb"));
        assert!(out.path().join("posts/a/index.md").is_file());
        assert!(out.path().join("posts/b/index.md").is_file());
    }

    #[tokio::test]
    async fn test_parent_directory_naming_and_assets() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_notebook(src.path(), "posts/intro/index.ipynb", NOTEBOOK);
        fs::write(src.path().join("posts/intro/chart.png"), b"chart").unwrap();

        let mut config = config_for(out.path());
        config.batch.naming = OutputNaming::ParentDirectory;
        config.assets.enabled = true;

        let report = BatchConverter::new(config).run(src.path()).await.unwrap();

        let page = fs::read_to_string(out.path().join("posts/intro.md")).unwrap();
        assert!(page.contains("![chart](intro/chart.png)"));
        assert_eq!(fs::read(out.path().join("posts/intro/chart.png")).unwrap(), b"chart");
        assert_eq!(report.stats.assets_copied, 1);
    }

    #[tokio::test]
    async fn test_fail_fast_returns_error() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_notebook(src.path(), "broken.ipynb", "{not json");

        let mut config = config_for(out.path());
        config.batch.fail_fast = true;

        let err = BatchConverter::new(config).run(src.path()).await.unwrap_err();
        assert!(matches!(err, ConversionError::Notebook { .. }));
    }

    #[tokio::test]
    async fn test_report_written_as_json() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_notebook(src.path(), "a.ipynb", NOTEBOOK);

        let report = BatchConverter::new(config_for(out.path()))
            .run(src.path())
            .await
            .unwrap();
        let report_path = out.path().join("reports/batch.json");
        report.write_json(&report_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["stats"]["notebooks_converted"], 1);
        assert_eq!(json["converted"][0]["title"], "Post");
        assert!(json["started_at"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_missing_root_is_validation_error() {
        let out = TempDir::new().unwrap();
        let err = BatchConverter::new(config_for(out.path()))
            .run(&out.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Validation(_)));
    }
}

// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use nb2hugo::pipeline::default_assets_dir;
use nb2hugo::utils::logging::{format_error, format_success, format_warning};
use nb2hugo::{
    BatchConverter, Config, JupyterExporter, NotebookConverter, Validator, open_repository,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "nb2hugo")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Convert Jupyter notebooks into Hugo-ready markdown pages", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single notebook into `<OUTPUT_DIR>/<stem>.md`
    Convert {
        notebook: PathBuf,

        /// Defaults to the notebook's directory
        output_dir: Option<PathBuf>,

        #[arg(long, value_name = "DIR")]
        assets_dir: Option<PathBuf>,

        /// Copy local images and files next to the page
        #[arg(long)]
        localize_assets: bool,
    },

    /// Convert every notebook below ROOT
    ConvertAll {
        root: PathBuf,

        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        #[arg(short, long, value_name = "NUM")]
        workers: Option<usize>,

        /// Write a JSON report of converted and failed notebooks
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    nb2hugo::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Convert {
            notebook,
            output_dir,
            assets_dir,
            localize_assets,
        } => {
            cmd_convert(&config, &notebook, output_dir, assets_dir, localize_assets)?;
        }
        Commands::ConvertAll {
            root,
            output_dir,
            workers,
            report,
        } => {
            cmd_convert_all(config, &root, output_dir, workers, report, cli.color).await?;
        }
    }

    Ok(())
}

fn cmd_convert(
    config: &Config,
    notebook: &Path,
    output_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    localize_assets: bool,
) -> Result<()> {
    Validator::require_existing(notebook)?;
    Validator::validate_notebook_extension(notebook)?;

    let notebook_dir = notebook.parent().unwrap_or(Path::new("")).to_path_buf();
    let stem = notebook
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .context("Notebook path has no file name")?;
    let output = output_dir
        .unwrap_or_else(|| notebook_dir.clone())
        .join(format!("{}.md", stem));

    let assets_dir = match assets_dir {
        Some(dir) => Some(dir),
        None if localize_assets || config.assets.enabled => Some(match &config.assets.directory {
            Some(directory) => directory.join(&stem),
            None => default_assets_dir(&output),
        }),
        None => None,
    };

    let repository_dir = if notebook_dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        notebook_dir
    };
    let repository = open_repository(&config.viewer, &repository_dir)
        .context("Failed to read repository metadata")?;

    let converter = NotebookConverter::new(config, Arc::new(JupyterExporter::new()), repository);
    match converter.convert(notebook, &output, assets_dir.as_deref()) {
        Ok(report) => {
            println!(
                "{}",
                format_success(&format!(
                    "{} -> {}",
                    notebook.display(),
                    report.output.display()
                ))
            );
            if !report.assets_unresolved.is_empty() {
                println!(
                    "{}",
                    format_warning(&format!(
                        "{} references left unchanged",
                        report.assets_unresolved.len()
                    ))
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", format_error(&format!("{}: {}", notebook.display(), e)));
            Err(e).context("Conversion failed")
        }
    }
}

async fn cmd_convert_all(
    mut config: Config,
    root: &Path,
    output_dir: Option<PathBuf>,
    workers: Option<usize>,
    report_path: Option<PathBuf>,
    colored: bool,
) -> Result<()> {
    if let Some(output_dir) = output_dir {
        config.batch.output_dir = output_dir;
    }
    if let Some(workers) = workers {
        config.batch.parallel_workers = workers;
    }
    config.validate().context("Invalid batch settings")?;

    let report = BatchConverter::new(config)
        .with_progress(colored)
        .run(root)
        .await
        .context("Batch conversion failed")?;

    if let Some(path) = report_path {
        report
            .write_json(&path)
            .context("Failed to write batch report")?;
    }

    let stats = &report.stats;
    if stats.notebooks_failed == 0 {
        println!(
            "{}",
            format_success(&format!(
                "Converted {} notebooks into {}",
                stats.notebooks_converted,
                report.output_dir.display()
            ))
        );
    } else {
        println!(
            "{}",
            format_warning(&format!(
                "Converted {} notebooks, {} failed",
                stats.notebooks_converted, stats.notebooks_failed
            ))
        );
        for failure in &report.failures {
            println!(
                "{}",
                format_error(&format!("{}: {}", failure.notebook.display(), failure.error))
            );
        }
    }

    Ok(())
}

// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{ConversionError, Result};
use crate::parser::DEFAULT_WORDS_PER_MINUTE;
use crate::repository::DEFAULT_VIEWER_HOST;
use crate::transform::DEFAULT_VIEWER_LINK_KEY;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "NB2HUGO";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub markdown: MarkdownConfig,
    pub frontmatter: FrontmatterConfig,
    pub viewer: ViewerConfig,
    pub assets: AssetsConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub words_per_minute: usize,
    pub separate_code_blocks: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontmatterConfig {
    pub viewer_link_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub host: String,
    /// `owner/name`; overrides the `origin` remote.
    pub repository: Option<String>,
    /// Overrides the checked-out branch, including a detached HEAD.
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub enabled: bool,
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// `<relative dir>/<notebook stem>.md`
    #[default]
    NotebookStem,
    /// `<relative grandparent>/<parent dir name>.md`
    ParentDirectory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub parallel_workers: usize,
    pub output_dir: PathBuf,
    pub skip_patterns: Vec<String>,
    pub naming: OutputNaming,
    pub fail_fast: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            separate_code_blocks: true,
        }
    }
}

impl Default for FrontmatterConfig {
    fn default() -> Self {
        Self {
            viewer_link_key: DEFAULT_VIEWER_LINK_KEY.to_string(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_VIEWER_HOST.to_string(),
            repository: None,
            branch: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            output_dir: PathBuf::from(".dist"),
            skip_patterns: vec![".git/*".to_string(), "node_modules/*".to_string()],
            naming: OutputNaming::NotebookStem,
            fail_fast: false,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| ConversionError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ConversionError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.markdown.words_per_minute == 0 {
            return Err(ConversionError::Config(
                "words_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.batch.parallel_workers == 0 {
            return Err(ConversionError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.viewer.host.trim().is_empty() {
            return Err(ConversionError::Config("viewer.host must not be empty".to_string()));
        }

        if self.frontmatter.viewer_link_key.trim().is_empty() {
            return Err(ConversionError::Config(
                "viewer_link_key must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

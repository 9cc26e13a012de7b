// file: src/repository/git.rs
// description: repository identity lookup for external notebook viewer links
// reference: https://docs.rs/gix

use crate::config::ViewerConfig;
use crate::error::{ConversionError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const ORIGIN_REMOTE: &str = "origin";
pub const DEFAULT_VIEWER_HOST: &str = "githubtocolab.com";

lazy_static! {
    static ref REMOTE_IDENTIFIER: Regex =
        Regex::new(r"([^/:]+/[^/:]+?)(?:\.git)?/?$").expect("Invalid remote url regex");
}

/// Where a notebook lives inside its repository.
pub trait RepositoryMetadata: Send + Sync {
    /// `owner/name` identifier.
    fn repository_name(&self) -> Result<String>;
    fn current_branch_name(&self) -> Result<String>;
    fn relative_path(&self, path: &Path) -> Result<PathBuf>;
}

/// Metadata read once from a git work tree. Values are resolved eagerly so the
/// handle can be shared between batch workers.
#[derive(Debug, Clone)]
pub struct GitRepository {
    name: Option<String>,
    branch: Option<String>,
    root: PathBuf,
}

impl GitRepository {
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = gix::discover(path).map_err(|e| {
            ConversionError::Repository(format!("No git repository at {}: {}", path.display(), e))
        })?;

        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| ConversionError::Repository("Repository has no work tree".to_string()))?;

        let branch = repo
            .head_name()
            .map_err(|e| ConversionError::Repository(format!("Failed to read HEAD: {}", e)))?
            .map(|name| name.shorten().to_string());

        let name = repo
            .find_remote(ORIGIN_REMOTE)
            .ok()
            .and_then(|remote| {
                remote
                    .url(gix::remote::Direction::Fetch)
                    .map(|url| url.to_bstring().to_string())
            })
            .and_then(|url| remote_identifier(&url));

        debug!(
            "Discovered repository {:?} on branch {:?} at {}",
            name,
            branch,
            root.display()
        );

        Ok(Self { name, branch, root })
    }

    /// Replaces looked-up values with configured ones where present.
    pub fn with_overrides(mut self, name: Option<String>, branch: Option<String>) -> Self {
        if name.is_some() {
            self.name = name;
        }
        if branch.is_some() {
            self.branch = branch;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RepositoryMetadata for GitRepository {
    fn repository_name(&self) -> Result<String> {
        self.name.clone().ok_or_else(|| {
            ConversionError::Repository(format!(
                "Remote '{}' is missing or has no recognizable url",
                ORIGIN_REMOTE
            ))
        })
    }

    fn current_branch_name(&self) -> Result<String> {
        self.branch.clone().ok_or_else(|| {
            ConversionError::Repository(
                "HEAD is detached; set viewer.branch to build notebook links".to_string(),
            )
        })
    }

    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        relative_to(&self.root, path)
    }
}

/// Fixed repository values, used when there is no git checkout to inspect.
#[derive(Debug, Clone)]
pub struct StaticRepository {
    name: String,
    branch: String,
    root: PathBuf,
}

impl StaticRepository {
    pub fn new(name: impl Into<String>, branch: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            branch: branch.into(),
            root: root.into(),
        }
    }
}

impl RepositoryMetadata for StaticRepository {
    fn repository_name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    fn current_branch_name(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        relative_to(&self.root, path)
    }
}

pub struct ViewerLink;

impl ViewerLink {
    pub fn build(host: &str, repository: &str, branch: &str, relative_path: &Path) -> String {
        let relative = relative_path
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "https://{}/{}/blob/{}/{}",
            host.trim_end_matches('/'),
            repository.trim_matches('/'),
            branch,
            relative
        )
    }

    pub fn for_notebook(
        host: &str,
        repository: &dyn RepositoryMetadata,
        notebook: &Path,
    ) -> Result<String> {
        Ok(Self::build(
            host,
            &repository.repository_name()?,
            &repository.current_branch_name()?,
            &repository.relative_path(notebook)?,
        ))
    }
}

/// Git metadata for `start_dir` with configured overrides applied. Without a
/// checkout, a fully configured `viewer` section stands in, rooted at `start_dir`.
pub fn open_repository(
    viewer: &ViewerConfig,
    start_dir: &Path,
) -> Result<Arc<dyn RepositoryMetadata>> {
    match GitRepository::discover(start_dir) {
        Ok(repo) => Ok(Arc::new(
            repo.with_overrides(viewer.repository.clone(), viewer.branch.clone()),
        )),
        Err(err) => match (&viewer.repository, &viewer.branch) {
            (Some(name), Some(branch)) => {
                warn!("{}; using configured repository {}", err, name);
                Ok(Arc::new(StaticRepository::new(name, branch, start_dir)))
            }
            _ => Err(err),
        },
    }
}

/// `owner/name` from a remote url of any scheme.
pub fn remote_identifier(url: &str) -> Option<String> {
    REMOTE_IDENTIFIER
        .captures(url.trim())
        .map(|caps| caps[1].to_string())
}

fn relative_to(root: &Path, path: &Path) -> Result<PathBuf> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    path.strip_prefix(&root)
        .map(Path::to_path_buf)
        .map_err(|_| {
            ConversionError::Repository(format!(
                "{} is outside repository root {}",
                path.display(),
                root.display()
            ))
        })
}

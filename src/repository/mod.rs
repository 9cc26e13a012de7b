// file: src/repository/mod.rs
// description: repository metadata and notebook discovery module exports
// reference: Internal module structure

pub mod git;
pub mod scanner;

pub use git::{
    DEFAULT_VIEWER_HOST, GitRepository, RepositoryMetadata, StaticRepository, ViewerLink,
    open_repository,
};
pub use scanner::{NotebookScanner, ScannedNotebook};

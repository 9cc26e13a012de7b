// file: src/repository/scanner.rs
// description: notebook discovery and output path layout for batch conversion
// reference: https://docs.rs/walkdir

use crate::config::{BatchConfig, OutputNaming};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const NOTEBOOK_EXTENSION: &str = "ipynb";
pub const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

pub struct NotebookScanner {
    skip_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannedNotebook {
    pub path: PathBuf,
    /// Relative to the scan root.
    pub relative_path: PathBuf,
}

impl ScannedNotebook {
    pub fn stem(&self) -> String {
        self.relative_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn output_path(&self, output_dir: &Path, naming: OutputNaming) -> PathBuf {
        let parent = self.relative_path.parent().unwrap_or(Path::new(""));

        match naming {
            OutputNaming::NotebookStem => output_dir.join(parent).join(format!("{}.md", self.stem())),
            OutputNaming::ParentDirectory => match parent.file_name() {
                Some(name) => {
                    let grandparent = parent.parent().unwrap_or(Path::new(""));
                    output_dir
                        .join(grandparent)
                        .join(format!("{}.md", name.to_string_lossy()))
                }
                None => output_dir.join(format!("{}.md", self.stem())),
            },
        }
    }
}

impl NotebookScanner {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            skip_patterns: config.skip_patterns.clone(),
        }
    }

    pub fn scan_directory(&self, root: &Path) -> Vec<ScannedNotebook> {
        info!("Scanning directory: {}", root.display());
        let mut notebooks = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != CHECKPOINT_DIR)
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != NOTEBOOK_EXTENSION) {
                continue;
            }

            let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            if self.should_skip(&relative_path) {
                debug!("Skipping notebook: {}", path.display());
                continue;
            }

            notebooks.push(ScannedNotebook {
                path: path.to_path_buf(),
                relative_path,
            });
        }

        info!("Found {} notebooks", notebooks.len());
        notebooks
    }

    fn should_skip(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.skip_patterns
            .iter()
            .any(|pattern| matches_pattern(&path_str, pattern))
    }
}

/// `*` matches any run of characters; patterns match anywhere in the path
/// and are anchored at the end unless they end with `*`.
fn matches_pattern(path: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return path.contains(pattern);
    }

    let pieces: Vec<&str> = pattern.split('*').collect();
    let mut rest = path;

    for (idx, piece) in pieces.iter().enumerate() {
        if piece.is_empty() {
            continue;
        }
        if idx == pieces.len() - 1 {
            return rest.ends_with(piece);
        }
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scanner(patterns: &[&str]) -> NotebookScanner {
        NotebookScanner {
            skip_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_scan_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("posts/intro/.ipynb_checkpoints")).unwrap();
        fs::write(temp.path().join("posts/intro/index.ipynb"), "{}").unwrap();
        fs::write(
            temp.path().join("posts/intro/.ipynb_checkpoints/index-checkpoint.ipynb"),
            "{}",
        )
        .unwrap();
        fs::write(temp.path().join("posts/readme.md"), "# Not a notebook").unwrap();

        let notebooks = scanner(&[]).scan_directory(temp.path());

        assert_eq!(notebooks.len(), 1);
        assert_eq!(
            notebooks[0].relative_path,
            Path::new("posts").join("intro").join("index.ipynb")
        );
    }

    #[test]
    fn test_skip_patterns() {
        let scanner = scanner(&["*.zip", ".git/*", "drafts"]);

        assert!(scanner.should_skip(Path::new("test.zip")));
        assert!(scanner.should_skip(Path::new(".git/config")));
        assert!(scanner.should_skip(Path::new("posts/drafts/a.ipynb")));
        assert!(!scanner.should_skip(Path::new("posts/a.ipynb")));
    }

    #[test]
    fn test_output_path_naming() {
        let notebook = ScannedNotebook {
            path: PathBuf::from("/repo/posts/intro/index.ipynb"),
            relative_path: PathBuf::from("posts/intro/index.ipynb"),
        };
        let out = Path::new(".dist");

        assert_eq!(
            notebook.output_path(out, OutputNaming::NotebookStem),
            PathBuf::from(".dist/posts/intro/index.md")
        );
        assert_eq!(
            notebook.output_path(out, OutputNaming::ParentDirectory),
            PathBuf::from(".dist/posts/intro.md")
        );
    }

    #[test]
    fn test_parent_naming_at_root() {
        let notebook = ScannedNotebook {
            path: PathBuf::from("/repo/top.ipynb"),
            relative_path: PathBuf::from("top.ipynb"),
        };
        assert_eq!(
            notebook.output_path(Path::new("out"), OutputNaming::ParentDirectory),
            PathBuf::from("out/top.md")
        );
    }
}

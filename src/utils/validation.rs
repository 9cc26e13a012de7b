// file: src/utils/validation.rs
// description: path checks performed before and after a conversion
// reference: input validation patterns

use crate::error::{ConversionError, Result};
use std::fs;
use std::path::Path;

pub struct Validator;

impl Validator {
    pub fn require_existing(path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(ConversionError::NotFound(path.to_path_buf()));
        }
        Ok(())
    }

    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConversionError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(ConversionError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn validate_notebook_extension(path: &Path) -> Result<()> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ipynb") => Ok(()),
            _ => Err(ConversionError::Validation(format!(
                "File is not a notebook: {}",
                path.display()
            ))),
        }
    }

    /// Creates the directory that will hold `output`.
    pub fn ensure_parent_dir(output: &Path) -> Result<()> {
        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .map_err(|e| ConversionError::file_operation(parent, e)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_require_existing() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("nb.ipynb");
        fs::write(&file_path, "{}").unwrap();

        assert!(Validator::require_existing(&file_path).is_ok());
        assert!(matches!(
            Validator::require_existing(&temp.path().join("missing.ipynb")),
            Err(ConversionError::NotFound(_))
        ));
        assert!(Validator::require_existing(temp.path()).is_err());
    }

    #[test]
    fn test_validate_directory() {
        let temp = TempDir::new().unwrap();
        assert!(Validator::validate_directory(temp.path()).is_ok());
        assert!(Validator::validate_directory(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_validate_notebook_extension() {
        assert!(Validator::validate_notebook_extension(Path::new("a.ipynb")).is_ok());
        assert!(Validator::validate_notebook_extension(Path::new("a.md")).is_err());
        assert!(Validator::validate_notebook_extension(Path::new("ipynb")).is_err());
    }

    #[test]
    fn test_ensure_parent_dir() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("a/b/page.md");

        Validator::ensure_parent_dir(&output).unwrap();
        assert!(temp.path().join("a/b").is_dir());
        assert!(Validator::ensure_parent_dir(Path::new("page.md")).is_ok());
    }
}

// file: src/exporter/mod.rs
// description: notebook export module exports
// reference: internal module structure

pub mod notebook;

pub use notebook::{DEFAULT_LANGUAGE, JupyterExporter, NotebookExporter};

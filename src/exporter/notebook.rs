// file: src/exporter/notebook.rs
// description: nbformat 4 notebook to raw markdown export
// reference: https://nbformat.readthedocs.io/en/latest/format_description.html

use crate::error::{ConversionError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_LANGUAGE: &str = "python";

lazy_static! {
    static ref ANSI_ESCAPE: Regex =
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("Invalid ANSI escape regex");
}

/// Produces raw markdown for one notebook file.
pub trait NotebookExporter: Send + Sync {
    fn export(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
    #[serde(default)]
    metadata: NotebookMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NotebookMetadata {
    kernelspec: Option<KernelSpec>,
    language_info: Option<LanguageInfo>,
}

#[derive(Debug, Deserialize)]
struct KernelSpec {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum Cell {
    Markdown {
        #[serde(default)]
        source: MultilineText,
    },
    Code {
        #[serde(default)]
        source: MultilineText,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        #[serde(default)]
        source: MultilineText,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum Output {
    Stream {
        #[serde(default)]
        text: MultilineText,
    },
    DisplayData {
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
    ExecuteResult {
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
    Error {
        #[serde(default)]
        traceback: Vec<String>,
    },
}

/// nbformat stores text either as one string or as a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineText {
    Single(String),
    Lines(Vec<String>),
}

impl Default for MultilineText {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl MultilineText {
    fn text(&self) -> String {
        match self {
            Self::Single(text) => text.clone(),
            Self::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JupyterExporter;

impl JupyterExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export_str(&self, json: &str, path: &Path) -> Result<String> {
        let notebook: Notebook =
            serde_json::from_str(json).map_err(|e| ConversionError::Notebook {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let language = notebook_language(&notebook.metadata);
        debug!(
            "Exporting {} cells from {} ({})",
            notebook.cells.len(),
            path.display(),
            language
        );

        let blocks: Vec<String> = notebook
            .cells
            .iter()
            .flat_map(|cell| render_cell(cell, &language))
            .filter(|block| !block.trim().is_empty())
            .collect();

        let mut markdown = blocks.join("\n\n");
        markdown.push('\n');
        Ok(markdown)
    }
}

impl NotebookExporter for JupyterExporter {
    fn export(&self, path: &Path) -> Result<String> {
        let json =
            fs::read_to_string(path).map_err(|e| ConversionError::file_operation(path, e))?;
        self.export_str(&json, path)
    }
}

fn notebook_language(metadata: &NotebookMetadata) -> String {
    metadata
        .kernelspec
        .as_ref()
        .and_then(|spec| spec.language.clone())
        .or_else(|| {
            metadata
                .language_info
                .as_ref()
                .and_then(|info| info.name.clone())
        })
        .filter(|language| !language.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

fn render_cell(cell: &Cell, language: &str) -> Vec<String> {
    match cell {
        Cell::Markdown { source } | Cell::Raw { source } => {
            vec![source.text().trim_end().to_string()]
        }
        Cell::Code { source, outputs } => {
            let mut blocks = vec![code_fence(&source.text(), language)];
            blocks.extend(outputs.iter().filter_map(render_output));
            blocks
        }
    }
}

fn code_fence(source: &str, language: &str) -> String {
    let source = source.trim_end();
    let longest_run = source
        .lines()
        .map(|line| line.trim_start().chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);

    if source.is_empty() {
        format!("{}{}\n{}", fence, language, fence)
    } else {
        format!("{}{}\n{}\n{}", fence, language, source, fence)
    }
}

fn render_output(output: &Output) -> Option<String> {
    match output {
        Output::Stream { text } => Some(indent(&strip_ansi(&text.text()))),
        Output::DisplayData { data } | Output::ExecuteResult { data } => render_display_data(data),
        Output::Error { traceback } => Some(indent(&strip_ansi(&traceback.join("\n")))),
    }
}

/// First representable mime type wins.
fn render_display_data(data: &BTreeMap<String, Value>) -> Option<String> {
    if let Some(html) = data.get("text/html") {
        return Some(value_text(html).trim_end().to_string());
    }
    if let Some(latex) = data.get("text/latex") {
        return Some(value_text(latex).trim_end().to_string());
    }
    if let Some(svg) = data.get("image/svg+xml") {
        return Some(value_text(svg).trim_end().to_string());
    }
    for (mime, alt) in [("image/png", "png"), ("image/jpeg", "jpeg")] {
        if let Some(encoded) = data.get(mime) {
            let encoded: String = value_text(encoded)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            return Some(format!("![{}](data:{};base64,{})", alt, mime, encoded));
        }
    }
    if let Some(markdown) = data.get("text/markdown") {
        return Some(value_text(markdown).trim_end().to_string());
    }
    data.get("text/plain")
        .map(|plain| indent(&strip_ansi(&value_text(plain))))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(lines) => lines
            .iter()
            .map(|line| match line {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => other.to_string(),
    }
}

fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Four-space indented code block.
fn indent(text: &str) -> String {
    text.trim_end()
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("    {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn export(json: &str) -> String {
        JupyterExporter::new()
            .export_str(json, Path::new("test.ipynb"))
            .unwrap()
    }

    #[test]
    fn test_markdown_and_code_cells() {
        let json = r##"{
            "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": ["# Title\n", "\n", "Intro"]},
                {"cell_type": "code", "metadata": {}, "execution_count": 1,
                 "source": "x = 1\nprint(x)", "outputs": [
                    {"output_type": "stream", "name": "stdout", "text": ["1\n"]}
                 ]}
            ],
            "metadata": {"kernelspec": {"language": "python", "name": "python3"}},
            "nbformat": 4, "nbformat_minor": 5
        }"##;

        assert_eq!(
            export(json),
            "# Title\n\nIntro\n\n```python\nx = 1\nprint(x)\n```\n\n    1\n"
        );
    }

    #[test]
    fn test_language_fallbacks() {
        let from_info = r#"{"cells": [{"cell_type": "code", "source": "1", "outputs": []}],
            "metadata": {"language_info": {"name": "julia"}}}"#;
        assert!(export(from_info).starts_with("```julia\n"));

        let bare = r#"{"cells": [{"cell_type": "code", "source": "1", "outputs": []}]}"#;
        assert!(export(bare).starts_with("```python\n"));
    }

    #[test]
    fn test_display_data_priority() {
        let json = r#"{"cells": [{"cell_type": "code", "source": "df", "outputs": [
            {"output_type": "execute_result", "execution_count": 1, "metadata": {},
             "data": {"text/plain": ["   a\n", "0  1"], "text/html": ["<table></table>"]}}
        ]}]}"#;
        assert_eq!(export(json), "```python\ndf\n```\n\n<table></table>\n");
    }

    #[test]
    fn test_png_becomes_data_uri() {
        let json = r#"{"cells": [{"cell_type": "code", "source": "plot()", "outputs": [
            {"output_type": "display_data", "metadata": {},
             "data": {"image/png": "iVBORw0K\nGgo=\n", "text/plain": ["<Figure>"]}}
        ]}]}"#;
        assert!(export(json).contains("![png](data:image/png;base64,iVBORw0KGgo=)"));
    }

    #[test]
    fn test_error_traceback_strips_ansi() {
        let json = r#"{"cells": [{"cell_type": "code", "source": "1/0", "outputs": [
            {"output_type": "error", "ename": "ZeroDivisionError", "evalue": "division by zero",
             "traceback": ["\u001b[0;31mZeroDivisionError\u001b[0m: division by zero"]}
        ]}]}"#;
        assert!(export(json).ends_with("    ZeroDivisionError: division by zero\n"));
    }

    #[test]
    fn test_fence_longer_than_content_backticks() {
        let fence = code_fence("print('```')\n```", "python");
        assert!(fence.starts_with("````python\n"));
        assert!(fence.ends_with("\n````"));
    }

    #[test]
    fn test_invalid_json_is_notebook_error() {
        let err = JupyterExporter::new()
            .export_str("{not json", Path::new("broken.ipynb"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Notebook { .. }));
    }

    #[test]
    fn test_export_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nb.ipynb");
        fs::write(
            &path,
            r#"{"cells": [{"cell_type": "raw", "source": "raw text"}], "metadata": {}}"#,
        )
        .unwrap();

        assert_eq!(JupyterExporter::new().export(&path).unwrap(), "raw text\n");
    }
}

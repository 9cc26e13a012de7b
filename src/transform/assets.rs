// file: src/transform/assets.rs
// description: copies locally referenced images and files next to the page and rewrites references
// reference: tokens are rebuilt by field copy, never mutated in place

use crate::error::{ConversionError, Result};
use crate::models::{Document, Nesting, Token, TokenKind, TokenStream};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

lazy_static! {
    static ref URL_SCHEME: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("Invalid URL scheme regex");
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelocationReport {
    /// Destination of every file copied, in first-seen order.
    pub copied: Vec<PathBuf>,
    pub unresolved: Vec<String>,
}

impl RelocationReport {
    pub fn copied_count(&self) -> usize {
        self.copied.len()
    }
}

#[derive(Default)]
struct RelocationState {
    report: RelocationReport,
    rewritten: HashMap<PathBuf, String>,
    claimed_names: HashMap<String, PathBuf>,
}

pub struct AssetRelocator {
    source_dir: PathBuf,
    assets_dir: PathBuf,
    document_stem: String,
}

impl AssetRelocator {
    /// `source_dir` resolves relative references; copies land in `assets_dir` and
    /// are referenced from the page as `<document_stem>/<file name>`.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
        document_stem: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            assets_dir: assets_dir.into(),
            document_stem: document_stem.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Block tokens and every arena slot are visited exactly once, so each
    /// asset token triggers at most one copy.
    pub fn relocate(&self, document: Document) -> Result<(Document, RelocationReport)> {
        let mut document = document;
        let (tokens, arena) = std::mem::take(&mut document.tokens).into_parts();
        let mut state = RelocationState::default();

        let tokens = self.relocate_tokens(tokens, &mut state)?;
        let arena = arena
            .into_iter()
            .map(|children| self.relocate_tokens(children, &mut state))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Relocated {} assets, {} references left untouched",
            state.report.copied_count(),
            state.report.unresolved.len()
        );

        let stream = TokenStream::from_parts(tokens, arena);
        Ok((document.with_tokens(stream), state.report))
    }

    fn relocate_tokens(&self, tokens: Vec<Token>, state: &mut RelocationState) -> Result<Vec<Token>> {
        tokens
            .into_iter()
            .map(|token| self.relocate_token(token, state))
            .collect()
    }

    fn relocate_token(&self, token: Token, state: &mut RelocationState) -> Result<Token> {
        let attribute = match (token.kind, token.nesting) {
            (TokenKind::Image, _) => "src",
            (TokenKind::Link, Nesting::Open) => "href",
            _ => return Ok(token),
        };
        let Some(reference) = token.attr(attribute).map(str::to_string) else {
            return Ok(token);
        };

        match self.resolve(&reference) {
            Ok(source) => {
                let rewritten = self.copy_asset(source, state)?;
                Ok(with_reference(&token, attribute, rewritten))
            }
            Err(err) => {
                warn!("{}", err);
                state.report.unresolved.push(reference);
                Ok(token)
            }
        }
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let unresolvable = |reason: &str| ConversionError::AssetUnresolvable {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if reference.trim().is_empty() {
            return Err(unresolvable("empty reference"));
        }
        if URL_SCHEME.is_match(reference) {
            return Err(unresolvable("remote or inline-encoded reference"));
        }
        if reference.starts_with('#') {
            return Err(unresolvable("fragment-only reference"));
        }

        let path = self.source_dir.join(reference);
        if !path.is_file() {
            return Err(unresolvable("no such local file"));
        }
        Ok(path)
    }

    fn copy_asset(&self, source: PathBuf, state: &mut RelocationState) -> Result<String> {
        if let Some(rewritten) = state.rewritten.get(&source) {
            return Ok(rewritten.clone());
        }

        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ConversionError::Validation(format!(
                "asset path has no file name: {}",
                source.display()
            )))?;

        if let Some(previous) = state.claimed_names.insert(name.clone(), source.clone()) {
            if previous != source {
                warn!(
                    "Asset name collision on '{}': {} overwrites {}",
                    name,
                    source.display(),
                    previous.display()
                );
            }
        }

        fs::create_dir_all(&self.assets_dir)
            .map_err(|e| ConversionError::file_operation(&self.assets_dir, e))?;
        let destination = self.assets_dir.join(&name);
        if is_same_file(&source, &destination) {
            debug!("Asset {} already in place", source.display());
        } else {
            fs::copy(&source, &destination)
                .map_err(|e| ConversionError::file_operation(&destination, e))?;
            debug!("Copied {} -> {}", source.display(), destination.display());
            state.report.copied.push(destination);
        }

        let rewritten = format!("{}/{}", self.document_stem, name);
        state.rewritten.insert(source, rewritten.clone());
        Ok(rewritten)
    }
}

/// Copying a file onto itself truncates it.
fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => false,
    }
}

fn with_reference(token: &Token, attribute: &str, reference: String) -> Token {
    let mut attrs = token.attrs.clone();
    attrs.insert(attribute.to_string(), reference);
    Token {
        attrs,
        ..token.clone()
    }
}

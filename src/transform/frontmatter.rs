// file: src/transform/frontmatter.rs
// description: merges derived metadata and prepends the serialized frontmatter block
// reference: https://docs.rs/yaml-rust

use crate::error::Result;
use crate::extractor::MetadataExtractor;
use crate::models::{
    Document, MetaValue, Metadata, READING_TIME_KEY, TITLE_KEY, Token, TokenKind,
};
use crate::parser::{FRONTMATTER_DELIMITER, FrontmatterParser};
use tracing::debug;

pub const DEFAULT_VIEWER_LINK_KEY: &str = "google_colab_link";

pub struct FrontmatterBuilder {
    viewer_link_key: String,
    extractor: MetadataExtractor,
    serializer: FrontmatterParser,
}

impl FrontmatterBuilder {
    pub fn new(viewer_link_key: impl Into<String>) -> Self {
        Self {
            viewer_link_key: viewer_link_key.into(),
            extractor: MetadataExtractor::new(),
            serializer: FrontmatterParser::new(),
        }
    }

    /// Existing metadata overlaid with title, viewer link and reading time.
    pub fn merged_metadata(&self, document: &Document, viewer_link: &str) -> Metadata {
        let mut metadata = document.metadata.clone();
        metadata.insert(
            TITLE_KEY.to_string(),
            MetaValue::from(self.extractor.extract_title(&document.tokens)),
        );
        metadata.insert(self.viewer_link_key.clone(), MetaValue::from(viewer_link));
        let minutes = self.extractor.reading_time_minutes(document);
        metadata.insert(
            READING_TIME_KEY.to_string(),
            MetaValue::Integer(i64::try_from(minutes).unwrap_or(i64::MAX)),
        );
        metadata
    }

    pub fn build(&self, document: Document, viewer_link: &str) -> Result<Document> {
        let metadata = self.merged_metadata(&document, viewer_link);
        let serialized = self.serializer.serialize(&metadata)?;
        debug!("Serialized {} frontmatter fields", metadata.len());

        let frontmatter = Token::leaf(TokenKind::FrontMatter, "")
            .with_content(serialized)
            .with_markup(FRONTMATTER_DELIMITER)
            .as_block()
            .as_hidden();

        let mut document = document;
        let existing = document.tokens.tokens();
        let body = match existing.first() {
            Some(token) if token.kind == TokenKind::FrontMatter => &existing[1..],
            _ => existing,
        };

        let mut tokens = Vec::with_capacity(body.len() + 1);
        tokens.push(frontmatter);
        tokens.extend_from_slice(body);

        let stream = std::mem::take(&mut document.tokens).with_tokens(tokens);
        Ok(document.with_tokens(stream).with_metadata(metadata))
    }
}

impl Default for FrontmatterBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWER_LINK_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use crate::parser::{MarkdownParser, MarkdownRenderer};
    use pretty_assertions::assert_eq;

    const LINK: &str = "https://githubtocolab.com/owner/repo/blob/main/nb.ipynb";

    #[test]
    fn test_prepends_frontmatter_token() {
        let doc = MarkdownParser::new().parse("# Title\n\nHello").unwrap();
        let doc = FrontmatterBuilder::default().build(doc, LINK).unwrap();

        let first = &doc.tokens.tokens()[0];
        assert_eq!(first.kind, TokenKind::FrontMatter);
        assert_eq!(first.markup, "---");
        assert!(first.content.contains("title: Title"));
        assert!(first.content.contains("reading_time_min: 1"));
        assert!(first.content.contains("google_colab_link:"));
        assert_eq!(doc.tokens.tokens()[1].type_name(), "heading_open");
    }

    #[test]
    fn test_rendered_output() {
        let doc = MarkdownParser::new().parse("# Title\n\nHello").unwrap();
        let doc = FrontmatterBuilder::default().build(doc, LINK).unwrap();
        let rendered = MarkdownRenderer::new().render(&doc.tokens).unwrap();

        assert_eq!(
            rendered,
            format!(
                "---\ngoogle_colab_link: \"{}\"\nreading_time_min: 1\ntitle: Title\n---\n\n# Title\n\nHello\n",
                LINK
            )
        );
    }

    #[test]
    fn test_missing_title_is_null() {
        let doc = MarkdownParser::new().parse("## Only a subsection").unwrap();
        let doc = FrontmatterBuilder::default().build(doc, LINK).unwrap();
        assert_eq!(doc.metadata.get(TITLE_KEY), Some(&MetaValue::Null));
    }

    #[test]
    fn test_existing_frontmatter_merged_and_replaced() {
        let doc = MarkdownParser::new()
            .parse("---\nweight: 5\ntitle: Old\n---\n\n# New\n")
            .unwrap();
        let doc = FrontmatterBuilder::default().build(doc, LINK).unwrap();

        let frontmatter_tokens = doc
            .tokens
            .tokens()
            .iter()
            .filter(|t| t.kind == TokenKind::FrontMatter)
            .count();
        assert_eq!(frontmatter_tokens, 1);
        assert_eq!(doc.metadata.get("weight"), Some(&MetaValue::Integer(5)));
        assert_eq!(doc.metadata.get(TITLE_KEY), Some(&MetaValue::from("New")));
    }

    #[test]
    fn test_identical_metadata_identical_text() {
        let builder = FrontmatterBuilder::default();
        let first = builder
            .build(MarkdownParser::new().parse("# A\n\nb").unwrap(), LINK)
            .unwrap();
        let second = builder
            .build(MarkdownParser::new().parse("# A\n\nb").unwrap(), LINK)
            .unwrap();
        assert_eq!(first.tokens.tokens()[0].content, second.tokens.tokens()[0].content);
    }

    #[test]
    fn test_custom_viewer_key() {
        let doc = MarkdownParser::new().parse("# T").unwrap();
        let doc = FrontmatterBuilder::new("notebook_url").build(doc, LINK).unwrap();
        assert_eq!(doc.metadata.get("notebook_url"), Some(&MetaValue::from(LINK)));
        assert!(!doc.metadata.contains_key(DEFAULT_VIEWER_LINK_KEY));
    }

    #[test]
    fn test_unserializable_metadata_fails() {
        let mut doc = MarkdownParser::new().parse("# T").unwrap();
        doc.metadata
            .insert("ratio".to_string(), MetaValue::Float(f64::INFINITY));

        let err = FrontmatterBuilder::default().build(doc, LINK).unwrap_err();
        assert!(matches!(err, ConversionError::Serialization(_)));
    }
}

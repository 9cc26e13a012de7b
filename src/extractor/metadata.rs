// file: src/extractor/metadata.rs
// description: title and reading-time extraction from parsed documents
// reference: first level-1 heading wins

use crate::models::{Document, Nesting, Token, TokenKind, TokenStream};

pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Content of the inline token right after the first level-1 heading.
    pub fn extract_title(&self, tokens: &TokenStream) -> Option<String> {
        tokens.tokens().windows(2).find_map(|pair| {
            let [heading, inline] = pair else {
                return None;
            };
            (is_level_one_heading(heading) && inline.kind == TokenKind::Inline)
                .then(|| inline.content.clone())
        })
    }

    pub fn reading_time_minutes(&self, document: &Document) -> u64 {
        document.env.wordcount.minutes
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn is_level_one_heading(token: &Token) -> bool {
    token.kind == TokenKind::Heading
        && token.nesting == Nesting::Open
        && matches!(token.markup.as_str(), "#" | "=")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MarkdownParser;

    fn title_of(markdown: &str) -> Option<String> {
        let doc = MarkdownParser::new().parse(markdown).unwrap();
        MetadataExtractor::new().extract_title(&doc.tokens)
    }

    #[test]
    fn test_first_level_one_heading() {
        assert_eq!(
            title_of("Intro text\n\n# First\n\n# Second\n"),
            Some("First".to_string())
        );
    }

    #[test]
    fn test_no_heading() {
        assert_eq!(title_of("Just a paragraph."), None);
    }

    #[test]
    fn test_level_two_only() {
        assert_eq!(title_of("## Subsection\n\ntext"), None);
    }

    #[test]
    fn test_level_two_before_level_one() {
        assert_eq!(
            title_of("## Sub\n\n# Main\n"),
            Some("Main".to_string())
        );
    }

    #[test]
    fn test_setext_level_one() {
        assert_eq!(title_of("Main\n====\n"), Some("Main".to_string()));
    }

    #[test]
    fn test_inline_markup_kept_verbatim() {
        assert_eq!(
            title_of("# Using `pandas` *fast*\n"),
            Some("Using `pandas` *fast*".to_string())
        );
    }

    #[test]
    fn test_reading_time_from_env() {
        let doc = MarkdownParser::new().parse("# Title\n\nHello").unwrap();
        assert_eq!(MetadataExtractor::new().reading_time_minutes(&doc), 1);
    }
}

// file: src/models/document.rs
// description: parsed markdown document threaded through the conversion stages
// reference: internal data structures

use crate::models::metadata::Metadata;
use crate::models::token::TokenStream;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordCount {
    pub words: usize,
    pub minutes: u64,
}

impl WordCount {
    pub fn new(words: usize, words_per_minute: usize) -> Self {
        let per_minute = words_per_minute.max(1);
        Self {
            words,
            minutes: words.div_ceil(per_minute) as u64,
        }
    }
}

/// Side data computed by the parser that survives every transformation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseEnv {
    pub wordcount: WordCount,
}

/// One notebook's markdown. Each stage consumes a document and returns a new one.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub raw_content: String,
    pub tokens: TokenStream,
    pub metadata: Metadata,
    pub env: ParseEnv,
}

impl Document {
    pub fn new(raw_content: String, tokens: TokenStream, env: ParseEnv) -> Self {
        Self {
            raw_content,
            tokens,
            metadata: Metadata::new(),
            env,
        }
    }

    pub fn with_tokens(self, tokens: TokenStream) -> Self {
        Self { tokens, ..self }
    }

    pub fn with_metadata(self, metadata: Metadata) -> Self {
        Self { metadata, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metadata::MetaValue;
    use crate::models::token::Token;

    #[test]
    fn test_word_count_rounds_up() {
        assert_eq!(WordCount::new(0, 200).minutes, 0);
        assert_eq!(WordCount::new(2, 200).minutes, 1);
        assert_eq!(WordCount::new(200, 200).minutes, 1);
        assert_eq!(WordCount::new(201, 200).minutes, 2);
    }

    #[test]
    fn test_word_count_zero_rate() {
        assert_eq!(WordCount::new(5, 0).minutes, 5);
    }

    #[test]
    fn test_stage_helpers_keep_env() {
        let env = ParseEnv {
            wordcount: WordCount::new(10, 200),
        };
        let doc = Document::new("# Test".to_string(), TokenStream::new(), env.clone());

        let mut metadata = Metadata::new();
        metadata.insert("draft".to_string(), MetaValue::Bool(true));

        let doc = doc
            .with_tokens(TokenStream::from_tokens(vec![Token::text("x")]))
            .with_metadata(metadata);

        assert_eq!(doc.env, env);
        assert_eq!(doc.raw_content, "# Test");
        assert_eq!(doc.tokens.len(), 1);
        assert_eq!(doc.metadata.len(), 1);
    }
}

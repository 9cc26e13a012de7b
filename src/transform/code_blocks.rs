// file: src/transform/code_blocks.rs
// description: separates adjacent same-language code fences with a raw html rule
// reference: hugo renders consecutive same-language fences as tabs

use crate::models::{Document, Token, TokenKind};

pub const SEPARATOR_HTML: &str = "<hr />";

pub struct CodeBlockSeparator;

impl CodeBlockSeparator {
    pub fn new() -> Self {
        Self
    }

    pub fn separate(&self, mut document: Document) -> Document {
        let tokens = self.separate_tokens(document.tokens.tokens());
        let stream = std::mem::take(&mut document.tokens).with_tokens(tokens);
        document.with_tokens(stream)
    }

    pub fn separate_tokens(&self, tokens: &[Token]) -> Vec<Token> {
        let mut separated = Vec::with_capacity(tokens.len());

        for pair in tokens.windows(2) {
            separated.push(pair[0].clone());
            if same_language_fences(&pair[0], &pair[1]) {
                separated.push(separator());
            }
        }

        if let Some(last) = tokens.last() {
            separated.push(last.clone());
        }

        separated
    }
}

impl Default for CodeBlockSeparator {
    fn default() -> Self {
        Self::new()
    }
}

fn same_language_fences(first: &Token, second: &Token) -> bool {
    first.kind == TokenKind::Fence && second.kind == TokenKind::Fence && first.info == second.info
}

fn separator() -> Token {
    Token::leaf(TokenKind::HtmlBlock, "")
        .with_content(SEPARATOR_HTML)
        .as_block()
}

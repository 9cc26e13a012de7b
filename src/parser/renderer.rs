// file: src/parser/renderer.rs
// description: renders a flat token stream back into markdown through a comrak AST
// reference: https://docs.rs/comrak (format_commonmark)

use crate::error::{ConversionError, Result};
use crate::models::token::matching_close;
use crate::models::{Nesting, Token, TokenKind, TokenStream};
use crate::parser::frontmatter::FRONTMATTER_DELIMITER;
use comrak::nodes::{
    Ast, AstNode, ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeLink, NodeList, NodeTable, NodeValue, TableAlignment,
};
use comrak::{Arena, ComrakOptions, format_commonmark};
use std::cell::RefCell;

pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// The leading frontmatter block is emitted verbatim; everything after it
    /// goes through comrak's CommonMark formatter.
    pub fn render(&self, stream: &TokenStream) -> Result<String> {
        let (frontmatter, body) = split_frontmatter(stream.tokens())?;
        let body = self.render_body(stream, body)?;

        Ok(match frontmatter {
            Some(token) => {
                let block = format!(
                    "{}\n{}\n{}\n",
                    FRONTMATTER_DELIMITER, token.content, FRONTMATTER_DELIMITER
                );
                if body.is_empty() {
                    block
                } else {
                    format!("{}\n{}", block, body)
                }
            }
            None => body,
        })
    }

    fn render_body(&self, stream: &TokenStream, tokens: &[Token]) -> Result<String> {
        if tokens.is_empty() {
            return Ok(String::new());
        }

        let arena = Arena::new();
        let root = alloc(&arena, NodeValue::Document);
        AstBuilder::new(&arena, stream).build_blocks(root, tokens)?;

        let mut output = Vec::new();
        format_commonmark(root, &default_comrak_options(), &mut output)
            .map_err(|e| ConversionError::Render(format!("comrak serialization failed: {}", e)))?;

        let markdown = String::from_utf8(output)
            .map_err(|e| ConversionError::Render(format!("UTF-8 conversion failed: {}", e)))?;

        // comrak separates adjacent lists with a marker comment
        Ok(markdown.replace("<!-- end list -->\n\n", ""))
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.render.unsafe_ = true;
    options
}

fn split_frontmatter(tokens: &[Token]) -> Result<(Option<&Token>, &[Token])> {
    let (frontmatter, body) = match tokens.split_first() {
        Some((first, rest)) if first.kind == TokenKind::FrontMatter => (Some(first), rest),
        _ => (None, tokens),
    };
    if body.iter().any(|token| token.kind == TokenKind::FrontMatter) {
        return Err(ConversionError::Render(
            "front_matter is only allowed as the first token".to_string(),
        ));
    }
    Ok((frontmatter, body))
}

fn alloc<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(RefCell::new(Ast::new(value, (0, 0).into()))))
}

fn unexpected(token: &Token) -> ConversionError {
    ConversionError::Render(format!("unexpected {}", token.type_name()))
}

fn unclosed(kind: TokenKind) -> ConversionError {
    ConversionError::Render(format!(
        "unclosed {}",
        Token::open(kind, "").type_name()
    ))
}

struct AstBuilder<'a, 's> {
    arena: &'a Arena<AstNode<'a>>,
    stream: &'s TokenStream,
}

impl<'a, 's> AstBuilder<'a, 's> {
    fn new(arena: &'a Arena<AstNode<'a>>, stream: &'s TokenStream) -> Self {
        Self { arena, stream }
    }

    fn build_blocks(&self, root: &'a AstNode<'a>, tokens: &[Token]) -> Result<()> {
        let mut current = root;
        let mut parents: Vec<(TokenKind, &'a AstNode<'a>)> = Vec::new();
        let mut in_table_head = false;

        for (idx, token) in tokens.iter().enumerate() {
            match token.nesting {
                Nesting::Open => {
                    parents.push((token.kind, current));
                    let value = match token.kind {
                        // rows attach straight to the table node
                        TokenKind::TableHead => {
                            in_table_head = true;
                            continue;
                        }
                        TokenKind::TableBody => continue,
                        TokenKind::TableRow => NodeValue::TableRow(in_table_head),
                        TokenKind::ListItem => match &current.data.borrow().value {
                            NodeValue::List(list) => NodeValue::Item(*list),
                            _ => return Err(unexpected(token)),
                        },
                        _ => block_value(tokens, idx)?,
                    };
                    let node = alloc(self.arena, value);
                    current.append(node);
                    current = node;
                }
                Nesting::Close => {
                    let (kind, parent) = parents.pop().ok_or_else(|| unexpected(token))?;
                    if kind != token.kind {
                        return Err(unexpected(token));
                    }
                    if kind == TokenKind::TableHead {
                        in_table_head = false;
                    }
                    current = parent;
                }
                Nesting::SelfClosing => match token.kind {
                    TokenKind::Inline => {
                        self.append_inline(current, self.stream.children(token))?
                    }
                    TokenKind::Fence | TokenKind::CodeBlock => {
                        current.append(alloc(self.arena, code_block_value(token)))
                    }
                    TokenKind::HtmlBlock => current.append(alloc(
                        self.arena,
                        NodeValue::HtmlBlock(NodeHtmlBlock {
                            block_type: 0,
                            literal: token.content.clone(),
                        }),
                    )),
                    TokenKind::ThematicBreak => {
                        current.append(alloc(self.arena, NodeValue::ThematicBreak))
                    }
                    _ => self.append_inline(current, std::slice::from_ref(token))?,
                },
            }
        }

        match parents.pop() {
            Some((kind, _)) => Err(unclosed(kind)),
            None => Ok(()),
        }
    }

    fn append_inline(&self, parent: &'a AstNode<'a>, children: &[Token]) -> Result<()> {
        let mut current = parent;
        let mut parents: Vec<(TokenKind, &'a AstNode<'a>)> = Vec::new();

        for token in children {
            match token.nesting {
                Nesting::Open => {
                    let value = match token.kind {
                        TokenKind::Emphasis => NodeValue::Emph,
                        TokenKind::Strong => NodeValue::Strong,
                        TokenKind::Strikethrough => NodeValue::Strikethrough,
                        TokenKind::Link => NodeValue::Link(link_value(token, "href")),
                        _ => return Err(unexpected(token)),
                    };
                    let node = alloc(self.arena, value);
                    current.append(node);
                    parents.push((token.kind, current));
                    current = node;
                }
                Nesting::Close => {
                    let (kind, outer) = parents.pop().ok_or_else(|| unexpected(token))?;
                    if kind != token.kind {
                        return Err(unexpected(token));
                    }
                    current = outer;
                }
                Nesting::SelfClosing => {
                    let value = match token.kind {
                        TokenKind::CodeInline => NodeValue::Code(NodeCode {
                            num_backticks: 1,
                            literal: token.content.clone(),
                        }),
                        TokenKind::HtmlInline => NodeValue::HtmlInline(token.content.clone()),
                        TokenKind::SoftBreak => NodeValue::SoftBreak,
                        TokenKind::HardBreak => NodeValue::LineBreak,
                        TokenKind::Image => {
                            let image = alloc(self.arena, NodeValue::Image(link_value(token, "src")));
                            if !token.content.is_empty() {
                                image.append(alloc(
                                    self.arena,
                                    NodeValue::Text(token.content.clone()),
                                ));
                            }
                            current.append(image);
                            continue;
                        }
                        _ => NodeValue::Text(token.content.clone()),
                    };
                    current.append(alloc(self.arena, value));
                }
            }
        }

        match parents.pop() {
            Some((kind, _)) => Err(unclosed(kind)),
            None => Ok(()),
        }
    }
}

fn block_value(tokens: &[Token], open: usize) -> Result<NodeValue> {
    let token = &tokens[open];
    let value = match token.kind {
        TokenKind::Paragraph => NodeValue::Paragraph,
        TokenKind::Heading => NodeValue::Heading(NodeHeading {
            level: token.heading_level().unwrap_or(1).clamp(1, 6) as u8,
            setext: false,
        }),
        TokenKind::Blockquote => NodeValue::BlockQuote,
        TokenKind::BulletList | TokenKind::OrderedList => {
            let close = matching_close(tokens, open).ok_or_else(|| unclosed(token.kind))?;
            NodeValue::List(list_value(token, is_tight(&tokens[open + 1..close])))
        }
        TokenKind::Table => {
            let close = matching_close(tokens, open).ok_or_else(|| unclosed(token.kind))?;
            NodeValue::Table(table_value(&tokens[open + 1..close]))
        }
        TokenKind::TableHeaderCell | TokenKind::TableDataCell => NodeValue::TableCell,
        _ => return Err(unexpected(token)),
    };
    Ok(value)
}

fn list_value(open: &Token, tight: bool) -> NodeList {
    let ordered = open.kind == TokenKind::OrderedList;
    NodeList {
        list_type: if ordered {
            ListType::Ordered
        } else {
            ListType::Bullet
        },
        marker_offset: 0,
        padding: 0,
        start: open.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1),
        delimiter: if open.markup == ")" {
            ListDelimType::Paren
        } else {
            ListDelimType::Period
        },
        bullet_char: match open.markup.as_bytes().first() {
            Some(marker @ (b'-' | b'*' | b'+')) => *marker,
            _ => b'-',
        },
        tight,
    }
}

/// A list is tight when the paragraphs directly inside its items are hidden.
fn is_tight(items: &[Token]) -> bool {
    let mut depth = 0;
    for token in items {
        if depth == 1 && token.is(TokenKind::Paragraph, Nesting::Open) {
            return token.hidden;
        }
        depth += token.nesting.delta();
    }
    true
}

fn table_value(inner: &[Token]) -> NodeTable {
    let alignments: Vec<TableAlignment> = inner
        .iter()
        .filter(|token| token.is(TokenKind::TableHeaderCell, Nesting::Open))
        .map(|token| match token.attr("align") {
            Some("left") => TableAlignment::Left,
            Some("center") => TableAlignment::Center,
            Some("right") => TableAlignment::Right,
            _ => TableAlignment::None,
        })
        .collect();

    NodeTable {
        num_columns: alignments.len(),
        num_rows: inner
            .iter()
            .filter(|token| token.is(TokenKind::TableRow, Nesting::Open))
            .count(),
        num_nonempty_cells: 0,
        alignments,
    }
}

fn code_block_value(token: &Token) -> NodeValue {
    let mut literal = token.content.clone();
    if !literal.is_empty() && !literal.ends_with('\n') {
        literal.push('\n');
    }

    let fenced = token.kind == TokenKind::Fence;
    let fence_char = match token.markup.as_bytes().first() {
        Some(fence @ (b'`' | b'~')) => *fence,
        _ => b'`',
    };

    NodeValue::CodeBlock(NodeCodeBlock {
        fenced,
        fence_char: if fenced { fence_char } else { 0 },
        fence_length: if fenced { token.markup.len().max(3) } else { 0 },
        fence_offset: 0,
        info: token.info.clone(),
        literal,
    })
}

fn link_value(token: &Token, attribute: &str) -> NodeLink {
    NodeLink {
        url: token.attr(attribute).unwrap_or_default().to_string(),
        title: token.attr("title").unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MarkdownParser;
    use pretty_assertions::assert_eq;

    fn roundtrip(input: &str) -> String {
        let doc = MarkdownParser::new().parse(input).unwrap();
        MarkdownRenderer::new().render(&doc.tokens).unwrap()
    }

    fn type_names(input: &str) -> Vec<String> {
        let doc = MarkdownParser::new().parse(input).unwrap();
        doc.tokens.tokens().iter().map(Token::type_name).collect()
    }

    #[test]
    fn test_render_heading_and_paragraph() {
        assert_eq!(roundtrip("# Title\n\nHello"), "# Title\n\nHello\n");
    }

    #[test]
    fn test_render_normalizes_setext_heading() {
        assert_eq!(roundtrip("Title\n=====\n\nBody\n"), "# Title\n\nBody\n");
    }

    #[test]
    fn test_render_heading_with_trailing_hash() {
        let rendered = roundtrip("Title #\n=====\n");
        let doc = MarkdownParser::new().parse(&rendered).unwrap();

        assert_eq!(doc.tokens.tokens()[0].tag, "h1");
        assert_eq!(doc.tokens.tokens()[1].content.replace('\\', ""), "Title #");
        assert_eq!(roundtrip(&rendered), rendered);
    }

    #[test]
    fn test_render_is_stable_when_reparsed() {
        let inputs = [
            "# Title\n\nSome *em* and **strong** and `code` and ~~gone~~.\n",
            "Title #\n=====\n",
            "\\*not emphasis\\* and snake_case\n",
            "\\# not a heading\n\n1\\. not a list\n",
            "* one\n* two\n",
            "3. three\n4. four\n",
            "- outer\n  - inner\n- next\n",
            "- one\n\n- two\n",
            "> quoted\n>\n> more\n",
            "[docs](https://example.com \"Docs\") ![alt](img/a.png) <https://x.org>\n",
            "| a | b |\n| :-- | --: |\n| 1 | 2 |\n",
            "<div>\nraw\n</div>\n\n---\n\nafter\n",
            "line one  \nline two\n",
            "    indented code\n",
            "````md\n```\ninner\n```\n````\n",
            "AT&amp;T &copy; 2024\n",
        ];

        for input in inputs {
            let once = roundtrip(input);
            assert_eq!(roundtrip(&once), once, "unstable render for {:?}", input);
            assert_eq!(type_names(&once), type_names(input), "structure changed for {:?}", input);
        }
    }

    #[test]
    fn test_render_fences() {
        assert_eq!(
            roundtrip("```python\nprint(1)\n```\n"),
            "```python\nprint(1)\n```\n"
        );
    }

    #[test]
    fn test_render_fence_longer_than_content() {
        let rendered = roundtrip("````md\n```\ninner\n```\n````\n");
        let doc = MarkdownParser::new().parse(&rendered).unwrap();
        let fence = &doc.tokens.tokens()[0];

        assert_eq!(fence.kind, TokenKind::Fence);
        assert_eq!(fence.info, "md");
        assert_eq!(fence.content, "```\ninner\n```\n");
    }

    #[test]
    fn test_render_links_and_images() {
        assert_eq!(
            roundtrip("[docs](https://example.com \"Docs\") ![alt](img/a.png)"),
            "[docs](https://example.com \"Docs\") ![alt](img/a.png)\n"
        );
    }

    #[test]
    fn test_render_tight_and_loose_lists() {
        let tight = MarkdownParser::new().parse(&roundtrip("- one\n- two\n")).unwrap();
        assert!(tight.tokens.tokens()[2].hidden);

        let loose = MarkdownParser::new().parse(&roundtrip("- one\n\n- two\n")).unwrap();
        assert!(!loose.tokens.tokens()[2].hidden);
    }

    #[test]
    fn test_render_table_keeps_alignment() {
        let rendered = roundtrip("| a | b |\n| :-- | --: |\n| 1 | 2 |\n");
        let doc = MarkdownParser::new().parse(&rendered).unwrap();

        let aligns: Vec<Option<&str>> = doc
            .tokens
            .tokens()
            .iter()
            .filter(|t| t.is(TokenKind::TableHeaderCell, Nesting::Open))
            .map(|t| t.attr("align"))
            .collect();
        assert_eq!(aligns, vec![Some("left"), Some("right")]);
    }

    #[test]
    fn test_render_html_block_verbatim() {
        let stream = TokenStream::from_tokens(vec![
            Token::fence("python", "a\n"),
            Token::leaf(TokenKind::HtmlBlock, "").with_content("<hr />").as_block(),
            Token::fence("python", "b\n"),
        ]);
        assert_eq!(
            MarkdownRenderer::new().render(&stream).unwrap(),
            "```python\na\n```\n\n<hr />\n\n```python\nb\n```\n"
        );
    }

    #[test]
    fn test_render_frontmatter_token() {
        let stream = TokenStream::from_tokens(vec![
            Token::leaf(TokenKind::FrontMatter, "")
                .with_content("title: Test")
                .with_markup("---"),
        ]);
        assert_eq!(
            MarkdownRenderer::new().render(&stream).unwrap(),
            "---\ntitle: Test\n---\n"
        );
    }

    #[test]
    fn test_render_frontmatter_before_body() {
        let mut doc = MarkdownParser::new().parse("# Title\n").unwrap();
        let (mut tokens, arena) = std::mem::take(&mut doc.tokens).into_parts();
        tokens.insert(
            0,
            Token::leaf(TokenKind::FrontMatter, "").with_content("draft: true"),
        );

        let rendered = MarkdownRenderer::new()
            .render(&TokenStream::from_parts(tokens, arena))
            .unwrap();
        assert_eq!(rendered, "---\ndraft: true\n---\n\n# Title\n");
    }

    #[test]
    fn test_render_rejects_trailing_frontmatter() {
        let stream = TokenStream::from_tokens(vec![
            Token::leaf(TokenKind::ThematicBreak, "hr"),
            Token::leaf(TokenKind::FrontMatter, "").with_content("a: 1"),
        ]);
        let err = MarkdownRenderer::new().render(&stream).unwrap_err();
        assert!(matches!(err, ConversionError::Render(_)));
    }

    #[test]
    fn test_render_rejects_unbalanced_stream() {
        let stream = TokenStream::from_tokens(vec![Token::open(TokenKind::Paragraph, "p")]);
        let err = MarkdownRenderer::new().render(&stream).unwrap_err();
        assert!(matches!(err, ConversionError::Render(_)));

        let stream = TokenStream::from_tokens(vec![
            Token::open(TokenKind::Blockquote, "blockquote"),
            Token::close(TokenKind::Paragraph, "p"),
        ]);
        assert!(MarkdownRenderer::new().render(&stream).is_err());
    }

    #[test]
    fn test_render_empty_stream() {
        assert_eq!(MarkdownRenderer::new().render(&TokenStream::new()).unwrap(), "");
    }
}

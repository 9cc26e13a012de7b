// file: src/parser/markdown.rs
// description: markdown parsing with pulldown-cmark into a flat token stream
// reference: https://docs.rs/pulldown-cmark

use crate::error::Result;
use crate::models::{
    Document, Metadata, ParseEnv, Token, TokenKind, TokenStream, WordCount,
};
use crate::parser::frontmatter::{FRONTMATTER_DELIMITER, FrontmatterParser};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, LinkType, Options, Parser, Tag};
use std::ops::Range;

pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

pub struct MarkdownParser {
    words_per_minute: usize,
    frontmatter: FrontmatterParser,
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self::with_words_per_minute(DEFAULT_WORDS_PER_MINUTE)
    }

    pub fn with_words_per_minute(words_per_minute: usize) -> Self {
        Self {
            words_per_minute,
            frontmatter: FrontmatterParser::new(),
        }
    }

    pub fn parse(&self, content: &str) -> Result<Document> {
        let mut builder = TokenBuilder::new(content);
        for (event, range) in Parser::new_ext(content, parser_options()).into_offset_iter() {
            builder.handle(event, range);
        }
        let (tokens, words) = builder.finish();

        let metadata = match tokens.tokens().first() {
            Some(token) if token.kind == TokenKind::FrontMatter => {
                self.frontmatter.parse(&token.content)?
            }
            _ => Metadata::new(),
        };

        let env = ParseEnv {
            wordcount: WordCount::new(words, self.words_per_minute),
        };

        Ok(Document::new(content.to_string(), tokens, env).with_metadata(metadata))
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parser_options() -> Options {
    block_options() | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

fn block_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

enum Frame {
    Paragraph,
    Heading(String),
    Block(TokenKind, &'static str),
    Code(Token),
    HtmlBlock(String),
    Metadata(String),
    /// A `---` block away from the document start, reread as plain markdown.
    Reparse(Range<usize>),
    Table,
    TableHead,
    TableRow,
    TableCell(TokenKind, &'static str),
    Inline(TokenKind, &'static str, String),
    Image(Token, String),
    Ignored,
}

struct InlineRun {
    children: Vec<Token>,
    span: Option<Range<usize>>,
    hidden_paragraph: bool,
}

impl InlineRun {
    fn new(hidden_paragraph: bool) -> Self {
        Self {
            children: Vec::new(),
            span: None,
            hidden_paragraph,
        }
    }

    fn extend_span(&mut self, range: &Range<usize>) {
        self.span = Some(match self.span.take() {
            Some(span) => span.start.min(range.start)..span.end.max(range.end),
            None => range.clone(),
        });
    }
}

struct TokenBuilder<'a> {
    source: &'a str,
    stream: TokenStream,
    frames: Vec<Frame>,
    inline: Option<InlineRun>,
    alignments: Vec<Alignment>,
    cell_index: usize,
    table_has_body: bool,
    words: usize,
}

impl<'a> TokenBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stream: TokenStream::new(),
            frames: Vec::new(),
            inline: None,
            alignments: Vec::new(),
            cell_index: 0,
            table_has_body: false,
            words: 0,
        }
    }

    fn finish(mut self) -> (TokenStream, usize) {
        self.flush_inline();
        (self.stream, self.words)
    }

    fn slice(&self, range: &Range<usize>) -> &'a str {
        self.source.get(range.clone()).unwrap_or("")
    }

    fn handle(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text, range),
            Event::Code(code) => {
                if let Some(alt) = self.image_alt() {
                    alt.push_str(&code);
                } else {
                    let token = Token::leaf(TokenKind::CodeInline, "code")
                        .with_content(code.to_string())
                        .with_markup("`");
                    self.push_child(token, &range);
                }
            }
            Event::Html(html) => {
                if let Some(Frame::HtmlBlock(content)) = self.frames.last_mut() {
                    content.push_str(&html);
                } else {
                    self.push_child(
                        Token::leaf(TokenKind::HtmlInline, "").with_content(html.to_string()),
                        &range,
                    );
                }
            }
            Event::InlineHtml(html) => {
                if self.image_alt().is_none() {
                    self.push_child(
                        Token::leaf(TokenKind::HtmlInline, "").with_content(html.to_string()),
                        &range,
                    );
                }
            }
            Event::SoftBreak => {
                if let Some(alt) = self.image_alt() {
                    alt.push(' ');
                } else {
                    self.push_child(Token::leaf(TokenKind::SoftBreak, "br"), &range);
                }
            }
            Event::HardBreak => {
                if self.image_alt().is_none() {
                    self.push_child(Token::leaf(TokenKind::HardBreak, "br"), &range);
                }
            }
            Event::Rule => {
                self.flush_inline();
                self.stream.push(
                    Token::leaf(TokenKind::ThematicBreak, "hr")
                        .with_markup(FRONTMATTER_DELIMITER)
                        .as_block(),
                );
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        if self.image_alt().is_some() {
            self.frames.push(Frame::Ignored);
            return;
        }

        let source = self.slice(&range);
        let frame = match tag {
            Tag::Paragraph => {
                self.open_block(Token::open(TokenKind::Paragraph, "p"));
                self.inline = Some(InlineRun::new(false));
                Frame::Paragraph
            }
            Tag::Heading { level, .. } => {
                let level = level as usize;
                let tag = format!("h{}", level);
                self.open_block(
                    Token::open(TokenKind::Heading, tag.clone())
                        .with_markup(heading_markup(source, level)),
                );
                self.inline = Some(InlineRun::new(false));
                Frame::Heading(tag)
            }
            Tag::BlockQuote(_) => {
                self.open_block(Token::open(TokenKind::Blockquote, "blockquote").with_markup(">"));
                Frame::Block(TokenKind::Blockquote, "blockquote")
            }
            Tag::CodeBlock(kind) => {
                self.flush_inline();
                let token = match kind {
                    CodeBlockKind::Fenced(info) => Token::leaf(TokenKind::Fence, "code")
                        .with_info(info.trim().to_string())
                        .with_markup(fence_markup(source)),
                    CodeBlockKind::Indented => Token::leaf(TokenKind::CodeBlock, "code"),
                };
                Frame::Code(token.as_block())
            }
            Tag::HtmlBlock => {
                self.flush_inline();
                Frame::HtmlBlock(String::new())
            }
            Tag::MetadataBlock(_) => {
                self.flush_inline();
                if range.start == 0 {
                    Frame::Metadata(String::new())
                } else {
                    Frame::Reparse(range)
                }
            }
            Tag::List(Some(start)) => {
                self.open_block(
                    Token::open(TokenKind::OrderedList, "ol")
                        .with_attr("start", start.to_string())
                        .with_markup(ordered_list_markup(source)),
                );
                Frame::Block(TokenKind::OrderedList, "ol")
            }
            Tag::List(None) => {
                self.open_block(
                    Token::open(TokenKind::BulletList, "ul").with_markup(bullet_markup(source)),
                );
                Frame::Block(TokenKind::BulletList, "ul")
            }
            Tag::Item => {
                self.open_block(Token::open(TokenKind::ListItem, "li"));
                Frame::Block(TokenKind::ListItem, "li")
            }
            Tag::Table(alignments) => {
                self.open_block(Token::open(TokenKind::Table, "table"));
                self.alignments = alignments;
                self.table_has_body = false;
                Frame::Table
            }
            Tag::TableHead => {
                self.stream.push(Token::open(TokenKind::TableHead, "thead").as_block());
                self.stream.push(Token::open(TokenKind::TableRow, "tr").as_block());
                self.cell_index = 0;
                Frame::TableHead
            }
            Tag::TableRow => {
                if !self.table_has_body {
                    self.stream.push(Token::open(TokenKind::TableBody, "tbody").as_block());
                    self.table_has_body = true;
                }
                self.stream.push(Token::open(TokenKind::TableRow, "tr").as_block());
                self.cell_index = 0;
                Frame::TableRow
            }
            Tag::TableCell => {
                let (kind, tag) = if matches!(self.frames.last(), Some(Frame::TableHead)) {
                    (TokenKind::TableHeaderCell, "th")
                } else {
                    (TokenKind::TableDataCell, "td")
                };
                let mut token = Token::open(kind, tag).as_block();
                if let Some(align) = self.alignments.get(self.cell_index).and_then(alignment_name)
                {
                    token = token.with_attr("align", align);
                }
                self.cell_index += 1;
                self.stream.push(token);
                self.inline = Some(InlineRun::new(false));
                Frame::TableCell(kind, tag)
            }
            Tag::Emphasis => {
                let markup = source.chars().next().unwrap_or('*').to_string();
                self.open_inline(TokenKind::Emphasis, "em", markup, &range)
            }
            Tag::Strong => {
                let markup = source.chars().take(2).collect::<String>();
                let markup = if markup == "__" { markup } else { "**".to_string() };
                self.open_inline(TokenKind::Strong, "strong", markup, &range)
            }
            Tag::Strikethrough => {
                let markup = if source.starts_with("~~") { "~~" } else { "~" };
                self.open_inline(TokenKind::Strikethrough, "s", markup.to_string(), &range)
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let mut token = Token::open(TokenKind::Link, "a").with_attr("href", dest_url.to_string());
                if !title.is_empty() {
                    token = token.with_attr("title", title.to_string());
                }
                if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    token = token.with_markup("autolink");
                }
                let markup = token.markup.clone();
                self.push_child(token, &range);
                Frame::Inline(TokenKind::Link, "a", markup)
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut token = Token::leaf(TokenKind::Image, "img").with_attr("src", dest_url.to_string());
                if !title.is_empty() {
                    token = token.with_attr("title", title.to_string());
                }
                self.ensure_inline(&range);
                Frame::Image(token, String::new())
            }
            _ => Frame::Ignored,
        };
        self.frames.push(frame);
    }

    fn end(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };

        match frame {
            Frame::Paragraph => self.close_block(Token::close(TokenKind::Paragraph, "p")),
            Frame::Heading(tag) => self.close_block(Token::close(TokenKind::Heading, tag)),
            Frame::Block(kind, tag) => self.close_block(Token::close(kind, tag)),
            Frame::Code(token) => self.stream.push(token),
            Frame::HtmlBlock(content) => self.stream.push(
                Token::leaf(TokenKind::HtmlBlock, "")
                    .with_content(content)
                    .as_block(),
            ),
            Frame::Metadata(content) => self.stream.push(
                Token::leaf(TokenKind::FrontMatter, "")
                    .with_content(content.trim_end().to_string())
                    .with_markup(FRONTMATTER_DELIMITER)
                    .as_block()
                    .as_hidden(),
            ),
            Frame::Reparse(range) => {
                let offset = range.start;
                let source = self.slice(&range);
                for (event, inner) in Parser::new_ext(source, block_options()).into_offset_iter() {
                    self.handle(event, inner.start + offset..inner.end + offset);
                }
            }
            Frame::Table => {
                if self.table_has_body {
                    self.stream.push(Token::close(TokenKind::TableBody, "tbody").as_block());
                }
                self.stream.push(Token::close(TokenKind::Table, "table").as_block());
            }
            Frame::TableHead => {
                self.stream.push(Token::close(TokenKind::TableRow, "tr").as_block());
                self.stream.push(Token::close(TokenKind::TableHead, "thead").as_block());
            }
            Frame::TableRow => self.stream.push(Token::close(TokenKind::TableRow, "tr").as_block()),
            Frame::TableCell(kind, tag) => self.close_block(Token::close(kind, tag)),
            Frame::Inline(kind, tag, markup) => {
                if let Some(run) = self.inline.as_mut() {
                    run.children.push(Token::close(kind, tag).with_markup(markup));
                }
            }
            Frame::Image(token, alt) => {
                if let Some(run) = self.inline.as_mut() {
                    run.children.push(token.with_content(alt));
                }
            }
            Frame::Ignored => {}
        }
    }

    fn text(&mut self, text: &str, range: Range<usize>) {
        match self.frames.last_mut() {
            Some(Frame::Code(token)) => {
                token.content.push_str(text);
                return;
            }
            Some(Frame::HtmlBlock(content)) | Some(Frame::Metadata(content)) => {
                content.push_str(text);
                return;
            }
            Some(Frame::Reparse(_)) => return,
            _ => {}
        }

        if let Some(alt) = self.image_alt() {
            alt.push_str(text);
            return;
        }

        self.push_child(Token::text(text), &range);
    }

    fn image_alt(&mut self) -> Option<&mut String> {
        self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Image(_, alt) => Some(alt),
            _ => None,
        })
    }

    fn open_block(&mut self, token: Token) {
        self.flush_inline();
        self.stream.push(token.as_block());
    }

    fn close_block(&mut self, token: Token) {
        self.flush_inline();
        self.stream.push(token.as_block());
    }

    fn open_inline(
        &mut self,
        kind: TokenKind,
        tag: &'static str,
        markup: String,
        range: &Range<usize>,
    ) -> Frame {
        self.push_child(Token::open(kind, tag).with_markup(markup.clone()), range);
        Frame::Inline(kind, tag, markup)
    }

    /// Inline content directly inside a tight list item gets a hidden paragraph.
    fn ensure_inline(&mut self, range: &Range<usize>) -> &mut InlineRun {
        if self.inline.is_none() {
            self.stream
                .push(Token::open(TokenKind::Paragraph, "p").as_block().as_hidden());
        }
        let run = self.inline.get_or_insert_with(|| InlineRun::new(true));
        run.extend_span(range);
        run
    }

    fn push_child(&mut self, token: Token, range: &Range<usize>) {
        let run = self.ensure_inline(range);
        if token.kind == TokenKind::Text
            && let Some(last) = run.children.last_mut()
            && last.kind == TokenKind::Text
        {
            last.content.push_str(&token.content);
            return;
        }
        run.children.push(token);
    }

    fn flush_inline(&mut self) {
        let Some(run) = self.inline.take() else {
            return;
        };

        self.words += run
            .children
            .iter()
            .filter(|child| child.kind == TokenKind::Text)
            .map(|child| child.content.split_whitespace().count())
            .sum::<usize>();

        let content = run
            .span
            .as_ref()
            .map(|span| self.slice(span).trim().to_string())
            .unwrap_or_default();
        self.stream.push_inline(content, run.children);

        if run.hidden_paragraph {
            self.stream
                .push(Token::close(TokenKind::Paragraph, "p").as_block().as_hidden());
        }
    }
}

fn heading_markup(source: &str, level: usize) -> String {
    if source.trim_start().starts_with('#') {
        "#".repeat(level)
    } else if level == 1 {
        "=".to_string()
    } else {
        "-".to_string()
    }
}

fn fence_markup(source: &str) -> String {
    let trimmed = source.trim_start();
    match trimmed.chars().next() {
        Some(fence @ ('`' | '~')) => trimmed.chars().take_while(|c| *c == fence).collect(),
        _ => "```".to_string(),
    }
}

fn bullet_markup(source: &str) -> String {
    match source.trim_start().chars().next() {
        Some(marker @ ('-' | '*' | '+')) => marker.to_string(),
        _ => "-".to_string(),
    }
}

fn ordered_list_markup(source: &str) -> String {
    match source.trim_start().chars().find(|c| !c.is_ascii_digit()) {
        Some(')') => ")".to_string(),
        _ => ".".to_string(),
    }
}

fn alignment_name(alignment: &Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

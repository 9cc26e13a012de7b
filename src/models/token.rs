// file: src/models/token.rs
// description: flat markdown token stream with arena-backed inline children
// reference: markdown-it token model (open/close/self-closing nesting)

use std::collections::BTreeMap;

/// Token kinds. Open/close pairs share one kind and differ by [`Nesting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    FrontMatter,
    Paragraph,
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableHeaderCell,
    TableDataCell,
    Fence,
    CodeBlock,
    HtmlBlock,
    ThematicBreak,
    Inline,
    Text,
    CodeInline,
    HtmlInline,
    SoftBreak,
    HardBreak,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
}

impl TokenKind {
    fn base_name(self) -> &'static str {
        match self {
            TokenKind::FrontMatter => "front_matter",
            TokenKind::Paragraph => "paragraph",
            TokenKind::Heading => "heading",
            TokenKind::Blockquote => "blockquote",
            TokenKind::BulletList => "bullet_list",
            TokenKind::OrderedList => "ordered_list",
            TokenKind::ListItem => "list_item",
            TokenKind::Table => "table",
            TokenKind::TableHead => "thead",
            TokenKind::TableBody => "tbody",
            TokenKind::TableRow => "tr",
            TokenKind::TableHeaderCell => "th",
            TokenKind::TableDataCell => "td",
            TokenKind::Fence => "fence",
            TokenKind::CodeBlock => "code_block",
            TokenKind::HtmlBlock => "html_block",
            TokenKind::ThematicBreak => "hr",
            TokenKind::Inline => "inline",
            TokenKind::Text => "text",
            TokenKind::CodeInline => "code_inline",
            TokenKind::HtmlInline => "html_inline",
            TokenKind::SoftBreak => "softbreak",
            TokenKind::HardBreak => "hardbreak",
            TokenKind::Emphasis => "em",
            TokenKind::Strong => "strong",
            TokenKind::Strikethrough => "s",
            TokenKind::Link => "link",
            TokenKind::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nesting {
    Open,
    Close,
    SelfClosing,
}

impl Nesting {
    pub fn delta(self) -> i32 {
        match self {
            Nesting::Open => 1,
            Nesting::Close => -1,
            Nesting::SelfClosing => 0,
        }
    }
}

/// Index of an inline container's children inside [`TokenStream`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildrenRef(usize);

impl ChildrenRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub nesting: Nesting,
    /// HTML tag name (`h1`, `p`, `img`, ...)
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub content: String,
    /// Fence language tag.
    pub info: String,
    pub markup: String,
    pub children: Option<ChildrenRef>,
    pub block: bool,
    pub hidden: bool,
}

impl Token {
    pub fn new(kind: TokenKind, nesting: Nesting, tag: impl Into<String>) -> Self {
        Self {
            kind,
            nesting,
            tag: tag.into(),
            attrs: BTreeMap::new(),
            content: String::new(),
            info: String::new(),
            markup: String::new(),
            children: None,
            block: false,
            hidden: false,
        }
    }

    pub fn open(kind: TokenKind, tag: impl Into<String>) -> Self {
        Self::new(kind, Nesting::Open, tag)
    }

    pub fn close(kind: TokenKind, tag: impl Into<String>) -> Self {
        Self::new(kind, Nesting::Close, tag)
    }

    pub fn leaf(kind: TokenKind, tag: impl Into<String>) -> Self {
        Self::new(kind, Nesting::SelfClosing, tag)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::leaf(TokenKind::Text, "").with_content(content)
    }

    pub fn fence(info: impl Into<String>, content: impl Into<String>) -> Self {
        Self::leaf(TokenKind::Fence, "code")
            .with_info(info)
            .with_content(content)
            .with_markup("```")
            .as_block()
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: ChildrenRef) -> Self {
        self.children = Some(children);
        self
    }

    pub fn as_block(mut self) -> Self {
        self.block = true;
        self
    }

    pub fn as_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// markdown-it style type name, e.g. `heading_open` or `fence`.
    pub fn type_name(&self) -> String {
        let base = self.kind.base_name();
        match self.nesting {
            Nesting::Open => format!("{}_open", base),
            Nesting::Close => format!("{}_close", base),
            Nesting::SelfClosing => base.to_string(),
        }
    }

    pub fn is(&self, kind: TokenKind, nesting: Nesting) -> bool {
        self.kind == kind && self.nesting == nesting
    }

    /// Heading level parsed from the tag (`h1` -> 1).
    pub fn heading_level(&self) -> Option<usize> {
        if self.kind != TokenKind::Heading {
            return None;
        }
        self.tag.strip_prefix('h')?.parse().ok()
    }
}

/// Block-level tokens plus the arena holding every inline container's children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
    arena: Vec<Vec<Token>>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            arena: Vec::new(),
        }
    }

    pub fn from_parts(tokens: Vec<Token>, arena: Vec<Vec<Token>>) -> Self {
        Self { tokens, arena }
    }

    pub fn into_parts(self) -> (Vec<Token>, Vec<Vec<Token>>) {
        (self.tokens, self.arena)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Stores `children` in the arena and returns an inline token pointing at them.
    pub fn push_inline(&mut self, content: impl Into<String>, children: Vec<Token>) {
        let children = self.alloc_children(children);
        self.tokens.push(
            Token::leaf(TokenKind::Inline, "")
                .with_content(content)
                .with_children(children)
                .as_block(),
        );
    }

    pub fn alloc_children(&mut self, children: Vec<Token>) -> ChildrenRef {
        self.arena.push(children);
        ChildrenRef(self.arena.len() - 1)
    }

    pub fn children(&self, token: &Token) -> &[Token] {
        token
            .children
            .and_then(|children| self.arena.get(children.0))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Same arena, different block sequence.
    pub fn with_tokens(self, tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            arena: self.arena,
        }
    }

    /// Every open token is closed by a later close of the same kind.
    pub fn is_well_nested(&self) -> bool {
        is_well_nested(&self.tokens) && self.arena.iter().all(|children| is_well_nested(children))
    }
}

pub fn is_well_nested(tokens: &[Token]) -> bool {
    let mut stack = Vec::new();
    for token in tokens {
        match token.nesting {
            Nesting::Open => stack.push(token.kind),
            Nesting::Close => {
                if stack.pop() != Some(token.kind) {
                    return false;
                }
            }
            Nesting::SelfClosing => {}
        }
    }
    stack.is_empty()
}

/// Index of the close token matching the open token at `open`.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        depth += token.nesting.delta();
        if depth == 0 {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Token::open(TokenKind::Heading, "h1").type_name(), "heading_open");
        assert_eq!(Token::close(TokenKind::Link, "a").type_name(), "link_close");
        assert_eq!(Token::fence("python", "x = 1\n").type_name(), "fence");
        assert_eq!(Token::leaf(TokenKind::FrontMatter, "").type_name(), "front_matter");
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(Token::open(TokenKind::Heading, "h2").heading_level(), Some(2));
        assert_eq!(Token::open(TokenKind::Paragraph, "p").heading_level(), None);
    }

    #[test]
    fn test_children_lookup() {
        let mut stream = TokenStream::new();
        stream.push(Token::open(TokenKind::Paragraph, "p"));
        stream.push_inline("Hello", vec![Token::text("Hello")]);
        stream.push(Token::close(TokenKind::Paragraph, "p"));

        let inline = &stream.tokens()[1];
        assert_eq!(stream.children(inline).len(), 1);
        assert_eq!(stream.children(inline)[0].content, "Hello");
        assert!(stream.children(&stream.tokens()[0]).is_empty());
    }

    #[test]
    fn test_well_nested() {
        let balanced = TokenStream::from_tokens(vec![
            Token::open(TokenKind::Blockquote, "blockquote"),
            Token::open(TokenKind::Paragraph, "p"),
            Token::close(TokenKind::Paragraph, "p"),
            Token::close(TokenKind::Blockquote, "blockquote"),
        ]);
        assert!(balanced.is_well_nested());

        let crossed = TokenStream::from_tokens(vec![
            Token::open(TokenKind::Blockquote, "blockquote"),
            Token::open(TokenKind::Paragraph, "p"),
            Token::close(TokenKind::Blockquote, "blockquote"),
            Token::close(TokenKind::Paragraph, "p"),
        ]);
        assert!(!crossed.is_well_nested());
    }

    #[test]
    fn test_matching_close() {
        let tokens = vec![
            Token::open(TokenKind::BulletList, "ul"),
            Token::open(TokenKind::ListItem, "li"),
            Token::close(TokenKind::ListItem, "li"),
            Token::close(TokenKind::BulletList, "ul"),
        ];
        assert_eq!(matching_close(&tokens, 0), Some(3));
        assert_eq!(matching_close(&tokens, 1), Some(2));
        assert_eq!(matching_close(&tokens[..3], 0), None);
    }
}

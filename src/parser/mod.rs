// file: src/parser/mod.rs
// description: markdown parsing, rendering and frontmatter module exports
// reference: internal module structure

pub mod frontmatter;
pub mod markdown;
pub mod renderer;

pub use frontmatter::{FRONTMATTER_DELIMITER, FrontmatterParser};
pub use markdown::{DEFAULT_WORDS_PER_MINUTE, MarkdownParser};
pub use renderer::MarkdownRenderer;

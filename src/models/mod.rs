// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod document;
pub mod metadata;
pub mod token;

pub use document::{Document, ParseEnv, WordCount};
pub use metadata::{MetaValue, Metadata, READING_TIME_KEY, TITLE_KEY};
pub use token::{ChildrenRef, Nesting, Token, TokenKind, TokenStream};

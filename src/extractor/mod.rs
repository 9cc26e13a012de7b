// file: src/extractor/mod.rs
// description: metadata extraction module exports
// reference: internal module structure

pub mod metadata;

pub use metadata::MetadataExtractor;

// file: src/transform/mod.rs
// description: document transformation stages
// reference: internal module structure

pub mod assets;
pub mod code_blocks;
pub mod frontmatter;

pub use assets::{AssetRelocator, RelocationReport};
pub use code_blocks::{CodeBlockSeparator, SEPARATOR_HTML};
pub use frontmatter::{DEFAULT_VIEWER_LINK_KEY, FrontmatterBuilder};

//! Note content model.
//!
//! # Responsibility
//! - Represent a note body as an ordered block tree.
//! - Serialize to and from the persisted markup buffer.
//! - Apply toolbar formatting to selections.
//!
//! # Invariants
//! - `Document::deserialize(&doc.serialize()).serialize() == doc.serialize()`.

pub mod document;
pub mod format;
mod html;
mod render;
mod styled;

pub use document::{Block, Caret, Document, Inline, InlineStyle};
pub use format::{FormatKind, SelectionRange, DEFAULT_HEADING_LEVEL};
pub use html::is_valid_color;
pub use styled::EMBED_CHAR;

//! Note content tree.
//!
//! # Responsibility
//! - Hold the ordered block sequence of one note body plus its images.
//! - Expose read projections (plain text, preview, word count).
//! - Append content with the editor's separator rules.
//!
//! # Invariants
//! - Every `Block::Image` id has a matching entry in `images`, and every
//!   entry in `images` is referenced by exactly one block.
//! - After any mutation, adjacent `Block::Text` runs are merged and empty
//!   runs are dropped.

use crate::content::html;
use crate::content::render;
use crate::content::styled::{self, Glyph};
use crate::model::image::{ImageId, ImageObject};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const PREVIEW_CHARS: usize = 100;

/// Inline formatting applied to a span of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    /// Background highlight with a CSS color literal.
    Highlight(String),
}

/// Inline node inside a text-bearing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    LineBreak,
    Styled {
        style: InlineStyle,
        children: Vec<Inline>,
    },
    /// Markup the editor does not model, kept verbatim.
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Inline>,
    },
}

/// Structural unit of note content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Bare inline run at the top level of the editing surface.
    Text(Vec<Inline>),
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    Quote(Vec<Inline>),
    /// Preformatted code; newlines are kept literally.
    Code(String),
    ListItem { ordered: bool, content: Vec<Inline> },
    /// Image container referencing `Document::images`.
    Image(ImageId),
}

impl Block {
    /// Returns inline children for text-bearing blocks other than code.
    pub fn inlines(&self) -> Option<&[Inline]> {
        match self {
            Self::Text(content)
            | Self::Paragraph(content)
            | Self::Quote(content)
            | Self::Heading { content, .. }
            | Self::ListItem { content, .. } => Some(content),
            Self::Code(_) | Self::Image(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// Insertion point: after `offset` glyphs of block `block`, or after the
/// whole block when `offset` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub block: usize,
    pub offset: Option<usize>,
}

impl Caret {
    pub fn after_block(block: usize) -> Self {
        Self {
            block,
            offset: None,
        }
    }
}

/// Canonical in-memory form of a note body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    images: BTreeMap<ImageId, ImageObject>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a serialized content buffer.
    ///
    /// Unknown markup is preserved as `Inline::Element`; parsing never fails.
    pub fn deserialize(buffer: &str) -> Self {
        let nodes = html::parse_fragment(buffer);
        let mut images = BTreeMap::new();
        let blocks = html::blocks_from_nodes(&nodes, &mut images);
        let mut document = Self { blocks, images };
        document.normalize();
        document
    }

    /// Serializes the tree to its canonical markup string.
    pub fn serialize(&self) -> String {
        render::render_document(&self.blocks, &self.images)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageObject> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Image(id) => self.images.get(id),
            _ => None,
        })
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageObject> {
        self.images.get(&id)
    }

    /// Ordinal of the image container among all blocks.
    pub fn image_position(&self, id: ImageId) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| matches!(block, Block::Image(current) if *current == id))
    }

    /// Flattened text used for selection offsets.
    ///
    /// Blocks are joined by `\n`, line breaks count as `\n`, image blocks
    /// contribute no characters.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            for glyph in styled::block_glyphs(block) {
                match glyph.glyph {
                    Glyph::Char(ch) => out.push(ch),
                    Glyph::Break => out.push('\n'),
                    Glyph::Embed(_) => out.push(styled::EMBED_CHAR),
                }
            }
        }
        out
    }

    /// Number of selectable characters in `plain_text`.
    pub fn text_len(&self) -> usize {
        self.plain_text().chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.plain_text()
            .split(|ch: char| ch.is_whitespace() || ch == styled::EMBED_CHAR)
            .filter(|word| !word.is_empty())
            .count()
    }

    /// Whitespace-collapsed summary of the first characters of the note.
    pub fn preview_text(&self) -> Option<String> {
        let text = self.plain_text().replace(styled::EMBED_CHAR, " ");
        let normalized = WHITESPACE_RE.replace_all(&text, " ");
        let trimmed = normalized.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.chars().take(PREVIEW_CHARS).collect())
        }
    }

    /// Appends content at the end of the document.
    ///
    /// A `<br><br>` separator precedes the payload when the document is not
    /// empty. Structured payloads are parsed as markup; plain payloads are
    /// kept as text with newlines turned into line breaks.
    pub fn insert_content(&mut self, payload: &str, is_structured: bool) {
        self.insert_content_at(None, payload, is_structured);
    }

    /// Inserts content at `caret` (`None` is the end of the document) and
    /// returns the caret just past the inserted content.
    ///
    /// A text run split by the caret keeps both halves around the payload.
    /// `<br><br>` precedes the payload when content comes before it and
    /// follows it when a text run not starting with a break comes after it.
    pub fn insert_content_at(
        &mut self,
        caret: Option<Caret>,
        payload: &str,
        is_structured: bool,
    ) -> Option<Caret> {
        let mut incoming = if is_structured {
            let nodes = html::parse_fragment(payload);
            html::blocks_from_nodes(&nodes, &mut self.images)
        } else {
            plain_blocks(payload)
        };
        if incoming.is_empty() {
            return caret;
        }

        let index = self.split_at(caret);
        if index > 0 {
            incoming.insert(0, separator());
        }
        let last_inserted = index + incoming.len() - 1;
        if self.blocks.get(index).is_some_and(starts_without_break) {
            incoming.push(separator());
        }

        self.blocks.splice(index..index, incoming).for_each(drop);
        self.merge_runs(Some(last_inserted)).or(caret)
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub(crate) fn image_mut(&mut self, id: ImageId) -> Option<&mut ImageObject> {
        self.images.get_mut(&id)
    }

    /// Inserts an image container before block `index` (clamped).
    pub(crate) fn insert_image(&mut self, index: usize, image: ImageObject) -> usize {
        let index = index.min(self.blocks.len());
        let id = image.id;
        self.images.insert(id, image);
        self.blocks.insert(index, Block::Image(id));
        index
    }

    /// Removes an image block and its object.
    pub(crate) fn remove_image(&mut self, id: ImageId) -> Option<ImageObject> {
        let position = self.image_position(id)?;
        self.blocks.remove(position);
        let removed = self.images.remove(&id);
        self.normalize();
        removed
    }

    /// Merges adjacent text runs and drops empty ones.
    pub(crate) fn normalize(&mut self) {
        self.merge_runs(None);
    }

    /// Splits the text run under `caret` and returns the block index where
    /// new content goes.
    fn split_at(&mut self, caret: Option<Caret>) -> usize {
        let len = self.blocks.len();
        let Some(caret) = caret.filter(|caret| caret.block < len) else {
            return len;
        };
        let glyphs = match &self.blocks[caret.block] {
            Block::Text(content) => styled::flatten(content),
            _ => return caret.block + 1,
        };
        match caret.offset {
            Some(0) => caret.block,
            Some(offset) if offset < glyphs.len() => {
                self.blocks[caret.block] = Block::Text(styled::build(&glyphs[..offset]));
                self.blocks
                    .insert(caret.block + 1, Block::Text(styled::build(&glyphs[offset..])));
                caret.block + 1
            }
            _ => caret.block + 1,
        }
    }

    /// Normalizes runs; when `mark` is set, returns where the end of that
    /// original block lands.
    fn merge_runs(&mut self, mark: Option<usize>) -> Option<Caret> {
        let mut merged: Vec<Block> = Vec::with_capacity(self.blocks.len());
        let mut landed = None;
        for (index, block) in self.blocks.drain(..).enumerate() {
            match block {
                Block::Text(content) if content.is_empty() => {}
                Block::Text(content) => {
                    if let Some(Block::Text(previous)) = merged.last_mut() {
                        let mut glyphs = styled::flatten(previous);
                        glyphs.extend(styled::flatten(&content));
                        *previous = styled::build(&glyphs);
                    } else {
                        merged.push(Block::Text(content));
                    }
                }
                other => merged.push(other),
            }
            if mark == Some(index) {
                landed = merged.last().map(|last| Caret {
                    block: merged.len() - 1,
                    offset: match last {
                        Block::Text(content) => Some(styled::flatten(content).len()),
                        _ => None,
                    },
                });
            }
        }
        self.blocks = merged;
        landed
    }
}

fn separator() -> Block {
    Block::Text(vec![Inline::LineBreak, Inline::LineBreak])
}

fn starts_without_break(block: &Block) -> bool {
    match block {
        Block::Text(content) => styled::flatten(content)
            .first()
            .is_some_and(|glyph| glyph.glyph != Glyph::Break),
        _ => false,
    }
}

/// Converts plain text into a single text run.
fn plain_blocks(payload: &str) -> Vec<Block> {
    if payload.is_empty() {
        return Vec::new();
    }
    let normalized = payload.replace("\r\n", "\n");
    let mut inlines = Vec::new();
    for (index, line) in normalized.split('\n').enumerate() {
        if index > 0 {
            inlines.push(Inline::LineBreak);
        }
        if !line.is_empty() {
            inlines.push(Inline::Text(line.to_string()));
        }
    }
    vec![Block::Text(inlines)]
}

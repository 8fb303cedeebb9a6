//! Selection formatting.
//!
//! # Responsibility
//! - Turn a `(start, end)` selection over `Document::plain_text` into a new
//!   tree carrying the requested inline or block format.
//!
//! # Invariants
//! - An empty selection leaves the document untouched.
//! - Block formats keep selected line breaks inside the new node, including
//!   the newlines of a code block turned into another block kind.
//! - Unselected remainders keep their original block kind.

use crate::content::document::{Block, Document, InlineStyle};
use crate::content::html::is_valid_color;
use crate::content::styled::{self, BlockShape, Glyph, StyledGlyph};
use crate::error::ValidationError;
use log::debug;

/// Default level used by the heading toolbar button.
pub const DEFAULT_HEADING_LEVEL: u8 = 3;

/// Formats offered by the editor toolbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatKind {
    Bold,
    Italic,
    Underline,
    Highlight(String),
    Heading(u8),
    Quote,
    List { ordered: bool },
    Code,
}

impl FormatKind {
    pub fn heading() -> Self {
        Self::Heading(DEFAULT_HEADING_LEVEL)
    }

    fn inline_style(&self) -> Option<InlineStyle> {
        match self {
            Self::Bold => Some(InlineStyle::Bold),
            Self::Italic => Some(InlineStyle::Italic),
            Self::Underline => Some(InlineStyle::Underline),
            Self::Highlight(color) => Some(InlineStyle::Highlight(color.trim().to_string())),
            Self::Heading(_) | Self::Quote | Self::List { .. } | Self::Code => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Highlight(_) => "highlight",
            Self::Heading(_) => "heading",
            Self::Quote => "quote",
            Self::List { .. } => "list",
            Self::Code => "code",
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Heading(level) if !(1..=6).contains(level) => {
                Err(ValidationError::InvalidHeadingLevel(*level))
            }
            Self::Highlight(color) if !is_valid_color(color) => {
                Err(ValidationError::InvalidColor(color.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Selection over flattened text, in characters. Order is not significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    fn ordered(self, len: usize) -> (usize, usize) {
        let start = self.start.min(self.end).min(len);
        let end = self.start.max(self.end).min(len);
        (start, end)
    }
}

/// Per-block slice of the selection.
struct Span {
    block: usize,
    glyphs: Vec<StyledGlyph>,
    lo: usize,
    hi: usize,
}

impl Document {
    /// Applies `kind` to the selected span.
    ///
    /// # Errors
    /// - `EmptySelection` when the clamped range is empty.
    /// - `NotFormattable` when only code or images are selected for an
    ///   inline format.
    /// - `InvalidHeadingLevel` / `InvalidColor` for bad parameters.
    pub fn apply_format(
        &mut self,
        range: SelectionRange,
        kind: &FormatKind,
    ) -> Result<(), ValidationError> {
        kind.validate()?;
        let spans = self.selected_spans(range)?;
        debug!(
            "event=apply_format module=content status=start kind={} blocks={}",
            kind.label(),
            spans.len()
        );

        match kind.inline_style() {
            Some(style) => self.apply_inline(spans, &style)?,
            None => self.apply_block(spans, kind),
        }
        self.normalize();
        Ok(())
    }

    fn selected_spans(&self, range: SelectionRange) -> Result<Vec<Span>, ValidationError> {
        let mut layout = Vec::with_capacity(self.blocks().len());
        let mut offset = 0;
        for (index, block) in self.blocks().iter().enumerate() {
            if index > 0 {
                offset += 1;
            }
            let glyphs = styled::block_glyphs(block);
            let len = glyphs.len();
            layout.push((offset, glyphs));
            offset += len;
        }

        let (start, end) = range.ordered(offset);
        if start == end {
            return Err(ValidationError::EmptySelection);
        }

        let mut spans = Vec::new();
        for (index, (block_start, glyphs)) in layout.into_iter().enumerate() {
            let block_end = block_start + glyphs.len();
            let is_image = self.blocks()[index].is_image();
            let touched = if is_image {
                block_start > start && block_start < end
            } else {
                start < block_end.max(block_start + 1) && end > block_start
            };
            if !touched {
                continue;
            }
            let lo = start.saturating_sub(block_start).min(glyphs.len());
            let hi = end.saturating_sub(block_start).min(glyphs.len());
            spans.push(Span {
                block: index,
                glyphs,
                lo,
                hi,
            });
        }

        let has_text = spans.iter().any(|span| span.hi > span.lo);
        if !has_text {
            return Err(ValidationError::EmptySelection);
        }
        while spans.first().is_some_and(|span| span.hi == span.lo) {
            spans.remove(0);
        }
        while spans.last().is_some_and(|span| span.hi == span.lo) {
            spans.pop();
        }
        Ok(spans)
    }

    fn apply_inline(
        &mut self,
        spans: Vec<Span>,
        style: &InlineStyle,
    ) -> Result<(), ValidationError> {
        let mut changed = false;
        for mut span in spans {
            let Some(shape) = BlockShape::of(&self.blocks()[span.block]) else {
                continue;
            };
            if shape == BlockShape::Code || span.hi == span.lo {
                continue;
            }
            for glyph in &mut span.glyphs[span.lo..span.hi] {
                styled::add_style(glyph, style);
            }
            self.blocks_mut()[span.block] = shape.build(&span.glyphs);
            changed = true;
        }
        if changed {
            Ok(())
        } else {
            Err(ValidationError::NotFormattable)
        }
    }

    fn apply_block(&mut self, spans: Vec<Span>, kind: &FormatKind) {
        let (Some(first), Some(last)) = (spans.first(), spans.last()) else {
            return;
        };
        let first_index = first.block;
        let last_index = last.block;
        let line_break = match kind {
            FormatKind::Code => Glyph::Char('\n'),
            _ => Glyph::Break,
        };

        let mut before = None;
        let mut after = None;
        let mut selected: Vec<StyledGlyph> = Vec::new();
        let mut images = Vec::new();
        let mut text_seen = false;

        for span in &spans {
            let block = &self.blocks()[span.block];
            let Some(shape) = BlockShape::of(block) else {
                images.push(block.clone());
                continue;
            };
            if span.block == first_index && span.lo > 0 {
                before = Some(shape.build(&span.glyphs[..span.lo]));
            }
            if span.block == last_index && span.hi < span.glyphs.len() {
                after = Some(shape.build(&span.glyphs[span.hi..]));
            }
            if text_seen {
                selected.push(StyledGlyph {
                    glyph: line_break.clone(),
                    marks: Vec::new(),
                });
            }
            let glyphs = &span.glyphs[span.lo..span.hi];
            if shape == BlockShape::Code && line_break == Glyph::Break {
                selected.extend(glyphs.iter().map(styled::newline_to_break));
            } else {
                selected.extend_from_slice(glyphs);
            }
            text_seen = true;
        }

        let mut replacement = Vec::new();
        replacement.extend(before);
        replacement.extend(formatted_blocks(kind, &selected));
        replacement.extend(images);
        replacement.extend(after);
        self.blocks_mut()
            .splice(first_index..=last_index, replacement)
            .for_each(drop);
    }
}

fn formatted_blocks(kind: &FormatKind, glyphs: &[StyledGlyph]) -> Vec<Block> {
    match kind {
        FormatKind::Heading(level) => vec![BlockShape::Heading(*level).build(glyphs)],
        FormatKind::Quote => vec![BlockShape::Quote.build(glyphs)],
        FormatKind::Code => vec![BlockShape::Code.build(glyphs)],
        FormatKind::List { ordered } => {
            let mut items: Vec<Block> = styled::split_lines(glyphs)
                .into_iter()
                .filter(|line| !line.is_empty())
                .map(|line| BlockShape::ListItem(*ordered).build(&line))
                .collect();
            if items.is_empty() {
                items.push(BlockShape::ListItem(*ordered).build(&[]));
            }
            items
        }
        FormatKind::Bold | FormatKind::Italic | FormatKind::Underline | FormatKind::Highlight(_) => {
            vec![BlockShape::Text.build(glyphs)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FormatKind, SelectionRange};
    use crate::content::document::Document;
    use crate::error::ValidationError;

    #[test]
    fn bold_wraps_only_selected_span() {
        let mut document = Document::deserialize("hello world");
        document
            .apply_format(SelectionRange::new(6, 11), &FormatKind::Bold)
            .unwrap();
        assert_eq!(document.serialize(), "hello <strong>world</strong>");
    }

    #[test]
    fn empty_range_is_rejected_without_mutation() {
        let mut document = Document::deserialize("hello");
        let err = document
            .apply_format(SelectionRange::new(3, 3), &FormatKind::Italic)
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptySelection);
        assert_eq!(document.serialize(), "hello");
    }

    #[test]
    fn heading_over_multiple_lines_keeps_breaks() {
        let mut document = Document::deserialize("intro<br>line one<br>line two");
        document
            .apply_format(SelectionRange::new(6, 23), &FormatKind::heading())
            .unwrap();
        assert_eq!(
            document.serialize(),
            "intro<br><h3>line one<br>line two</h3>"
        );
    }

    #[test]
    fn code_block_across_blocks_joins_with_newlines() {
        let mut document = Document::deserialize("<p>let a = 1;</p><p>let b = 2;</p>");
        let len = document.text_len();
        document
            .apply_format(SelectionRange::new(0, len), &FormatKind::Code)
            .unwrap();
        assert_eq!(
            document.serialize(),
            "<pre><code>let a = 1;\nlet b = 2;</code></pre>"
        );
    }

    #[test]
    fn list_creates_one_item_per_line() {
        let mut document = Document::deserialize("aspirin<br>heparin");
        document
            .apply_format(SelectionRange::new(0, 15), &FormatKind::List { ordered: true })
            .unwrap();
        assert_eq!(
            document.serialize(),
            "<ol><li>aspirin</li><li>heparin</li></ol>"
        );
    }

    #[test]
    fn highlight_replaces_previous_color() {
        let mut document = Document::deserialize("abc");
        document
            .apply_format(SelectionRange::new(0, 3), &FormatKind::Highlight("#ffff00".into()))
            .unwrap();
        document
            .apply_format(SelectionRange::new(0, 3), &FormatKind::Highlight("lime".into()))
            .unwrap();
        assert_eq!(
            document.serialize(),
            "<mark style=\"background-color: lime\">abc</mark>"
        );
    }

    #[test]
    fn inline_format_on_code_only_is_not_formattable() {
        let mut document = Document::deserialize("<pre><code>x = 1</code></pre>");
        let err = document
            .apply_format(SelectionRange::new(0, 5), &FormatKind::Bold)
            .unwrap_err();
        assert_eq!(err, ValidationError::NotFormattable);
    }

    #[test]
    fn invalid_heading_level_is_rejected() {
        let mut document = Document::deserialize("x");
        let err = document
            .apply_format(SelectionRange::new(0, 1), &FormatKind::Heading(9))
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidHeadingLevel(9));
    }

    #[test]
    fn code_newlines_become_line_breaks_in_quote_and_heading() {
        let source = "<pre><code>line one\nline two</code></pre>";

        let mut quote = Document::deserialize(source);
        let len = quote.text_len();
        quote
            .apply_format(SelectionRange::new(0, len), &FormatKind::Quote)
            .unwrap();
        assert_eq!(
            quote.serialize(),
            "<blockquote>line one<br>line two</blockquote>"
        );

        let mut heading = Document::deserialize(source);
        heading
            .apply_format(SelectionRange::new(0, len), &FormatKind::heading())
            .unwrap();
        assert_eq!(heading.serialize(), "<h3>line one<br>line two</h3>");
    }

    #[test]
    fn code_to_list_makes_one_item_per_line() {
        let mut document = Document::deserialize("<pre><code>aspirin\nheparin</code></pre>");
        let len = document.text_len();
        document
            .apply_format(SelectionRange::new(0, len), &FormatKind::List { ordered: false })
            .unwrap();
        assert_eq!(
            document.serialize(),
            "<ul><li>aspirin</li><li>heparin</li></ul>"
        );
    }
}

//! Character-level view of inline trees.
//!
//! Formatting works on a flat run of glyphs, each carrying the stack of
//! marks (outermost first) that wrap it. `build` folds such a run back into
//! the minimal inline tree, merging siblings that share a mark.

use crate::content::document::{Block, Inline, InlineStyle};

/// Character reported for embedded void elements in flattened text.
pub const EMBED_CHAR: char = '\u{FFFC}';

/// Wrapper contributed by one inline ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mark {
    Style(InlineStyle),
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
}

/// Smallest selectable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Glyph {
    Char(char),
    Break,
    /// Childless element such as an inline `<img>`.
    Embed(Inline),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StyledGlyph {
    pub glyph: Glyph,
    pub marks: Vec<Mark>,
}

/// Text-bearing block kinds, used to rebuild a block from glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockShape {
    Text,
    Paragraph,
    Heading(u8),
    Quote,
    Code,
    ListItem(bool),
}

impl BlockShape {
    pub fn of(block: &Block) -> Option<Self> {
        match block {
            Block::Text(_) => Some(Self::Text),
            Block::Paragraph(_) => Some(Self::Paragraph),
            Block::Heading { level, .. } => Some(Self::Heading(*level)),
            Block::Quote(_) => Some(Self::Quote),
            Block::Code(_) => Some(Self::Code),
            Block::ListItem { ordered, .. } => Some(Self::ListItem(*ordered)),
            Block::Image(_) => None,
        }
    }

    pub fn build(&self, glyphs: &[StyledGlyph]) -> Block {
        match self {
            Self::Text => Block::Text(build(glyphs)),
            Self::Paragraph => Block::Paragraph(build(glyphs)),
            Self::Heading(level) => Block::Heading {
                level: *level,
                content: build(glyphs),
            },
            Self::Quote => Block::Quote(build(glyphs)),
            Self::Code => Block::Code(code_text(glyphs)),
            Self::ListItem(ordered) => Block::ListItem {
                ordered: *ordered,
                content: build(glyphs),
            },
        }
    }
}

/// Glyphs of one block; image blocks have none.
pub(crate) fn block_glyphs(block: &Block) -> Vec<StyledGlyph> {
    match block {
        Block::Code(text) => text
            .chars()
            .map(|ch| StyledGlyph {
                glyph: Glyph::Char(ch),
                marks: Vec::new(),
            })
            .collect(),
        Block::Image(_) => Vec::new(),
        other => other.inlines().map(flatten).unwrap_or_default(),
    }
}

/// Flattens an inline tree into glyphs.
pub(crate) fn flatten(inlines: &[Inline]) -> Vec<StyledGlyph> {
    let mut out = Vec::new();
    let mut marks = Vec::new();
    flatten_into(inlines, &mut marks, &mut out);
    out
}

fn flatten_into(inlines: &[Inline], marks: &mut Vec<Mark>, out: &mut Vec<StyledGlyph>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.extend(text.chars().map(|ch| StyledGlyph {
                glyph: Glyph::Char(ch),
                marks: marks.clone(),
            })),
            Inline::LineBreak => out.push(StyledGlyph {
                glyph: Glyph::Break,
                marks: marks.clone(),
            }),
            Inline::Styled { style, children } => {
                marks.push(Mark::Style(style.clone()));
                flatten_into(children, marks, out);
                marks.pop();
            }
            Inline::Element {
                tag,
                attrs,
                children,
            } if children.is_empty() => out.push(StyledGlyph {
                glyph: Glyph::Embed(Inline::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                    children: Vec::new(),
                }),
                marks: marks.clone(),
            }),
            Inline::Element {
                tag,
                attrs,
                children,
            } => {
                marks.push(Mark::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                });
                flatten_into(children, marks, out);
                marks.pop();
            }
        }
    }
}

/// Folds glyphs back into the minimal inline tree.
pub(crate) fn build(glyphs: &[StyledGlyph]) -> Vec<Inline> {
    build_level(glyphs, 0)
}

fn build_level(glyphs: &[StyledGlyph], depth: usize) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < glyphs.len() {
        let mark = glyphs[start].marks.get(depth);
        let mut end = start + 1;
        while end < glyphs.len() && glyphs[end].marks.get(depth) == mark {
            end += 1;
        }
        match mark {
            None => {
                for glyph in &glyphs[start..end] {
                    push_plain(&mut out, &glyph.glyph);
                }
            }
            Some(Mark::Style(style)) => out.push(Inline::Styled {
                style: style.clone(),
                children: build_level(&glyphs[start..end], depth + 1),
            }),
            Some(Mark::Element { tag, attrs }) => out.push(Inline::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: build_level(&glyphs[start..end], depth + 1),
            }),
        }
        start = end;
    }
    out
}

fn push_plain(out: &mut Vec<Inline>, glyph: &Glyph) {
    match glyph {
        Glyph::Char(ch) => {
            if let Some(Inline::Text(text)) = out.last_mut() {
                text.push(*ch);
            } else {
                out.push(Inline::Text(ch.to_string()));
            }
        }
        Glyph::Break => out.push(Inline::LineBreak),
        Glyph::Embed(inline) => out.push(inline.clone()),
    }
}

/// Plain text of glyphs for code blocks; marks and embeds are dropped.
pub(crate) fn code_text(glyphs: &[StyledGlyph]) -> String {
    glyphs
        .iter()
        .filter_map(|glyph| match glyph.glyph {
            Glyph::Char(ch) => Some(ch),
            Glyph::Break => Some('\n'),
            Glyph::Embed(_) => None,
        })
        .collect()
}

/// Turns a literal code newline into a line break, keeping marks.
pub(crate) fn newline_to_break(glyph: &StyledGlyph) -> StyledGlyph {
    match glyph.glyph {
        Glyph::Char('\n') => StyledGlyph {
            glyph: Glyph::Break,
            marks: glyph.marks.clone(),
        },
        _ => glyph.clone(),
    }
}

/// Adds `style` to a glyph, replacing any highlight of another color.
pub(crate) fn add_style(glyph: &mut StyledGlyph, style: &InlineStyle) {
    if let InlineStyle::Highlight(_) = style {
        glyph
            .marks
            .retain(|mark| !matches!(mark, Mark::Style(InlineStyle::Highlight(_))));
    }
    let mark = Mark::Style(style.clone());
    if !glyph.marks.contains(&mark) {
        glyph.marks.push(mark);
    }
}

/// Splits glyphs on line breaks.
pub(crate) fn split_lines(glyphs: &[StyledGlyph]) -> Vec<Vec<StyledGlyph>> {
    let mut lines = vec![Vec::new()];
    for glyph in glyphs {
        if glyph.glyph == Glyph::Break {
            lines.push(Vec::new());
        } else if let Some(line) = lines.last_mut() {
            line.push(glyph.clone());
        }
    }
    lines
}

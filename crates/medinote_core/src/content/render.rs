//! Canonical markup writer.
//!
//! Output of this module is the persisted content format. Reading it back
//! with `html::parse_fragment` and writing again yields the same string.

use crate::content::document::{Block, Inline, InlineStyle};
use crate::model::image::{ImageId, ImageObject};
use std::collections::BTreeMap;

const VOID_TAGS: &[&str] = &["br", "img", "hr", "wbr", "input", "meta", "link", "source"];

pub(crate) fn render_document(blocks: &[Block], images: &BTreeMap<ImageId, ImageObject>) -> String {
    let mut out = String::new();
    let mut open_list: Option<bool> = None;

    for block in blocks {
        let item_kind = match block {
            Block::ListItem { ordered, .. } => Some(*ordered),
            _ => None,
        };
        if open_list.is_some() && open_list != item_kind {
            close_list(&mut out, open_list.take());
        }
        if open_list.is_none() {
            if let Some(ordered) = item_kind {
                out.push_str(if ordered { "<ol>" } else { "<ul>" });
                open_list = Some(ordered);
            }
        }

        match block {
            Block::Text(content) => render_inlines(content, &mut out),
            Block::Paragraph(content) => wrap("p", content, &mut out),
            Block::Heading { level, content } => wrap(&format!("h{level}"), content, &mut out),
            Block::Quote(content) => wrap("blockquote", content, &mut out),
            Block::Code(text) => {
                out.push_str("<pre><code>");
                out.push_str(&html_escape::encode_text(text));
                out.push_str("</code></pre>");
            }
            Block::ListItem { content, .. } => wrap("li", content, &mut out),
            Block::Image(id) => {
                if let Some(image) = images.get(id) {
                    render_image(image, &mut out);
                }
            }
        }
    }
    close_list(&mut out, open_list);
    out
}

fn close_list(out: &mut String, open: Option<bool>) {
    match open {
        Some(true) => out.push_str("</ol>"),
        Some(false) => out.push_str("</ul>"),
        None => {}
    }
}

fn wrap(tag: &str, content: &[Inline], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_inlines(content, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

pub(crate) fn render_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&html_escape::encode_text(text)),
            Inline::LineBreak => out.push_str("<br>"),
            Inline::Styled { style, children } => {
                let tag = match style {
                    InlineStyle::Bold => "strong",
                    InlineStyle::Italic => "em",
                    InlineStyle::Underline => "u",
                    InlineStyle::Highlight(color) => {
                        out.push_str("<mark style=\"background-color: ");
                        out.push_str(&html_escape::encode_double_quoted_attribute(color));
                        out.push_str("\">");
                        render_inlines(children, out);
                        out.push_str("</mark>");
                        continue;
                    }
                };
                wrap(tag, children, out);
            }
            Inline::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    push_attr(out, name, value);
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) && children.is_empty() {
                    continue;
                }
                render_inlines(children, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

fn render_image(image: &ImageObject, out: &mut String) {
    out.push_str("<figure class=\"image-container\"");
    push_attr(out, "data-image-id", &image.id.to_string());
    push_attr(out, "data-shape", image.shape.as_str());
    push_attr(out, "data-rotation", &image.rotation_degrees.to_string());
    push_attr(out, "data-natural-width", &image.natural_width.to_string());
    push_attr(out, "data-natural-height", &image.natural_height.to_string());
    out.push_str("><img");
    push_attr(out, "src", &image.source);
    push_attr(out, "alt", &image.caption);
    push_attr(out, "width", &image.width.to_string());
    push_attr(out, "height", &image.height.to_string());
    push_attr(
        out,
        "style",
        &format!(
            "transform: rotate({}deg); border-radius: {}",
            image.rotation_degrees,
            image.shape.border_radius()
        ),
    );
    out.push('>');
    if !image.caption.is_empty() {
        out.push_str("<figcaption>");
        out.push_str(&html_escape::encode_text(&image.caption));
        out.push_str("</figcaption>");
    }
    out.push_str("</figure>");
}

#[cfg(test)]
mod tests {
    use crate::content::document::Document;

    #[test]
    fn list_items_are_grouped_by_kind() {
        let source = "<ul><li>a</li><li>b</li></ul><ol><li>c</li></ol>";
        assert_eq!(Document::deserialize(source).serialize(), source);
    }

    #[test]
    fn code_text_is_escaped_and_keeps_newlines() {
        let source = "<pre><code>if a &lt; b {\n  go();\n}</code></pre>";
        let document = Document::deserialize(source);
        assert_eq!(document.plain_text(), "if a < b {\n  go();\n}");
        assert_eq!(document.serialize(), source);
    }

    #[test]
    fn unknown_markup_is_kept_verbatim() {
        let source = r#"see <a href="https://example.com/?a=1&amp;b=2">ref</a><sup>2</sup>"#;
        assert_eq!(Document::deserialize(source).serialize(), source);
    }
}

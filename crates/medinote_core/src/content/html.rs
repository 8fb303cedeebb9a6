//! Markup reader for note content buffers.
//!
//! # Responsibility
//! - Tokenize the HTML subset produced by the editing surface.
//! - Build a lenient element tree and map it onto blocks and inlines.
//!
//! # Invariants
//! - Parsing never fails: stray closing tags are dropped, unclosed tags are
//!   closed at the end of input, a `<` that does not start a tag is text.
//! - Image ids stay unique: a repeated `data-image-id` gets a fresh id.

use crate::content::document::{Block, Inline, InlineStyle};
use crate::model::image::{ImageId, ImageObject, ImageShape};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use uuid::Uuid;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<(/)?([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/)?>"#,
    )
    .expect("valid tag regex")
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute regex")
});
static BACKGROUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)background(?:-color)?\s*:\s*([^;]+)").expect("valid background regex")
});
static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#[0-9A-Fa-f]{3,8}|[A-Za-z]+|rgba?\([0-9.,%\s]+\))$").expect("valid color regex")
});

const VOID_TAGS: &[&str] = &["br", "img", "hr", "wbr", "input", "meta", "link", "source"];
const DEFAULT_HIGHLIGHT: &str = "yellow";
const FALLBACK_IMAGE_WIDTH: u32 = 300;
const FALLBACK_MIN_DIMENSION: u32 = 50;

/// Lenient element tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HtmlNode {
    Text(String),
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
}

impl HtmlNode {
    fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            Self::Text(_) => None,
        }
    }
}

/// Returns whether `value` is an accepted CSS color literal.
pub fn is_valid_color(value: &str) -> bool {
    COLOR_RE.is_match(value.trim())
}

struct OpenElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<HtmlNode>,
}

/// Parses a markup fragment into an element tree.
pub(crate) fn parse_fragment(input: &str) -> Vec<HtmlNode> {
    let mut root: Vec<HtmlNode> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(lt) = rest.find('<') else {
            text.push_str(rest);
            break;
        };
        text.push_str(&rest[..lt]);
        pos += lt;
        let rest = &input[pos..];

        if rest.starts_with("<!--") {
            pos += rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }

        let Some(caps) = TAG_RE.captures(rest) else {
            text.push('<');
            pos += 1;
            continue;
        };
        let whole = caps.get(0).map_or(1, |m| m.end());
        pos += whole;

        flush_text(&mut text, &mut stack, &mut root);
        let tag = caps
            .get(2)
            .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
        let closing = caps.get(1).is_some();
        let self_closing = caps.get(4).is_some();

        if closing {
            if let Some(depth) = stack.iter().rposition(|open| open.tag == tag) {
                while stack.len() > depth {
                    close_top(&mut stack, &mut root);
                }
            }
            continue;
        }

        let attrs = caps
            .get(3)
            .map(|m| parse_attrs(m.as_str()))
            .unwrap_or_default();
        if self_closing || VOID_TAGS.contains(&tag.as_str()) {
            append(
                &mut stack,
                &mut root,
                HtmlNode::Element {
                    tag,
                    attrs,
                    children: Vec::new(),
                },
            );
        } else {
            stack.push(OpenElement {
                tag,
                attrs,
                children: Vec::new(),
            });
        }
    }

    flush_text(&mut text, &mut stack, &mut root);
    while !stack.is_empty() {
        close_top(&mut stack, &mut root);
    }
    root
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((name, html_escape::decode_html_entities(value).into_owned()))
        })
        .collect()
}

fn flush_text(text: &mut String, stack: &mut [OpenElement], root: &mut Vec<HtmlNode>) {
    if text.is_empty() {
        return;
    }
    let decoded = html_escape::decode_html_entities(text.as_str()).into_owned();
    text.clear();
    let target = match stack.last_mut() {
        Some(open) => &mut open.children,
        None => root,
    };
    if let Some(HtmlNode::Text(previous)) = target.last_mut() {
        previous.push_str(&decoded);
    } else {
        target.push(HtmlNode::Text(decoded));
    }
}

fn append(stack: &mut [OpenElement], root: &mut Vec<HtmlNode>, node: HtmlNode) {
    match stack.last_mut() {
        Some(open) => open.children.push(node),
        None => root.push(node),
    }
}

fn close_top(stack: &mut Vec<OpenElement>, root: &mut Vec<HtmlNode>) {
    if let Some(open) = stack.pop() {
        let node = HtmlNode::Element {
            tag: open.tag,
            attrs: open.attrs,
            children: open.children,
        };
        append(stack, root, node);
    }
}

/// Maps a parsed tree onto blocks, registering image objects in `images`.
///
/// Images nested inside text-bearing or inline markup are lifted out into
/// their own image blocks.
pub(crate) fn blocks_from_nodes(
    nodes: &[HtmlNode],
    images: &mut BTreeMap<ImageId, ImageObject>,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut run: Vec<Inline> = Vec::new();

    for node in nodes {
        let HtmlNode::Element { tag, children, .. } = node else {
            run.push(inline_from_node(node));
            continue;
        };

        let mapped = match tag.as_str() {
            "p" => lifted(children, images, Block::Paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level: u8 = tag[1..].parse().unwrap_or(3);
                lifted(children, images, |content| Block::Heading { level, content })
            }
            "blockquote" => lifted(children, images, Block::Quote),
            "pre" => vec![Block::Code(text_content(children))],
            "ul" | "ol" => list_items(children, tag == "ol", images),
            "li" => lifted(children, images, |content| Block::ListItem {
                ordered: false,
                content,
            }),
            _ if is_image_node(node) => vec![image_block(node, images)],
            _ if contains_image(node) => {
                for segment in lift_images(std::slice::from_ref(node)) {
                    match segment {
                        Segment::Inline(nodes) => run.extend(inlines_from_nodes(&nodes)),
                        Segment::Image(image) => {
                            if !run.is_empty() {
                                blocks.push(Block::Text(std::mem::take(&mut run)));
                            }
                            blocks.push(image_block(&image, images));
                        }
                    }
                }
                continue;
            }
            _ => {
                run.push(inline_from_node(node));
                continue;
            }
        };

        if !run.is_empty() {
            blocks.push(Block::Text(std::mem::take(&mut run)));
        }
        blocks.extend(mapped);
    }

    if !run.is_empty() {
        blocks.push(Block::Text(run));
    }
    blocks
}

/// Part of a child list once nested images are lifted out.
enum Segment {
    Inline(Vec<HtmlNode>),
    Image(HtmlNode),
}

/// Splits `nodes` around images at any depth; inline wrappers are repeated
/// on both sides of an image.
fn lift_images(nodes: &[HtmlNode]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for node in nodes {
        if is_image_node(node) {
            if !current.is_empty() {
                segments.push(Segment::Inline(std::mem::take(&mut current)));
            }
            segments.push(Segment::Image(node.clone()));
            continue;
        }
        let HtmlNode::Element {
            tag,
            attrs,
            children,
        } = node
        else {
            current.push(node.clone());
            continue;
        };
        if !contains_image(node) {
            current.push(node.clone());
            continue;
        }
        for part in lift_images(children) {
            match part {
                Segment::Inline(inner) => current.push(HtmlNode::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                    children: inner,
                }),
                Segment::Image(image) => {
                    if !current.is_empty() {
                        segments.push(Segment::Inline(std::mem::take(&mut current)));
                    }
                    segments.push(Segment::Image(image));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(Segment::Inline(current));
    }
    segments
}

/// Builds text blocks with `make`, splitting them around nested images.
fn lifted<F>(
    children: &[HtmlNode],
    images: &mut BTreeMap<ImageId, ImageObject>,
    make: F,
) -> Vec<Block>
where
    F: Fn(Vec<Inline>) -> Block,
{
    let segments = lift_images(children);
    if segments.is_empty() {
        return vec![make(Vec::new())];
    }
    segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Inline(nodes) => make(inlines_from_nodes(&nodes)),
            Segment::Image(node) => image_block(&node, images),
        })
        .collect()
}

fn list_items(
    children: &[HtmlNode],
    ordered: bool,
    images: &mut BTreeMap<ImageId, ImageObject>,
) -> Vec<Block> {
    let mut items = Vec::new();
    for child in children {
        match child {
            HtmlNode::Element { tag, children, .. } if tag == "li" => {
                items.extend(lifted(children, images, |content| Block::ListItem {
                    ordered,
                    content,
                }));
            }
            HtmlNode::Text(text) if text.trim().is_empty() => {}
            other if is_image_node(other) => items.push(image_block(other, images)),
            other => items.push(Block::ListItem {
                ordered,
                content: vec![inline_from_node(other)],
            }),
        }
    }
    items
}

fn inlines_from_nodes(nodes: &[HtmlNode]) -> Vec<Inline> {
    nodes.iter().map(inline_from_node).collect()
}

fn inline_from_node(node: &HtmlNode) -> Inline {
    let (tag, attrs, children) = match node {
        HtmlNode::Text(text) => return Inline::Text(text.clone()),
        HtmlNode::Element {
            tag,
            attrs,
            children,
        } => (tag, attrs, children),
    };

    let styled = |style: InlineStyle| Inline::Styled {
        style,
        children: inlines_from_nodes(children),
    };
    match tag.as_str() {
        "br" => Inline::LineBreak,
        "b" | "strong" => styled(InlineStyle::Bold),
        "i" | "em" => styled(InlineStyle::Italic),
        "u" => styled(InlineStyle::Underline),
        "mark" => styled(InlineStyle::Highlight(
            background_color(node).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string()),
        )),
        "span" if attrs.len() == 1 => match background_color(node) {
            Some(color) => styled(InlineStyle::Highlight(color)),
            None => generic(tag, attrs, children),
        },
        _ => generic(tag, attrs, children),
    }
}

fn generic(tag: &str, attrs: &[(String, String)], children: &[HtmlNode]) -> Inline {
    Inline::Element {
        tag: tag.to_string(),
        attrs: attrs.to_vec(),
        children: inlines_from_nodes(children),
    }
}

fn background_color(node: &HtmlNode) -> Option<String> {
    let style = node.attr("style")?;
    let color = BACKGROUND_RE.captures(style)?.get(1)?.as_str().trim();
    is_valid_color(color).then(|| color.to_string())
}

fn text_content(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element { tag, .. } if tag == "br" => out.push('\n'),
            HtmlNode::Element { children, .. } => collect_text(children, out),
        }
    }
}

fn is_image_node(node: &HtmlNode) -> bool {
    match node {
        HtmlNode::Element { tag, .. } if tag == "img" => true,
        HtmlNode::Element { tag, .. } if tag == "figure" => is_image_container(node),
        _ => false,
    }
}

fn contains_image(node: &HtmlNode) -> bool {
    match node {
        HtmlNode::Element { children, .. } => children
            .iter()
            .any(|child| is_image_node(child) || contains_image(child)),
        HtmlNode::Text(_) => false,
    }
}

fn image_block(node: &HtmlNode, images: &mut BTreeMap<ImageId, ImageObject>) -> Block {
    let image = match node {
        HtmlNode::Element { tag, .. } if tag == "figure" => image_from_figure(node),
        _ => image_from_img(node, None),
    };
    register_image(image, images)
}

fn is_image_container(node: &HtmlNode) -> bool {
    node.attr("data-image-id").is_some()
        || node
            .attr("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == "image-container"))
}

fn find_child<'a>(node: &'a HtmlNode, name: &str) -> Option<&'a HtmlNode> {
    let HtmlNode::Element { children, .. } = node else {
        return None;
    };
    children.iter().find_map(|child| match child {
        HtmlNode::Element { tag, .. } if tag == name => Some(child),
        HtmlNode::Element { .. } => find_child(child, name),
        HtmlNode::Text(_) => None,
    })
}

fn image_from_figure(figure: &HtmlNode) -> ImageObject {
    let mut image = match find_child(figure, "img") {
        Some(img) => image_from_img(img, Some(figure)),
        None => image_from_img(figure, Some(figure)),
    };
    if let Some(HtmlNode::Element { children, .. }) = find_child(figure, "figcaption") {
        image.caption = text_content(children);
    }
    image
}

fn image_from_img(img: &HtmlNode, container: Option<&HtmlNode>) -> ImageObject {
    let attr = |name: &str| container.and_then(|c| c.attr(name)).or_else(|| img.attr(name));
    let number = |name: &str| attr(name).and_then(|value| value.trim().parse::<u32>().ok());

    let width = number("width").unwrap_or(FALLBACK_IMAGE_WIDTH).max(1);
    let height = number("height").unwrap_or(width).max(1);
    let natural_width = number("data-natural-width").unwrap_or(width);
    let natural_height = number("data-natural-height").unwrap_or(height);
    let mut image = ImageObject::new(
        img.attr("src").unwrap_or_default(),
        (natural_width, natural_height),
        width,
        FALLBACK_MIN_DIMENSION.min(width).min(height),
    );
    image.width = width;
    image.height = height;
    if let Some(id) = attr("data-image-id").and_then(|value| Uuid::parse_str(value).ok()) {
        image.id = id;
    }
    if let Some(shape) = attr("data-shape").and_then(ImageShape::parse) {
        image.shape = shape;
    }
    image.rotation_degrees = number("data-rotation")
        .map(|degrees| ((degrees / 90) * 90 % 360) as u16)
        .unwrap_or(0);
    image.caption = img.attr("alt").unwrap_or_default().to_string();
    image
}

fn register_image(mut image: ImageObject, images: &mut BTreeMap<ImageId, ImageObject>) -> Block {
    if images.contains_key(&image.id) {
        image.id = Uuid::new_v4();
    }
    let id = image.id;
    images.insert(id, image);
    Block::Image(id)
}

//! Dr. Mitchell persona: prompts and reply shaping.
//!
//! # Responsibility
//! - Build the prompt for each assistant action.
//! - Turn plain-text replies into insertable note markup.
//! - Split podcast scripts into speaker segments.

use crate::ai::client::LlmRequest;
use crate::speech::SpeechSegment;
use once_cell::sync::Lazy;
use regex::Regex;

pub const PERSONA_NAME: &str = "Dr. Mitchell";

const SYSTEM_PROMPT: &str = "You are Dr. Mitchell, an experienced attending physician and \
medical educator. You help medical students and clinicians understand their notes and \
source documents. Be accurate, concise and clinically grounded. When information is \
uncertain or missing from the provided context, say so. Do not invent patient data.";

/// Speaker used for podcast lines without a speaker label.
pub const NARRATOR: &str = "Narrator";

const MAX_SPEAKER_CHARS: usize = 40;

static SPEAKER_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\*\*)?([^:*\n]{1,40}?)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.*)$")
        .expect("valid speaker line regex")
});
static STAGE_DIRECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\[(].*[\])]\s*$").expect("valid stage direction regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid italic regex"));
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+(.*)$").expect("valid heading regex"));
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*•]\s+(.*)$").expect("valid bullet regex"));
static NUMBERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").expect("valid numbered regex"));

/// Assistant actions offered next to the note editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AiAction {
    /// Summarize the note or the open PDF.
    Summarize,
    /// Explain the selected passage.
    Explain,
    /// Generate study questions from the material.
    Questions,
    /// Write a two-voice teaching podcast script.
    Podcast,
    /// Free-form question in the chat panel.
    Chat,
}

impl AiAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Explain => "explain",
            Self::Questions => "questions",
            Self::Podcast => "podcast",
            Self::Chat => "chat",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Summarize => {
                "Summarize the following material for a clinician. Use short headings and \
bullet points, and highlight key findings, diagnoses and management steps."
            }
            Self::Explain => {
                "Explain the following passage in plain language, then add the clinical \
relevance in two or three sentences."
            }
            Self::Questions => {
                "Write five exam-style study questions with brief answers based on the \
following material. Number each question."
            }
            Self::Podcast => {
                "Write a short teaching podcast dialogue between Dr. Mitchell and a medical \
student named Alex about the following material. Put every line on its own row in the form \
`Speaker: text`."
            }
            Self::Chat => "Answer the following question.",
        }
    }
}

/// Builds the LLM request for `action`.
///
/// `context` is trimmed to at most `max_context_chars` characters.
pub fn build_request(
    action: AiAction,
    input: &str,
    context: Option<&str>,
    max_context_chars: usize,
) -> LlmRequest {
    let prompt = format!("{}\n\n{}", action.instruction(), input.trim());
    LlmRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        context: context
            .map(str::trim)
            .filter(|context| !context.is_empty())
            .map(|context| truncate_chars(context, max_context_chars)),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => text[..byte].to_string(),
        None => text.to_string(),
    }
}

/// Converts a plain-text reply into note markup for structured insertion.
///
/// Headings (`# `), bullets and numbered items become block nodes,
/// `**bold**` and `*italic*` become inline styles, everything else is
/// escaped text.
pub fn reply_to_html(reply: &str) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for line in reply.lines().map(str::trim) {
        let (list, body) = if let Some(caps) = BULLET_RE.captures(line) {
            (Some("ul"), caps.get(1).map_or("", |m| m.as_str()))
        } else if let Some(caps) = NUMBERED_RE.captures(line) {
            (Some("ol"), caps.get(1).map_or("", |m| m.as_str()))
        } else {
            (None, line)
        };

        if open_list.is_some() && open_list != list {
            close_list(&mut out, open_list.take());
        }
        if line.is_empty() {
            continue;
        }
        if let Some(tag) = list {
            if open_list.is_none() {
                out.push_str(&format!("<{tag}>"));
                open_list = Some(tag);
            }
            out.push_str("<li>");
            out.push_str(&inline_markup(body));
            out.push_str("</li>");
        } else if let Some(caps) = HEADING_RE.captures(line) {
            out.push_str("<h3>");
            out.push_str(&inline_markup(caps.get(1).map_or("", |m| m.as_str())));
            out.push_str("</h3>");
        } else {
            out.push_str("<p>");
            out.push_str(&inline_markup(line));
            out.push_str("</p>");
        }
    }
    close_list(&mut out, open_list);
    out
}

fn close_list(out: &mut String, open: Option<&'static str>) {
    if let Some(tag) = open {
        out.push_str(&format!("</{tag}>"));
    }
}

fn inline_markup(text: &str) -> String {
    let escaped = html_escape::encode_text(text);
    let bolded = BOLD_RE.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC_RE.replace_all(&bolded, "<em>$1</em>").into_owned()
}

/// Splits a podcast script into ordered speaker segments.
///
/// Lines shaped `Speaker: text` start a segment; unlabeled lines continue
/// the previous one (or start a narrator segment); stage directions such
/// as `[music]` are dropped.
pub fn parse_podcast_script(script: &str) -> Vec<SpeechSegment> {
    let mut segments: Vec<SpeechSegment> = Vec::new();
    for line in script.lines().map(str::trim) {
        if line.is_empty() || STAGE_DIRECTION_RE.is_match(line) {
            continue;
        }
        let labeled = SPEAKER_LINE_RE.captures(line).and_then(|caps| {
            let speaker = caps.get(1)?.as_str().trim();
            let text = caps.get(2)?.as_str().trim();
            let plausible = !speaker.is_empty()
                && speaker.chars().count() <= MAX_SPEAKER_CHARS
                && speaker.split_whitespace().count() <= 4;
            plausible.then(|| (speaker.to_string(), text.to_string()))
        });

        match labeled {
            Some((speaker, text)) => segments.push(SpeechSegment::new(speaker, text)),
            None => match segments.last_mut() {
                Some(last) => {
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(line);
                }
                None => segments.push(SpeechSegment::new(NARRATOR, line)),
            },
        }
    }
    segments.retain(|segment| !segment.text.is_empty());
    segments
}

#[cfg(test)]
mod tests {
    use super::{build_request, parse_podcast_script, reply_to_html, AiAction, NARRATOR};

    #[test]
    fn context_is_trimmed_to_budget() {
        let request = build_request(AiAction::Summarize, "note", Some("abcdef"), 4);
        assert_eq!(request.context.as_deref(), Some("abcd"));
        assert!(request.system.contains("Dr. Mitchell"));
        assert!(request.prompt.ends_with("note"));
    }

    #[test]
    fn reply_markup_escapes_and_structures() {
        let html = reply_to_html("# Key points\n- **AFib** <risk>\n- rate control\n\nDone *today*");
        assert_eq!(
            html,
            "<h3>Key points</h3><ul><li><strong>AFib</strong> &lt;risk&gt;</li>\
<li>rate control</li></ul><p>Done <em>today</em></p>"
        );
    }

    #[test]
    fn podcast_lines_become_segments() {
        let script = "[intro music]\n**Dr. Mitchell:** Welcome back.\nToday we cover sepsis.\nAlex: Great!\n";
        let segments = parse_podcast_script(script);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker, "Dr. Mitchell");
        assert_eq!(segments[0].text, "Welcome back. Today we cover sepsis.");
        assert_eq!(segments[1].speaker, "Alex");
    }

    #[test]
    fn unlabeled_script_uses_narrator() {
        let segments = parse_podcast_script("Just one paragraph of text.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker, NARRATOR);
    }
}

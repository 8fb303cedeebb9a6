//! PDF text collaborator and LLM context excerpting.
//!
//! # Responsibility
//! - Gate files handed to the extractor on the PDF signature.
//! - Turn extracted page text into a bounded context string.

use crate::error::{EditorResult, ServiceError, UnsupportedMedia};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

const PDF_MAGIC: &[u8] = b"%PDF-";
/// The signature may be preceded by junk within the first kilobyte.
const MAGIC_SEARCH_BYTES: usize = 1024;

static INLINE_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\x0C\r]+").expect("valid inline ws regex"));
static BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ ]?\n)+").expect("valid blank lines regex"));

/// File picked in the PDF pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PdfFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: u32,
}

/// Extractor output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExtraction {
    pub text: String,
    pub metadata: PdfMetadata,
}

/// Text extraction engine (external library or host API).
pub trait PdfTextExtractor {
    fn extract(&self, file: &PdfFile) -> Result<PdfExtraction, ServiceError>;
}

/// Rejects files without a `%PDF-` signature.
pub fn ensure_pdf(file: &PdfFile) -> Result<(), UnsupportedMedia> {
    let head = &file.bytes[..file.bytes.len().min(MAGIC_SEARCH_BYTES)];
    if head.windows(PDF_MAGIC.len()).any(|window| window == PDF_MAGIC) {
        Ok(())
    } else {
        Err(UnsupportedMedia::InvalidFormat {
            mime_type: "application/octet-stream".to_string(),
        })
    }
}

/// Validates `file`, extracts it and returns normalized text plus metadata.
pub fn load_pdf<X>(extractor: &X, file: &PdfFile) -> EditorResult<PdfExtraction>
where
    X: PdfTextExtractor + ?Sized,
{
    ensure_pdf(file)?;
    let extraction = extractor.extract(file).map_err(|err| {
        warn!("event=pdf_extract module=pdf status=error error={err}");
        err
    })?;
    let text = normalize_text(&extraction.text);
    info!(
        "event=pdf_extract module=pdf status=ok pages={} chars={}",
        extraction.metadata.page_count,
        text.chars().count()
    );
    Ok(PdfExtraction {
        text,
        metadata: extraction.metadata,
    })
}

/// Collapses runs of spaces and blank lines.
pub fn normalize_text(text: &str) -> String {
    let inline = INLINE_WS_RE.replace_all(text, " ");
    let lines = BLANK_LINES_RE.replace_all(&inline, "\n\n");
    lines
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// First `max_chars` characters of `text`, cut back to a word boundary.
pub fn context_excerpt(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let at_word = head
        .rfind(char::is_whitespace)
        .filter(|&boundary| boundary > 0)
        .map_or(head, |boundary| &head[..boundary]);
    format!("{}…", at_word.trim_end())
}

#[cfg(test)]
mod tests {
    use super::{context_excerpt, ensure_pdf, load_pdf, normalize_text, PdfExtraction, PdfFile};
    use super::{PdfMetadata, PdfTextExtractor};
    use crate::error::{EditorError, ServiceError, UnsupportedMedia};

    struct Fixed(&'static str);

    impl PdfTextExtractor for Fixed {
        fn extract(&self, _file: &PdfFile) -> Result<PdfExtraction, ServiceError> {
            Ok(PdfExtraction {
                text: self.0.to_string(),
                metadata: PdfMetadata {
                    page_count: 2,
                    ..PdfMetadata::default()
                },
            })
        }
    }

    #[test]
    fn signature_is_required() {
        assert!(ensure_pdf(&PdfFile::new("a.pdf", b"%PDF-1.7\n".to_vec())).is_ok());
        assert!(matches!(
            ensure_pdf(&PdfFile::new("a.png", b"\x89PNG".to_vec())),
            Err(UnsupportedMedia::InvalidFormat { .. })
        ));
    }

    #[test]
    fn load_rejects_non_pdf_before_extraction() {
        let err = load_pdf(&Fixed("x"), &PdfFile::new("x.txt", b"hello".to_vec())).unwrap_err();
        assert!(matches!(err, EditorError::UnsupportedMedia(_)));
    }

    #[test]
    fn text_is_normalized() {
        assert_eq!(
            normalize_text("  Page 1 \t title\n\n\n\nbody   text  \n"),
            "Page 1 title\n\nbody text"
        );
        let extraction =
            load_pdf(&Fixed("a  b"), &PdfFile::new("x.pdf", b"%PDF-1.4".to_vec())).unwrap();
        assert_eq!(extraction.text, "a b");
        assert_eq!(extraction.metadata.page_count, 2);
    }

    #[test]
    fn excerpt_cuts_on_word_boundary() {
        assert_eq!(context_excerpt("short", 10), "short");
        assert_eq!(context_excerpt("acute kidney injury", 10), "acute…");
    }
}

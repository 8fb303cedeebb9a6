//! Editor error taxonomy and user-facing notices.
//!
//! # Responsibility
//! - Classify every failure of an editor action into one of four kinds.
//! - Convert errors into transient notices for the UI layer.
//!
//! # Invariants
//! - No error kind is fatal; every path returns control to the caller.
//! - Notice messages never include note content.

use crate::model::image::ImageId;
use crate::model::note::NoteId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type EditorResult<T> = Result<T, EditorError>;

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Formatting was requested over an empty selection.
    EmptySelection,
    /// The selection only covers content that cannot take this format.
    NotFormattable,
    /// A required field is blank.
    MissingField(&'static str),
    /// The image operation targets an image that is not selected.
    ImageNotSelected(ImageId),
    /// Heading levels are limited to `1..=6`.
    InvalidHeadingLevel(u8),
    /// Highlight color is not a CSS color literal.
    InvalidColor(String),
    /// Configuration value out of its accepted range.
    InvalidSetting(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySelection => write!(f, "nothing selected"),
            Self::NotFormattable => write!(f, "selection cannot be formatted"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::ImageNotSelected(id) => write!(f, "image is not selected: {id}"),
            Self::InvalidHeadingLevel(level) => {
                write!(f, "heading level {level} is out of range 1..=6")
            }
            Self::InvalidColor(value) => write!(f, "invalid highlight color `{value}`"),
            Self::InvalidSetting(details) => write!(f, "invalid setting: {details}"),
        }
    }
}

impl Error for ValidationError {}

/// Rejected media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedMedia {
    /// File MIME type is not accepted for this operation.
    InvalidFormat { mime_type: String },
    /// File is larger than the configured cap.
    TooLarge { size: u64, limit: u64 },
}

impl Display for UnsupportedMedia {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat { mime_type } => write!(f, "unsupported file type `{mime_type}`"),
            Self::TooLarge { size, limit } => {
                write!(f, "file of {size} bytes exceeds the {limit} byte limit")
            }
        }
    }
}

impl Error for UnsupportedMedia {}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The collaborator lacks required configuration (API key, endpoint).
    NotConfigured(&'static str),
    /// Network or transport failure.
    Transport(String),
    /// Remote side answered with a non-success status.
    Status { code: u16, message: String },
    /// Remote answer could not be interpreted.
    MalformedResponse(String),
    /// Local persistence failure.
    Storage(String),
    /// Any other collaborator failure (speech, PDF extraction).
    Collaborator(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured(what) => write!(f, "service not configured: {what}"),
            Self::Transport(details) => write!(f, "service unreachable: {details}"),
            Self::Status { code, message } => write!(f, "service returned {code}: {message}"),
            Self::MalformedResponse(details) => write!(f, "malformed service response: {details}"),
            Self::Storage(details) => write!(f, "storage failure: {details}"),
            Self::Collaborator(details) => write!(f, "service failure: {details}"),
        }
    }
}

impl Error for ServiceError {}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value.to_string())
    }
}

/// Entity referenced by an operation does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    Note(NoteId),
    Image(ImageId),
    Article(Uuid),
    Segment(usize),
}

impl Display for NotFound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note(id) => write!(f, "note not found: {id}"),
            Self::Image(id) => write!(f, "image not found: {id}"),
            Self::Article(id) => write!(f, "article not found: {id}"),
            Self::Segment(index) => write!(f, "speech segment not found: {index}"),
        }
    }
}

impl Error for NotFound {}

/// Top-level error for editor actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    Validation(ValidationError),
    UnsupportedMedia(UnsupportedMedia),
    Service(ServiceError),
    NotFound(NotFound),
}

impl EditorError {
    /// Stable machine-readable kind label, used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnsupportedMedia(_) => "unsupported_media",
            Self::Service(_) => "service",
            Self::NotFound(_) => "not_found",
        }
    }

    /// Builds the transient notification shown for this error.
    pub fn notice(&self) -> Notice {
        match self {
            Self::Validation(ValidationError::EmptySelection) => {
                Notice::info("Please select some text first.")
            }
            Self::Validation(err) => Notice::warning(capitalize(&err.to_string())),
            Self::UnsupportedMedia(UnsupportedMedia::InvalidFormat { .. }) => {
                Notice::warning("Please choose an image file.")
            }
            Self::UnsupportedMedia(UnsupportedMedia::TooLarge { limit, .. }) => Notice::warning(
                format!("File is too large. Maximum size is {}.", human_size(*limit)),
            ),
            Self::Service(err) => Notice::error(capitalize(&err.to_string())),
            Self::NotFound(err) => Notice::warning(capitalize(&err.to_string())),
        }
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnsupportedMedia(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::NotFound(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::UnsupportedMedia(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::NotFound(err) => Some(err),
        }
    }
}

impl From<ValidationError> for EditorError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UnsupportedMedia> for EditorError {
    fn from(value: UnsupportedMedia) -> Self {
        Self::UnsupportedMedia(value)
    }
}

impl From<ServiceError> for EditorError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<NotFound> for EditorError {
    fn from(value: NotFound) -> Self {
        Self::NotFound(value)
    }
}

impl From<RepoError> for EditorError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(NotFound::Note(id)),
            RepoError::ArticleNotFound(id) => Self::NotFound(NotFound::Article(id)),
            other => Self::Service(other.into()),
        }
    }
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient notification surfaced after a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= 1024 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{bytes}B")
    }
}

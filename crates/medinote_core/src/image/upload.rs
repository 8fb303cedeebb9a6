//! Image upload validation and decoding helpers.

use crate::error::UnsupportedMedia;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// File handed over by the host's file picker or drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Rejects non-image MIME types and files above `max_bytes`.
    pub fn validate(&self, max_bytes: u64) -> Result<(), UnsupportedMedia> {
        let mime = self.mime_type.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") {
            return Err(UnsupportedMedia::InvalidFormat {
                mime_type: self.mime_type.clone(),
            });
        }
        if self.size() > max_bytes {
            return Err(UnsupportedMedia::TooLarge {
                size: self.size(),
                limit: max_bytes,
            });
        }
        Ok(())
    }

    /// Inline `data:` URI for the upload.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type.trim().to_ascii_lowercase(),
            STANDARD.encode(&self.bytes)
        )
    }

    /// Intrinsic pixel size read from the file header, when recognizable.
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        sniff_dimensions(&self.bytes)
    }
}

/// Reads width/height from PNG, GIF or JPEG headers.
pub fn sniff_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") && bytes.len() >= 24 {
        let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
        return non_zero(width, height);
    }
    if (bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) && bytes.len() >= 10 {
        let width = u32::from(u16::from_le_bytes([bytes[6], bytes[7]]));
        let height = u32::from(u16::from_le_bytes([bytes[8], bytes[9]]));
        return non_zero(width, height);
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return jpeg_dimensions(bytes);
    }
    None
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0xD8 || (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        let length = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let is_frame_header = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame_header {
            if pos + 9 > bytes.len() {
                return None;
            }
            let height = u32::from(u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]));
            let width = u32::from(u16::from_be_bytes([bytes[pos + 7], bytes[pos + 8]]));
            return non_zero(width, height);
        }
        if length < 2 {
            return None;
        }
        pos += 2 + length;
    }
    None
}

fn non_zero(width: u32, height: u32) -> Option<(u32, u32)> {
    (width > 0 && height > 0).then_some((width, height))
}

//! Embedded image handling.
//!
//! # Responsibility
//! - Validate and decode uploads.
//! - Manage selection and geometry of image objects in a document.

pub mod manager;
pub mod upload;

pub use manager::ImageManager;
pub use upload::{sniff_dimensions, ImageUpload};

//! Core domain model definitions.
//!
//! # Responsibility
//! - Define the records shared by the editor, storage and publishing.
//!
//! # Invariants
//! - Model types carry no storage or UI handles.

pub mod article;
pub mod image;
pub mod note;

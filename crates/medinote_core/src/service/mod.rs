//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and editor state into use-case APIs.
//! - Keep host UI layers decoupled from storage details.

pub mod editor_session;
pub mod knowledge_service;
pub mod note_service;

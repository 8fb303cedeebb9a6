//! AI assistant: persona prompts, LLM client and request bookkeeping.
//!
//! # Responsibility
//! - Keep the LLM behind the `LlmClient` collaborator trait.
//! - Key replies to the request that triggered them.
//!
//! # See also
//! - `ai::tracker` for stale-response rules.

pub mod assistant;
pub mod client;
pub mod persona;
pub mod tracker;

pub use assistant::{AssistantReply, AssistantService, PreparedRequest};
pub use client::{HttpLlmClient, LlmClient, LlmReply, LlmRequest};
pub use persona::AiAction;
pub use tracker::{RequestTicket, RequestTracker};

//! Stale-response guard for assistant requests.
//!
//! Each action keeps the sequence number of its latest issued request.
//! A response is accepted only if it carries that number, so a slow
//! earlier reply can never overwrite a newer one.

use crate::ai::persona::AiAction;
use std::collections::HashMap;

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    action: AiAction,
    sequence: u64,
}

impl RequestTicket {
    pub fn action(&self) -> AiAction {
        self.action
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Default)]
pub struct RequestTracker {
    counter: u64,
    latest: HashMap<AiAction, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket that supersedes every earlier one for `action`.
    pub fn issue(&mut self, action: AiAction) -> RequestTicket {
        self.counter += 1;
        self.latest.insert(action, self.counter);
        RequestTicket {
            action,
            sequence: self.counter,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest.get(&ticket.action) == Some(&ticket.sequence)
    }

    /// Whether `action` has an outstanding current ticket.
    pub fn is_pending(&self, action: AiAction) -> bool {
        self.latest.contains_key(&action)
    }

    /// Invalidates outstanding tickets for `action` (panel closed).
    pub fn cancel(&mut self, action: AiAction) {
        self.latest.remove(&action);
    }

    /// Consumes `ticket` if it is current; a ticket is accepted at most once.
    pub fn accept(&mut self, ticket: &RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.latest.remove(&ticket.action);
        true
    }
}

// src/context.rs

//! Per-request identity.

/// Explicit request context handed to every handler.
///
/// Scoped to a single request: it replaces any process-wide notion of "the
/// current transaction creator".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    creator: String,
}

impl RequestContext {
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
        }
    }

    /// Identity of the node that submitted the request.
    pub fn creator(&self) -> &str {
        &self.creator
    }
}

//! Per-operation context passed explicitly into every registrar call.

use pidreg_id::RequestId;

/// Actor name used for work started by the registrar itself.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: RequestId,
    /// Who asked, e.g. a submitter's email or `system` for sweeps.
    pub actor: String,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            actor: actor.into(),
        }
    }

    /// Context for background work.
    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR)
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}

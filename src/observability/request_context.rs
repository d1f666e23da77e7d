//! Request context propagation for correlation IDs.
//!
//! Each batch item runs under its own request ID so log lines from the
//! search client, the model client and the fusion step can be joined.

use std::cell::RefCell;
use uuid::Uuid;

/// Per-item context with correlation ID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
}

impl RequestContext {
    /// Creates a context with a generated ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Creates a context with an existing request ID.
    #[must_use]
    pub fn from_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Guard that restores the previous thread-local context on drop.
pub struct RequestContextGuard {
    previous: Option<RequestContext>,
}

impl Drop for RequestContextGuard {
    fn drop(&mut self) {
        THREAD_CONTEXT.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}

/// Enters a request context on the current thread.
#[must_use]
pub fn enter_request_context(context: RequestContext) -> RequestContextGuard {
    let previous = THREAD_CONTEXT.with(|slot| slot.borrow_mut().replace(context));
    RequestContextGuard { previous }
}

/// Returns the current request ID, if set.
#[must_use]
pub fn current_request_id() -> Option<String> {
    THREAD_CONTEXT.with(|slot| slot.borrow().as_ref().map(|ctx| ctx.request_id.clone()))
}

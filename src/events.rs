//! Lifecycle and fetch events handed to a worker script
//!
//! Handlers run synchronously and register deferred work on the event; the
//! host then awaits that work before moving the lifecycle on.

use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Request, Response};
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;
use uuid::Uuid;

/// Deferred lifecycle work registered through [`ExtendableEvent::wait_until`]
pub type PendingWork = BoxFuture<'static, PrecacheResult<()>>;

/// Deferred response registered through [`FetchEvent::respond_with`]
pub type PendingResponse = BoxFuture<'static, PrecacheResult<Response>>;

/// Event type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Install,
    Activate,
    Fetch,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Activate => write!(f, "activate"),
            Self::Fetch => write!(f, "fetch"),
        }
    }
}

/// An install or activate event whose completion can be deferred
pub struct ExtendableEvent {
    event_type: EventType,
    pending: Vec<PendingWork>,
}

impl ExtendableEvent {
    /// Create an install event
    pub fn install() -> Self {
        Self {
            event_type: EventType::Install,
            pending: Vec::new(),
        }
    }

    /// Create an activate event
    pub fn activate() -> Self {
        Self {
            event_type: EventType::Activate,
            pending: Vec::new(),
        }
    }

    /// Get event type
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Keep the event open until `work` completes. A failure fails the event.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = PrecacheResult<()>> + Send + 'static,
    {
        self.pending.push(work.boxed());
    }

    /// Check if wait_until was called
    pub fn has_wait_until(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Await every registered piece of work.
    ///
    /// All work runs to completion even if some of it fails; the first failure
    /// in registration order is returned.
    pub async fn settle(self) -> PrecacheResult<()> {
        join_all(self.pending)
            .await
            .into_iter()
            .collect::<PrecacheResult<Vec<()>>>()
            .map(|_| ())
    }
}

impl fmt::Debug for ExtendableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendableEvent")
            .field("event_type", &self.event_type)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// A fetch event for one intercepted request
pub struct FetchEvent {
    id: Uuid,
    request: Request,
    response: Option<PendingResponse>,
}

impl FetchEvent {
    /// Create a fetch event for a request
    pub fn new(request: Request) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            response: None,
        }
    }

    /// Event ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The intercepted request
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Provide the response for this request. May only be called once.
    pub fn respond_with<F>(&mut self, response: F) -> PrecacheResult<()>
    where
        F: Future<Output = PrecacheResult<Response>> + Send + 'static,
    {
        if self.response.is_some() {
            return Err(PrecacheError::Internal(format!(
                "respond_with already called for {}",
                self.request.url
            )));
        }
        self.response = Some(response.boxed());
        Ok(())
    }

    /// Whether a handler has provided a response
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Split into the request and the registered response, if any
    pub fn into_parts(self) -> (Request, Option<PendingResponse>) {
        (self.request, self.response)
    }
}

impl fmt::Debug for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchEvent")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("has_response", &self.response.is_some())
            .finish()
    }
}

//! Worker host: lifecycle state and event dispatch
//!
//! ```text
//! parsed --install--> installing --ok--> installed --activate--> activating --ok--> activated
//!                          |                 ^                        |
//!                          +--err--> redundant                        +--err--> installed
//! ```
//!
//! A redundant worker may be installed again. Fetch events are dispatched in
//! every state.

use crate::config::schema::WorkerConfig;
use crate::error::{PrecacheError, PrecacheResult};
use crate::events::{ExtendableEvent, FetchEvent};
use crate::http::{Request, Response};
use crate::network::Network;
use crate::worker::WorkerScript;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a hosted worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// Runs a [`WorkerScript`] through its lifecycle
pub struct WorkerHost<S> {
    id: Uuid,
    script: S,
    options: WorkerConfig,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    controls_clients: AtomicBool,
}

impl<S: WorkerScript> WorkerHost<S> {
    /// Host a freshly parsed worker.
    ///
    /// `network` serves fetch events the script does not respond to.
    pub fn new(script: S, options: WorkerConfig, network: Arc<dyn Network>) -> Self {
        Self::with_state(script, options, network, WorkerState::Parsed)
    }

    /// Host a worker that was installed earlier and is waiting to activate
    pub fn resume_installed(script: S, options: WorkerConfig, network: Arc<dyn Network>) -> Self {
        Self::with_state(script, options, network, WorkerState::Installed)
    }

    fn with_state(
        script: S,
        options: WorkerConfig,
        network: Arc<dyn Network>,
        state: WorkerState,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            script,
            options,
            network,
            state: RwLock::new(state),
            controls_clients: AtomicBool::new(false),
        }
    }

    /// Worker ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether the worker has claimed its clients
    pub fn controls_clients(&self) -> bool {
        self.controls_clients.load(Ordering::SeqCst)
    }

    /// Dispatch the install event and wait for it to settle.
    ///
    /// With `skip_waiting` the worker is activated right after a successful
    /// install. Returns the state reached.
    pub async fn install(&self) -> PrecacheResult<WorkerState> {
        self.begin(
            "install",
            &[WorkerState::Parsed, WorkerState::Redundant],
            WorkerState::Installing,
        )
        .await?;

        let mut event = ExtendableEvent::install();
        self.script.on_install(&mut event);

        if let Err(e) = event.settle().await {
            warn!("Install of worker {} failed: {}", self.id, e);
            self.set_state(WorkerState::Redundant).await;
            return Err(e);
        }

        self.set_state(WorkerState::Installed).await;
        info!("Worker {} installed", self.id);

        if self.options.skip_waiting {
            debug!("Skipping waiting phase");
            return self.activate().await;
        }
        Ok(WorkerState::Installed)
    }

    /// Dispatch the activate event and wait for it to settle.
    ///
    /// On failure the worker stays installed so activation can be retried.
    pub async fn activate(&self) -> PrecacheResult<WorkerState> {
        self.begin(
            "activate",
            &[WorkerState::Installed],
            WorkerState::Activating,
        )
        .await?;

        let mut event = ExtendableEvent::activate();
        self.script.on_activate(&mut event);

        if let Err(e) = event.settle().await {
            warn!("Activation of worker {} failed: {}", self.id, e);
            self.set_state(WorkerState::Installed).await;
            return Err(e);
        }

        self.set_state(WorkerState::Activated).await;
        info!("Worker {} activated", self.id);

        if self.options.claim_clients {
            self.controls_clients.store(true, Ordering::SeqCst);
            debug!("Worker {} now controls its clients", self.id);
        }
        Ok(WorkerState::Activated)
    }

    /// Dispatch a fetch event and return the response.
    ///
    /// Requests the script does not respond to go straight to the network.
    pub async fn fetch(&self, request: Request) -> PrecacheResult<Response> {
        let mut event = FetchEvent::new(request);
        self.script.on_fetch(&mut event);

        match event.into_parts() {
            (_, Some(response)) => response.await,
            (request, None) => self.network.fetch(&request).await,
        }
    }

    async fn begin(
        &self,
        action: &'static str,
        from: &[WorkerState],
        to: WorkerState,
    ) -> PrecacheResult<()> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(PrecacheError::InvalidState {
                action,
                state: *state,
            });
        }
        debug!("Worker {}: {} -> {}", self.id, *state, to);
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        let mut state = self.state.write().await;
        debug!("Worker {}: {} -> {}", self.id, *state, to);
        *state = to;
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Startup Sequence Controller
//!
//! Brings the streaming subsystem up in a fixed order and reports whether
//! it is usable:
//!
//! ```text
//! wait for cluster ready ─► fetch credential ─► connect via seed address ─► Ready
//!          │                       │                      │
//!          └────────── any failure ┴──────────────────────┴─► Failed
//! ```
//!
//! Steps are not retried here. The readiness gate polls on its own; every
//! other failure ends the attempt and the caller decides whether to run
//! [`StartupSequenceController::initialize`] again.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StreamingConfig;
use crate::connection::ConnectionManager;
use crate::errors::{StartupStage, StreamingError, StreamingResult};
use crate::readiness::ReadyGate;
use crate::secret::SecretProvider;
use crate::state_machine::{
    StartupCommand, StartupPhase, StateMachineWithHistory, Transition,
};

/// Orchestrates readiness, authentication and connection
pub struct StartupSequenceController {
    gate: Arc<dyn ReadyGate>,
    secrets: Arc<dyn SecretProvider>,
    connection: Arc<dyn ConnectionManager>,
    config: Arc<StreamingConfig>,
    clock: Arc<dyn Clock>,
    lifecycle: Mutex<StateMachineWithHistory<StartupPhase>>,
}

impl StartupSequenceController {
    /// Create a controller in the `NotStarted` phase
    pub fn new(
        gate: Arc<dyn ReadyGate>,
        secrets: Arc<dyn SecretProvider>,
        connection: Arc<dyn ConnectionManager>,
        config: Arc<StreamingConfig>,
    ) -> Self {
        Self {
            gate,
            secrets,
            connection,
            config,
            clock: Arc::new(SystemClock),
            lifecycle: Mutex::new(StateMachineWithHistory::new(StartupPhase::NotStarted)),
        }
    }

    /// Timestamp phase transitions with `clock`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lifecycle(&self) -> MutexGuard<'_, StateMachineWithHistory<StartupPhase>> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(&self, command: StartupCommand) -> StreamingResult<()> {
        let now = self.clock.now();
        self.lifecycle().transition_with_history(command, now)?;
        Ok(())
    }

    /// Current phase
    pub fn phase(&self) -> StartupPhase {
        *self.lifecycle().current_state()
    }

    /// Phase transitions so far, oldest first
    pub fn history(&self) -> Vec<Transition<StartupPhase, StartupCommand>> {
        self.lifecycle().get_history().to_vec()
    }

    /// Run the startup sequence
    ///
    /// Returns immediately when already ready. Fails with a transition error
    /// when another initialization is in progress, or when `shutdown` ran
    /// before the sequence finished. Dropping the future mid-sequence leaves
    /// the controller `Failed`.
    #[instrument(skip_all, fields(namespace = %self.config.namespace))]
    pub async fn initialize(&self, cancel: &CancellationToken) -> StreamingResult<()> {
        {
            let mut lifecycle = self.lifecycle();
            if *lifecycle.current_state() == StartupPhase::Ready {
                info!("Streaming already initialized");
                return Ok(());
            }
            let now = self.clock.now();
            lifecycle.transition_with_history(StartupCommand::Begin, now)?;
        }

        info!("Starting streaming initialization sequence");

        let mut attempt = AttemptGuard::new(self);
        let outcome = self.run_steps(cancel).await;
        attempt.disarm();

        if let Err(e) = outcome {
            error!(error = %e, "Streaming initialization failed");
            if let Err(transition) = self.apply(StartupCommand::Fail) {
                warn!(error = %transition, "Startup phase changed during initialization");
            }
            return Err(e);
        }

        if let Err(transition) = self.apply(StartupCommand::Complete) {
            // Shutdown ran while we were connecting; nobody owns this connection
            warn!(error = %transition, "Startup phase changed during initialization, closing connection");
            if let Err(close_err) = self.connection.close().await {
                warn!(error = %close_err, "Failed to close connection after interrupted startup");
            }
            return Err(transition);
        }
        info!("Streaming initialization completed successfully");
        Ok(())
    }

    async fn run_steps(&self, cancel: &CancellationToken) -> StreamingResult<()> {
        info!(timeout = ?self.config.startup_timeout, "Step 1: waiting for stream cluster to be ready");
        self.gate
            .wait_for_ready(cancel)
            .await
            .map_err(|e| StreamingError::startup(StartupStage::ClusterReadiness, e))?;
        info!("Stream cluster is ready");

        info!("Step 2: retrieving stream store credential");
        let credential = self
            .secrets
            .get_credential()
            .await
            .map_err(|e| StreamingError::startup(StartupStage::Authentication, e))?;
        if credential.is_empty() {
            return Err(StreamingError::startup(
                StartupStage::Authentication,
                StreamingError::Secret("credential is empty".to_string()),
            ));
        }
        info!("Stream store credential retrieved");

        let seed_address = self.config.seed_address();
        info!(seed = %seed_address, "Step 3: establishing stream cluster connection");
        self.connection
            .initialize_cluster(&seed_address, &credential)
            .await
            .map_err(|e| StreamingError::startup(StartupStage::Connection, e))?;
        info!("Stream cluster connection established");

        Ok(())
    }

    /// Whether startup completed and the connection is still up
    pub async fn is_ready(&self) -> bool {
        self.phase() == StartupPhase::Ready && self.connection.is_connected().await
    }

    /// Leave the ready phase and close the connection
    ///
    /// The phase is reset before closing, so a failed close never leaves the
    /// controller reporting ready.
    #[instrument(skip_all)]
    pub async fn shutdown(&self) -> StreamingResult<()> {
        info!("Shutting down streaming");
        self.apply(StartupCommand::Reset)?;
        self.connection.close().await
    }
}

/// Marks the attempt failed when `initialize` is dropped mid-sequence
struct AttemptGuard<'a> {
    controller: &'a StartupSequenceController,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(controller: &'a StartupSequenceController) -> Self {
        Self {
            controller,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Streaming initialization abandoned before completion");
        if let Err(e) = self.controller.apply(StartupCommand::Fail) {
            debug!(error = %e, "Startup phase already left initializing");
        }
    }
}

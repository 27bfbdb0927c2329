// Copyright (c) 2025 - Cowboy AI, Inc.
//! Startup Phase State Machine
//!
//! Lifecycle of the streaming subsystem, driven by the startup controller.
//!
//! # States
//!
//! - NotStarted: initial, and again after shutdown
//! - Initializing: startup sequence in progress
//! - Ready: connected and accepting publishes
//! - Failed: the last startup attempt failed
//!
//! # Inputs
//!
//! - Begin: NotStarted | Failed → Initializing
//! - Complete: Initializing → Ready
//! - Fail: Initializing → Failed
//! - Reset: Any → NotStarted

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Phase of the streaming subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StartupPhase {
    /// Not started, or shut down
    #[default]
    NotStarted,
    /// Startup sequence running
    Initializing,
    /// Connected and ready
    Ready,
    /// Last startup attempt failed
    Failed,
}

impl StartupPhase {
    /// Phase name for logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            StartupPhase::NotStarted => "not_started",
            StartupPhase::Initializing => "initializing",
            StartupPhase::Ready => "ready",
            StartupPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Startup lifecycle command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupCommand {
    /// Start the startup sequence
    Begin,
    /// Every startup step succeeded
    Complete,
    /// A startup step failed
    Fail,
    /// Shut down
    Reset,
}

impl StartupCommand {
    /// Phase this command leads to when accepted
    pub fn target(&self) -> StartupPhase {
        match self {
            StartupCommand::Begin => StartupPhase::Initializing,
            StartupCommand::Complete => StartupPhase::Ready,
            StartupCommand::Fail => StartupPhase::Failed,
            StartupCommand::Reset => StartupPhase::NotStarted,
        }
    }
}

impl StateMachine for StartupPhase {
    type Input = StartupCommand;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use StartupCommand::*;
        use StartupPhase::*;

        match (self, input) {
            (NotStarted | Failed, Begin) => Ok((Initializing, ())),
            (Initializing, Complete) => Ok((Ready, ())),
            (Initializing, Fail) => Ok((Failed, ())),
            (_, Reset) => Ok((NotStarted, ())),

            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                to: input.target().to_string(),
            }),
        }
    }
}

// src/orchestrator.rs

use std::{sync::Arc, thread};

use anyhow::Context;
use crossbeam::channel;

use crate::errors::EngineError;
use crate::profiles::applier::ProfileApplier;
use crate::profiles::{ApplyReport, ProfileMode};

/// An operation the engine can run in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    Apply(ProfileMode),
    Restore,
}

/// The result of a processed action.
#[derive(Debug)]
pub struct ProfileTaskResult {
    pub action: ProfileAction,
    pub outcome: Result<ApplyReport, EngineError>,
}

/// Runs apply/restore off the calling thread and funnels results back over a
/// channel. The engine's own lock serializes overlapping submissions.
pub struct ProfileOrchestrator {
    applier: Arc<ProfileApplier>,
    result_receiver: channel::Receiver<ProfileTaskResult>,
    result_sender: channel::Sender<ProfileTaskResult>,
}

impl ProfileOrchestrator {
    pub fn new(applier: Arc<ProfileApplier>) -> Self {
        let (result_sender, result_receiver) = channel::unbounded::<ProfileTaskResult>();
        Self {
            applier,
            result_sender,
            result_receiver,
        }
    }

    /// Submits an action to be processed on a worker thread.
    pub fn submit(&self, action: ProfileAction) -> anyhow::Result<()> {
        let applier = self.applier.clone();
        let result_sender = self.result_sender.clone();
        thread::spawn(move || {
            let outcome = match action {
                ProfileAction::Apply(mode) => applier.apply(mode),
                ProfileAction::Restore => applier.restore(),
            };
            if let Err(e) = result_sender.send(ProfileTaskResult { action, outcome }) {
                tracing::error!("Failed to send result: {:?}", e);
            }
        });
        Ok(())
    }

    /// Attempts to receive a result without blocking.
    pub fn try_recv_result(&self) -> Option<ProfileTaskResult> {
        self.result_receiver.try_recv().ok()
    }

    /// Blocks until the next result arrives.
    pub fn recv_result(&self) -> anyhow::Result<ProfileTaskResult> {
        self.result_receiver
            .recv()
            .context("orchestrator worker disconnected")
    }
}

// ── Command dispatch ──
//
// All device mutations flow through `Workflow`s: ordered command sequences
// executed strictly in order against one entity, aborting on the first
// failed step. Progress is observed through a `watch` channel rather than
// callbacks; the dispatcher never touches the StateStore -- server-side
// effects arrive later through the push channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::EntityId;

/// A single remote command: an action name plus optional typed parameters.
///
/// The action vocabulary is open and string-keyed (`turn_on`,
/// `set_brightness`, `set_location`, `simulate_motion`, ...) -- it is
/// device-type-specific and extensible, so it is deliberately not an enum.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub action: String,
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// An ordered, abort-on-failure sequence of commands for one entity.
///
/// The `trigger` key identifies the control that started the workflow;
/// at most one workflow per trigger runs at a time.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub trigger: String,
    pub entity: EntityId,
    pub steps: Vec<Command>,
}

impl Workflow {
    pub fn new(trigger: impl Into<String>, entity: EntityId, steps: Vec<Command>) -> Self {
        Self {
            trigger: trigger.into(),
            entity,
            steps,
        }
    }

    /// Convenience for the common single-command case.
    pub fn single(trigger: impl Into<String>, entity: EntityId, command: Command) -> Self {
        Self::new(trigger, entity, vec![command])
    }
}

/// Observable lifecycle of a dispatched workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStatus {
    Idle,
    Running { step: usize },
    Succeeded,
    Failed { step: usize, error: String },
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// Handle to a dispatched workflow's status.
pub struct WorkflowHandle {
    trigger: String,
    status: watch::Receiver<WorkflowStatus>,
}

impl WorkflowHandle {
    /// The trigger key this workflow was dispatched under.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Current status.
    pub fn status(&self) -> WorkflowStatus {
        self.status.borrow().clone()
    }

    /// Wait until the workflow reaches `Succeeded` or `Failed`.
    ///
    /// The terminal status stays visible for the dispatcher's cool-down
    /// before the channel resets to `Idle`, so a consumer that subscribes
    /// promptly will observe it.
    pub async fn wait_terminal(&mut self) -> WorkflowStatus {
        loop {
            let current = self.status.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if self.status.changed().await.is_err() {
                return self.status.borrow().clone();
            }
        }
    }

    /// Subscribe to every status transition.
    pub fn watch(&self) -> watch::Receiver<WorkflowStatus> {
        self.status.clone()
    }
}

// ── Transport seam ───────────────────────────────────────────────────

/// Executes one command against the remote hub.
///
/// Object-safe so the dispatcher can run against the real REST client or
/// a scripted test double.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send_command(&self, entity: &EntityId, command: &Command) -> Result<(), CoreError>;
}

#[async_trait]
impl CommandTransport for homelink_api::HubClient {
    async fn send_command(&self, entity: &EntityId, command: &Command) -> Result<(), CoreError> {
        self.send_command(entity.as_str(), &command.action, &command.params)
            .await
            .map(|_ack| ())
            .map_err(|e| match e {
                homelink_api::Error::CommandRejected { message } => CoreError::CommandFailed {
                    action: command.action.clone(),
                    message,
                },
                other => CoreError::CommandFailed {
                    action: command.action.clone(),
                    message: other.to_string(),
                },
            })
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────

/// Sequences workflows: strict step order, abort on first failure,
/// per-trigger re-entrancy guard, terminal-status cool-down.
///
/// Cheaply cloneable; clones share the transport and the guard set.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn CommandTransport>,
    in_flight: Arc<DashMap<String, ()>>,
    cooldown: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn CommandTransport>, cooldown: Duration) -> Self {
        Self {
            transport,
            in_flight: Arc::new(DashMap::new()),
            cooldown,
        }
    }

    /// Start executing a workflow in the background.
    ///
    /// Returns [`CoreError::WorkflowBusy`] without starting anything if a
    /// workflow with the same trigger is still running or cooling down --
    /// this is the re-entrancy guard, not a queue. There is no cancellation
    /// primitive: once dispatched, a workflow runs to its own outcome.
    pub fn dispatch(&self, workflow: Workflow) -> Result<WorkflowHandle, CoreError> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(workflow.trigger.clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::WorkflowBusy {
                    trigger: workflow.trigger,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let (status_tx, status_rx) = watch::channel(WorkflowStatus::Idle);
        let handle = WorkflowHandle {
            trigger: workflow.trigger.clone(),
            status: status_rx,
        };

        let transport = Arc::clone(&self.transport);
        let in_flight = Arc::clone(&self.in_flight);
        let cooldown = self.cooldown;
        let trigger = workflow.trigger.clone();
        tokio::spawn(async move {
            run_workflow(transport, workflow, &status_tx).await;

            // Hold the terminal status visible, then release the trigger.
            tokio::time::sleep(cooldown).await;
            let _ = status_tx.send(WorkflowStatus::Idle);
            in_flight.remove(&trigger);
        });

        Ok(handle)
    }

    /// Whether a workflow with this trigger is running or cooling down.
    pub fn is_busy(&self, trigger: &str) -> bool {
        self.in_flight.contains_key(trigger)
    }
}

/// Execute steps strictly in order, publishing status transitions.
async fn run_workflow(
    transport: Arc<dyn CommandTransport>,
    workflow: Workflow,
    status_tx: &watch::Sender<WorkflowStatus>,
) {
    for (step, command) in workflow.steps.iter().enumerate() {
        let _ = status_tx.send(WorkflowStatus::Running { step });
        debug!(
            trigger = %workflow.trigger,
            entity = %workflow.entity,
            action = %command.action,
            step,
            "executing workflow step"
        );

        if let Err(e) = transport.send_command(&workflow.entity, command).await {
            warn!(
                trigger = %workflow.trigger,
                step,
                error = %e,
                "workflow step failed, aborting remaining steps"
            );
            let _ = status_tx.send(WorkflowStatus::Failed {
                step,
                error: e.to_string(),
            });
            return;
        }
    }

    let _ = status_tx.send(WorkflowStatus::Succeeded);
}

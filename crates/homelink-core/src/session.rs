// ── Session ──
//
// One `Session` owns everything that belongs to one hub connection: the
// store, the reconciler, the dispatcher, the analytics requester, the push
// channel, and the background pump task. Nothing here is global; dropping
// the session (or calling `disconnect`) tears the whole thing down, and a
// new session starts from a clean store and a fresh uptime clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use homelink_api::{ConnectivityState, HubClient, PushHandle, TransportConfig};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsRequester, EnergyReport};
use crate::config::HubConfig;
use crate::dispatch::{Dispatcher, Workflow, WorkflowHandle};
use crate::error::CoreError;
use crate::model::EntityId;
use crate::projection;
use crate::reconcile::{MergeOutcome, Reconciler};
use crate::store::StateStore;

const CHANGES_CHANNEL_CAPACITY: usize = 256;

/// A live connection to one hub.
pub struct Session {
    config: HubConfig,
    client: Arc<HubClient>,
    store: Arc<StateStore>,
    reconciler: Reconciler,
    dispatcher: Dispatcher,
    analytics: AnalyticsRequester,
    changes: broadcast::Sender<Arc<MergeOutcome>>,
    connectivity: watch::Sender<ConnectivityState>,
    cancel: CancellationToken,
    push: Option<PushHandle>,
    tasks: Vec<JoinHandle<()>>,
    started_at: Instant,
}

impl Session {
    /// Build a session for the given hub. No network traffic happens until
    /// [`connect`](Self::connect).
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let client = Arc::new(HubClient::new(config.url.clone(), &transport)?);

        let store = Arc::new(StateStore::new());
        let reconciler = Reconciler::new(Arc::clone(&store));
        let dispatcher = Dispatcher::new(
            Arc::clone(&client) as Arc<dyn crate::dispatch::CommandTransport>,
            config.command_cooldown,
        );
        let analytics = AnalyticsRequester::new(
            Arc::clone(&client) as Arc<dyn crate::analytics::EnergyReportSource>,
        );
        let (changes, _) = broadcast::channel(CHANGES_CHANNEL_CAPACITY);
        let (connectivity, _) = watch::channel(ConnectivityState::Offline);

        Ok(Self {
            config,
            client,
            store,
            reconciler,
            dispatcher,
            analytics,
            changes,
            connectivity,
            cancel: CancellationToken::new(),
            push: None,
            tasks: Vec::new(),
            started_at: Instant::now(),
        })
    }

    /// Connect: seed the store from `GET /api/devices`, then open the push
    /// channel and start pumping frames into the reconciler.
    ///
    /// The seed goes through the same merge path as push frames, so motion
    /// edges and change notifications behave identically for initial load.
    pub async fn connect(&mut self) -> Result<(), CoreError> {
        if self.push.is_some() {
            return Ok(());
        }

        let devices = self.client.get_devices().await.map_err(CoreError::from)?;
        let outcome = self
            .reconciler
            .seed(devices.into_iter().map(|(id, fields)| (EntityId::from(id), fields)));
        info!(entities = outcome.changed.len(), "store seeded from hub");
        let _ = self.changes.send(Arc::new(outcome));

        let ws_url = self.config.ws_url()?;
        let push = PushHandle::connect(
            ws_url,
            self.config.reconnect.clone(),
            self.cancel.child_token(),
        );

        self.tasks.push(spawn_connectivity_forwarder(
            push.connectivity(),
            self.connectivity.clone(),
        ));
        self.tasks.push(spawn_pump(
            push.subscribe(),
            self.reconciler.clone(),
            self.changes.clone(),
            self.cancel.clone(),
        ));
        self.push = Some(push);
        Ok(())
    }

    /// Tear down background tasks and the push channel.
    ///
    /// Idempotent. Running workflows are not interrupted; they finish
    /// against whatever the transport still allows.
    pub async fn disconnect(&mut self) {
        self.cancel.cancel();
        if let Some(push) = self.push.take() {
            push.shutdown();
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                debug!(error = %e, "session task join failed");
            }
        }
        let _ = self.connectivity.send(ConnectivityState::Offline);
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn client(&self) -> &Arc<HubClient> {
        &self.client
    }

    /// Push-channel connectivity. `Offline` until [`connect`](Self::connect).
    pub fn connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.connectivity.subscribe()
    }

    /// Per-push-message change notifications (one `MergeOutcome` per frame,
    /// plus one for the initial seed).
    pub fn changes(&self) -> broadcast::Receiver<Arc<MergeOutcome>> {
        self.changes.subscribe()
    }

    /// Start a workflow. See [`Dispatcher::dispatch`].
    pub fn dispatch(&self, workflow: Workflow) -> Result<WorkflowHandle, CoreError> {
        self.dispatcher.dispatch(workflow)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetch a fresh energy report. See [`AnalyticsRequester::run_report`].
    pub async fn run_report(&self) -> Result<Arc<EnergyReport>, CoreError> {
        self.analytics.run_report().await
    }

    pub fn analytics(&self) -> &AnalyticsRequester {
        &self.analytics
    }

    /// Motion-sensor activation edges observed this session.
    pub fn motion_edges(&self) -> u64 {
        self.reconciler.motion_edges()
    }

    /// Push frames dropped as malformed this session.
    pub fn malformed_payloads(&self) -> u64 {
        self.reconciler.malformed_payloads()
    }

    /// Time since this session object was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Uptime as `H:MM`.
    pub fn uptime_display(&self) -> String {
        projection::format_uptime(self.uptime())
    }

    /// Current local wall-clock time, for display alongside uptime.
    pub fn clock_display() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// Mirror the push channel's connectivity into the session-owned signal.
///
/// The session signal outlives any single push handle, so consumers keep
/// one receiver across connect/disconnect.
fn spawn_connectivity_forwarder(
    mut source: watch::Receiver<ConnectivityState>,
    sink: watch::Sender<ConnectivityState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let state = *source.borrow_and_update();
            let _ = sink.send(state);
            if source.changed().await.is_err() {
                break;
            }
        }
    })
}

/// The pump: sole writer of the StateStore.
///
/// Reads raw frames in delivery order, merges each one fully before taking
/// the next, and broadcasts the resulting change set. Malformed frames are
/// logged and skipped.
fn spawn_pump(
    mut raw: broadcast::Receiver<Arc<str>>,
    reconciler: Reconciler,
    changes: broadcast::Sender<Arc<MergeOutcome>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = raw.recv() => match frame {
                    Ok(raw_frame) => match reconciler.on_message(&raw_frame) {
                        Ok(outcome) => {
                            let _ = changes.send(Arc::new(outcome));
                        }
                        Err(e) => {
                            warn!(error = %e, "dropped malformed push frame");
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "pump lagged behind push channel");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("pump task exiting");
    })
}

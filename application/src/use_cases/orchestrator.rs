//! Orchestrator facade
//!
//! Wires the session registry, the idle sweeper and the time-accrual
//! checkpointer together, exposes the entry points the platform adapter
//! calls, and owns the two background tickers.

use super::checkpointer::{FlushReport, TimeTrackerRegistry};
use super::error::OrchestratorError;
use super::idle_sweeper::{IdleSweeper, SweepReport};
use super::provision::ChannelProvisioner;
use super::session_registry::{SessionRegistry, StartSessionInput, VoteReceipt};
use crate::config::OrchestratorConfig;
use crate::ports::chat_platform::{ChatPlatform, PlatformEvent};
use crate::ports::checkpoint_store::CheckpointStore;
use crate::ports::clock::Clock;
use crate::ports::session_logger::SessionEventLogger;
use crate::ports::squad_namer::SquadNamer;
use squad_domain::{MemberId, ScopeId, Session};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// External adapters the orchestrator needs
pub struct OrchestratorPorts<P: ChatPlatform + 'static> {
    pub platform: Arc<P>,
    pub namer: Arc<dyn SquadNamer>,
    pub store: Arc<dyn CheckpointStore>,
    pub clock: Arc<dyn Clock>,
    pub logger: Arc<dyn SessionEventLogger>,
}

pub struct Orchestrator<P: ChatPlatform + 'static> {
    platform: Arc<P>,
    sessions: Arc<SessionRegistry<P>>,
    trackers: Arc<TimeTrackerRegistry>,
    sweeper: Arc<IdleSweeper<P>>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl<P: ChatPlatform + 'static> Orchestrator<P> {
    pub fn new(ports: OrchestratorPorts<P>, config: OrchestratorConfig) -> Self {
        let provisioner = ChannelProvisioner::new(
            Arc::clone(&ports.platform),
            config.squads.naming.clone(),
            config.provisioner.clone(),
        );
        let sessions = Arc::new(SessionRegistry::new(
            Arc::clone(&ports.platform),
            provisioner,
            ports.namer,
            Arc::clone(&ports.clock),
            ports.logger,
            config.squads.clone(),
        ));
        let sweeper = Arc::new(IdleSweeper::new(
            Arc::clone(&ports.platform),
            Arc::clone(&sessions),
            config.sweeper.clone(),
        ));
        let trackers = Arc::new(TimeTrackerRegistry::new(
            ports.store,
            ports.clock,
            config.checkpoint.clone(),
        ));

        Self {
            platform: ports.platform,
            sessions,
            trackers,
            sweeper,
            config,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry<P> {
        &self.sessions
    }

    pub fn trackers(&self) -> &TimeTrackerRegistry {
        &self.trackers
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Make squad composition reproducible
    pub fn reseed(&self, seed: u64) {
        self.sessions.reseed(seed);
    }

    // ==================== Lifecycle ====================

    /// Seed trackers for members already connected and start the tickers.
    ///
    /// Returns the number of trackers seeded.
    pub async fn init(&self) -> Result<usize, OrchestratorError> {
        let connected = self.platform.connected_members().await?;
        let seeded = self.trackers.seed(&connected);

        let sweeper = Arc::clone(&self.sweeper);
        self.spawn_ticker("idle sweep", self.config.sweeper.interval, move || {
            let sweeper = Arc::clone(&sweeper);
            async move {
                let report = sweeper.sweep().await;
                if report.expired > 0 {
                    info!("Idle sweep expired {} sessions", report.expired);
                }
            }
        });

        let trackers = Arc::clone(&self.trackers);
        self.spawn_ticker("checkpoint", self.config.checkpoint.interval, move || {
            let trackers = Arc::clone(&trackers);
            async move {
                trackers.flush_due().await;
            }
        });

        info!(
            "Orchestrator started (sweep every {:?}, checkpoint every {:?})",
            self.config.sweeper.interval, self.config.checkpoint.interval
        );
        Ok(seeded)
    }

    /// Stop the tickers, flush every tracker and wait for pending deletions
    pub async fn shutdown(&self) -> FlushReport {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        let report = self.trackers.flush_all().await;
        self.sessions.shutdown().await;
        info!(
            "Orchestrator stopped ({}s flushed for {} members)",
            report.seconds, report.written
        );
        report
    }

    fn spawn_ticker<F, Fut>(&self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => tick().await,
                }
            }
            debug!("{} ticker stopped", name);
        });
    }

    // ==================== Entry points ====================

    pub async fn start_session(&self, input: StartSessionInput) -> Result<Session, OrchestratorError> {
        self.sessions.start_session(input).await
    }

    pub async fn handle_vote(
        &self,
        scope: &ScopeId,
        squad: &str,
        voter: MemberId,
    ) -> Result<VoteReceipt, OrchestratorError> {
        self.sessions.handle_vote(scope, squad, voter).await
    }

    pub async fn explicit_teardown(&self, scope: &ScopeId) -> Result<Session, OrchestratorError> {
        self.sessions.explicit_teardown(scope).await
    }

    pub fn on_member_connect(&self, member: MemberId) {
        self.trackers.on_connect(member);
    }

    pub async fn on_member_disconnect(&self, member: &MemberId) {
        self.trackers.on_disconnect(member).await;
    }

    /// Run one sweep now, outside the ticker
    pub async fn sweep_now(&self) -> SweepReport {
        self.sweeper.sweep().await
    }

    /// Run one checkpoint flush now, outside the ticker
    pub async fn flush_now(&self) -> FlushReport {
        self.trackers.flush_due().await
    }

    // ==================== Event routing ====================

    /// Route one inbound platform event
    pub async fn dispatch(&self, event: PlatformEvent) -> Result<(), OrchestratorError> {
        match event {
            PlatformEvent::MemberConnected { member } => self.on_member_connect(member),
            PlatformEvent::MemberDisconnected { member } => self.on_member_disconnect(&member).await,
            PlatformEvent::MemberJoinedChannel { member, channel } => {
                debug!("{} joined {}", member, channel);
            }
            PlatformEvent::MemberLeftChannel { member, channel } => {
                self.sessions.on_member_left_channel(&member, &channel);
            }
            PlatformEvent::VoteCast {
                scope,
                squad,
                voter,
            } => {
                self.handle_vote(&scope, &squad, voter).await?;
            }
        }
        Ok(())
    }

    /// Process events in arrival order until the sender closes or `cancel` fires
    pub async fn run_events(&self, mut events: mpsc::Receiver<PlatformEvent>, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                debug!("Event channel closed");
                break;
            };
            if let Err(e) = self.dispatch(event).await {
                warn!("Event handling failed: {}", e);
            }
        }
    }
}

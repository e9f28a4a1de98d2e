//! Session registry
//!
//! Single source of truth for active Sessions, keyed by community scope.
//!
//! # Concurrency
//!
//! Every handler for a scope runs under that scope's async lock, so a reset
//! always finishes its teardown before provisioning starts and two handlers
//! for the same scope never interleave. The session map itself sits behind a
//! synchronous mutex that is never held across an `.await`.

use super::error::OrchestratorError;
use super::provision::{ChannelProvisioner, ProvisionRequest, TeardownMode};
use crate::config::SquadParams;
use crate::ports::chat_platform::ChatPlatform;
use crate::ports::clock::Clock;
use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::squad_namer::SquadNamer;
use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use squad_domain::{
    ChannelId, ChannelNaming, IdleVerdict, MemberId, ScopeId, Session, VoteOutcome, compose_squads,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Input for starting a Session
#[derive(Debug, Clone)]
pub struct StartSessionInput {
    pub scope: ScopeId,
    pub members: Vec<MemberId>,
    /// Squad size; the configured default when `None`
    pub group_size: Option<usize>,
    /// Channel members return to on teardown
    pub origin_channel: ChannelId,
    /// Parent scope squad channels are created under
    pub parent_scope: ChannelId,
}

impl StartSessionInput {
    pub fn new(
        scope: impl Into<ScopeId>,
        members: Vec<MemberId>,
        origin_channel: impl Into<ChannelId>,
        parent_scope: impl Into<ChannelId>,
    ) -> Self {
        Self {
            scope: scope.into(),
            members,
            group_size: None,
            origin_channel: origin_channel.into(),
            parent_scope: parent_scope.into(),
        }
    }

    pub fn with_group_size(mut self, size: usize) -> Self {
        self.group_size = Some(size);
        self
    }
}

/// Result of a replay vote
#[derive(Debug, Clone)]
pub struct VoteReceipt {
    pub outcome: VoteOutcome,
    /// The Session that replaced the voted one, when quorum was reached
    pub reset_to: Option<Session>,
}

/// Why a Session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// A new formation replaced it
    Replaced,
    /// Administrative cancellation
    Explicit,
    /// Left empty past the grace period
    Idle,
}

impl TeardownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeardownReason::Replaced => "replaced",
            TeardownReason::Explicit => "explicit",
            TeardownReason::Idle => "idle",
        }
    }
}

pub struct SessionRegistry<P: ChatPlatform + 'static> {
    platform: Arc<P>,
    provisioner: ChannelProvisioner<P>,
    namer: Arc<dyn SquadNamer>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn SessionEventLogger>,
    params: SquadParams,
    sessions: Mutex<HashMap<ScopeId, Session>>,
    scope_locks: Mutex<HashMap<ScopeId, Arc<tokio::sync::Mutex<()>>>>,
    generation: AtomicU64,
    rng: Mutex<StdRng>,
}

impl<P: ChatPlatform + 'static> SessionRegistry<P> {
    pub fn new(
        platform: Arc<P>,
        provisioner: ChannelProvisioner<P>,
        namer: Arc<dyn SquadNamer>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn SessionEventLogger>,
        params: SquadParams,
    ) -> Self {
        Self {
            platform,
            provisioner,
            namer,
            clock,
            logger,
            params,
            sessions: Mutex::new(HashMap::new()),
            scope_locks: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a seeded shuffle (for reproducible runs)
    pub fn with_seed(self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&self, seed: u64) {
        *self.rng.lock().unwrap() = StdRng::seed_from_u64(seed);
    }

    pub fn provisioner(&self) -> &ChannelProvisioner<P> {
        &self.provisioner
    }

    // ==================== Entry points ====================

    /// Form squads for a scope, replacing any Session already active there.
    ///
    /// The composition is validated before the existing Session is touched,
    /// so a request with too few members leaves the current Session alone.
    /// When channel creation is rejected part-way the partial Session is
    /// still registered and `ProvisionFailed` is returned.
    pub async fn start_session(&self, input: StartSessionInput) -> Result<Session, OrchestratorError> {
        let size = input.group_size.unwrap_or(self.params.default_group_size);
        let groups = {
            let mut rng = self.rng.lock().unwrap();
            compose_squads(&input.members, size, &mut *rng)?
        };

        let lock = self.scope_lock(&input.scope);
        let _guard = lock.lock().await;

        if let Some(previous) = self.take_session(&input.scope) {
            self.provisioner.teardown(&previous, TeardownMode::Deferred).await;
            self.log_teardown(&previous, TeardownReason::Replaced);
        }

        let names = self.squad_names(&groups).await;
        let squads: Vec<(String, Vec<MemberId>)> = names.into_iter().zip(groups).collect();

        info!(
            "Starting session for {}: {} members in {} squads",
            input.scope,
            input.members.len(),
            squads.len()
        );

        self.provision_and_register(
            &input.scope,
            input.origin_channel,
            input.parent_scope,
            squads,
            "session_started",
        )
        .await
    }

    /// Record a replay vote; on quorum the whole Session is replayed.
    pub async fn handle_vote(
        &self,
        scope: &ScopeId,
        squad: &str,
        voter: MemberId,
    ) -> Result<VoteReceipt, OrchestratorError> {
        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let channel = {
            let sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get(scope)
                .ok_or_else(|| OrchestratorError::SessionNotFound(scope.clone()))?;
            let squad_channel =
                session
                    .squad(squad)
                    .ok_or_else(|| OrchestratorError::SubgroupNotFound {
                        scope: scope.clone(),
                        squad: squad.to_string(),
                    })?;
            if session.votes.has_voted(squad, &voter) {
                debug!("{} already voted to replay {} in {}", voter, squad, scope);
                return Ok(VoteReceipt {
                    outcome: VoteOutcome::AlreadyVoted {
                        vote_count: session.votes.vote_count(squad),
                    },
                    reset_to: None,
                });
            }
            squad_channel.external_id.clone()
        };

        let live = self.platform.live_members(&channel).await?.len();

        let outcome = {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(scope)
                .ok_or_else(|| OrchestratorError::SessionNotFound(scope.clone()))?;
            session
                .votes
                .cast(squad, voter.clone(), live, self.params.quorum_rule)
        };

        self.logger.log(SessionEvent::new(
            "vote_cast",
            json!({
                "scope": scope,
                "squad": squad,
                "voter": voter,
                "live_members": live,
                "outcome": outcome,
            }),
        ));

        if !outcome.quorum_reached() {
            return Ok(VoteReceipt {
                outcome,
                reset_to: None,
            });
        }

        info!(
            "Replay quorum reached in {} of {} ({} of {} live)",
            squad,
            scope,
            outcome.vote_count(),
            live
        );
        let reset_to = self.reset_locked(scope).await?;
        Ok(VoteReceipt {
            outcome,
            reset_to: Some(reset_to),
        })
    }

    /// Cancel a scope's Session: tear it down and delete its channels now.
    pub async fn explicit_teardown(&self, scope: &ScopeId) -> Result<Session, OrchestratorError> {
        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let session = self
            .take_session(scope)
            .ok_or_else(|| OrchestratorError::SessionNotFound(scope.clone()))?;
        self.provisioner.teardown(&session, TeardownMode::Immediate).await;
        self.log_teardown(&session, TeardownReason::Explicit);
        Ok(session)
    }

    /// Rename a squad and its channel; votes already cast follow the new name.
    ///
    /// Squad names key the votes, so a name another squad of the Session
    /// already uses is rejected before the platform is touched.
    pub async fn rename_squad(
        &self,
        scope: &ScopeId,
        squad: &str,
        new_name: &str,
    ) -> Result<(), OrchestratorError> {
        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let channel = {
            let sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get(scope)
                .ok_or_else(|| OrchestratorError::SessionNotFound(scope.clone()))?;
            let channel = session
                .squad(squad)
                .map(|s| s.external_id.clone())
                .ok_or_else(|| OrchestratorError::SubgroupNotFound {
                    scope: scope.clone(),
                    squad: squad.to_string(),
                })?;
            if session
                .squad(new_name)
                .is_some_and(|other| other.external_id != channel)
            {
                return Err(OrchestratorError::SquadNameTaken {
                    scope: scope.clone(),
                    squad: new_name.to_string(),
                });
            }
            channel
        };

        self.provisioner.rename(&channel, new_name).await?;

        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(scope) {
            session.votes.rename(squad, new_name);
            if let Some(entry) = session.squads.iter_mut().find(|s| s.external_id == channel) {
                entry.name = new_name.to_string();
            }
        }
        Ok(())
    }

    /// A member left a channel: drop any greeting still pending for them there
    pub fn on_member_left_channel(&self, member: &MemberId, channel: &ChannelId) {
        if self.provisioner.cancel_greeting(channel, member) {
            debug!("Cancelled greeting for {} who left {}", member, channel);
        }
    }

    // ==================== Sweeper support ====================

    /// Copy of every active Session
    pub fn snapshot(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.lock().unwrap().values().cloned().collect();
        sessions.sort_by(|a, b| a.scope.cmp(&b.scope));
        sessions
    }

    pub fn session(&self, scope: &ScopeId) -> Option<Session> {
        self.sessions.lock().unwrap().get(scope).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record one idle observation for a Session of a given generation.
    ///
    /// Returns `None` when the scope no longer holds that generation.
    pub fn record_observation(
        &self,
        scope: &ScopeId,
        generation: u64,
        all_empty: bool,
        grace: Duration,
    ) -> Option<IdleVerdict> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(scope)
            .filter(|s| s.generation == generation)?;
        Some(session.observe_occupancy(all_empty, now, grace))
    }

    /// Tear down an idle Session, unless it was replaced meanwhile
    pub async fn expire_idle(&self, scope: &ScopeId, generation: u64) -> bool {
        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let session = {
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.get(scope) {
                Some(s) if s.generation == generation => sessions.remove(scope),
                _ => None,
            }
        };
        let Some(session) = session else {
            debug!("Idle session {} changed before expiry, skipping", scope);
            return false;
        };

        self.provisioner.teardown(&session, TeardownMode::Immediate).await;
        self.log_teardown(&session, TeardownReason::Idle);
        true
    }

    /// Fire pending deferred deletions and wait for spawned provisioner work
    pub async fn shutdown(&self) {
        self.provisioner.shutdown().await;
    }

    // ==================== Internals ====================

    async fn reset_locked(&self, scope: &ScopeId) -> Result<Session, OrchestratorError> {
        let previous = self
            .take_session(scope)
            .ok_or_else(|| OrchestratorError::SessionNotFound(scope.clone()))?;

        self.provisioner.teardown(&previous, TeardownMode::Deferred).await;

        self.provision_and_register(
            scope,
            previous.origin_channel.clone(),
            previous.parent_scope.clone(),
            previous.composition(),
            "session_reset",
        )
        .await
    }

    async fn provision_and_register(
        &self,
        scope: &ScopeId,
        origin_channel: ChannelId,
        parent_scope: ChannelId,
        squads: Vec<(String, Vec<MemberId>)>,
        event_type: &'static str,
    ) -> Result<Session, OrchestratorError> {
        let requested = squads.len();
        let request = ProvisionRequest {
            scope: scope.clone(),
            parent: parent_scope.clone(),
            squads,
        };
        let protected = self.live_channels();
        let outcome = self.provisioner.provision(&request, &protected).await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Session::new(
            scope.clone(),
            generation,
            origin_channel,
            parent_scope,
            outcome.squads,
            self.clock.now(),
        );

        if !session.squads.is_empty() {
            self.sessions
                .lock()
                .unwrap()
                .insert(scope.clone(), session.clone());
            self.logger.log(SessionEvent::new(
                event_type,
                json!({
                    "scope": scope,
                    "generation": generation,
                    "squads": session.squads,
                    "failed_moves": outcome.failed_moves,
                }),
            ));
        }

        match outcome.creation_error {
            None => Ok(session),
            Some(reason) => {
                warn!(
                    "Session {} registered with {} of {} squads",
                    scope,
                    session.squads.len(),
                    requested
                );
                self.logger.log(SessionEvent::new(
                    "provision_failed",
                    json!({
                        "scope": scope,
                        "created": session.squads.len(),
                        "requested": requested,
                        "reason": reason.to_string(),
                    }),
                ));
                Err(OrchestratorError::ProvisionFailed {
                    scope: scope.clone(),
                    created: session.squads.len(),
                    requested,
                    reason,
                })
            }
        }
    }

    async fn squad_names(&self, groups: &[Vec<MemberId>]) -> Vec<String> {
        let mut display_groups = Vec::with_capacity(groups.len());
        for group in groups {
            let mut names = Vec::with_capacity(group.len());
            for member in group {
                names.push(
                    self.platform
                        .display_name(member)
                        .await
                        .unwrap_or_else(|_| member.to_string()),
                );
            }
            display_groups.push(names);
        }

        let fallback = || ChannelNaming::fallback_names(groups.len());
        let named = tokio::time::timeout(
            self.params.naming_timeout,
            self.namer.name_groups(&display_groups),
        )
        .await;

        match named {
            Ok(Ok(names)) if is_usable(&names, groups.len()) => names,
            Ok(Ok(names)) => {
                warn!(
                    "Squad namer returned {} names for {} squads, using fallback",
                    names.len(),
                    groups.len()
                );
                fallback()
            }
            Ok(Err(e)) => {
                debug!("Squad namer failed, using fallback names: {}", e);
                fallback()
            }
            Err(_) => {
                warn!(
                    "Squad namer timed out after {:?}, using fallback names",
                    self.params.naming_timeout
                );
                fallback()
            }
        }
    }

    fn live_channels(&self) -> HashSet<ChannelId> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .flat_map(|s| s.channel_ids())
            .collect()
    }

    fn take_session(&self, scope: &ScopeId) -> Option<Session> {
        self.sessions.lock().unwrap().remove(scope)
    }

    fn scope_lock(&self, scope: &ScopeId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.scope_locks
                .lock()
                .unwrap()
                .entry(scope.clone())
                .or_default(),
        )
    }

    fn log_teardown(&self, session: &Session, reason: TeardownReason) {
        self.logger.log(SessionEvent::new(
            "session_torn_down",
            json!({
                "scope": session.scope,
                "generation": session.generation,
                "reason": reason.as_str(),
                "channels": session.channel_ids(),
            }),
        ));
    }
}

/// Names must be one per squad, non-blank and distinct (they key the votes)
fn is_usable(names: &[String], expected: usize) -> bool {
    if names.len() != expected || names.iter().any(|n| n.trim().is_empty()) {
        return false;
    }
    let distinct: HashSet<&str> = names.iter().map(|n| n.trim()).collect();
    distinct.len() == names.len()
}

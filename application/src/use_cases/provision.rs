//! Channel provisioning
//!
//! The provisioner is the only component that creates, renames and deletes
//! squad channels on the chat platform. Per-member operations (moves,
//! greetings) are best-effort: failures are logged and never abort a batch.

use crate::config::ProvisionerParams;
use crate::ports::chat_platform::{ChatPlatform, PlatformError};
use futures::future::join_all;
use squad_domain::{ChannelId, ChannelNaming, MemberId, ScopeId, Session, SquadChannel};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Squads to provision for one Session
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub scope: ScopeId,
    pub parent: ChannelId,
    /// Squad name and members, in formation order
    pub squads: Vec<(String, Vec<MemberId>)>,
}

/// What provisioning achieved
#[derive(Debug)]
pub struct ProvisionOutcome {
    /// Squads whose channel was created
    pub squads: Vec<SquadChannel>,
    /// Set when channel creation was rejected; later squads were skipped
    pub creation_error: Option<PlatformError>,
    /// Members that could not be moved into their squad channel
    pub failed_moves: Vec<MemberId>,
}

/// How channel deletion is scheduled on teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    /// Delete after the deletion grace delay, so moves can settle
    Deferred,
    /// Delete now, and fire every pending deferred deletion of the scope early
    Immediate,
}

type GreetingMap = HashMap<ChannelId, HashMap<MemberId, CancellationToken>>;

pub struct ChannelProvisioner<P: ChatPlatform + 'static> {
    platform: Arc<P>,
    naming: ChannelNaming,
    params: ProvisionerParams,
    tasks: TaskTracker,
    /// Per-scope token that cuts deferred deletion delays short
    expedite: Mutex<HashMap<ScopeId, CancellationToken>>,
    /// Channels created here and not yet handed to deletion. Covers Sessions
    /// still being provisioned, which the registry does not know about yet.
    claimed: Mutex<HashSet<ChannelId>>,
    /// Channels scheduled for deletion; the stale sweep leaves them alone
    pending_deletion: Arc<Mutex<HashSet<ChannelId>>>,
    greetings: Arc<Mutex<GreetingMap>>,
}

impl<P: ChatPlatform + 'static> ChannelProvisioner<P> {
    pub fn new(platform: Arc<P>, naming: ChannelNaming, params: ProvisionerParams) -> Self {
        Self {
            platform,
            naming,
            params,
            tasks: TaskTracker::new(),
            expedite: Mutex::new(HashMap::new()),
            claimed: Mutex::new(HashSet::new()),
            pending_deletion: Arc::new(Mutex::new(HashSet::new())),
            greetings: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn naming(&self) -> &ChannelNaming {
        &self.naming
    }

    /// Create one channel per squad and move the members in.
    ///
    /// Channels following the naming convention under `request.parent` that
    /// are not in `protected` (owned by another live Session) and not already
    /// awaiting deletion are deleted first, so repeated formations do not
    /// pile up against the platform's channel limit.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
        protected: &HashSet<ChannelId>,
    ) -> ProvisionOutcome {
        self.sweep_stale(&request.scope, &request.parent, protected).await;

        let mut squads = Vec::with_capacity(request.squads.len());
        let mut creation_error = None;

        for (name, members) in &request.squads {
            let channel_name = self.naming.channel_name(name);
            match self.platform.create_channel(&request.parent, &channel_name).await {
                Ok(id) => {
                    self.claimed.lock().unwrap().insert(id.clone());
                    debug!("Created channel {} ({}) for {}", channel_name, id, request.scope);
                    squads.push(SquadChannel::new(name.clone(), id, members.iter().cloned()));
                }
                Err(e) => {
                    warn!(
                        "Channel creation for {} rejected after {} of {}: {}",
                        request.scope,
                        squads.len(),
                        request.squads.len(),
                        e
                    );
                    creation_error = Some(e);
                    break;
                }
            }
        }

        let mut failed_moves = Vec::new();
        for squad in &squads {
            failed_moves.extend(self.move_squad_in(squad).await);
        }

        info!(
            "Provisioned {} squad channels for {} ({} failed moves)",
            squads.len(),
            request.scope,
            failed_moves.len()
        );

        ProvisionOutcome {
            squads,
            creation_error,
            failed_moves,
        }
    }

    /// Move every member still in a squad channel back to the origin channel
    /// and schedule the channels for deletion.
    pub async fn teardown(&self, session: &Session, mode: TeardownMode) {
        for squad in &session.squads {
            self.cancel_greetings(&squad.external_id);
        }

        for squad in &session.squads {
            let live = match self.platform.live_members(&squad.external_id).await {
                Ok(live) => live,
                Err(e) => {
                    warn!(
                        "Could not read members of {} during teardown: {}",
                        squad.external_id, e
                    );
                    continue;
                }
            };

            let moves = live.iter().map(|member| async move {
                (
                    member,
                    self.platform.move_member(&session.origin_channel, member).await,
                )
            });
            for (member, result) in join_all(moves).await {
                if let Err(e) = result {
                    warn!("Could not move {} back to {}: {}", member, session.origin_channel, e);
                }
            }
        }

        let channels = session.channel_ids();
        self.release(&channels);
        match mode {
            TeardownMode::Deferred => self.schedule_deletion(&session.scope, channels),
            TeardownMode::Immediate => {
                if let Some(token) = self.expedite.lock().unwrap().remove(&session.scope) {
                    token.cancel();
                }
                delete_channels(self.platform.as_ref(), &channels).await;
                let mut pending = self.pending_deletion.lock().unwrap();
                for channel in &channels {
                    pending.remove(channel);
                }
            }
        }

        info!(
            "Tore down session {} (generation {}, {:?})",
            session.scope, session.generation, mode
        );
    }

    /// Rename a squad channel following the naming convention
    pub async fn rename(&self, channel: &ChannelId, squad_name: &str) -> Result<(), PlatformError> {
        self.platform
            .rename_channel(channel, &self.naming.channel_name(squad_name))
            .await
    }

    /// Cancel a pending greeting for a member who left the channel
    pub fn cancel_greeting(&self, channel: &ChannelId, member: &MemberId) -> bool {
        let mut greetings = self.greetings.lock().unwrap();
        let Some(pending) = greetings.get_mut(channel) else {
            return false;
        };
        let cancelled = match pending.remove(member) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        };
        if pending.is_empty() {
            greetings.remove(channel);
        }
        cancelled
    }

    pub fn pending_greetings(&self) -> usize {
        self.greetings.lock().unwrap().values().map(HashMap::len).sum()
    }

    /// Channels created and not yet released for deletion
    pub fn claimed_channels(&self) -> usize {
        self.claimed.lock().unwrap().len()
    }

    pub fn pending_deletions(&self) -> usize {
        self.pending_deletion.lock().unwrap().len()
    }

    /// Fire every pending deletion now and wait for spawned work to finish
    pub async fn shutdown(&self) {
        for (_, token) in self.expedite.lock().unwrap().drain() {
            token.cancel();
        }
        for (_, pending) in self.greetings.lock().unwrap().drain() {
            for token in pending.into_values() {
                token.cancel();
            }
        }
        self.tasks.close();
        self.tasks.wait().await;
    }

    async fn sweep_stale(&self, scope: &ScopeId, parent: &ChannelId, protected: &HashSet<ChannelId>) {
        let channels = match self.platform.list_channels(parent).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Could not list channels under {} for {}: {}", parent, scope, e);
                return;
            }
        };

        let stale: Vec<ChannelId> = {
            let claimed = self.claimed.lock().unwrap();
            let pending = self.pending_deletion.lock().unwrap();
            channels
                .into_iter()
                .filter(|c| self.naming.is_managed(&c.name))
                .filter(|c| !protected.contains(&c.id))
                .filter(|c| !claimed.contains(&c.id) && !pending.contains(&c.id))
                .map(|c| c.id)
                .collect()
        };

        if !stale.is_empty() {
            info!("Deleting {} stale squad channels under {}", stale.len(), parent);
            delete_channels(self.platform.as_ref(), &stale).await;
        }
    }

    async fn move_squad_in(&self, squad: &SquadChannel) -> Vec<MemberId> {
        let moves = squad.members.iter().map(|member| async move {
            (
                member,
                self.platform.move_member(&squad.external_id, member).await,
            )
        });

        let mut failed = Vec::new();
        for (member, result) in join_all(moves).await {
            match result {
                Ok(()) => self.schedule_greeting(squad, member),
                Err(e) => {
                    warn!("Could not move {} into {}: {}", member, squad.name, e);
                    failed.push(member.clone());
                }
            }
        }
        failed
    }

    fn schedule_greeting(&self, squad: &SquadChannel, member: &MemberId) {
        let Some(delay) = self.params.greeting_delay else {
            return;
        };

        let token = CancellationToken::new();
        self.greetings
            .lock()
            .unwrap()
            .entry(squad.external_id.clone())
            .or_default()
            .insert(member.clone(), token.clone());

        let platform = Arc::clone(&self.platform);
        let greetings = Arc::clone(&self.greetings);
        let channel = squad.external_id.clone();
        let squad_name = squad.name.clone();
        let member = member.clone();
        let template = self.params.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Greeting for {} in {} cancelled", member, channel);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut greetings = greetings.lock().unwrap();
                if let Some(pending) = greetings.get_mut(&channel) {
                    pending.remove(&member);
                    if pending.is_empty() {
                        greetings.remove(&channel);
                    }
                }
            }

            let display = platform
                .display_name(&member)
                .await
                .unwrap_or_else(|_| member.to_string());
            let text = template.render_greeting(&display, &squad_name);
            if let Err(e) = platform.send_message(&channel, &text).await {
                warn!("Could not greet {} in {}: {}", member, channel, e);
            }
        });
    }

    fn cancel_greetings(&self, channel: &ChannelId) {
        if let Some(pending) = self.greetings.lock().unwrap().remove(channel) {
            for token in pending.into_values() {
                token.cancel();
            }
        }
    }

    /// Move channels from claimed to pending deletion in one step, so the
    /// stale sweep never sees them unowned.
    fn release(&self, channels: &[ChannelId]) {
        let mut claimed = self.claimed.lock().unwrap();
        self.pending_deletion
            .lock()
            .unwrap()
            .extend(channels.iter().cloned());
        for channel in channels {
            claimed.remove(channel);
        }
    }

    fn schedule_deletion(&self, scope: &ScopeId, channels: Vec<ChannelId>) {
        if channels.is_empty() {
            return;
        }

        let token = self
            .expedite
            .lock()
            .unwrap()
            .entry(scope.clone())
            .or_default()
            .clone();

        let platform = Arc::clone(&self.platform);
        let pending = Arc::clone(&self.pending_deletion);
        let grace = self.params.deletion_grace;

        self.tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(grace) => {}
            }
            delete_channels(platform.as_ref(), &channels).await;
            let mut pending = pending.lock().unwrap();
            for channel in &channels {
                pending.remove(channel);
            }
        });
    }
}

async fn delete_channels<P: ChatPlatform + ?Sized>(platform: &P, channels: &[ChannelId]) {
    for channel in channels {
        if let Err(e) = platform.delete_channel(channel).await {
            warn!("Could not delete channel {}: {}", channel, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{MockPlatform, members};
    use chrono::Utc;
    use std::time::Duration;

    fn provisioner(platform: &Arc<MockPlatform>, params: ProvisionerParams) -> ChannelProvisioner<MockPlatform> {
        ChannelProvisioner::new(Arc::clone(platform), ChannelNaming::default(), params)
    }

    fn request(squads: Vec<(&str, Vec<MemberId>)>) -> ProvisionRequest {
        ProvisionRequest {
            scope: ScopeId::new("guild"),
            parent: ChannelId::new("games"),
            squads: squads
                .into_iter()
                .map(|(n, m)| (n.to_string(), m))
                .collect(),
        }
    }

    fn connect_all(platform: &MockPlatform, ids: &[&str]) {
        for id in ids {
            platform.connect(id, "lobby");
        }
    }

    fn session_from(outcome: ProvisionOutcome) -> Session {
        Session::new(
            ScopeId::new("guild"),
            1,
            ChannelId::new("lobby"),
            ChannelId::new("games"),
            outcome.squads,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_provision_creates_channels_and_moves_members() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b", "c", "d"]);
        let provisioner = provisioner(&platform, ProvisionerParams::default());

        let outcome = provisioner
            .provision(
                &request(vec![
                    ("Squad-1", members(&["a", "b"])),
                    ("Squad-2", members(&["c", "d"])),
                ]),
                &HashSet::new(),
            )
            .await;

        assert!(outcome.creation_error.is_none());
        assert_eq!(outcome.squads.len(), 2);
        let first = &outcome.squads[0];
        assert_eq!(
            platform.channel_name(&first.external_id).as_deref(),
            Some("[squad] Squad-1")
        );
        assert_eq!(platform.location("a"), Some(first.external_id.clone()));
        assert_eq!(platform.location("c"), Some(outcome.squads[1].external_id.clone()));
    }

    #[tokio::test]
    async fn test_move_failure_does_not_abort_squad() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b", "c"]);
        platform.fail_moves_for("b");
        let provisioner = provisioner(&platform, ProvisionerParams::default());

        let outcome = provisioner
            .provision(&request(vec![("Squad-1", members(&["a", "b", "c"]))]), &HashSet::new())
            .await;

        let channel = outcome.squads[0].external_id.clone();
        assert_eq!(outcome.failed_moves, members(&["b"]));
        assert_eq!(platform.location("a"), Some(channel.clone()));
        assert_eq!(platform.location("c"), Some(channel));
        assert_eq!(platform.location("b"), Some(ChannelId::new("lobby")));
    }

    #[tokio::test]
    async fn test_creation_rejection_keeps_created_channels() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b", "c", "d", "e", "f"]);
        platform.limit_creations(1);
        let provisioner = provisioner(&platform, ProvisionerParams::default());

        let outcome = provisioner
            .provision(
                &request(vec![
                    ("Squad-1", members(&["a", "b"])),
                    ("Squad-2", members(&["c", "d"])),
                    ("Squad-3", members(&["e", "f"])),
                ]),
                &HashSet::new(),
            )
            .await;

        assert_eq!(outcome.squads.len(), 1);
        assert!(matches!(outcome.creation_error, Some(PlatformError::QuotaExceeded(_))));
        assert_eq!(platform.count_calls("create:"), 2);
        assert_eq!(platform.location("c"), Some(ChannelId::new("lobby")));
    }

    #[tokio::test]
    async fn test_stale_channels_are_swept_but_protected_ones_kept() {
        let platform = Arc::new(MockPlatform::new());
        platform.add_channel("stale", "games", "[squad] Old Crew");
        platform.add_channel("other-session", "games", "[squad] Theirs");
        platform.add_channel("general", "games", "General");
        platform.add_channel("elsewhere", "music", "[squad] Elsewhere");
        connect_all(&platform, &["a", "b"]);
        let provisioner = provisioner(&platform, ProvisionerParams::default());

        let protected: HashSet<ChannelId> = [ChannelId::new("other-session")].into();
        provisioner
            .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &protected)
            .await;

        assert!(!platform.channel_exists(&ChannelId::new("stale")));
        assert!(platform.channel_exists(&ChannelId::new("other-session")));
        assert!(platform.channel_exists(&ChannelId::new("general")));
        assert!(platform.channel_exists(&ChannelId::new("elsewhere")));
    }

    #[tokio::test]
    async fn test_unregistered_channels_survive_another_scopes_sweep() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b", "c", "d"]);
        let provisioner = provisioner(&platform, ProvisionerParams::default());

        // The first Session is not in any protected set yet.
        let first = provisioner
            .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
            .await;
        let mut other = request(vec![("Squad-1", members(&["c", "d"]))]);
        other.scope = ScopeId::new("other-guild");
        provisioner.provision(&other, &HashSet::new()).await;

        let first_channel = first.squads[0].external_id.clone();
        assert!(platform.channel_exists(&first_channel));
        assert_eq!(platform.count_calls("delete:"), 0);
        assert_eq!(provisioner.claimed_channels(), 2);

        provisioner
            .teardown(&session_from(first), TeardownMode::Immediate)
            .await;
        assert!(!platform.channel_exists(&first_channel));
        assert_eq!(provisioner.claimed_channels(), 1);
        assert_eq!(provisioner.pending_deletions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_teardown_moves_back_then_deletes_after_grace() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b"]);
        let provisioner = provisioner(
            &platform,
            ProvisionerParams::default().with_deletion_grace(Duration::from_secs(3)),
        );
        let outcome = provisioner
            .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
            .await;
        let session = session_from(outcome);
        let channel = session.squads[0].external_id.clone();
        platform.disconnect("b");

        provisioner.teardown(&session, TeardownMode::Deferred).await;

        assert_eq!(platform.location("a"), Some(ChannelId::new("lobby")));
        assert!(platform.channel_exists(&channel));
        assert_eq!(provisioner.pending_deletions(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!platform.channel_exists(&channel));
        assert_eq!(provisioner.pending_deletions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_teardown_expedites_pending_deletions() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b"]);
        let provisioner = provisioner(
            &platform,
            ProvisionerParams::default().with_deletion_grace(Duration::from_secs(60)),
        );

        let first = session_from(
            provisioner
                .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
                .await,
        );
        provisioner.teardown(&first, TeardownMode::Deferred).await;

        let second = session_from(
            provisioner
                .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
                .await,
        );
        // The first session's channel is awaiting deletion, not swept.
        assert!(platform.channel_exists(&first.squads[0].external_id));

        provisioner.teardown(&second, TeardownMode::Immediate).await;
        assert!(!platform.channel_exists(&second.squads[0].external_id));

        tokio::task::yield_now().await;
        provisioner.shutdown().await;
        assert!(!platform.channel_exists(&first.squads[0].external_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_is_sent_after_delay() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b"]);
        let provisioner = provisioner(
            &platform,
            ProvisionerParams::default()
                .with_greeting(Duration::from_secs(5), "Hi {member}, you're in {squad}"),
        );

        provisioner
            .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
            .await;
        assert_eq!(provisioner.pending_greetings(), 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        let messages = platform.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|(_, text)| text == "Hi A, you're in Squad-1"));
        assert_eq!(provisioner.pending_greetings(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_before_greeting_cancels_it() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b"]);
        let provisioner = provisioner(
            &platform,
            ProvisionerParams::default().with_greeting(Duration::from_secs(5), "Hi {member}"),
        );

        let outcome = provisioner
            .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
            .await;
        let channel = outcome.squads[0].external_id.clone();

        assert!(provisioner.cancel_greeting(&channel, &MemberId::new("a")));
        assert!(!provisioner.cancel_greeting(&channel, &MemberId::new("a")));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let messages = platform.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "Hi B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_greetings() {
        let platform = Arc::new(MockPlatform::new());
        connect_all(&platform, &["a", "b"]);
        let provisioner = provisioner(
            &platform,
            ProvisionerParams::default().with_greeting(Duration::from_secs(5), "Hi {member}"),
        );

        let session = session_from(
            provisioner
                .provision(&request(vec![("Squad-1", members(&["a", "b"]))]), &HashSet::new())
                .await,
        );
        provisioner.teardown(&session, TeardownMode::Immediate).await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(platform.messages().is_empty());
        assert_eq!(provisioner.pending_greetings(), 0);
    }

    #[tokio::test]
    async fn test_rename_applies_prefix() {
        let platform = Arc::new(MockPlatform::new());
        platform.add_channel("c1", "games", "[squad] Squad-1");
        let provisioner = provisioner(&platform, ProvisionerParams::default());

        provisioner.rename(&ChannelId::new("c1"), "Night Owls").await.unwrap();
        assert_eq!(
            platform.channel_name(&ChannelId::new("c1")).as_deref(),
            Some("[squad] Night Owls")
        );
    }
}

//! Idle sweeper
//!
//! Periodically checks every active Session and tears down the ones whose
//! squad channels have stayed empty for the whole grace period.

use super::session_registry::SessionRegistry;
use crate::config::SweeperParams;
use crate::ports::chat_platform::ChatPlatform;
use squad_domain::{IdleVerdict, Session};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub inspected: usize,
    pub occupied: usize,
    /// Empty, still inside the grace period
    pub waiting: usize,
    pub expired: usize,
}

pub struct IdleSweeper<P: ChatPlatform + 'static> {
    platform: Arc<P>,
    sessions: Arc<SessionRegistry<P>>,
    params: SweeperParams,
}

impl<P: ChatPlatform + 'static> IdleSweeper<P> {
    pub fn new(platform: Arc<P>, sessions: Arc<SessionRegistry<P>>, params: SweeperParams) -> Self {
        Self {
            platform,
            sessions,
            params,
        }
    }

    pub fn params(&self) -> &SweeperParams {
        &self.params
    }

    /// Observe every Session once and expire the idle ones
    pub async fn sweep(&self) -> SweepReport {
        let grace = chrono::Duration::seconds(self.params.grace_period.as_secs() as i64);
        let mut report = SweepReport::default();

        for session in self.sessions.snapshot() {
            report.inspected += 1;
            let all_empty = self.all_channels_empty(&session).await;

            match self
                .sessions
                .record_observation(&session.scope, session.generation, all_empty, grace)
            {
                None => debug!("Session {} replaced during sweep", session.scope),
                Some(IdleVerdict::Occupied) => report.occupied += 1,
                Some(IdleVerdict::EmptySince(since)) => {
                    debug!("Session {} empty since {}", session.scope, since);
                    report.waiting += 1;
                }
                Some(IdleVerdict::Expired) => {
                    if self.sessions.expire_idle(&session.scope, session.generation).await {
                        info!("Tore down idle session {}", session.scope);
                        report.expired += 1;
                    }
                }
            }
        }

        report
    }

    /// A channel whose members cannot be read counts as occupied
    async fn all_channels_empty(&self, session: &Session) -> bool {
        for squad in &session.squads {
            match self.platform.live_members(&squad.external_id).await {
                Ok(live) if live.is_empty() => {}
                Ok(_) => return false,
                Err(e) => {
                    warn!(
                        "Could not read members of {} in {}: {}",
                        squad.external_id, session.scope, e
                    );
                    return false;
                }
            }
        }
        true
    }
}

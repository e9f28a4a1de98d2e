//! Scenario scripts
//!
//! A scenario is a JSONL file with one step per line. Blank lines and lines
//! starting with `#` are skipped. Steps drive the in-memory platform and the
//! orchestrator, and each step prints one JSON result line.
//!
//! ```text
//! {"step":"channel","id":"lobby","parent":"games","name":"Lobby"}
//! {"step":"connect","member":"u1","channel":"lobby","name":"Ana"}
//! {"step":"start","scope":"guild","origin":"lobby","parent":"games","group_size":4}
//! {"step":"vote","scope":"guild","squad":"Squad-1","voter":"u1"}
//! {"step":"wait","secs":300}
//! {"step":"status"}
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use squad_application::{Clock, Orchestrator, PlatformEvent, StartSessionInput};
use squad_domain::{ChannelId, MemberId, ScopeId};
use squad_infrastructure::InMemoryChatPlatform;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One scenario step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Add a fixed channel (lobby, category)
    Channel {
        id: String,
        parent: String,
        name: String,
    },
    /// A member joins the voice space in `channel`
    Connect {
        member: String,
        channel: String,
        #[serde(default)]
        name: Option<String>,
    },
    /// A member leaves the voice space
    Disconnect { member: String },
    /// A member switches channel by themselves
    Move { member: String, channel: String },
    /// Form squads from `members`, or from everyone in `origin` when omitted
    Start {
        scope: String,
        origin: String,
        parent: String,
        #[serde(default)]
        group_size: Option<usize>,
        #[serde(default)]
        members: Option<Vec<String>>,
    },
    Vote {
        scope: String,
        squad: String,
        voter: String,
    },
    Rename {
        scope: String,
        squad: String,
        name: String,
    },
    Teardown { scope: String },
    /// Let time pass; background sweeps and checkpoints run meanwhile
    Wait { secs: u64 },
    /// Print the active sessions
    Status,
}

/// Parse a script, skipping blank and `#` lines
pub fn parse_script(script: &str) -> Result<Vec<Step>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid step on line {}", i + 1))
        })
        .collect()
}

/// Wall clock that follows tokio's clock, so it stays in step with paused time
pub struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: Utc::now(),
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}

pub struct ScenarioRunner {
    platform: Arc<InMemoryChatPlatform>,
    orchestrator: Arc<Orchestrator<InMemoryChatPlatform>>,
}

impl ScenarioRunner {
    pub fn new(
        platform: Arc<InMemoryChatPlatform>,
        orchestrator: Arc<Orchestrator<InMemoryChatPlatform>>,
    ) -> Self {
        Self {
            platform,
            orchestrator,
        }
    }

    /// Run every step, writing one result line per step.
    ///
    /// A failing step is reported in its result line and does not stop the run.
    pub async fn run(&self, steps: Vec<Step>, out: &mut impl Write) -> Result<usize> {
        let mut failed = 0;
        for step in steps {
            let record = match self.apply(step.clone()).await {
                Ok(result) => json!({"step": step_name(&step), "ok": true, "result": result}),
                Err(e) => {
                    failed += 1;
                    json!({"step": step_name(&step), "ok": false, "error": e.to_string()})
                }
            };
            writeln!(out, "{}", record)?;
        }
        Ok(failed)
    }

    pub async fn apply(&self, step: Step) -> Result<Value> {
        let orchestrator = &self.orchestrator;
        match step {
            Step::Channel { id, parent, name } => {
                self.platform.add_channel(id.as_str(), parent.as_str(), name);
                Ok(json!({"channel": id}))
            }
            Step::Connect {
                member,
                channel,
                name,
            } => {
                let member = MemberId::new(member);
                let channel = ChannelId::new(channel);
                if let Some(name) = name {
                    self.platform.set_display_name(member.clone(), name);
                }
                self.platform.connect(member.clone(), &channel)?;
                orchestrator
                    .dispatch(PlatformEvent::MemberConnected {
                        member: member.clone(),
                    })
                    .await?;
                orchestrator
                    .dispatch(PlatformEvent::MemberJoinedChannel {
                        member: member.clone(),
                        channel: channel.clone(),
                    })
                    .await?;
                Ok(json!({"member": member, "channel": channel}))
            }
            Step::Disconnect { member } => {
                let member = MemberId::new(member);
                if let Some(channel) = self.platform.disconnect(&member) {
                    orchestrator
                        .dispatch(PlatformEvent::MemberLeftChannel {
                            member: member.clone(),
                            channel,
                        })
                        .await?;
                }
                orchestrator
                    .dispatch(PlatformEvent::MemberDisconnected {
                        member: member.clone(),
                    })
                    .await?;
                Ok(json!({"member": member}))
            }
            Step::Move { member, channel } => {
                let member = MemberId::new(member);
                let channel = ChannelId::new(channel);
                let previous = self.platform.location(&member);
                self.platform.connect(member.clone(), &channel)?;
                if let Some(previous) = previous {
                    orchestrator
                        .dispatch(PlatformEvent::MemberLeftChannel {
                            member: member.clone(),
                            channel: previous,
                        })
                        .await?;
                }
                orchestrator
                    .dispatch(PlatformEvent::MemberJoinedChannel {
                        member: member.clone(),
                        channel: channel.clone(),
                    })
                    .await?;
                Ok(json!({"member": member, "channel": channel}))
            }
            Step::Start {
                scope,
                origin,
                parent,
                group_size,
                members,
            } => {
                let origin = ChannelId::new(origin);
                let members = match members {
                    Some(ids) => ids.into_iter().map(MemberId::new).collect(),
                    None => self.members_in(&origin).await?,
                };
                let mut input = StartSessionInput::new(scope, members, origin, parent);
                if let Some(size) = group_size {
                    input = input.with_group_size(size);
                }
                let session = orchestrator.start_session(input).await?;
                Ok(serde_json::to_value(&session)?)
            }
            Step::Vote {
                scope,
                squad,
                voter,
            } => {
                let receipt = orchestrator
                    .handle_vote(&ScopeId::new(scope), &squad, MemberId::new(voter))
                    .await?;
                Ok(json!({
                    "outcome": receipt.outcome,
                    "reset_to": receipt.reset_to.map(|s| s.generation),
                }))
            }
            Step::Rename { scope, squad, name } => {
                orchestrator
                    .sessions()
                    .rename_squad(&ScopeId::new(scope), &squad, &name)
                    .await?;
                Ok(json!({"squad": name}))
            }
            Step::Teardown { scope } => {
                let session = orchestrator.explicit_teardown(&ScopeId::new(scope)).await?;
                Ok(json!({"generation": session.generation, "channels": session.channel_ids()}))
            }
            Step::Wait { secs } => {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok(json!({"waited_secs": secs}))
            }
            Step::Status => Ok(json!({
                "sessions": orchestrator.sessions().snapshot(),
                "tracked_members": orchestrator.trackers().tracked_count(),
                "pending_deletions": orchestrator.sessions().provisioner().pending_deletions(),
            })),
        }
    }

    async fn members_in(&self, channel: &ChannelId) -> Result<Vec<MemberId>> {
        use squad_application::ChatPlatform;

        let mut members: Vec<MemberId> = self
            .platform
            .live_members(channel)
            .await?
            .into_iter()
            .collect();
        members.sort();
        Ok(members)
    }
}

fn step_name(step: &Step) -> &'static str {
    match step {
        Step::Channel { .. } => "channel",
        Step::Connect { .. } => "connect",
        Step::Disconnect { .. } => "disconnect",
        Step::Move { .. } => "move",
        Step::Start { .. } => "start",
        Step::Vote { .. } => "vote",
        Step::Rename { .. } => "rename",
        Step::Teardown { .. } => "teardown",
        Step::Wait { .. } => "wait",
        Step::Status => "status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squad_application::{
        CheckpointStore, NoSessionLogger, NoSquadNamer, OrchestratorConfig, OrchestratorPorts,
    };
    use squad_infrastructure::JsonFileCheckpointStore;

    const SCRIPT: &str = r#"
# lobby with six players
{"step":"channel","id":"games","parent":"root","name":"Games"}
{"step":"channel","id":"lobby","parent":"games","name":"Lobby"}
{"step":"connect","member":"u1","channel":"lobby","name":"Ana"}
{"step":"connect","member":"u2","channel":"lobby"}
{"step":"connect","member":"u3","channel":"lobby"}
{"step":"connect","member":"u4","channel":"lobby"}
{"step":"connect","member":"u5","channel":"lobby"}
{"step":"connect","member":"u6","channel":"lobby"}
{"step":"start","scope":"guild","origin":"lobby","parent":"games","group_size":3}
{"step":"vote","scope":"guild","squad":"Squad-9","voter":"u1"}
{"step":"wait","secs":600}
{"step":"status"}
"#;

    #[test]
    fn test_parse_script_skips_comments() {
        let steps = parse_script(SCRIPT).unwrap();
        assert_eq!(steps.len(), 12);
        assert_eq!(
            steps[8],
            Step::Start {
                scope: "guild".to_string(),
                origin: "lobby".to_string(),
                parent: "games".to_string(),
                group_size: Some(3),
                members: None,
            }
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("{\"step\":\"status\"}\n{\"step\":\"jump\"}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_forms_squads_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileCheckpointStore::new(dir.path().join("store.json")));
        let platform = Arc::new(InMemoryChatPlatform::new());
        let orchestrator = Arc::new(Orchestrator::new(
            OrchestratorPorts {
                platform: Arc::clone(&platform),
                namer: Arc::new(NoSquadNamer),
                store: store.clone() as Arc<dyn CheckpointStore>,
                clock: Arc::new(TokioClock::new()),
                logger: Arc::new(NoSessionLogger),
            },
            OrchestratorConfig::default(),
        ));
        orchestrator.reseed(3);
        orchestrator.init().await.unwrap();

        let runner = ScenarioRunner::new(Arc::clone(&platform), Arc::clone(&orchestrator));
        let mut out = Vec::new();
        let failed = runner.run(parse_script(SCRIPT).unwrap(), &mut out).await.unwrap();

        // Only the vote for an unknown squad fails.
        assert_eq!(failed, 1);
        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[8]["result"]["squads"].as_array().unwrap().len(), 2);
        assert_eq!(lines[9]["ok"], false);

        // Players stayed in their squads, so the session survived the wait.
        assert_eq!(lines[11]["result"]["sessions"].as_array().unwrap().len(), 1);
        assert!(store.read_field("members/u1", "voice.seconds").await.unwrap() >= 300);

        orchestrator.shutdown().await;
    }
}

//! In-memory chat platform
//!
//! A simulated community voice space: channels nested under parents, the
//! channel each connected member sits in, display names and a message log.
//! Used by the `run` command to replay scenario scripts and by tests that
//! need a platform with real state.

use async_trait::async_trait;
use serde::Serialize;
use squad_application::{ChannelInfo, ChatPlatform, PlatformError};
use squad_domain::{ChannelId, MemberId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tracing::debug;

/// Platform operation, for fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOp {
    Create,
    Delete,
    Rename,
    List,
    Move,
    LiveMembers,
    SendMessage,
}

/// A message posted to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedMessage {
    pub channel: ChannelId,
    pub text: String,
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    parent: ChannelId,
    name: String,
}

#[derive(Default)]
struct State {
    channels: BTreeMap<ChannelId, ChannelEntry>,
    locations: HashMap<MemberId, ChannelId>,
    display_names: HashMap<MemberId, String>,
    messages: Vec<PostedMessage>,
    faults: HashMap<PlatformOp, PlatformError>,
    next_id: u64,
}

impl State {
    fn check(&self, op: PlatformOp) -> Result<(), PlatformError> {
        match self.faults.get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn require_channel(&self, channel: &ChannelId) -> Result<&ChannelEntry, PlatformError> {
        self.channels
            .get(channel)
            .ok_or_else(|| PlatformError::ChannelNotFound(channel.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryChatPlatform {
    state: Mutex<State>,
    /// Maximum channels under one parent
    channel_limit: Option<usize>,
}

impl InMemoryChatPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel_limit(mut self, limit: usize) -> Self {
        self.channel_limit = Some(limit);
        self
    }

    /// Add a channel with a fixed id (lobbies, categories)
    pub fn add_channel(&self, id: impl Into<ChannelId>, parent: impl Into<ChannelId>, name: impl Into<String>) {
        self.state.lock().unwrap().channels.insert(
            id.into(),
            ChannelEntry {
                parent: parent.into(),
                name: name.into(),
            },
        );
    }

    pub fn set_display_name(&self, member: impl Into<MemberId>, name: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .display_names
            .insert(member.into(), name.into());
    }

    /// Put a member into a channel, connecting them if needed
    pub fn connect(&self, member: impl Into<MemberId>, channel: &ChannelId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.require_channel(channel)?;
        state.locations.insert(member.into(), channel.clone());
        Ok(())
    }

    /// Remove a member from the voice space, returning where they were
    pub fn disconnect(&self, member: &MemberId) -> Option<ChannelId> {
        self.state.lock().unwrap().locations.remove(member)
    }

    pub fn location(&self, member: &MemberId) -> Option<ChannelId> {
        self.state.lock().unwrap().locations.get(member).cloned()
    }

    pub fn channel_name(&self, channel: &ChannelId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .channels
            .get(channel)
            .map(|c| c.name.clone())
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    /// Make every call of `op` fail with `error` until cleared
    pub fn inject_fault(&self, op: PlatformOp, error: PlatformError) {
        self.state.lock().unwrap().faults.insert(op, error);
    }

    pub fn clear_fault(&self, op: PlatformOp) {
        self.state.lock().unwrap().faults.remove(&op);
    }
}

#[async_trait]
impl ChatPlatform for InMemoryChatPlatform {
    async fn create_channel(&self, parent: &ChannelId, name: &str) -> Result<ChannelId, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.check(PlatformOp::Create)?;

        if let Some(limit) = self.channel_limit {
            let siblings = state.channels.values().filter(|c| &c.parent == parent).count();
            if siblings >= limit {
                return Err(PlatformError::QuotaExceeded(format!(
                    "{} already has {} channels",
                    parent, limit
                )));
            }
        }

        state.next_id += 1;
        let id = ChannelId::new(format!("vc-{}", state.next_id));
        state.channels.insert(
            id.clone(),
            ChannelEntry {
                parent: parent.clone(),
                name: name.to_string(),
            },
        );
        debug!("Created channel {} ({}) under {}", id, name, parent);
        Ok(id)
    }

    async fn delete_channel(&self, channel: &ChannelId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.check(PlatformOp::Delete)?;
        state.require_channel(channel)?;
        state.channels.remove(channel);
        // Anyone still inside is disconnected with the channel.
        state.locations.retain(|_, c| c != channel);
        Ok(())
    }

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.check(PlatformOp::Rename)?;
        match state.channels.get_mut(channel) {
            Some(entry) => {
                entry.name = name.to_string();
                Ok(())
            }
            None => Err(PlatformError::ChannelNotFound(channel.clone())),
        }
    }

    async fn list_channels(&self, parent: &ChannelId) -> Result<Vec<ChannelInfo>, PlatformError> {
        let state = self.state.lock().unwrap();
        state.check(PlatformOp::List)?;
        Ok(state
            .channels
            .iter()
            .filter(|(_, c)| &c.parent == parent)
            .map(|(id, c)| ChannelInfo {
                id: id.clone(),
                name: c.name.clone(),
            })
            .collect())
    }

    async fn move_member(&self, channel: &ChannelId, member: &MemberId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.check(PlatformOp::Move)?;
        state.require_channel(channel)?;
        match state.locations.get_mut(member) {
            Some(location) => {
                *location = channel.clone();
                Ok(())
            }
            None => Err(PlatformError::MemberNotConnected(member.clone())),
        }
    }

    async fn live_members(&self, channel: &ChannelId) -> Result<HashSet<MemberId>, PlatformError> {
        let state = self.state.lock().unwrap();
        state.check(PlatformOp::LiveMembers)?;
        state.require_channel(channel)?;
        Ok(state
            .locations
            .iter()
            .filter(|(_, c)| *c == channel)
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn connected_members(&self) -> Result<Vec<MemberId>, PlatformError> {
        let state = self.state.lock().unwrap();
        let mut members: Vec<MemberId> = state.locations.keys().cloned().collect();
        members.sort();
        Ok(members)
    }

    async fn display_name(&self, member: &MemberId) -> Result<String, PlatformError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .display_names
            .get(member)
            .cloned()
            .unwrap_or_else(|| member.to_string()))
    }

    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.check(PlatformOp::SendMessage)?;
        state.require_channel(channel)?;
        state.messages.push(PostedMessage {
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}

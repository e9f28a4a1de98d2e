//! Chat platform port
//!
//! Defines the interface to the chat platform hosting the community voice
//! space, and the inbound events it produces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use squad_domain::{ChannelId, MemberId, ScopeId};
use std::collections::HashSet;
use thiserror::Error;

/// Errors reported by the chat platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("Member is not connected: {0}")]
    MemberNotConnected(MemberId),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,
}

/// A channel as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// Chat platform operations used by the orchestrator.
///
/// The provisioner is the only caller of the channel CRUD methods; the
/// sweeper and vote handling only read live membership.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Create a voice channel under `parent`
    async fn create_channel(&self, parent: &ChannelId, name: &str) -> Result<ChannelId, PlatformError>;

    async fn delete_channel(&self, channel: &ChannelId) -> Result<(), PlatformError>;

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> Result<(), PlatformError>;

    /// List the channels directly under `parent`
    async fn list_channels(&self, parent: &ChannelId) -> Result<Vec<ChannelInfo>, PlatformError>;

    /// Move a connected member into `channel`
    async fn move_member(&self, channel: &ChannelId, member: &MemberId) -> Result<(), PlatformError>;

    /// Members currently present in `channel`
    async fn live_members(&self, channel: &ChannelId) -> Result<HashSet<MemberId>, PlatformError>;

    /// Every member currently connected to any voice channel of the community
    async fn connected_members(&self) -> Result<Vec<MemberId>, PlatformError>;

    async fn display_name(&self, member: &MemberId) -> Result<String, PlatformError>;

    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError>;
}

/// Inbound platform event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Member connected to the voice space
    MemberConnected { member: MemberId },
    /// Member disconnected from the voice space
    MemberDisconnected { member: MemberId },
    MemberJoinedChannel { member: MemberId, channel: ChannelId },
    MemberLeftChannel { member: MemberId, channel: ChannelId },
    /// Replay button pressed in a squad
    VoteCast {
        scope: ScopeId,
        squad: String,
        voter: MemberId,
    },
}

//! Squad channels and the channel naming convention

use crate::core::ids::{ChannelId, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An externally-provisioned channel together with the squad assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadChannel {
    /// Squad name (also used as the vote key for this subgroup)
    pub name: String,
    /// Platform channel id; only valid while the owning Session is active
    pub external_id: ChannelId,
    /// Members composed into this squad
    pub members: BTreeSet<MemberId>,
}

impl SquadChannel {
    pub fn new(
        name: impl Into<String>,
        external_id: ChannelId,
        members: impl IntoIterator<Item = MemberId>,
    ) -> Self {
        Self {
            name: name.into(),
            external_id,
            members: members.into_iter().collect(),
        }
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }
}

/// Naming convention for orchestrator-owned channels.
///
/// Every squad channel is named `{prefix}{squad name}`. The prefix is how
/// stale channels left behind by a failed deletion are recognised and swept
/// on the next provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNaming {
    prefix: String,
}

impl Default for ChannelNaming {
    fn default() -> Self {
        Self::new("[squad] ")
    }
}

impl ChannelNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Platform channel name for a squad
    pub fn channel_name(&self, squad_name: &str) -> String {
        format!("{}{}", self.prefix, squad_name)
    }

    /// Whether a platform channel name follows this convention
    pub fn is_managed(&self, channel_name: &str) -> bool {
        !self.prefix.is_empty() && channel_name.starts_with(&self.prefix)
    }

    /// Deterministic squad names: `Squad-1`, `Squad-2`, ...
    pub fn fallback_names(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("Squad-{}", i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_round_trip_through_convention() {
        let naming = ChannelNaming::new("🎲 ");
        let name = naming.channel_name("Night Owls");
        assert_eq!(name, "🎲 Night Owls");
        assert!(naming.is_managed(&name));
        assert!(!naming.is_managed("General"));
    }

    #[test]
    fn test_empty_prefix_never_claims_channels() {
        let naming = ChannelNaming::new("");
        assert!(!naming.is_managed("anything"));
    }

    #[test]
    fn test_fallback_names() {
        assert_eq!(
            ChannelNaming::fallback_names(3),
            vec!["Squad-1", "Squad-2", "Squad-3"]
        );
        assert!(ChannelNaming::fallback_names(0).is_empty());
    }

    #[test]
    fn test_squad_channel_membership() {
        let squad = SquadChannel::new(
            "Squad-1",
            ChannelId::new("c1"),
            vec![MemberId::new("a"), MemberId::new("b"), MemberId::new("a")],
        );
        assert_eq!(squad.members.len(), 2);
        assert!(squad.contains(&MemberId::new("b")));
    }
}

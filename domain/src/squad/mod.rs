//! Squads: composition of members into groups and the channels that host them.

pub mod channel;
pub mod composer;

pub use channel::{ChannelNaming, SquadChannel};
pub use composer::compose_squads;

//! Shared mock ports for use case tests.

use crate::ports::chat_platform::{ChannelInfo, ChatPlatform, PlatformError};
use crate::ports::checkpoint_store::{CheckpointStore, StoreError};
use crate::ports::clock::Clock;
use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::squad_namer::{NamingError, SquadNamer};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use squad_domain::{ChannelId, MemberId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct PlatformState {
    channels: HashMap<ChannelId, (ChannelId, String)>,
    locations: HashMap<MemberId, ChannelId>,
    next_id: usize,
    calls: Vec<String>,
    create_budget: Option<usize>,
    failing_moves: HashSet<MemberId>,
    messages: Vec<(ChannelId, String)>,
}

/// In-memory voice space that records every call
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<PlatformState>,
    fail_live_reads: AtomicBool,
    yielding: AtomicBool,
}

impl MockPlatform {
    pub fn new() -> Self {
        let platform = Self::default();
        platform.add_channel("lobby", "games", "Lobby");
        platform
    }

    pub fn add_channel(&self, id: &str, parent: &str, name: &str) {
        self.state.lock().unwrap().channels.insert(
            ChannelId::new(id),
            (ChannelId::new(parent), name.to_string()),
        );
    }

    pub fn connect(&self, member: &str, channel: &str) {
        self.state
            .lock()
            .unwrap()
            .locations
            .insert(MemberId::new(member), ChannelId::new(channel));
    }

    pub fn disconnect(&self, member: &str) {
        self.state.lock().unwrap().locations.remove(&MemberId::new(member));
    }

    pub fn location(&self, member: &str) -> Option<ChannelId> {
        self.state
            .lock()
            .unwrap()
            .locations
            .get(&MemberId::new(member))
            .cloned()
    }

    pub fn channel_exists(&self, id: &ChannelId) -> bool {
        self.state.lock().unwrap().channels.contains_key(id)
    }

    pub fn channel_name(&self, id: &ChannelId) -> Option<String> {
        self.state.lock().unwrap().channels.get(id).map(|(_, n)| n.clone())
    }

    /// Allow only `n` more channel creations before reporting a quota error
    pub fn limit_creations(&self, n: usize) {
        self.state.lock().unwrap().create_budget = Some(n);
    }

    pub fn fail_moves_for(&self, member: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_moves
            .insert(MemberId::new(member));
    }

    pub fn fail_live_reads(&self, fail: bool) {
        self.fail_live_reads.store(fail, Ordering::SeqCst);
    }

    /// Yield to the scheduler before channel and move calls, so concurrent
    /// handlers interleave at every platform round trip
    pub fn set_yielding(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }

    async fn round_trip(&self) {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.state.lock().unwrap().messages.clone()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn create_channel(&self, parent: &ChannelId, name: &str) -> Result<ChannelId, PlatformError> {
        self.round_trip().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create:{}", name));
        if let Some(budget) = state.create_budget.as_mut() {
            if *budget == 0 {
                return Err(PlatformError::QuotaExceeded("channel limit".to_string()));
            }
            *budget -= 1;
        }
        state.next_id += 1;
        let id = ChannelId::new(format!("ch-{}", state.next_id));
        state
            .channels
            .insert(id.clone(), (parent.clone(), name.to_string()));
        Ok(id)
    }

    async fn delete_channel(&self, channel: &ChannelId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{}", channel));
        state
            .channels
            .remove(channel)
            .map(|_| ())
            .ok_or_else(|| PlatformError::ChannelNotFound(channel.clone()))
    }

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("rename:{}:{}", channel, name));
        match state.channels.get_mut(channel) {
            Some(entry) => {
                entry.1 = name.to_string();
                Ok(())
            }
            None => Err(PlatformError::ChannelNotFound(channel.clone())),
        }
    }

    async fn list_channels(&self, parent: &ChannelId) -> Result<Vec<ChannelInfo>, PlatformError> {
        self.round_trip().await;
        let state = self.state.lock().unwrap();
        Ok(state
            .channels
            .iter()
            .filter(|(_, (p, _))| p == parent)
            .map(|(id, (_, name))| ChannelInfo {
                id: id.clone(),
                name: name.clone(),
            })
            .collect())
    }

    async fn move_member(&self, channel: &ChannelId, member: &MemberId) -> Result<(), PlatformError> {
        self.round_trip().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("move:{}:{}", channel, member));
        if state.failing_moves.contains(member) {
            return Err(PlatformError::RequestFailed("move rejected".to_string()));
        }
        if !state.channels.contains_key(channel) {
            return Err(PlatformError::ChannelNotFound(channel.clone()));
        }
        match state.locations.get_mut(member) {
            Some(location) => {
                *location = channel.clone();
                Ok(())
            }
            None => Err(PlatformError::MemberNotConnected(member.clone())),
        }
    }

    async fn live_members(&self, channel: &ChannelId) -> Result<HashSet<MemberId>, PlatformError> {
        if self.fail_live_reads.load(Ordering::SeqCst) {
            return Err(PlatformError::Timeout);
        }
        let state = self.state.lock().unwrap();
        if !state.channels.contains_key(channel) {
            return Err(PlatformError::ChannelNotFound(channel.clone()));
        }
        Ok(state
            .locations
            .iter()
            .filter(|(_, c)| *c == channel)
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn connected_members(&self) -> Result<Vec<MemberId>, PlatformError> {
        let mut members: Vec<MemberId> =
            self.state.lock().unwrap().locations.keys().cloned().collect();
        members.sort();
        Ok(members)
    }

    async fn display_name(&self, member: &MemberId) -> Result<String, PlatformError> {
        Ok(member.as_str().to_uppercase())
    }

    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .messages
            .push((channel.clone(), text.to_string()));
        Ok(())
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Store that sums increments in memory and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    totals: Mutex<HashMap<(String, String), i64>>,
    writes: Mutex<usize>,
    failing: AtomicBool,
}

impl RecordingStore {
    pub fn total(&self, key: &str, field: &str) -> i64 {
        self.totals
            .lock()
            .unwrap()
            .get(&(key.to_string(), field.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckpointStore for RecordingStore {
    async fn increment_field(&self, key: &str, field_path: &str, amount: i64) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        *self.writes.lock().unwrap() += 1;
        *self
            .totals
            .lock()
            .unwrap()
            .entry((key.to_string(), field_path.to_string()))
            .or_insert(0) += amount;
        Ok(())
    }
}

/// Logger that keeps every event in memory
#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<(&'static str, serde_json::Value)>>,
}

impl RecordingLogger {
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .count()
    }

    pub fn payloads(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl SessionEventLogger for RecordingLogger {
    fn log(&self, event: SessionEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}

/// Namer that returns fixed names
pub struct FixedNamer(pub Vec<String>);

#[async_trait]
impl SquadNamer for FixedNamer {
    async fn name_groups(&self, _squads: &[Vec<String>]) -> Result<Vec<String>, NamingError> {
        Ok(self.0.clone())
    }
}

pub fn members(ids: &[&str]) -> Vec<MemberId> {
    ids.iter().map(|id| MemberId::new(*id)).collect()
}

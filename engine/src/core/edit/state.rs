//! Edit State
//!
//! The player arena, track lanes, disposal queue and pending loads.
//! Commands reach this only through [`CommandContext`](crate::core::commands::CommandContext).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::future::{abortable, AbortHandle, Aborted, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tracing::{debug, warn};

use crate::core::{
    events::{EditEvent, EventBus},
    new_id,
    players::{ClipSnapshot, Player, PlayerFactory, PlayerStatus},
    scene::{track_z_index, SceneGraph},
    settings::EditSettings,
    timing::{resolve_auto_length, AssetProbe},
    CoreError, CoreResult, PlayerId, TimeMs, TrackId,
};

// =============================================================================
// Arena Types
// =============================================================================

/// Arena entry for one player
pub(crate) struct PlayerSlot {
    pub player: Box<dyn Player>,
    /// Unlinked from its lane, waiting for the next flush
    pub pending_disposal: bool,
    /// Scene container the player is attached to
    pub mounted_in: Option<TrackId>,
    pub load_handle: Option<AbortHandle>,
    /// Bumped on every schedule/abort so stale completions can be told apart
    pub load_epoch: u64,
}

impl PlayerSlot {
    fn new(player: Box<dyn Player>) -> Self {
        Self {
            player,
            pending_disposal: false,
            mounted_in: None,
            load_handle: None,
            load_epoch: 0,
        }
    }

    fn abort_load(&mut self) {
        if let Some(handle) = self.load_handle.take() {
            handle.abort();
        }
        self.load_epoch += 1;
    }
}

/// Ordered list of players on one track
#[derive(Clone, Debug, PartialEq)]
pub struct TrackLane {
    pub id: TrackId,
    pub clips: Vec<PlayerId>,
}

impl TrackLane {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            clips: Vec::new(),
        }
    }
}

/// Outcome of a deferred load, delivered when the orchestrator drains loads
pub(crate) struct LoadCompletion {
    player_id: PlayerId,
    epoch: u64,
    /// Measured auto length, when one was requested
    result: Result<CoreResult<Option<TimeMs>>, Aborted>,
}

// =============================================================================
// Edit State
// =============================================================================

pub(crate) struct EditState {
    pub players: HashMap<PlayerId, PlayerSlot>,
    pub tracks: Vec<TrackLane>,
    pub disposal_queue: Vec<PlayerId>,
    /// Players whose length intent is `"end"`
    pub end_length: HashSet<PlayerId>,
    /// Timeline end the end-length clips were last fitted against
    pub timeline_end: TimeMs,
    pub total_duration: TimeMs,
    pub selection: Option<PlayerId>,
    pub events: EventBus,
    pub scene: Box<dyn SceneGraph>,
    pub factory: Rc<dyn PlayerFactory>,
    pub probe: Rc<dyn AssetProbe>,
    pub pending_loads: FuturesUnordered<LocalBoxFuture<'static, LoadCompletion>>,
    pub settings: EditSettings,
}

impl EditState {
    pub fn new(
        settings: EditSettings,
        factory: Rc<dyn PlayerFactory>,
        probe: Rc<dyn AssetProbe>,
        scene: Box<dyn SceneGraph>,
    ) -> Self {
        Self {
            players: HashMap::new(),
            tracks: Vec::new(),
            disposal_queue: Vec::new(),
            end_length: HashSet::new(),
            timeline_end: 0.0,
            total_duration: 0.0,
            selection: None,
            events: EventBus::new(),
            scene,
            factory,
            probe,
            pending_loads: FuturesUnordered::new(),
            settings,
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn track(&self, index: usize) -> CoreResult<&TrackLane> {
        self.tracks.get(index).ok_or(CoreError::TrackNotFound(index))
    }

    pub fn clip_id_at(&self, track: usize, clip: usize) -> CoreResult<PlayerId> {
        self.track(track)?
            .clips
            .get(clip)
            .cloned()
            .ok_or(CoreError::ClipNotFound { track, clip })
    }

    /// Track and clip index of a linked player
    pub fn locate(&self, id: &str) -> Option<(usize, usize)> {
        self.tracks.iter().enumerate().find_map(|(t, lane)| {
            lane.clips
                .iter()
                .position(|clip| clip == id)
                .map(|c| (t, c))
        })
    }

    fn live_slot(&self, id: &str) -> CoreResult<&PlayerSlot> {
        self.players
            .get(id)
            .filter(|slot| !slot.pending_disposal)
            .ok_or_else(|| CoreError::PlayerNotFound(id.to_string()))
    }

    fn live_slot_mut(&mut self, id: &str) -> CoreResult<&mut PlayerSlot> {
        self.players
            .get_mut(id)
            .filter(|slot| !slot.pending_disposal)
            .ok_or_else(|| CoreError::PlayerNotFound(id.to_string()))
    }

    pub fn player(&self, id: &str) -> CoreResult<&dyn Player> {
        Ok(self.live_slot(id)?.player.as_ref())
    }

    pub fn player_mut(&mut self, id: &str) -> CoreResult<&mut dyn Player> {
        Ok(self.live_slot_mut(id)?.player.as_mut())
    }

    pub fn is_pending_disposal(&self, id: &str) -> bool {
        self.players.get(id).is_some_and(|slot| slot.pending_disposal)
    }

    pub fn emit(&mut self, event: EditEvent) {
        self.events.emit(event);
    }

    // =========================================================================
    // Tracks / Containers
    // =========================================================================

    /// Inserts an empty lane. `index == track count` appends.
    pub fn insert_track(&mut self, index: usize, id: Option<TrackId>) -> CoreResult<TrackId> {
        if index > self.tracks.len() {
            return Err(CoreError::TrackNotFound(index));
        }
        let id = id.unwrap_or_else(new_id);
        if self.tracks.iter().any(|lane| lane.id == id) {
            return Err(CoreError::ValidationError(format!(
                "track already exists: {id}"
            )));
        }
        self.tracks.insert(index, TrackLane::new(id.clone()));
        self.restack();
        debug!(track_id = %id, index, "Inserted track");
        Ok(id)
    }

    /// Removes an empty lane and its scene container
    pub fn remove_track(&mut self, index: usize) -> CoreResult<TrackLane> {
        let lane = self.track(index)?;
        if !lane.clips.is_empty() {
            return Err(CoreError::InvalidCommand(format!(
                "track {index} still has {} clips",
                lane.clips.len()
            )));
        }
        let lane = self.tracks.remove(index);
        self.scene.remove_container(&lane.id);
        for slot in self.players.values_mut() {
            if slot.mounted_in.as_ref() == Some(&lane.id) {
                slot.mounted_in = None;
            }
        }
        self.restack();
        debug!(track_id = %lane.id, index, "Removed track");
        Ok(lane)
    }

    /// Returns the container key for a track, creating the container lazily
    fn ensure_container(&mut self, index: usize) -> CoreResult<TrackId> {
        let key = self.track(index)?.id.clone();
        if !self.scene.has_container(&key) {
            self.scene.add_container(&key, track_z_index(index));
        }
        Ok(key)
    }

    fn restack(&mut self) {
        for (index, lane) in self.tracks.iter().enumerate() {
            if self.scene.has_container(&lane.id) {
                self.scene.set_z_index(&lane.id, track_z_index(index));
            }
        }
    }

    /// Attaches a player's display object to the container of `track`,
    /// detaching it from its previous container in the same step
    fn mount(&mut self, id: &PlayerId, track: usize) -> CoreResult<()> {
        let key = self.ensure_container(track)?;
        let Some(slot) = self.players.get_mut(id) else {
            return Err(CoreError::PlayerNotFound(id.clone()));
        };
        if slot.mounted_in.as_ref() == Some(&key) {
            return Ok(());
        }
        if let Some(previous) = slot.mounted_in.take() {
            self.scene.remove_child(&previous, id);
        }
        self.scene.add_child(&key, id);
        slot.mounted_in = Some(key);
        Ok(())
    }

    fn sync_end_length(&mut self, id: &PlayerId) {
        let is_end = self
            .players
            .get(id)
            .is_some_and(|slot| slot.player.timing_intent().length.is_end());
        if is_end {
            self.end_length.insert(id.clone());
        } else {
            self.end_length.remove(id);
        }
    }

    // =========================================================================
    // Player Lifecycle
    // =========================================================================

    /// Appends an already resolved player to a lane (bulk load)
    pub fn adopt(&mut self, track: usize, player: Box<dyn Player>) -> CoreResult<PlayerId> {
        self.track(track)?;
        let id = new_id();
        self.players.insert(id.clone(), PlayerSlot::new(player));
        self.tracks[track].clips.push(id.clone());
        self.mount(&id, track)?;
        self.sync_end_length(&id);
        Ok(id)
    }

    /// Links a player at `track`/`index`, creating it from `snapshot` or
    /// reviving the pending-disposal player with the same id.
    ///
    /// Construction runs before any structural change, so a failing factory
    /// leaves the state untouched.
    pub fn spawn_player(
        &mut self,
        track: usize,
        index: usize,
        id: Option<PlayerId>,
        snapshot: ClipSnapshot,
    ) -> CoreResult<PlayerId> {
        let lane_len = self.track(track)?.clips.len();
        if index > lane_len {
            return Err(CoreError::ClipNotFound { track, clip: index });
        }

        let revive = match &id {
            Some(existing) => match self.players.get(existing) {
                Some(slot) if slot.pending_disposal => true,
                Some(_) => return Err(CoreError::DuplicatePlayer(existing.clone())),
                None => false,
            },
            None => false,
        };

        let id = id.unwrap_or_else(new_id);
        let needs_load = if revive {
            let Some(slot) = self.players.get_mut(&id) else {
                return Err(CoreError::PlayerNotFound(id));
            };
            slot.pending_disposal = false;
            slot.player.set_config(snapshot.config);
            slot.player.set_bindings(snapshot.bindings);
            slot.player.reconfigure_after_restore();
            self.disposal_queue.retain(|queued| queued != &id);
            debug!(player_id = %id, "Revived player");
            self.players
                .get(&id)
                .is_some_and(|slot| slot.player.status() != PlayerStatus::Ready)
        } else {
            let mut player = self.factory.create(&snapshot.config)?;
            player.set_bindings(snapshot.bindings);
            self.players.insert(id.clone(), PlayerSlot::new(player));
            true
        };

        self.tracks[track].clips.insert(index, id.clone());
        self.mount(&id, track)?;
        self.sync_end_length(&id);

        if needs_load {
            let probe_auto = self
                .players
                .get(&id)
                .is_some_and(|slot| slot.player.timing_intent().length.is_auto());
            self.schedule_load(&id, probe_auto);
        }
        Ok(id)
    }

    /// Unlinks a player and queues it for disposal at the next flush.
    ///
    /// Any pending load is aborted and a selection of the player is cleared.
    /// Returns the position it was unlinked from.
    pub fn queue_disposal(&mut self, id: &str) -> CoreResult<(usize, usize)> {
        self.live_slot(id)?;
        let (track, index) = self
            .locate(id)
            .ok_or_else(|| CoreError::Internal(format!("player {id} is not linked to a track")))?;

        self.tracks[track].clips.remove(index);
        if let Some(slot) = self.players.get_mut(id) {
            slot.pending_disposal = true;
            slot.abort_load();
        }
        self.end_length.remove(id);
        if self.selection.as_deref() == Some(id) {
            self.selection = None;
            self.events.emit(EditEvent::SelectionCleared);
        }
        self.disposal_queue.push(id.to_string());
        debug!(player_id = %id, track, index, "Queued player for disposal");
        Ok((track, index))
    }

    /// Moves a linked player to `to_track`/`to_index`, transferring its
    /// container in the same step. Returns its previous position.
    pub fn move_player(
        &mut self,
        id: &str,
        to_track: usize,
        to_index: usize,
    ) -> CoreResult<(usize, usize)> {
        self.live_slot(id)?;
        let (from_track, from_index) = self
            .locate(id)
            .ok_or_else(|| CoreError::Internal(format!("player {id} is not linked to a track")))?;

        let target_len = self.track(to_track)?.clips.len();
        let capacity = if to_track == from_track {
            target_len - 1
        } else {
            target_len
        };
        if to_index > capacity {
            return Err(CoreError::ClipNotFound {
                track: to_track,
                clip: to_index,
            });
        }

        let id = self.tracks[from_track].clips.remove(from_index);
        self.tracks[to_track].clips.insert(to_index, id.clone());
        self.mount(&id, to_track)?;
        Ok((from_track, from_index))
    }

    /// Replaces a player's configuration and keeps the end-length set in sync
    pub fn reconfigure(&mut self, id: &str, snapshot: ClipSnapshot) -> CoreResult<()> {
        let slot = self.live_slot_mut(id)?;
        let previous = slot.player.config().clone();
        let next = &snapshot.config.asset;
        let reprobe = snapshot.config.length.is_auto()
            && (!previous.length.is_auto()
                || previous.asset.probe_source() != next.probe_source()
                || previous.asset.trim() != next.trim());

        slot.player.set_config(snapshot.config);
        slot.player.set_bindings(snapshot.bindings);
        if reprobe {
            // Unmeasured until the next load resolves it
            let mut timing = slot.player.resolved_timing();
            timing.length = 0.0;
            slot.player.set_resolved_timing(timing);
        }

        let id = id.to_string();
        self.sync_end_length(&id);
        Ok(())
    }

    // =========================================================================
    // Deferred Loads
    // =========================================================================

    /// Starts a cancellable load for a player.
    ///
    /// With `probe_auto` the continuation also measures the asset's duration
    /// and applies it as the auto length.
    pub fn schedule_load(&mut self, id: &str, probe_auto: bool) {
        let probe = Rc::clone(&self.probe);
        let Some(slot) = self.players.get_mut(id) else {
            return;
        };
        slot.abort_load();

        let epoch = slot.load_epoch;
        let asset = slot.player.config().asset.clone();
        let load = slot.player.load();
        let work = async move {
            load.await?;
            let measured = if probe_auto {
                Some(resolve_auto_length(&asset, probe.as_ref()).await)
            } else {
                None
            };
            CoreResult::Ok(measured)
        };

        let (work, handle) = abortable(work);
        slot.load_handle = Some(handle);

        let player_id = id.to_string();
        self.pending_loads.push(
            async move {
                LoadCompletion {
                    player_id,
                    epoch,
                    result: work.await,
                }
            }
            .boxed_local(),
        );
    }

    /// Applies every load that has already completed, without waiting
    pub fn drain_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Some(Some(completion)) = self.pending_loads.next().now_or_never() {
            self.apply_load(completion);
            applied += 1;
        }
        applied
    }

    pub(crate) fn apply_load(&mut self, completion: LoadCompletion) {
        let LoadCompletion {
            player_id,
            epoch,
            result,
        } = completion;

        let Ok(result) = result else {
            debug!(player_id = %player_id, "Load aborted");
            return;
        };
        let Some(slot) = self.players.get_mut(&player_id) else {
            return;
        };
        if slot.pending_disposal || slot.load_epoch != epoch {
            debug!(player_id = %player_id, "Dropping stale load completion");
            return;
        }
        slot.load_handle = None;

        match result {
            Err(e) => {
                warn!(player_id = %player_id, "Asset load failed: {}", e);
                self.events.emit(EditEvent::ClipLoadFailed {
                    player_id,
                    error: e.to_string(),
                });
            }
            Ok(measured) => {
                slot.player.draw();
                let Some(length) = measured else {
                    return;
                };
                if !slot.player.timing_intent().length.is_auto() {
                    return;
                }
                let mut timing = slot.player.resolved_timing();
                timing.length = length;
                slot.player.set_resolved_timing(timing);

                if let Some(position) = self.locate(&player_id) {
                    self.propagate(&[position]);
                }
            }
        }
    }

    /// Detaches, disposes and drops every player queued for disposal
    pub fn flush_disposals(&mut self) -> usize {
        let queue = std::mem::take(&mut self.disposal_queue);
        let mut disposed = 0;
        for id in queue {
            let pending = self
                .players
                .get(&id)
                .is_some_and(|slot| slot.pending_disposal);
            if !pending {
                continue;
            }
            if let Some(mut slot) = self.players.remove(&id) {
                if let Some(container) = slot.mounted_in.take() {
                    self.scene.remove_child(&container, &id);
                }
                slot.abort_load();
                slot.player.dispose();
                disposed += 1;
            }
        }
        if disposed > 0 {
            debug!(disposed, "Flushed disposal queue");
        }
        disposed
    }

    /// Disposes every player and clears all lanes and containers
    pub fn clear(&mut self) {
        for (id, mut slot) in self.players.drain() {
            if let Some(container) = slot.mounted_in.take() {
                self.scene.remove_child(&container, &id);
            }
            slot.abort_load();
            slot.player.dispose();
        }
        for lane in self.tracks.drain(..) {
            self.scene.remove_container(&lane.id);
        }
        self.disposal_queue.clear();
        self.end_length.clear();
        self.pending_loads = FuturesUnordered::new();
        self.selection = None;
        self.timeline_end = 0.0;
    }
}

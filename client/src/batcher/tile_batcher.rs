use std::{collections::BTreeMap, sync::Arc};

use futures::future::join_all;
use log::{debug, warn};
use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinHandle};

use hexmap_shared::{ApiError, TileBatchRequest, TileCoordinate, TileState};

use super::{BatchError, BatchGroup, PendingOp};
use crate::{CampaignApi, ChangeSet, ClientConfig, ClientError, SharedReplica};

type Snapshot = BTreeMap<TileCoordinate, PendingOp>;

#[derive(Default)]
struct BatchState {
    pending: Snapshot,
    errors: Vec<BatchError>,
    /// The single debounce timer and its generation
    timer: Option<(u64, JoinHandle<()>)>,
    generation: u64,
    next_seq: u64,
    /// Seq of the latest call that touched each tile
    touched: BTreeMap<TileCoordinate, u64>,
}

impl BatchState {
    fn cancel_timer(&mut self) {
        self.generation += 1;
        if let Some((_, timer)) = self.timer.take() {
            timer.abort();
        }
    }
}

struct BatcherInner {
    slug: String,
    replica: SharedReplica,
    api: Arc<dyn CampaignApi>,
    config: ClientConfig,
    state: Mutex<BatchState>,
}

/// Debounces and deduplicates a DM's tile mutations.
///
/// Every call updates the replica at once and queues at most one pending op
/// per tile. After [`ClientConfig::batch_delay`] of quiet the queue is sent as
/// one request per operation group. A rejected group goes back on the queue
/// and its tiles return to where they were; nothing is retried until the next
/// mutation or [`flush`](Self::flush).
#[derive(Clone)]
pub struct TileBatcher {
    inner: Arc<BatcherInner>,
}

impl TileBatcher {
    pub fn new(
        replica: SharedReplica,
        api: Arc<dyn CampaignApi>,
        slug: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let role = {
            let replica = replica.lock();
            if !replica.can_mutate_tiles() {
                return Err(ClientError::capability(replica.role(), "batch tile changes"));
            }
            replica.role()
        };
        debug!("Tile batcher ready for a {} replica", role);

        Ok(Self {
            inner: Arc::new(BatcherInner {
                slug: slug.into(),
                replica,
                api,
                config,
                state: Mutex::new(BatchState::default()),
            }),
        })
    }

    pub fn reveal_tile(&self, coords: TileCoordinate) -> ChangeSet {
        self.reveal_tiles(&[coords], false)
    }

    pub fn hide_tile(&self, coords: TileCoordinate) -> ChangeSet {
        self.hide_tiles(&[coords])
    }

    /// Reveals tiles that are not yet revealed in either form
    pub fn reveal_tiles(&self, tiles: &[TileCoordinate], always_revealed: bool) -> ChangeSet {
        let target = TileState::from_flag(always_revealed);
        self.queue(tiles, |effective| {
            (!effective.is_revealed()).then_some(target)
        })
    }

    /// Hides regular revealed tiles. Always-revealed tiles are left alone.
    pub fn hide_tiles(&self, tiles: &[TileCoordinate]) -> ChangeSet {
        self.queue(tiles, |effective| {
            (effective == TileState::Revealed).then_some(TileState::Unrevealed)
        })
    }

    /// Turning the flag on reveals unrevealed tiles too; turning it off only
    /// touches always-revealed tiles, which stay revealed
    pub fn toggle_always_revealed(
        &self,
        tiles: &[TileCoordinate],
        always_revealed: bool,
    ) -> ChangeSet {
        self.queue(tiles, |effective| match always_revealed {
            true => (effective != TileState::AlwaysRevealed).then_some(TileState::AlwaysRevealed),
            false => (effective == TileState::AlwaysRevealed).then_some(TileState::Revealed),
        })
    }

    /// Sends everything pending right now, without waiting for the timer.
    /// Returns the first rejection; all of them are kept in [`errors`](Self::errors).
    pub async fn flush(&self) -> Result<(), ClientError> {
        let snapshot = {
            let mut state = self.inner.state.lock();
            state.cancel_timer();
            std::mem::take(&mut state.pending)
        };
        if snapshot.is_empty() {
            return Ok(());
        }

        match self.inner.send(snapshot).await.into_iter().next() {
            Some(rejected) => Err(rejected.error.into()),
            None => Ok(()),
        }
    }

    pub fn pending(&self) -> Vec<(TileCoordinate, PendingOp)> {
        self.inner
            .state
            .lock()
            .pending
            .iter()
            .map(|(coords, op)| (*coords, *op))
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.state.lock().pending.is_empty()
    }

    pub fn errors(&self) -> Vec<BatchError> {
        self.inner.state.lock().errors.clone()
    }

    pub fn clear_errors(&self) {
        self.inner.state.lock().errors.clear();
    }

    /// `decide` maps a tile's effective state to its new target, or `None`
    /// when the call is a no-op for that tile
    fn queue<F>(&self, tiles: &[TileCoordinate], decide: F) -> ChangeSet
    where
        F: Fn(TileState) -> Option<TileState>,
    {
        let mut changes = ChangeSet::new();
        {
            let mut state = self.inner.state.lock();
            let mut replica = self.inner.replica.lock();

            for &coords in tiles {
                let queued = state.pending.get(&coords).copied();
                let effective = queued.map_or_else(|| replica.tile_state(coords), |op| op.target);
                let Some(target) = decide(effective).filter(|target| *target != effective) else {
                    continue;
                };
                let prior = queued.map_or(effective, |op| op.prior);

                state.next_seq += 1;
                let seq = state.next_seq;
                state.touched.insert(coords, seq);
                if target == prior {
                    state.pending.remove(&coords);
                } else {
                    state.pending.insert(coords, PendingOp { prior, target, seq });
                }
                changes.merge(replica.set_tile_state(coords, target));
            }
        }

        if !changes.is_empty() {
            self.schedule();
        }
        changes
    }

    /// (Re)arms the single debounce timer
    fn schedule(&self) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; tile changes wait for an explicit flush");
            return;
        };

        let mut state = self.inner.state.lock();
        state.cancel_timer();
        let generation = state.generation;
        let delay = self.inner.config.batch_delay;
        let inner = self.inner.clone();

        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(snapshot) = inner.take_for_timer(generation) else {
                return;
            };
            // sent from its own task so a later reschedule can't abort it
            tokio::spawn(async move {
                inner.send(snapshot).await;
            });
        });
        state.timer = Some((generation, timer));
    }
}

impl BatcherInner {
    fn take_for_timer(&self, generation: u64) -> Option<Snapshot> {
        let mut state = self.state.lock();
        if state.generation != generation {
            return None;
        }
        state.timer = None;
        let snapshot = std::mem::take(&mut state.pending);
        (!snapshot.is_empty()).then_some(snapshot)
    }

    /// Sends a snapshot, then the second legs its ops left behind, until no
    /// round is left
    async fn send(&self, snapshot: Snapshot) -> Vec<BatchError> {
        let mut errors = Vec::new();
        let mut round = snapshot;

        while !round.is_empty() {
            let mut groups: BTreeMap<BatchGroup, Vec<(TileCoordinate, PendingOp)>> =
                BTreeMap::new();
            for (coords, op) in round {
                if let Some(group) = op.group() {
                    groups.entry(group).or_default().push((coords, op));
                }
            }

            let requests = groups
                .into_iter()
                .map(|(group, ops)| self.send_group(group, ops));

            let mut next = Snapshot::new();
            for result in join_all(requests).await {
                match result {
                    Ok(confirmed) => next.extend(self.follow_up(confirmed)),
                    Err(rejected) => errors.push(rejected),
                }
            }
            round = next;
        }
        errors
    }

    async fn send_group(
        &self,
        group: BatchGroup,
        ops: Vec<(TileCoordinate, PendingOp)>,
    ) -> Result<Vec<(TileCoordinate, PendingOp)>, BatchError> {
        let request = TileBatchRequest {
            kind: group.kind,
            tiles: ops.iter().map(|(coords, _)| *coords).collect(),
            always_revealed: group.flag(),
        };
        {
            let mut replica = self.replica.lock();
            for (coords, _) in &ops {
                replica.watch_tile(*coords);
            }
        }

        match self.api.tiles_batch(&self.slug, request).await {
            Ok(response) => {
                debug!(
                    "Batch '{}' of {} tiles confirmed: {:?}",
                    group.kind.as_str(),
                    ops.len(),
                    response.result
                );
                let mut replica = self.replica.lock();
                for (coords, _) in &ops {
                    replica.unwatch_tile(*coords);
                }
                Ok(ops)
            }
            Err(error) => Err(self.restore(group, ops, error)),
        }
    }

    /// Second legs of confirmed ops, for the next round. A newer op queued for
    /// the tile meanwhile is rebased onto the confirmed first leg instead.
    fn follow_up(&self, confirmed: Vec<(TileCoordinate, PendingOp)>) -> Snapshot {
        let mut state = self.state.lock();
        let mut next = Snapshot::new();

        for (coords, op) in confirmed {
            let Some(remainder) = op.remainder() else {
                continue;
            };
            match state.pending.get(&coords).copied() {
                Some(newer) if newer.target == remainder.prior => {
                    state.pending.remove(&coords);
                }
                Some(newer) => {
                    state.pending.insert(
                        coords,
                        PendingOp {
                            prior: remainder.prior,
                            ..newer
                        },
                    );
                }
                // a newer op for the tile is already on its way
                None if state.touched.get(&coords).is_some_and(|seq| *seq > op.seq) => {}
                None => {
                    next.insert(coords, remainder);
                }
            }
        }
        next
    }

    /// Puts a rejected group back on the queue and its tiles back where they
    /// were. A tile the server announced a state for while the request was in
    /// flight takes that state instead, and a newer op queued for a tile is
    /// rebased onto it.
    fn restore(
        &self,
        group: BatchGroup,
        ops: Vec<(TileCoordinate, PendingOp)>,
        error: ApiError,
    ) -> BatchError {
        warn!(
            "Batch '{}' of {} tiles rejected, rolling back: {}",
            group.kind.as_str(),
            ops.len(),
            error
        );

        let mut state = self.state.lock();
        let mut replica = self.replica.lock();

        for (coords, op) in &ops {
            let reported = replica.unwatch_tile(*coords);
            let base = reported.unwrap_or(op.prior);

            match (state.pending.get(coords).copied(), reported) {
                (Some(newer), _) if newer.target == base => {
                    state.pending.remove(coords);
                }
                (Some(newer), _) => {
                    state.pending.insert(*coords, PendingOp { prior: base, ..newer });
                }
                (None, Some(announced)) => {
                    debug!("{} settled as {:?} by the server", coords, announced);
                    replica.set_tile_state(*coords, announced);
                }
                (None, None) => {
                    state.pending.insert(*coords, *op);
                    replica.set_tile_state(*coords, op.prior);
                }
            }
        }

        let rejected = BatchError {
            group,
            tiles: ops.iter().map(|(coords, _)| *coords).collect(),
            error,
        };
        state.errors.push(rejected.clone());
        rejected
    }
}

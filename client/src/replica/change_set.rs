use std::collections::BTreeSet;

use hexmap_shared::{MarkerId, SessionId, TileCoordinate};

/// What a single replica mutation touched. An empty set means the mutation
/// was a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub tiles: BTreeSet<TileCoordinate>,
    pub markers: BTreeSet<MarkerId>,
    pub sessions: BTreeSet<SessionId>,
    /// Keyed by the owning session
    pub paths: BTreeSet<SessionId>,
    pub time: bool,
    pub party: bool,
    pub audit: bool,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
            && self.markers.is_empty()
            && self.sessions.is_empty()
            && self.paths.is_empty()
            && !self.time
            && !self.party
            && !self.audit
    }

    pub fn merge(&mut self, other: ChangeSet) {
        self.tiles.extend(other.tiles);
        self.markers.extend(other.markers);
        self.sessions.extend(other.sessions);
        self.paths.extend(other.paths);
        self.time |= other.time;
        self.party |= other.party;
        self.audit |= other.audit;
    }
}

/// Monotonic counters, one per observable area of the replica
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Versions {
    pub tiles: u64,
    pub markers: u64,
    pub sessions: u64,
    pub paths: u64,
    pub time: u64,
}

impl Versions {
    pub(crate) fn bump(&mut self, changes: &ChangeSet) {
        if !changes.tiles.is_empty() {
            self.tiles += 1;
        }
        if !changes.markers.is_empty() {
            self.markers += 1;
        }
        if !changes.sessions.is_empty() {
            self.sessions += 1;
        }
        if !changes.paths.is_empty() || changes.party {
            self.paths += 1;
        }
        if changes.time || changes.audit {
            self.time += 1;
        }
    }

    pub(crate) fn bump_all(&mut self) {
        self.tiles += 1;
        self.markers += 1;
        self.sessions += 1;
        self.paths += 1;
        self.time += 1;
    }
}

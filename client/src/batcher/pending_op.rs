use hexmap_shared::{ApiError, TileBatchKind, TileCoordinate, TileState};

/// The queued change for one tile: where it stood before anything was queued
/// and where it should end up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingOp {
    pub prior: TileState,
    pub target: TileState,
    /// Queue order; later ops win
    pub seq: u64,
}

impl PendingOp {
    /// Request group that carries this op, as `(operation, alwaysRevealed)`.
    /// `None` when the op changes nothing.
    pub fn group(&self) -> Option<BatchGroup> {
        use TileState::*;

        let group = match (self.prior, self.target) {
            (Unrevealed, Revealed) => BatchGroup::new(TileBatchKind::Reveal, false),
            (Unrevealed, AlwaysRevealed) => BatchGroup::new(TileBatchKind::Reveal, true),
            (Revealed, Unrevealed) => BatchGroup::new(TileBatchKind::Hide, false),
            (Revealed, AlwaysRevealed) => {
                BatchGroup::new(TileBatchKind::ToggleAlwaysRevealed, true)
            }
            (AlwaysRevealed, Revealed) | (AlwaysRevealed, Unrevealed) => {
                BatchGroup::new(TileBatchKind::ToggleAlwaysRevealed, false)
            }
            _ => return None,
        };
        Some(group)
    }

    /// What is still to be sent once this op's group went through. Hiding an
    /// always-revealed tile takes a toggle off followed by a hide.
    pub fn remainder(&self) -> Option<PendingOp> {
        match (self.prior, self.target) {
            (TileState::AlwaysRevealed, TileState::Unrevealed) => Some(PendingOp {
                prior: TileState::Revealed,
                ..*self
            }),
            _ => None,
        }
    }
}

/// Ops sharing a group travel in one request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchGroup {
    pub kind: TileBatchKind,
    pub always_revealed: bool,
}

impl BatchGroup {
    pub fn new(kind: TileBatchKind, always_revealed: bool) -> Self {
        Self {
            kind,
            always_revealed,
        }
    }

    /// Hide requests carry no flag
    pub fn flag(&self) -> Option<bool> {
        match self.kind {
            TileBatchKind::Hide => None,
            _ => Some(self.always_revealed),
        }
    }
}

/// A batch the server rejected. Its tiles went back on the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchError {
    pub group: BatchGroup,
    pub tiles: Vec<TileCoordinate>,
    pub error: ApiError,
}

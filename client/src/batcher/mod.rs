mod pending_op;
mod tile_batcher;

pub use pending_op::{BatchError, BatchGroup, PendingOp};
pub use tile_batcher::TileBatcher;

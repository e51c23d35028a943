mod change_set;
mod local_replica;
mod reconciler;

pub use change_set::{ChangeSet, Versions};
pub use local_replica::{LocalReplica, SharedReplica, UNCONFIRMED_PATH_ID};

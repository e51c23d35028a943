mod broadcast_hub;
mod event_stream;

pub use broadcast_hub::{BroadcastHub, SubscriberId};
pub use event_stream::EventStream;

//! # Hexmap Server
//! The authoritative side of a shared hex exploration map: validates every
//! mutation against the stored campaign, applies it in a single transaction
//! and pushes the resulting change events to every connected client, filtered
//! by role.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use hexmap_shared::{
        ApiError, Audience, CampaignEvent, CampaignId, CampaignSnapshot, Frame, HexGrid, Role,
        TileCoordinate, WireEvent,
    };
}

mod handlers;
mod hub;
mod server;
mod session_context;
mod store;

pub use hub::{BroadcastHub, EventStream, SubscriberId};
pub use server::{MapServer, ServerConfig};
pub use session_context::SessionContext;
pub use store::{CampaignRecord, CampaignSeed, MemoryStore};

//! # Hexmap Client
//! The client side of a shared hex exploration map: a local replica that is
//! mutated optimistically, a batcher that debounces the DM's tile changes, and
//! the reconciler that merges server-pushed events without duplicating or
//! losing effects.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use hexmap_shared::{
        ApiError, CampaignEvent, Frame, MapMarker, MarkerId, Role, TileCoordinate, TileState,
        WireEvent,
    };
}

mod api;
mod batcher;
mod campaign_client;
mod client_config;
mod error;
mod replica;

pub use api::CampaignApi;
pub use batcher::{BatchError, BatchGroup, PendingOp, TileBatcher};
pub use campaign_client::CampaignClient;
pub use client_config::ClientConfig;
pub use error::ClientError;
pub use replica::{ChangeSet, LocalReplica, SharedReplica, Versions, UNCONFIRMED_PATH_ID};

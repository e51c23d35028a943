use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Identifies a campaign row
    CampaignId
);
row_id!(
    /// Identifies a map marker row. Negative values are client-side placeholders
    /// that only exist until the server confirms the create.
    MarkerId
);
row_id!(
    /// Identifies a game session row
    SessionId
);
row_id!(PathId);
row_id!(AuditEntryId);

impl MarkerId {
    /// Whether this id was assigned locally and has never been persisted
    pub const fn is_placeholder(&self) -> bool {
        self.0 < 0
    }
}

/// Game days, as a float
pub type GameDays = f64;

/// Tolerance used when comparing game times that travelled over the wire
pub const GAME_TIME_EPSILON: GameDays = 0.001;

/// Returns whether two game times are equal within [`GAME_TIME_EPSILON`]
pub fn game_time_eq(a: GameDays, b: GameDays) -> bool {
    (a - b).abs() < GAME_TIME_EPSILON
}

/// The role a connection acts as within a campaign
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dm,
    Player,
}

impl Role {
    pub fn is_dm(self) -> bool {
        self == Role::Dm
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Dm => "dm",
            Role::Player => "player",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which connected roles a published event is delivered to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Dm,
    Player,
    All,
}

impl Audience {
    /// Returns true if a subscriber with the given role should receive the event
    pub fn admits(self, role: Role) -> bool {
        match self {
            Audience::All => true,
            Audience::Dm => role == Role::Dm,
            Audience::Player => role == Role::Player,
        }
    }
}

impl From<Role> for Audience {
    fn from(role: Role) -> Self {
        match role {
            Role::Dm => Audience::Dm,
            Role::Player => Audience::Player,
        }
    }
}

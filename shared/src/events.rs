use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    GameDays, GameSession, MapMarker, MarkerId, PathId, PathStep, RevealedTile, SessionId,
    TileCoordinate, TimeAuditEntry, ToggledTile,
};

pub const TILE_REVEALED: &str = "tile:revealed";
pub const TILE_HIDDEN: &str = "tile:hidden";
pub const TILE_TOGGLED: &str = "tile:toggled";
pub const MARKER_CREATED: &str = "marker:created";
pub const MARKER_UPDATED: &str = "marker:updated";
pub const MARKER_DELETED: &str = "marker:deleted";
pub const SESSION_STARTED: &str = "session:started";
pub const SESSION_ENDED: &str = "session:ended";
pub const SESSION_DELETED: &str = "session:deleted";
pub const STEP_ADDED: &str = "movement:step-added";
pub const TIME_UPDATED: &str = "time:updated";

/// Errors that can occur while encoding or decoding a wire event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The event name is not one this protocol knows
    #[error("Unknown event name '{name}'")]
    UnknownEvent { name: String },

    /// The payload did not match the shape expected for the event
    #[error("Malformed payload for '{name}': {reason}")]
    MalformedPayload { name: String, reason: String },

    /// The payload could not be serialized
    #[error("Failed to serialize payload for '{name}': {reason}")]
    SerializationFailed { name: String, reason: String },

    /// A pushed frame was not valid event-stream text
    #[error("Malformed stream frame: {reason}")]
    MalformedFrame { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerDeleted {
    pub id: MarkerId,
    pub x: i32,
    pub y: i32,
}

impl MarkerDeleted {
    pub fn of(marker: &MapMarker) -> Self {
        Self {
            id: marker.id,
            x: marker.x,
            y: marker.y,
        }
    }
}

/// The session row plus the id of the path opened with it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    #[serde(flatten)]
    pub session: GameSession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<PathId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDeleted {
    pub id: SessionId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAdded {
    pub session_id: SessionId,
    pub step: PathStep,
    /// Keys of the tiles this step revealed
    pub tiles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeUpdated {
    pub global_game_time: GameDays,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_entry: Option<TimeAuditEntry>,
}

impl TimeUpdated {
    /// The same update with the audit entry stripped, as players receive it
    pub fn without_audit(&self) -> Self {
        Self {
            global_game_time: self.global_game_time,
            audit_entry: None,
        }
    }
}

/// A change pushed from the server to every connected replica of a campaign
#[derive(Clone, Debug, PartialEq)]
pub enum CampaignEvent {
    TilesRevealed(Vec<RevealedTile>),
    TilesHidden(Vec<TileCoordinate>),
    TilesToggled(Vec<ToggledTile>),
    MarkerCreated(MapMarker),
    MarkerUpdated(MapMarker),
    MarkerDeleted(MarkerDeleted),
    SessionStarted(SessionStarted),
    SessionEnded(GameSession),
    SessionDeleted(SessionDeleted),
    StepAdded(StepAdded),
    TimeUpdated(TimeUpdated),
}

impl CampaignEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CampaignEvent::TilesRevealed(_) => TILE_REVEALED,
            CampaignEvent::TilesHidden(_) => TILE_HIDDEN,
            CampaignEvent::TilesToggled(_) => TILE_TOGGLED,
            CampaignEvent::MarkerCreated(_) => MARKER_CREATED,
            CampaignEvent::MarkerUpdated(_) => MARKER_UPDATED,
            CampaignEvent::MarkerDeleted(_) => MARKER_DELETED,
            CampaignEvent::SessionStarted(_) => SESSION_STARTED,
            CampaignEvent::SessionEnded(_) => SESSION_ENDED,
            CampaignEvent::SessionDeleted(_) => SESSION_DELETED,
            CampaignEvent::StepAdded(_) => STEP_ADDED,
            CampaignEvent::TimeUpdated(_) => TIME_UPDATED,
        }
    }

    pub fn encode(&self) -> Result<WireEvent, WireError> {
        WireEvent::encode(self)
    }
}

/// A named JSON payload, exactly as it travels on the push stream
#[derive(Clone, Debug, PartialEq)]
pub struct WireEvent {
    pub name: String,
    pub data: String,
}

impl WireEvent {
    pub fn encode(event: &CampaignEvent) -> Result<Self, WireError> {
        let name = event.name();
        let data = match event {
            CampaignEvent::TilesRevealed(tiles) => serde_json::to_string(tiles),
            CampaignEvent::TilesHidden(tiles) => serde_json::to_string(tiles),
            CampaignEvent::TilesToggled(tiles) => serde_json::to_string(tiles),
            CampaignEvent::MarkerCreated(marker) | CampaignEvent::MarkerUpdated(marker) => {
                serde_json::to_string(marker)
            }
            CampaignEvent::MarkerDeleted(deleted) => serde_json::to_string(deleted),
            CampaignEvent::SessionStarted(started) => serde_json::to_string(started),
            CampaignEvent::SessionEnded(session) => serde_json::to_string(session),
            CampaignEvent::SessionDeleted(deleted) => serde_json::to_string(deleted),
            CampaignEvent::StepAdded(step) => serde_json::to_string(step),
            CampaignEvent::TimeUpdated(time) => serde_json::to_string(time),
        }
        .map_err(|err| WireError::SerializationFailed {
            name: name.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            data,
        })
    }

    /// Parses the payload back into a typed event. Tile payloads may carry a
    /// single object instead of an array.
    pub fn decode(&self) -> Result<CampaignEvent, WireError> {
        let name = self.name.as_str();
        let value: Value = serde_json::from_str(&self.data).map_err(|err| self.malformed(err))?;

        let event = match name {
            TILE_REVEALED => CampaignEvent::TilesRevealed(self.one_or_many(value)?),
            TILE_HIDDEN => CampaignEvent::TilesHidden(self.one_or_many(value)?),
            TILE_TOGGLED => CampaignEvent::TilesToggled(self.one_or_many(value)?),
            MARKER_CREATED => CampaignEvent::MarkerCreated(self.payload(value)?),
            MARKER_UPDATED => CampaignEvent::MarkerUpdated(self.payload(value)?),
            MARKER_DELETED => CampaignEvent::MarkerDeleted(self.payload(value)?),
            SESSION_STARTED => CampaignEvent::SessionStarted(self.payload(value)?),
            SESSION_ENDED => CampaignEvent::SessionEnded(self.payload(value)?),
            SESSION_DELETED => CampaignEvent::SessionDeleted(self.payload(value)?),
            STEP_ADDED => CampaignEvent::StepAdded(self.payload(value)?),
            TIME_UPDATED => CampaignEvent::TimeUpdated(self.payload(value)?),
            _ => {
                return Err(WireError::UnknownEvent {
                    name: self.name.clone(),
                })
            }
        };

        Ok(event)
    }

    /// Renders the event as a server-sent-events message
    pub fn to_sse(&self) -> String {
        let mut out = format!("event: {}\n", self.name);
        for line in self.data.lines() {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    fn payload<T: DeserializeOwned>(&self, value: Value) -> Result<T, WireError> {
        serde_json::from_value(value).map_err(|err| self.malformed(err))
    }

    fn one_or_many<T: DeserializeOwned>(&self, value: Value) -> Result<Vec<T>, WireError> {
        match value {
            Value::Array(_) => self.payload(value),
            single => Ok(vec![self.payload(single)?]),
        }
    }

    fn malformed(&self, err: serde_json::Error) -> WireError {
        WireError::MalformedPayload {
            name: self.name.clone(),
            reason: err.to_string(),
        }
    }
}

/// One unit of the push stream
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Event(WireEvent),
    KeepAlive,
}

impl Frame {
    pub const KEEP_ALIVE: &'static str = ": keep-alive\n\n";

    pub fn to_sse(&self) -> String {
        match self {
            Frame::Event(event) => event.to_sse(),
            Frame::KeepAlive => Self::KEEP_ALIVE.to_string(),
        }
    }

    /// Parses one server-sent-events message (without the blank-line terminator
    /// being required). A message made only of comments is a keep-alive.
    pub fn parse(text: &str) -> Result<Frame, WireError> {
        let mut name: Option<&str> = None;
        let mut data: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => name = Some(value),
                "data" => data.push(value),
                _ => {}
            }
        }

        match (name, data.is_empty()) {
            (None, true) => Ok(Frame::KeepAlive),
            (Some(name), false) => Ok(Frame::Event(WireEvent {
                name: name.to_string(),
                data: data.join("\n"),
            })),
            (None, false) => Err(WireError::MalformedFrame {
                reason: "data without an event name".to_string(),
            }),
            (Some(name), true) => Err(WireError::MalformedFrame {
                reason: format!("event '{}' has no data", name),
            }),
        }
    }
}

//! Network message types and their JSON wire shape.
//!
//! Inbound frames are decoded once, at the transport boundary, into the closed
//! [`GameMessage`] enum. The wire shape stays compatible with peers that send
//! plain `{playerId, nickname, x, y, direction, role, roomId, status?}`
//! objects: the `type` discriminant is written on every outbound frame but is
//! optional on inbound ones, `status: "LEAVE"` always means leave, and a JSON
//! array is a batch sync.
//!
//! Planar coordinates travel as fixed-point integers (world units × 100); the
//! wire `y` carries world `z`. The facing angle travels as decimal text.

use glam::Vec3;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Wire value of `status` that removes a player.
pub const LEAVE_STATUS: &str = "LEAVE";

/// Scale between world units and wire fixed-point integers.
pub const FIXED_POINT_SCALE: f32 = 100.0;

// ---------------------------------------------------------------------------
// Fixed-point helpers
// ---------------------------------------------------------------------------

/// World coordinate → wire fixed-point integer (rounded).
pub fn to_fixed(value: f32) -> i64 {
    (value * FIXED_POINT_SCALE).round() as i64
}

/// Wire fixed-point integer → world coordinate.
pub fn from_fixed(value: i64) -> f32 {
    value as f32 / FIXED_POINT_SCALE
}

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Role a player picked at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayerRole {
    /// Floor staff.
    #[default]
    HallServer,
    /// Works behind the counter.
    Barista,
}

impl PlayerRole {
    /// Wire spelling of the role.
    pub fn as_wire(self) -> &'static str {
        match self {
            PlayerRole::HallServer => "HALL_SERVER",
            PlayerRole::Barista => "BARISTA",
        }
    }

    /// Parse the wire spelling, case-insensitively.
    pub fn from_wire(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "HALL_SERVER" => Some(PlayerRole::HallServer),
            "BARISTA" => Some(PlayerRole::Barista),
            _ => None,
        }
    }
}

/// Planar position in wire fixed-point units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPosition {
    /// World x × 100.
    pub x: i64,
    /// World z × 100.
    pub y: i64,
}

impl FixedPosition {
    /// Quantize a world position (its `y` is ignored).
    pub fn from_world(position: Vec3) -> Self {
        Self {
            x: to_fixed(position.x),
            y: to_fixed(position.z),
        }
    }

    /// World position on the ground plane.
    pub fn to_world(self) -> Vec3 {
        Vec3::new(from_fixed(self.x), 0.0, from_fixed(self.y))
    }
}

/// One player's declared state, as carried by join/update/leave/sync frames.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Stable player id (the display name in this system).
    pub player_id: String,
    /// Display name.
    pub nickname: String,
    /// Planar position, absent when the frame carried no coordinates.
    pub position: Option<FixedPosition>,
    /// Facing angle in radians, absent when not sent.
    pub direction: Option<f32>,
    /// Role, absent or unknown roles decode to `None`.
    pub role: Option<PlayerRole>,
    /// Room the state belongs to.
    pub room_id: Option<String>,
}

impl PlayerState {
    /// A bare state carrying only an id; the nickname defaults to the id.
    pub fn new(player_id: impl Into<String>) -> Self {
        let player_id = player_id.into();
        Self {
            nickname: player_id.clone(),
            player_id,
            position: None,
            direction: None,
            role: None,
            room_id: None,
        }
    }

    /// Builder: set the world position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(FixedPosition::from_world(position));
        self
    }

    /// Builder: set the facing angle.
    pub fn with_direction(mut self, direction: f32) -> Self {
        self.direction = Some(direction);
        self
    }

    /// World position on the ground plane, if the state carried one.
    pub fn world_position(&self) -> Option<Vec3> {
        self.position.map(FixedPosition::to_world)
    }
}

/// A chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Sender display name.
    pub nickname: String,
    /// Text content.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Every message the core exchanges with the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    /// A player entered the room.
    Join(PlayerState),
    /// A player moved or turned.
    Update(PlayerState),
    /// A player left the room.
    Leave(PlayerState),
    /// Batch of current states, delivered on a private per-player channel.
    Sync(Vec<PlayerState>),
    /// Room chat.
    Chat(ChatLine),
}

impl GameMessage {
    /// Id of the player the message is about; `None` for batches and chat.
    pub fn player_id(&self) -> Option<&str> {
        match self {
            GameMessage::Join(s) | GameMessage::Update(s) | GameMessage::Leave(s) => {
                Some(&s.player_id)
            }
            GameMessage::Sync(_) | GameMessage::Chat(_) => None,
        }
    }

    /// Whether this is a leave signal.
    pub fn is_leave(&self) -> bool {
        matches!(self, GameMessage::Leave(_))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The body was not JSON or a field had the wrong type.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `playerId` nor `nickname` was present.
    #[error("frame carries no player id")]
    MissingPlayerId,

    /// `direction` was present but not a number.
    #[error("direction {0:?} is not a number")]
    InvalidDirection(String),

    /// The top-level JSON value was neither an object nor an array.
    #[error("unexpected frame shape: {0}")]
    UnexpectedShape(&'static str),
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

/// Flat JSON object as it appears on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFrame {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nickname: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_fixed",
        skip_serializing_if = "Option::is_none"
    )]
    x: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient_fixed",
        skip_serializing_if = "Option::is_none"
    )]
    y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction: Option<DirectionRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

/// Facing angle: text on our side, but some peers send a bare number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DirectionRepr {
    Text(String),
    Number(f64),
}

/// `NaN` and the infinities parse as `f32` but are not headings.
fn finite_direction(value: f32, raw: impl FnOnce() -> String) -> Result<f32, MessageError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MessageError::InvalidDirection(raw()))
    }
}

/// Accept integer or fractional coordinates; fractional ones are rounded.
fn lenient_fixed<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value: Option<f64> = Option::deserialize(d)?;
    Ok(value.map(|v| v.round() as i64))
}

impl WireFrame {
    fn from_state(state: &PlayerState, kind: Option<&str>) -> Self {
        Self {
            kind: kind.map(str::to_string),
            player_id: Some(state.player_id.clone()),
            nickname: Some(state.nickname.clone()),
            x: state.position.map(|p| p.x),
            y: state.position.map(|p| p.y),
            direction: state.direction.map(|d| DirectionRepr::Text(d.to_string())),
            role: state.role.map(|r| r.as_wire().to_string()),
            room_id: state.room_id.clone(),
            status: None,
            content: None,
        }
    }

    fn is_leave(&self) -> bool {
        self.status.as_deref() == Some(LEAVE_STATUS) || self.kind.as_deref() == Some("LEAVE")
    }

    fn into_state(self) -> Result<PlayerState, MessageError> {
        let player_id = self
            .player_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.nickname.clone().filter(|n| !n.is_empty()))
            .ok_or(MessageError::MissingPlayerId)?;

        let direction = match self.direction {
            None => None,
            Some(DirectionRepr::Number(n)) => Some(finite_direction(n as f32, || n.to_string())?),
            Some(DirectionRepr::Text(text)) if text.trim().is_empty() => None,
            Some(DirectionRepr::Text(text)) => {
                let parsed = text
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| MessageError::InvalidDirection(text.clone()))?;
                Some(finite_direction(parsed, || text.clone())?)
            }
        };

        let position = match (self.x, self.y) {
            (Some(x), Some(y)) => Some(FixedPosition { x, y }),
            _ => None,
        };

        Ok(PlayerState {
            nickname: self.nickname.unwrap_or_else(|| player_id.clone()),
            player_id,
            position,
            direction,
            role: self.role.as_deref().and_then(PlayerRole::from_wire),
            room_id: self.room_id,
        })
    }

    fn into_message(self) -> Result<GameMessage, MessageError> {
        if self.kind.as_deref() == Some("CHAT") {
            return Ok(GameMessage::Chat(ChatLine {
                nickname: self
                    .nickname
                    .or(self.player_id)
                    .unwrap_or_else(|| "Unknown".to_string()),
                content: self.content.unwrap_or_default(),
            }));
        }
        let leave = self.is_leave();
        let join = self.kind.as_deref() == Some("JOIN");
        let state = self.into_state()?;
        Ok(if leave {
            GameMessage::Leave(state)
        } else if join {
            GameMessage::Join(state)
        } else {
            GameMessage::Update(state)
        })
    }
}

impl From<&GameMessage> for WireFrame {
    fn from(msg: &GameMessage) -> Self {
        match msg {
            GameMessage::Join(s) => WireFrame::from_state(s, Some("JOIN")),
            GameMessage::Update(s) => WireFrame::from_state(s, Some("MOVE")),
            GameMessage::Leave(s) => WireFrame {
                status: Some(LEAVE_STATUS.to_string()),
                ..WireFrame::from_state(s, Some("LEAVE"))
            },
            GameMessage::Chat(line) => WireFrame {
                kind: Some("CHAT".to_string()),
                nickname: Some(line.nickname.clone()),
                content: Some(line.content.clone()),
                ..WireFrame::default()
            },
            // Batches serialize as arrays; see `Serialize for GameMessage`.
            GameMessage::Sync(_) => WireFrame::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

impl Serialize for GameMessage {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            GameMessage::Sync(states) => states
                .iter()
                .map(|state| WireFrame::from_state(state, None))
                .collect::<Vec<_>>()
                .serialize(s),
            other => WireFrame::from(other).serialize(s),
        }
    }
}

impl<'de> Deserialize<'de> for GameMessage {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        from_value(value).map_err(D::Error::custom)
    }
}

/// Decode one inbound text frame.
pub fn decode_message(body: &str) -> Result<GameMessage, MessageError> {
    let value: Value = serde_json::from_str(body)?;
    from_value(value)
}

/// Encode a message as a JSON text frame.
pub fn encode_message(msg: &GameMessage) -> Result<String, MessageError> {
    Ok(serde_json::to_string(msg)?)
}

fn from_value(value: Value) -> Result<GameMessage, MessageError> {
    match value {
        Value::Object(_) => serde_json::from_value::<WireFrame>(value)?.into_message(),
        Value::Array(items) => {
            let mut states = Vec::with_capacity(items.len());
            for item in items {
                let entry = serde_json::from_value::<WireFrame>(item)
                    .map_err(MessageError::from)
                    .and_then(WireFrame::into_state);
                match entry {
                    Ok(state) => states.push(state),
                    Err(err) => tracing::warn!("Skipping sync entry: {err}"),
                }
            }
            Ok(GameMessage::Sync(states))
        }
        _ => Err(MessageError::UnexpectedShape("expected object or array")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mina() -> PlayerState {
        PlayerState {
            player_id: "mina".to_string(),
            nickname: "mina".to_string(),
            position: Some(FixedPosition { x: 150, y: -275 }),
            direction: Some(1.5),
            role: Some(PlayerRole::Barista),
            room_id: Some("1".to_string()),
        }
    }

    #[test]
    fn test_fixed_point_rounds() {
        assert_eq!(to_fixed(1.234), 123);
        assert_eq!(to_fixed(1.235_1), 124);
        assert_eq!(to_fixed(-0.006), -1);
        assert!((from_fixed(-275) + 2.75).abs() < 1e-6);
    }

    #[test]
    fn test_update_wire_shape() {
        let value = serde_json::to_value(GameMessage::Update(mina())).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "MOVE",
                "playerId": "mina",
                "nickname": "mina",
                "x": 150,
                "y": -275,
                "direction": "1.5",
                "role": "BARISTA",
                "roomId": "1"
            })
        );
    }

    #[test]
    fn test_leave_carries_status() {
        let value = serde_json::to_value(GameMessage::Leave(PlayerState::new("X"))).unwrap();
        assert_eq!(value["status"], "LEAVE");
        assert_eq!(value["playerId"], "X");
    }

    #[test]
    fn test_sync_serializes_as_array() {
        let msg = GameMessage::Sync(vec![mina(), PlayerState::new("jun")]);
        let value = serde_json::to_value(&msg).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].get("type").is_none());
    }

    #[test]
    fn test_decode_untyped_frame_is_update() {
        let body = r#"{"playerId":"jun","nickname":"jun","x":400,"y":300,"direction":"0.25","role":"HALL_SERVER","roomId":"1"}"#;
        let msg = decode_message(body).unwrap();
        let GameMessage::Update(state) = msg else {
            panic!("expected update, got {msg:?}");
        };
        assert_eq!(state.position, Some(FixedPosition { x: 400, y: 300 }));
        assert_eq!(state.direction, Some(0.25));
        assert_eq!(state.role, Some(PlayerRole::HallServer));
        assert_eq!(state.world_position(), Some(Vec3::new(4.0, 0.0, 3.0)));
    }

    #[test]
    fn test_decode_typed_join() {
        let msg = decode_message(r#"{"type":"JOIN","nickname":"jun","x":1,"y":2}"#).unwrap();
        assert!(matches!(msg, GameMessage::Join(ref s) if s.player_id == "jun"));
    }

    #[test]
    fn test_decode_status_leave_without_type() {
        let msg = decode_message(r#"{"playerId":"X","status":"LEAVE"}"#).unwrap();
        assert!(msg.is_leave());
        assert_eq!(msg.player_id(), Some("X"));
    }

    #[test]
    fn test_nickname_used_when_player_id_missing() {
        let msg = decode_message(r#"{"nickname":"hana","x":0,"y":0}"#).unwrap();
        assert_eq!(msg.player_id(), Some("hana"));
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = decode_message(r#"{"x":1,"y":2}"#).unwrap_err();
        assert!(matches!(err, MessageError::MissingPlayerId));
    }

    #[test]
    fn test_numeric_direction_and_fractional_coords_accepted() {
        let msg = decode_message(r#"{"playerId":"a","x":100.6,"y":-0.4,"direction":3.0}"#).unwrap();
        let GameMessage::Update(state) = msg else {
            panic!("expected update");
        };
        assert_eq!(state.position, Some(FixedPosition { x: 101, y: 0 }));
        assert_eq!(state.direction, Some(3.0));
    }

    #[test]
    fn test_bad_direction_rejected() {
        let err = decode_message(r#"{"playerId":"a","direction":"north"}"#).unwrap_err();
        assert!(matches!(err, MessageError::InvalidDirection(_)));
    }

    #[test]
    fn test_non_finite_direction_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            let body = format!(r#"{{"playerId":"a","direction":"{raw}"}}"#);
            let err = decode_message(&body).unwrap_err();
            assert!(matches!(err, MessageError::InvalidDirection(_)), "{raw}");
        }
        let err = decode_message(r#"{"playerId":"a","direction":1e300}"#).unwrap_err();
        assert!(matches!(err, MessageError::InvalidDirection(_)));
    }

    #[test]
    fn test_empty_direction_is_absent() {
        let msg = decode_message(r#"{"playerId":"a","direction":""}"#).unwrap();
        let GameMessage::Update(state) = msg else {
            panic!("expected update");
        };
        assert_eq!(state.direction, None);
    }

    #[test]
    fn test_partial_coordinates_are_absent() {
        let msg = decode_message(r#"{"playerId":"a","x":5}"#).unwrap();
        let GameMessage::Update(state) = msg else {
            panic!("expected update");
        };
        assert_eq!(state.position, None);
    }

    #[test]
    fn test_unknown_role_decodes_to_none() {
        let msg = decode_message(r#"{"playerId":"a","role":"CHEF"}"#).unwrap();
        let GameMessage::Update(state) = msg else {
            panic!("expected update");
        };
        assert_eq!(state.role, None);
    }

    #[test]
    fn test_sync_batch_skips_entries_without_id() {
        let body = r#"[{"playerId":"a","x":0,"y":0},{"x":1},{"nickname":"b"}]"#;
        let GameMessage::Sync(states) = decode_message(body).unwrap() else {
            panic!("expected sync");
        };
        let ids: Vec<_> = states.iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_sync_batch_skips_mistyped_entries() {
        let body = r#"[{"playerId":5},{"playerId":"a","direction":"NaN"},{"playerId":"b"}]"#;
        let GameMessage::Sync(states) = decode_message(body).unwrap() else {
            panic!("expected sync");
        };
        let ids: Vec<_> = states.iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(ids, ["b"]);
    }

    #[test]
    fn test_chat_frame() {
        let msg = decode_message(r#"{"type":"CHAT","nickname":"jun","content":"hi"}"#).unwrap();
        assert_eq!(
            msg,
            GameMessage::Chat(ChatLine {
                nickname: "jun".to_string(),
                content: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            decode_message("{not json"),
            Err(MessageError::Json(_))
        ));
        assert!(matches!(
            decode_message("42"),
            Err(MessageError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_encoded_update_decodes_to_same_state() {
        let text = encode_message(&GameMessage::Update(mina())).unwrap();
        assert_eq!(decode_message(&text).unwrap(), GameMessage::Update(mina()));
    }

    #[test]
    fn test_role_from_wire_is_case_insensitive() {
        assert_eq!(PlayerRole::from_wire("barista"), Some(PlayerRole::Barista));
        assert_eq!(PlayerRole::from_wire("CHEF"), None);
    }
}

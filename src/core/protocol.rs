// ═══════════════════════════════════════════════════════════════════════════
// Host bridge messages
// ═══════════════════════════════════════════════════════════════════════════
//
// Tagged on `type`, camelCase fields, so the same JSON works over a
// postMessage channel or a newline-delimited socket.

use serde::{Deserialize, Serialize};

use crate::host::LeaderboardEntry;
use crate::maze::{Cell, Position};

/// Host → embedded view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    InitialData(InitialData),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub keys: u32,
    /// Raw rows; validated into a `Maze` by the session so a bad payload can
    /// be logged instead of failing the whole message.
    #[serde(default)]
    pub maze: Vec<Vec<Cell>>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub lives: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_played: Option<u32>,
    #[serde(default)]
    pub is_retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new_game: Option<bool>,
    #[serde(default)]
    pub should_show_bonus_key: bool,
    #[serde(default)]
    pub is_casual_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_first_game: Option<bool>,
    #[serde(flatten)]
    pub images: ImageUrls,
}

fn default_level() -> u32 {
    1
}

impl InitialData {
    /// Absent `isNewGame` means "anything that is not a retry".
    pub fn is_new_game(&self) -> bool {
        self.is_new_game.unwrap_or(!self.is_retry)
    }
}

/// Display URLs for sprites. An empty string means "no image".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrls {
    #[serde(default)]
    pub player_image_url: String,
    #[serde(default)]
    pub crystal_ball_image_url: String,
    #[serde(default)]
    pub map_image_url: String,
    #[serde(default)]
    pub key_image_url: String,
    #[serde(default)]
    pub trap1_image_url: String,
    #[serde(default)]
    pub trap2_image_url: String,
    #[serde(default)]
    pub trap3_image_url: String,
    #[serde(default)]
    pub door_image_url: String,
    #[serde(default)]
    pub door_crack1_image_url: String,
    #[serde(default)]
    pub door_crack2_image_url: String,
    #[serde(default)]
    pub door_crack3_image_url: String,
}

impl ImageUrls {
    /// Logical asset names in the order the host resolves them.
    pub const NAMES: [&'static str; 11] = [
        "player",
        "crystal-ball",
        "map",
        "key",
        "trap1",
        "trap2",
        "trap3",
        "door",
        "door-crack1",
        "door-crack2",
        "door-crack3",
    ];

    /// Builds the URL table from a resolver, one call per logical name.
    pub fn from_fn(mut resolve: impl FnMut(&str) -> String) -> Self {
        Self {
            player_image_url: resolve("player"),
            crystal_ball_image_url: resolve("crystal-ball"),
            map_image_url: resolve("map"),
            key_image_url: resolve("key"),
            trap1_image_url: resolve("trap1"),
            trap2_image_url: resolve("trap2"),
            trap3_image_url: resolve("trap3"),
            door_image_url: resolve("door"),
            door_crack1_image_url: resolve("door-crack1"),
            door_crack2_image_url: resolve("door-crack2"),
            door_crack3_image_url: resolve("door-crack3"),
        }
    }
}

/// Embedded view → host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewMessage {
    Ready,
    MovePlayer { position: Position },
    UnlockDoor { position: Position },
    GameOver(GameOverReport),
    NewGame,
    NextGame { lives: u32 },
    Retry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverReport {
    pub won: bool,
    pub lives: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_bonus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_played: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_streak: Option<u32>,
    #[serde(default)]
    pub should_show_bonus_key: bool,
}

// ─── daemon framing ─────────────────────────────────────────────────────────
//
// Over a socket every request line is either a `ViewMessage` or a `Control`
// request, and every request gets exactly one `Reply` line.

/// Connection-level requests that are not part of the view bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Control {
    Hello {
        username: String,
        #[serde(default)]
        casual: bool,
    },
    Leaderboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Messages { messages: Vec<HostMessage> },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    Success { message: String },
    Error { message: String },
}

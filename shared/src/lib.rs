pub mod geometry;

use geometry::{Bounds, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WORLD_WIDTH: f32 = 1920.0;
pub const WORLD_HEIGHT: f32 = 1080.0;
pub const PLAYER_MARGIN: f32 = 15.0;
pub const TAG_RADIUS: f32 = 30.0;
pub const FREEZE_DURATION_MS: u64 = 3000;
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";
/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 32;
pub const PROTOCOL_VERSION: u32 = 1;

/// Connection-scoped player identity handed out by the server.
pub type PlayerId = u32;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    SetName {
        name: Option<String>,
    },
    /// Movement delta, not an absolute position.
    Move {
        x: f32,
        y: f32,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: PlayerId,
    },
    CurrentPlayers {
        players: HashMap<PlayerId, Player>,
        tagger_id: Option<PlayerId>,
    },
    NewPlayer {
        player: Player,
    },
    PlayerMoved {
        id: PlayerId,
        x: f32,
        y: f32,
    },
    TaggerChanged {
        tagger_id: Option<PlayerId>,
    },
    PlayerDisconnected {
        id: PlayerId,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub color: String,
    /// Wall-clock milliseconds until which the player cannot move. Zero means never frozen.
    pub frozen_until: u64,
}

impl Player {
    pub fn new(id: PlayerId, name: String, x: f32, y: f32, color: String) -> Self {
        Self {
            id,
            name,
            x,
            y,
            color,
            frozen_until: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Position) {
        self.x = position.x;
        self.y = position.y;
    }

    pub fn is_frozen(&self, now: u64) -> bool {
        now < self.frozen_until
    }
}

/// Tunable world parameters. `Default` yields the standard 1920×1080 arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub world_width: f32,
    pub world_height: f32,
    pub player_margin: f32,
    pub tag_radius: f32,
    pub freeze_duration_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            player_margin: PLAYER_MARGIN,
            tag_radius: TAG_RADIUS,
            freeze_duration_ms: FREEZE_DURATION_MS,
        }
    }
}

impl GameConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::for_world(self.world_width, self.world_height, self.player_margin)
    }
}

/// Substitutes the default display name for a missing or blank one and
/// truncates long names to [`MAX_NAME_CHARS`] characters.
pub fn display_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => {
            let truncated: String = name.chars().take(MAX_NAME_CHARS).collect();
            truncated.trim_end().to_string()
        }
        _ => DEFAULT_PLAYER_NAME.to_string(),
    }
}

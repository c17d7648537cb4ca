//! Save-file projection of the dungeon, player and inventory.
//!
//! The dungeon is stored sparsely: only cells holding a room appear, keyed by
//! their row-major index.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::content::parse_json;
use crate::dungeon::{DoorMask, Dungeon, DungeonError, ObjectState, Room};
use crate::inventory::Inventory;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to read save file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode save data: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to parse save file {path} at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error(transparent)]
    Dungeon(#[from] DungeonError),
    #[error("room index {index} does not fit a {width}x{height} dungeon")]
    RoomOutOfBounds {
        index: usize,
        width: usize,
        height: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    pub health: i32,
    pub max_health: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomData {
    pub visited: bool,
    pub dark: bool,
    pub doors: DoorMask,
    pub state: u32,
    pub tilemap: String,
    #[serde(default)]
    pub objects: BTreeMap<u32, ObjectState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonData {
    pub width: usize,
    pub height: usize,
    pub starting_room: usize,
    pub rooms: BTreeMap<usize, RoomData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    pub save_version: u32,
    pub player: PlayerData,
    pub items: Inventory,
    pub dungeon: DungeonData,
}

impl SaveGame {
    pub fn capture(player: PlayerData, items: &Inventory, dungeon: &Dungeon) -> Self {
        Self {
            save_version: SAVE_VERSION,
            player,
            items: items.clone(),
            dungeon: save_dungeon(dungeon),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), SaveError> {
        let json = serde_json::to_string_pretty(self).map_err(SaveError::Encode)?;
        write_atomic(path, &json).map_err(|source| SaveError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            rooms = self.dungeon.rooms.len(),
            items = self.items.entries().len(),
            "game_saved"
        );
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, SaveError> {
        let raw = fs::read_to_string(path).map_err(|source| SaveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let save: SaveGame = parse_json(&raw).map_err(|(json_path, message)| SaveError::Parse {
            path: path.to_path_buf(),
            json_path,
            message,
        })?;
        if save.save_version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: save.save_version,
                expected: SAVE_VERSION,
            });
        }
        Ok(save)
    }
}

pub fn save_dungeon(dungeon: &Dungeon) -> DungeonData {
    let rooms = dungeon
        .rooms()
        .map(|(index, room)| {
            (
                index,
                RoomData {
                    visited: room.visited,
                    dark: room.dark,
                    doors: room.doors,
                    state: room.state(),
                    tilemap: room.tilemap_key().to_string(),
                    objects: room.objects().clone(),
                },
            )
        })
        .collect();
    DungeonData {
        width: dungeon.width(),
        height: dungeon.height(),
        starting_room: dungeon.starting_room(),
        rooms,
    }
}

/// Stages `contents` in a sibling `.tmp` file, then renames it over `path`.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, contents)?;
    // Windows refuses to rename over an existing file.
    if cfg!(windows) && path.exists() {
        fs::remove_file(path)?;
    }
    if let Err(error) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(error);
    }
    Ok(())
}

/// Rebuilds the dense grid. The current room is reset to the starting room.
pub fn load_dungeon(data: &DungeonData) -> Result<Dungeon, SaveError> {
    let mut dungeon = Dungeon::new(data.width, data.height, data.starting_room)?;
    for (&index, room_data) in &data.rooms {
        if index >= dungeon.len() {
            return Err(SaveError::RoomOutOfBounds {
                index,
                width: data.width,
                height: data.height,
            });
        }
        let mut room = Room::new(room_data.tilemap.clone(), room_data.doors).with_dark(room_data.dark);
        room.visited = room_data.visited;
        room.set_state(room_data.state);
        room.set_objects(room_data.objects.clone());
        let (row, col) = (index / data.width, index % data.width);
        dungeon.insert_room(row, col, room);
    }
    Ok(dungeon)
}

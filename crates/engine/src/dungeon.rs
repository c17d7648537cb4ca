//! Grid of rooms with persistent per-room and per-object state.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::content::AssetProvider;
use crate::geometry::Direction;
use crate::tilemap::Tilemap;

/// One bit per cardinal direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct DoorMask(u8);

impl From<u8> for DoorMask {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<DoorMask> for u8 {
    fn from(mask: DoorMask) -> Self {
        mask.0
    }
}

impl DoorMask {
    pub const NONE: DoorMask = DoorMask(0);
    pub const ALL: DoorMask = DoorMask(0b1111);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    const fn bit(direction: Direction) -> u8 {
        match direction {
            Direction::Up => 0b0001,
            Direction::Down => 0b0010,
            Direction::Left => 0b0100,
            Direction::Right => 0b1000,
        }
    }

    pub fn has(self, direction: Direction) -> bool {
        self.0 & Self::bit(direction) != 0
    }

    pub fn with(self, direction: Direction) -> Self {
        Self(self.0 | Self::bit(direction))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    pub opened: bool,
    pub defeated: bool,
    pub dialogue_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    tilemap_key: String,
    pub doors: DoorMask,
    state: u32,
    pub visited: bool,
    pub dark: bool,
    objects: BTreeMap<u32, ObjectState>,
}

impl Room {
    pub fn new(tilemap_key: impl Into<String>, doors: DoorMask) -> Self {
        Self {
            tilemap_key: tilemap_key.into(),
            doors,
            state: 1,
            visited: false,
            dark: false,
            objects: BTreeMap::new(),
        }
    }

    pub fn with_dark(mut self, dark: bool) -> Self {
        self.dark = dark;
        self
    }

    pub fn tilemap_key(&self) -> &str {
        &self.tilemap_key
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// A zero state is not representable; it becomes 1.
    pub fn set_state(&mut self, state: u32) {
        self.state = if state == 0 { 1 } else { state };
    }

    /// Shifts the state bit left, wrapping back to 1 when it falls off.
    pub fn advance_state(&mut self) -> u32 {
        let next = self.state.checked_shl(1).unwrap_or(0);
        self.set_state(next);
        self.state
    }

    /// Objects with mask 0 always exist; others exist while their mask shares
    /// a bit with the room state.
    pub fn object_exists(&self, state_mask: u32) -> bool {
        state_mask == 0 || state_mask & self.state != 0
    }

    pub fn object_state(&self, object_id: u32) -> ObjectState {
        self.objects.get(&object_id).copied().unwrap_or_default()
    }

    pub fn object_state_mut(&mut self, object_id: u32) -> &mut ObjectState {
        self.objects.entry(object_id).or_default()
    }

    pub fn objects(&self) -> &BTreeMap<u32, ObjectState> {
        &self.objects
    }

    pub(crate) fn set_objects(&mut self, objects: BTreeMap<u32, ObjectState>) {
        self.objects = objects;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DungeonError {
    #[error("dungeon grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },
    #[error("dungeon grid {width}x{height} exceeds {max} cells", max = MAX_ROOMS)]
    GridTooLarge { width: usize, height: usize },
    #[error("room index {index} out of bounds (grid has {len} cells)")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("cell ({row}, {col}) outside {width}x{height} grid")]
    CellOutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },
    #[error("no room at index {index}")]
    EmptyRoom { index: usize },
    #[error("no room {direction:?} of room {index}")]
    NoNeighbor { index: usize, direction: Direction },
}

/// Upper bound on grid cells, so a hand-edited save cannot demand a huge
/// allocation.
pub const MAX_ROOMS: usize = 4096;

/// Row-major grid of optional rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dungeon {
    width: usize,
    height: usize,
    rooms: Vec<Option<Room>>,
    current_room: usize,
    starting_room: usize,
}

impl Dungeon {
    pub fn new(width: usize, height: usize, starting_room: usize) -> Result<Self, DungeonError> {
        let len = width
            .checked_mul(height)
            .filter(|len| *len <= MAX_ROOMS)
            .ok_or(DungeonError::GridTooLarge { width, height })?;
        if len == 0 {
            return Err(DungeonError::EmptyGrid { width, height });
        }
        if starting_room >= len {
            return Err(DungeonError::IndexOutOfBounds {
                index: starting_room,
                len,
            });
        }
        Ok(Self {
            width,
            height,
            rooms: vec![None; len],
            current_room: starting_room,
            starting_room,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.iter().all(Option::is_none)
    }

    pub fn starting_room(&self) -> usize {
        self.starting_room
    }

    pub fn current_room_index(&self) -> usize {
        self.current_room
    }

    pub fn index_of(&self, row: usize, col: usize) -> Result<usize, DungeonError> {
        if row >= self.height || col >= self.width {
            return Err(DungeonError::CellOutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(row * self.width + col)
    }

    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    /// Places `room` at (`row`, `col`) if the cell is empty. Occupied or
    /// out-of-grid cells reject the write with a warning.
    pub fn insert_room(&mut self, row: usize, col: usize, room: Room) -> bool {
        let index = match self.index_of(row, col) {
            Ok(index) => index,
            Err(error) => {
                warn!(row, col, error = %error, "room_insert_rejected");
                return false;
            }
        };
        let cell = &mut self.rooms[index];
        if cell.is_some() {
            warn!(row, col, index, "room_insert_rejected_occupied");
            return false;
        }
        *cell = Some(room);
        true
    }

    pub fn room(&self, index: usize) -> Result<&Room, DungeonError> {
        self.rooms
            .get(index)
            .ok_or(DungeonError::IndexOutOfBounds {
                index,
                len: self.rooms.len(),
            })?
            .as_ref()
            .ok_or(DungeonError::EmptyRoom { index })
    }

    pub fn room_mut(&mut self, index: usize) -> Result<&mut Room, DungeonError> {
        let len = self.rooms.len();
        self.rooms
            .get_mut(index)
            .ok_or(DungeonError::IndexOutOfBounds { index, len })?
            .as_mut()
            .ok_or(DungeonError::EmptyRoom { index })
    }

    pub fn current_room(&self) -> Result<&Room, DungeonError> {
        self.room(self.current_room)
    }

    pub fn current_room_mut(&mut self) -> Result<&mut Room, DungeonError> {
        self.room_mut(self.current_room)
    }

    /// Existing rooms with their indices, in index order.
    pub fn rooms(&self) -> impl Iterator<Item = (usize, &Room)> {
        self.rooms
            .iter()
            .enumerate()
            .filter_map(|(index, room)| room.as_ref().map(|room| (index, room)))
    }

    pub fn set_current_room(&mut self, index: usize) -> Result<(), DungeonError> {
        self.room(index)?;
        self.current_room = index;
        Ok(())
    }

    pub fn advance_room_state(&mut self, index: usize) -> Result<u32, DungeonError> {
        let state = self.room_mut(index)?.advance_state();
        debug!(room = index, state, "room_state_advanced");
        Ok(state)
    }

    /// Tilemap of the current room; marks the room visited. Returns `None`
    /// when there is nothing to render.
    pub fn load_current_tilemap(&mut self, assets: &dyn AssetProvider) -> Option<Rc<Tilemap>> {
        let index = self.current_room;
        let room = match self.room_mut(index) {
            Ok(room) => room,
            Err(error) => {
                warn!(room = index, error = %error, "room_tilemap_unavailable");
                return None;
            }
        };
        room.visited = true;
        assets.tilemap_by_key(room.tilemap_key())
    }

    /// Index of the existing room one step in `direction`, or `None` at the
    /// grid edge or an empty cell.
    pub fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        if index >= self.rooms.len() {
            return None;
        }
        let (row, col) = self.row_col(index);
        let (row, col) = match direction {
            Direction::Up => (row.checked_sub(1)?, col),
            Direction::Down => (row + 1, col),
            Direction::Left => (row, col.checked_sub(1)?),
            Direction::Right => (row, col + 1),
        };
        let target = self.index_of(row, col).ok()?;
        self.rooms[target].as_ref().map(|_| target)
    }

    /// Moves the current room one step. The current room is unchanged on
    /// error.
    pub fn step(&mut self, direction: Direction) -> Result<usize, DungeonError> {
        let index = self.current_room;
        let target = self
            .neighbor(index, direction)
            .ok_or(DungeonError::NoNeighbor { index, direction })?;
        self.current_room = target;
        Ok(target)
    }

    pub fn find_room_by_tilemap(&self, tilemap_key: &str) -> Option<usize> {
        self.rooms()
            .find(|(_, room)| room.tilemap_key() == tilemap_key)
            .map(|(index, _)| index)
    }
}

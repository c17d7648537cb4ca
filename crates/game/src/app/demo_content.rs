//! The built-in demo dungeon: a 3x3 grid around a hub room, the tilemaps its
//! rooms load, and the named cutscenes its triggers start.

use engine::content::AssetRegistry;
use engine::cutscene::{CameraPan, Command, Letterbox, MoveTo, Publish, ShowText, Wait};
use engine::events::keys;
use engine::{
    AssetProvider, Direction, DoorMask, Dungeon, DungeonError, EntityId, EventPayload, MapObject,
    Rect, Room, Settings, Tilemap, TilemapError, Vec2,
};

const DUNGEON_WIDTH: usize = 3;
const DUNGEON_HEIGHT: usize = 3;

const FLOOR_TILE: u16 = 1;
const WALL_TILE: u16 = 2;
/// Door gaps are this many tiles wide, centered on the wall.
const DOOR_GAP_TILES: u32 = 2;
const FIRST_WALL_ID: u32 = 1;
const LETTERBOX_BAR_HEIGHT: i32 = 24;

/// Texture frame counts that differ from the single-frame default.
const ANIMATED_TEXTURES: &[(&str, usize)] = &[
    ("player", 4),
    ("slime", 2),
    ("bat", 2),
    ("archer", 2),
    ("elder", 2),
    ("chest_open", 1),
];

struct RoomLayout {
    row: usize,
    col: usize,
    tilemap: &'static str,
    doors: &'static [Direction],
    dark: bool,
}

const LAYOUT: &[RoomLayout] = &[
    RoomLayout {
        row: 0,
        col: 0,
        tilemap: "secret",
        doors: &[],
        dark: false,
    },
    RoomLayout {
        row: 0,
        col: 1,
        tilemap: "north_hall",
        doors: &[Direction::Down],
        dark: false,
    },
    RoomLayout {
        row: 1,
        col: 0,
        tilemap: "west_shop",
        doors: &[Direction::Right],
        dark: false,
    },
    RoomLayout {
        row: 1,
        col: 1,
        tilemap: "hub",
        doors: &[Direction::Up, Direction::Left, Direction::Right],
        dark: false,
    },
    RoomLayout {
        row: 1,
        col: 2,
        tilemap: "east_grove",
        doors: &[Direction::Left, Direction::Down],
        dark: false,
    },
    RoomLayout {
        row: 2,
        col: 2,
        tilemap: "vault",
        doors: &[Direction::Up],
        dark: true,
    },
];

fn door_mask(doors: &[Direction]) -> DoorMask {
    doors
        .iter()
        .fold(DoorMask::NONE, |mask, &direction| mask.with(direction))
}

pub(crate) fn build_dungeon(settings: &Settings) -> Result<Dungeon, DungeonError> {
    let mut dungeon = Dungeon::new(DUNGEON_WIDTH, DUNGEON_HEIGHT, settings.starting_room)?;
    for layout in LAYOUT {
        let room = Room::new(layout.tilemap, door_mask(layout.doors)).with_dark(layout.dark);
        dungeon.insert_room(layout.row, layout.col, room);
    }
    dungeon.room(settings.starting_room)?;
    Ok(dungeon)
}

/// Registers every demo tilemap and the animated texture frame counts.
pub(crate) fn register_assets(
    registry: &mut AssetRegistry,
    settings: &Settings,
) -> Result<usize, TilemapError> {
    for &(texture, frames) in ANIMATED_TEXTURES {
        registry.insert_texture(texture, frames);
    }
    registry.insert_sound("unlock");
    registry.insert_sound("heal");
    registry.insert_sound("pickup");
    registry.insert_sound("shoot");

    let mut count = 0;
    for layout in LAYOUT {
        let doors = door_mask(layout.doors);
        let tilemap = room_map(layout.tilemap, doors, settings)?;
        let tilemap = room_objects(layout.tilemap)
            .into_iter()
            .fold(tilemap, Tilemap::with_object);
        registry.insert_tilemap(tilemap);
        count += 1;
    }
    Ok(count)
}

/// Floor and border-wall layers plus wall collision objects, leaving a gap in
/// every wall that has a door.
pub(crate) fn room_map(
    key: &str,
    doors: DoorMask,
    settings: &Settings,
) -> Result<Tilemap, TilemapError> {
    let width = settings.room_width_tiles;
    let height = settings.room_height_tiles;
    let tile = settings.tile_size;

    let gap_cols = gap_range(width);
    let gap_rows = gap_range(height);
    let mut walls = vec![0u16; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            let in_gap = (y == 0 && doors.has(Direction::Up) && gap_cols.contains(&x))
                || (y + 1 == height && doors.has(Direction::Down) && gap_cols.contains(&x))
                || (x == 0 && doors.has(Direction::Left) && gap_rows.contains(&y))
                || (x + 1 == width && doors.has(Direction::Right) && gap_rows.contains(&y));
            if on_border && !in_gap {
                walls[(y * width + x) as usize] = WALL_TILE;
            }
        }
    }

    let mut tilemap = Tilemap::new(key, width, height, tile)?
        .with_layer("floor", vec![FLOOR_TILE; (width * height) as usize])?
        .with_layer("walls", walls)?;
    for (offset, rect) in wall_rects(doors, settings).into_iter().enumerate() {
        tilemap = tilemap.with_object(MapObject::wall(FIRST_WALL_ID + offset as u32, rect));
    }
    Ok(tilemap)
}

fn gap_range(tiles: u32) -> std::ops::Range<u32> {
    let start = tiles.saturating_sub(DOOR_GAP_TILES) / 2;
    start..start + DOOR_GAP_TILES
}

fn wall_rects(doors: DoorMask, settings: &Settings) -> Vec<Rect> {
    let tile = settings.tile_size as i32;
    let width = settings.room_width_tiles as i32;
    let height = settings.room_height_tiles as i32;
    let gap_cols = gap_range(settings.room_width_tiles);
    let gap_rows = gap_range(settings.room_height_tiles);
    let (gap_x, gap_w) = (gap_cols.start as i32, DOOR_GAP_TILES as i32);
    let (gap_y, gap_h) = (gap_rows.start as i32, DOOR_GAP_TILES as i32);

    let mut rects = Vec::new();
    for (direction, bottom_or_right) in [
        (Direction::Up, 0),
        (Direction::Down, height - 1),
    ] {
        let y = bottom_or_right * tile;
        if doors.has(direction) {
            rects.push(Rect::new(0, y, gap_x * tile, tile));
            let right_start = gap_x + gap_w;
            rects.push(Rect::new(right_start * tile, y, (width - right_start) * tile, tile));
        } else {
            rects.push(Rect::new(0, y, width * tile, tile));
        }
    }
    for (direction, column) in [(Direction::Left, 0), (Direction::Right, width - 1)] {
        let x = column * tile;
        if doors.has(direction) {
            rects.push(Rect::new(x, tile, tile, (gap_y - 1) * tile));
            let lower_start = gap_y + gap_h;
            rects.push(Rect::new(x, lower_start * tile, tile, (height - 1 - lower_start) * tile));
        } else {
            rects.push(Rect::new(x, tile, tile, (height - 2) * tile));
        }
    }
    rects
}

fn room_objects(tilemap: &str) -> Vec<MapObject> {
    match tilemap {
        "hub" => vec![
            MapObject::sprite(100, "npc", Rect::new(48, 48, 16, 16))
                .with_property("sprite", "elder")
                .with_property("texts", "elder"),
            MapObject::sprite(101, "chest", Rect::new(192, 40, 16, 16))
                .with_property("item", "coin")
                .with_property("amount", 5i64),
            MapObject::sprite(102, "trigger", Rect::new(112, 96, 32, 32))
                .with_property("event", keys::START_CUTSCENE)
                .with_property("value", "intro"),
            MapObject::sprite(103, "item", Rect::new(200, 160, 8, 8))
                .with_property("sprite", "heart"),
        ],
        "north_hall" => vec![
            MapObject::sprite(110, "enemy", Rect::new(64, 64, 16, 16))
                .with_property("sprite", "slime")
                .with_property("roomState", 1i64),
            MapObject::sprite(111, "enemy", Rect::new(176, 64, 16, 16))
                .with_property("sprite", "slime")
                .with_property("roomState", 1i64),
            MapObject::sprite(112, "enemy", Rect::new(120, 48, 16, 16))
                .with_property("sprite", "slime")
                .with_property("roomState", 1i64)
                .with_property("health", 4i64),
            MapObject::sprite(113, "chest", Rect::new(120, 40, 16, 16))
                .with_property("item", "coin")
                .with_property("amount", 10i64)
                .with_property("roomState", 2i64),
        ],
        "west_shop" => vec![
            MapObject::sprite(120, "tradeItem", Rect::new(120, 64, 8, 12))
                .with_property("sprite", "key")
                .with_property("item", "key")
                .with_property("cost", 10i64),
            MapObject::sprite(121, "npc", Rect::new(120, 40, 16, 16))
                .with_property("sprite", "merchant")
                .with_property("texts", "merchant"),
            MapObject::sprite(122, "teleport", Rect::new(32, 32, 16, 16))
                .with_property("targetMap", "secret")
                .with_property("targetPosX", 120.0)
                .with_property("targetPosY", 176.0),
            MapObject::sprite(123, "item", Rect::new(200, 160, 10, 10))
                .with_property("sprite", "gem")
                .with_property("drawLayer", 1i64),
        ],
        "secret" => vec![
            MapObject::sprite(130, "teleport", Rect::new(24, 24, 16, 16))
                .with_property("targetMap", "west_shop")
                .with_property("targetPosX", 72.0)
                .with_property("targetPosY", 72.0),
            MapObject::sprite(131, "chest", Rect::new(120, 48, 16, 16))
                .with_property("item", "coin")
                .with_property("amount", 5i64),
        ],
        "east_grove" => vec![
            MapObject::sprite(140, "enemy", Rect::new(200, 48, 16, 16))
                .with_property("sprite", "archer"),
            MapObject::sprite(141, "enemy", Rect::new(64, 160, 12, 12))
                .with_property("sprite", "bat"),
            MapObject::sprite(142, "hurt", Rect::new(112, 64, 32, 16))
                .with_property("sprite", "spikes")
                .with_property("damage", 1i64),
            MapObject::sprite(143, "door", Rect::new(112, 208, 32, 16))
                .with_property("locked", true)
                .with_property("key", "key"),
        ],
        "vault" => vec![
            MapObject::sprite(150, "chest", Rect::new(120, 64, 16, 16))
                .with_property("item", "gem")
                .with_property("amount", 1i64),
            MapObject::sprite(151, "trigger", Rect::new(112, 160, 32, 16))
                .with_property("event", keys::START_CUTSCENE)
                .with_property("value", "vault"),
        ],
        _ => Vec::new(),
    }
}

/// Commands for the cutscene named `name`, or `None` for an unknown name.
pub(crate) fn cutscene(
    name: &str,
    assets: &dyn AssetProvider,
    player: EntityId,
    player_position: Vec2,
) -> Option<Vec<Box<dyn Command>>> {
    let lines = || assets.texts_by_key(name).to_vec();
    let commands: Vec<Box<dyn Command>> = match name {
        "intro" => vec![
            Box::new(Letterbox::new(LETTERBOX_BAR_HEIGHT)),
            Box::new(CameraPan::new(Vec2::ZERO, 0.25)),
            Box::new(ShowText::new(lines())),
            Box::new(MoveTo::new(player, player_position + Vec2::new(0.0, 24.0), 40.0)),
            Box::new(Wait::new(0.5)),
            Box::new(Publish::new(
                keys::NOTICE,
                EventPayload::Text("Find the gem.".to_string()),
            )),
        ],
        "vault" => vec![
            Box::new(Letterbox::new(LETTERBOX_BAR_HEIGHT)),
            Box::new(Wait::new(0.3)),
            Box::new(ShowText::new(lines())),
        ],
        _ => return None,
    };
    Some(commands)
}

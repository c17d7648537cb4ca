use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use engine::app::{world_to_screen, DrawCommand, Rgba};
use engine::behavior::{
    execute_behaviors, BehaviorContext, BehaviorError, BehaviorKind, Chase, Chest, CollectItem,
    Death, Dialogue, Emitter, Heal, InteractionState, OpenLock, ProjectileSpec, RandomWalk, Shoot,
    Teleport, TradeItem, Trigger, Watch, Weapon,
};
use engine::content::DEFAULT_SPRITE_KEY;
use engine::cutscene::{CommandContext, CommandQueue};
use engine::entity::VisualEffect;
use engine::events::keys;
use engine::physics::{apply_contact_damage, clamp_inside, exited_edge, is_hostile, resolve_static};
use engine::save::{load_dungeon, PlayerData};
use engine::tilemap::MapObjectKind;
use engine::{
    AssetProvider, Camera2D, Direction, Dungeon, Entity, EntityId, EntityWorld, EventBus,
    EventPayload, InputAction, InputSnapshot, Inventory, MapObject, ObjectState, Rect, Renderer,
    Room, SaveError, SaveGame, Scene, SceneContext, Settings, SpriteDefinition, TeleportTarget,
    Tilemap, Vec2, Viewport,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::{
    demo_content, GAMEPLAY_SCENE, INVENTORY_TEXT_KEY, LOAD_REQUESTED_KEY, PAUSE_SCENE,
    SAVE_REQUESTED_KEY,
};

const SWORD_SPRITE_KEY: &str = "sword";
const SWORD_SWEEP_RADIANS: f32 = std::f32::consts::FRAC_PI_2;
const SWORD_REACH: f32 = 14.0;
const ENEMY_IFRAME_SECONDS: f32 = 0.3;
const DEATH_PUFF_SECONDS: f32 = 0.2;
/// Pixels between the room edge and a player entering through it.
const ROOM_ENTRY_INSET: f32 = 2.0;
const DARK_ROOM_SHADE: Rgba = Rgba(0, 0, 0, 160);
const FLASH_BLINKS_PER_SECOND: f32 = 12.0;

include!("types.rs");
include!("spawn.rs");
include!("scene_state.rs");
include!("scene_impl.rs");
include!("util.rs");

pub(crate) fn build_gameplay_scene(
    settings: Settings,
    save_path: PathBuf,
    dungeon: Dungeon,
) -> Box<dyn Scene> {
    Box::new(GameplayScene::new(settings, save_path, dungeon))
}

pub mod app;
pub mod behavior;
pub mod content;
pub mod cutscene;
pub mod dungeon;
pub mod entity;
pub mod events;
pub mod geometry;
pub mod inventory;
pub mod paths;
pub mod physics;
pub mod save;
pub mod tilemap;
pub mod world;

pub use app::{
    run_app, AppError, Camera2D, InputAction, InputSnapshot, LoopConfig, Platform, Renderer,
    Runtime, Scene, SceneContext, SceneManager, Viewport,
};
pub use content::{AssetProvider, AssetRegistry, ContentError, Settings, SpriteDefinition};
pub use dungeon::{DoorMask, Dungeon, DungeonError, ObjectState, Room};
pub use entity::{Entity, EntityId};
pub use events::{EventBus, EventPayload, TeleportTarget};
pub use geometry::{Direction, Rect, Vec2};
pub use inventory::Inventory;
pub use paths::{resolve_app_paths, AppPaths, StartupError, ROOT_ENV_VAR};
pub use save::{SaveError, SaveGame};
pub use tilemap::{MapObject, Tilemap, TilemapError};
pub use world::EntityWorld;

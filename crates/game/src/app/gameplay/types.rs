/// Gameplay consequence of an event, queued by a listener and applied by the
/// scene after the frame's behaviors have run. Per-object effects carry the
/// room they were registered in, so a room change earlier in the same batch
/// cannot redirect them.
#[derive(Debug, Clone, PartialEq)]
enum RoomEffect {
    ObjectOpened {
        room: usize,
        object_id: u32,
    },
    DialogueProgress {
        room: usize,
        object_id: u32,
        conversation: u32,
    },
    EnemyDefeated {
        room: usize,
        object_id: u32,
    },
    Teleport(TeleportTarget),
    WeaponFinished,
    StartCutscene(String),
    RoomCleared {
        room: usize,
    },
}

type EffectQueue = Rc<RefCell<Vec<RoomEffect>>>;

/// What a spawner may read about the room being loaded.
struct SpawnContext<'a> {
    assets: &'a dyn AssetProvider,
    player: EntityId,
    room: &'a Room,
}

/// Builds the entity for one tilemap object. `Ok(None)` skips the object
/// (already opened, defeated, or not present in this room state).
type SpawnFn = fn(&SpawnContext<'_>, &MapObject) -> Result<Option<Entity>, BehaviorError>;

use engine::{
    resolve_app_paths, AppError, AssetRegistry, LoopConfig, Runtime, Settings, Viewport,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::build_gameplay_scene;
use super::headless::{demo_script, HeadlessPlatform};
use super::hud::HudScene;
use super::pause::PauseScene;
use super::{demo_content, GAMEPLAY_SCENE, HUD_SCENE, PAUSE_SCENE};

const GAMEPLAY_PRIORITY: i32 = 0;
const HUD_PRIORITY: i32 = 10;
const PAUSE_PRIORITY: i32 = 20;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) runtime: Runtime,
    pub(crate) platform: HeadlessPlatform,
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Loads settings and content, builds the dungeon and registers the scenes.
/// Gameplay and the HUD start on the first tick.
pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "=== Dungeon Startup ===");

    let settings = Settings::load(&paths.settings_file())?;
    let mut assets = AssetRegistry::new();
    let tilemaps = demo_content::register_assets(&mut assets, &settings)?;
    let sprites = assets.load_sprite_definitions(&paths.sprites_file())?;
    let texts = assets.load_texts(&paths.texts_file())?;
    info!(tilemaps, sprites, texts, "content_loaded");
    if !assets.has_sprite_definition(&settings.player_sprite) {
        warn!(sprite = %settings.player_sprite, "player_sprite_undefined");
    }

    let dungeon = demo_content::build_dungeon(&settings)?;
    let viewport = Viewport {
        width: settings.viewport_width,
        height: settings.viewport_height,
    };

    let mut runtime = Runtime::new(Box::new(assets));
    let scenes = runtime.scenes_mut();
    {
        let settings = settings.clone();
        let save_path = paths.save_file();
        scenes.register(GAMEPLAY_SCENE, GAMEPLAY_PRIORITY, move || {
            build_gameplay_scene(settings.clone(), save_path.clone(), dungeon.clone())
        });
    }
    scenes.register(HUD_SCENE, HUD_PRIORITY, move || Box::new(HudScene::new(viewport)));
    scenes.register(PAUSE_SCENE, PAUSE_PRIORITY, move || {
        Box::new(PauseScene::new(viewport))
    });
    scenes.start(GAMEPLAY_SCENE);
    scenes.start(HUD_SCENE);

    let config = LoopConfig {
        target_tps: settings.target_tps,
        ..LoopConfig::default()
    }
    .with_env_overrides();
    let platform = HeadlessPlatform::new(demo_script(), config.target_tps);

    Ok(AppWiring {
        config,
        runtime,
        platform,
    })
}

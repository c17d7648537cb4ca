use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tilemap::Tilemap;

use super::{read_json_file, ContentError};

pub const MISSING_TEXTURE_KEY: &str = "missing";
pub const DEFAULT_SPRITE_KEY: &str = "default";

/// Animation frames registered under one texture key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureFrames {
    pub key: String,
    pub frame_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundId(pub String);

/// Stats and behavior list for a spawnable sprite, read from
/// `assets/sprites.json`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteDefinition {
    pub texture: String,
    pub width: i32,
    pub height: i32,
    pub hurtbox_width: Option<i32>,
    pub hurtbox_height: Option<i32>,
    pub hurtbox_offset: (i32, i32),
    pub health: i32,
    pub speed: f32,
    pub damage: i32,
    pub knockback: f32,
    pub draw_layer: i32,
    pub behaviors: Vec<String>,
    pub aggro_distance: f32,
    pub deaggro_distance: f32,
    pub min_distance: f32,
    pub shoot_interval_seconds: f32,
    pub shoot_range: f32,
    pub projectile: Option<String>,
    pub turn_rate: f32,
    pub lifetime_seconds: f32,
    /// Sprite key spawned where this sprite is defeated.
    pub drop: Option<String>,
    pub heal_amount: i32,
    pub item: Option<String>,
    pub amount: i32,
}

impl Default for SpriteDefinition {
    fn default() -> Self {
        Self {
            texture: MISSING_TEXTURE_KEY.to_string(),
            width: 16,
            height: 16,
            hurtbox_width: None,
            hurtbox_height: None,
            hurtbox_offset: (0, 0),
            health: 1,
            speed: 60.0,
            damage: 0,
            knockback: 0.0,
            draw_layer: 0,
            behaviors: Vec::new(),
            aggro_distance: 64.0,
            deaggro_distance: 112.0,
            min_distance: 8.0,
            shoot_interval_seconds: 2.0,
            shoot_range: 96.0,
            projectile: None,
            turn_rate: 0.0,
            lifetime_seconds: 3.0,
            drop: None,
            heal_amount: 0,
            item: None,
            amount: 1,
        }
    }
}

impl SpriteDefinition {
    pub fn hurtbox_size(&self) -> (i32, i32) {
        (
            self.hurtbox_width.unwrap_or(self.width),
            self.hurtbox_height.unwrap_or(self.height),
        )
    }

    pub fn has_behavior(&self, name: &str) -> bool {
        self.behaviors.iter().any(|behavior| behavior == name)
    }
}

/// Key-based lookups the runtime makes into loaded content. Misses are
/// logged and answered with a fallback; only tilemaps can be absent.
pub trait AssetProvider {
    fn textures_by_key(&self, key: &str) -> TextureFrames;
    fn tilemap_by_key(&self, key: &str) -> Option<Rc<Tilemap>>;
    fn sound_by_key(&self, key: &str) -> Option<SoundId>;
    fn music_by_key(&self, key: &str) -> Option<SoundId>;
    fn sprite_definition_by_key(&self, key: &str) -> &SpriteDefinition;
    fn texts_by_key(&self, key: &str) -> &[String];
}

#[derive(Debug, Default)]
pub struct AssetRegistry {
    textures: HashMap<String, usize>,
    tilemaps: HashMap<String, Rc<Tilemap>>,
    sounds: HashSet<String>,
    music: HashSet<String>,
    sprites: HashMap<String, SpriteDefinition>,
    texts: HashMap<String, Vec<String>>,
    fallback_sprite: SpriteDefinition,
    warned_missing_keys: RefCell<HashSet<String>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_texture(&mut self, key: &str, frame_count: usize) {
        self.textures.insert(key.to_string(), frame_count.max(1));
    }

    pub fn insert_tilemap(&mut self, tilemap: Tilemap) {
        self.tilemaps
            .insert(tilemap.key().to_string(), Rc::new(tilemap));
    }

    pub fn insert_sound(&mut self, key: &str) {
        self.sounds.insert(key.to_string());
    }

    pub fn insert_music(&mut self, key: &str) {
        self.music.insert(key.to_string());
    }

    pub fn insert_sprite_definition(&mut self, key: &str, definition: SpriteDefinition) {
        if key == DEFAULT_SPRITE_KEY {
            self.fallback_sprite = definition.clone();
        }
        self.sprites.insert(key.to_string(), definition);
    }

    pub fn insert_texts(&mut self, key: &str, lines: Vec<String>) {
        self.texts.insert(key.to_string(), lines);
    }

    /// Loads every sprite definition from a `{ "key": { ... } }` file.
    pub fn load_sprite_definitions(&mut self, path: &Path) -> Result<usize, ContentError> {
        let definitions: BTreeMap<String, SpriteDefinition> = read_json_file(path)?;
        let count = definitions.len();
        for (key, definition) in definitions {
            if !self.textures.contains_key(&definition.texture) {
                self.insert_texture(&definition.texture, 1);
            }
            self.insert_sprite_definition(&key, definition);
        }
        Ok(count)
    }

    /// Loads every text table from a `{ "key": ["line", ...] }` file.
    pub fn load_texts(&mut self, path: &Path) -> Result<usize, ContentError> {
        let tables: BTreeMap<String, Vec<String>> = read_json_file(path)?;
        let count = tables.len();
        self.texts.extend(tables);
        Ok(count)
    }

    pub fn has_sprite_definition(&self, key: &str) -> bool {
        self.sprites.contains_key(key)
    }

    fn warn_missing(&self, kind: &'static str, key: &str) {
        let tag = format!("{kind}:{key}");
        if self.warned_missing_keys.borrow_mut().insert(tag) {
            warn!(kind, key, "asset_missing");
        }
    }
}

impl AssetProvider for AssetRegistry {
    fn textures_by_key(&self, key: &str) -> TextureFrames {
        match self.textures.get(key) {
            Some(&frame_count) => TextureFrames {
                key: key.to_string(),
                frame_count,
            },
            None => {
                self.warn_missing("texture", key);
                TextureFrames {
                    key: MISSING_TEXTURE_KEY.to_string(),
                    frame_count: 1,
                }
            }
        }
    }

    fn tilemap_by_key(&self, key: &str) -> Option<Rc<Tilemap>> {
        let tilemap = self.tilemaps.get(key).cloned();
        if tilemap.is_none() {
            self.warn_missing("tilemap", key);
        }
        tilemap
    }

    fn sound_by_key(&self, key: &str) -> Option<SoundId> {
        if self.sounds.contains(key) {
            Some(SoundId(key.to_string()))
        } else {
            self.warn_missing("sound", key);
            None
        }
    }

    fn music_by_key(&self, key: &str) -> Option<SoundId> {
        if self.music.contains(key) {
            Some(SoundId(key.to_string()))
        } else {
            self.warn_missing("music", key);
            None
        }
    }

    fn sprite_definition_by_key(&self, key: &str) -> &SpriteDefinition {
        match self.sprites.get(key) {
            Some(definition) => definition,
            None => {
                self.warn_missing("sprite", key);
                &self.fallback_sprite
            }
        }
    }

    fn texts_by_key(&self, key: &str) -> &[String] {
        match self.texts.get(key) {
            Some(lines) => lines.as_slice(),
            None => {
                self.warn_missing("texts", key);
                &[]
            }
        }
    }
}

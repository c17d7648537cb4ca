use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{read_json_file, ContentError};

fn default_friction() -> f32 {
    crate::entity::DEFAULT_FRICTION
}

fn default_textbox_cooldown_seconds() -> f32 {
    0.25
}

fn default_interaction_range() -> f32 {
    24.0
}

fn default_rng_seed() -> u64 {
    0x5eed
}

fn default_target_tps() -> u32 {
    60
}

fn default_viewport_width() -> u32 {
    256
}

fn default_viewport_height() -> u32 {
    224
}

/// Game settings read from `assets/settings.json`. The first block of fields
/// is required; a missing one fails startup with the JSON path in the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub tile_size: u32,
    pub room_width_tiles: u32,
    pub room_height_tiles: u32,
    pub iframe_duration_seconds: f32,
    pub player_sprite: String,
    pub starting_room: usize,

    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default = "default_textbox_cooldown_seconds")]
    pub textbox_cooldown_seconds: f32,
    #[serde(default = "default_interaction_range")]
    pub interaction_range: f32,
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
    #[serde(default = "default_target_tps")]
    pub target_tps: u32,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let settings: Settings = read_json_file(path)?;
        settings.validate(path)?;
        Ok(settings)
    }

    fn validate(&self, path: &Path) -> Result<(), ContentError> {
        let invalid = |field: &'static str, message: &str| ContentError::Invalid {
            path: path.to_path_buf(),
            field,
            message: message.to_string(),
        };
        if self.tile_size == 0 {
            return Err(invalid("tile_size", "must be positive"));
        }
        if self.room_width_tiles == 0 || self.room_height_tiles == 0 {
            return Err(invalid("room_width_tiles", "room must have tiles"));
        }
        if self.iframe_duration_seconds.is_nan() || self.iframe_duration_seconds < 0.0 {
            return Err(invalid("iframe_duration_seconds", "must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(invalid("friction", "must be within 0..=1"));
        }
        if self.target_tps == 0 {
            return Err(invalid("target_tps", "must be positive"));
        }
        Ok(())
    }

    pub fn room_pixel_size(&self) -> (i32, i32) {
        (
            (self.room_width_tiles * self.tile_size) as i32,
            (self.room_height_tiles * self.tile_size) as i32,
        )
    }
}

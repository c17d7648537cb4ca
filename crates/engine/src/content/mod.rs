mod assets;
mod settings;

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use assets::{
    AssetProvider, AssetRegistry, SoundId, SpriteDefinition, TextureFrames, DEFAULT_SPRITE_KEY,
    MISSING_TEXTURE_KEY,
};
pub use settings::Settings;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path} at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("invalid value in {path} at {field}: {message}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

/// Parses JSON and reports the failing JSON path on error.
pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, (String, String)> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let message = error.into_inner().to_string();
        (path, message)
    })
}

pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(&raw).map_err(|(json_path, message)| ContentError::Parse {
        path: path.to_path_buf(),
        json_path,
        message,
    })
}

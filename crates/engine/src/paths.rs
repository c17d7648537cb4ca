//! Locating the game root: the directory holding `assets/settings.json`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub const ROOT_ENV_VAR: &str = "RPG_ROOT";

const SETTINGS_MARKER: [&str; 2] = ["assets", "settings.json"];

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("RPG_ROOT points at {path}, which has no assets/settings.json")]
    RootOverrideInvalid { path: PathBuf },
    #[error(
        "no game root above {searched_from}; set RPG_ROOT to the directory containing assets/"
    )]
    RootNotFound { searched_from: PathBuf },
    #[error("cannot locate the running executable: {0}")]
    Executable(#[source] io::Error),
    #[error("cannot create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files the game reads and writes, all derived from one root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            assets_dir: root.join("assets"),
            cache_dir: root.join("cache"),
            root,
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.assets_dir.join("settings.json")
    }

    pub fn sprites_file(&self) -> PathBuf {
        self.assets_dir.join("sprites.json")
    }

    pub fn texts_file(&self) -> PathBuf {
        self.assets_dir.join("texts.json")
    }

    pub fn save_file(&self) -> PathBuf {
        self.cache_dir.join("saves").join("save.json")
    }
}

/// Resolves the root from `RPG_ROOT`, or else from the first ancestor of the
/// working directory or the executable that holds the settings file, and
/// makes sure the cache directory exists.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var_os(ROOT_ENV_VAR) {
        Some(value) => {
            let root = canonical(Path::new(&value));
            if !is_game_root(&root) {
                return Err(StartupError::RootOverrideInvalid { path: root });
            }
            root
        }
        None => search_root()?,
    };
    debug!(root = %root.display(), "game_root_resolved");

    let paths = AppPaths::from_root(root);
    fs::create_dir_all(&paths.cache_dir).map_err(|source| StartupError::CreateDir {
        path: paths.cache_dir.clone(),
        source,
    })?;
    Ok(paths)
}

fn search_root() -> Result<PathBuf, StartupError> {
    let exe = env::current_exe().map_err(StartupError::Executable)?;
    let exe_dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut starts = Vec::with_capacity(2);
    if let Ok(cwd) = env::current_dir() {
        starts.push(cwd);
    }
    starts.push(exe_dir.clone());

    starts
        .iter()
        .find_map(|start| find_root_above(start))
        .ok_or(StartupError::RootNotFound {
            searched_from: exe_dir,
        })
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start.ancestors().find(|dir| is_game_root(dir)).map(canonical)
}

fn is_game_root(dir: &Path) -> bool {
    SETTINGS_MARKER
        .iter()
        .fold(dir.to_path_buf(), |path, part| path.join(part))
        .is_file()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

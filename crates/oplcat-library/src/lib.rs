//! Game catalog for Open PS2 Loader game roots
//!
//! Loads the games installed under a loader root and keeps renames and
//! registrations in sync with what is on disk. Two layouts are supported:
//! directory-based (`CD/` and `DVD/` image folders) and the legacy `ul.cfg`
//! record file. Both implement [`GameStorage`].

mod collection;
mod directory_storage;
mod game;
mod scanner;
mod storage;
mod ul_config_storage;
mod ul_record;

pub use collection::GameCollection;
pub use directory_storage::{
    CD_DIRECTORY, DVD_DIRECTORY, DirectoryGameStorage, MAX_IMAGE_TITLE_LENGTH,
};
pub use game::{Game, MediaType};
pub use oplcat_config::InstallationType as GameInstallationType;
pub use scanner::{ImageFile, ImageName, ImageScanner, ImageSet, ScanConfig, is_ps2_serial};
pub use storage::GameStorage;
pub use ul_config_storage::UlConfigGameStorage;
pub use ul_record::{
    IMAGE_LENGTH, IMAGE_PREFIX, MAX_ID_LENGTH, MEDIA_CD, MEDIA_DVD, NAME_LENGTH, RECORD_SIZE,
    UL_CONFIG_FILENAME, UlRecord,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("No game at index {0}")]
    IndexOutOfRange(usize),

    #[error("Game already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid game: {0}")]
    InvalidGame(String),

    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Malformed record at offset {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: String },

    #[error("No ul.cfg record for game: {0}")]
    RecordNotFound(String),

    #[error("Rename of {id} left {renamed} of {total} part files renamed")]
    PartialRename {
        id: String,
        renamed: usize,
        total: usize,
    },

    #[error("Storage has not been loaded")]
    NotLoaded,

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create an empty backend for a storage layout
pub fn open_storage(kind: GameInstallationType) -> Box<dyn GameStorage> {
    match kind {
        GameInstallationType::Directory => Box::new(DirectoryGameStorage::new()),
        GameInstallationType::UlConfig => Box::new(UlConfigGameStorage::new()),
    }
}

/// Guess the layout of a game root: `ul.cfg` present means the legacy layout
pub fn detect_installation_type(root: &Path) -> GameInstallationType {
    if root.join(UL_CONFIG_FILENAME).is_file() {
        GameInstallationType::UlConfig
    } else {
        GameInstallationType::Directory
    }
}

//! Directory layout: `CD/` and `DVD/` folders of `.iso` images

use crate::scanner::{ImageFile, ImageName, ImageScanner, is_ps2_serial, split_part_suffix};
use crate::storage::validate_title;
use crate::{Game, GameCollection, GameInstallationType, GameStorage, LibraryError, MediaType};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory holding CD images
pub const CD_DIRECTORY: &str = "CD";

/// Subdirectory holding DVD images
pub const DVD_DIRECTORY: &str = "DVD";

/// Longest title accepted in an image file name, in bytes
pub const MAX_IMAGE_TITLE_LENGTH: usize = 64;

const IMAGE_EXTENSION: &str = "iso";
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Games stored as image files under the loader root
///
/// Titles live in the file names, so a rename moves every part file of the game.
/// Registration only records images that are already in place.
pub struct DirectoryGameStorage {
    collection: GameCollection,
    root: Option<PathBuf>,
    files: HashMap<String, Vec<ImageFile>>,
    scanner: ImageScanner,
}

impl Default for DirectoryGameStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryGameStorage {
    pub fn new() -> Self {
        Self::with_scanner(ImageScanner::new())
    }

    /// Use a scanner with custom extensions
    pub fn with_scanner(scanner: ImageScanner) -> Self {
        Self {
            collection: GameCollection::new(),
            root: None,
            files: HashMap::new(),
            scanner,
        }
    }

    /// Folder holding images of the given media type
    pub fn media_directory(root: &Path, media_type: MediaType) -> Option<PathBuf> {
        match media_type {
            MediaType::Cd => Some(root.join(CD_DIRECTORY)),
            MediaType::Dvd => Some(root.join(DVD_DIRECTORY)),
            MediaType::Unknown => None,
        }
    }

    /// Image files backing a game, ordered by part
    pub fn part_files(&self, id: &str) -> Option<&[ImageFile]> {
        self.files.get(id).map(Vec::as_slice)
    }

    fn load_media(&mut self, directory: &Path, media_type: MediaType) -> Result<(), LibraryError> {
        for set in self.scanner.scan(directory)? {
            if self.collection.contains(&set.id) {
                tracing::warn!(
                    "Skipping {} in {}: id already loaded",
                    set.id,
                    directory.display()
                );
                continue;
            }
            let Ok(part_count) = u8::try_from(set.parts.len()) else {
                tracing::warn!("Skipping {}: {} parts", set.id, set.parts.len());
                continue;
            };

            self.collection.insert(Game {
                id: set.id.clone(),
                title: set.title,
                media_type,
                part_count,
            })?;
            self.files.insert(set.id, set.parts);
        }
        Ok(())
    }

    /// Move every part to its name under `title`, undoing finished moves on failure
    fn rename_parts(
        id: &str,
        parts: &[ImageFile],
        title: &str,
    ) -> Result<Vec<ImageFile>, LibraryError> {
        let targets: Vec<ImageFile> = parts
            .iter()
            .map(|part| {
                let name = part.name.with_title(title);
                ImageFile {
                    path: part.path.with_file_name(name.file_name()),
                    name,
                }
            })
            .collect();

        for (part, target) in parts.iter().zip(&targets) {
            if target.path != part.path
                && target.path.exists()
                && !is_same_file(&part.path, &target.path)
            {
                return Err(LibraryError::AlreadyExists(
                    target.path.display().to_string(),
                ));
            }
        }

        for (done, (part, target)) in parts.iter().zip(&targets).enumerate() {
            if part.path == target.path {
                continue;
            }
            tracing::debug!("Renaming {} -> {}", part.path.display(), target.path.display());
            if let Err(err) = fs::rename(&part.path, &target.path) {
                tracing::warn!(
                    "Failed to rename {}: {}, rolling back",
                    part.path.display(),
                    err
                );
                let mut still_renamed = 0;
                for (part, target) in parts[..done].iter().zip(&targets[..done]).rev() {
                    if part.path == target.path {
                        continue;
                    }
                    if let Err(rollback_err) = fs::rename(&target.path, &part.path) {
                        tracing::warn!(
                            "Failed to restore {}: {}",
                            part.path.display(),
                            rollback_err
                        );
                        still_renamed += 1;
                    }
                }
                if still_renamed > 0 {
                    return Err(LibraryError::PartialRename {
                        id: id.to_string(),
                        renamed: still_renamed,
                        total: parts.len(),
                    });
                }
                return Err(err.into());
            }
        }

        Ok(targets)
    }
}

impl GameStorage for DirectoryGameStorage {
    fn installation_type(&self) -> GameInstallationType {
        GameInstallationType::Directory
    }

    fn load(&mut self, directory: &Path) -> Result<(), LibraryError> {
        self.collection.clear();
        self.files.clear();
        self.root = None;

        if !directory.is_dir() {
            return Err(LibraryError::PathNotFound(directory.to_path_buf()));
        }

        let media_directories = [(CD_DIRECTORY, MediaType::Cd), (DVD_DIRECTORY, MediaType::Dvd)];
        for (name, media_type) in media_directories {
            if let Err(err) = self.load_media(&directory.join(name), media_type) {
                self.collection.clear();
                self.files.clear();
                return Err(err);
            }
        }

        self.root = Some(directory.to_path_buf());
        tracing::info!(
            "Loaded {} games from {}",
            self.collection.len(),
            directory.display()
        );
        Ok(())
    }

    fn rename_game(&mut self, id: &str, title: &str) -> Result<(), LibraryError> {
        if self.root.is_none() {
            return Err(LibraryError::NotLoaded);
        }
        let parts = self
            .files
            .get(id)
            .ok_or_else(|| LibraryError::GameNotFound(id.to_string()))?;
        validate_image_title(id, title)?;

        let renamed = Self::rename_parts(id, parts, title)?;
        self.files.insert(id.to_string(), renamed);
        if let Some(game) = self.collection.get_mut(id) {
            game.title = title.to_string();
        }

        tracing::info!("Renamed {} to '{}'", id, title);
        Ok(())
    }

    fn register_game(&mut self, game: Game) -> Result<(), LibraryError> {
        let root = self.root.as_deref().ok_or(LibraryError::NotLoaded)?;
        validate_image_id(&game.id)?;
        validate_image_title(&game.id, &game.title)?;
        if game.part_count == 0 {
            return Err(LibraryError::InvalidGame(format!(
                "{}: part count must be at least 1",
                game.id
            )));
        }
        let directory = Self::media_directory(root, game.media_type).ok_or_else(|| {
            LibraryError::InvalidGame(format!("{}: media type must be CD or DVD", game.id))
        })?;
        if self.collection.contains(&game.id) {
            return Err(LibraryError::AlreadyExists(game.id));
        }

        let parts: Vec<ImageFile> = expected_parts(&game)
            .into_iter()
            .map(|name| ImageFile {
                path: directory.join(name.file_name()),
                name,
            })
            .collect();
        if let Some(missing) = parts.iter().find(|part| !part.path.is_file()) {
            return Err(LibraryError::PathNotFound(missing.path.clone()));
        }

        tracing::info!("Registered {} ({} parts)", game.id, game.part_count);
        self.files.insert(game.id.clone(), parts);
        self.collection.insert(game)?;
        Ok(())
    }

    fn collection(&self) -> &GameCollection {
        &self.collection
    }

    fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

/// File names the images of `game` are expected under
fn expected_parts(game: &Game) -> Vec<ImageName> {
    let name = ImageName {
        id: game.id.clone(),
        title: game.title.clone(),
        part: None,
        extension: IMAGE_EXTENSION.to_string(),
    };
    if !game.is_split() {
        return vec![name];
    }
    (0..game.part_count)
        .map(|part| ImageName {
            part: Some(part),
            ..name.clone()
        })
        .collect()
}

fn validate_image_id(id: &str) -> Result<(), LibraryError> {
    if id.is_empty() {
        return Err(LibraryError::InvalidGame("empty game id".to_string()));
    }
    if id.contains(FORBIDDEN_NAME_CHARS) || id.chars().any(|c| c.is_control() || c.is_whitespace())
    {
        return Err(LibraryError::InvalidGame(format!(
            "{}: id is not a valid file name",
            id
        )));
    }
    if id.contains('.') && !is_ps2_serial(id) {
        return Err(LibraryError::InvalidGame(format!(
            "{}: only disc serials may contain dots",
            id
        )));
    }
    Ok(())
}

/// A title equal to the id is left out of the file name, so it may look like anything
fn validate_image_title(id: &str, title: &str) -> Result<(), LibraryError> {
    validate_title(title, MAX_IMAGE_TITLE_LENGTH)?;
    if title.contains(FORBIDDEN_NAME_CHARS) {
        return Err(LibraryError::InvalidTitle(format!(
            "'{}' contains characters not allowed in file names",
            title
        )));
    }
    if title.starts_with('.') || title.ends_with('.') || title.ends_with(' ') {
        return Err(LibraryError::InvalidTitle(format!(
            "'{}' may not start with a dot or end with a dot or space",
            title
        )));
    }
    if title != id && split_part_suffix(title).1.is_some() {
        return Err(LibraryError::InvalidTitle(format!(
            "'{}' ends like a part index",
            title
        )));
    }
    Ok(())
}

/// Whether both paths name one file, as case-only variants do on FAT and exFAT
#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

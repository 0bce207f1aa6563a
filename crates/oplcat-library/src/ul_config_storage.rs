//! Legacy layout: games listed in `ul.cfg`

use crate::storage::validate_title;
use crate::ul_record::{NAME_OFFSET, encode_name};
use crate::{
    Game, GameCollection, GameInstallationType, GameStorage, LibraryError, NAME_LENGTH,
    RECORD_SIZE, UL_CONFIG_FILENAME, UlRecord,
};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Games described by the records of `root/ul.cfg`
///
/// `load` opens the file for reading and writing (creating it when absent) and keeps
/// the handle until the next `load` or until the storage is dropped.
#[derive(Default)]
pub struct UlConfigGameStorage {
    collection: GameCollection,
    root: Option<PathBuf>,
    file: Option<File>,
}

impl UlConfigGameStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the open `ul.cfg`
    pub fn config_path(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(UL_CONFIG_FILENAME))
    }

    /// Byte offset of the record holding `id`
    pub fn find_record_offset(&mut self, id: &str) -> Result<Option<u64>, LibraryError> {
        Ok(self.find_record(id)?.map(|(offset, _)| offset))
    }

    fn file(&mut self) -> Result<&mut File, LibraryError> {
        self.file.as_mut().ok_or(LibraryError::NotLoaded)
    }

    /// Scan from the start for the first record matching `id`
    fn find_record(&mut self, id: &str) -> Result<Option<(u64, UlRecord)>, LibraryError> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(file);

        let mut offset = 0u64;
        while let Some(bytes) = read_record(&mut reader)? {
            let record = UlRecord::from_bytes(&bytes);
            if record.matches_id(id) {
                tracing::debug!("Found {} at offset {}", id, offset);
                return Ok(Some((offset, record)));
            }
            offset += RECORD_SIZE as u64;
        }
        Ok(None)
    }
}

impl GameStorage for UlConfigGameStorage {
    fn installation_type(&self) -> GameInstallationType {
        GameInstallationType::UlConfig
    }

    fn load(&mut self, directory: &Path) -> Result<(), LibraryError> {
        self.collection.clear();
        self.file = None;
        self.root = None;

        if !directory.is_dir() {
            return Err(LibraryError::PathNotFound(directory.to_path_buf()));
        }

        let path = directory.join(UL_CONFIG_FILENAME);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(err) = read_catalog(&mut BufReader::new(&mut file), &mut self.collection) {
            self.collection.clear();
            return Err(err.into());
        }

        self.file = Some(file);
        self.root = Some(directory.to_path_buf());
        tracing::info!(
            "Loaded {} games from {}",
            self.collection.len(),
            path.display()
        );
        Ok(())
    }

    fn rename_game(&mut self, id: &str, title: &str) -> Result<(), LibraryError> {
        self.file()?;
        if !self.collection.contains(id) {
            return Err(LibraryError::GameNotFound(id.to_string()));
        }
        validate_title(title, NAME_LENGTH)?;

        let (offset, record) = self
            .find_record(id)?
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;
        let name_offset = offset + NAME_OFFSET as u64;

        let file = self.file()?;
        if let Err(err) = write_at(file, name_offset, &encode_name(title)) {
            tracing::warn!("Failed to write title of {}: {}, restoring", id, err);
            if let Err(restore_err) = write_at(file, name_offset, record.name_bytes()) {
                tracing::warn!("Failed to restore title of {}: {}", id, restore_err);
            }
            return Err(err.into());
        }

        if let Some(game) = self.collection.get_mut(id) {
            game.title = title.to_string();
        }
        tracing::info!("Renamed {} to '{}'", id, title);
        Ok(())
    }

    fn register_game(&mut self, game: Game) -> Result<(), LibraryError> {
        self.file()?;
        if self.collection.contains(&game.id) {
            return Err(LibraryError::AlreadyExists(game.id));
        }
        validate_title(&game.title, NAME_LENGTH)?;
        let record = UlRecord::from_game(&game)?;
        if self.find_record(&game.id)?.is_some() {
            return Err(LibraryError::AlreadyExists(game.id));
        }

        let file = self.file()?;
        let len = file.metadata()?.len();
        // Start on a record boundary; a torn trailing record is replaced
        let offset = len - len % RECORD_SIZE as u64;
        let mut tail = Vec::new();
        if offset < len {
            file.seek(SeekFrom::Start(offset))?;
            file.read_to_end(&mut tail)?;
            tracing::warn!(
                "Replacing {} trailing bytes of {}",
                tail.len(),
                UL_CONFIG_FILENAME
            );
        }

        if let Err(err) = write_at(file, offset, &record.to_bytes()) {
            tracing::warn!("Failed to append {}: {}, truncating", game.id, err);
            if let Err(restore_err) = restore_tail(file, len, offset, &tail) {
                tracing::warn!("Failed to restore {}: {}", UL_CONFIG_FILENAME, restore_err);
            }
            return Err(err.into());
        }

        tracing::info!("Registered {} at offset {}", game.id, offset);
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

/// Decode records into `collection`, skipping malformed and duplicate ones
fn read_catalog(reader: &mut impl Read, collection: &mut GameCollection) -> io::Result<()> {
    let mut offset = 0u64;
    while let Some(bytes) = read_record(reader)? {
        match UlRecord::from_bytes(&bytes).to_game(offset) {
            Ok(game) => {
                if let Err(err) = collection.insert(game) {
                    tracing::warn!("Skipping record at offset {}: {}", offset, err);
                }
            }
            Err(err) => tracing::warn!("Skipping record: {}", err),
        }
        offset += RECORD_SIZE as u64;
    }
    Ok(())
}

/// Read one full record; `None` once fewer than `RECORD_SIZE` bytes remain
fn read_record(reader: &mut impl Read) -> io::Result<Option<[u8; RECORD_SIZE]>> {
    let mut bytes = [0u8; RECORD_SIZE];
    let mut filled = 0;
    while filled < RECORD_SIZE {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) => return Ok(None),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(Some(bytes))
}

fn write_at(file: &mut File, offset: u64, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    file.sync_data()
}

/// Put back the length and torn trailing bytes seen before an append
fn restore_tail(file: &mut File, len: u64, offset: u64, tail: &[u8]) -> io::Result<()> {
    file.set_len(len)?;
    write_at(file, offset, tail)
}

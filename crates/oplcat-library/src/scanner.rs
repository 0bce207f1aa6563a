//! Disc image scanning for the directory layout
//!
//! Image files are named `<ID>.<Title>.iso`, or `<ID>.<Title>.<NN>.iso` for the
//! parts of a split image. A name without a title segment uses the id as title.

use crate::LibraryError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Image scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Image file extensions, lowercase
    pub extensions: HashSet<String>,

    /// Skip hidden files
    pub skip_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let mut extensions = HashSet::new();
        extensions.insert("iso".to_string());

        Self {
            extensions,
            skip_hidden: true,
        }
    }
}

/// Components of an image file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    pub id: String,
    pub title: String,
    /// Zero-based part index of a split image
    pub part: Option<u8>,
    /// Extension as found on disk
    pub extension: String,
}

impl ImageName {
    /// Render the file name; the title segment is left out when it equals the id
    pub fn file_name(&self) -> String {
        let mut name = self.id.clone();
        if self.title != self.id {
            name.push('.');
            name.push_str(&self.title);
        }
        if let Some(part) = self.part {
            name.push_str(&format!(".{:02}", part));
        }
        name.push('.');
        name.push_str(&self.extension);
        name
    }

    /// Same image under a different title
    pub fn with_title(&self, title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..self.clone()
        }
    }
}

/// One image file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub name: ImageName,
}

/// All part files found for one game id
#[derive(Debug, Clone)]
pub struct ImageSet {
    pub id: String,
    pub title: String,
    /// Ordered by part index
    pub parts: Vec<ImageFile>,
}

/// Image scanner
pub struct ImageScanner {
    config: ScanConfig,
}

impl Default for ImageScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageScanner {
    /// Create a new scanner with default config
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan one media directory, grouping part files by game id
    ///
    /// A missing directory yields no games. Sets come out sorted by id.
    pub fn scan(&self, path: &Path) -> Result<Vec<ImageSet>, LibraryError> {
        if !path.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if self.config.skip_hidden && name.starts_with('.') {
                continue;
            }
            if !entry_path.is_file() {
                continue;
            }
            match self.parse_file_name(&name) {
                Some(image) => files.push(ImageFile {
                    path: entry_path,
                    name: image,
                }),
                None => tracing::debug!("Ignoring {}", entry_path.display()),
            }
        }

        files.sort_by(|a, b| {
            (&a.name.id, a.name.part, &a.path).cmp(&(&b.name.id, b.name.part, &b.path))
        });

        let mut sets: Vec<ImageSet> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in files {
            let Some(position) = index.get(&file.name.id).copied() else {
                index.insert(file.name.id.clone(), sets.len());
                sets.push(ImageSet {
                    id: file.name.id.clone(),
                    title: file.name.title.clone(),
                    parts: vec![file],
                });
                continue;
            };

            let set = &mut sets[position];
            if set.parts.iter().any(|p| p.name.part == file.name.part) {
                tracing::warn!(
                    "Skipping {}: part already provided for {}",
                    file.path.display(),
                    set.id
                );
                continue;
            }
            if file.name.title != set.title {
                tracing::warn!(
                    "Part {} of {} is titled '{}', expected '{}'",
                    file.path.display(),
                    set.id,
                    file.name.title,
                    set.title
                );
            }
            set.parts.push(file);
        }

        Ok(sets)
    }

    /// Split an image file name into id, title and part index
    pub fn parse_file_name(&self, file_name: &str) -> Option<ImageName> {
        let (stem, extension) = file_name.rsplit_once('.')?;
        if !self.config.extensions.contains(&extension.to_lowercase()) {
            return None;
        }

        let (id, rest) = match stem.get(..SERIAL_LENGTH) {
            Some(serial)
                if is_ps2_serial(serial)
                    && (stem.len() == SERIAL_LENGTH
                        || stem.as_bytes()[SERIAL_LENGTH] == b'.') =>
            {
                (serial, stem[SERIAL_LENGTH..].trim_start_matches('.'))
            }
            _ => stem.split_once('.').unwrap_or((stem, "")),
        };
        if id.is_empty() {
            return None;
        }

        let (title, part) = split_part_suffix(rest);
        let title = if title.is_empty() { id } else { title };
        Some(ImageName {
            id: id.to_string(),
            title: title.to_string(),
            part,
            extension: extension.to_string(),
        })
    }
}

const SERIAL_LENGTH: usize = 11;

/// Whether `s` is a PS2 disc serial such as `SLUS_200.02`
pub fn is_ps2_serial(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == SERIAL_LENGTH
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'_'
        && bytes[5..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'.'
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

pub(crate) fn split_part_suffix(rest: &str) -> (&str, Option<u8>) {
    if let Some(part) = parse_part_index(rest) {
        return ("", Some(part));
    }
    match rest.rsplit_once('.') {
        Some((title, suffix)) if !title.is_empty() => match parse_part_index(suffix) {
            Some(part) => (title, Some(part)),
            None => (rest, None),
        },
        _ => (rest, None),
    }
}

fn parse_part_index(s: &str) -> Option<u8> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

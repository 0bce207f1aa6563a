//! `ul.cfg` record codec
//!
//! Each game occupies one 64-byte record; records are packed back to back with
//! no header. Layout:
//!
//! | offset | size | field                                        |
//! |-------:|-----:|----------------------------------------------|
//! | 0      | 32   | title, UTF-8, zero-filled                    |
//! | 32     | 15   | `ul.` + game id (Latin-1), zero-filled       |
//! | 47     | 1    | part count                                   |
//! | 48     | 1    | media type (`0x12` CD, `0x14` DVD)           |
//! | 49     | 15   | padding, byte 4 is `0x08` as USBA writes it  |

use crate::{Game, LibraryError, MediaType};

/// File name of the legacy configuration inside the game root
pub const UL_CONFIG_FILENAME: &str = "ul.cfg";

/// Size of one record
pub const RECORD_SIZE: usize = 64;

/// Capacity of the title field
pub const NAME_LENGTH: usize = 32;

/// Capacity of the image field, prefix included
pub const IMAGE_LENGTH: usize = 15;

/// Tag written in front of the game id in the image field
pub const IMAGE_PREFIX: &[u8; 3] = b"ul.";

/// Longest id that fits the image field
pub const MAX_ID_LENGTH: usize = IMAGE_LENGTH - IMAGE_PREFIX.len();

pub const MEDIA_CD: u8 = 0x12;
pub const MEDIA_DVD: u8 = 0x14;

pub(crate) const NAME_OFFSET: usize = 0;
const IMAGE_OFFSET: usize = NAME_OFFSET + NAME_LENGTH;
const PARTS_OFFSET: usize = IMAGE_OFFSET + IMAGE_LENGTH;
const MEDIA_OFFSET: usize = PARTS_OFFSET + 1;
const PAD_OFFSET: usize = MEDIA_OFFSET + 1;
const PAD_LENGTH: usize = RECORD_SIZE - PAD_OFFSET;
const COMPAT_PAD_INDEX: usize = 4;
const COMPAT_PAD_VALUE: u8 = 0x08;

/// One decoded `ul.cfg` record
///
/// Fields are kept as raw bytes so a record read from disk re-encodes to the exact
/// bytes it came from, including padding written by other tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlRecord {
    name: [u8; NAME_LENGTH],
    image: [u8; IMAGE_LENGTH],
    parts: u8,
    media: u8,
    pad: [u8; PAD_LENGTH],
}

impl UlRecord {
    /// Build a fresh record for a game
    ///
    /// The title is cut to the field capacity on a character boundary. The id must be
    /// non-empty Latin-1 of at most `MAX_ID_LENGTH` bytes and the media must be CD or DVD.
    pub fn from_game(game: &Game) -> Result<Self, LibraryError> {
        let id = encode_id(&game.id)?;
        let media = match game.media_type {
            MediaType::Cd => MEDIA_CD,
            MediaType::Dvd => MEDIA_DVD,
            MediaType::Unknown => {
                return Err(LibraryError::InvalidGame(format!(
                    "{}: media type must be CD or DVD",
                    game.id
                )));
            }
        };
        if game.part_count == 0 {
            return Err(LibraryError::InvalidGame(format!(
                "{}: part count must be at least 1",
                game.id
            )));
        }

        let mut image = [0u8; IMAGE_LENGTH];
        image[..IMAGE_PREFIX.len()].copy_from_slice(IMAGE_PREFIX);
        image[IMAGE_PREFIX.len()..IMAGE_PREFIX.len() + id.len()].copy_from_slice(&id);

        let mut pad = [0u8; PAD_LENGTH];
        pad[COMPAT_PAD_INDEX] = COMPAT_PAD_VALUE;

        Ok(Self {
            name: encode_name(&game.title),
            image,
            parts: game.part_count,
            media,
            pad,
        })
    }

    /// Decode raw record bytes
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut name = [0u8; NAME_LENGTH];
        name.copy_from_slice(&bytes[NAME_OFFSET..IMAGE_OFFSET]);
        let mut image = [0u8; IMAGE_LENGTH];
        image.copy_from_slice(&bytes[IMAGE_OFFSET..PARTS_OFFSET]);
        let mut pad = [0u8; PAD_LENGTH];
        pad.copy_from_slice(&bytes[PAD_OFFSET..]);

        Self {
            name,
            image,
            parts: bytes[PARTS_OFFSET],
            media: bytes[MEDIA_OFFSET],
            pad,
        }
    }

    /// Encode to raw record bytes
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[NAME_OFFSET..IMAGE_OFFSET].copy_from_slice(&self.name);
        bytes[IMAGE_OFFSET..PARTS_OFFSET].copy_from_slice(&self.image);
        bytes[PARTS_OFFSET] = self.parts;
        bytes[MEDIA_OFFSET] = self.media;
        bytes[PAD_OFFSET..].copy_from_slice(&self.pad);
        bytes
    }

    /// Game id stored after the `ul.` prefix, if the prefix is present
    pub fn game_id(&self) -> Option<String> {
        let id = self.image.strip_prefix(IMAGE_PREFIX.as_slice())?;
        let id = until_nul(id);
        Some(id.iter().map(|&b| char::from(b)).collect())
    }

    /// Title, honouring a terminator only when the field's last byte is NUL
    pub fn title(&self) -> String {
        let bytes = if self.name[NAME_LENGTH - 1] == 0 {
            until_nul(&self.name)
        } else {
            &self.name[..]
        };
        String::from_utf8_lossy(bytes).into_owned()
    }

    pub fn media_type(&self) -> MediaType {
        match self.media {
            MEDIA_CD => MediaType::Cd,
            MEDIA_DVD => MediaType::Dvd,
            _ => MediaType::Unknown,
        }
    }

    pub fn part_count(&self) -> u8 {
        self.parts
    }

    /// Raw title field
    pub fn name_bytes(&self) -> &[u8; NAME_LENGTH] {
        &self.name
    }

    /// Whether this record stores the game `id`
    ///
    /// Compares `ul.` + id against the image field and requires the stored id to end
    /// right there, so `SLUS` does not match a record for `SLUS-00001`.
    pub fn matches_id(&self, id: &str) -> bool {
        let Ok(id) = encode_id(id) else {
            return false;
        };
        let target_len = IMAGE_PREFIX.len() + id.len();
        self.image.starts_with(IMAGE_PREFIX)
            && self.image[IMAGE_PREFIX.len()..target_len] == id[..]
            && self.image.get(target_len).is_none_or(|&b| b == 0)
    }

    /// Convert to a catalog entry
    ///
    /// Fails for records without the `ul.` prefix or with an empty id.
    pub fn to_game(&self, offset: u64) -> Result<Game, LibraryError> {
        let id = self.game_id().ok_or_else(|| LibraryError::MalformedRecord {
            offset,
            reason: "image field lacks the ul. prefix".to_string(),
        })?;
        if id.is_empty() {
            return Err(LibraryError::MalformedRecord {
                offset,
                reason: "empty game id".to_string(),
            });
        }

        Ok(Game {
            id,
            title: self.title(),
            media_type: self.media_type(),
            part_count: self.parts,
        })
    }
}

/// Zero-filled title field for `title`, truncated on a character boundary
pub fn encode_name(title: &str) -> [u8; NAME_LENGTH] {
    let mut name = [0u8; NAME_LENGTH];
    let mut end = title.len().min(NAME_LENGTH);
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].copy_from_slice(&title.as_bytes()[..end]);
    name
}

/// Latin-1 bytes of a game id that fits the image field
fn encode_id(id: &str) -> Result<Vec<u8>, LibraryError> {
    if id.is_empty() {
        return Err(LibraryError::InvalidGame("empty game id".to_string()));
    }
    let bytes = id
        .chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(0) | Err(_) => None,
            Ok(b) => Some(b),
        })
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| LibraryError::InvalidGame(format!("{}: id must be Latin-1", id)))?;
    if bytes.len() > MAX_ID_LENGTH {
        return Err(LibraryError::InvalidGame(format!(
            "{}: id longer than {} bytes",
            id, MAX_ID_LENGTH
        )));
    }
    Ok(bytes)
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_game() -> Game {
        Game::new("SLUS-00001", MediaType::Dvd)
            .with_title("Example Game")
            .with_parts(2)
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(NAME_LENGTH + IMAGE_LENGTH + 2 + PAD_LENGTH, RECORD_SIZE);
        assert_eq!(MAX_ID_LENGTH, 12);
        assert_eq!(PAD_OFFSET + COMPAT_PAD_INDEX, 53);
    }

    #[test]
    fn test_encode_byte_layout() {
        let bytes = UlRecord::from_game(&example_game()).unwrap().to_bytes();

        assert_eq!(&bytes[..12], b"Example Game");
        assert!(bytes[12..32].iter().all(|&b| b == 0));
        assert_eq!(&bytes[32..45], b"ul.SLUS-00001");
        assert_eq!(&bytes[45..47], &[0, 0]);
        assert_eq!(bytes[47], 2);
        assert_eq!(bytes[48], MEDIA_DVD);
        assert_eq!(bytes[53], 0x08);
        let other_pad: Vec<u8> = bytes[49..]
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != COMPAT_PAD_INDEX)
            .map(|(_, &b)| b)
            .collect();
        assert!(other_pad.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_round_trip() {
        let game = Game::new("SCES_500.00", MediaType::Cd).with_title("Ridge Racer V");
        let record = UlRecord::from_game(&game).unwrap();
        let decoded = UlRecord::from_bytes(&record.to_bytes()).to_game(0).unwrap();
        assert_eq!(decoded, game);
    }

    #[test]
    fn test_full_width_title_without_terminator() {
        let title = "A".repeat(NAME_LENGTH);
        let game = Game::new("SLES_123.45", MediaType::Dvd).with_title(title.clone());
        let record = UlRecord::from_game(&game).unwrap();
        assert_eq!(record.name_bytes()[NAME_LENGTH - 1], b'A');
        assert_eq!(record.title(), title);
    }

    #[test]
    fn test_long_title_truncated_on_char_boundary() {
        // 31 ASCII bytes followed by a two-byte character that does not fit
        let title = format!("{}é", "x".repeat(31));
        let game = Game::new("SLES_123.45", MediaType::Dvd).with_title(title);
        let record = UlRecord::from_game(&game).unwrap();
        assert_eq!(record.title(), "x".repeat(31));
    }

    #[test]
    fn test_utf8_title_preserved() {
        let game = Game::new("SLPM_650.51", MediaType::Dvd).with_title("ファイナル");
        let record = UlRecord::from_game(&game).unwrap();
        assert_eq!(record.title(), "ファイナル");
    }

    #[test]
    fn test_latin1_id() {
        let game = Game::new("GAMÉ-1", MediaType::Cd);
        let record = UlRecord::from_game(&game).unwrap();
        assert_eq!(record.to_bytes()[IMAGE_OFFSET + 6], 0xC9);
        assert_eq!(record.game_id().as_deref(), Some("GAMÉ-1"));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        for id in ["", "SLUS_200.02.X", "ゲーム"] {
            let err = UlRecord::from_game(&Game::new(id, MediaType::Dvd)).unwrap_err();
            assert!(matches!(err, LibraryError::InvalidGame(_)), "id {:?}", id);
        }
    }

    #[test]
    fn test_full_width_id_has_no_terminator() {
        let game = Game::new("ABCD_123.456", MediaType::Dvd);
        let record = UlRecord::from_game(&game).unwrap();
        assert_eq!(record.game_id().as_deref(), Some("ABCD_123.456"));
        assert!(record.matches_id("ABCD_123.456"));
    }

    #[test]
    fn test_unknown_media_and_zero_parts_rejected() {
        let unknown = Game::new("SLUS_200.02", MediaType::Unknown);
        assert!(UlRecord::from_game(&unknown).is_err());

        let no_parts = Game::new("SLUS_200.02", MediaType::Dvd).with_parts(0);
        assert!(UlRecord::from_game(&no_parts).is_err());
    }

    #[test]
    fn test_media_decoding() {
        let mut bytes = UlRecord::from_game(&example_game()).unwrap().to_bytes();
        for (value, expected) in [
            (MEDIA_CD, MediaType::Cd),
            (MEDIA_DVD, MediaType::Dvd),
            (0x00, MediaType::Unknown),
            (0x13, MediaType::Unknown),
            (0xFF, MediaType::Unknown),
        ] {
            bytes[MEDIA_OFFSET] = value;
            assert_eq!(UlRecord::from_bytes(&bytes).media_type(), expected);
        }
    }

    #[test]
    fn test_matches_id_is_exact() {
        let record = UlRecord::from_game(&example_game()).unwrap();
        assert!(record.matches_id("SLUS-00001"));
        assert!(!record.matches_id("SLUS"));
        assert!(!record.matches_id("SLUS-000012"));
        assert!(!record.matches_id("SLES-00001"));
    }

    #[test]
    fn test_malformed_records() {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[IMAGE_OFFSET..IMAGE_OFFSET + 5].copy_from_slice(b"xx.AB");
        let err = UlRecord::from_bytes(&bytes).to_game(128).unwrap_err();
        assert!(matches!(err, LibraryError::MalformedRecord { offset: 128, .. }));

        let mut bytes = [0u8; RECORD_SIZE];
        bytes[IMAGE_OFFSET..IMAGE_OFFSET + 3].copy_from_slice(IMAGE_PREFIX);
        assert!(UlRecord::from_bytes(&bytes).to_game(0).is_err());
    }

    #[test]
    fn test_foreign_padding_survives_re_encoding() {
        let mut bytes = UlRecord::from_game(&example_game()).unwrap().to_bytes();
        bytes[60] = 0xAA;
        assert_eq!(UlRecord::from_bytes(&bytes).to_bytes(), bytes);
    }
}

//! SNES SPC700 sound dumps with ID666 tags.
//!
//! ID666 comes in a text and a binary layout that share the first few
//! fields; which one a file uses has to be guessed from the bytes.

use crate::file::SharedFile;
use crate::romdata::fields::{DateTimeFlags, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{bcd, bytes_at, latin1, le_u32, u8_at};
use crate::{Error, Result};

use super::{format_duration_ms, read_exact_at};

const HEADER_SIZE: usize = 0x100;
const MAGIC: &[u8] = b"SNES-SPC700 Sound File Data v0.30";

const OFF_HAS_ID666: usize = 0x23;
const HAS_ID666: u8 = 26;

const OFF_SONG_TITLE: usize = 0x2E;
const OFF_GAME_TITLE: usize = 0x4E;
const OFF_DUMPER: usize = 0x6E;
const OFF_COMMENTS: usize = 0x7E;
const OFF_DUMP_DATE: usize = 0x9E;
const OFF_LENGTH_FIELDS: usize = 0xA9;

// Text layout.
const OFF_TEXT_FADE: usize = 0xAC;
const OFF_TEXT_ARTIST: usize = 0xB1;
const OFF_TEXT_EMULATOR: usize = 0xD2;

// Binary layout.
const OFF_BIN_FADE: usize = 0xAC;
const OFF_BIN_ARTIST: usize = 0xB0;
const OFF_BIN_EMULATOR: usize = 0xD1;

/// Parsed ID666 tags.
#[derive(Debug, Default)]
struct Id666 {
    song: String,
    game: String,
    dumper: String,
    comments: String,
    artist: String,
    dump_date: Option<i64>,
    /// Play length plus fade, in milliseconds.
    duration_ms: Option<u64>,
    emulator: u8,
}

/// SPC parser.
pub struct Spc {
    base: RomDataBase,
    header: Vec<u8>,
}

impl Spc {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_exact_at(file, 0, HEADER_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data;
        self.base.set_valid(FileType::AudioFile);
        Ok(())
    }

    fn has_id666(&self) -> bool {
        u8_at(&self.header, OFF_HAS_ID666) == HAS_ID666
    }

    /// Guess the ID666 layout. Text length fields hold only digits or NUL;
    /// a binary artist field starts right where text has a digit.
    fn is_binary(&self) -> bool {
        let h = &self.header;
        let length_fields = bytes_at(h, OFF_LENGTH_FIELDS, 8);
        if length_fields.iter().any(|&c| (c > 0 && c < 0x20) || c > 0x7E) {
            return true;
        }
        u8_at(h, OFF_BIN_ARTIST) >= b'A'
    }

    fn parse_tags(&self) -> Option<Id666> {
        if !self.has_id666() {
            return None;
        }
        let h = &self.header;
        let mut tags = Id666 {
            song: latin1(bytes_at(h, OFF_SONG_TITLE, 32)),
            game: latin1(bytes_at(h, OFF_GAME_TITLE, 32)),
            dumper: latin1(bytes_at(h, OFF_DUMPER, 16)),
            comments: latin1(bytes_at(h, OFF_COMMENTS, 32)),
            ..Default::default()
        };

        if self.is_binary() {
            let d = bytes_at(h, OFF_DUMP_DATE, 4);
            tags.dump_date = bcd_date(d);
            tags.artist = latin1(bytes_at(h, OFF_BIN_ARTIST, 32));
            let secs = le_u32(h, OFF_LENGTH_FIELDS) & 0x00FF_FFFF;
            let fade = le_u32(h, OFF_BIN_FADE);
            tags.duration_ms = (secs > 0).then(|| u64::from(secs) * 1000 + u64::from(fade));
            tags.emulator = u8_at(h, OFF_BIN_EMULATOR);
        } else {
            tags.dump_date = text_date(&latin1(bytes_at(h, OFF_DUMP_DATE, 11)));
            tags.artist = latin1(bytes_at(h, OFF_TEXT_ARTIST, 32));
            let secs: Option<u64> = latin1(bytes_at(h, OFF_LENGTH_FIELDS, 3)).parse().ok();
            let fade: u64 = latin1(bytes_at(h, OFF_TEXT_FADE, 5)).parse().unwrap_or(0);
            tags.duration_ms = secs.filter(|&s| s > 0).map(|s| s * 1000 + fade);
            let emu = u8_at(h, OFF_TEXT_EMULATOR);
            tags.emulator = if emu.is_ascii_digit() { emu - b'0' } else { emu };
        }
        Some(tags)
    }
}

/// `MM/DD/YYYY` or `MM-DD-YYYY`.
fn text_date(s: &str) -> Option<i64> {
    ["%m/%d/%Y", "%m-%d-%Y"]
        .iter()
        .find_map(|fmt| chrono::NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Packed BCD `YYYYMMDD`.
fn bcd_date(b: &[u8]) -> Option<i64> {
    if b.len() < 4 {
        return None;
    }
    let year = u32::from(bcd(b[0])?) * 100 + u32::from(bcd(b[1])?);
    let date = chrono::NaiveDate::from_ymd_opt(year as i32, u32::from(bcd(b[2])?), u32::from(bcd(b[3])?))?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

impl RomDataClass for Spc {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "SPC",
        extensions: &[".spc"],
        mime_types: &["audio/x-spc"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_SIZE || !info.has_magic(0, MAGIC) {
            return None;
        }
        Some(0)
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Spc {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Nintendo SPC700",
            SystemNameType::Short | SystemNameType::Abbreviation => "SPC700",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let Some(tags) = self.parse_tags() else {
            fields.add_field_string("ID666", "No tags", StringFlags::NONE);
            return Ok(());
        };
        fields.reserve(8);

        for (name, value) in [
            ("Song Name", &tags.song),
            ("Game Name", &tags.game),
            ("Artist", &tags.artist),
            ("Dumper", &tags.dumper),
        ] {
            if !value.is_empty() {
                fields.add_field_string(name, value, StringFlags::NONE);
            }
        }
        if tags.dump_date.is_some() {
            fields.add_field_date_time("Dump Date", tags.dump_date, DateTimeFlags::HAS_DATE | DateTimeFlags::IS_UTC);
        }
        if !tags.comments.is_empty() {
            fields.add_field_string("Comments", &tags.comments, StringFlags::NONE);
        }
        if let Some(ms) = tags.duration_ms {
            fields.add_field_string("Duration", &format_duration_ms(ms), StringFlags::NONE);
        }

        let emu = match tags.emulator {
            0 => "Unknown".to_string(),
            1 => "ZSNES".to_string(),
            2 => "Snes9x".to_string(),
            n => format!("Unknown (0x{n:02X})"),
        };
        fields.add_field_string("Emulator Used", &emu, StringFlags::NONE);
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        let Some(tags) = self.parse_tags() else {
            return Ok(());
        };
        metadata.add_string(Property::Title, &tags.song);
        metadata.add_string(Property::Album, &tags.game);
        metadata.add_string(Property::Artist, &tags.artist);
        metadata.add_string(Property::Comment, &tags.comments);
        if let Some(ms) = tags.duration_ms {
            metadata.add_integer(Property::Duration, ms as i64);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::romdata::metadata::PropertyValue;

    pub(crate) fn make_spc_text() -> Vec<u8> {
        let mut data = vec![0u8; 0x10200];
        data[..MAGIC.len()].copy_from_slice(MAGIC);
        data[0x21] = 26;
        data[0x22] = 26;
        data[OFF_HAS_ID666] = HAS_ID666;
        data[OFF_SONG_TITLE..OFF_SONG_TITLE + 9].copy_from_slice(b"Overworld");
        data[OFF_GAME_TITLE..OFF_GAME_TITLE + 5].copy_from_slice(b"Zelda");
        data[OFF_DUMP_DATE..OFF_DUMP_DATE + 10].copy_from_slice(b"03/15/1998");
        data[OFF_LENGTH_FIELDS..OFF_LENGTH_FIELDS + 3].copy_from_slice(b"150");
        data[OFF_TEXT_FADE..OFF_TEXT_FADE + 4].copy_from_slice(b"5000");
        data[OFF_TEXT_ARTIST..OFF_TEXT_ARTIST + 10].copy_from_slice(b"Koji Kondo");
        data[OFF_TEXT_EMULATOR] = b'1';
        data
    }

    #[test]
    fn test_text_id666() {
        let spc = Spc::new(MemFile::new(make_spc_text()).into_shared());
        assert!(spc.is_valid());
        let fields = spc.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Song Name"), Some("Overworld"));
        assert_eq!(get("Artist"), Some("Koji Kondo"));
        assert_eq!(get("Duration"), Some("2:35"));
        assert_eq!(get("Emulator Used"), Some("ZSNES"));
        assert!(fields.iter().any(|f| f.name == "Dump Date"));

        let md = spc.metadata();
        assert_eq!(md.get(Property::Duration), Some(&PropertyValue::Integer(155_000)));
        assert_eq!(md.get(Property::Album).and_then(|v| v.as_str()), Some("Zelda"));
    }

    #[test]
    fn test_dates() {
        assert_eq!(text_date("03/15/1998"), Some(889_920_000));
        assert_eq!(text_date("03-15-1998"), Some(889_920_000));
        assert_eq!(text_date("garbage"), None);
        assert_eq!(bcd_date(&[0x19, 0x98, 0x03, 0x15]), Some(889_920_000));
        assert_eq!(bcd_date(&[0x19, 0x98, 0x13, 0x15]), None);
    }

    #[test]
    fn test_no_id666() {
        let mut data = make_spc_text();
        data[OFF_HAS_ID666] = 27;
        let spc = Spc::new(MemFile::new(data).into_shared());
        assert!(spc.is_valid());
        assert!(spc.metadata().is_empty());
        assert_eq!(spc.fields().count(), 1);
    }

    #[test]
    fn test_magic_without_full_header() {
        let data = make_spc_text();
        let accepts = |len: usize| {
            let info = DetectionHeader { address: 0, data: &data[..len], ext: None, file_size: len as u64 };
            Spc::is_rom_supported(&info)
        };
        assert_eq!(accepts(HEADER_SIZE - 1), None);
        assert_eq!(accepts(HEADER_SIZE), Some(0));
    }
}

//! Portable Sound Format and its per-system variants (PSF1, PSF2, SSF,
//! DSF, USF, GSF, SNSF, QSF).
//!
//! The `[TAG]` block follows the reserved area and the compressed
//! program. It is a list of `name=value` lines; a name that repeats
//! continues the previous value on a new line.

use std::collections::BTreeMap;

use crate::file::SharedFile;
use crate::romdata::fields::StringFlags;
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{le_u32, u8_at, utf8_or_latin1};
use crate::{Error, Result};

use super::{format_duration_ms, read_exact_at, read_up_to};

const HEADER_SIZE: usize = 16;
const OFF_VERSION: usize = 0x03;
const OFF_RESERVED_SIZE: usize = 0x04;
const OFF_PROGRAM_LENGTH: usize = 0x08;

const TAG_MAGIC: &[u8] = b"[TAG]";
const TAG_MAX_SIZE: usize = 50_000;

const VERSION_PLAYSTATION: u8 = 0x01;
const VERSION_PLAYSTATION_2: u8 = 0x02;
const VERSION_SATURN: u8 = 0x11;
const VERSION_DREAMCAST: u8 = 0x12;
const VERSION_MEGA_DRIVE: u8 = 0x13;
const VERSION_N64: u8 = 0x21;
const VERSION_GBA: u8 = 0x22;
const VERSION_SNES: u8 = 0x23;
const VERSION_QSOUND: u8 = 0x41;

fn system_for(version: u8) -> Option<&'static str> {
    Some(match version {
        VERSION_PLAYSTATION => "Sony PlayStation",
        VERSION_PLAYSTATION_2 => "Sony PlayStation 2",
        VERSION_SATURN => "Sega Saturn",
        VERSION_DREAMCAST => "Sega Dreamcast",
        VERSION_MEGA_DRIVE => "Sega Mega Drive",
        VERSION_N64 => "Nintendo 64",
        VERSION_GBA => "Game Boy Advance",
        VERSION_SNES => "Super NES",
        VERSION_QSOUND => "Capcom QSound",
        _ => return None,
    })
}

/// Tag naming the ripper, which varies by system.
fn ripper_tag(version: u8) -> &'static str {
    match version {
        VERSION_SATURN => "ssfby",
        VERSION_DREAMCAST => "dsfby",
        VERSION_N64 => "usfby",
        VERSION_GBA => "gsfby",
        VERSION_SNES => "snsfby",
        VERSION_QSOUND => "qsfby",
        _ => "psfby",
    }
}

/// Parse a `[TAG]` body into a name-to-value map.
fn parse_tags(data: &[u8]) -> BTreeMap<String, String> {
    let mut tags: BTreeMap<String, String> = BTreeMap::new();
    let mut last_name: Option<String> = None;
    for line in data.split(|&c| c == b'\n') {
        let Some(eq) = line.iter().position(|&c| c == b'=') else {
            continue;
        };
        let trim = |b: &[u8]| utf8_or_latin1(b).trim_matches(|c: char| c <= ' ').to_string();
        let name = trim(&line[..eq]).to_ascii_lowercase();
        let value = trim(&line[eq + 1..]);
        if name.is_empty() {
            continue;
        }
        if last_name.as_deref() == Some(name.as_str()) {
            let existing = tags.entry(name.clone()).or_default();
            existing.push('\n');
            existing.push_str(&value);
        } else {
            tags.insert(name.clone(), value);
        }
        last_name = Some(name);
    }
    tags
}

/// Parse a `[[h:]m:]s[.ddd]` length into milliseconds.
fn parse_length(s: &str) -> Option<u64> {
    let (whole, frac) = match s.find(['.', ',']) {
        Some(pos) => (&s[..pos], &s[pos + 1..]),
        None => (s, ""),
    };
    let mut secs: u64 = 0;
    let parts: Vec<&str> = whole.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    for part in parts {
        secs = secs * 60 + part.trim().parse::<u64>().ok()?;
    }
    let mut ms: u64 = 0;
    let mut scale = 100;
    for c in frac.chars().take(3) {
        ms += u64::from(c.to_digit(10)?) * scale;
        scale /= 10;
    }
    Some(secs * 1000 + ms)
}

/// PSF parser.
pub struct Psf {
    base: RomDataBase,
    header: Vec<u8>,
}

impl Psf {
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

    fn version(&self) -> u8 {
        u8_at(&self.header, OFF_VERSION)
    }

    /// Load the tag block. No `[TAG]` marker means no tags.
    fn load_tags(&self) -> Result<BTreeMap<String, String>> {
        let file = self.base.require_file()?;
        let offset = HEADER_SIZE as u64
            + u64::from(le_u32(&self.header, OFF_RESERVED_SIZE))
            + u64::from(le_u32(&self.header, OFF_PROGRAM_LENGTH));
        let data = read_up_to(&file, offset, TAG_MAGIC.len() + TAG_MAX_SIZE)?;
        match data.strip_prefix(TAG_MAGIC) {
            Some(body) => Ok(parse_tags(body)),
            None => Ok(BTreeMap::new()),
        }
    }
}

impl RomDataClass for Psf {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "PSF",
        extensions: &[
            ".psf", ".minipsf", ".psf1", ".minipsf1", ".psf2", ".minipsf2", ".ssf", ".minissf",
            ".dsf", ".minidsf", ".usf", ".miniusf", ".gsf", ".minigsf", ".snsf", ".minisnsf",
            ".qsf", ".miniqsf",
        ],
        mime_types: &["audio/x-psf", "audio/x-minipsf"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_SIZE || !info.has_magic(0, b"PSF") {
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

impl RomData for Psf {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Portable Sound Format",
            SystemNameType::Short | SystemNameType::Abbreviation => "PSF",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let version = self.version();
        fields.reserve(12);
        match system_for(version) {
            Some(sys) => fields.add_field_string("System", sys, StringFlags::NONE),
            None => fields.add_field_string("System", &format!("Unknown (0x{version:02X})"), StringFlags::NONE),
        };

        let tags = self.load_tags()?;
        let tag = |name: &str| tags.get(name).map(String::as_str).filter(|s| !s.is_empty());
        for (label, name) in [
            ("Title", "title"),
            ("Artist", "artist"),
            ("Game", "game"),
            ("Release Date", "year"),
            ("Genre", "genre"),
            ("Copyright", "copyright"),
            ("Ripped By", ripper_tag(version)),
            ("Volume", "volume"),
        ] {
            if let Some(value) = tag(name) {
                fields.add_field_string(label, value, StringFlags::NONE);
            }
        }
        for (label, name) in [("Duration", "length"), ("Fade Length", "fade")] {
            if let Some(ms) = tag(name).and_then(parse_length) {
                fields.add_field_string(label, &format_duration_ms(ms), StringFlags::NONE);
            }
        }
        if let Some(comment) = tag("comment") {
            fields.add_field_string("Comment", comment, StringFlags::NONE);
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        let tags = self.load_tags()?;
        let tag = |name: &str| tags.get(name).map(String::as_str).unwrap_or("");
        metadata.add_string(Property::Title, tag("title"));
        metadata.add_string(Property::Artist, tag("artist"));
        metadata.add_string(Property::Album, tag("game"));
        if let Some(year) = tag("year").get(..4).and_then(|y| y.parse::<u64>().ok()) {
            metadata.add_unsigned(Property::ReleaseYear, year);
        }
        metadata.add_string(Property::Genre, tag("genre"));
        metadata.add_string(Property::Copyright, tag("copyright"));
        metadata.add_string(Property::Comment, tag("comment"));

        // Fade is part of the playback time.
        if let Some(length) = parse_length(tag("length")) {
            let fade = parse_length(tag("fade")).unwrap_or(0);
            metadata.add_integer(Property::Duration, (length + fade) as i64);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::romdata::metadata::PropertyValue;

    pub(crate) fn make_psf(version: u8, tag: &str) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..3].copy_from_slice(b"PSF");
        data[OFF_VERSION] = version;
        data[OFF_PROGRAM_LENGTH..OFF_PROGRAM_LENGTH + 4].copy_from_slice(&32u32.to_le_bytes());
        data.extend_from_slice(&[0x78; 32]);
        if !tag.is_empty() {
            data.extend_from_slice(TAG_MAGIC);
            data.extend_from_slice(tag.as_bytes());
        }
        data
    }

    const TAGS: &str = "title=Battle Theme\nartist=Nobuo Uematsu\ngame=Final Fantasy VII\n\
                        year=1997\ncomment=line one\ncomment=line two\nlength=2:05.5\nfade=10\n\
                        psfby=someone\n";

    #[test]
    fn test_fields_from_tags() {
        let psf = Psf::new(MemFile::new(make_psf(VERSION_PLAYSTATION, TAGS)).into_shared());
        assert!(psf.is_valid());
        let fields = psf.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("System"), Some("Sony PlayStation"));
        assert_eq!(get("Title"), Some("Battle Theme"));
        assert_eq!(get("Ripped By"), Some("someone"));
        assert_eq!(get("Duration"), Some("2:05"));
        assert_eq!(get("Comment"), Some("line one\nline two"));
    }

    #[test]
    fn test_metadata_duration_includes_fade() {
        let psf = Psf::new(MemFile::new(make_psf(VERSION_GBA, TAGS)).into_shared());
        let md = psf.metadata();
        assert_eq!(md.get(Property::Duration), Some(&PropertyValue::Integer(135_500)));
        assert_eq!(md.get(Property::ReleaseYear), Some(&PropertyValue::UnsignedInteger(1997)));
        assert_eq!(md.get(Property::Album).and_then(|v| v.as_str()), Some("Final Fantasy VII"));
    }

    #[test]
    fn test_no_tags_and_unknown_system() {
        let psf = Psf::new(MemFile::new(make_psf(0x7F, "")).into_shared());
        assert!(psf.is_valid());
        let fields = psf.fields();
        assert_eq!(fields.count(), 1);
        assert_eq!(fields.iter().next().and_then(|f| f.as_str()), Some("Unknown (0x7F)"));
        assert!(psf.metadata().is_empty());
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("1:02:03"), Some(3_723_000));
        assert_eq!(parse_length("45.25"), Some(45_250));
        assert_eq!(parse_length("3,5"), Some(3_500));
        assert_eq!(parse_length("x"), None);
        assert_eq!(parse_length(""), None);
    }

    #[test]
    fn test_tag_whitespace_and_case() {
        let tags = parse_tags(b"  Title = Spaced  \r\nnovalue\nGENRE=Rock");
        assert_eq!(tags.get("title").map(String::as_str), Some("Spaced"));
        assert_eq!(tags.get("genre").map(String::as_str), Some("Rock"));
        assert_eq!(tags.len(), 2);
    }
}

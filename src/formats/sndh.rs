//! Atari ST SNDH music files.
//!
//! The header is a sequence of four-character tags starting at offset 16
//! and ending at `HDNS`. Files packed with Pack-Ice are not unpacked, so
//! their tags are not read.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{latin1, until_nul};
use crate::{Error, Result};

use super::read_up_to;

const OFF_MAGIC: usize = 12;
const MIN_SIZE: usize = 16;
/// Tags beyond this are ignored.
const TAG_AREA_SIZE: usize = 4096;

/// Tags found in the SNDH header.
#[derive(Debug, Default, PartialEq)]
struct SndhTags {
    title: String,
    composer: String,
    ripper: String,
    converter: String,
    year: Option<u32>,
    subtunes: Option<u32>,
    /// Replay timer and its frequency in Hz, e.g. `("C", 50)`.
    timer: Option<(char, u32)>,
}

/// Read a NUL-terminated string at the start of `p`. Returns the string
/// and the number of bytes consumed including the terminator.
fn read_str(p: &[u8]) -> Option<(String, usize)> {
    let s = until_nul(p);
    if s.len() == p.len() {
        return None;
    }
    Some((latin1(s), s.len() + 1))
}

fn parse_tags(data: &[u8]) -> SndhTags {
    let mut tags = SndhTags::default();
    let mut pos = MIN_SIZE;
    while pos + 4 <= data.len() {
        let p = &data[pos..];
        let slot = match &p[..4] {
            b"TITL" => Some(&mut tags.title),
            b"COMM" => Some(&mut tags.composer),
            b"RIPP" => Some(&mut tags.ripper),
            b"CONV" => Some(&mut tags.converter),
            _ => None,
        };
        if let Some(slot) = slot {
            let Some((s, used)) = read_str(&p[4..]) else {
                break;
            };
            *slot = s;
            pos += 4 + used;
            continue;
        }

        match p {
            [b'H', b'D', b'N', b'S', ..] => break,
            [b'Y', b'E', b'A', b'R', rest @ ..] => {
                let Some((s, used)) = read_str(rest) else {
                    break;
                };
                tags.year = s.trim().parse().ok();
                pos += 4 + used;
            }
            [b'#', b'#', d1, d2, ..] if d1.is_ascii_digit() && d2.is_ascii_digit() => {
                tags.subtunes = Some(u32::from(d1 - b'0') * 10 + u32::from(d2 - b'0'));
                pos += 4;
            }
            [b'T', t @ (b'A' | b'B' | b'C' | b'D'), rest @ ..] | [b'!', t @ b'V', rest @ ..] => {
                let Some((s, used)) = read_str(rest) else {
                    break;
                };
                if let Ok(hz) = s.trim().parse() {
                    tags.timer = Some((*t as char, hz));
                }
                pos += 2 + used;
            }
            _ => pos += 1,
        }
    }
    tags
}

/// SNDH parser.
pub struct Sndh {
    base: RomDataBase,
}

impl Sndh {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_up_to(file, 0, MIN_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.base.set_valid(FileType::AudioFile);
        Ok(())
    }

    fn load_tags(&self) -> Result<SndhTags> {
        let file = self.base.require_file()?;
        let data = read_up_to(&file, 0, TAG_AREA_SIZE)?;
        Ok(parse_tags(&data))
    }
}

impl RomDataClass for Sndh {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "SNDH",
        extensions: &[".sndh", ".snd"],
        mime_types: &["audio/x-sndh"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < MIN_SIZE || !info.has_magic(OFF_MAGIC, b"SNDH") {
            return None;
        }
        Some(0)
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Sndh {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Atari ST SNDH Audio",
            SystemNameType::Short | SystemNameType::Abbreviation => "SNDH",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let tags = self.load_tags()?;
        fields.reserve(7);

        for (name, value) in [
            ("Song Title", &tags.title),
            ("Composer", &tags.composer),
            ("Ripper", &tags.ripper),
            ("Converter", &tags.converter),
        ] {
            if !value.is_empty() {
                fields.add_field_string(name, value, StringFlags::TRIM_END);
            }
        }
        if let Some(year) = tags.year {
            fields.add_field_string_numeric("Year", year, Base::Dec, 0, StringFlags::NONE);
        }
        if let Some(n) = tags.subtunes {
            fields.add_field_string_numeric("# of Subtunes", n, Base::Dec, 0, StringFlags::NONE);
        }
        if let Some((timer, hz)) = tags.timer {
            let name = if timer == 'V' { "VBL".to_string() } else { format!("Timer {timer}") };
            fields.add_field_string("Replay Timer", &format!("{name} ({hz} Hz)"), StringFlags::NONE);
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        let tags = self.load_tags()?;
        metadata.add_string(Property::Title, &tags.title);
        metadata.add_string(Property::Composer, &tags.composer);
        if let Some(year) = tags.year {
            metadata.add_unsigned(Property::ReleaseYear, u64::from(year));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;

    pub(crate) fn make_sndh() -> Vec<u8> {
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(&[0x60, 0x00, 0x00, 0x0E]);
        data[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(b"SNDH");
        data.extend_from_slice(b"TITLCrystal Castles  \0");
        data.extend_from_slice(b"COMMJochen Hippel\0");
        data.extend_from_slice(b"YEAR1989\0");
        data.extend_from_slice(b"##04");
        data.extend_from_slice(b"TC50\0");
        data.extend_from_slice(b"HDNS");
        data.extend_from_slice(&[0x4E, 0x75]);
        data
    }

    #[test]
    fn test_tags() {
        let sndh = Sndh::new(MemFile::new(make_sndh()).into_shared());
        assert!(sndh.is_valid());
        let fields = sndh.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Song Title"), Some("Crystal Castles"));
        assert_eq!(get("Composer"), Some("Jochen Hippel"));
        assert_eq!(get("Year"), Some("1989"));
        assert_eq!(get("# of Subtunes"), Some("4"));
        assert_eq!(get("Replay Timer"), Some("Timer C (50 Hz)"));
        assert_eq!(get("Ripper"), None);
    }

    #[test]
    fn test_stops_at_hdns() {
        let mut data = make_sndh();
        data.extend_from_slice(b"RIPPnot a tag\0");
        let tags = parse_tags(&data);
        assert!(tags.ripper.is_empty());
    }

    #[test]
    fn test_unterminated_string() {
        let mut data = vec![0u8; 16];
        data[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(b"SNDH");
        data.extend_from_slice(b"TITLno terminator");
        assert_eq!(parse_tags(&data), SndhTags::default());
    }
}

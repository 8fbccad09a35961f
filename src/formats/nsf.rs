//! NES Sound Format music files.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u16, u8_at};
use crate::{Error, Result};

use super::read_exact_at;

const HEADER_SIZE: usize = 0x80;
const MAGIC: &[u8] = b"NESM\x1A";

const OFF_VERSION: usize = 0x05;
const OFF_SONGS: usize = 0x06;
const OFF_START_SONG: usize = 0x07;
const OFF_LOAD: usize = 0x08;
const OFF_INIT: usize = 0x0A;
const OFF_PLAY: usize = 0x0C;
const OFF_TITLE: usize = 0x0E;
const OFF_ARTIST: usize = 0x2E;
const OFF_COPYRIGHT: usize = 0x4E;
const OFF_TV_SYSTEM: usize = 0x7A;
const OFF_EXPANSION: usize = 0x7B;

const EXPANSION_NAMES: [&str; 6] = [
    "Konami VRC6",
    "Konami VRC7",
    "Famicom Disk System",
    "Nintendo MMC5",
    "Namco N163",
    "Sunsoft 5B",
];

/// NSF music parser.
pub struct Nsf {
    base: RomDataBase,
    header: Vec<u8>,
}

impl Nsf {
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

    fn text(&self, off: usize) -> String {
        latin1(bytes_at(&self.header, off, 32))
    }
}

impl RomDataClass for Nsf {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "NSF",
        extensions: &[".nsf"],
        mime_types: &["audio/x-nsf"],
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

impl RomData for Nsf {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "NES Sound Format",
            SystemNameType::Short | SystemNameType::Abbreviation => "NSF",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(11);

        fields.add_field_string_numeric("Version", u32::from(u8_at(h, OFF_VERSION)), Base::Dec, 0, StringFlags::NONE);
        for (name, off) in [("Title", OFF_TITLE), ("Artist", OFF_ARTIST), ("Copyright", OFF_COPYRIGHT)] {
            fields.add_field_string(name, &self.text(off), StringFlags::NONE);
        }
        fields.add_field_string_numeric("Track Count", u32::from(u8_at(h, OFF_SONGS)), Base::Dec, 0, StringFlags::NONE);
        fields.add_field_string_numeric(
            "Default Track #",
            u32::from(u8_at(h, OFF_START_SONG)),
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        for (name, off) in [("Load Address", OFF_LOAD), ("Init Address", OFF_INIT), ("Play Address", OFF_PLAY)] {
            fields.add_field_string_numeric(name, u32::from(le_u16(h, off)), Base::Hex, 4, StringFlags::MONOSPACE);
        }

        let tv = match u8_at(h, OFF_TV_SYSTEM) & 0x03 {
            0 => "NTSC",
            1 => "PAL",
            _ => "NTSC/PAL",
        };
        fields.add_field_string("TV System", tv, StringFlags::NONE);
        fields.add_field_bitfield("Expansion Audio", &EXPANSION_NAMES, 3, u32::from(u8_at(h, OFF_EXPANSION)));
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.text(OFF_TITLE));
        metadata.add_string(Property::Artist, &self.text(OFF_ARTIST));
        metadata.add_string(Property::Copyright, &self.text(OFF_COPYRIGHT));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::romdata::fields::FieldData;

    pub(crate) fn make_nsf() -> Vec<u8> {
        let mut data = vec![0u8; 0x100];
        data[0..5].copy_from_slice(MAGIC);
        data[OFF_VERSION] = 1;
        data[OFF_SONGS] = 24;
        data[OFF_START_SONG] = 1;
        data[OFF_LOAD..OFF_LOAD + 2].copy_from_slice(&0x8000u16.to_le_bytes());
        data[OFF_TITLE..OFF_TITLE + 9].copy_from_slice(b"Castlevan");
        data[OFF_ARTIST..OFF_ARTIST + 6].copy_from_slice(b"Konami");
        data[OFF_TV_SYSTEM] = 1;
        data[OFF_EXPANSION] = 0x01;
        data
    }

    #[test]
    fn test_fields() {
        let nsf = Nsf::new(MemFile::new(make_nsf()).into_shared());
        assert!(nsf.is_valid());
        let fields = nsf.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Title"), Some("Castlevan"));
        assert_eq!(get("TV System"), Some("PAL"));
        assert_eq!(get("Load Address"), Some("0x8000"));
        let exp = fields.iter().find(|f| f.name == "Expansion Audio").unwrap();
        assert!(matches!(exp.data, FieldData::Bitfield { value: 1, .. }));
    }

    #[test]
    fn test_needs_eof_marker() {
        let mut data = make_nsf();
        data[4] = 0;
        let info = DetectionHeader { address: 0, data: &data, ext: None, file_size: data.len() as u64 };
        assert_eq!(Nsf::is_rom_supported(&info), None);
    }
}

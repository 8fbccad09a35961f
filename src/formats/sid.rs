//! Commodore 64 SID music files (PSID and RSID).
//!
//! All header fields are big-endian.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{be_u16, bytes_at, latin1};
use crate::{Error, Result};

use super::read_up_to;

/// Version 1 header.
const HEADER_V1_SIZE: usize = 0x76;
/// Version 2+ header.
const HEADER_V2_SIZE: usize = 0x7C;

const OFF_VERSION: usize = 0x04;
const OFF_DATA_OFFSET: usize = 0x06;
const OFF_LOAD: usize = 0x08;
const OFF_INIT: usize = 0x0A;
const OFF_PLAY: usize = 0x0C;
const OFF_SONGS: usize = 0x0E;
const OFF_START_SONG: usize = 0x10;
const OFF_NAME: usize = 0x16;
const OFF_AUTHOR: usize = 0x36;
const OFF_COPYRIGHT: usize = 0x56;
const OFF_FLAGS: usize = 0x76;

pub const SUBTYPE_PSID: u32 = 0;
pub const SUBTYPE_RSID: u32 = 1;

/// SID music parser.
pub struct Sid {
    base: RomDataBase,
    header: Vec<u8>,
    subtype: u32,
}

impl Sid {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_up_to(file, 0, HEADER_V2_SIZE)?;
        Error::check_len(HEADER_V1_SIZE, data.len())?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        self.subtype = Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data;
        self.base.set_valid(FileType::AudioFile);
        Ok(())
    }

    fn text(&self, off: usize) -> String {
        latin1(bytes_at(&self.header, off, 32))
    }

    /// Clock flags exist from version 2 on.
    fn clock(&self) -> Option<&'static str> {
        let h = &self.header;
        if be_u16(h, OFF_VERSION) < 2 || h.len() < HEADER_V2_SIZE {
            return None;
        }
        Some(match (be_u16(h, OFF_FLAGS) >> 2) & 0x03 {
            0 => "Unknown",
            1 => "PAL",
            2 => "NTSC",
            _ => "PAL and NTSC",
        })
    }
}

impl RomDataClass for Sid {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "SID",
        extensions: &[".sid", ".psid"],
        mime_types: &["audio/prs.sid", "audio/x-sid"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_V1_SIZE {
            return None;
        }
        if info.has_magic(0, b"PSID") {
            Some(SUBTYPE_PSID)
        } else if info.has_magic(0, b"RSID") {
            Some(SUBTYPE_RSID)
        } else {
            None
        }
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
            subtype: SUBTYPE_PSID,
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Sid {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Commodore 64 SID Music",
            SystemNameType::Short | SystemNameType::Abbreviation => "SID",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(11);

        let kind = if self.subtype == SUBTYPE_RSID { "RealSID" } else { "PlaySID" };
        fields.add_field_string("Type", kind, StringFlags::NONE);
        fields.add_field_string_numeric("Version", u32::from(be_u16(h, OFF_VERSION)), Base::Dec, 0, StringFlags::NONE);

        for (name, off) in [("Name", OFF_NAME), ("Author", OFF_AUTHOR), ("Copyright", OFF_COPYRIGHT)] {
            let s = self.text(off);
            if !s.is_empty() {
                fields.add_field_string(name, &s, StringFlags::NONE);
            }
        }

        for (name, off) in [("Load Address", OFF_LOAD), ("Init Address", OFF_INIT), ("Play Address", OFF_PLAY)] {
            fields.add_field_string_numeric(name, u32::from(be_u16(h, off)), Base::Hex, 4, StringFlags::MONOSPACE);
        }
        fields.add_field_string_numeric("# of Songs", u32::from(be_u16(h, OFF_SONGS)), Base::Dec, 0, StringFlags::NONE);
        fields.add_field_string_numeric(
            "Starting Song #",
            u32::from(be_u16(h, OFF_START_SONG)),
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        fields.add_field_string_numeric(
            "Data Offset",
            u32::from(be_u16(h, OFF_DATA_OFFSET)),
            Base::Hex,
            4,
            StringFlags::MONOSPACE,
        );
        if let Some(clock) = self.clock() {
            fields.add_field_string("Clock", clock, StringFlags::NONE);
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.text(OFF_NAME));
        metadata.add_string(Property::Author, &self.text(OFF_AUTHOR));
        metadata.add_string(Property::Copyright, &self.text(OFF_COPYRIGHT));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;

    pub(crate) fn make_sid(magic: &[u8; 4], version: u16) -> Vec<u8> {
        let mut data = vec![0u8; 0x200];
        data[0..4].copy_from_slice(magic);
        data[OFF_VERSION..OFF_VERSION + 2].copy_from_slice(&version.to_be_bytes());
        data[OFF_DATA_OFFSET..OFF_DATA_OFFSET + 2].copy_from_slice(&0x7Cu16.to_be_bytes());
        data[OFF_LOAD..OFF_LOAD + 2].copy_from_slice(&0x1000u16.to_be_bytes());
        data[OFF_SONGS..OFF_SONGS + 2].copy_from_slice(&3u16.to_be_bytes());
        data[OFF_START_SONG..OFF_START_SONG + 2].copy_from_slice(&1u16.to_be_bytes());
        data[OFF_NAME..OFF_NAME + 9].copy_from_slice(b"Commando!");
        data[OFF_AUTHOR..OFF_AUTHOR + 13].copy_from_slice(b"Rob Hubbard  ");
        data[OFF_FLAGS..OFF_FLAGS + 2].copy_from_slice(&0x0004u16.to_be_bytes());
        data
    }

    #[test]
    fn test_psid_fields() {
        let sid = Sid::new(MemFile::new(make_sid(b"PSID", 2)).into_shared());
        assert!(sid.is_valid());
        assert_eq!(sid.file_type(), FileType::AudioFile);
        let fields = sid.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Type"), Some("PlaySID"));
        assert_eq!(get("Load Address"), Some("0x1000"));
        assert_eq!(get("# of Songs"), Some("3"));
        assert_eq!(get("Clock"), Some("PAL"));
        assert_eq!(get("Copyright"), None);

        let md = sid.metadata();
        assert_eq!(md.get(Property::Author).and_then(|v| v.as_str()), Some("Rob Hubbard"));
        assert!(md.get(Property::Copyright).is_none());
    }

    #[test]
    fn test_rsid_v1_has_no_clock() {
        let data = make_sid(b"RSID", 1);
        let info = DetectionHeader { address: 0, data: &data, ext: None, file_size: 0x200 };
        assert_eq!(Sid::is_rom_supported(&info), Some(SUBTYPE_RSID));
        let sid = Sid::new(MemFile::new(data).into_shared());
        let fields = sid.fields();
        assert!(fields.iter().all(|f| f.name != "Clock"));
    }

    #[test]
    fn test_truncated_header() {
        let data = make_sid(b"PSID", 2);
        let info = DetectionHeader { address: 0, data: &data[..HEADER_V1_SIZE - 1], ext: None, file_size: 0x200 };
        assert_eq!(Sid::is_rom_supported(&info), None);
    }
}

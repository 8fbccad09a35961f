//! Nintendo Virtual Boy ROM images.
//!
//! The header sits 0x220 bytes before the end of the file, so this format
//! is detected from the footer table.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, is_upper_alnum, latin1, u8_at};
use crate::{Error, Result};

use super::{nintendo_publishers, read_exact_at};

/// Distance of the header from the end of the file.
pub const HEADER_FROM_END: usize = 0x220;

const OFF_TITLE: usize = 0x00;
const TITLE_LEN: usize = 20;
const OFF_PUBLISHER: usize = 0x19;
const OFF_GAME_ID: usize = 0x1B;
const OFF_VERSION: usize = 0x1F;

/// Virtual Boy ROM parser.
pub struct VirtualBoy {
    base: RomDataBase,
    header: Vec<u8>,
}

impl VirtualBoy {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let file_size = file.size()?;
        let offset = file_size
            .checked_sub(HEADER_FROM_END as u64)
            .ok_or(Error::TooShort { wanted: HEADER_FROM_END, got: file_size as usize })?;
        let data = read_exact_at(file, offset, HEADER_FROM_END)?;
        let info = DetectionHeader {
            address: offset as u32,
            data: &data,
            ext: None,
            file_size,
        };
        Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data;
        self.base.set_valid(FileType::RomImage);
        Ok(())
    }

    fn title(&self) -> String {
        latin1(bytes_at(&self.header, OFF_TITLE, TITLE_LEN))
    }

    fn publisher(&self) -> String {
        nintendo_publishers::describe_new(bytes_at(&self.header, OFF_PUBLISHER, 2))
    }

    fn region(&self) -> &'static str {
        match u8_at(&self.header, OFF_GAME_ID + 3) {
            b'J' => "Japan",
            b'E' => "USA",
            b'P' => "Europe",
            _ => "Unknown",
        }
    }
}

impl RomDataClass for VirtualBoy {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "VirtualBoy",
        extensions: &[".vb"],
        mime_types: &["application/x-virtual-boy-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        let start = info.size().checked_sub(HEADER_FROM_END)?;
        let h = &info.data[start..];

        let title = &h[OFF_TITLE..OFF_TITLE + TITLE_LEN];
        if title.iter().any(|&c| c != 0 && c < 0x20) {
            return None;
        }
        let codes = &h[OFF_PUBLISHER..OFF_GAME_ID + 4];
        if !codes.iter().copied().all(is_upper_alnum) {
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

impl RomData for VirtualBoy {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Nintendo Virtual Boy",
            SystemNameType::Short => "Virtual Boy",
            SystemNameType::Abbreviation => "VB",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(5);
        fields.add_field_string("Title", &self.title(), StringFlags::NONE);
        fields.add_field_string("Game ID", &latin1(bytes_at(h, OFF_GAME_ID, 4)), StringFlags::NONE);
        fields.add_field_string("Publisher", &self.publisher(), StringFlags::NONE);
        fields.add_field_string_numeric("Revision", u32::from(u8_at(h, OFF_VERSION)), Base::Dec, 2, StringFlags::NONE);
        fields.add_field_string("Region", self.region(), StringFlags::NONE);
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.title());
        metadata.add_string(Property::Publisher, &self.publisher());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;

    /// A 4 KiB ROM with a valid trailing header.
    pub(crate) fn make_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x1000];
        let h = rom.len() - HEADER_FROM_END;
        rom[h..h + 11].copy_from_slice(b"MARIO CLASH");
        rom[h + OFF_PUBLISHER..h + OFF_PUBLISHER + 2].copy_from_slice(b"01");
        rom[h + OFF_GAME_ID..h + OFF_GAME_ID + 4].copy_from_slice(b"VMCE");
        rom[h + OFF_VERSION] = 1;
        rom
    }

    #[test]
    fn test_fields() {
        let vb = VirtualBoy::new(MemFile::new(make_rom()).into_shared());
        assert!(vb.is_valid());
        let fields = vb.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Title"), Some("MARIO CLASH"));
        assert_eq!(get("Game ID"), Some("VMCE"));
        assert_eq!(get("Publisher"), Some("Nintendo"));
        assert_eq!(get("Region"), Some("USA"));
        assert_eq!(get("Revision"), Some("01"));
    }

    #[test]
    fn test_lowercase_game_id_rejected() {
        let mut rom = make_rom();
        let h = rom.len() - HEADER_FROM_END;
        rom[h + OFF_GAME_ID] = b'v';
        let info = DetectionHeader { address: 0, data: &rom, ext: Some(".vb"), file_size: rom.len() as u64 };
        assert_eq!(VirtualBoy::is_rom_supported(&info), None);
    }

    #[test]
    fn test_too_short() {
        let info = DetectionHeader { address: 0, data: &[0u8; 16], ext: Some(".vb"), file_size: 16 };
        assert_eq!(VirtualBoy::is_rom_supported(&info), None);
        assert!(!VirtualBoy::new(MemFile::new(vec![0u8; 16]).into_shared()).is_valid());
    }
}

//! Atari Lynx ROM images with an LNX header.

use crate::file::SharedFile;
use crate::romdata::fields::StringFlags;
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u16, u8_at};
use crate::{Error, Result};

use super::read_exact_at;

const HEADER_SIZE: usize = 64;

const OFF_BANK0_PAGE_SIZE: usize = 0x04;
const OFF_BANK1_PAGE_SIZE: usize = 0x06;
const OFF_VERSION: usize = 0x08;
const OFF_CART_NAME: usize = 0x0A;
const OFF_MANUFACTURER: usize = 0x2A;
const OFF_ROTATION: usize = 0x3A;

/// Atari Lynx ROM parser.
pub struct Lynx {
    base: RomDataBase,
    header: Vec<u8>,
}

impl Lynx {
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
        self.base.set_valid(FileType::RomImage);
        Ok(())
    }

    fn title(&self) -> String {
        latin1(bytes_at(&self.header, OFF_CART_NAME, 32))
    }

    fn manufacturer(&self) -> String {
        latin1(bytes_at(&self.header, OFF_MANUFACTURER, 16))
    }
}

impl RomDataClass for Lynx {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "Lynx",
        extensions: &[".lnx", ".lyx"],
        mime_types: &["application/x-atari-lynx-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_SIZE || !info.has_magic(0, b"LYNX") {
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

impl RomData for Lynx {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Atari Lynx",
            SystemNameType::Short => "Lynx",
            SystemNameType::Abbreviation => "LYNX",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.add_field_string("Title", &self.title(), StringFlags::NONE);
        fields.add_field_string("Manufacturer", &self.manufacturer(), StringFlags::NONE);

        let rotation = match u8_at(h, OFF_ROTATION) {
            0 => "None",
            1 => "Left",
            2 => "Right",
            _ => "Unknown",
        };
        fields.add_field_string("Rotation", rotation, StringFlags::NONE);

        let pages = u32::from(le_u16(h, OFF_BANK0_PAGE_SIZE)) + u32::from(le_u16(h, OFF_BANK1_PAGE_SIZE));
        fields.add_field_string("ROM Size", &format!("{} KiB", pages * 256 / 1024), StringFlags::NONE);
        fields.add_field_string("Header Version", &le_u16(h, OFF_VERSION).to_string(), StringFlags::NONE);
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.title());
        metadata.add_string(Property::Publisher, &self.manufacturer());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemFile;

    #[test]
    fn test_fields() {
        let mut data = vec![0u8; 0x400];
        data[0..4].copy_from_slice(b"LYNX");
        data[OFF_BANK0_PAGE_SIZE..OFF_BANK0_PAGE_SIZE + 2].copy_from_slice(&512u16.to_le_bytes());
        data[OFF_VERSION] = 1;
        data[OFF_CART_NAME..OFF_CART_NAME + 9].copy_from_slice(b"Chip Chal");
        data[OFF_MANUFACTURER..OFF_MANUFACTURER + 5].copy_from_slice(b"Atari");
        data[OFF_ROTATION] = 2;

        let lynx = Lynx::new(MemFile::new(data).into_shared());
        assert!(lynx.is_valid());
        let fields = lynx.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Title"), Some("Chip Chal"));
        assert_eq!(get("Rotation"), Some("Right"));
        assert_eq!(get("ROM Size"), Some("128 KiB"));
    }

    #[test]
    fn test_short_file_invalid() {
        let lynx = Lynx::new(MemFile::new(b"LYNX".to_vec()).into_shared());
        assert!(!lynx.is_valid());
        assert!(lynx.fields().is_empty());
        assert!(lynx.base().file().is_none());
    }
}

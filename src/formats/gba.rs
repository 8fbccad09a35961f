//! Game Boy Advance ROM images.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, ExtUrl, FileType, FormatInfo, ImageType, Property, RomData, RomDataBase,
    RomDataClass, RomFields, RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u32, u8_at};
use crate::{Error, Result};

use super::nintendo_publishers;
use super::read_exact_at;

const HEADER_SIZE: usize = 0xC0;

const OFF_ENTRY: usize = 0x00;
const OFF_TITLE: usize = 0xA0;
const OFF_GAME_CODE: usize = 0xAC;
const OFF_COMPANY: usize = 0xB0;
const OFF_FIXED_96: usize = 0xB2;
const OFF_DEVICE_TYPE: usize = 0xB4;
const OFF_VERSION: usize = 0xBC;
const OFF_CHECKSUM: usize = 0xBD;

/// Game Boy Advance ROM parser.
pub struct GameBoyAdvance {
    base: RomDataBase,
    header: Vec<u8>,
}

impl GameBoyAdvance {
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
        latin1(bytes_at(&self.header, OFF_TITLE, 12))
    }

    /// Game code plus company code, e.g. `AXVE01`.
    fn id6(&self) -> String {
        latin1(bytes_at(&self.header, OFF_GAME_CODE, 6))
    }

    fn calc_checksum(&self) -> u8 {
        let sum = bytes_at(&self.header, OFF_TITLE, OFF_CHECKSUM - OFF_TITLE)
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b));
        sum.wrapping_sub(0x19)
    }

    fn region_code(&self) -> &'static str {
        match u8_at(&self.header, OFF_GAME_CODE + 3) {
            b'J' => "JP",
            b'E' => "US",
            b'P' => "EU",
            b'D' => "DE",
            b'F' => "FR",
            b'I' => "IT",
            b'S' => "ES",
            _ => "EN",
        }
    }
}

impl RomDataClass for GameBoyAdvance {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "GameBoyAdvance",
        extensions: &[".gba", ".agb", ".mb", ".srl"],
        mime_types: &["application/x-gba-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_SIZE {
            return None;
        }
        if info.be32_at(0x04) != Some(0x24FF_AE51) || info.data[OFF_FIXED_96] != 0x96 {
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

impl RomData for GameBoyAdvance {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Nintendo Game Boy Advance",
            SystemNameType::Short => "Game Boy Advance",
            SystemNameType::Abbreviation => "GBA",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(7);

        fields.add_field_string("Title", &self.title(), StringFlags::TRIM_END);
        fields.add_field_string("Game ID", &self.id6(), StringFlags::NONE);
        fields.add_field_string(
            "Publisher",
            &nintendo_publishers::describe_new(bytes_at(h, OFF_COMPANY, 2)),
            StringFlags::NONE,
        );
        fields.add_field_string_numeric("Revision", u32::from(u8_at(h, OFF_VERSION)), Base::Dec, 2, StringFlags::NONE);

        // ARM `B` instruction.
        let entry = le_u32(h, OFF_ENTRY);
        if entry >> 24 == 0xEA {
            let target = 0x0800_0000u32.wrapping_add(((entry & 0x00FF_FFFF) << 2) + 8);
            fields.add_field_string_numeric("Entry Point", target, Base::Hex, 8, StringFlags::MONOSPACE);
        } else {
            fields.add_field_string_hexdump("Entry Point", bytes_at(h, OFF_ENTRY, 4), StringFlags::MONOSPACE);
        }

        let debug_enabled = u8_at(h, OFF_DEVICE_TYPE) & 0x80 != 0;
        fields.add_field_bitfield("Debug", &["Enabled"], 0, u32::from(debug_enabled));

        let stored = u8_at(h, OFF_CHECKSUM);
        let calc = self.calc_checksum();
        if stored == calc {
            fields.add_field_string("Checksum", &format!("0x{stored:02X} (valid)"), StringFlags::MONOSPACE);
        } else {
            fields.add_field_string(
                "Checksum",
                &format!("0x{stored:02X} (INVALID; should be 0x{calc:02X})"),
                StringFlags::MONOSPACE | StringFlags::WARNING,
            );
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.title());
        metadata.add_string(
            Property::Publisher,
            &nintendo_publishers::describe_new(bytes_at(&self.header, OFF_COMPANY, 2)),
        );
        Ok(())
    }

    fn supported_image_types(&self) -> &'static [ImageType] {
        &[ImageType::ExtTitleScreen]
    }

    fn ext_urls(&self, image_type: ImageType) -> Vec<ExtUrl> {
        if !self.is_valid() || image_type != ImageType::ExtTitleScreen {
            return Vec::new();
        }
        let id6 = self.id6();
        if id6.len() != 6 || !id6.bytes().all(|c| c.is_ascii_alphanumeric()) {
            return Vec::new();
        }
        let key = format!("gba/title/{}/{}.png", self.region_code(), id6);
        vec![ExtUrl {
            url: format!("https://rpdb.gerbilsoft.com/{key}"),
            cache_key: key,
        }]
    }
}

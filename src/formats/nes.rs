//! Nintendo Entertainment System ROM images in iNES and NES 2.0 format.

use crate::file::SharedFile;
use crate::romdata::fields::StringFlags;
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, RomData, RomDataBase, RomDataClass, RomFields,
    SystemNameType,
};
use crate::util::u8_at;
use crate::{Error, Result};

use super::read_exact_at;

const HEADER_SIZE: usize = 16;
const MAGIC: &[u8] = b"NES\x1A";

const OFF_PRG_BANKS: usize = 4;
const OFF_CHR_BANKS: usize = 5;
const OFF_FLAGS6: usize = 6;
const OFF_FLAGS7: usize = 7;
const OFF_MAPPER_HI: usize = 8;
const OFF_SIZE_HI: usize = 9;
const OFF_TV_MODE: usize = 12;

const PRG_BANK_SIZE: u64 = 16 * 1024;
const CHR_BANK_SIZE: u64 = 8 * 1024;

const FLAG6_VERTICAL: u8 = 0x01;
const FLAG6_BATTERY: u8 = 0x02;
const FLAG6_TRAINER: u8 = 0x04;
const FLAG6_FOUR_SCREEN: u8 = 0x08;

/// Detection subtypes.
pub const SUBTYPE_INES: u32 = 0;
pub const SUBTYPE_NES2: u32 = 1;

const MAPPERS: &[(u16, &str)] = &[
    (0, "NROM"),
    (1, "SxROM (MMC1)"),
    (2, "UxROM"),
    (3, "CNROM"),
    (4, "TxROM (MMC3)"),
    (5, "ExROM (MMC5)"),
    (7, "AxROM"),
    (9, "PxROM (MMC2)"),
    (10, "FxROM (MMC4)"),
    (11, "Color Dreams"),
    (19, "Namco 129/163"),
    (24, "Konami VRC6a"),
    (26, "Konami VRC6b"),
    (66, "GxROM"),
    (69, "Sunsoft FME-7"),
    (71, "Camerica"),
    (85, "Konami VRC7"),
];

/// NES ROM parser.
pub struct Nes {
    base: RomDataBase,
    header: Vec<u8>,
    subtype: u32,
}

impl Nes {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_exact_at(file, 0, HEADER_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        self.subtype = Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data;
        self.base.set_valid(FileType::RomImage);
        Ok(())
    }

    fn is_nes2(&self) -> bool {
        self.subtype == SUBTYPE_NES2
    }

    fn mapper(&self) -> u16 {
        let h = &self.header;
        let mut mapper = u16::from(u8_at(h, OFF_FLAGS6) >> 4) | u16::from(u8_at(h, OFF_FLAGS7) & 0xF0);
        if self.is_nes2() {
            mapper |= u16::from(u8_at(h, OFF_MAPPER_HI) & 0x0F) << 8;
        }
        mapper
    }

    fn prg_size(&self) -> u64 {
        let h = &self.header;
        let mut banks = u64::from(u8_at(h, OFF_PRG_BANKS));
        if self.is_nes2() {
            banks |= u64::from(u8_at(h, OFF_SIZE_HI) & 0x0F) << 8;
        }
        banks * PRG_BANK_SIZE
    }

    fn chr_size(&self) -> u64 {
        let h = &self.header;
        let mut banks = u64::from(u8_at(h, OFF_CHR_BANKS));
        if self.is_nes2() {
            banks |= u64::from(u8_at(h, OFF_SIZE_HI) >> 4) << 8;
        }
        banks * CHR_BANK_SIZE
    }
}

impl RomDataClass for Nes {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "NES",
        extensions: &[".nes", ".nez"],
        mime_types: &["application/x-nes-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_SIZE || !info.has_magic(0, MAGIC) {
            return None;
        }
        if info.data[OFF_FLAGS7] & 0x0C == 0x08 {
            Some(SUBTYPE_NES2)
        } else {
            Some(SUBTYPE_INES)
        }
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
            subtype: SUBTYPE_INES,
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Nes {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Nintendo Entertainment System",
            SystemNameType::Short => "NES",
            SystemNameType::Abbreviation => "NES",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        let flags6 = u8_at(h, OFF_FLAGS6);
        fields.reserve(8);

        let format = if self.is_nes2() { "NES 2.0" } else { "iNES" };
        fields.add_field_string("Format", format, StringFlags::NONE);

        let mapper = self.mapper();
        let mapper_str = match MAPPERS.iter().find(|(n, _)| *n == mapper) {
            Some((_, name)) => format!("{mapper} - {name}"),
            None => mapper.to_string(),
        };
        fields.add_field_string("Mapper", &mapper_str, StringFlags::NONE);
        if self.is_nes2() {
            let submapper = u8_at(h, OFF_MAPPER_HI) >> 4;
            fields.add_field_string("Submapper", &submapper.to_string(), StringFlags::NONE);
        }

        fields.add_field_string(
            "PRG ROM Size",
            &humansize::format_size(self.prg_size(), humansize::BINARY),
            StringFlags::NONE,
        );
        let chr = self.chr_size();
        let chr_str = if chr == 0 {
            "0 (CHR RAM)".to_string()
        } else {
            humansize::format_size(chr, humansize::BINARY)
        };
        fields.add_field_string("CHR ROM Size", &chr_str, StringFlags::NONE);

        let mirroring = if flags6 & FLAG6_FOUR_SCREEN != 0 {
            "Four-Screen"
        } else if flags6 & FLAG6_VERTICAL != 0 {
            "Vertical"
        } else {
            "Horizontal"
        };
        fields.add_field_string("Mirroring", mirroring, StringFlags::NONE);

        let features = u32::from(flags6 & FLAG6_BATTERY != 0) | (u32::from(flags6 & FLAG6_TRAINER != 0) << 1);
        fields.add_field_bitfield("Features", &["Save RAM (battery)", "Trainer"], 0, features);

        if self.is_nes2() {
            let tv = match u8_at(h, OFF_TV_MODE) & 0x03 {
                0 => "NTSC",
                1 => "PAL",
                2 => "NTSC/PAL",
                _ => "Dendy",
            };
            fields.add_field_string("TV Mode", tv, StringFlags::NONE);
        }
        Ok(())
    }
}
